use anyhow::Result;
use kardo::client::SearchClient;
use kardo::config::Config;
use kardo::model::BoardParser;
use kardo::render::Renderer;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    let client = SearchClient::new(&config).map_err(|e| anyhow::anyhow!(e))?;
    let renderer = Renderer::new(Arc::new(client), &config.link_base_url);
    let parser = BoardParser::new(renderer);

    let board = parser.parse_file(Path::new(&config.board_file)).await;
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}
