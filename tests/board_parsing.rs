use async_trait::async_trait;
use kardo::client::Resolver;
use kardo::model::BoardParser;
use kardo::render::Renderer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

struct StaticResolver(HashMap<String, String>);

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

fn board_parser() -> BoardParser {
    board_parser_with(&[])
}

fn board_parser_with(entries: &[(&str, &str)]) -> BoardParser {
    let map = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let renderer = Renderer::new(Arc::new(StaticResolver(map)), "https://wiki.example.org");
    BoardParser::new(renderer)
}

#[tokio::test]
async fn test_round_trip_single_card() {
    let board = board_parser().parse("## Todo\n- [x] Buy milk\n").await;

    assert_eq!(board.len(), 1);
    assert_eq!(board[0].name, "Todo");
    assert_eq!(board[0].cards.len(), 1);

    let card = &board[0].cards[0];
    assert!(card.completed);
    assert_eq!(card.text, "Buy milk");
    assert!(card.html.contains("Buy milk"));
}

#[tokio::test]
async fn test_columns_and_cards_keep_document_order() {
    let doc = "## Backlog\n- [ ] First\n- [x] Second\n## Doing\n- [ ] Third\n";
    let board = board_parser().parse(doc).await;

    assert_eq!(board.len(), 2);
    assert_eq!(board[0].name, "Backlog");
    assert_eq!(board[1].name, "Doing");
    assert_eq!(board[0].cards[0].text, "First");
    assert_eq!(board[0].cards[1].text, "Second");
    assert!(!board[0].cards[0].completed);
    assert!(board[0].cards[1].completed);
    assert_eq!(board[1].cards[0].text, "Third");
}

#[tokio::test]
async fn test_archive_and_everything_after_is_excluded() {
    let doc = "## Todo\n- [ ] Keep me\n##   ARCHIVE\n- [x] Old stuff\n## Revived\n- [ ] Never seen\n";
    let board = board_parser().parse(doc).await;

    assert_eq!(board.len(), 1);
    assert_eq!(board[0].name, "Todo");
    for column in &board {
        assert!(!column.name.eq_ignore_ascii_case("archive"));
    }
}

#[tokio::test]
async fn test_document_ending_at_archive_header() {
    let board = board_parser().parse("## Todo\n- [ ] Task\n## Archive").await;

    assert_eq!(board.len(), 1);
    assert_eq!(board[0].cards.len(), 1);
}

#[tokio::test]
async fn test_unrelated_lines_are_ignored() {
    let doc = "\
title prose before any column
- [x] orphan card without a column

## Todo
some note between cards
- [ ] Actual task
  indented continuation that is not a card
";
    let board = board_parser().parse(doc).await;

    assert_eq!(board.len(), 1);
    assert_eq!(board[0].cards.len(), 1);
    assert_eq!(board[0].cards[0].text, "Actual task");
}

#[tokio::test]
async fn test_uppercase_marker_is_not_a_card() {
    let board = board_parser().parse("## Todo\n- [X] Shouting\n- [x] quiet\n").await;

    assert_eq!(board[0].cards.len(), 1);
    assert_eq!(board[0].cards[0].text, "quiet");
}

#[tokio::test]
async fn test_redundant_marker_is_normalized() {
    let board = board_parser().parse("## Todo\n- [ ] - Sub item\n- [ ] 2. Numbered\n").await;

    assert_eq!(board[0].cards[0].text, "Sub item");
    assert_eq!(board[0].cards[1].text, "Numbered");
}

#[tokio::test]
async fn test_duplicate_column_names_are_kept() {
    let board = board_parser().parse("## Todo\n## Todo\n- [ ] here\n").await;

    assert_eq!(board.len(), 2);
    assert!(board[0].cards.is_empty());
    assert_eq!(board[1].cards.len(), 1);
}

#[tokio::test]
async fn test_empty_document_yields_empty_board() {
    assert!(board_parser().parse("").await.is_empty());
}

#[tokio::test]
async fn test_missing_file_yields_empty_board() {
    let board = board_parser()
        .parse_file(Path::new("/definitely/not/here/board.md"))
        .await;
    assert!(board.is_empty());
}

#[tokio::test]
async fn test_card_markdown_is_rendered_and_sanitized() {
    let doc = "## Todo\n- [ ] **bold** move <script>alert(1)</script>\n";
    let board = board_parser().parse(doc).await;

    let card = &board[0].cards[0];
    assert!(card.html.contains("<strong>bold</strong>"));
    assert!(!card.html.contains("<script"));
    assert_eq!(card.text, "**bold** move <script>alert(1)</script>");
}

#[tokio::test]
async fn test_card_references_resolve_through_the_board() {
    let doc = "## Todo\n- [ ] read [[Existing Page]] and [[Missing Page]]\n";
    let board = board_parser_with(&[("Existing Page", "docs/Existing Page")])
        .parse(doc)
        .await;

    let html = &board[0].cards[0].html;
    assert!(html.contains(r#"href="https://wiki.example.org/docs/Existing+Page""#));
    assert!(html.contains("<em>Missing Page</em>"));
}
