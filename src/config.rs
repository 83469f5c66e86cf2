// File: ./src/config.rs
// Board and search-service settings
use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Markdown file the board is built from.
    pub board_file: String,
    /// Search endpoint used to resolve [[references]]. Empty disables lookups.
    pub search_url: String,
    /// Service identifier sent with every search query.
    pub search_id: String,
    /// Base URL that resolved references are linked under.
    pub link_base_url: String,
    /// Upper bound for a single reference lookup, in seconds.
    pub resolve_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_file: "/srv/kardo/board.md".to_string(),
            search_url: String::new(),
            search_id: "wiki".to_string(),
            link_base_url: "https://wiki.example.org".to_string(),
            resolve_timeout_secs: 2,
        }
    }
}

impl Config {
    pub fn get_path() -> Option<PathBuf> {
        if let Some(proj) = ProjectDirs::from("com", "kardo", "kardo") {
            return Some(proj.config_dir().join("config.toml"));
        }
        None
    }

    /// Config file first, then `KARDO_*` environment overrides on top.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        config.apply_env();
        config
    }

    fn load_file() -> Result<Self> {
        let path = Self::get_path().ok_or_else(|| anyhow!("no config directory"))?;
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("KARDO_BOARD_FILE") {
            self.board_file = v;
        }
        if let Ok(v) = env::var("KARDO_SEARCH_URL") {
            self.search_url = v;
        }
        if let Ok(v) = env::var("KARDO_SEARCH_ID") {
            self.search_id = v;
        }
        if let Ok(v) = env::var("KARDO_LINK_BASE_URL") {
            self.link_base_url = v;
        }
        if let Ok(v) = env::var("KARDO_RESOLVE_TIMEOUT")
            && let Ok(secs) = v.parse()
        {
            self.resolve_timeout_secs = secs;
        }
    }
}
