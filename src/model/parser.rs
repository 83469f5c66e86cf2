// File: ./src/model/parser.rs
// Splits board markdown into columns and cards
use crate::model::{Card, Column};
use crate::render::Renderer;
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::Path;

/// How many card bodies may be rendering at once.
const RENDER_WIDTH: usize = 4;

/// Columns with this name (case-insensitive) and everything after them are
/// never part of the board.
const ARCHIVE_COLUMN: &str = "archive";

struct RawCard {
    body: String,
    completed: bool,
}

struct RawColumn {
    name: String,
    cards: Vec<RawCard>,
}

pub struct BoardParser {
    renderer: Renderer,
}

impl BoardParser {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }

    /// Any read failure yields an empty board, never an error.
    pub async fn parse_file(&self, path: &Path) -> Vec<Column> {
        match fs::read_to_string(path) {
            Ok(content) => self.parse(&content).await,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "could not read board file");
                Vec::new()
            }
        }
    }

    /// The scan itself is a synchronous line pass; card bodies are then
    /// rendered a few at a time, reassembled in source order.
    pub async fn parse(&self, content: &str) -> Vec<Column> {
        let mut columns = Vec::new();
        for raw in scan(content) {
            let cards: Vec<Card> = stream::iter(raw.cards)
                .map(|card| async move {
                    let html = self.renderer.render(&card.body).await;
                    Card {
                        text: card.body,
                        html,
                        completed: card.completed,
                    }
                })
                .buffered(RENDER_WIDTH)
                .collect()
                .await;
            columns.push(Column {
                name: raw.name,
                cards,
            });
        }
        columns
    }
}

/// Line state machine: outside a column every line is ignored until a `##`
/// heading opens one; inside, checkbox lines become cards. The first
/// archive heading ends the document early.
fn scan(content: &str) -> Vec<RawColumn> {
    let mut columns = Vec::new();
    let mut current: Option<RawColumn> = None;

    for line in content.lines() {
        let line = line.trim();

        if let Some(name) = match_header(line) {
            flush(&mut columns, current.take());
            if name.eq_ignore_ascii_case(ARCHIVE_COLUMN) {
                return columns;
            }
            current = Some(RawColumn {
                name: name.to_string(),
                cards: Vec::new(),
            });
            continue;
        }

        if let Some(column) = current.as_mut()
            && let Some((marker, body)) = match_card(line)
        {
            column.cards.push(RawCard {
                body: normalize_body(body),
                completed: marker == 'x',
            });
        }
    }

    flush(&mut columns, current);
    columns
}

/// Archive-named columns are refused here, which covers both the early
/// stop and a document that ends right at the archive heading.
fn flush(columns: &mut Vec<RawColumn>, column: Option<RawColumn>) {
    if let Some(column) = column
        && !column.name.eq_ignore_ascii_case(ARCHIVE_COLUMN)
    {
        columns.push(column);
    }
}

/// `## <name>` with exactly two `#`.
fn match_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let name = rest.trim();
    if name.is_empty() { None } else { Some(name) }
}

/// `- [ ] <body>` or `- [x] <body>`; lowercase `x` only, any other bracket
/// content is not a card. Whitespace runs between the parts are fine.
fn match_card(line: &str) -> Option<(char, &str)> {
    let rest = skip_whitespace(line.strip_prefix('-')?)?;
    let rest = rest.strip_prefix('[')?;
    let mut chars = rest.chars();
    let marker = chars.next()?;
    if marker != ' ' && marker != 'x' {
        return None;
    }
    let rest = chars.as_str().strip_prefix(']')?;
    let body = skip_whitespace(rest)?;
    if body.is_empty() {
        return None;
    }
    Some((marker, body))
}

/// At least one whitespace character, then the rest.
fn skip_whitespace(s: &str) -> Option<&str> {
    let trimmed = s.trim_start();
    if trimmed.len() == s.len() {
        return None;
    }
    Some(trimmed)
}

/// Strip one redundant leading list marker, then leading whitespace.
fn normalize_body(body: &str) -> String {
    strip_redundant_marker(body).trim_start().to_string()
}

fn strip_redundant_marker(body: &str) -> &str {
    for marker in ['-', '*', '+'] {
        if let Some(rest) = body.strip_prefix(marker)
            && rest.starts_with(|c: char| c.is_whitespace())
        {
            return rest;
        }
    }

    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0
        && let Some(rest) = body[digits..].strip_prefix('.')
        && rest.starts_with(|c: char| c.is_whitespace())
    {
        return rest;
    }

    body
}
