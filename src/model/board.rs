// File: ./src/model/board.rs
use serde::Serialize;

/// A single checkbox task line.
///
/// `html` is the sanitized fragment the view layer may embed directly;
/// `text` keeps the normalized source body.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub text: String,
    pub html: String,
    pub completed: bool,
}

/// A named group of cards, sourced from one `##` heading. Identity is
/// positional; names are not required to be unique.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cards: Vec<Card>,
}
