// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Tokens
//!
//! Flat lexical elements produced by the tokenizer. A token is immutable once
//! produced and owned by the chunk whose text it was cut from.

use crate::span::{Position, Range};
use serde::{Deserialize, Serialize};

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Number,
    Identifier,
    Keyword,
    Operator,
    String,
    BracketedIdentifier,
    Dot,
    Comma,
    ParenOpen,
    ParenClose,
    Semicolon,
}

/// A lexical token with its 1-based start position
///
/// `text` is the token as written, except for bracketed identifiers where the
/// delimiters are stripped and doubled closing delimiters are unescaped.
/// `end` is the exclusive end position in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
    pub end: Position,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        let text = text.into();
        let end = Position::new(line, col + text.chars().count());
        Self {
            kind,
            text,
            line,
            col,
            end,
        }
    }

    /// Builder method: set the exclusive end position
    pub fn with_end(mut self, end: Position) -> Self {
        self.end = end;
        self
    }

    /// Start position of the token
    pub fn start(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Source range covered by the token
    pub fn range(&self) -> Range {
        Range::new(self.start(), self.end)
    }

    /// Check if this is the given keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Check if this is any of the given keywords
    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    /// Check if this token can name an object (identifier or bracketed identifier)
    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::BracketedIdentifier
        )
    }

    /// Check if this is the given operator
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}
