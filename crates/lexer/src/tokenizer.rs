// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Tokenizer
//!
//! Converts SQL text into a flat token stream with 1-based positions.
//!
//! Numbers are digit runs only. A `.` is always its own `dot` token, so
//! `3.14` is `number`, `dot`, `number`, the same shape as `alias.column`.
//! A digit run that runs into identifier characters (`5a`, `123table`) is a
//! single identifier. Signs are never folded into numbers.

use sqlsense_ir::{Position, Token, TokenKind};

/// Reserved words classified as [`TokenKind::Keyword`]
///
/// Built-in functions (`CAST`, `COALESCE`, ...) and common column names are
/// deliberately absent so they tokenize as identifiers.
const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "APPLY", "AS", "ASC", "BEGIN", "BETWEEN", "BREAK", "BY",
    "CASCADE", "CASE", "CHECK", "CLUSTERED", "COLLATE", "COLUMN", "COMMIT", "CONSTRAINT",
    "CONTINUE", "CREATE", "CROSS", "CURSOR", "DECLARE", "DEFAULT", "DELETE", "DESC", "DISTINCT",
    "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "FETCH", "FOR", "FOREIGN",
    "FROM", "FULL", "FUNCTION", "GO", "GOTO", "GRANT", "GROUP", "HAVING", "IDENTITY", "IF", "IN",
    "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "MATCHED",
    "MERGE", "NEXT", "NOCHECK", "NONCLUSTERED", "NOT", "NULL", "OF", "OFF", "OFFSET", "ON",
    "ONLY", "OPTION", "OR", "ORDER", "OUTER", "OUTPUT", "OVER", "PARTITION", "PERCENT", "PIVOT",
    "PRIMARY", "PRINT", "PROC", "PROCEDURE", "REFERENCES", "RETURN", "RETURNS", "RIGHT",
    "ROLLBACK", "ROWS", "SCHEMA", "SELECT", "SET", "TABLE", "THEN", "TIES", "TOP", "TRAN",
    "TRANSACTION", "TRIGGER", "TRUNCATE", "UNION", "UNIQUE", "UNPIVOT", "UPDATE", "USE", "USING",
    "VALUES", "VIEW", "WHEN", "WHERE", "WHILE", "WITH",
];

const TWO_CHAR_OPERATORS: &[&str] = &[
    "<>", "!=", "<=", ">=", "!<", "!>", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "::",
];

/// Check if a word is a reserved keyword (case-insensitive)
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '@' | '#')
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// Streaming tokenizer over one piece of SQL text
///
/// # Examples
///
/// ```
/// use sqlsense_lexer::Tokenizer;
/// use sqlsense_ir::TokenKind;
///
/// let tokens = Tokenizer::new("SELECT u.id FROM users u").tokenize();
/// assert_eq!(tokens[0].kind, TokenKind::Keyword);
/// assert_eq!(tokens[2].kind, TokenKind::Dot);
/// ```
pub struct Tokenizer<'a> {
    chars: Vec<char>,
    source: &'a str,
    idx: usize,
    line: usize,
    col: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer starting at line 1, column 1
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            source,
            idx: 0,
            line: 1,
            col: 1,
        }
    }

    /// Builder method: position of the first character of `source`
    ///
    /// Used when tokenizing a slice of a larger buffer.
    pub fn with_start(mut self, line: usize, col: usize) -> Self {
        self.line = line;
        self.col = col;
        self
    }

    /// Source text being tokenized
    pub fn source(&self) -> &'a str {
        self.source
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.idx).copied()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek(0) {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
    }

    fn skip_comment(&mut self) -> bool {
        match (self.peek(0), self.peek(1)) {
            (Some('-'), Some('-')) => {
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.bump();
                }
                true
            }
            (Some('/'), Some('*')) => {
                self.bump();
                self.bump();
                let mut depth = 1;
                while depth > 0 && self.peek(0).is_some() {
                    match (self.peek(0), self.peek(1)) {
                        (Some('/'), Some('*')) => {
                            depth += 1;
                            self.bump();
                        }
                        (Some('*'), Some('/')) => {
                            depth -= 1;
                            self.bump();
                        }
                        _ => {}
                    }
                    self.bump();
                }
                true
            }
            _ => false,
        }
    }

    /// Read a delimited literal, returning its raw text
    ///
    /// The opening delimiter must be the current character. A doubled
    /// closing delimiter is an escape. Unterminated literals run to the end.
    fn read_delimited(&mut self, close: char, strip: bool) -> String {
        let mut raw = String::new();
        let mut inner = String::new();
        if let Some(open) = self.bump() {
            raw.push(open);
        }
        while let Some(c) = self.bump() {
            raw.push(c);
            if c == close {
                if self.peek(0) == Some(close) {
                    self.bump();
                    raw.push(close);
                    inner.push(close);
                    continue;
                }
                break;
            }
            inner.push(c);
        }
        if strip { inner } else { raw }
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            while self.peek(0).is_some_and(char::is_whitespace) {
                self.bump();
            }
            if !self.skip_comment() {
                break;
            }
        }

        let start = self.position();
        let c = self.peek(0)?;
        let next = self.peek(1);

        let (kind, text) = match c {
            '0'..='9' => {
                let mut text = String::new();
                self.take_while(&mut text, |c| c.is_ascii_digit());
                if self.peek(0).is_some_and(is_ident_char) {
                    self.take_while(&mut text, is_ident_char);
                    (TokenKind::Identifier, text)
                } else {
                    (TokenKind::Number, text)
                }
            }
            'N' | 'n' if next == Some('\'') => {
                self.bump();
                let mut text = c.to_string();
                text.push_str(&self.read_delimited('\'', false));
                (TokenKind::String, text)
            }
            '\'' => (TokenKind::String, self.read_delimited('\'', false)),
            '[' => (
                TokenKind::BracketedIdentifier,
                self.read_delimited(']', true),
            ),
            '"' => (
                TokenKind::BracketedIdentifier,
                self.read_delimited('"', true),
            ),
            c if is_ident_start(c) => {
                let mut text = String::new();
                self.take_while(&mut text, is_ident_char);
                let kind = if is_keyword(&text) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                (kind, text)
            }
            '.' => {
                self.bump();
                (TokenKind::Dot, ".".to_string())
            }
            ',' => {
                self.bump();
                (TokenKind::Comma, ",".to_string())
            }
            '(' => {
                self.bump();
                (TokenKind::ParenOpen, "(".to_string())
            }
            ')' => {
                self.bump();
                (TokenKind::ParenClose, ")".to_string())
            }
            ';' => {
                self.bump();
                (TokenKind::Semicolon, ";".to_string())
            }
            _ => {
                let pair: String = [Some(c), next].iter().flatten().collect();
                if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                    self.bump();
                    self.bump();
                    (TokenKind::Operator, pair)
                } else {
                    self.bump();
                    (TokenKind::Operator, c.to_string())
                }
            }
        };

        Some(Token::new(kind, text, start.line, start.col).with_end(self.position()))
    }

    /// Consume the tokenizer and return every token
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tracing::trace!(count = tokens.len(), "tokenized");
        tokens
    }
}

/// Tokenize text that starts at line 1, column 1
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    #[test]
    fn test_decimal_is_number_dot_number() {
        assert_eq!(
            shape("12.34"),
            vec![
                tok(TokenKind::Number, "12"),
                tok(TokenKind::Dot, "."),
                tok(TokenKind::Number, "34"),
            ]
        );
    }

    #[test]
    fn test_digits_then_letters_is_identifier() {
        assert_eq!(shape("5a"), vec![tok(TokenKind::Identifier, "5a")]);
        assert_eq!(
            shape("123table"),
            vec![tok(TokenKind::Identifier, "123table")]
        );
    }

    #[test]
    fn test_sign_is_separate_operator() {
        assert_eq!(
            shape("-5"),
            vec![tok(TokenKind::Operator, "-"), tok(TokenKind::Number, "5")]
        );
        assert_eq!(
            shape("+7"),
            vec![tok(TokenKind::Operator, "+"), tok(TokenKind::Number, "7")]
        );
    }

    #[test]
    fn test_dot_edge_cases() {
        assert_eq!(
            shape("3.14.159"),
            vec![
                tok(TokenKind::Number, "3"),
                tok(TokenKind::Dot, "."),
                tok(TokenKind::Number, "14"),
                tok(TokenKind::Dot, "."),
                tok(TokenKind::Number, "159"),
            ]
        );
        assert_eq!(
            shape("5."),
            vec![tok(TokenKind::Number, "5"), tok(TokenKind::Dot, ".")]
        );
        assert_eq!(
            shape(".5"),
            vec![tok(TokenKind::Dot, "."), tok(TokenKind::Number, "5")]
        );
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("SELECT a\n  FROM t");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 8));
        assert_eq!((tokens[2].line, tokens[2].col), (2, 3));
        assert_eq!(tokens[2].end, Position::new(2, 7));
    }

    #[test]
    fn test_with_start_offsets_positions() {
        let tokens = Tokenizer::new("a\nb").with_start(10, 5).tokenize();
        assert_eq!((tokens[0].line, tokens[0].col), (10, 5));
        assert_eq!((tokens[1].line, tokens[1].col), (11, 1));
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            shape("'it''s' N'x' [a]]b] \"q\""),
            vec![
                tok(TokenKind::String, "'it''s'"),
                tok(TokenKind::String, "N'x'"),
                tok(TokenKind::BracketedIdentifier, "a]b"),
                tok(TokenKind::BracketedIdentifier, "q"),
            ]
        );
        let tokens = tokenize("[a]]b] x");
        assert_eq!(tokens[0].end, Position::new(1, 7));
    }

    #[test]
    fn test_variables_and_temp_names() {
        assert_eq!(
            shape("@id @@ROWCOUNT #t ##g"),
            vec![
                tok(TokenKind::Identifier, "@id"),
                tok(TokenKind::Identifier, "@@ROWCOUNT"),
                tok(TokenKind::Identifier, "#t"),
                tok(TokenKind::Identifier, "##g"),
            ]
        );
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_eq!(
            shape("a<>b,(c>=1);"),
            vec![
                tok(TokenKind::Identifier, "a"),
                tok(TokenKind::Operator, "<>"),
                tok(TokenKind::Identifier, "b"),
                tok(TokenKind::Comma, ","),
                tok(TokenKind::ParenOpen, "("),
                tok(TokenKind::Identifier, "c"),
                tok(TokenKind::Operator, ">="),
                tok(TokenKind::Number, "1"),
                tok(TokenKind::ParenClose, ")"),
                tok(TokenKind::Semicolon, ";"),
            ]
        );
    }

    #[test]
    fn test_keywords_keep_case() {
        let tokens = tokenize("select Name from t");
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].text, "select");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert!(is_keyword("FrOm"));
        assert!(!is_keyword("COALESCE"));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            shape("a -- x\n/* y /* z */ */ b"),
            vec![tok(TokenKind::Identifier, "a"), tok(TokenKind::Identifier, "b")]
        );
    }
}
