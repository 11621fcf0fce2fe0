// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Token slice helpers: parenthesis matching, keyword tests, text rebuild

use sqlsense_ir::{Position, Range, Token, TokenKind};

/// A token slice with precomputed parenthesis matches
pub struct TokenSlice<'a> {
    tokens: &'a [Token],
    close_of: Vec<Option<usize>>,
    balanced: bool,
}

impl<'a> TokenSlice<'a> {
    /// Index the parentheses of `tokens`
    ///
    /// An unclosed `(` has no match; a stray `)` marks the slice unbalanced.
    pub fn new(tokens: &'a [Token]) -> Self {
        let mut close_of = vec![None; tokens.len()];
        let mut open = Vec::new();
        let mut balanced = true;
        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::ParenOpen => open.push(idx),
                TokenKind::ParenClose => match open.pop() {
                    Some(start) => close_of[start] = Some(idx),
                    None => balanced = false,
                },
                _ => {}
            }
        }
        Self {
            tokens,
            close_of,
            balanced: balanced && open.is_empty(),
        }
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_balanced(&self) -> bool {
        self.balanced
    }

    pub fn get(&self, idx: usize) -> Option<&'a Token> {
        self.tokens.get(idx)
    }

    /// Index of the `)` matching the `(` at `idx`
    pub fn close_of(&self, idx: usize) -> Option<usize> {
        self.close_of.get(idx).copied().flatten()
    }

    /// Index just past the group opened at `idx`; unclosed groups run to the end
    pub fn skip_group(&self, idx: usize) -> usize {
        self.close_of(idx).map_or(self.tokens.len(), |close| close + 1)
    }

    /// Tokens strictly inside the group opened at `idx`
    pub fn group_inner(&self, idx: usize) -> &'a [Token] {
        let end = self.close_of(idx).unwrap_or(self.tokens.len());
        &self.tokens[(idx + 1).min(end)..end]
    }

    /// Source range of the group opened at `idx`, parentheses included
    pub fn group_range(&self, idx: usize) -> Range {
        let end = self.skip_group(idx);
        range_of(&self.tokens[idx..end])
    }

    pub fn is_keyword(&self, idx: usize, keyword: &str) -> bool {
        self.get(idx).is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn is_any_keyword(&self, idx: usize, keywords: &[&str]) -> bool {
        self.get(idx).is_some_and(|t| t.is_any_keyword(keywords))
    }

    pub fn is_kind(&self, idx: usize, kind: TokenKind) -> bool {
        self.get(idx).is_some_and(|t| t.kind == kind)
    }

    /// Check if the group opened at `idx` holds a query
    pub fn is_query_group(&self, idx: usize) -> bool {
        self.is_kind(idx, TokenKind::ParenOpen) && starts_query(self.group_inner(idx))
    }
}

/// Check whether tokens start a query (`SELECT`, `WITH`, or a nested `(SELECT`)
pub fn starts_query(tokens: &[Token]) -> bool {
    match tokens.first() {
        Some(t) if t.is_any_keyword(&["SELECT", "WITH"]) => true,
        Some(t) if t.kind == TokenKind::ParenOpen => starts_query(&tokens[1..]),
        _ => false,
    }
}

/// Compare a token with a word regardless of keyword classification
pub fn word_is(token: &Token, word: &str) -> bool {
    matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
        && token.text.eq_ignore_ascii_case(word)
}

/// Source range from the first token start to the last token end
pub fn range_of(tokens: &[Token]) -> Range {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => Range::new(first.start(), last.end),
        _ => Range::default(),
    }
}

/// Split at `separator` tokens outside parentheses
pub fn split_top_level(tokens: &[Token], separator: TokenKind) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::ParenOpen => depth += 1,
            TokenKind::ParenClose => depth = depth.saturating_sub(1),
            kind if kind == separator && depth == 0 => {
                parts.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Display text of a single token, re-quoting bracketed identifiers
pub fn token_display(token: &Token) -> String {
    match token.kind {
        TokenKind::BracketedIdentifier => format!("[{}]", token.text.replace(']', "]]")),
        _ => token.text.clone(),
    }
}

/// Rebuild readable SQL text from tokens
///
/// Whitespace is normalized: no spaces around `.`, none inside parentheses
/// and none before `,`.
pub fn tokens_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if let Some(p) = prev {
            let tight = matches!(
                token.kind,
                TokenKind::Dot | TokenKind::Comma | TokenKind::ParenClose
            ) || matches!(p.kind, TokenKind::Dot | TokenKind::ParenOpen)
                || (token.kind == TokenKind::ParenOpen && p.is_name());
            if !tight {
                out.push(' ');
            }
        }
        out.push_str(&token_display(token));
        prev = Some(token);
    }
    out
}

/// End position of the last token, or `fallback` when empty
pub fn end_of(tokens: &[Token], fallback: Position) -> Position {
    tokens.last().map_or(fallback, |t| t.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsense_lexer::tokenize;

    #[test]
    fn test_paren_matching() {
        let tokens = tokenize("f(a, (b)) + (c");
        let slice = TokenSlice::new(&tokens);
        assert_eq!(slice.close_of(1), Some(7));
        assert_eq!(slice.close_of(4), Some(6));
        assert_eq!(slice.close_of(9), None);
        assert_eq!(slice.skip_group(9), tokens.len());
        assert!(!slice.is_balanced());
    }

    #[test]
    fn test_split_top_level_ignores_nested_commas() {
        let tokens = tokenize("a, COALESCE(b, c), d");
        let parts = split_top_level(&tokens, TokenKind::Comma);
        assert_eq!(parts.len(), 3);
        assert_eq!(tokens_text(parts[1]), "COALESCE(b, c)");
    }

    #[test]
    fn test_tokens_text_normalizes_spacing() {
        let tokens = tokenize("CAST( u . id   AS  varchar(10) )");
        assert_eq!(tokens_text(&tokens), "CAST(u.id AS varchar(10))");
        let tokens = tokenize("[Order Details].[Qty]");
        assert_eq!(tokens_text(&tokens), "[Order Details].[Qty]");
    }

    #[test]
    fn test_query_group() {
        let tokens = tokenize("((SELECT 1)) (1, 2)");
        let slice = TokenSlice::new(&tokens);
        assert!(slice.is_query_group(0));
        assert!(!slice.is_query_group(6));
    }
}
