// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Cursor text utilities
//!
//! Editors report a cursor as a 1-based line and a 1-based column counting
//! characters. The sanitizer works on byte offsets and the tokenizer on
//! [`Position`]s; these helpers convert between the three and read the word
//! being typed.

use sqlsense_ir::Position;

/// Byte offset of a 1-based `(line, col)`
///
/// A column past the end of its line clamps to the line end; a line past the
/// end of input clamps to the input end. The result is always a char boundary.
pub fn offset_at(source: &str, line: usize, col: usize) -> usize {
    let mut offset = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let content = text.strip_suffix('\n').unwrap_or(text);
            let within = content
                .char_indices()
                .nth(col.saturating_sub(1))
                .map_or(content.len(), |(i, _)| i);
            return offset + within;
        }
        offset += text.len();
    }
    source.len()
}

/// 1-based position of byte `offset`, counting columns in characters
pub fn position_at(source: &str, offset: usize) -> Position {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Position::new(line, before[line_start..].chars().count() + 1)
}

/// Check if `c` can be part of an unquoted T-SQL identifier
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// The word under the cursor and what precedes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorWord {
    /// Text typed so far, without any opening `[`
    pub prefix: String,
    /// Character right before the prefix, `[` when inside an open bracket
    pub trigger: Option<char>,
    /// Name before a `.` that precedes the prefix, unescaped
    pub qualifier: Option<String>,
    /// The qualifier was bracketed, or the cursor sits inside `[`
    pub bracketed: bool,
    /// Byte offset where the qualified word starts
    pub start: usize,
}

impl CursorWord {
    /// Read the word ending at byte `offset`
    ///
    /// `in_bracket` is the scanner's verdict that the cursor is inside an
    /// unterminated `[...]`; the prefix then runs from that bracket.
    pub fn read(source: &str, offset: usize, in_bracket: bool) -> Self {
        let before = &source[..offset];

        let (prefix_start, head_end, trigger) = match before.rfind('[').filter(|_| in_bracket) {
            Some(open) => (open + 1, open, Some('[')),
            None => {
                let start = before
                    .char_indices()
                    .rev()
                    .take_while(|(_, c)| is_identifier_char(*c))
                    .last()
                    .map_or(offset, |(i, _)| i);
                (start, start, before[..start].chars().next_back())
            }
        };
        let prefix = unescape(&before[prefix_start..], ']');
        let head = &before[..head_end];

        let (qualifier, quoted, start) = match head.strip_suffix('.') {
            Some(rest) => match read_qualifier(rest) {
                Some((name, quoted, start)) => (Some(name), quoted, start),
                None => (None, false, head_end),
            },
            None => (None, false, head_end),
        };

        Self {
            prefix,
            trigger,
            qualifier,
            bracketed: quoted || in_bracket,
            start,
        }
    }
}

/// Name ending at the end of `text`: `[name]`, `"name"` or a bare identifier
fn read_qualifier(text: &str) -> Option<(String, bool, usize)> {
    if let Some(inner) = text.strip_suffix(']') {
        let open = inner.rfind('[')?;
        return Some((unescape(&inner[open + 1..], ']'), true, open));
    }
    if let Some(inner) = text.strip_suffix('"') {
        let open = inner.rfind('"')?;
        return Some((unescape(&inner[open + 1..], '"'), true, open));
    }
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let name = &text[start..];
    // `1.` is a number being typed
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((name.to_string(), false, start))
}

fn unescape(text: &str, close: char) -> String {
    let doubled: String = [close, close].iter().collect();
    text.replace(&doubled, &close.to_string())
}
