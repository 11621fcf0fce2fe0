// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Comment sanitizer
//!
//! A single left-to-right scan over the source with one explicit state:
//!
//! - `LineComment`: `--` up to the end of the line
//! - `BlockComment { depth }`: `/* ... */`, nested comments bump `depth`
//! - `String { delimiter }`: `'...'` or `"..."`, doubled delimiter escapes
//! - `Bracket`: `[...]`, doubled `]]` escapes
//!
//! `--` is tested before `/*`, so `--/*` opens a line comment. String and
//! bracket contents are never touched. Newlines are always kept so line
//! numbers stay stable downstream.

use serde::{Deserialize, Serialize};

/// Scanner state at a point in the source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ScannerState {
    #[default]
    Normal,
    LineComment,
    BlockComment {
        depth: usize,
    },
    String {
        delimiter: char,
    },
    Bracket,
}

impl ScannerState {
    /// Check if the scanner is inside a comment
    pub fn is_comment(&self) -> bool {
        matches!(
            self,
            ScannerState::LineComment | ScannerState::BlockComment { .. }
        )
    }

    /// Check if the scanner is inside a string, bracket or comment
    pub fn is_literal_or_comment(&self) -> bool {
        *self != ScannerState::Normal
    }
}

/// Kind of a literal or comment span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    String,
    Bracket,
    LineComment,
    BlockComment,
}

/// Byte range of a string, bracket or comment in the source
///
/// `end` is exclusive. Line comments end at their newline, which is not part
/// of the span. Unterminated spans run to the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralSpan {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    pub terminated: bool,
}

impl LiteralSpan {
    /// Check whether a cursor at byte `offset` sits inside the span
    ///
    /// A cursor right before the opening delimiter is outside, a cursor right
    /// after the closing delimiter is outside. A cursor at the end of a line
    /// comment is still inside it.
    pub fn contains_cursor(&self, offset: usize) -> bool {
        if offset <= self.start {
            return false;
        }
        match self.kind {
            SpanKind::LineComment => offset <= self.end,
            _ => offset < self.end || !self.terminated,
        }
    }
}

/// Counters collected while sanitizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeStats {
    pub line_comments: usize,
    pub block_comments: usize,
    pub max_block_depth: usize,
    /// State at end of input; anything but `Normal` means an unterminated span
    pub final_state: ScannerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Remove,
    Mask,
    Discard,
}

struct Scanner {
    chars: Vec<(usize, char)>,
    len: usize,
    idx: usize,
    state: ScannerState,
    output: Output,
    out: String,
    stats: SanitizeStats,
    spans: Vec<LiteralSpan>,
    span_start: usize,
    line_states: Vec<ScannerState>,
}

impl Scanner {
    fn new(source: &str, output: Output) -> Self {
        Self {
            chars: source.char_indices().collect(),
            len: source.len(),
            idx: 0,
            state: ScannerState::Normal,
            output,
            out: String::with_capacity(source.len()),
            stats: SanitizeStats::default(),
            spans: Vec::new(),
            span_start: 0,
            line_states: vec![ScannerState::Normal],
        }
    }

    fn offset(&self) -> usize {
        self.chars.get(self.idx).map_or(self.len, |(o, _)| *o)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).map(|(_, c)| *c)
    }

    /// Copy `n` characters to the output unchanged
    fn keep(&mut self, n: usize) {
        for _ in 0..n {
            let Some(&(_, c)) = self.chars.get(self.idx) else {
                return;
            };
            if self.output != Output::Discard {
                self.out.push(c);
            }
            self.advance(c);
        }
    }

    /// Consume `n` comment characters, keeping only newlines
    fn drop_comment(&mut self, n: usize) {
        for _ in 0..n {
            let Some(&(_, c)) = self.chars.get(self.idx) else {
                return;
            };
            match (self.output, c) {
                (Output::Discard, _) => {}
                (_, '\n') => self.out.push('\n'),
                (Output::Mask, _) => self.out.push(' '),
                (Output::Remove, _) => {}
            }
            self.advance(c);
        }
    }

    fn advance(&mut self, c: char) {
        self.idx += 1;
        if c == '\n' {
            self.line_states.push(self.state);
        }
    }

    fn open(&mut self, state: ScannerState) {
        self.span_start = self.offset();
        self.state = state;
    }

    fn close(&mut self, kind: SpanKind) {
        self.spans.push(LiteralSpan {
            kind,
            start: self.span_start,
            end: self.offset(),
            terminated: true,
        });
        self.state = ScannerState::Normal;
    }

    fn step(&mut self) {
        let Some(&(_, c)) = self.chars.get(self.idx) else {
            return;
        };
        let next = self.peek(1);

        match self.state {
            ScannerState::Normal => match (c, next) {
                ('-', Some('-')) => {
                    self.open(ScannerState::LineComment);
                    self.stats.line_comments += 1;
                    self.drop_comment(2);
                }
                ('/', Some('*')) => {
                    self.open(ScannerState::BlockComment { depth: 1 });
                    self.stats.block_comments += 1;
                    self.stats.max_block_depth = self.stats.max_block_depth.max(1);
                    // Keep the tokens on either side of the comment apart
                    if self.output == Output::Remove {
                        self.out.push(' ');
                    }
                    self.drop_comment(2);
                }
                ('\'', _) | ('"', _) => {
                    self.open(ScannerState::String { delimiter: c });
                    self.keep(1);
                }
                ('[', _) => {
                    self.open(ScannerState::Bracket);
                    self.keep(1);
                }
                _ => self.keep(1),
            },
            ScannerState::LineComment => {
                if c == '\n' {
                    self.close(SpanKind::LineComment);
                    self.keep(1);
                } else {
                    self.drop_comment(1);
                }
            }
            ScannerState::BlockComment { depth } => match (c, next) {
                ('/', Some('*')) => {
                    let depth = depth + 1;
                    self.stats.max_block_depth = self.stats.max_block_depth.max(depth);
                    self.state = ScannerState::BlockComment { depth };
                    self.drop_comment(2);
                }
                ('*', Some('/')) => {
                    self.drop_comment(2);
                    if depth == 1 {
                        self.close(SpanKind::BlockComment);
                    } else {
                        self.state = ScannerState::BlockComment { depth: depth - 1 };
                    }
                }
                _ => self.drop_comment(1),
            },
            ScannerState::String { delimiter } => {
                if c == delimiter {
                    if next == Some(delimiter) {
                        self.keep(2);
                    } else {
                        self.keep(1);
                        self.close(SpanKind::String);
                    }
                } else {
                    self.keep(1);
                }
            }
            ScannerState::Bracket => {
                if c == ']' {
                    if next == Some(']') {
                        self.keep(2);
                    } else {
                        self.keep(1);
                        self.close(SpanKind::Bracket);
                    }
                } else {
                    self.keep(1);
                }
            }
        }
    }

    /// Scan to the end of input, or until the cursor reaches `stop`
    fn run(&mut self, stop: Option<usize>) {
        while self.idx < self.chars.len() {
            if stop.is_some_and(|s| self.offset() >= s) {
                return;
            }
            self.step();
        }
        self.finish();
    }

    fn finish(&mut self) {
        let kind = match self.state {
            ScannerState::Normal => None,
            ScannerState::LineComment => Some(SpanKind::LineComment),
            ScannerState::BlockComment { .. } => Some(SpanKind::BlockComment),
            ScannerState::String { .. } => Some(SpanKind::String),
            ScannerState::Bracket => Some(SpanKind::Bracket),
        };
        if let Some(kind) = kind {
            self.spans.push(LiteralSpan {
                kind,
                start: self.span_start,
                end: self.len,
                // A line comment running to end of input is complete
                terminated: kind == SpanKind::LineComment,
            });
        }
        self.stats.final_state = self.state;
    }
}

/// Remove line and block comments, keeping every newline
///
/// A block comment is replaced by a single space plus the newlines it
/// contained, so tokens on either side never merge.
pub fn remove_comments(source: &str) -> (String, SanitizeStats) {
    let mut scanner = Scanner::new(source, Output::Remove);
    scanner.run(None);
    tracing::trace!(
        line_comments = scanner.stats.line_comments,
        block_comments = scanner.stats.block_comments,
        "removed comments"
    );
    (scanner.out, scanner.stats)
}

/// Replace comment characters with spaces, keeping newlines
///
/// Every non-comment character keeps its line and column.
pub fn mask_comments(source: &str) -> String {
    let mut scanner = Scanner::new(source, Output::Mask);
    scanner.run(None);
    scanner.out
}

/// All string, bracket and comment spans in source order
pub fn literal_spans(source: &str) -> Vec<LiteralSpan> {
    let mut scanner = Scanner::new(source, Output::Discard);
    scanner.run(None);
    scanner.spans
}

/// Scanner state for a cursor at byte `offset`
///
/// `offset` past the end of input yields the final state.
pub fn state_at(source: &str, offset: usize) -> ScannerState {
    let mut scanner = Scanner::new(source, Output::Discard);
    scanner.run(Some(offset));
    scanner.state
}

/// Scanner state at the start of every line
///
/// Entry `i` is the state when line `i + 1` begins. Used to ignore `GO`
/// lines that sit inside a multi-line string or comment.
pub fn line_start_states(source: &str) -> Vec<ScannerState> {
    let mut scanner = Scanner::new(source, Output::Discard);
    scanner.run(None);
    scanner.line_states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_line_comment_keeps_newline() {
        let (cleaned, stats) = remove_comments("SELECT 1 -- one\nFROM t");
        assert_eq!(cleaned, "SELECT 1 \nFROM t");
        assert_eq!(stats.line_comments, 1);
        assert_eq!(stats.final_state, ScannerState::Normal);
    }

    #[test]
    fn test_line_comment_wins_over_block_start() {
        let (cleaned, stats) = remove_comments("a --/* not a block\nb");
        assert_eq!(cleaned, "a \nb");
        assert_eq!(stats.block_comments, 0);
    }

    #[test]
    fn test_nested_block_comment_closes_at_depth_zero() {
        let (cleaned, stats) = remove_comments("a /* x /* y */ still */b");
        assert_eq!(cleaned, "a  b");
        assert_eq!(stats.max_block_depth, 2);
        assert_eq!(stats.final_state, ScannerState::Normal);
    }

    #[test]
    fn test_comment_markers_inside_literals_are_kept() {
        let source = "SELECT '--x', [a/*b], 'it''s /* no */'";
        let (cleaned, stats) = remove_comments(source);
        assert_eq!(cleaned, source);
        assert_eq!(stats.line_comments + stats.block_comments, 0);
    }

    #[test]
    fn test_escaped_bracket_does_not_close() {
        let source = "[a]]--b] -- c";
        let (cleaned, _) = remove_comments(source);
        assert_eq!(cleaned, "[a]]--b] ");
    }

    #[test]
    fn test_unterminated_states_are_reported() {
        assert_eq!(
            remove_comments("SELECT 'abc").1.final_state,
            ScannerState::String { delimiter: '\'' }
        );
        assert_eq!(
            remove_comments("/* a /* b */").1.final_state,
            ScannerState::BlockComment { depth: 1 }
        );
        assert_eq!(remove_comments("[abc").1.final_state, ScannerState::Bracket);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let inputs = [
            "SELECT a -- c\n/* x\n y */ FROM t",
            "-/**/-1",
            "//**/*",
            "SELECT 'x -- y' /* /* */ */ [z]",
            "a /* unterminated",
        ];
        for input in inputs {
            let once = remove_comments(input).0;
            let twice = remove_comments(&once).0;
            assert_eq!(once, twice, "input: {input:?}");
        }
    }

    #[test]
    fn test_line_count_is_stable() {
        let inputs = [
            "a -- x\nb",
            "/* 1\n2\n3 */ c\n",
            "'multi\nline' -- c\n/* x */",
        ];
        for input in inputs {
            let cleaned = remove_comments(input).0;
            assert_eq!(cleaned.lines().count(), input.lines().count());
            assert_eq!(cleaned.matches('\n').count(), input.matches('\n').count());
        }
    }

    #[test]
    fn test_mask_keeps_columns() {
        let masked = mask_comments("a /* x */ b -- c\nd");
        assert_eq!(masked, "a         b     \nd");
    }

    #[test]
    fn test_literal_spans() {
        let spans = literal_spans("SELECT 'a', [b] -- c");
        let kinds: Vec<_> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SpanKind::String, SpanKind::Bracket, SpanKind::LineComment]
        );
        assert_eq!((spans[0].start, spans[0].end), (7, 10));
    }

    #[test]
    fn test_cursor_inside_span() {
        let source = "SELECT 'abc' FROM t";
        let span = literal_spans(source)[0];
        assert!(!span.contains_cursor(7));
        assert!(span.contains_cursor(8));
        assert!(span.contains_cursor(11));
        assert!(!span.contains_cursor(12));

        let open = literal_spans("SELECT 'ab")[0];
        assert!(!open.terminated);
        assert!(open.contains_cursor(10));
    }

    #[test]
    fn test_state_at() {
        let source = "SELECT 'a' -- x\n[b";
        assert_eq!(state_at(source, 7), ScannerState::Normal);
        assert_eq!(state_at(source, 9), ScannerState::String { delimiter: '\'' });
        assert_eq!(state_at(source, 10), ScannerState::Normal);
        assert_eq!(state_at(source, 14), ScannerState::LineComment);
        assert_eq!(state_at(source, source.len()), ScannerState::Bracket);
    }

    #[test]
    fn test_line_start_states() {
        let states = line_start_states("a\n/* x\nGO\n*/\nb");
        assert_eq!(states.len(), 5);
        assert_eq!(states[0], ScannerState::Normal);
        assert!(states[2].is_comment());
        assert_eq!(states[4], ScannerState::Normal);
    }
}
