// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Batch splitting
//!
//! A buffer is divided into batches at standalone `GO` lines, then each
//! batch is divided again at `USE <db>` directives. [`parse_query`] threads
//! the active database forward across both kinds of boundary.

use crate::sanitizer::{line_start_states, literal_spans, remove_comments};
use serde::{Deserialize, Serialize};
use sqlsense_ir::Batch;
use tracing::{debug, instrument};

/// One `GO`-delimited slice of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSlice {
    /// Trimmed batch text
    pub sql: String,
    /// Number of `GO` separators seen before this slice
    pub batch_number: usize,
    /// 1-based line of the first non-blank character
    pub start_line: usize,
}

/// Part of a batch governed by one `USE` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseSegment {
    /// Database named by the `USE` that opened this segment
    pub database: Option<String>,
    /// Trimmed text after the directive, without the directive itself
    pub sql: String,
    pub has_use: bool,
    /// Lines between the start of the batch and the first character of `sql`
    pub line_offset: usize,
}

/// Summary of a [`parse_query`] run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Number of `GO` batches that produced text
    pub batch_count: usize,
    /// Number of `USE` directives recognized
    pub use_statements: usize,
    /// Active database of each emitted batch, in order
    pub databases: Vec<Option<String>>,
}

/// Check if a line is a batch separator: `GO` with an optional repeat count
pub fn is_go_line(line: &str) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        Some(word) if word.eq_ignore_ascii_case("GO") => {}
        _ => return false,
    }
    match (words.next(), words.next()) {
        (None, _) => true,
        (Some(count), None) => count.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// 1-based numbers of the lines that separate batches, ascending
///
/// `GO` lines that start inside a string, bracket or comment do not count.
pub fn go_separator_lines(source: &str) -> Vec<usize> {
    let states = line_start_states(source);
    source
        .split('\n')
        .enumerate()
        .filter(|(idx, line)| {
            states
                .get(*idx)
                .is_none_or(|state| !state.is_literal_or_comment())
                && is_go_line(line)
        })
        .map(|(idx, _)| idx + 1)
        .collect()
}

/// Split source into `GO`-delimited slices
///
/// Separators are the lines of [`go_separator_lines`]. Blank slices between
/// separators are skipped, but a source without any separator always yields
/// exactly one slice.
pub fn split_batches(source: &str) -> Vec<BatchSlice> {
    let separators = go_separator_lines(source);
    let mut slices = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut first_line = 1;
    let mut batch_number = 0;

    for (idx, line) in source.split('\n').enumerate() {
        if separators.binary_search(&(idx + 1)).is_ok() {
            push_slice(&mut slices, &lines, first_line, batch_number);
            lines.clear();
            batch_number += 1;
            first_line = idx + 2;
            continue;
        }
        lines.push(line);
    }
    push_slice(&mut slices, &lines, first_line, batch_number);

    if slices.is_empty() && batch_number == 0 {
        slices.push(BatchSlice {
            sql: source.trim().to_string(),
            batch_number: 0,
            start_line: 1,
        });
    }
    slices
}

fn push_slice(slices: &mut Vec<BatchSlice>, lines: &[&str], first_line: usize, number: usize) {
    let text = lines.join("\n");
    let sql = text.trim();
    if sql.is_empty() {
        return;
    }
    let leading = text.len() - text.trim_start().len();
    slices.push(BatchSlice {
        sql: sql.to_string(),
        batch_number: number,
        start_line: first_line + text[..leading].matches('\n').count(),
    });
}

/// Split source into trimmed batch texts at standalone `GO` lines
pub fn split_by_go(source: &str) -> Vec<String> {
    split_batches(source).into_iter().map(|s| s.sql).collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// Check for the `USE` keyword at a word boundary starting at byte `at`
fn is_use_at(text: &str, at: usize) -> bool {
    let Some(word) = text.get(at..at + 3) else {
        return false;
    };
    if !word.eq_ignore_ascii_case("USE") {
        return false;
    }
    let before_ok = text[..at].chars().next_back().is_none_or(|c| !is_word_char(c));
    let after_ok = text[at + 3..].chars().next().is_some_and(|c| !is_word_char(c));
    before_ok && after_ok
}

/// Parse the database name following a `USE` keyword
///
/// `text` starts right after `USE`. Accepts a bare identifier or a
/// bracketed one (with `]]` escapes), terminated by whitespace, `;` or end
/// of input. Returns the name and the number of bytes consumed, including a
/// trailing `;` on the same line. Returns `None` when no name can be read.
pub fn extract_database_name(text: &str) -> Option<(String, usize)> {
    let trimmed = text.trim_start();
    let mut consumed = text.len() - trimmed.len();

    let name = if let Some(rest) = trimmed.strip_prefix('[') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut close = None;
        while let Some((idx, c)) = chars.next() {
            if c != ']' {
                name.push(c);
                continue;
            }
            if chars.peek().is_some_and(|(_, n)| *n == ']') {
                name.push(']');
                chars.next();
            } else {
                close = Some(idx);
                break;
            }
        }
        consumed += close? + 2;
        name
    } else {
        let len = trimmed
            .find(|c: char| !is_word_char(c))
            .unwrap_or(trimmed.len());
        consumed += len;
        trimmed[..len].to_string()
    };

    if name.is_empty() {
        return None;
    }

    let rest = &text[consumed..];
    match rest.chars().next() {
        None => {}
        Some(';') => consumed += 1,
        Some(c) if c.is_whitespace() => {
            let after = rest.trim_start_matches([' ', '\t']);
            if after.starts_with(';') {
                consumed += rest.len() - after.len() + 1;
            }
        }
        Some(_) => return None,
    }
    Some((name, consumed))
}

/// Divide one batch at its `USE` directives
///
/// Text before the first directive is returned with `database: None` and
/// only when it is not blank. Every recognized directive opens a segment,
/// even an empty one, so callers can thread the database forward. A `USE`
/// whose name cannot be read stays in the text as-is.
pub fn parse_use_statements(batch: &str) -> Vec<UseSegment> {
    let spans = literal_spans(batch);
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut database: Option<String> = None;
    let mut has_use = false;
    let mut at = 0;
    let mut next_span = 0;

    while at < batch.len() {
        // Spans are sorted and disjoint, and `at` only moves forward
        next_span += spans[next_span..].partition_point(|s| s.end <= at);
        if let Some(span) = spans.get(next_span).filter(|s| s.start <= at) {
            at = span.end;
            continue;
        }
        if is_use_at(batch, at) {
            if let Some((name, consumed)) = extract_database_name(&batch[at + 3..]) {
                push_segment(
                    &mut segments,
                    batch,
                    segment_start,
                    at,
                    database.take(),
                    has_use,
                );
                debug!(database = %name, "USE directive");
                database = Some(name);
                has_use = true;
                at += 3 + consumed;
                segment_start = at;
                continue;
            }
        }
        at += batch[at..].chars().next().map_or(1, char::len_utf8);
    }
    push_segment(
        &mut segments,
        batch,
        segment_start,
        batch.len(),
        database,
        has_use,
    );
    segments
}

fn push_segment(
    segments: &mut Vec<UseSegment>,
    batch: &str,
    start: usize,
    end: usize,
    database: Option<String>,
    has_use: bool,
) {
    let text = &batch[start..end];
    let sql = text.trim();
    if sql.is_empty() && !has_use {
        return;
    }
    let leading = text.len() - text.trim_start().len();
    segments.push(UseSegment {
        database,
        sql: sql.to_string(),
        has_use,
        line_offset: batch[..start + leading].matches('\n').count(),
    });
}

/// Sanitize, split and thread the active database through a buffer
///
/// Each returned [`Batch`] carries the database in effect for it: the most
/// recent `USE`, in this batch or an earlier one, else `buffer_database`.
#[instrument(skip(source), fields(len = source.len()))]
pub fn parse_query(source: &str, buffer_database: Option<&str>) -> (Vec<Batch>, DebugInfo) {
    let (cleaned, _) = remove_comments(source);
    let mut current = buffer_database.map(str::to_string);
    let mut batches = Vec::new();
    let mut info = DebugInfo::default();

    let slices = split_batches(&cleaned);
    for slice in &slices {
        for segment in parse_use_statements(&slice.sql) {
            if segment.has_use {
                current = segment.database.clone();
                info.use_statements += 1;
            }
            if segment.sql.is_empty() {
                continue;
            }
            info.databases.push(current.clone());
            batches.push(Batch {
                database: current.clone(),
                sql: segment.sql,
                original_had_use: segment.has_use,
                batch_number: slice.batch_number,
                start_line: slice.start_line + segment.line_offset,
            });
        }
    }
    info.batch_count = slices.iter().filter(|s| !s.sql.is_empty()).count();
    debug!(
        batches = batches.len(),
        go_batches = info.batch_count,
        "parsed query"
    );
    (batches, info)
}
