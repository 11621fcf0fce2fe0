// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Whole-buffer parsing
//!
//! Positions in the returned chunks are buffer positions: comments are
//! masked rather than removed, and the lexer's `GO` separator lines split
//! the token stream so no text is ever cut out before tokenizing.

use crate::parse::parse_chunk;
use crate::statement::split_statements;
use serde::{Deserialize, Serialize};
use sqlsense_ir::{Batch, StatementChunk, StatementType, Token};
use sqlsense_lexer::{Tokenizer, go_separator_lines, mask_comments};
use std::ops::Range as IndexRange;
use tracing::{debug, instrument};

/// Every statement of a buffer, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBuffer {
    pub chunks: Vec<StatementChunk>,
    /// Number of `GO` batches, empty ones included
    pub batch_count: usize,
}

impl ParsedBuffer {
    /// Innermost top-level chunk whose range contains `line`
    pub fn chunk_at_line(&self, line: usize) -> Option<&StatementChunk> {
        self.chunks
            .iter()
            .find(|c| c.start_line <= line && line <= c.end_line)
    }

    /// Every chunk of one `GO` batch
    pub fn batch(&self, index: usize) -> impl Iterator<Item = &StatementChunk> {
        self.chunks.iter().filter(move |c| c.go_batch_index == index)
    }
}

/// Token ranges between `GO` separator lines
///
/// Every token on a separator line belongs to the separator.
fn split_go_batches(tokens: &[Token], separators: &[usize]) -> Vec<IndexRange<usize>> {
    let mut batches = Vec::with_capacity(separators.len() + 1);
    let mut start = 0;
    for &line in separators {
        let end = start + tokens[start..].partition_point(|t| t.line < line);
        batches.push(start..end);
        start = end + tokens[end..].partition_point(|t| t.line == line);
    }
    batches.push(start..tokens.len());
    batches
}

/// Stamp the `GO` batch index on a chunk and everything nested in it
fn set_batch_index(chunk: &mut StatementChunk, batch: usize) {
    chunk.go_batch_index = batch;
    if let Some(temp) = chunk.temp_table.as_mut() {
        temp.created_in_batch = batch;
    }
    for cte in &mut chunk.ctes {
        set_batch_index(&mut cte.defining_chunk, batch);
    }
    for subquery in &mut chunk.subqueries {
        set_batch_index(&mut subquery.chunk, batch);
    }
}

/// Parse every statement of an editor buffer
///
/// `USE` statements switch the database recorded on the chunks that follow
/// them, across `GO` boundaries; `default_database` applies until the first.
#[instrument(skip(source), fields(len = source.len()))]
pub fn parse_buffer(source: &str, default_database: Option<&str>) -> ParsedBuffer {
    let masked = mask_comments(source);
    let tokens = Tokenizer::new(&masked).tokenize();
    let batches = split_go_batches(&tokens, &go_separator_lines(&masked));

    let mut database = default_database.map(str::to_string);
    let mut chunks = Vec::new();
    for (index, range) in batches.iter().enumerate() {
        let batch_tokens = &tokens[range.clone()];
        for statement in split_statements(batch_tokens) {
            let mut chunk = parse_chunk(&batch_tokens[statement]);
            set_batch_index(&mut chunk, index);
            if chunk.statement_type == StatementType::Use && chunk.database.is_some() {
                database = chunk.database.clone();
            } else {
                chunk.database = database.clone();
            }
            chunks.push(chunk);
        }
    }

    debug!(
        chunks = chunks.len(),
        batches = batches.len(),
        "parsed buffer"
    );
    ParsedBuffer {
        chunks,
        batch_count: batches.len(),
    }
}

/// Parse the statements of one batch produced by `parse_query`
///
/// Lines are offset by the batch's `start_line`; every chunk carries the
/// batch's database.
pub fn parse_batch(batch: &Batch) -> Vec<StatementChunk> {
    let masked = mask_comments(&batch.sql);
    let tokens = Tokenizer::new(&masked)
        .with_start(batch.start_line, 1)
        .tokenize();
    split_statements(&tokens)
        .into_iter()
        .map(|statement| {
            let mut chunk = parse_chunk(&tokens[statement]);
            set_batch_index(&mut chunk, batch.batch_number);
            chunk.database = batch.database.clone();
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_separators_on_token_stream() {
        let parsed = parse_buffer(
            "CREATE TABLE #t (Id int)\nGO 2\nSELECT * FROM #t\nGO\n\nGO\nSELECT 'GO'",
            None,
        );
        assert_eq!(parsed.batch_count, 4);
        let batches: Vec<_> = parsed.chunks.iter().map(|c| c.go_batch_index).collect();
        assert_eq!(batches, vec![0, 1, 3]);
        assert_eq!(
            parsed.chunks[0].temp_table.as_ref().map(|t| t.created_in_batch),
            Some(0)
        );
    }

    #[test]
    fn test_batches_agree_with_lexer() {
        let cases = [
            (
                "SELECT 1\n/* c */ GO\nSELECT 2\nGO -- c\nGO 3\nSELECT 3\nGO\nGO\nSELECT 4",
                6,
                vec![0, 1, 3, 5],
            ),
            ("SELECT 'a\nGO\nb'\nGO\nSELECT 2", 2, vec![0, 1]),
            ("SELECT 1 GO\nSELECT [GO]", 1, vec![0, 0]),
        ];
        for (source, batch_count, expected) in cases {
            let parsed = parse_buffer(source, None);
            assert_eq!(parsed.batch_count, batch_count, "{source}");
            let indices: Vec<_> = parsed.chunks.iter().map(|c| c.go_batch_index).collect();
            assert_eq!(indices, expected, "{source}");

            let (batches, _) = sqlsense_lexer::parse_query(source, None);
            let mut numbers: Vec<_> = batches.iter().map(|b| b.batch_number).collect();
            let mut chunk_batches = indices.clone();
            numbers.dedup();
            chunk_batches.dedup();
            assert_eq!(numbers, chunk_batches, "{source}");
        }
    }

    #[test]
    fn test_positions_survive_comments() {
        let parsed = parse_buffer("/* header */ SELECT a -- note\nFROM t", None);
        let chunk = &parsed.chunks[0];
        assert_eq!(chunk.range.start.col, 14);
        assert_eq!(chunk.tables[0].range.start.line, 2);
        assert_eq!(chunk.tables[0].range.start.col, 6);
    }

    #[test]
    fn test_use_threads_database() {
        let parsed = parse_buffer("SELECT 1\nUSE Sales\nGO\nSELECT 2", Some("master"));
        let databases: Vec<_> = parsed.chunks.iter().map(|c| c.database.as_deref()).collect();
        assert_eq!(databases, vec![Some("master"), Some("Sales"), Some("Sales")]);
        assert_eq!(parsed.chunk_at_line(4).map(|c| c.go_batch_index), Some(1));
    }

    #[test]
    fn test_parse_batch_offsets_lines() {
        let (batches, _) = sqlsense_lexer::parse_query("SELECT 1\nGO\nSELECT a\nFROM t", None);
        let chunks = parse_batch(&batches[1]);
        assert_eq!(chunks[0].start_line, 3);
        assert_eq!(chunks[0].tables[0].range.start.line, 4);
        assert_eq!(chunks[0].go_batch_index, 1);
    }
}
