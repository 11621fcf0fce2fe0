// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlsense lexer
//!
//! Text-level stages of the pipeline, in the order they run:
//!
//! 1. [`sanitizer`]: comment removal and literal/comment span detection
//! 2. [`batch`]: `GO` batch splitting and `USE` database threading
//! 3. [`tokenizer`]: flat token stream with 1-based positions
//!
//! None of these stages fail. Unterminated strings, brackets and comments
//! simply leave the scanner in that state at end of input.

pub mod batch;
pub mod sanitizer;
pub mod tokenizer;

pub use batch::{
    BatchSlice, DebugInfo, UseSegment, extract_database_name, go_separator_lines, is_go_line,
    parse_query, parse_use_statements, split_batches, split_by_go,
};
pub use sanitizer::{
    LiteralSpan, SanitizeStats, ScannerState, SpanKind, line_start_states, literal_spans,
    mask_comments, remove_comments, state_at,
};
pub use tokenizer::{Tokenizer, is_keyword, tokenize};
