// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlsense parser
//!
//! Fault-tolerant T-SQL statement parser.
//!
//! The parser works on the token stream from `sqlsense-lexer` and never
//! fails: partial statements produce partial [`StatementChunk`]s carrying
//! [`ParseIssue`]s for structural problems.
//!
//! ## Entry points
//!
//! - [`parse_chunk`]: one statement's tokens to a chunk
//! - [`split_statements`]: statement boundaries inside a batch
//! - [`parse_buffer`]: a whole editor buffer, `GO` batches and `USE` included
//! - [`parse_batch`]: one [`Batch`] from `sqlsense_lexer::parse_query`
//!
//! [`StatementChunk`]: sqlsense_ir::StatementChunk
//! [`ParseIssue`]: sqlsense_ir::ParseIssue
//! [`Batch`]: sqlsense_ir::Batch

mod buffer;
mod columns;
mod cte;
pub mod cursor;
mod parse;
mod statement;
mod tables;
mod temp_table;

pub use buffer::{ParsedBuffer, parse_batch, parse_buffer};
pub use columns::cast_type as cast_target_type;
pub use cursor::{TokenSlice, split_top_level, tokens_text};
pub use parse::{MAX_NESTING, parse_chunk};
pub use statement::{split_statements, statement_type};
pub use temp_table::column_definitions;
