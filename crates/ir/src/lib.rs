// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlsense - Intermediate Representation
//!
//! This crate holds the data model shared by every stage of the pipeline:
//!
//! - [`Token`]: lexical elements produced by the tokenizer
//! - [`Batch`]: a `GO`-delimited slice of a buffer with its active database
//! - [`StatementChunk`]: one parsed statement with its tables, columns, CTEs,
//!   subqueries and clause positions
//! - [`TempTable`]: `#local` / `##global` temp tables created inside a buffer
//! - [`TableDescriptor`] / [`ColumnDescriptor`]: metadata returned by the
//!   external metadata resolver
//!
//! Positions are 1-based (`line`, `col`) throughout.

pub mod ident;
pub mod issue;
pub mod metadata;
pub mod query;
pub mod span;
pub mod token;

// Re-export commonly used types
pub use ident::{ident_eq, strip_brackets};
pub use issue::{IssueKind, ParseIssue, Severity};
pub use metadata::{
    ColumnDescriptor, FunctionMetadata, FunctionType, TableDescriptor, TableKind,
};
pub use query::{
    Batch, ClauseName, ClausePosition, ColumnRef, CteDef, StatementChunk, StatementType,
    SubqueryDef, SubqueryKind, TableRef, TempTable, TempTableKind,
};
pub use span::{Position, Range};
pub use token::{Token, TokenKind};
