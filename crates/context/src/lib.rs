// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQLSense - Context Detection Layer
//!
//! This crate classifies a cursor position in a T-SQL buffer for completion.
//!
//! ## Overview
//!
//! Context detection sanitizes, parses and scopes the buffer, then decides
//! what the user is typing at the cursor: a column after `alias.`, a column
//! in a `WHERE` clause, a table after `FROM`, a keyword at statement start,
//! or nothing at all inside a string or comment.
//!
//! ## Core Concepts
//!
//! ### Completion Context
//!
//! The [`completion::CompletionContext`] struct carries the
//! [`completion::CompletionMode`], the typed prefix, the tables, CTEs and
//! temp tables in scope and the columns and keywords the mode offers.
//!
//! ### Cursor Utilities
//!
//! The [`cursor`] module converts editor positions to byte offsets and reads
//! the word and qualifier left of the cursor.
//!
//! ### Keywords
//!
//! The [`keywords`] module provides T-SQL keyword definitions organized by
//! context.
//!
//! ## Examples
//!
//! ```rust
//! use sqlsense_context::{CompletionMode, detect};
//!
//! let sql = "SELECT * FROM Employees e WHERE ";
//! let context = detect(sql, 1, sql.len() + 1);
//! assert_eq!(context.mode, CompletionMode::Where);
//! assert_eq!(context.table_names(), vec!["e"]);
//! ```

pub mod completion;
pub mod cursor;
pub mod keywords;

// Re-export commonly used types
pub use completion::{CompletionContext, CompletionMode, ContextDetector, detect};
pub use cursor::{CursorWord, offset_at, position_at};
pub use keywords::{KeywordProvider, KeywordSet, SqlKeyword};
