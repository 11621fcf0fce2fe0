// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlsense - T-SQL intelligence engine
//!
//! This crate ties the pipeline crates together behind one facade and ships
//! the `sqlsense` command-line tool.
//!
//! ## Overview
//!
//! The engine provides:
//! - `GO` batch splitting with the active database of each batch
//! - Cursor context detection for completion
//! - Type compatibility checks for comparisons, aggregates and `CASE`
//! - Structural diagnostics per buffer
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Editor / CLI (sqlsense binary)      │
//! └──────────────┬──────────────────────────┘
//!                │ full buffer text + cursor
//!                ↓
//! ┌─────────────────────────────────────────┐
//! │                 Engine                  │
//! ├─────────────────────────────────────────┤
//! │  • parse_query / parse                  │
//! │  • detect / close_buffer                │
//! │  • check / diagnostics                  │
//! └──────────────┬──────────────────────────┘
//!                │
//!    ┌───────────┼─────────────┬──────────────┐
//!    ↓           ↓             ↓              ↓
//! ┌───────┐ ┌─────────┐ ┌────────────┐ ┌──────────┐
//! │ lexer │ │ parser  │ │  semantic  │ │ context  │
//! └───────┘ └─────────┘ └─────┬──────┘ └──────────┘
//!                             ↓
//!                     ┌──────────────┐
//!                     │   catalog    │
//!                     │  (resolver)  │
//!                     └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sqlsense::{BufferId, CompletionMode, Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let sql = "SELECT * FROM Orders o WHERE ";
//! let context = engine.detect(BufferId(0), sql, 1, sql.len() + 1);
//! assert_eq!(context.mode, CompletionMode::Where);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use logging::init_tracing;

// Re-export the types callers meet in engine signatures
pub use sqlsense_catalog::{MetadataResolver, StaticCatalog};
pub use sqlsense_context::{CompletionContext, CompletionMode};
pub use sqlsense_ir::{Batch, ParseIssue};
pub use sqlsense_semantic::{BranchKind, BufferId, Operand, Verdict, WarningKind};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const ENGINE_NAME: &str = "sqlsense";
