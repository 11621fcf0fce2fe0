// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Function Registry
//!
//! Catalogue of SQL Server builtin functions.
//!
//! The type checker asks it which functions are aggregates, conversions or
//! conditionals, and which need a numeric argument. The context detector
//! offers its names in expression positions and its table-valued functions
//! after `FROM`.
//!
//! ## Usage
//!
//! ```
//! use sqlsense_function_registry::{FunctionRegistry, FunctionType};
//!
//! let registry = FunctionRegistry::new();
//! let count = registry.get_function("count").unwrap();
//! assert_eq!(count.function_type, FunctionType::Aggregate);
//! ```

pub mod builtin;
pub mod registry;

// Re-exports from ir for convenience
pub use sqlsense_ir::{FunctionMetadata, FunctionType};

pub use registry::FunctionRegistry;
