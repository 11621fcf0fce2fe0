// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for semantic analysis
//!
//! Scope lookups and column resolution report failures as values. Callers on
//! the completion path log them and fall back to an empty result.

use sqlsense_catalog::CatalogError;
use thiserror::Error;

/// Result type alias for semantic operations
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that can occur during semantic analysis
#[derive(Debug, Error, Clone)]
pub enum SemanticError {
    /// Table not found in the current scope or any parent scopes
    #[error("Table not found in scope: {0}")]
    TableNotFound(String),

    /// Column not found in any visible table
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Column reference is ambiguous (found in multiple tables)
    #[error("Ambiguous column reference: {0} (found in {1:?})")]
    AmbiguousColumn(String, Vec<String>),

    /// Scope id outside the tree
    #[error("Invalid scope reference: {0}")]
    InvalidScope(usize),

    /// A CTE body refers to a CTE declared after it
    #[error("CTE '{cte}' cannot reference '{target}', which is declared after it")]
    CteForwardReference { cte: String, target: String },

    /// Nested scopes or CTE expansion went deeper than the configured limit
    #[error("Scope depth limit ({limit}) exceeded")]
    DepthLimit { limit: usize },

    /// The metadata resolver failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
