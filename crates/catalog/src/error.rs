// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for Catalog operations

use serde::Serialize;
use thiserror::Error;

/// Result type alias for Catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while resolving metadata
#[derive(Debug, Error, Clone, Serialize)]
pub enum CatalogError {
    /// The metadata source could not be reached
    #[error("Metadata source unavailable: {0}")]
    Unavailable(String),

    /// Query execution timed out
    #[error("Metadata lookup timed out after {0}ms")]
    Timeout(u64),

    /// A qualified name names a schema the source does not have
    #[error("Invalid schema name: {0}")]
    InvalidSchema(String),

    /// Failed to read catalog data
    #[error("Failed to read catalog file '{path}': {message}")]
    Io { path: String, message: String },

    /// Failed to deserialize catalog data
    #[error("Failed to parse catalog data: {0}")]
    SerializationError(String),

    /// Permission denied for requested operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}
