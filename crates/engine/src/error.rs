// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine errors

use sqlsense_catalog::CatalogError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while building or running an [`Engine`](crate::Engine)
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected by validation or loading
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The configured catalog could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A global tracing subscriber is already installed
    #[error("Failed to install tracing subscriber: {0}")]
    Logging(String),
}
