// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine Configuration
//!
//! This module provides configuration management for the engine.
//!
//! ## Configuration Structure
//!
//! The engine configuration includes:
//! - The database a buffer starts in before any `USE`
//! - The nesting guard for subqueries and CTE expansion
//! - Whether the metadata resolver is consulted at all
//! - An optional JSON catalog file
//! - The default tracing filter
//!
//! Settings arrive either as a client payload keyed by `"sqlsense"` or as a
//! JSON file. Field names are camelCase in both.
//!
//! ## Example
//!
//! ```rust
//! use sqlsense::EngineConfig;
//! use serde_json::json;
//!
//! let settings = json!({ "sqlsense": { "defaultDatabase": "Sales", "maxScopeDepth": 8 } });
//! let config = EngineConfig::from_settings(&settings).unwrap().unwrap();
//! assert_eq!(config.default_database.as_deref(), Some("Sales"));
//! assert_eq!(config.max_scope_depth, 8);
//! assert!(config.resolve_columns);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use sqlsense_catalog::{CatalogError, ConnectionContext};
use tracing_subscriber::EnvFilter;

/// Key of the engine section in a settings payload
pub const SETTINGS_KEY: &str = "sqlsense";

/// Upper bound accepted for `max_scope_depth`
pub const MAX_SCOPE_DEPTH_LIMIT: usize = 256;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Database in effect before the first `USE`
    pub default_database: Option<String>,

    /// Deepest subquery or CTE nesting that is expanded
    pub max_scope_depth: usize,

    /// Ask the metadata resolver for real table columns
    pub resolve_columns: bool,

    /// JSON catalog loaded as the metadata resolver
    pub catalog_path: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_database: None,
            max_scope_depth: 32,
            resolve_columns: true,
            catalog_path: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration starting in `database`
    pub fn new(default_database: Option<String>) -> Self {
        Self {
            default_database,
            ..Default::default()
        }
    }

    /// Builder method: load metadata from a JSON catalog file
    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Validate the configuration
    ///
    /// Checks that:
    /// - The scope depth is between 1 and [`MAX_SCOPE_DEPTH_LIMIT`]
    /// - The catalog file, when set, exists
    /// - The log filter parses as a tracing directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_scope_depth == 0 || self.max_scope_depth > MAX_SCOPE_DEPTH_LIMIT {
            return Err(ConfigError::InvalidScopeDepth {
                depth: self.max_scope_depth,
            });
        }

        if let Some(path) = &self.catalog_path
            && !path.is_file()
        {
            return Err(ConfigError::MissingCatalog { path: path.clone() });
        }

        if let Some(database) = &self.default_database
            && database.trim().is_empty()
        {
            return Err(ConfigError::EmptyDatabase);
        }

        EnvFilter::try_new(&self.log_filter).map_err(|err| ConfigError::InvalidLogFilter {
            filter: self.log_filter.clone(),
            reason: err.to_string(),
        })?;

        Ok(())
    }

    /// Parse engine config from a client settings payload
    ///
    /// Expected shape:
    /// {
    ///   "sqlsense": {
    ///     "defaultDatabase": "...",
    ///     "maxScopeDepth": 32,
    ///     "resolveColumns": true,
    ///     "catalogPath": "...",
    ///     "logFilter": "warn"
    ///   }
    /// }
    ///
    /// Returns `Ok(None)` when the payload has no `"sqlsense"` section.
    /// Missing fields keep their defaults.
    pub fn from_settings(settings: &Value) -> Result<Option<Self>, ConfigError> {
        let Some(section) = settings.get(SETTINGS_KEY) else {
            return Ok(None);
        };
        let config = Self::deserialize(section).map_err(ConfigError::Settings)?;
        Ok(Some(config))
    }

    /// Load a configuration file
    ///
    /// The file holds either a settings payload or the bare section. A
    /// relative `catalogPath` is taken relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(ConfigError::Settings)?;

        let mut config = match Self::from_settings(&value)? {
            Some(config) => config,
            None => Self::deserialize(&value).map_err(ConfigError::Settings)?,
        };

        if let (Some(catalog), Some(dir)) = (&config.catalog_path, path.parent())
            && catalog.is_relative()
        {
            config.catalog_path = Some(dir.join(catalog));
        }
        Ok(config)
    }

    /// Connection context handed to the metadata resolver
    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext::new(self.default_database.clone())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Scope depth outside the accepted range
    #[error("max_scope_depth must be between 1 and {MAX_SCOPE_DEPTH_LIMIT}, got {depth}")]
    InvalidScopeDepth { depth: usize },

    /// Catalog path that does not name a file
    #[error("Catalog file not found: {}", path.display())]
    MissingCatalog { path: PathBuf },

    /// Blank default database
    #[error("Default database must not be empty")]
    EmptyDatabase,

    /// Log filter that tracing cannot parse
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidLogFilter { filter: String, reason: String },

    /// Configuration file could not be read
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings of the wrong shape
    #[error("Invalid settings: {0}")]
    Settings(#[source] serde_json::Error),

    /// Catalog-related error
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),
}
