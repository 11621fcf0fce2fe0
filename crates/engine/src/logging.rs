// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Tracing bootstrap for binaries embedding the engine
//!
//! Library crates only emit events; installing the subscriber is left to
//! the process that owns stderr.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::ConfigError;
use crate::error::{EngineError, EngineResult};

/// Filter from `RUST_LOG`, falling back to `default_filter`
pub fn env_filter(default_filter: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(default_filter).map_err(|err| ConfigError::InvalidLogFilter {
            filter: default_filter.to_string(),
            reason: err.to_string(),
        })
    })
}

/// Install a global fmt subscriber writing to stderr
///
/// Fails when a subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> EngineResult<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_filter)?)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| EngineError::Logging(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_rejects_bad_default() {
        // Only meaningful when RUST_LOG is not set for the test run
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(env_filter("sqlsense=[").is_err());
            assert!(env_filter("sqlsense_context=debug,warn").is_ok());
        }
    }
}
