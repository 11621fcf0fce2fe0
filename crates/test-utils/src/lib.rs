// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for sqlsense
//!
//! This crate provides common testing components including:
//! - A mock metadata resolver with a builder
//! - T-SQL fixtures and cursor-marker helpers
//! - A text-based test case format for context detection

pub mod assertions;
pub mod fixtures;
pub mod mock_catalog;
pub mod test_case_parser;
pub mod test_case_validator;

// Re-exports for convenience
pub use assertions::SqlAssertions;
pub use fixtures::SqlFixtures;
pub use mock_catalog::{MockCatalog, MockCatalogBuilder};
pub use test_case_parser::{ParseError, TestCase, parse_test_content, parse_test_file};
pub use test_case_validator::{
    ContextSnapshot, ValidationError, cursor_line_col, get_cursor_position, remove_cursor_marker,
    validate_context,
};
