// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test case validation logic
//!
//! Checks a detected completion context against the expectations of a
//! [`TestCase`]. The context is passed as a [`ContextSnapshot`] so this
//! crate does not depend on the detector.

use crate::test_case_parser::TestCase;
use serde::{Deserialize, Serialize};
use sqlsense_ir::ident_eq;
use thiserror::Error;

/// The parts of a completion context a test case can assert on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Completion mode, snake_case
    pub mode: String,
    pub table_ref: Option<String>,
    /// Display names of the tables in scope
    pub tables: Vec<String>,
    /// Names of the columns offered
    pub columns: Vec<String>,
    pub database: Option<String>,
}

/// Validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Mode mismatch: expected '{expected}', got '{actual}'")]
    ModeMismatch { expected: String, actual: String },

    #[error("Table qualifier mismatch: expected {expected:?}, got {actual:?}")]
    TableRefMismatch {
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Tables in scope mismatch: expected {expected:?}, got {actual:?}")]
    TablesMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Database mismatch: expected {expected:?}, got {actual:?}")]
    DatabaseMismatch {
        expected: Option<String>,
        actual: Option<String>,
    },
}

/// Validate a detected context against a test case
///
/// `mode` must match exactly. `table_ref` is compared case-insensitively
/// and always checked, so a case without one expects no qualifier.
/// `tables` and `database` are only checked when the case states them;
/// `columns` must all be present, in any order.
pub fn validate_context(
    actual: &ContextSnapshot,
    expected_case: &TestCase,
) -> Result<(), ValidationError> {
    if actual.mode != expected_case.mode {
        return Err(ValidationError::ModeMismatch {
            expected: expected_case.mode.clone(),
            actual: actual.mode.clone(),
        });
    }

    let same_ref = match (&expected_case.table_ref, &actual.table_ref) {
        (Some(e), Some(a)) => ident_eq(e, a),
        (None, None) => true,
        _ => false,
    };
    if !same_ref {
        return Err(ValidationError::TableRefMismatch {
            expected: expected_case.table_ref.clone(),
            actual: actual.table_ref.clone(),
        });
    }

    if let Some(tables) = &expected_case.tables {
        let same = tables.len() == actual.tables.len()
            && tables.iter().zip(&actual.tables).all(|(e, a)| ident_eq(e, a));
        if !same {
            return Err(ValidationError::TablesMismatch {
                expected: tables.clone(),
                actual: actual.tables.clone(),
            });
        }
    }

    if let Some(columns) = &expected_case.columns {
        for column in columns {
            if !actual.columns.iter().any(|c| ident_eq(c, column)) {
                return Err(ValidationError::MissingColumn(column.clone()));
            }
        }
    }

    if expected_case.database.is_some() && expected_case.database != actual.database {
        return Err(ValidationError::DatabaseMismatch {
            expected: expected_case.database.clone(),
            actual: actual.database.clone(),
        });
    }

    Ok(())
}

/// Byte offset of the cursor marker `|`, if any
pub fn get_cursor_position(input: &str) -> Option<usize> {
    input.find('|')
}

/// Remove the cursor marker from input SQL
///
/// Only the first `|` is removed; later ones are the bitwise OR operator.
pub fn remove_cursor_marker(input: &str) -> String {
    input.replacen('|', "", 1)
}

/// 1-based line and column of the cursor marker
///
/// The column counts characters, so it is the position `detect` expects.
pub fn cursor_line_col(input: &str) -> Option<(usize, usize)> {
    let offset = get_cursor_position(input)?;
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].chars().count() + 1;
    Some((line, col))
}
