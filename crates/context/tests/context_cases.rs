// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Context detection against the text-based case files in `fixtures/cases`
//!
//! Every case runs with the standard mock schema as metadata source.

use sqlsense_catalog::ConnectionContext;
use sqlsense_context::{CompletionContext, ContextDetector};
use sqlsense_semantic::ColumnResolver;
use sqlsense_test_utils::{
    ContextSnapshot, MockCatalog, MockCatalogBuilder, TestCase, cursor_line_col,
    parse_test_file, remove_cursor_marker, validate_context,
};
use std::path::PathBuf;

fn catalog() -> MockCatalog {
    MockCatalogBuilder::new().with_standard_schema().build()
}

fn snapshot(context: &CompletionContext) -> ContextSnapshot {
    ContextSnapshot {
        mode: context.mode.as_str().to_string(),
        table_ref: context.table_ref.clone(),
        tables: context
            .table_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        columns: context
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        database: context.database.clone(),
    }
}

fn run_case(detector: &ContextDetector<'_>, case: &TestCase) -> Result<(), String> {
    let (line, col) = cursor_line_col(&case.input).ok_or("no cursor marker")?;
    let source = remove_cursor_marker(&case.input);
    let context = detector.detect(&source, line, col);
    validate_context(&snapshot(&context), case).map_err(|e| e.to_string())
}

fn run_file(name: &str) {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", "cases", name]
        .iter()
        .collect();
    let cases = parse_test_file(&path).expect("Failed to parse case file");
    let catalog = catalog();
    let detector = ContextDetector::new(ColumnResolver::new(
        Some(&catalog),
        ConnectionContext::default(),
    ));

    let failures: Vec<String> = cases
        .iter()
        .filter_map(|case| {
            run_case(&detector, case)
                .err()
                .map(|err| format!("{}: {}", case.description, err))
        })
        .collect();
    assert!(
        failures.is_empty(),
        "{} of {} cases failed in {}:\n{}",
        failures.len(),
        cases.len(),
        name,
        failures.join("\n")
    );
}

#[test]
fn test_column_cases() {
    run_file("01_columns.txt");
}

#[test]
fn test_table_cases() {
    run_file("02_tables.txt");
}

#[test]
fn test_special_cases() {
    run_file("03_special.txt");
}
