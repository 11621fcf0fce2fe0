// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! SQL-specific test helpers and custom assertions

use sqlsense_ir::{ColumnRef, IssueKind, ParseIssue, StatementChunk, TableRef, ident_eq};

/// Custom assertion helpers for parser and resolver output
pub struct SqlAssertions;

impl SqlAssertions {
    /// Assert the display names of `tables`, in order
    pub fn assert_table_names(tables: &[TableRef], expected: &[&str]) {
        let actual: Vec<&str> = tables.iter().map(|t| t.display_name()).collect();
        assert_eq!(actual, expected, "Table names mismatch");
    }

    /// Assert the column names of a table, in order
    pub fn assert_columns(table: &TableRef, expected: &[&str]) {
        let actual = column_names(&table.columns);
        assert_eq!(
            actual,
            expected,
            "Columns of '{}' mismatch",
            table.display_name()
        );
    }

    /// Assert that a column is present with the given data type
    pub fn assert_column_type(table: &TableRef, column: &str, data_type: &str) {
        let Some(found) = table.find_column(column) else {
            panic!(
                "Column '{}' not found in '{}'",
                column,
                table.display_name()
            );
        };
        assert_eq!(
            found.data_type.as_deref(),
            Some(data_type),
            "Column '{}' data type mismatch",
            column
        );
    }

    /// Assert that `chunk` resolves `name` (alias or table name) to `expected`
    pub fn assert_resolves_to(chunk: &StatementChunk, name: &str, expected: &str) {
        let Some(table) = chunk.find_table(name) else {
            panic!("'{}' does not resolve to any table", name);
        };
        assert!(
            ident_eq(&table.name, expected),
            "'{}' resolves to '{}', expected '{}'",
            name,
            table.name,
            expected
        );
    }

    /// Assert the kinds of `issues`, in order
    pub fn assert_issue_kinds(issues: &[ParseIssue], expected: &[IssueKind]) {
        let actual: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(actual, expected, "Issue kinds mismatch");
    }
}

/// Names of `columns`, in order
pub fn column_names(columns: &[ColumnRef]) -> Vec<&str> {
    columns.iter().map(|c| c.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsense_ir::{Position, Range, StatementType};

    fn employees() -> TableRef {
        TableRef::new("Employees").with_alias("e").with_columns(vec![
            ColumnRef::new("EmployeeID").with_data_type("int"),
            ColumnRef::new("FirstName").with_data_type("nvarchar(50)"),
        ])
    }

    #[test]
    fn test_assert_table_names_uses_alias() {
        SqlAssertions::assert_table_names(&[employees(), TableRef::new("Orders")], &["e", "Orders"]);
    }

    #[test]
    fn test_assert_columns() {
        let table = employees();
        SqlAssertions::assert_columns(&table, &["EmployeeID", "FirstName"]);
        SqlAssertions::assert_column_type(&table, "firstname", "nvarchar(50)");
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_assert_column_type_missing() {
        SqlAssertions::assert_column_type(&employees(), "Salary", "money");
    }

    #[test]
    fn test_assert_resolves_to() {
        let mut chunk = StatementChunk::new(StatementType::Select);
        chunk.tables.push(employees());
        SqlAssertions::assert_resolves_to(&chunk, "E", "Employees");
    }

    #[test]
    fn test_assert_issue_kinds() {
        let range = Range::new(Position::new(1, 1), Position::new(1, 5));
        let issues = vec![ParseIssue::new(IssueKind::DuplicateFrom, "duplicate FROM", range)];
        SqlAssertions::assert_issue_kinds(&issues, &[IssueKind::DuplicateFrom]);
    }
}
