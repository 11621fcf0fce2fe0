// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Text-based test case format parser
//!
//! Context detection cases are separated by `---` and use a YAML-like
//! field syntax. The cursor is marked with `|` in the input:
//!
//! ```text
//! ---
//! description: qualified column after alias
//! input: |
//!   SELECT * FROM Employees e WHERE e.|
//! mode: qualified
//! table_ref: e
//! tables: e
//! ```

use std::path::Path;
use thiserror::Error;

/// Field names recognized at the start of a line
const FIELDS: &[&str] = &[
    "description",
    "input",
    "mode",
    "table_ref",
    "tables",
    "columns",
    "database",
];

/// A single test case definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub description: String,
    /// Buffer text with one `|` cursor marker
    pub input: String,
    /// Expected completion mode, snake_case
    pub mode: String,
    pub table_ref: Option<String>,
    /// Expected display names of the tables in scope, in order
    pub tables: Option<Vec<String>>,
    /// Columns that must be offered
    pub columns: Option<Vec<String>>,
    pub database: Option<String>,
}

/// Parse errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field '{field}' in case ending at line {line}")]
    MissingField { field: &'static str, line: usize },

    #[error("Input of case ending at line {line} has no cursor marker")]
    MissingCursor { line: usize },

    #[error("Empty test case file")]
    EmptyFile,
}

/// Parse a test case file
pub fn parse_test_file(path: &Path) -> Result<Vec<TestCase>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_test_content(&content)
}

/// Parse test case content from a string
pub fn parse_test_content(content: &str) -> Result<Vec<TestCase>, ParseError> {
    let mut cases = Vec::new();
    let mut current_case = TestCaseBuilder::default();
    let mut current_field: Option<&str> = None;
    let mut current_value: Vec<String> = Vec::new();
    let mut line_num = 0;

    for line in content.lines() {
        line_num += 1;
        let trimmed = line.trim();

        if trimmed.is_empty() && current_field.is_none() {
            continue;
        }

        if trimmed == "---" {
            if let Some(field) = current_field.take() {
                current_case.set_field(field, &current_value);
            }
            if current_case.has_fields() {
                cases.push(std::mem::take(&mut current_case).build(line_num)?);
            }
            current_value.clear();
            continue;
        }

        if let Some((field, value)) = field_line(trimmed) {
            if let Some(previous) = current_field {
                current_case.set_field(previous, &current_value);
            }
            current_field = Some(field);
            current_value.clear();
            // `input: |` starts a block; anything else is an inline value
            if !value.is_empty() && value != "|" {
                current_value.push(value.to_string());
            }
            continue;
        }

        if current_field.is_some() {
            current_value.push(line.to_string());
        }
    }

    if let Some(field) = current_field {
        current_case.set_field(field, &current_value);
    }
    if current_case.has_fields() {
        cases.push(current_case.build(line_num)?);
    }

    if cases.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(cases)
}

/// Split `key: value` when `key` is a known field
fn field_line(trimmed: &str) -> Option<(&'static str, &str)> {
    let (key, value) = trimmed.split_once(':')?;
    let field = FIELDS.iter().copied().find(|f| *f == key.trim())?;
    Some((field, value.trim()))
}

/// Builder for constructing test cases incrementally
#[derive(Default)]
struct TestCaseBuilder {
    description: Option<String>,
    input: Option<String>,
    mode: Option<String>,
    table_ref: Option<String>,
    tables: Option<Vec<String>>,
    columns: Option<Vec<String>>,
    database: Option<String>,
}

impl TestCaseBuilder {
    fn has_fields(&self) -> bool {
        self.description.is_some() || self.input.is_some()
    }

    fn set_field(&mut self, field: &str, value: &[String]) {
        let inline = || value.join(" ").trim().to_string();
        match field {
            "description" => self.description = Some(inline()),
            "input" => self.input = Some(dedent(value)),
            "mode" => self.mode = Some(inline()),
            "table_ref" => self.table_ref = Some(inline()).filter(|s| !s.is_empty()),
            "tables" => self.tables = Some(list(&inline())),
            "columns" => self.columns = Some(list(&inline())),
            "database" => self.database = Some(inline()).filter(|s| !s.is_empty()),
            _ => {}
        }
    }

    fn build(self, line: usize) -> Result<TestCase, ParseError> {
        let description = self.description.ok_or(ParseError::MissingField {
            field: "description",
            line,
        })?;
        let input = self.input.ok_or(ParseError::MissingField {
            field: "input",
            line,
        })?;
        if !input.contains('|') {
            return Err(ParseError::MissingCursor { line });
        }
        let mode = self
            .mode
            .ok_or(ParseError::MissingField { field: "mode", line })?;

        Ok(TestCase {
            description,
            input,
            mode,
            table_ref: self.table_ref,
            tables: self.tables,
            columns: self.columns,
            database: self.database,
        })
    }
}

/// Comma separated names; an empty value is an empty list
fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Remove common leading whitespace from multi-line text
fn dedent(lines: &[String]) -> String {
    let min_indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let result: Vec<&str> = lines
        .iter()
        .map(|line| line.get(min_indent..).unwrap_or(line.trim_start()))
        .collect();

    result.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_case() {
        let content = r#"
---
description: qualified column after alias
input: |
  SELECT * FROM Employees e
  WHERE e.|
mode: qualified
table_ref: e
tables: e
"#;

        let cases = parse_test_content(content).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].description, "qualified column after alias");
        assert_eq!(cases[0].input, "SELECT * FROM Employees e\nWHERE e.|");
        assert_eq!(cases[0].mode, "qualified");
        assert_eq!(cases[0].table_ref.as_deref(), Some("e"));
        assert_eq!(cases[0].tables, Some(vec!["e".to_string()]));
        assert_eq!(cases[0].columns, None);
    }

    #[test]
    fn test_parse_multiple_cases() {
        let content = r#"
---
description: First
input: SELECT | FROM Orders
mode: select
tables: Orders
columns: OrderID, Status

---
description: Second
input: |
  SELECT 'a:b' FROM |
mode: from
tables:
"#;

        let cases = parse_test_content(content).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(
            cases[0].columns,
            Some(vec!["OrderID".to_string(), "Status".to_string()])
        );
        assert_eq!(cases[1].input, "SELECT 'a:b' FROM |");
        assert_eq!(cases[1].tables, Some(vec![]));
    }

    #[test]
    fn test_sql_lines_with_colons_stay_in_input() {
        let content = "description: cast\ninput: |\n  SELECT x::int,\n  | FROM t\nmode: select\n";
        let cases = parse_test_content(content).unwrap();
        assert_eq!(cases[0].input, "SELECT x::int,\n| FROM t");
    }

    #[test]
    fn test_missing_fields() {
        let no_mode = "description: x\ninput: SELECT |\n";
        assert!(matches!(
            parse_test_content(no_mode),
            Err(ParseError::MissingField { field: "mode", .. })
        ));

        let no_cursor = "description: x\ninput: SELECT 1\nmode: keyword\n";
        assert!(matches!(
            parse_test_content(no_cursor),
            Err(ParseError::MissingCursor { .. })
        ));
    }

    #[test]
    fn test_dedent() {
        let lines = vec![
            "    SELECT".to_string(),
            "      id,".to_string(),
            "      name".to_string(),
        ];
        assert_eq!(dedent(&lines), "SELECT\n  id,\n  name");
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_test_content(""), Err(ParseError::EmptyFile)));
    }
}
