// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for database schema information
//!
//! This module defines the descriptors returned by the external metadata
//! resolver and the builtin function metadata used by the type checker.
//! Type names are kept as SQL Server spells them (`varchar(50)`, `int`);
//! the type checker normalises them into families.

use crate::query::ColumnRef;
use serde::{Deserialize, Serialize};

/// Table kind classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
    TableValuedFunction,
    Other(String),
}

/// Metadata for a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Data type as reported by the server (e.g. `nvarchar(100)`)
    #[serde(default)]
    pub data_type: Option<String>,
    /// Whether the column is nullable
    #[serde(default)]
    pub nullable: Option<bool>,
    /// Ordinal position (1-based)
    #[serde(default)]
    pub ordinal: Option<usize>,
    /// Whether this is a primary key column
    #[serde(default)]
    pub is_primary_key: bool,
    /// Column comment/description
    #[serde(default)]
    pub comment: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor with builder pattern
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            nullable: None,
            ordinal: None,
            is_primary_key: false,
            comment: None,
        }
    }

    /// Builder method: set data type
    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Builder method: mark as primary key
    pub fn with_primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Builder method: set comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Convert into a column reference owned by `table`
    pub fn to_column_ref(&self, table: &str) -> ColumnRef {
        ColumnRef::new(self.name.clone())
            .with_source(table)
            .with_data_type_opt(self.data_type.clone())
    }
}

/// Metadata for a database table, view or table-valued function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Schema name (e.g. `dbo`)
    #[serde(default)]
    pub schema: Option<String>,
    /// Table name
    pub name: String,
    /// Column definitions
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Table kind
    #[serde(default)]
    pub kind: TableKind,
}

impl TableDescriptor {
    /// Create new table metadata with builder pattern
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            kind: TableKind::Table,
        }
    }

    /// Builder method: set schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method: add columns
    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: set table kind
    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| crate::ident_eq(&c.name, name))
    }

    /// Qualified display name (`schema.name` when a schema is known)
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Function classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Scalar,
    Aggregate,
    Window,
    /// `CAST`, `CONVERT`, `TRY_CAST`, `PARSE`, ...
    Conversion,
    /// `CASE`-like functions whose branches must agree (`COALESCE`, `IIF`, ...)
    Conditional,
    /// Table-valued functions usable in a FROM clause
    Table,
}

/// Metadata for a builtin function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Function name
    pub name: String,
    /// Return type name, `None` when it depends on the arguments
    pub return_type: Option<String>,
    /// Function type
    pub function_type: FunctionType,
    /// Whether the (first) argument must be numeric
    pub requires_numeric: bool,
    /// Function description/documentation
    pub description: Option<String>,
}

impl FunctionMetadata {
    /// Create new function metadata with builder pattern
    pub fn new(name: impl Into<String>, function_type: FunctionType) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            function_type,
            requires_numeric: false,
            description: None,
        }
    }

    /// Builder method: set return type
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Builder method: require a numeric argument
    pub fn numeric_argument(mut self) -> Self {
        self.requires_numeric = true;
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_descriptor_get_column_case_insensitive() {
        let table = TableDescriptor::new("Employees")
            .with_schema("dbo")
            .with_columns(vec![
                ColumnDescriptor::new("EmployeeID").with_type("int"),
                ColumnDescriptor::new("Name").with_type("nvarchar(100)"),
            ]);

        assert!(table.get_column("employeeid").is_some());
        assert!(table.get_column("Salary").is_none());
        assert_eq!(table.qualified_name(), "dbo.Employees");
    }

    #[test]
    fn test_column_descriptor_to_column_ref() {
        let column = ColumnDescriptor::new("Name").with_type("nvarchar(100)");
        let col_ref = column.to_column_ref("e");
        assert_eq!(col_ref.name, "Name");
        assert_eq!(col_ref.source_table.as_deref(), Some("e"));
        assert_eq!(col_ref.data_type.as_deref(), Some("nvarchar(100)"));
        assert!(!col_ref.is_star);
    }

    #[test]
    fn test_table_descriptor_deserializes_with_defaults() {
        let json = r#"{"name": "Orders", "columns": [{"name": "OrderID", "data_type": "int"}]}"#;
        let table: TableDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(table.kind, TableKind::Table);
        assert_eq!(table.schema, None);
        assert_eq!(table.columns[0].data_type.as_deref(), Some("int"));
    }
}
