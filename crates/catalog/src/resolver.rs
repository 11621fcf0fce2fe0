// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata resolver trait
//!
//! The resolver is the external collaborator that supplies concrete column
//! metadata for real tables. Everything else (CTEs, derived tables, temp
//! tables) is resolved from the parsed buffer itself.

use crate::error::CatalogResult;
use serde::{Deserialize, Serialize};
use sqlsense_ir::TableDescriptor;

/// Where lookups run: the connection's server and current database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionContext {
    #[serde(default)]
    pub server: Option<String>,
    /// Database selected by `USE` or the connection default
    #[serde(default)]
    pub database: Option<String>,
    /// Schema used for unqualified names
    #[serde(default = "default_schema")]
    pub default_schema: String,
}

fn default_schema() -> String {
    "dbo".to_string()
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self {
            server: None,
            database: None,
            default_schema: default_schema(),
        }
    }
}

impl ConnectionContext {
    /// Create a context for a database
    pub fn new(database: Option<String>) -> Self {
        Self {
            database,
            ..Self::default()
        }
    }

    /// Builder method: set server
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Builder method: set default schema
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }
}

/// A table name as written, split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLookup<'a> {
    pub database: Option<&'a str>,
    pub schema: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> TableLookup<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            database: None,
            schema: None,
            name,
        }
    }

    pub fn with_schema(mut self, schema: Option<&'a str>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_database(mut self, database: Option<&'a str>) -> Self {
        self.database = database;
        self
    }
}

/// Synchronous metadata source
///
/// Implementations may be backed by a live connection, a cache or a static
/// file. `Ok(None)` means the table is unknown; errors mean the lookup
/// itself failed. Callers treat both as "no columns".
///
/// # Examples
///
/// ```
/// use sqlsense_catalog::{ConnectionContext, MetadataResolver, StaticCatalog, TableLookup};
/// use sqlsense_ir::{ColumnDescriptor, TableDescriptor};
///
/// let catalog = StaticCatalog::new().with_table(
///     None,
///     TableDescriptor::new("Employees")
///         .with_schema("dbo")
///         .with_columns(vec![ColumnDescriptor::new("Id").with_type("int")]),
/// );
/// let table = catalog
///     .resolve_table(TableLookup::new("employees"), &ConnectionContext::default())
///     .unwrap();
/// assert_eq!(table.unwrap().columns.len(), 1);
/// ```
pub trait MetadataResolver: Send + Sync {
    /// Resolve a table, view or table-valued function by name
    fn resolve_table(
        &self,
        table: TableLookup<'_>,
        context: &ConnectionContext,
    ) -> CatalogResult<Option<TableDescriptor>>;

    /// List the tables visible from the context's database
    fn list_tables(&self, context: &ConnectionContext) -> CatalogResult<Vec<TableDescriptor>>;
}
