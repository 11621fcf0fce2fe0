// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static Catalog
//!
//! A metadata resolver over schema data held in memory, loaded from JSON:
//!
//! ```json
//! {
//!   "tables": [
//!     { "schema": "dbo", "name": "Employees",
//!       "columns": [{ "name": "Id", "data_type": "int" }] }
//!   ],
//!   "databases": {
//!     "Archive": [{ "schema": "dbo", "name": "OldOrders", "columns": [] }]
//!   }
//! }
//! ```
//!
//! `tables` are visible from every database; `databases` entries only when
//! that database is current or named explicitly (`Archive.dbo.OldOrders`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::{CatalogError, CatalogResult, ConnectionContext, MetadataResolver, TableLookup};
use sqlsense_ir::{TableDescriptor, ident_eq};

/// Static catalog with predefined schema data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    tables: Vec<TableDescriptor>,
    #[serde(default)]
    databases: HashMap<String, Vec<TableDescriptor>>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a table, to one database or to all of them
    pub fn with_table(mut self, database: Option<&str>, table: TableDescriptor) -> Self {
        self.add_table(database, table);
        self
    }

    pub fn add_table(&mut self, database: Option<&str>, table: TableDescriptor) {
        match database {
            Some(db) => self.databases.entry(db.to_string()).or_default().push(table),
            None => self.tables.push(table),
        }
    }

    /// Parse a catalog from JSON text
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        debug!(
            tables = catalog.tables.len(),
            databases = catalog.databases.len(),
            "loaded static catalog"
        );
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| CatalogError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json(&json)
    }

    fn database_tables(&self, database: Option<&str>) -> &[TableDescriptor] {
        database
            .and_then(|db| {
                self.databases
                    .iter()
                    .find(|(name, _)| ident_eq(name, db))
                    .map(|(_, tables)| tables.as_slice())
            })
            .unwrap_or(&[])
    }

    fn candidates<'a>(
        &'a self,
        database: Option<&'a str>,
    ) -> impl Iterator<Item = &'a TableDescriptor> + 'a {
        self.database_tables(database).iter().chain(self.tables.iter())
    }
}

fn schema_is(table: &TableDescriptor, schema: &str) -> bool {
    table.schema.as_deref().is_some_and(|s| ident_eq(s, schema))
}

impl MetadataResolver for StaticCatalog {
    fn resolve_table(
        &self,
        table: TableLookup<'_>,
        context: &ConnectionContext,
    ) -> CatalogResult<Option<TableDescriptor>> {
        let database = table.database.or(context.database.as_deref());
        let named: Vec<_> = self
            .candidates(database)
            .filter(|t| ident_eq(&t.name, table.name))
            .collect();

        let found = match table.schema {
            Some(schema) => named.iter().copied().find(|t| schema_is(t, schema)),
            None => named
                .iter()
                .copied()
                .find(|t| schema_is(t, &context.default_schema))
                .or_else(|| named.first().copied()),
        };
        Ok(found.cloned())
    }

    fn list_tables(&self, context: &ConnectionContext) -> CatalogResult<Vec<TableDescriptor>> {
        Ok(self.candidates(context.database.as_deref()).cloned().collect())
    }
}
