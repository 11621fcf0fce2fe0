// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock metadata resolver for testing
//!
//! Provides an in-memory resolver with builder pattern for easy test setup.
//! Every lookup is counted, so tests can assert that CTEs, derived tables
//! and temp tables are resolved without touching the catalog.

use sqlsense_catalog::{
    CatalogError, CatalogResult, ConnectionContext, MetadataResolver, TableLookup,
};
use sqlsense_ir::{ColumnDescriptor, TableDescriptor, TableKind, ident_eq};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory mock resolver for testing
#[derive(Debug, Default)]
pub struct MockCatalog {
    /// `(database, table)`; `None` tables are visible from every database
    tables: Vec<(Option<String>, TableDescriptor)>,
    failure: Option<CatalogError>,
    lookups: AtomicUsize,
}

impl MockCatalog {
    /// Create a new empty mock catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table visible from every database
    pub fn add_table(mut self, table: TableDescriptor) -> Self {
        self.tables.push((None, table));
        self
    }

    /// Add a table that only exists in `database`
    pub fn add_database_table(mut self, database: &str, table: TableDescriptor) -> Self {
        self.tables.push((Some(database.to_string()), table));
        self
    }

    /// Get a table by name (any schema, any database)
    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .map(|(_, t)| t)
            .find(|t| ident_eq(&t.name, name))
    }

    /// Number of `resolve_table` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn visible<'a>(
        &'a self,
        database: Option<&'a str>,
    ) -> impl Iterator<Item = &'a TableDescriptor> + 'a {
        self.tables
            .iter()
            .filter(move |(db, _)| match (db, database) {
                (None, _) => true,
                (Some(db), Some(current)) => ident_eq(db, current),
                (Some(_), None) => false,
            })
            .map(|(_, t)| t)
    }
}

impl MetadataResolver for MockCatalog {
    fn resolve_table(
        &self,
        table: TableLookup<'_>,
        context: &ConnectionContext,
    ) -> CatalogResult<Option<TableDescriptor>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let database = table.database.or(context.database.as_deref());
        let schema = table.schema.unwrap_or(context.default_schema.as_str());
        let named: Vec<&TableDescriptor> = self
            .visible(database)
            .filter(|t| ident_eq(&t.name, table.name))
            .collect();
        let found = named
            .iter()
            .find(|t| t.schema.as_deref().is_some_and(|s| ident_eq(s, schema)));
        let found = match (found, table.schema) {
            (Some(t), _) => Some(*t),
            // An explicit schema must match
            (None, Some(_)) => None,
            (None, None) => named.first().copied(),
        };
        Ok(found.cloned())
    }

    fn list_tables(&self, context: &ConnectionContext) -> CatalogResult<Vec<TableDescriptor>> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.visible(context.database.as_deref()).cloned().collect())
    }
}

/// Builder for creating mock catalogs with a fluent API
pub struct MockCatalogBuilder {
    catalog: MockCatalog,
}

impl Default for MockCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn column(name: &str, data_type: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name).with_type(data_type)
}

impl MockCatalogBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            catalog: MockCatalog::new(),
        }
    }

    /// Add the standard test schema
    ///
    /// `dbo.Employees`, `dbo.Departments`, `dbo.Orders`, `dbo.Customers`,
    /// `hr.Employees`, the `dbo.fn_OrdersSince` table-valued function and
    /// `Archive.dbo.OrdersHistory`, which only exists in `Archive`.
    pub fn with_standard_schema(mut self) -> Self {
        self.catalog = self
            .catalog
            .add_table(
                TableDescriptor::new("Employees")
                    .with_schema("dbo")
                    .with_columns(vec![
                        column("EmployeeID", "int")
                            .with_nullable(false)
                            .with_primary_key(),
                        column("FirstName", "nvarchar(50)"),
                        column("LastName", "nvarchar(50)"),
                        column("DepartmentID", "int"),
                        column("ManagerID", "int"),
                        column("HireDate", "date"),
                        column("Salary", "decimal(10,2)"),
                        column("IsActive", "bit"),
                    ]),
            )
            .add_table(
                TableDescriptor::new("Departments")
                    .with_schema("dbo")
                    .with_columns(vec![
                        column("DepartmentID", "int")
                            .with_nullable(false)
                            .with_primary_key(),
                        column("DepartmentName", "nvarchar(100)"),
                        column("Budget", "money"),
                    ]),
            )
            .add_table(
                TableDescriptor::new("Orders")
                    .with_schema("dbo")
                    .with_columns(vec![
                        column("OrderID", "int")
                            .with_nullable(false)
                            .with_primary_key(),
                        column("CustomerID", "int"),
                        column("OrderDate", "datetime"),
                        column("TotalAmount", "money"),
                        column("Status", "varchar(20)"),
                    ]),
            )
            .add_table(
                TableDescriptor::new("Customers")
                    .with_schema("dbo")
                    .with_columns(vec![
                        column("CustomerID", "int")
                            .with_nullable(false)
                            .with_primary_key(),
                        column("CustomerName", "nvarchar(100)"),
                        column("Email", "varchar(255)"),
                        column("CreatedAt", "datetime2"),
                    ]),
            )
            .add_table(
                TableDescriptor::new("Employees")
                    .with_schema("hr")
                    .with_columns(vec![
                        column("BadgeNumber", "char(8)"),
                        column("ClearanceLevel", "tinyint"),
                    ]),
            )
            .add_table(
                TableDescriptor::new("fn_OrdersSince")
                    .with_schema("dbo")
                    .with_kind(TableKind::TableValuedFunction)
                    .with_columns(vec![
                        column("OrderID", "int"),
                        column("OrderDate", "datetime"),
                    ]),
            )
            .add_database_table(
                "Archive",
                TableDescriptor::new("OrdersHistory")
                    .with_schema("dbo")
                    .with_columns(vec![
                        column("OrderID", "int"),
                        column("ArchivedAt", "datetime2"),
                    ]),
            );

        self
    }

    /// Add a custom table
    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.catalog = self.catalog.add_table(table);
        self
    }

    /// Add a custom table to one database
    pub fn with_database_table(mut self, database: &str, table: TableDescriptor) -> Self {
        self.catalog = self.catalog.add_database_table(database, table);
        self
    }

    /// Make every lookup fail with `err`
    pub fn failing(mut self, err: CatalogError) -> Self {
        self.catalog.failure = Some(err);
        self
    }

    /// Build the mock catalog
    pub fn build(self) -> MockCatalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(catalog: &MockCatalog, table: TableLookup<'_>) -> Option<TableDescriptor> {
        catalog
            .resolve_table(table, &ConnectionContext::default())
            .unwrap()
    }

    #[test]
    fn test_default_schema_wins_for_unqualified_names() {
        let catalog = MockCatalogBuilder::new().with_standard_schema().build();

        let dbo = lookup(&catalog, TableLookup::new("employees")).unwrap();
        assert_eq!(dbo.schema.as_deref(), Some("dbo"));
        assert_eq!(dbo.columns.len(), 8);

        let hr = lookup(&catalog, TableLookup::new("Employees").with_schema(Some("hr"))).unwrap();
        assert_eq!(hr.columns[0].name, "BadgeNumber");

        assert!(lookup(&catalog, TableLookup::new("Orders").with_schema(Some("hr"))).is_none());
        assert_eq!(catalog.lookups(), 3);
    }

    #[test]
    fn test_unqualified_lookup_falls_back_to_any_schema() {
        let catalog = MockCatalog::new()
            .add_table(TableDescriptor::new("Badges").with_schema("hr"))
            .add_table(TableDescriptor::new("Payroll").with_schema("hr"))
            .add_table(TableDescriptor::new("Payroll").with_schema("dbo"));

        let badges = lookup(&catalog, TableLookup::new("badges")).unwrap();
        assert_eq!(badges.schema.as_deref(), Some("hr"));

        // The default schema beats an earlier entry in another schema
        let payroll = lookup(&catalog, TableLookup::new("Payroll")).unwrap();
        assert_eq!(payroll.schema.as_deref(), Some("dbo"));

        assert!(lookup(&catalog, TableLookup::new("Badges").with_schema(Some("dbo"))).is_none());
        assert!(lookup(&catalog, TableLookup::new("Missing")).is_none());
        assert_eq!(catalog.lookups(), 4);
    }

    #[test]
    fn test_database_scoped_tables() {
        let catalog = MockCatalogBuilder::new().with_standard_schema().build();

        assert!(lookup(&catalog, TableLookup::new("OrdersHistory")).is_none());
        assert!(
            lookup(
                &catalog,
                TableLookup::new("OrdersHistory").with_database(Some("archive"))
            )
            .is_some()
        );

        let archive = ConnectionContext::new(Some("Archive".to_string()));
        let tables = catalog.list_tables(&archive).unwrap();
        assert!(tables.iter().any(|t| t.name == "OrdersHistory"));
        let tables = catalog.list_tables(&ConnectionContext::default()).unwrap();
        assert!(!tables.iter().any(|t| t.name == "OrdersHistory"));
    }

    #[test]
    fn test_failing_catalog() {
        let catalog = MockCatalogBuilder::new()
            .with_standard_schema()
            .failing(CatalogError::Timeout(250))
            .build();

        let err = catalog
            .resolve_table(TableLookup::new("Orders"), &ConnectionContext::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Timeout(250)));
        assert_eq!(catalog.lookups(), 1);
    }
}
