// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the catalog crate

use sqlsense_catalog::{
    CatalogError, CatalogResult, ConnectionContext, MetadataResolver, StaticCatalog, TableDescriptor,
    TableKind, TableLookup,
};

const CATALOG_JSON: &str = r#"{
    "tables": [
        {
            "schema": "dbo",
            "name": "Employees",
            "columns": [
                { "name": "EmployeeID", "data_type": "int", "is_primary_key": true },
                { "name": "Name", "data_type": "nvarchar(100)" },
                { "name": "DepartmentID", "data_type": "int", "nullable": true }
            ]
        },
        {
            "schema": "dbo",
            "name": "fn_ActiveEmployees",
            "kind": "table_valued_function",
            "columns": [{ "name": "EmployeeID", "data_type": "int" }]
        }
    ],
    "databases": {
        "HR": [
            { "schema": "hr", "name": "Reviews", "columns": [{ "name": "Score", "data_type": "tinyint" }] }
        ]
    }
}"#;

// Resolver whose backing connection is down
struct OfflineResolver;

impl MetadataResolver for OfflineResolver {
    fn resolve_table(
        &self,
        _table: TableLookup<'_>,
        _context: &ConnectionContext,
    ) -> CatalogResult<Option<TableDescriptor>> {
        Err(CatalogError::Unavailable("connection refused".to_string()))
    }

    fn list_tables(&self, _context: &ConnectionContext) -> CatalogResult<Vec<TableDescriptor>> {
        Err(CatalogError::Timeout(500))
    }
}

#[test]
fn test_json_catalog_resolves_tables() {
    let catalog = StaticCatalog::from_json(CATALOG_JSON).unwrap();
    let ctx = ConnectionContext::new(Some("Sales".to_string()));

    let employees = catalog
        .resolve_table(TableLookup::new("[Employees]"), &ctx)
        .unwrap()
        .unwrap();
    assert_eq!(employees.columns.len(), 3);
    assert!(employees.columns[0].is_primary_key);
    assert_eq!(employees.columns[2].nullable, Some(true));

    let tvf = catalog
        .resolve_table(TableLookup::new("fn_ActiveEmployees"), &ctx)
        .unwrap()
        .unwrap();
    assert_eq!(tvf.kind, TableKind::TableValuedFunction);

    assert!(
        catalog
            .resolve_table(TableLookup::new("Reviews"), &ctx)
            .unwrap()
            .is_none()
    );
    let reviews = catalog
        .resolve_table(
            TableLookup::new("Reviews")
                .with_schema(Some("hr"))
                .with_database(Some("HR")),
            &ctx,
        )
        .unwrap();
    assert!(reviews.is_some());
}

#[test]
fn test_trait_object_errors_are_values() {
    let resolver: Box<dyn MetadataResolver> = Box::new(OfflineResolver);
    let ctx = ConnectionContext::default();
    let err = resolver
        .resolve_table(TableLookup::new("Employees"), &ctx)
        .unwrap_err();
    assert_eq!(err.to_string(), "Metadata source unavailable: connection refused");
    assert!(matches!(
        resolver.list_tables(&ctx),
        Err(CatalogError::Timeout(500))
    ));
}

#[test]
fn test_connection_context_from_settings() {
    let ctx: ConnectionContext =
        serde_json::from_str(r#"{ "database": "Sales", "defaultSchema": "sales" }"#).unwrap();
    assert_eq!(ctx.database.as_deref(), Some("Sales"));
    assert_eq!(ctx.default_schema, "sales");

    let ctx: ConnectionContext = serde_json::from_str("{}").unwrap();
    assert_eq!(ctx.default_schema, "dbo");
}
