// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # sqlsense - Catalog Layer
//!
//! Metadata resolution for real tables.
//!
//! The scope tracker resolves CTEs, derived tables and temp tables from the
//! buffer itself; only real catalog objects need a [`MetadataResolver`].
//!
//! - [`MetadataResolver`]: the synchronous lookup trait
//! - [`ConnectionContext`]: server, current database and default schema
//! - [`StaticCatalog`]: an in-memory resolver loadable from JSON
//!
//! ## Implementing the resolver
//!
//! ```rust,ignore
//! use sqlsense_catalog::{CatalogResult, ConnectionContext, MetadataResolver, TableLookup};
//! use sqlsense_ir::TableDescriptor;
//!
//! struct LiveCatalog { /* connection pool */ }
//!
//! impl MetadataResolver for LiveCatalog {
//!     fn resolve_table(
//!         &self,
//!         table: TableLookup<'_>,
//!         context: &ConnectionContext,
//!     ) -> CatalogResult<Option<TableDescriptor>> {
//!         // query INFORMATION_SCHEMA.COLUMNS
//!     }
//!
//!     fn list_tables(&self, context: &ConnectionContext) -> CatalogResult<Vec<TableDescriptor>> {
//!         // query INFORMATION_SCHEMA.TABLES
//!     }
//! }
//! ```

pub mod error;
pub mod resolver;
pub mod r#static;

// Re-exports
pub use error::{CatalogError, CatalogResult};
pub use r#static::StaticCatalog;
pub use resolver::{ConnectionContext, MetadataResolver, TableLookup};
pub use sqlsense_ir::{ColumnDescriptor, TableDescriptor, TableKind};
