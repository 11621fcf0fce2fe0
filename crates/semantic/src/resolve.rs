// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Column resolution
//!
//! Fills in the columns a [`TableRef`] exposes:
//!
//! | reference | columns come from |
//! |---|---|
//! | derived table | the subquery's output, renamed by `AS d (a, b)` |
//! | CTE | the defining query's output, renamed by `WITH c (a, b)` |
//! | temp table | the temp table registry |
//! | TVF with a column list | the column list |
//! | real table / TVF | the [`MetadataResolver`] |
//!
//! A query's output expands `*` and `alias.*` against its own tables.
//! Expansion recurses through nested CTEs and derived tables and stops at
//! the configured depth.

use crate::error::{SemanticError, SemanticResult};
use crate::scope::{DEFAULT_MAX_DEPTH, ScopeId, ScopeTree};
use sqlsense_catalog::{ConnectionContext, MetadataResolver, TableLookup};
use sqlsense_ir::{ColumnRef, CteDef, StatementChunk, TableRef, TempTable, ident_eq};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Names the resolver can see besides a chunk's own tables
#[derive(Debug, Clone, Default)]
pub struct Visibility<'s> {
    pub ctes: Vec<&'s CteDef>,
    pub temp_tables: Vec<&'s TempTable>,
}

impl<'s> Visibility<'s> {
    pub fn new(ctes: Vec<&'s CteDef>, temp_tables: Vec<&'s TempTable>) -> Self {
        Self { ctes, temp_tables }
    }

    /// CTEs and temp tables visible from a scope
    pub fn for_scope(tree: &ScopeTree<'s>, scope: ScopeId, temp_tables: Vec<&'s TempTable>) -> Self {
        Self::new(tree.visible_ctes(scope), temp_tables)
    }

    fn find_cte(&self, name: &str) -> Option<&'s CteDef> {
        self.ctes.iter().copied().find(|c| ident_eq(&c.name, name))
    }

    fn find_temp_table(&self, name: &str) -> Option<&'s TempTable> {
        self.temp_tables
            .iter()
            .copied()
            .find(|t| ident_eq(&t.name, name))
    }

    /// The environment of a CTE body: the CTE itself is removed
    fn without_cte(&self, name: &str) -> Self {
        Self {
            ctes: self
                .ctes
                .iter()
                .copied()
                .filter(|c| !ident_eq(&c.name, name))
                .collect(),
            temp_tables: self.temp_tables.clone(),
        }
    }

    /// The environment inside a nested chunk: its own CTEs come first
    fn nested(&self, chunk: &'s StatementChunk) -> Self {
        let mut ctes: Vec<&'s CteDef> = chunk.ctes.iter().collect();
        ctes.extend(
            self.ctes
                .iter()
                .copied()
                .filter(|c| !chunk.ctes.iter().any(|own| ident_eq(&own.name, &c.name))),
        );
        Self {
            ctes,
            temp_tables: self.temp_tables.clone(),
        }
    }
}

/// Resolves the columns of table references
pub struct ColumnResolver<'r> {
    metadata: Option<&'r dyn MetadataResolver>,
    context: ConnectionContext,
    max_depth: usize,
}

impl std::fmt::Debug for ColumnResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnResolver")
            .field("has_metadata", &self.metadata.is_some())
            .field("context", &self.context)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<'r> ColumnResolver<'r> {
    pub fn new(metadata: Option<&'r dyn MetadataResolver>, context: ConnectionContext) -> Self {
        Self {
            metadata,
            context,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// A resolver that never consults a metadata source
    pub fn offline() -> Self {
        Self::new(None, ConnectionContext::default())
    }

    /// Builder method: set the expansion depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Copy of `table` with its columns filled in
    pub fn resolve_table(
        &self,
        table: &TableRef,
        owner: &StatementChunk,
        env: &Visibility<'_>,
    ) -> SemanticResult<TableRef> {
        let mut resolved = table.clone();
        resolved.columns = self.table_columns(table, owner, env, 0)?;
        Ok(resolved)
    }

    /// Resolve every table visible from a scope
    ///
    /// Lookups that fail for one table leave that table without columns.
    pub fn resolve_scope(
        &self,
        tree: &ScopeTree<'_>,
        scope: ScopeId,
        temp_tables: &[&TempTable],
    ) -> Vec<TableRef> {
        let env = Visibility::new(tree.visible_ctes(scope), temp_tables.to_vec());
        tree.visible_tables(scope)
            .into_iter()
            .map(|scoped| {
                let env = if scoped.scope == scope {
                    env.clone()
                } else {
                    Visibility::new(tree.visible_ctes(scoped.scope), temp_tables.to_vec())
                };
                self.resolve_table(scoped.table, scoped.owner, &env)
                    .unwrap_or_else(|err| {
                        warn!(table = %scoped.table.name, error = %err, "column resolution failed");
                        scoped.table.clone()
                    })
            })
            .collect()
    }

    /// Columns exposed by a table reference, labelled with its display name
    pub fn table_columns(
        &self,
        table: &TableRef,
        owner: &StatementChunk,
        env: &Visibility<'_>,
        depth: usize,
    ) -> SemanticResult<Vec<ColumnRef>> {
        if depth > self.max_depth {
            return Err(SemanticError::DepthLimit {
                limit: self.max_depth,
            });
        }
        let label = table.display_name();

        let columns = if table.is_subquery {
            let Some(subquery) = table.subquery_index.and_then(|i| owner.subqueries.get(i)) else {
                return Ok(Vec::new());
            };
            let output =
                self.output_columns(&subquery.chunk, &env.nested(&subquery.chunk), depth + 1)?;
            rename(output, table.columns.iter().map(|c| c.name.as_str()))
        } else if let Some(cte) = table.is_cte.then(|| env.find_cte(&table.name)).flatten() {
            let body_env = env.without_cte(&cte.name);
            let output = self.output_columns(
                &cte.defining_chunk,
                &body_env.nested(&cte.defining_chunk),
                depth + 1,
            )?;
            match &cte.explicit_columns {
                Some(names) => rename(output, names.iter().map(String::as_str)),
                None => output,
            }
        } else if table.is_temp_table {
            env.find_temp_table(&table.name)
                .map(|t| t.columns.clone())
                .unwrap_or_default()
        } else if table.is_tvf && !table.columns.is_empty() {
            table.columns.clone()
        } else {
            self.lookup(table, owner)
        };

        Ok(columns
            .into_iter()
            .map(|mut c| {
                c.source_table = Some(label.to_string());
                c
            })
            .collect())
    }

    /// Ask the metadata resolver for a real table's columns
    fn lookup(&self, table: &TableRef, owner: &StatementChunk) -> Vec<ColumnRef> {
        let Some(metadata) = self.metadata else {
            return Vec::new();
        };
        let context = match &owner.database {
            Some(db) if self.context.database.as_deref() != Some(db.as_str()) => {
                let mut context = self.context.clone();
                context.database = Some(db.clone());
                Cow::Owned(context)
            }
            _ => Cow::Borrowed(&self.context),
        };
        let lookup = TableLookup::new(&table.name)
            .with_schema(table.schema.as_deref())
            .with_database(table.database.as_deref());

        match metadata.resolve_table(lookup, &context) {
            Ok(Some(descriptor)) => descriptor
                .columns
                .iter()
                .map(|c| c.to_column_ref(table.display_name()))
                .collect(),
            Ok(None) => {
                debug!(table = %table.name, "table not found in metadata");
                Vec::new()
            }
            Err(err) => {
                warn!(table = %table.name, error = %err, "metadata lookup failed");
                Vec::new()
            }
        }
    }

    /// Output columns of a query with `*` and `alias.*` expanded
    pub fn output_columns(
        &self,
        chunk: &StatementChunk,
        env: &Visibility<'_>,
        depth: usize,
    ) -> SemanticResult<Vec<ColumnRef>> {
        if depth > self.max_depth {
            return Err(SemanticError::DepthLimit {
                limit: self.max_depth,
            });
        }

        let mut output = Vec::new();
        for column in &chunk.columns {
            if column.is_star {
                let sources: Vec<&TableRef> = match column.source_table.as_deref() {
                    Some(qualifier) => chunk.find_table(qualifier).into_iter().collect(),
                    None => chunk.tables.iter().collect(),
                };
                for table in sources {
                    output.extend(self.table_columns(table, chunk, env, depth)?);
                }
                continue;
            }

            let mut column = column.clone();
            let is_call = column.expression.as_ref().is_some_and(|e| e.contains('('));
            if column.data_type.is_none() && !is_call {
                column.data_type = self.source_type(&column, chunk, env, depth)?;
            }
            output.push(column);
        }
        Ok(output)
    }

    /// Data type of a plain column, looked up in its source table
    fn source_type(
        &self,
        column: &ColumnRef,
        chunk: &StatementChunk,
        env: &Visibility<'_>,
        depth: usize,
    ) -> SemanticResult<Option<String>> {
        let source = match column.source_table.as_deref() {
            Some(qualifier) => chunk.find_table(qualifier),
            None if chunk.tables.len() == 1 => chunk.tables.first(),
            None => None,
        };
        let Some(source) = source else {
            return Ok(None);
        };
        let base_name = column.expression.as_deref().unwrap_or(&column.name);
        Ok(self
            .table_columns(source, chunk, env, depth)?
            .into_iter()
            .find(|c| ident_eq(&c.name, base_name))
            .and_then(|c| c.data_type))
    }

    /// Find which visible table provides an unqualified column
    pub fn find_column_source(
        &self,
        column: &str,
        tables: &[TableRef],
    ) -> SemanticResult<TableRef> {
        let matches: Vec<&TableRef> = tables
            .iter()
            .filter(|t| t.find_column(column).is_some())
            .collect();
        match matches.as_slice() {
            [] => Err(SemanticError::ColumnNotFound(column.to_string())),
            [table] => Ok((*table).clone()),
            many => Err(SemanticError::AmbiguousColumn(
                column.to_string(),
                many.iter().map(|t| t.display_name().to_string()).collect(),
            )),
        }
    }
}

/// Rename columns positionally; extra names are added as untyped columns
fn rename<'n>(columns: Vec<ColumnRef>, names: impl Iterator<Item = &'n str>) -> Vec<ColumnRef> {
    let mut columns = columns.into_iter();
    let mut renamed: Vec<ColumnRef> = Vec::new();
    for name in names {
        let mut column = columns.next().unwrap_or_else(|| ColumnRef::new(name));
        column.name = name.to_string();
        column.expression = None;
        renamed.push(column);
    }
    if renamed.is_empty() {
        return columns.collect();
    }
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::build_scope_tree;
    use sqlsense_catalog::StaticCatalog;
    use sqlsense_ir::{ColumnDescriptor, TableDescriptor, TempTableKind};
    use sqlsense_lexer::tokenize;
    use sqlsense_parser::parse_chunk;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_table(
                None,
                TableDescriptor::new("Employees").with_schema("dbo").with_columns(vec![
                    ColumnDescriptor::new("EmployeeID").with_type("int"),
                    ColumnDescriptor::new("Name").with_type("nvarchar(100)"),
                    ColumnDescriptor::new("DepartmentID").with_type("int"),
                ]),
            )
            .with_table(
                None,
                TableDescriptor::new("Departments").with_schema("dbo").with_columns(vec![
                    ColumnDescriptor::new("DepartmentID").with_type("int"),
                    ColumnDescriptor::new("Title").with_type("varchar(50)"),
                ]),
            )
    }

    fn parse(sql: &str) -> StatementChunk {
        parse_chunk(&tokenize(sql))
    }

    fn names(columns: &[ColumnRef]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_alias_shadowing_resolves_against_aliased_table() {
        let catalog = catalog();
        let resolver = ColumnResolver::new(Some(&catalog), ConnectionContext::default());
        let chunk = parse("SELECT Departments.Name FROM Employees Departments");
        let tree = build_scope_tree(&chunk);

        let scoped = tree.resolve_table("Departments", tree.root()).unwrap();
        let table = resolver
            .resolve_table(scoped.table, scoped.owner, &Visibility::default())
            .unwrap();
        assert!(table.find_column("Name").is_some());
        assert!(table.find_column("Title").is_none());
        assert_eq!(table.columns[0].source_table.as_deref(), Some("Departments"));
    }

    #[test]
    fn test_cte_columns_honor_explicit_list() {
        let catalog = catalog();
        let resolver = ColumnResolver::new(Some(&catalog), ConnectionContext::default());
        let chunk = parse(
            "WITH staff (Id, FullName) AS (SELECT EmployeeID, Name FROM Employees) SELECT * FROM staff s",
        );
        let tree = build_scope_tree(&chunk);
        let tables = resolver.resolve_scope(&tree, tree.root(), &[]);
        assert_eq!(names(&tables[0].columns), vec!["Id", "FullName"]);
        assert_eq!(tables[0].columns[1].data_type.as_deref(), Some("nvarchar(100)"));
        assert_eq!(tables[0].columns[0].source_table.as_deref(), Some("s"));

        let output = resolver
            .output_columns(&chunk, &Visibility::for_scope(&tree, tree.root(), Vec::new()), 0)
            .unwrap();
        assert_eq!(names(&output), vec!["Id", "FullName"]);
    }

    #[test]
    fn test_chained_ctes_and_derived_tables() {
        let catalog = catalog();
        let resolver = ColumnResolver::new(Some(&catalog), ConnectionContext::default());
        let chunk = parse(
            "WITH a AS (SELECT e.*, d.Title FROM Employees e JOIN Departments d ON d.DepartmentID = e.DepartmentID), \
             b AS (SELECT Name, Title FROM a) \
             SELECT x.* FROM (SELECT Title AS Role FROM b) AS x (Label)",
        );
        let tree = build_scope_tree(&chunk);
        let tables = resolver.resolve_scope(&tree, tree.root(), &[]);
        assert_eq!(tables.len(), 1);
        assert_eq!(names(&tables[0].columns), vec!["Label"]);
        assert_eq!(tables[0].columns[0].data_type.as_deref(), Some("varchar(50)"));

        let a_body = tree.children(tree.root())[0];
        let env = Visibility::for_scope(&tree, tree.root(), Vec::new());
        let a = resolver
            .output_columns(tree.node(a_body).unwrap().chunk, &env, 0)
            .unwrap();
        assert_eq!(names(&a), vec!["EmployeeID", "Name", "DepartmentID", "Title"]);
    }

    #[test]
    fn test_temp_tables_come_from_visibility() {
        let resolver = ColumnResolver::offline();
        let temp = TempTable {
            name: "#recent".to_string(),
            kind: TempTableKind::Local,
            columns: vec![ColumnRef::new("OrderID").with_data_type("int")],
            created_in_batch: 0,
            created_at_line: 1,
        };
        let chunk = parse("SELECT r.OrderID FROM #recent r");
        let env = Visibility::new(Vec::new(), vec![&temp]);
        let table = resolver.resolve_table(&chunk.tables[0], &chunk, &env).unwrap();
        assert_eq!(names(&table.columns), vec!["OrderID"]);

        let hidden = resolver
            .resolve_table(&chunk.tables[0], &chunk, &Visibility::default())
            .unwrap();
        assert!(hidden.columns.is_empty());
    }

    #[test]
    fn test_depth_limit_is_an_error() {
        let catalog = catalog();
        let resolver =
            ColumnResolver::new(Some(&catalog), ConnectionContext::default()).with_max_depth(1);
        let chunk = parse("SELECT * FROM (SELECT * FROM (SELECT * FROM Employees) a) b");
        let result = resolver.output_columns(&chunk, &Visibility::default(), 0);
        assert!(matches!(result, Err(SemanticError::DepthLimit { limit: 1 })));
    }

    #[test]
    fn test_find_column_source_reports_ambiguity() {
        let catalog = catalog();
        let resolver = ColumnResolver::new(Some(&catalog), ConnectionContext::default());
        let chunk = parse("SELECT * FROM Employees e JOIN Departments d ON 1 = 1");
        let tables: Vec<_> = chunk
            .tables
            .iter()
            .map(|t| resolver.resolve_table(t, &chunk, &Visibility::default()).unwrap())
            .collect();

        assert_eq!(resolver.find_column_source("Title", &tables).unwrap().name, "Departments");
        assert!(matches!(
            resolver.find_column_source("DepartmentID", &tables),
            Err(SemanticError::AmbiguousColumn(_, ref found)) if found == &["e", "d"]
        ));
        assert!(matches!(
            resolver.find_column_source("Salary", &tables),
            Err(SemanticError::ColumnNotFound(_))
        ));
    }
}
