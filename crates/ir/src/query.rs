// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement Representation
//!
//! This module represents parsed SQL statements.
//!
//! ## Design
//!
//! The parser does not build a full syntax tree. Instead each logical
//! statement becomes a [`StatementChunk`]: a flat record of what the
//! statement references and where its clauses sit in the source. This is
//! what completion needs, and it can be produced from partial SQL.
//!
//! A chunk consists of:
//!
//! - **Tables**: [`TableRef`]s for every table, CTE, derived table, temp
//!   table and table-valued function referenced at this nesting level.
//!   For `INSERT`/`UPDATE`/`DELETE`/`MERGE`, `tables[0]` is the DML target.
//! - **Columns**: the projection, as [`ColumnRef`]s
//! - **CTEs**: [`CteDef`]s declared by a leading `WITH`
//! - **Subqueries**: nested [`SubqueryDef`]s, each with its own chunk
//! - **Clause positions**: ordered, disjoint source ranges per clause
//!
//! ## Example
//!
//! ```sql
//! WITH recent AS (SELECT * FROM Orders WHERE OrderDate > '2024-01-01')
//! SELECT c.Name, r.Total
//! FROM Customers c
//! JOIN recent r ON r.CustomerID = c.CustomerID
//! ```
//!
//! produces one chunk of type `Select` with tables `Customers c` and
//! `recent r` (a CTE reference), one CTE `recent` whose defining chunk holds
//! `Orders`, and clause positions for `WITH`, `SELECT`, `FROM`, `ON`.

use crate::ident::ident_eq;
use crate::issue::ParseIssue;
use crate::span::{Position, Range};
use serde::{Deserialize, Serialize};

/// Statement type, recognized from the leading keyword(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    CreateTable,
    CreateView,
    CreateProcedure,
    CreateFunction,
    Alter,
    Drop,
    Truncate,
    Declare,
    Set,
    Exec,
    Use,
    #[default]
    Unknown,
}

impl StatementType {
    /// Check if this statement modifies a target table
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::Merge
        )
    }

    /// Get the statement type as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Select => "SELECT",
            StatementType::Insert => "INSERT",
            StatementType::Update => "UPDATE",
            StatementType::Delete => "DELETE",
            StatementType::Merge => "MERGE",
            StatementType::CreateTable => "CREATE TABLE",
            StatementType::CreateView => "CREATE VIEW",
            StatementType::CreateProcedure => "CREATE PROCEDURE",
            StatementType::CreateFunction => "CREATE FUNCTION",
            StatementType::Alter => "ALTER",
            StatementType::Drop => "DROP",
            StatementType::Truncate => "TRUNCATE",
            StatementType::Declare => "DECLARE",
            StatementType::Set => "SET",
            StatementType::Exec => "EXEC",
            StatementType::Use => "USE",
            StatementType::Unknown => "UNKNOWN",
        }
    }
}

/// Major clause keywords whose source range is recorded per statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseName {
    With,
    Select,
    Into,
    From,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Set,
    Values,
    InsertColumns,
    Output,
    /// The table named right after `INSERT INTO`, `UPDATE`, `DELETE FROM`, `MERGE INTO`
    Target,
    /// `MERGE ... USING`
    Using,
    /// `MERGE ... WHEN [NOT] MATCHED`
    When,
    /// `UNION`, `EXCEPT`, `INTERSECT`
    SetOperation,
}

impl ClauseName {
    /// Get the clause name as written in SQL
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseName::With => "WITH",
            ClauseName::Select => "SELECT",
            ClauseName::Into => "INTO",
            ClauseName::From => "FROM",
            ClauseName::On => "ON",
            ClauseName::Where => "WHERE",
            ClauseName::GroupBy => "GROUP BY",
            ClauseName::Having => "HAVING",
            ClauseName::OrderBy => "ORDER BY",
            ClauseName::Set => "SET",
            ClauseName::Values => "VALUES",
            ClauseName::InsertColumns => "INSERT COLUMNS",
            ClauseName::Output => "OUTPUT",
            ClauseName::Target => "TARGET",
            ClauseName::Using => "USING",
            ClauseName::When => "WHEN",
            ClauseName::SetOperation => "UNION",
        }
    }
}

/// A clause keyword and the source range it governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClausePosition {
    pub clause: ClauseName,
    pub range: Range,
}

/// Column reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Output name: alias, else identifier, else an `exprN` placeholder
    pub name: String,
    /// Table or alias the column comes from, when known
    pub source_table: Option<String>,
    /// `*` or `alias.*`
    pub is_star: bool,
    /// Data type, filled from metadata when available
    pub data_type: Option<String>,
    /// Source text of a complex expression, when the column is not a plain identifier
    pub expression: Option<String>,
}

impl ColumnRef {
    /// Create a new column reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_table: None,
            is_star: false,
            data_type: None,
            expression: None,
        }
    }

    /// Create a `*` / `qualifier.*` column
    pub fn star(qualifier: Option<&str>) -> Self {
        Self {
            name: "*".to_string(),
            source_table: qualifier.map(str::to_string),
            is_star: true,
            data_type: None,
            expression: None,
        }
    }

    /// Builder method: set source table
    pub fn with_source(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    /// Builder method: set data type
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Builder method: set an optional data type
    pub fn with_data_type_opt(mut self, data_type: Option<String>) -> Self {
        self.data_type = data_type;
        self
    }

    /// Builder method: set expression text
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// Table reference
///
/// `columns` starts empty and is filled lazily by column resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Database part of a three-part name
    pub database: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub is_cte: bool,
    pub is_subquery: bool,
    pub is_temp_table: bool,
    pub is_tvf: bool,
    pub columns: Vec<ColumnRef>,
    /// Source range of the table reference
    pub range: Range,
    /// Index into the owning chunk's `subqueries` for derived tables
    pub subquery_index: Option<usize>,
}

impl TableRef {
    /// Create a new table reference
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_temp_table = name.starts_with('#');
        Self {
            database: None,
            schema: None,
            name,
            alias: None,
            is_cte: false,
            is_subquery: false,
            is_temp_table,
            is_tvf: false,
            columns: Vec::new(),
            range: Range::default(),
            subquery_index: None,
        }
    }

    /// Builder method: set schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method: set alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Builder method: set source range
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Builder method: set columns
    pub fn with_columns(mut self, columns: Vec<ColumnRef>) -> Self {
        self.columns = columns;
        self
    }

    /// Get the display name (alias if present, otherwise name)
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Check if this table is bound to `name` through its alias
    pub fn matches_alias(&self, name: &str) -> bool {
        self.alias.as_deref().is_some_and(|a| ident_eq(a, name))
    }

    /// Check if this table matches `name` by alias or bare name
    pub fn matches(&self, name: &str) -> bool {
        self.matches_alias(name) || ident_eq(&self.name, name)
    }

    /// Check whether this reference points at a real catalog object
    pub fn is_base_table(&self) -> bool {
        !(self.is_cte || self.is_subquery || self.is_temp_table)
    }

    /// Find a resolved column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnRef> {
        self.columns
            .iter()
            .find(|c| !c.is_star && ident_eq(&c.name, name))
    }
}

/// Common table expression declared by `WITH`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CteDef {
    pub name: String,
    /// `WITH name (a, b) AS (...)`
    pub explicit_columns: Option<Vec<String>>,
    pub defining_chunk: StatementChunk,
    /// The defining query references the CTE itself
    pub is_recursive: bool,
    /// Source range from the name to the closing parenthesis
    pub range: Range,
}

/// Where a subquery appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubqueryKind {
    /// `FROM (SELECT ...) AS alias`
    Derived,
    /// Any other parenthesized query (`IN (...)`, `EXISTS (...)`, scalar)
    Expression,
}

/// Nested query with its own tables and columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubqueryDef {
    pub alias: Option<String>,
    pub kind: SubqueryKind,
    /// Clause of the parent statement containing the subquery
    pub clause: Option<ClauseName>,
    /// Range from the opening parenthesis to just past the closing one
    pub range: Range,
    pub chunk: StatementChunk,
}

/// Temp table lifetime class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempTableKind {
    /// `#name`: destroyed at the next `GO`
    Local,
    /// `##name`: survives `GO` boundaries
    Global,
}

impl TempTableKind {
    /// Classify a temp table name by its `#` prefix count
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with("##") {
            Some(TempTableKind::Global)
        } else if name.starts_with('#') {
            Some(TempTableKind::Local)
        } else {
            None
        }
    }
}

/// Temp table created by `SELECT ... INTO #t` or `CREATE TABLE #t (...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempTable {
    pub name: String,
    pub kind: TempTableKind,
    pub columns: Vec<ColumnRef>,
    pub created_in_batch: usize,
    pub created_at_line: usize,
}

/// A `GO`-delimited slice of a buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Active database for this slice (`USE` or the buffer default)
    pub database: Option<String>,
    pub sql: String,
    /// This slice started with a `USE` directive
    pub original_had_use: bool,
    /// 0-based index of the `GO` batch this slice belongs to
    pub batch_number: usize,
    /// 1-based buffer line of the first line of `sql`
    pub start_line: usize,
}

/// One parsed logical statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementChunk {
    pub statement_type: StatementType,
    pub start_line: usize,
    pub end_line: usize,
    pub go_batch_index: usize,
    /// Range from the first token to the end of the last token
    pub range: Range,
    pub tables: Vec<TableRef>,
    pub columns: Vec<ColumnRef>,
    pub ctes: Vec<CteDef>,
    pub subqueries: Vec<SubqueryDef>,
    /// Ordered, disjoint clause ranges
    pub clause_positions: Vec<ClausePosition>,
    /// Explicit `INSERT INTO t (a, b)` column list
    pub insert_columns: Vec<String>,
    /// Temp table created by this statement
    pub temp_table: Option<TempTable>,
    pub issues: Vec<ParseIssue>,
    /// Active database when the statement was parsed
    pub database: Option<String>,
}

impl StatementChunk {
    /// Create an empty chunk of the given type
    pub fn new(statement_type: StatementType) -> Self {
        Self {
            statement_type,
            ..Default::default()
        }
    }

    /// First recorded range for a clause
    pub fn clause_range(&self, clause: ClauseName) -> Option<Range> {
        self.clause_positions
            .iter()
            .find(|c| c.clause == clause)
            .map(|c| c.range)
    }

    /// Clause governing `pos`: the last clause starting at or before it
    pub fn clause_at(&self, pos: Position) -> Option<ClauseName> {
        self.clause_positions
            .iter()
            .take_while(|c| c.range.start <= pos)
            .last()
            .map(|c| c.clause)
    }

    /// DML target table (`tables[0]` for INSERT/UPDATE/DELETE/MERGE)
    pub fn target_table(&self) -> Option<&TableRef> {
        if self.statement_type.is_dml() {
            self.tables.first()
        } else {
            None
        }
    }

    /// Find a table by alias first, then by bare name
    ///
    /// An alias shadows a table whose bare name is the same string.
    pub fn find_table(&self, name: &str) -> Option<&TableRef> {
        self.tables
            .iter()
            .find(|t| t.matches_alias(name))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|t| t.alias.is_none() && ident_eq(&t.name, name))
            })
            .or_else(|| self.tables.iter().find(|t| ident_eq(&t.name, name)))
    }

    /// Check whether any structural error was recorded
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ParseIssue::is_error)
    }

    /// Find a CTE declared by this statement
    pub fn find_cte(&self, name: &str) -> Option<&CteDef> {
        self.ctes.iter().find(|c| ident_eq(&c.name, name))
    }
}
