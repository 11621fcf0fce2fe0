// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # sqlsense semantic layer
//!
//! Works on the [`StatementChunk`](sqlsense_ir::StatementChunk)s produced by
//! the parser and answers questions that need more than one statement or
//! more than one nesting level:
//!
//! - [`scope`]: the scope tree of a statement, CTE horizons and
//!   correlated-subquery visibility
//! - [`resolve`]: column lists for every table source, including derived
//!   tables, CTEs, temp tables and catalog tables
//! - [`temp`]: temp table lifetimes across `GO` batches, per buffer
//! - [`types`]: the comparison and branch type checker
//! - [`diagnostics`]: buffer-wide issue collection
//!
//! ```rust
//! use sqlsense_semantic::{ColumnResolver, build_scope_tree};
//!
//! let chunk = sqlsense_parser::parse_chunk(&sqlsense_lexer::tokenize(
//!     "SELECT x.a FROM (SELECT 1 AS a) x",
//! ));
//! let tree = build_scope_tree(&chunk);
//! let tables = ColumnResolver::offline().resolve_scope(&tree, tree.root(), &[]);
//! assert_eq!(tables[0].columns[0].name, "a");
//! ```

pub mod diagnostics;
pub mod error;
pub mod resolve;
pub mod scope;
pub mod temp;
pub mod types;

pub use diagnostics::{buffer_diagnostics, collect_issues, temp_table_issues};
pub use error::{SemanticError, SemanticResult};
pub use resolve::{ColumnResolver, Visibility};
pub use scope::{
    DEFAULT_MAX_DEPTH, ScopeId, ScopeKind, ScopeNode, ScopeTree, ScopedTable, build_scope_tree,
    build_scope_tree_with_depth,
};
pub use temp::{BufferId, TempTableRegistry, TempTableStore};
pub use types::{
    BranchKind, ErrorKind, Operand, SpatialKind, TypeChecker, TypeFamily, Verdict, WarningKind,
    check, check_operands,
};
