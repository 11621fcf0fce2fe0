// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Scope tree
//!
//! A [`ScopeTree`] is an arena of [`ScopeNode`]s built over one parsed
//! statement. Every node borrows the chunk it describes; parent links are
//! indices, so a subquery can walk up to its enclosing query without any
//! reference cycles.
//!
//! ## Visibility rules
//!
//! - **Tables**: a scope sees its own tables. Expression subqueries and
//!   derived tables also see their ancestors' tables (correlation); a CTE
//!   body does not see the tables of the statement that declares it. An
//!   inner binding shadows an outer one with the same display name.
//! - **Aliases**: an alias wins over another table's bare name in the same
//!   scope (`FROM Employees Departments` binds `Departments` to `Employees`).
//! - **CTEs**: the i-th CTE of a `WITH` sees the CTEs declared before it,
//!   plus itself when recursive. The statement body and everything nested in
//!   it see all of them. Later CTEs are never visible to earlier ones.
//!
//! ```
//! use sqlsense_ir::Position;
//! use sqlsense_lexer::tokenize;
//! use sqlsense_parser::parse_chunk;
//! use sqlsense_semantic::build_scope_tree;
//!
//! let chunk = parse_chunk(&tokenize(
//!     "SELECT * FROM Orders o WHERE EXISTS (SELECT 1 FROM Lines l WHERE l.OrderID = o.ID)",
//! ));
//! let tree = build_scope_tree(&chunk);
//! let inner = tree.scope_at(Position::new(1, 60));
//! assert_ne!(inner, tree.root());
//! assert_eq!(tree.resolve_table("o", inner).unwrap().table.name, "Orders");
//! ```

use crate::error::{SemanticError, SemanticResult};
use serde::Serialize;
use sqlsense_ir::{
    ClauseName, CteDef, Position, Range, StatementChunk, SubqueryKind, TableRef, ident_eq,
};
use tracing::warn;

/// Default nesting limit for scope construction and column expansion
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Index of a node in a [`ScopeTree`]
pub type ScopeId = usize;

/// What introduced a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// The top-level statement
    Statement,
    /// A CTE body
    Cte,
    /// `FROM (SELECT ...) alias`
    Derived,
    /// `IN (...)`, `EXISTS (...)`, scalar subqueries
    Subquery,
}

impl ScopeKind {
    /// Check whether this scope may see its ancestors' tables
    pub fn is_correlated(&self) -> bool {
        matches!(self, ScopeKind::Derived | ScopeKind::Subquery)
    }
}

/// One scope: a statement chunk and its place in the tree
#[derive(Debug, Clone)]
pub struct ScopeNode<'a> {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub chunk: &'a StatementChunk,
    /// CTE name or derived table alias
    pub name: Option<String>,
    /// Source range, parentheses included for subqueries
    pub range: Range,
    /// Clause of the parent statement holding this scope
    pub clause: Option<ClauseName>,
    pub depth: usize,
    /// How many of the parent's CTEs this node may see, for CTE bodies
    cte_horizon: Option<usize>,
    /// The closing parenthesis has not been typed yet
    open: bool,
}

impl ScopeNode<'_> {
    /// Check whether a cursor at `pos` is inside this scope
    ///
    /// A cursor right after a closing parenthesis belongs to the parent, but
    /// an unclosed subquery keeps the cursor at its end.
    pub fn contains(&self, pos: Position) -> bool {
        match self.kind {
            ScopeKind::Statement => self.range.contains_inclusive(pos),
            _ => {
                self.range.start < pos
                    && (pos < self.range.end || (self.open && pos == self.range.end))
            }
        }
    }

    /// Alias (or bare name) to table bindings declared directly in this scope
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &TableRef)> {
        self.chunk.tables.iter().map(|t| (t.display_name(), t))
    }
}

/// A table reference together with the scope that declares it
#[derive(Debug, Clone, Copy)]
pub struct ScopedTable<'a> {
    pub table: &'a TableRef,
    pub scope: ScopeId,
    /// Chunk owning the reference, for derived-table subqueries and `USE` context
    pub owner: &'a StatementChunk,
}

/// Arena of scopes for one statement
#[derive(Debug, Clone)]
pub struct ScopeTree<'a> {
    nodes: Vec<ScopeNode<'a>>,
    max_depth: usize,
}

/// Build the scope tree of a statement with the default depth limit
pub fn build_scope_tree(chunk: &StatementChunk) -> ScopeTree<'_> {
    build_scope_tree_with_depth(chunk, DEFAULT_MAX_DEPTH)
}

/// Build the scope tree of a statement, ignoring scopes nested deeper than `max_depth`
pub fn build_scope_tree_with_depth(chunk: &StatementChunk, max_depth: usize) -> ScopeTree<'_> {
    let mut tree = ScopeTree {
        nodes: Vec::new(),
        max_depth,
    };
    let root = tree.push(NewNode {
        kind: ScopeKind::Statement,
        parent: None,
        chunk,
        name: None,
        range: chunk.range,
        clause: None,
        cte_horizon: None,
        open: false,
    });
    tree.add_children(root);
    tree
}

struct NewNode<'a> {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    chunk: &'a StatementChunk,
    name: Option<String>,
    range: Range,
    clause: Option<ClauseName>,
    cte_horizon: Option<usize>,
    open: bool,
}

impl<'a> ScopeTree<'a> {
    fn push(&mut self, new: NewNode<'a>) -> ScopeId {
        let id = self.nodes.len();
        let depth = new.parent.map_or(0, |p| self.nodes[p].depth + 1);
        self.nodes.push(ScopeNode {
            id,
            kind: new.kind,
            parent: new.parent,
            children: Vec::new(),
            chunk: new.chunk,
            name: new.name,
            range: new.range,
            clause: new.clause,
            depth,
            cte_horizon: new.cte_horizon,
            open: new.open,
        });
        if let Some(parent) = new.parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    /// CTE bodies first, in declaration order, then subqueries by position
    fn add_children(&mut self, id: ScopeId) {
        let node = &self.nodes[id];
        let chunk = node.chunk;
        if node.depth >= self.max_depth {
            if !(chunk.ctes.is_empty() && chunk.subqueries.is_empty()) {
                warn!(depth = node.depth, "scope depth limit reached, nested scopes ignored");
            }
            return;
        }

        for (i, cte) in chunk.ctes.iter().enumerate() {
            let horizon = if cte.is_recursive { i + 1 } else { i };
            let child = self.push(NewNode {
                kind: ScopeKind::Cte,
                parent: Some(id),
                chunk: &cte.defining_chunk,
                name: Some(cte.name.clone()),
                range: cte.range,
                clause: Some(ClauseName::With),
                cte_horizon: Some(horizon),
                open: cte.defining_chunk.range.end >= cte.range.end,
            });
            self.add_children(child);
        }

        for subquery in &chunk.subqueries {
            let kind = match subquery.kind {
                SubqueryKind::Derived => ScopeKind::Derived,
                SubqueryKind::Expression => ScopeKind::Subquery,
            };
            let child = self.push(NewNode {
                kind,
                parent: Some(id),
                chunk: &subquery.chunk,
                name: subquery.alias.clone(),
                range: subquery.range,
                clause: subquery.clause,
                cte_horizon: None,
                open: subquery.chunk.range.end >= subquery.range.end,
            });
            self.add_children(child);
        }
    }

    /// The top-level statement scope
    pub fn root(&self) -> ScopeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a scope by id
    pub fn node(&self, id: ScopeId) -> SemanticResult<&ScopeNode<'a>> {
        self.nodes.get(id).ok_or(SemanticError::InvalidScope(id))
    }

    pub fn children(&self, id: ScopeId) -> &[ScopeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Nesting depth, 0 for the statement itself
    pub fn depth(&self, id: ScopeId) -> usize {
        self.nodes.get(id).map_or(0, |n| n.depth)
    }

    /// Innermost scope containing `pos`
    pub fn scope_at(&self, pos: Position) -> ScopeId {
        let mut current = self.root();
        'descend: loop {
            for &child in self.children(current) {
                if self.nodes[child].contains(pos) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Scopes whose tables are visible from `id`, innermost first
    fn table_chain(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).map(|n| n.id);
        while let Some(cid) = current {
            chain.push(cid);
            let node = &self.nodes[cid];
            current = if node.kind.is_correlated() { node.parent } else { None };
        }
        chain
    }

    /// Resolve a table name or alias from scope `id`, walking outward
    ///
    /// Inside one scope an alias shadows a table with the same bare name.
    pub fn resolve_table(&self, name: &str, id: ScopeId) -> SemanticResult<ScopedTable<'a>> {
        self.node(id)?;
        self.table_chain(id)
            .into_iter()
            .find_map(|scope| {
                let owner = self.nodes[scope].chunk;
                owner.find_table(name).map(|table| ScopedTable {
                    table,
                    scope,
                    owner,
                })
            })
            .ok_or_else(|| SemanticError::TableNotFound(name.to_string()))
    }

    /// Every table visible from scope `id`, inner bindings first
    ///
    /// Outer tables whose display name is already bound further in are hidden.
    pub fn visible_tables(&self, id: ScopeId) -> Vec<ScopedTable<'a>> {
        let mut visible: Vec<ScopedTable<'a>> = Vec::new();
        for scope in self.table_chain(id) {
            let owner = self.nodes[scope].chunk;
            let inner = visible.len();
            for table in &owner.tables {
                let shadowed = visible[..inner]
                    .iter()
                    .any(|v| ident_eq(v.table.display_name(), table.display_name()));
                if !shadowed {
                    visible.push(ScopedTable {
                        table,
                        scope,
                        owner,
                    });
                }
            }
        }
        visible
    }

    /// Every CTE visible from scope `id`, innermost declarations first
    pub fn visible_ctes(&self, id: ScopeId) -> Vec<&'a CteDef> {
        let mut visible: Vec<&'a CteDef> = Vec::new();
        let mut limit = None;
        let mut current = self.nodes.get(id).map(|n| n.id);
        while let Some(cid) = current {
            let node = &self.nodes[cid];
            let ctes = &node.chunk.ctes;
            let count = limit.map_or(ctes.len(), |l: usize| l.min(ctes.len()));
            for cte in &ctes[..count] {
                if !visible.iter().any(|v| ident_eq(&v.name, &cte.name)) {
                    visible.push(cte);
                }
            }
            limit = node.cte_horizon;
            current = node.parent;
        }
        visible
    }

    /// Look up a CTE by name from scope `id`
    ///
    /// A name that matches a CTE declared later in an enclosing `WITH` is a
    /// forward reference and is rejected rather than resolved.
    pub fn find_cte(&self, name: &str, id: ScopeId) -> SemanticResult<Option<&'a CteDef>> {
        if let Some(cte) = self
            .visible_ctes(id)
            .into_iter()
            .find(|c| ident_eq(&c.name, name))
        {
            return Ok(Some(cte));
        }

        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            let parent_node = &self.nodes[parent];
            if let Some(horizon) = current.cte_horizon {
                let mut later = parent_node.chunk.ctes.iter().skip(horizon);
                if later.any(|c| ident_eq(&c.name, name)) {
                    return Err(SemanticError::CteForwardReference {
                        cte: current.name.clone().unwrap_or_default(),
                        target: name.to_string(),
                    });
                }
            }
            current = parent_node;
        }
        Ok(None)
    }

    /// Scopes from `id` up to the root
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = &ScopeNode<'a>> {
        let mut current = self.nodes.get(id);
        std::iter::from_fn(move || {
            let node = current?;
            current = node.parent.and_then(|p| self.nodes.get(p));
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsense_lexer::tokenize;
    use sqlsense_parser::parse_chunk;

    fn parse(sql: &str) -> StatementChunk {
        parse_chunk(&tokenize(sql))
    }

    #[test]
    fn test_cte_bodies_see_only_earlier_ctes() {
        let chunk = parse(
            "WITH C1 AS (SELECT Id FROM Orders), C2 AS (SELECT * FROM C1) SELECT * FROM C2",
        );
        let tree = build_scope_tree(&chunk);
        let root = tree.root();
        let c1 = tree.children(root)[0];
        let c2 = tree.children(root)[1];
        assert_eq!(tree.node(c1).unwrap().kind, ScopeKind::Cte);

        let names = |id| {
            tree.visible_ctes(id)
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>()
        };
        assert!(names(c1).is_empty());
        assert_eq!(names(c2), vec!["C1"]);
        assert_eq!(names(root), vec!["C1", "C2"]);

        assert!(matches!(
            tree.find_cte("C2", c1),
            Err(SemanticError::CteForwardReference { .. })
        ));
        assert_eq!(tree.find_cte("C1", c2).unwrap().unwrap().name, "C1");
        assert!(tree.find_cte("Orders", root).unwrap().is_none());
    }

    #[test]
    fn test_recursive_cte_sees_itself() {
        let chunk = parse(
            "WITH tree AS (SELECT Id FROM Nodes UNION ALL SELECT n.Id FROM Nodes n JOIN tree t ON n.ParentId = t.Id) SELECT * FROM tree",
        );
        let tree = build_scope_tree(&chunk);
        let body = tree.children(tree.root())[0];
        assert_eq!(tree.visible_ctes(body).len(), 1);
    }

    #[test]
    fn test_alias_shadows_bare_table_name() {
        let chunk = parse("SELECT Departments.Name FROM Employees Departments JOIN Departments d ON 1 = 1");
        let tree = build_scope_tree(&chunk);
        let found = tree.resolve_table("Departments", tree.root()).unwrap();
        assert_eq!(found.table.name, "Employees");
        assert_eq!(tree.resolve_table("d", tree.root()).unwrap().table.name, "Departments");
    }

    #[test]
    fn test_correlated_subquery_walks_up_but_parent_does_not_see_in() {
        let sql = "SELECT * FROM Orders o WHERE o.Total > (SELECT AVG(x.Total) FROM Orders x WHERE x.CustomerID = o.CustomerID)";
        let chunk = parse(sql);
        let tree = build_scope_tree(&chunk);
        let sub = tree.children(tree.root())[0];
        assert_eq!(tree.node(sub).unwrap().kind, ScopeKind::Subquery);
        assert_eq!(tree.node(sub).unwrap().clause, Some(ClauseName::Where));
        assert_eq!(tree.depth(sub), 1);

        let outer = tree.resolve_table("o", sub).unwrap();
        assert_eq!(outer.scope, tree.root());
        assert!(tree.resolve_table("x", tree.root()).is_err());

        let visible: Vec<_> = tree
            .visible_tables(sub)
            .iter()
            .map(|t| t.table.display_name().to_string())
            .collect();
        assert_eq!(visible, vec!["x", "o"]);
    }

    #[test]
    fn test_cte_body_does_not_see_statement_tables() {
        let chunk = parse("WITH c AS (SELECT * FROM Lines) SELECT * FROM Orders o JOIN c ON 1 = 1");
        let tree = build_scope_tree(&chunk);
        let body = tree.children(tree.root())[0];
        assert!(tree.resolve_table("o", body).is_err());
        assert_eq!(tree.visible_tables(body).len(), 1);
    }

    #[test]
    fn test_scope_at_finds_innermost() {
        let sql = "SELECT * FROM (SELECT Id FROM Orders WHERE Id IN (SELECT OrderID FROM Lines)) AS d";
        let chunk = parse(sql);
        let tree = build_scope_tree(&chunk);
        assert_eq!(tree.len(), 3);

        let derived = tree.children(tree.root())[0];
        assert_eq!(tree.node(derived).unwrap().name.as_deref(), Some("d"));
        let nested = tree.children(derived)[0];

        assert_eq!(tree.scope_at(Position::new(1, 3)), tree.root());
        assert_eq!(tree.scope_at(Position::new(1, 25)), derived);
        assert_eq!(tree.scope_at(Position::new(1, 60)), nested);
        // Right after the closing parenthesis of the derived table
        assert_eq!(tree.scope_at(Position::new(1, 78)), tree.root());
        assert_eq!(tree.ancestors(nested).count(), 3);
    }

    #[test]
    fn test_unclosed_subquery_keeps_cursor_at_end() {
        let sql = "SELECT * FROM Orders WHERE Id IN (SELECT OrderID FROM Lines";
        let chunk = parse(sql);
        let tree = build_scope_tree(&chunk);
        let end = Position::new(1, sql.len() + 1);
        assert_eq!(tree.scope_at(end), tree.children(tree.root())[0]);
    }

    #[test]
    fn test_depth_limit_stops_nesting() {
        let chunk = parse("SELECT * FROM a WHERE x IN (SELECT y FROM b WHERE y IN (SELECT z FROM c))");
        let tree = build_scope_tree_with_depth(&chunk, 1);
        assert_eq!(tree.len(), 2);
        assert!(matches!(tree.node(7), Err(SemanticError::InvalidScope(7))));
    }
}
