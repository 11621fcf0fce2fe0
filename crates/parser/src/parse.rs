// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement parser
//!
//! Builds a [`StatementChunk`] from the tokens of one statement.
//!
//! Parsing runs in three passes over the token slice:
//!
//! 1. **Markers**: top-level clause keywords are located and turned into
//!    ordered, disjoint clause ranges.
//! 2. **Extraction**: each clause range is handed to its extractor (target
//!    table, select list, table list, `INTO`, insert column list).
//! 3. **Subqueries**: every remaining parenthesized query becomes a nested
//!    chunk, parsed recursively.
//!
//! Nothing here fails. Malformed input yields a chunk with whatever could be
//! recognized plus [`ParseIssue`]s describing structural problems.

use crate::cte::mark_cte_references;
use crate::cursor::{TokenSlice, range_of, starts_query};
use crate::statement::statement_type;
use crate::temp_table;
use sqlsense_ir::{
    ClauseName, ClausePosition, IssueKind, ParseIssue, Range, StatementChunk, StatementType,
    SubqueryDef, SubqueryKind, TableRef, Token, TokenKind,
};
use std::collections::HashSet;
use tracing::trace;

/// Nesting limit for subqueries and CTE bodies
pub const MAX_NESTING: usize = 64;

/// Words that can begin a join phrase
pub(crate) const JOIN_WORDS: &[&str] = &["INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "JOIN"];

/// A clause keyword found at the top level of a statement
#[derive(Debug, Clone, Copy)]
pub(crate) struct Marker {
    pub clause: ClauseName,
    /// Index of the first token of the clause
    pub idx: usize,
    /// Exclusive end index when the clause is a closed group
    pub end: Option<usize>,
}

/// Parse the tokens of a single statement
///
/// # Examples
///
/// ```
/// use sqlsense_lexer::tokenize;
/// use sqlsense_parser::parse_chunk;
/// use sqlsense_ir::StatementType;
///
/// let chunk = parse_chunk(&tokenize("SELECT e.Name FROM dbo.Employees e"));
/// assert_eq!(chunk.statement_type, StatementType::Select);
/// assert_eq!(chunk.tables[0].alias.as_deref(), Some("e"));
/// ```
pub fn parse_chunk(tokens: &[Token]) -> StatementChunk {
    let mut chunk = StatementParser::new(tokens, 0).parse();
    mark_cte_references(&mut chunk, &[]);
    chunk
}

pub(crate) struct StatementParser<'a> {
    pub(crate) slice: TokenSlice<'a>,
    pub(crate) chunk: StatementChunk,
    pub(crate) nesting: usize,
    pub(crate) markers: Vec<Marker>,
    /// Paren groups already claimed by a CTE body, derived table or column list
    pub(crate) consumed: HashSet<usize>,
    /// DML target parsed from the statement head
    pub(crate) target: Option<TableRef>,
    expr_counter: usize,
}

impl<'a> StatementParser<'a> {
    pub(crate) fn new(tokens: &'a [Token], nesting: usize) -> Self {
        Self {
            slice: TokenSlice::new(tokens),
            chunk: StatementChunk::default(),
            nesting,
            markers: Vec::new(),
            consumed: HashSet::new(),
            target: None,
            expr_counter: 0,
        }
    }

    pub(crate) fn tokens(&self) -> &'a [Token] {
        self.slice.tokens()
    }

    pub(crate) fn issue(&mut self, kind: IssueKind, message: impl Into<String>, range: Range) {
        self.chunk.issues.push(ParseIssue::new(kind, message, range));
    }

    pub(crate) fn next_placeholder(&mut self) -> String {
        self.expr_counter += 1;
        format!("expr{}", self.expr_counter)
    }

    pub(crate) fn parse(mut self) -> StatementChunk {
        let tokens = self.tokens();
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return self.chunk;
        };
        self.chunk.range = range_of(tokens);
        self.chunk.start_line = first.line;
        self.chunk.end_line = last.end.line;

        if !self.slice.is_balanced() {
            self.issue(
                IssueKind::UnbalancedParentheses,
                "unbalanced parentheses",
                self.chunk.range,
            );
        }

        let body = if first.is_keyword("WITH") {
            self.parse_ctes()
        } else {
            0
        };
        self.chunk.statement_type = statement_type(&tokens[body.min(tokens.len())..]);
        if body > 0 {
            self.markers.push(Marker {
                clause: ClauseName::With,
                idx: 0,
                end: None,
            });
        }

        self.collect_markers(body);
        self.chunk.clause_positions = self.clause_positions();
        self.extract(body);
        self.collect_expression_subqueries();
        self.link_subqueries();

        trace!(
            statement = self.chunk.statement_type.as_str(),
            tables = self.chunk.tables.len(),
            columns = self.chunk.columns.len(),
            "parsed statement"
        );
        self.chunk
    }

    /// Parse a nested query, unwrapping redundant parentheses
    pub(crate) fn parse_nested(&self, mut inner: &[Token]) -> StatementChunk {
        while inner.first().is_some_and(|t| t.kind == TokenKind::ParenOpen) {
            let group = TokenSlice::new(inner);
            if group.close_of(0) != Some(inner.len() - 1) {
                break;
            }
            inner = &inner[1..inner.len() - 1];
        }
        if self.nesting + 1 > MAX_NESTING {
            let mut chunk = StatementChunk::new(StatementType::Select);
            chunk.range = range_of(inner);
            return chunk;
        }
        StatementParser::new(inner, self.nesting + 1).parse()
    }

    fn is_join_start(&self, idx: usize) -> bool {
        let Some(token) = self.slice.get(idx) else {
            return false;
        };
        if !token.is_any_keyword(JOIN_WORDS) {
            return false;
        }
        if token.is_any_keyword(&["LEFT", "RIGHT"]) {
            return !self.slice.is_kind(idx + 1, TokenKind::ParenOpen);
        }
        true
    }

    /// Check whether a name token appears between two indices
    fn has_name_between(&self, from: usize, to: usize) -> bool {
        self.tokens()[from..to].iter().any(Token::is_name)
    }

    fn is_insert_column_group(&self, idx: usize) -> bool {
        if self.slice.is_query_group(idx) {
            return false;
        }
        let prev = idx.checked_sub(1).and_then(|p| self.slice.get(p));
        match self.chunk.statement_type {
            StatementType::Insert => {
                self.markers.last().is_some_and(|m| m.clause == ClauseName::Target)
                    && prev.is_some_and(Token::is_name)
            }
            StatementType::Merge => prev.is_some_and(|p| p.is_keyword("INSERT")),
            _ => false,
        }
    }

    /// Locate top-level clause keywords from `body` on
    fn collect_markers(&mut self, body: usize) {
        let statement = self.chunk.statement_type;
        let len = self.slice.len();
        let mut idx = body;
        let mut case_depth = 0usize;
        let mut from_in_branch = false;

        if statement.is_dml() && body < len {
            self.push_marker(ClauseName::Target, body);
        }

        while idx < len {
            let token = &self.tokens()[idx];
            if token.kind == TokenKind::ParenOpen {
                let next = self.slice.skip_group(idx);
                if self.is_insert_column_group(idx) {
                    self.consumed.insert(idx);
                    self.markers.push(Marker {
                        clause: ClauseName::InsertColumns,
                        idx,
                        end: Some(next),
                    });
                }
                idx = next;
                continue;
            }
            if token.kind != TokenKind::Keyword {
                idx += 1;
                continue;
            }

            let upper = token.text.to_ascii_uppercase();
            let last = self.markers.last().map(|m| m.clause);
            let mut width = 1;
            let clause = match upper.as_str() {
                "CASE" => {
                    case_depth += 1;
                    None
                }
                "END" => {
                    case_depth = case_depth.saturating_sub(1);
                    None
                }
                "SELECT" => {
                    from_in_branch = false;
                    Some(ClauseName::Select)
                }
                "INTO" if statement == StatementType::Select && last == Some(ClauseName::Select) => {
                    Some(ClauseName::Into)
                }
                "FROM" => {
                    let in_delete_head = statement == StatementType::Delete
                        && last == Some(ClauseName::Target)
                        && self
                            .markers
                            .last()
                            .is_some_and(|m| !self.has_name_between(m.idx, idx));
                    if in_delete_head {
                        None
                    } else {
                        if from_in_branch {
                            self.issue(
                                IssueKind::DuplicateFrom,
                                "duplicate FROM clause",
                                token.range(),
                            );
                        }
                        from_in_branch = true;
                        Some(ClauseName::From)
                    }
                }
                _ if self.is_join_start(idx) => {
                    (last == Some(ClauseName::On)).then_some(ClauseName::From)
                }
                "ON" => Some(ClauseName::On),
                "WHERE" => Some(ClauseName::Where),
                "GROUP" if self.slice.is_keyword(idx + 1, "BY") => {
                    width = 2;
                    Some(ClauseName::GroupBy)
                }
                "ORDER" if self.slice.is_keyword(idx + 1, "BY") => {
                    width = 2;
                    Some(ClauseName::OrderBy)
                }
                "HAVING" => Some(ClauseName::Having),
                "UNION" | "EXCEPT" | "INTERSECT" => {
                    from_in_branch = false;
                    Some(ClauseName::SetOperation)
                }
                "SET" if matches!(statement, StatementType::Update | StatementType::Merge) => {
                    Some(ClauseName::Set)
                }
                "VALUES" if matches!(statement, StatementType::Insert | StatementType::Merge) => {
                    Some(ClauseName::Values)
                }
                "OUTPUT" if statement.is_dml() => Some(ClauseName::Output),
                "USING" if statement == StatementType::Merge => Some(ClauseName::Using),
                "WHEN" if statement == StatementType::Merge && case_depth == 0 => {
                    Some(ClauseName::When)
                }
                _ => None,
            };
            if let Some(clause) = clause {
                self.push_marker(clause, idx);
            }
            idx += width;
        }
    }

    fn push_marker(&mut self, clause: ClauseName, idx: usize) {
        self.markers.push(Marker {
            clause,
            idx,
            end: None,
        });
    }

    /// Token index where marker `k` stops
    pub(crate) fn marker_end(&self, k: usize) -> usize {
        let next = self.markers.get(k + 1).map_or(self.slice.len(), |m| m.idx);
        match self.markers[k].end {
            Some(end) => end.min(next),
            None => next,
        }
    }

    fn clause_positions(&self) -> Vec<ClausePosition> {
        let tokens = self.tokens();
        let statement_end = self.chunk.range.end;
        self.markers
            .iter()
            .enumerate()
            .map(|(k, marker)| {
                let start = tokens[marker.idx].start();
                let end = match (marker.end, self.markers.get(k + 1)) {
                    (Some(end), _) => tokens[end - 1].end,
                    (None, Some(next)) => tokens[next.idx].start(),
                    (None, None) => statement_end,
                };
                ClausePosition {
                    clause: marker.clause,
                    range: Range::new(start, end),
                }
            })
            .collect()
    }

    /// Clause of the marker governing token `idx`
    pub(crate) fn clause_of(&self, idx: usize) -> Option<ClauseName> {
        self.markers
            .iter()
            .take_while(|m| m.idx <= idx)
            .last()
            .map(|m| m.clause)
    }

    fn extract(&mut self, body: usize) {
        let statement = self.chunk.statement_type;
        let mut columns_done = false;

        for k in 0..self.markers.len() {
            let marker = self.markers[k];
            let end = self.marker_end(k);
            match marker.clause {
                ClauseName::Target => self.parse_target(marker.idx, end),
                ClauseName::Select if !columns_done => {
                    columns_done = true;
                    self.parse_select_list(marker.idx + 1, end);
                }
                ClauseName::Into => self.parse_select_into(marker.idx + 1, end),
                ClauseName::From => {
                    let start = if self.slice.is_keyword(marker.idx, "FROM") {
                        marker.idx + 1
                    } else {
                        marker.idx
                    };
                    self.parse_table_list(start, end);
                }
                ClauseName::Using => self.parse_table_list(marker.idx + 1, end),
                ClauseName::InsertColumns => {
                    let inner = self.slice.group_inner(marker.idx);
                    self.chunk.insert_columns = inner
                        .iter()
                        .filter(|t| t.is_name())
                        .map(|t| t.text.clone())
                        .collect();
                }
                _ => {}
            }
        }

        match statement {
            StatementType::CreateTable => self.parse_create_table(body),
            StatementType::Truncate | StatementType::Drop | StatementType::Alter => {
                self.parse_object_statement(body)
            }
            StatementType::Use => {
                self.chunk.database = self
                    .slice
                    .get(body + 1)
                    .filter(|t| t.is_name())
                    .map(|t| t.text.clone());
            }
            _ => {}
        }

        self.place_target();
    }

    /// Put the DML target at `tables[0]`
    ///
    /// `UPDATE u SET ... FROM Users u` names the target through a FROM alias;
    /// the aliased FROM table then becomes the target.
    fn place_target(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };
        let statement = self.chunk.statement_type;
        if matches!(statement, StatementType::Update | StatementType::Delete)
            && target.schema.is_none()
        {
            let tables = &self.chunk.tables;
            let found = tables
                .iter()
                .position(|t| t.matches_alias(&target.name))
                .or_else(|| {
                    tables.iter().position(|t| {
                        t.alias.is_none() && sqlsense_ir::ident_eq(&t.name, &target.name)
                    })
                });
            if let Some(pos) = found {
                let table = self.chunk.tables.remove(pos);
                self.chunk.tables.insert(0, table);
                return;
            }
        }
        self.chunk.tables.insert(0, target);
    }

    /// Tables named by `TRUNCATE TABLE t`, `DROP TABLE t`, `ALTER TABLE t`
    fn parse_object_statement(&mut self, body: usize) {
        if !self.slice.is_keyword(body + 1, "TABLE") {
            return;
        }
        let mut idx = body + 2;
        if self.slice.is_keyword(idx, "IF") && self.slice.is_keyword(idx + 1, "EXISTS") {
            idx += 2;
        }
        let end = self.slice.len();
        if let (Some(table), _) = self.parse_table_name(idx, end) {
            self.chunk.tables.push(table);
        }
    }

    fn parse_create_table(&mut self, body: usize) {
        let tokens = self.tokens();
        let Some(table_kw) = tokens[body..].iter().position(|t| t.is_keyword("TABLE")) else {
            return;
        };
        let idx = body + table_kw + 1;
        let (Some(table), next) = self.parse_table_name(idx, tokens.len()) else {
            return;
        };
        if self.slice.is_kind(next, TokenKind::ParenOpen) {
            self.consumed.insert(next);
            if let Some(temp) = temp_table::from_create_table(
                &table.name,
                self.slice.group_inner(next),
                tokens[idx].line,
            ) {
                self.chunk.temp_table = Some(temp);
            }
        }
        self.chunk.tables.push(table);
    }

    /// Record every unclaimed parenthesized query as an expression subquery
    fn collect_expression_subqueries(&mut self) {
        let len = self.slice.len();
        let mut idx = 0;
        while idx < len {
            if !self.slice.is_kind(idx, TokenKind::ParenOpen) {
                idx += 1;
                continue;
            }
            if self.consumed.contains(&idx) {
                idx = self.slice.skip_group(idx);
                continue;
            }
            if starts_query(self.slice.group_inner(idx)) {
                let chunk = self.parse_nested(self.slice.group_inner(idx));
                self.chunk.subqueries.push(SubqueryDef {
                    alias: None,
                    kind: SubqueryKind::Expression,
                    clause: self.clause_of(idx),
                    range: self.slice.group_range(idx),
                    chunk,
                });
                idx = self.slice.skip_group(idx);
                continue;
            }
            idx += 1;
        }
    }

    /// Sort subqueries by position and point derived tables at theirs
    fn link_subqueries(&mut self) {
        self.chunk
            .subqueries
            .sort_by_key(|s| (s.range.start.line, s.range.start.col));
        let subqueries = &self.chunk.subqueries;
        for table in self.chunk.tables.iter_mut().filter(|t| t.is_subquery) {
            table.subquery_index = subqueries
                .iter()
                .position(|s| s.kind == SubqueryKind::Derived && s.range.start == table.range.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlsense_ir::Position;
    use sqlsense_lexer::tokenize;

    fn parse(sql: &str) -> StatementChunk {
        parse_chunk(&tokenize(sql))
    }

    fn clauses(chunk: &StatementChunk) -> Vec<ClauseName> {
        chunk.clause_positions.iter().map(|c| c.clause).collect()
    }

    #[test]
    fn test_clause_positions_are_ordered_and_disjoint() {
        let chunk = parse("SELECT a FROM t WHERE a = 1 GROUP BY a HAVING COUNT(*) > 1 ORDER BY a");
        assert_eq!(
            clauses(&chunk),
            vec![
                ClauseName::Select,
                ClauseName::From,
                ClauseName::Where,
                ClauseName::GroupBy,
                ClauseName::Having,
                ClauseName::OrderBy,
            ]
        );
        for pair in chunk.clause_positions.windows(2) {
            assert!(pair[0].range.end <= pair[1].range.start);
        }
        let from = chunk.clause_range(ClauseName::From).unwrap();
        assert_eq!(from.start, Position::new(1, 10));
        assert_eq!(from.end, Position::new(1, 17));
    }

    #[test]
    fn test_join_after_on_reopens_from() {
        let chunk = parse("SELECT * FROM a JOIN b ON a.id = b.id LEFT JOIN c ON c.id = b.id WHERE 1 = 1");
        assert_eq!(
            clauses(&chunk),
            vec![
                ClauseName::Select,
                ClauseName::From,
                ClauseName::On,
                ClauseName::From,
                ClauseName::On,
                ClauseName::Where,
            ]
        );
        let names: Vec<_> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_from_is_an_error() {
        let chunk = parse("SELECT * FROM a FROM b");
        assert!(chunk.has_errors());
        assert_eq!(chunk.issues[0].kind, IssueKind::DuplicateFrom);

        let chunk = parse("SELECT * FROM a UNION SELECT * FROM b");
        assert!(!chunk.has_errors());
    }

    #[test]
    fn test_insert_target_is_first() {
        let chunk = parse("INSERT INTO dbo.Archive (Id, Name) SELECT o.Id, o.Name FROM Orders o");
        assert_eq!(chunk.statement_type, StatementType::Insert);
        assert_eq!(chunk.tables[0].name, "Archive");
        assert_eq!(chunk.tables[1].name, "Orders");
        assert_eq!(chunk.insert_columns, vec!["Id", "Name"]);
        assert_eq!(
            clauses(&chunk),
            vec![
                ClauseName::Target,
                ClauseName::InsertColumns,
                ClauseName::Select,
                ClauseName::From,
            ]
        );
    }

    #[test]
    fn test_update_alias_resolves_to_from_table() {
        let chunk = parse("UPDATE u SET u.Name = 'x' FROM dbo.Users u JOIN Roles r ON r.Id = u.RoleId");
        assert_eq!(chunk.tables.len(), 2);
        assert_eq!(chunk.tables[0].name, "Users");
        assert_eq!(chunk.tables[0].alias.as_deref(), Some("u"));
        assert_eq!(chunk.target_table().unwrap().schema.as_deref(), Some("dbo"));
    }

    #[test]
    fn test_delete_head_from_is_not_a_clause() {
        let chunk = parse("DELETE FROM Orders WHERE Id = 1");
        assert_eq!(clauses(&chunk), vec![ClauseName::Target, ClauseName::Where]);
        assert_eq!(chunk.tables[0].name, "Orders");
        assert!(!chunk.has_errors());

        let chunk = parse("DELETE o FROM Orders o JOIN Customers c ON c.Id = o.CustomerId");
        assert_eq!(chunk.tables[0].name, "Orders");
        assert_eq!(chunk.tables.len(), 2);
    }

    #[test]
    fn test_merge_target_and_source() {
        let chunk = parse(
            "MERGE INTO dbo.Stock AS t USING (SELECT Id, Qty FROM Incoming) AS s ON t.Id = s.Id \
             WHEN MATCHED THEN UPDATE SET t.Qty = s.Qty \
             WHEN NOT MATCHED THEN INSERT (Id, Qty) VALUES (s.Id, s.Qty);",
        );
        assert_eq!(chunk.statement_type, StatementType::Merge);
        assert_eq!(chunk.tables[0].name, "Stock");
        assert_eq!(chunk.tables[1].name, "s");
        assert!(chunk.tables[1].is_subquery);
        assert_eq!(chunk.tables[1].subquery_index, Some(0));
        assert_eq!(chunk.insert_columns, vec!["Id", "Qty"]);
        assert!(clauses(&chunk).contains(&ClauseName::Using));
        assert!(clauses(&chunk).contains(&ClauseName::When));
    }

    #[test]
    fn test_expression_subqueries_are_nested_chunks() {
        let chunk = parse(
            "SELECT Name FROM Customers c WHERE EXISTS (SELECT 1 FROM Orders o WHERE o.CustomerId = c.Id)",
        );
        assert_eq!(chunk.subqueries.len(), 1);
        let sub = &chunk.subqueries[0];
        assert_eq!(sub.kind, SubqueryKind::Expression);
        assert_eq!(sub.clause, Some(ClauseName::Where));
        assert_eq!(sub.chunk.tables[0].name, "Orders");
    }

    #[test]
    fn test_derived_table_without_alias() {
        let chunk = parse("SELECT * FROM (SELECT 1 AS x)");
        assert!(chunk.has_errors());
        assert_eq!(chunk.issues[0].kind, IssueKind::DerivedTableWithoutAlias);
        assert_eq!(chunk.subqueries.len(), 1);
    }

    #[test]
    fn test_unbalanced_parentheses_is_a_warning() {
        let chunk = parse("SELECT COUNT( FROM t");
        assert_eq!(chunk.issues[0].kind, IssueKind::UnbalancedParentheses);
        assert!(!chunk.has_errors());
    }

    #[test]
    fn test_partial_statement_degrades() {
        let chunk = parse("SELECT a, FROM");
        assert_eq!(chunk.statement_type, StatementType::Select);
        assert_eq!(chunk.columns.len(), 1);
        assert!(chunk.tables.is_empty());
    }

    #[test]
    fn test_truncate_and_create_table() {
        let chunk = parse("TRUNCATE TABLE dbo.Log");
        assert_eq!(chunk.tables[0].name, "Log");

        let chunk = parse("CREATE TABLE #Work (Id int NOT NULL, Label varchar(20), PRIMARY KEY (Id))");
        assert_eq!(chunk.statement_type, StatementType::CreateTable);
        let temp = chunk.temp_table.unwrap();
        assert_eq!(temp.name, "#Work");
        assert_eq!(temp.columns.len(), 2);
    }

    #[test]
    fn test_use_statement_records_database() {
        let chunk = parse("USE [Sales]");
        assert_eq!(chunk.statement_type, StatementType::Use);
        assert_eq!(chunk.database.as_deref(), Some("Sales"));
    }
}
