// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `WITH` clause parsing and CTE reference marking

use crate::parse::StatementParser;
use sqlsense_ir::{
    CteDef, IssueKind, Range, StatementChunk, StatementType, Token, TokenKind, ident_eq,
};
use tracing::debug;

impl StatementParser<'_> {
    /// Parse `WITH name [(cols)] AS (query) [, ...]`
    ///
    /// Returns the index of the first token of the statement body.
    pub(crate) fn parse_ctes(&mut self) -> usize {
        let len = self.slice.len();
        let mut idx = 1;

        while idx < len {
            let Some(name_token) = self.slice.get(idx).filter(|t| t.is_name()) else {
                break;
            };
            let name = name_token.text.clone();
            idx += 1;

            let mut explicit_columns = None;
            if self.slice.is_kind(idx, TokenKind::ParenOpen) && !self.slice.is_query_group(idx) {
                self.consumed.insert(idx);
                explicit_columns = Some(
                    self.slice
                        .group_inner(idx)
                        .iter()
                        .filter(|t| t.is_name())
                        .map(|t| t.text.clone())
                        .collect(),
                );
                idx = self.slice.skip_group(idx);
            }

            if self.slice.is_keyword(idx, "AS") {
                idx += 1;
            }
            if !self.slice.is_query_group(idx) {
                self.issue(
                    IssueKind::CteWithoutBody,
                    format!("CTE '{name}' has no query body"),
                    name_token.range(),
                );
                self.chunk.ctes.push(CteDef {
                    name,
                    explicit_columns,
                    defining_chunk: StatementChunk::new(StatementType::Unknown),
                    is_recursive: false,
                    range: name_token.range(),
                });
                // Resume at the body, skipping a non-query group if present
                if self.slice.is_kind(idx, TokenKind::ParenOpen) {
                    idx = self.slice.skip_group(idx);
                }
                if self.slice.is_kind(idx, TokenKind::Comma) {
                    idx += 1;
                    continue;
                }
                break;
            }

            self.consumed.insert(idx);
            let inner = self.slice.group_inner(idx);
            let defining_chunk = self.parse_nested(inner);
            let is_recursive = references_table(&defining_chunk, &name);
            if is_recursive && !has_union_all(inner) {
                self.issue(
                    IssueKind::RecursiveCteWithoutUnionAll,
                    format!("recursive CTE '{name}' should combine its members with UNION ALL"),
                    name_token.range(),
                );
            }
            let end = self.slice.skip_group(idx);
            self.chunk.ctes.push(CteDef {
                name,
                explicit_columns,
                defining_chunk,
                is_recursive,
                range: Range::new(name_token.start(), self.tokens()[end - 1].end),
            });
            idx = end;

            if self.slice.is_kind(idx, TokenKind::Comma) {
                idx += 1;
            } else {
                break;
            }
        }

        self.check_forward_references();
        idx
    }

    /// Warn when a CTE refers to a CTE declared after it
    fn check_forward_references(&mut self) {
        let mut found = Vec::new();
        for (i, cte) in self.chunk.ctes.iter().enumerate() {
            for later in &self.chunk.ctes[i + 1..] {
                if references_table(&cte.defining_chunk, &later.name) {
                    found.push((cte.name.clone(), later.name.clone(), cte.range));
                }
            }
        }
        for (name, later, range) in found {
            debug!(cte = %name, target = %later, "forward CTE reference");
            self.issue(
                IssueKind::CteForwardReference,
                format!("CTE '{name}' references '{later}', which is declared after it"),
                range,
            );
        }
    }
}

/// Check if an unqualified table reference to `name` appears in a chunk
/// or any of its subqueries
fn references_table(chunk: &StatementChunk, name: &str) -> bool {
    chunk
        .tables
        .iter()
        .any(|t| t.schema.is_none() && !t.is_subquery && ident_eq(&t.name, name))
        || chunk.subqueries.iter().any(|s| references_table(&s.chunk, name))
        || chunk
            .ctes
            .iter()
            .any(|c| references_table(&c.defining_chunk, name))
}

/// Check for a top-level `UNION ALL` in a CTE body
fn has_union_all(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    tokens.windows(2).any(|pair| {
        match pair[0].kind {
            TokenKind::ParenOpen => depth += 1,
            TokenKind::ParenClose => depth = depth.saturating_sub(1),
            _ => {}
        }
        depth == 0 && pair[0].is_keyword("UNION") && pair[1].is_keyword("ALL")
    })
}

/// Flag table references that name a visible CTE
///
/// A CTE sees the CTEs declared before it in the same `WITH`, plus itself
/// when recursive. The statement body and its subqueries see all of them.
pub(crate) fn mark_cte_references(chunk: &mut StatementChunk, visible: &[String]) {
    let mut scope = visible.to_vec();
    for cte in &mut chunk.ctes {
        let mut inner = scope.clone();
        if cte.is_recursive {
            inner.push(cte.name.clone());
        }
        mark_cte_references(&mut cte.defining_chunk, &inner);
        scope.push(cte.name.clone());
    }

    for table in &mut chunk.tables {
        let candidate = table.schema.is_none()
            && table.database.is_none()
            && !table.is_subquery
            && !table.is_tvf;
        if candidate && scope.iter().any(|name| ident_eq(name, &table.name)) {
            table.is_cte = true;
        }
    }
    for subquery in &mut chunk.subqueries {
        mark_cte_references(&mut subquery.chunk, &scope);
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_chunk;
    use sqlsense_ir::{ClauseName, IssueKind, StatementType};
    use sqlsense_lexer::tokenize;

    #[test]
    fn test_ctes_and_body() {
        let chunk = parse_chunk(&tokenize(
            "WITH a (x) AS (SELECT 1), b AS (SELECT x FROM a) SELECT * FROM b JOIN Users u ON 1 = 1",
        ));
        assert_eq!(chunk.statement_type, StatementType::Select);
        assert_eq!(chunk.ctes.len(), 2);
        assert_eq!(chunk.ctes[0].explicit_columns, Some(vec!["x".to_string()]));
        assert!(chunk.ctes[1].defining_chunk.tables[0].is_cte);
        assert!(chunk.tables[0].is_cte);
        assert!(!chunk.tables[1].is_cte);
        assert_eq!(chunk.clause_positions[0].clause, ClauseName::With);
        assert!(chunk.issues.is_empty());
    }

    #[test]
    fn test_forward_reference_is_not_a_cte() {
        let chunk = parse_chunk(&tokenize(
            "WITH a AS (SELECT * FROM b), b AS (SELECT 1 AS y) SELECT * FROM a",
        ));
        assert!(!chunk.ctes[0].defining_chunk.tables[0].is_cte);
        assert!(
            chunk
                .issues
                .iter()
                .any(|i| i.kind == IssueKind::CteForwardReference)
        );
    }

    #[test]
    fn test_recursive_cte() {
        let chunk = parse_chunk(&tokenize(
            "WITH tree AS (SELECT Id FROM Nodes UNION ALL SELECT n.Id FROM Nodes n JOIN tree t ON n.ParentId = t.Id) \
             SELECT * FROM tree",
        ));
        assert!(chunk.ctes[0].is_recursive);
        assert!(chunk.issues.is_empty());

        let chunk = parse_chunk(&tokenize(
            "WITH tree AS (SELECT Id FROM Nodes UNION SELECT n.Id FROM tree n) SELECT * FROM tree",
        ));
        assert_eq!(chunk.issues[0].kind, IssueKind::RecursiveCteWithoutUnionAll);
        assert!(!chunk.has_errors());
    }

    #[test]
    fn test_cte_without_body() {
        let chunk = parse_chunk(&tokenize("WITH a AS SELECT 1"));
        assert!(chunk.has_errors());
        assert_eq!(chunk.issues[0].kind, IssueKind::CteWithoutBody);
    }
}
