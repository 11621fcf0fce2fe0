// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! Buffer-level diagnostics
//!
//! Parse issues are recorded on the chunk that found them, which may be a
//! CTE body or a subquery; these helpers gather them for a whole buffer and
//! add the lints that need cross-statement state.

use crate::temp::TempTableRegistry;
use sqlsense_ir::{IssueKind, ParseIssue, StatementChunk, StatementType, TableRef, ident_eq};

/// Every parse issue of `chunks` and their nested chunks, in source order
pub fn collect_issues(chunks: &[StatementChunk]) -> Vec<ParseIssue> {
    let mut issues = Vec::new();
    for chunk in chunks {
        gather(chunk, &mut issues);
    }
    sort_and_dedup(&mut issues);
    issues
}

fn gather(chunk: &StatementChunk, issues: &mut Vec<ParseIssue>) {
    issues.extend(chunk.issues.iter().cloned());
    for cte in &chunk.ctes {
        gather(&cte.defining_chunk, issues);
    }
    for subquery in &chunk.subqueries {
        gather(&subquery.chunk, issues);
    }
}

fn sort_and_dedup(issues: &mut Vec<ParseIssue>) {
    issues.sort_by_key(|i| (i.range.start, i.range.end));
    issues.dedup();
}

/// Warn about temp tables used where the buffer's own creation is out of reach
///
/// Only names this buffer creates somewhere are checked; a temp table that
/// comes from the session is assumed to exist. `DROP` statements are exempt
/// so `DROP TABLE IF EXISTS #t` before a `CREATE` stays quiet.
pub fn temp_table_issues(
    chunks: &[StatementChunk],
    registry: &TempTableRegistry,
) -> Vec<ParseIssue> {
    let mut issues = Vec::new();
    for chunk in chunks {
        if chunk.statement_type == StatementType::Drop {
            continue;
        }
        let mut tables = Vec::new();
        temp_refs(chunk, &mut tables);
        for table in tables {
            let created_here = chunk
                .temp_table
                .as_ref()
                .is_some_and(|t| ident_eq(&t.name, &table.name))
                || chunk.statement_type == StatementType::CreateTable;
            let known = registry.tables().any(|t| ident_eq(&t.name, &table.name));
            let visible = registry
                .find(&table.name, chunk.go_batch_index, table.range.start.line)
                .is_some();
            if known && !visible && !created_here {
                issues.push(ParseIssue::new(
                    IssueKind::TempTableNotInScope,
                    format!("temp table '{}' is not visible here", table.name),
                    table.range,
                ));
            }
        }
    }
    issues
}

fn temp_refs<'c>(chunk: &'c StatementChunk, out: &mut Vec<&'c TableRef>) {
    out.extend(chunk.tables.iter().filter(|t| t.is_temp_table));
    for cte in &chunk.ctes {
        temp_refs(&cte.defining_chunk, out);
    }
    for subquery in &chunk.subqueries {
        temp_refs(&subquery.chunk, out);
    }
}

/// Parse issues plus buffer-level lints, in source order
pub fn buffer_diagnostics(
    chunks: &[StatementChunk],
    registry: &TempTableRegistry,
) -> Vec<ParseIssue> {
    let mut issues = collect_issues(chunks);
    issues.extend(temp_table_issues(chunks, registry));
    sort_and_dedup(&mut issues);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ColumnResolver;
    use sqlsense_ir::Severity;
    use sqlsense_parser::parse_buffer;

    #[test]
    fn test_nested_issues_are_collected_in_order() {
        let parsed = parse_buffer(
            "SELECT * FROM (SELECT * FROM a FROM b) x\nSELECT * FROM (SELECT 1)",
            None,
        );
        let issues = collect_issues(&parsed.chunks);
        let kinds: Vec<_> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::DuplicateFrom, IssueKind::DerivedTableWithoutAlias]
        );
        assert!(issues.iter().all(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_temp_table_after_go_is_flagged() {
        let source = "\
DROP TABLE IF EXISTS #stage
SELECT Id INTO #stage FROM Orders
SELECT * FROM #stage
GO
SELECT * FROM #stage
SELECT * FROM #session_table
";
        let parsed = parse_buffer(source, None);
        let registry = TempTableRegistry::from_chunks(&parsed.chunks, &ColumnResolver::offline());
        let issues = buffer_diagnostics(&parsed.chunks, &registry);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::TempTableNotInScope);
        assert_eq!(issues[0].range.start.line, 5);
        assert!(!issues[0].is_error());
    }
}
