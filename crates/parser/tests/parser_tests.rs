// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Buffer-level parser tests

use sqlsense_ir::{ClauseName, StatementType, SubqueryKind};
use sqlsense_parser::parse_buffer;

const REPORT: &str = "\
USE [Sales];
GO
-- staging
SELECT c.Id, c.Name INTO #recent
FROM dbo.Customers c
WHERE c.CreatedAt > '2024-01-01';

WITH totals AS (
    SELECT o.CustomerId, SUM(o.Amount) AS Total
    FROM dbo.Orders o
    GROUP BY o.CustomerId
)
SELECT r.Name, t.Total
FROM #recent r
JOIN totals t ON t.CustomerId = r.Id
WHERE t.Total > (SELECT AVG(Total) FROM totals);

UPDATE r SET r.Name = UPPER(r.Name) FROM #recent r;
GO
SELECT * FROM #recent
";

#[test]
fn test_report_buffer() {
    let parsed = parse_buffer(REPORT, Some("master"));
    assert_eq!(parsed.batch_count, 3);

    let types: Vec<_> = parsed.chunks.iter().map(|c| c.statement_type).collect();
    assert_eq!(
        types,
        vec![
            StatementType::Use,
            StatementType::Select,
            StatementType::Select,
            StatementType::Update,
            StatementType::Select,
        ]
    );
    assert!(
        parsed
            .chunks
            .iter()
            .all(|c| c.database.as_deref() == Some("Sales"))
    );

    let staging = &parsed.chunks[1];
    assert_eq!(staging.start_line, 4);
    let temp = staging.temp_table.as_ref().unwrap();
    assert_eq!(temp.name, "#recent");
    assert_eq!(temp.created_in_batch, 1);
    assert_eq!(temp.created_at_line, 4);

    let report = &parsed.chunks[2];
    assert_eq!(report.ctes[0].name, "totals");
    assert_eq!(report.ctes[0].defining_chunk.columns[1].name, "Total");
    assert!(report.tables[1].is_cte);
    assert!(report.tables[0].is_temp_table);
    let sub = &report.subqueries[0];
    assert_eq!(sub.kind, SubqueryKind::Expression);
    assert_eq!(sub.clause, Some(ClauseName::Where));
    assert!(sub.chunk.tables[0].is_cte);
    assert_eq!(report.clause_at(sqlsense_ir::Position::new(15, 8)), Some(ClauseName::From));

    let update = &parsed.chunks[3];
    assert_eq!(update.tables.len(), 1);
    assert_eq!(update.target_table().unwrap().name, "#recent");

    assert_eq!(parsed.chunks[4].go_batch_index, 2);
}

#[test]
fn test_partial_buffer_still_parses() {
    let parsed = parse_buffer("SELECT e. FROM Employees e WHERE e.", None);
    let chunk = &parsed.chunks[0];
    assert_eq!(chunk.tables[0].alias.as_deref(), Some("e"));
    assert!(!chunk.has_errors());
    assert_eq!(
        chunk.clause_positions.last().map(|c| c.clause),
        Some(ClauseName::Where)
    );
}

#[test]
fn test_chunks_serialize() {
    let parsed = parse_buffer("SELECT a FROM t", None);
    let json = serde_json::to_value(&parsed).unwrap();
    assert_eq!(json["chunks"][0]["tables"][0]["name"], "t");
}
