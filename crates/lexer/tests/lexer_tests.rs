// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end tests over the text-level stages

use sqlsense_ir::TokenKind;
use sqlsense_lexer::{mask_comments, parse_query, remove_comments, split_by_go, tokenize};

const SCRIPT: &str = "\
USE Sales;
-- monthly totals
SELECT o.CustomerID, SUM(o.Total) /* gross */ AS Total
FROM dbo.Orders o
GROUP BY o.CustomerID;
GO
SELECT 'GO' AS Word
GO
USE [Archive]]2024]
SELECT * FROM Orders";

#[test]
fn sanitizer_properties_hold_for_script() {
    let (cleaned, stats) = remove_comments(SCRIPT);
    assert_eq!(stats.line_comments, 1);
    assert_eq!(stats.block_comments, 1);
    assert_eq!(cleaned.lines().count(), SCRIPT.lines().count());
    assert_eq!(remove_comments(&cleaned).0, cleaned);
    assert!(!cleaned.contains("--"));
    assert!(!cleaned.contains("/*"));
}

#[test]
fn masked_text_tokenizes_at_buffer_positions() {
    let masked = mask_comments(SCRIPT);
    let tokens = tokenize(&masked);
    let total = tokens
        .iter()
        .find(|t| t.text == "AS" && t.line == 3)
        .unwrap();
    assert_eq!(total.col, 47);
}

#[test]
fn script_splits_into_three_batches() {
    assert_eq!(split_by_go(SCRIPT).len(), 3);
}

#[test]
fn databases_follow_use_directives() {
    let (batches, info) = parse_query(SCRIPT, Some("master"));
    let databases: Vec<_> = batches.iter().map(|b| b.database.as_deref()).collect();
    assert_eq!(
        databases,
        vec![Some("Sales"), Some("Sales"), Some("Archive]2024")]
    );
    assert_eq!(info.batch_count, 3);
    assert_eq!(info.use_statements, 2);
    assert_eq!(batches[1].sql, "SELECT 'GO' AS Word");
    assert_eq!(batches[1].start_line, 7);
    assert_eq!(batches[2].start_line, 10);
    assert!(batches[2].original_had_use);
}

#[test]
fn batch_text_tokenizes_cleanly() {
    let (batches, _) = parse_query(SCRIPT, None);
    let tokens = tokenize(&batches[0].sql);
    assert_eq!(tokens[0].text, "SELECT");
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Dot));
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Semicolon));
}
