// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `CREATE TABLE #t (...)` column definitions

use crate::cursor::{split_top_level, tokens_text};
use sqlsense_ir::{ColumnRef, TempTable, TempTableKind, Token, TokenKind};

/// Words that open a table-level constraint instead of a column
const CONSTRAINT_WORDS: &[&str] = &["PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "CONSTRAINT", "INDEX"];

/// Words that end the data type of a column definition
const TYPE_TERMINATORS: &[&str] = &[
    "NOT", "NULL", "PRIMARY", "UNIQUE", "CHECK", "CONSTRAINT", "DEFAULT", "IDENTITY",
    "REFERENCES", "COLLATE", "INDEX", "FOREIGN",
];

/// Build a temp table from the definition list of `CREATE TABLE`
///
/// Returns `None` unless `name` starts with `#`.
pub(crate) fn from_create_table(name: &str, definitions: &[Token], line: usize) -> Option<TempTable> {
    let kind = TempTableKind::from_name(name)?;
    Some(TempTable {
        name: name.to_string(),
        kind,
        columns: column_definitions(definitions),
        created_in_batch: 0,
        created_at_line: line,
    })
}

/// Parse `name type [constraints]` items, skipping table constraints
pub fn column_definitions(definitions: &[Token]) -> Vec<ColumnRef> {
    split_top_level(definitions, TokenKind::Comma)
        .into_iter()
        .filter_map(|item| {
            let (name, rest) = item.split_first()?;
            if !name.is_name() || name.is_any_keyword(CONSTRAINT_WORDS) {
                return None;
            }
            let type_len = rest
                .iter()
                .position(|t| t.is_any_keyword(TYPE_TERMINATORS))
                .unwrap_or(rest.len());
            let data_type = (type_len > 0).then(|| tokens_text(&rest[..type_len]));
            Some(ColumnRef::new(name.text.clone()).with_data_type_opt(data_type))
        })
        .collect()
}
