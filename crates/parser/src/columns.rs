// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Select-list extraction and `SELECT ... INTO #t`

use crate::cursor::{TokenSlice, split_top_level, tokens_text, word_is};
use crate::parse::StatementParser;
use crate::tables::unquote_alias;
use sqlsense_ir::{ColumnRef, IssueKind, TempTable, TempTableKind, Token, TokenKind};

const CAST_FUNCTIONS: &[&str] = &["CAST", "TRY_CAST", "CONVERT", "TRY_CONVERT"];

impl StatementParser<'_> {
    /// Parse the select list between `SELECT` and the next clause
    pub(crate) fn parse_select_list(&mut self, start: usize, end: usize) {
        let idx = self.skip_select_modifiers(start, end);
        if idx >= end {
            return;
        }
        for item in split_top_level(&self.tokens()[idx..end], TokenKind::Comma) {
            if let Some(column) = self.parse_select_item(item) {
                self.chunk.columns.push(column);
            }
        }
    }

    /// Skip `DISTINCT`, `ALL`, `TOP n [PERCENT] [WITH TIES]`
    fn skip_select_modifiers(&self, mut idx: usize, end: usize) -> usize {
        while idx < end {
            if self.slice.is_any_keyword(idx, &["DISTINCT", "ALL", "PERCENT"]) {
                idx += 1;
            } else if self.slice.is_keyword(idx, "TOP") {
                idx += 1;
                if self.slice.is_kind(idx, TokenKind::ParenOpen) {
                    idx = self.slice.skip_group(idx);
                } else if self.slice.is_kind(idx, TokenKind::Number) {
                    idx += 1;
                }
            } else if self.slice.is_keyword(idx, "WITH") && self.slice.is_keyword(idx + 1, "TIES") {
                idx += 2;
            } else {
                break;
            }
        }
        idx
    }

    fn parse_select_item(&mut self, item: &[Token]) -> Option<ColumnRef> {
        let first = item.first()?;
        if first.is_keyword("AS") {
            self.issue(
                IssueKind::AsWithoutExpression,
                "AS without a preceding expression",
                first.range(),
            );
            return None;
        }
        // T-SQL `alias = expression`
        if item.len() > 2 && first.is_name() && item[1].is_operator("=") {
            return Some(self.expression_column(&item[2..], Some(first.text.clone())));
        }
        let (expr, alias) = split_alias(item);
        if expr.is_empty() {
            return None;
        }
        Some(self.expression_column(expr, alias))
    }

    fn expression_column(&mut self, expr: &[Token], alias: Option<String>) -> ColumnRef {
        match expr {
            [star] if star.is_operator("*") => return ColumnRef::star(None),
            [.., qualifier, dot, star]
                if star.is_operator("*") && dot.kind == TokenKind::Dot && qualifier.is_name() =>
            {
                return ColumnRef::star(Some(&qualifier.text));
            }
            _ => {}
        }

        if let Some((column, qualifier)) = column_path(expr) {
            let name = alias.unwrap_or_else(|| column.text.clone());
            let mut col = ColumnRef::new(name);
            if let Some(q) = qualifier {
                col = col.with_source(q.text.clone());
            }
            if col.name != column.text {
                col = col.with_expression(column.text.clone());
            }
            return col;
        }

        let name = match alias {
            Some(alias) => alias,
            None => self.next_placeholder(),
        };
        ColumnRef::new(name)
            .with_expression(tokens_text(expr))
            .with_data_type_opt(cast_type(expr))
    }

    /// Record `SELECT ... INTO #t` as a temp table carrying the select list
    pub(crate) fn parse_select_into(&mut self, start: usize, end: usize) {
        let (Some(table), _) = self.parse_table_name(start, end) else {
            return;
        };
        let Some(kind) = TempTableKind::from_name(&table.name) else {
            return;
        };
        self.chunk.temp_table = Some(TempTable {
            name: table.name,
            kind,
            columns: self.chunk.columns.clone(),
            created_in_batch: 0,
            created_at_line: table.range.start.line,
        });
    }
}

/// Split a trailing alias off a select item
fn split_alias(item: &[Token]) -> (&[Token], Option<String>) {
    let n = item.len();
    match item {
        [.., as_kw, alias]
            if n >= 3
                && as_kw.is_keyword("AS")
                && (alias.is_name() || alias.kind == TokenKind::String) =>
        {
            (&item[..n - 2], Some(unquote_alias(alias)))
        }
        [.., as_kw] if as_kw.is_keyword("AS") => (&item[..n - 1], None),
        [.., prev, alias] if alias.is_name() && can_precede_alias(prev) => {
            (&item[..n - 1], Some(alias.text.clone()))
        }
        _ => (item, None),
    }
}

/// Check if a token can end an expression that is followed by a bare alias
fn can_precede_alias(token: &Token) -> bool {
    token.is_name()
        || token.is_keyword("END")
        || token.is_keyword("NULL")
        || matches!(
            token.kind,
            TokenKind::Number | TokenKind::String | TokenKind::ParenClose
        )
}

/// `col`, `t.col`, `s.t.col`: returns the column and its qualifier
fn column_path(expr: &[Token]) -> Option<(&Token, Option<&Token>)> {
    if expr.is_empty() || expr.len() % 2 == 0 {
        return None;
    }
    let well_formed = expr.iter().enumerate().all(|(i, t)| {
        if i % 2 == 0 {
            t.is_name()
        } else {
            t.kind == TokenKind::Dot
        }
    });
    if !well_formed {
        return None;
    }
    let column = expr.last()?;
    let qualifier = expr.len().checked_sub(3).map(|i| &expr[i]);
    Some((column, qualifier))
}

/// Target type of an outermost `CAST`/`CONVERT` call
pub fn cast_type(expr: &[Token]) -> Option<String> {
    let func = expr.first()?;
    if !CAST_FUNCTIONS.iter().any(|f| word_is(func, f)) {
        return None;
    }
    if TokenSlice::new(expr).close_of(1) != Some(expr.len() - 1) {
        return None;
    }
    let inner = &expr[2..expr.len() - 1];
    let type_tokens = if word_is(func, "CAST") || word_is(func, "TRY_CAST") {
        let mut depth = 0usize;
        let mut as_at = None;
        for (i, token) in inner.iter().enumerate() {
            match token.kind {
                TokenKind::ParenOpen => depth += 1,
                TokenKind::ParenClose => depth = depth.saturating_sub(1),
                _ if depth == 0 && token.is_keyword("AS") => as_at = Some(i),
                _ => {}
            }
        }
        &inner[as_at? + 1..]
    } else {
        split_top_level(inner, TokenKind::Comma).into_iter().next()?
    };
    (!type_tokens.is_empty()).then(|| tokens_text(type_tokens))
}
