// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Table reference extraction: DML targets, `FROM`/`JOIN` lists, `USING`

use crate::parse::{JOIN_WORDS, StatementParser};
use sqlsense_ir::{
    ColumnRef, IssueKind, Range, SubqueryDef, SubqueryKind, TableRef, Token, TokenKind,
};

/// Table hints accepted in the legacy `table (NOLOCK)` form
const TABLE_HINTS: &[&str] = &[
    "NOLOCK", "READUNCOMMITTED", "READCOMMITTED", "REPEATABLEREAD", "SERIALIZABLE", "HOLDLOCK",
    "UPDLOCK", "ROWLOCK", "PAGLOCK", "TABLOCK", "TABLOCKX", "XLOCK", "READPAST", "NOWAIT",
    "INDEX",
];

impl StatementParser<'_> {
    /// Parse the table named in the statement head
    ///
    /// `INSERT [INTO] t`, `UPDATE [TOP (n)] t`, `DELETE [TOP (n)] [FROM] t`,
    /// `MERGE [TOP (n)] [INTO] t [AS alias]`.
    pub(crate) fn parse_target(&mut self, start: usize, end: usize) {
        let mut idx = start + 1;
        while idx < end {
            if self.slice.is_any_keyword(idx, &["INTO", "FROM", "PERCENT"]) {
                idx += 1;
            } else if self.slice.is_keyword(idx, "TOP") {
                idx += 1;
                if self.slice.is_kind(idx, TokenKind::ParenOpen) {
                    idx = self.slice.skip_group(idx);
                } else if self.slice.is_kind(idx, TokenKind::Number) {
                    idx += 1;
                }
            } else {
                break;
            }
        }
        let (table, _) = self.parse_table_item(idx, end);
        self.target = table;
    }

    /// Parse a comma- or join-separated table list between two indices
    ///
    /// `ON` conditions inside the range are skipped up to the next join.
    pub(crate) fn parse_table_list(&mut self, start: usize, end: usize) {
        let mut idx = start;
        while idx < end {
            let Some(token) = self.slice.get(idx) else {
                break;
            };
            if token.kind == TokenKind::Comma
                || token.is_any_keyword(JOIN_WORDS)
                || token.is_keyword("APPLY")
            {
                idx += 1;
                continue;
            }
            if token.is_keyword("ON") {
                idx = self.skip_condition(idx + 1, end);
                continue;
            }
            if token.is_keyword("AS") {
                self.issue(
                    IssueKind::AsWithoutExpression,
                    "AS without a preceding table",
                    token.range(),
                );
                idx += 2;
                continue;
            }
            if token.is_any_keyword(&["PIVOT", "UNPIVOT"]) {
                idx = self.slice.skip_group(idx + 1);
                let (_, next) = self.parse_alias(idx, end);
                idx = next;
                continue;
            }
            if token.kind == TokenKind::ParenOpen || token.is_name() {
                let (table, next) = self.parse_table_item(idx, end);
                if let Some(table) = table {
                    self.chunk.tables.push(table);
                }
                idx = next.max(idx + 1);
                continue;
            }
            idx += 1;
        }
    }

    /// Skip a join condition, stopping at the next join phrase or comma
    fn skip_condition(&self, mut idx: usize, end: usize) -> usize {
        while idx < end {
            let Some(token) = self.slice.get(idx) else {
                break;
            };
            match token.kind {
                TokenKind::ParenOpen => idx = self.slice.skip_group(idx),
                TokenKind::Comma => return idx,
                TokenKind::Keyword if token.is_any_keyword(JOIN_WORDS) => {
                    let function_call = token.is_any_keyword(&["LEFT", "RIGHT"])
                        && self.slice.is_kind(idx + 1, TokenKind::ParenOpen);
                    if !function_call {
                        return idx;
                    }
                    idx += 1;
                }
                _ => idx += 1,
            }
        }
        idx.min(end)
    }

    /// Parse a dotted object name: `[server.][db.][schema.]name`
    ///
    /// `db..name` leaves the schema empty. A trailing `.` (a name still
    /// being typed) yields no table.
    pub(crate) fn parse_table_name(&self, start: usize, end: usize) -> (Option<TableRef>, usize) {
        let Some(first) = self.slice.get(start).filter(|t| start < end && t.is_name()) else {
            return (None, start);
        };
        let mut parts = vec![first.text.clone()];
        let mut idx = start + 1;
        while idx < end && self.slice.is_kind(idx, TokenKind::Dot) {
            match self.slice.get(idx + 1) {
                Some(t) if idx + 1 < end && t.is_name() => {
                    parts.push(t.text.clone());
                    idx += 2;
                }
                Some(t) if idx + 1 < end && t.kind == TokenKind::Dot => {
                    parts.push(String::new());
                    idx += 1;
                }
                _ => return (None, idx + 1),
            }
        }

        let mut parts = parts.into_iter().rev();
        let name = parts.next().unwrap_or_default();
        let schema = parts.next().filter(|s| !s.is_empty());
        let database = parts.next().filter(|s| !s.is_empty());

        let mut table = TableRef::new(name).with_range(Range::new(
            first.start(),
            self.tokens()[idx - 1].end,
        ));
        table.schema = schema;
        table.database = database;
        (Some(table), idx)
    }

    /// Parse an optional alias: `AS name`, `name`, or `AS 'name'`
    pub(crate) fn parse_alias(&self, idx: usize, end: usize) -> (Option<String>, usize) {
        if idx >= end {
            return (None, idx);
        }
        match self.slice.get(idx) {
            Some(t) if t.is_keyword("AS") => match self.slice.get(idx + 1) {
                Some(a) if idx + 1 < end && a.is_name() => (Some(a.text.clone()), idx + 2),
                Some(a) if idx + 1 < end && a.kind == TokenKind::String => {
                    (Some(unquote(&a.text)), idx + 2)
                }
                _ => (None, idx + 1),
            },
            Some(t) if t.is_name() => (Some(t.text.clone()), idx + 1),
            _ => (None, idx),
        }
    }

    fn is_hint_group(&self, idx: usize) -> bool {
        let inner = self.slice.group_inner(idx);
        !inner.is_empty()
            && inner.iter().all(|t| {
                t.kind == TokenKind::Comma
                    || TABLE_HINTS.iter().any(|h| t.text.eq_ignore_ascii_case(h))
            })
    }

    /// Skip `WITH (hints)` and legacy `(NOLOCK)` hints
    fn skip_hints(&self, mut idx: usize, end: usize) -> usize {
        loop {
            if idx + 1 < end
                && self.slice.is_keyword(idx, "WITH")
                && self.slice.is_kind(idx + 1, TokenKind::ParenOpen)
            {
                idx = self.slice.skip_group(idx + 1);
            } else if idx < end
                && self.slice.is_kind(idx, TokenKind::ParenOpen)
                && self.is_hint_group(idx)
            {
                idx = self.slice.skip_group(idx);
            } else {
                return idx;
            }
        }
    }

    fn group_names(&self, idx: usize) -> Vec<ColumnRef> {
        self.slice
            .group_inner(idx)
            .iter()
            .filter(|t| t.is_name())
            .map(|t| ColumnRef::new(t.text.clone()))
            .collect()
    }

    /// Parse one table source: a name, a TVF call, or a parenthesized source
    pub(crate) fn parse_table_item(&mut self, start: usize, end: usize) -> (Option<TableRef>, usize) {
        let Some(first) = self.slice.get(start).filter(|_| start < end) else {
            return (None, start);
        };
        if first.kind == TokenKind::ParenOpen {
            return self.parse_parenthesized_source(start, end);
        }

        let (table, mut idx) = self.parse_table_name(start, end);
        let Some(mut table) = table else {
            return (None, idx);
        };

        if idx < end && self.slice.is_kind(idx, TokenKind::ParenOpen) && !self.is_hint_group(idx) {
            table.is_tvf = true;
            idx = self.slice.skip_group(idx);
        }
        idx = self.skip_hints(idx, end);

        let (alias, next) = self.parse_alias(idx, end);
        idx = next;
        if alias.is_some() && table.is_tvf && idx < end && self.slice.is_kind(idx, TokenKind::ParenOpen)
        {
            table.columns = self.group_names(idx);
            idx = self.slice.skip_group(idx);
        }
        idx = self.skip_hints(idx, end);

        table.alias = alias;
        table.range = Range::new(first.start(), self.tokens()[idx.max(start + 1) - 1].end);
        (Some(table), idx)
    }

    /// `(SELECT ...) [AS] alias [(cols)]` or a parenthesized join
    fn parse_parenthesized_source(&mut self, start: usize, end: usize) -> (Option<TableRef>, usize) {
        let after = self.slice.skip_group(start);
        if !self.slice.is_query_group(start) {
            let close = self.slice.close_of(start).unwrap_or(self.slice.len());
            self.parse_table_list(start + 1, close.min(end));
            return (None, after);
        }

        self.consumed.insert(start);
        let chunk = self.parse_nested(self.slice.group_inner(start));
        let group_range = self.slice.group_range(start);
        let (alias, mut idx) = self.parse_alias(after, end);
        let mut columns = Vec::new();
        if alias.is_some() && idx < end && self.slice.is_kind(idx, TokenKind::ParenOpen) {
            columns = self.group_names(idx);
            idx = self.slice.skip_group(idx);
        }

        // An unclosed subquery is still being typed
        if alias.is_none() && self.slice.close_of(start).is_some() {
            self.issue(
                IssueKind::DerivedTableWithoutAlias,
                "derived table requires an alias",
                group_range,
            );
        }
        self.chunk.subqueries.push(SubqueryDef {
            alias: alias.clone(),
            kind: SubqueryKind::Derived,
            clause: self.clause_of(start),
            range: group_range,
            chunk,
        });

        let table = alias.map(|alias| {
            let mut table = TableRef::new(alias.clone())
                .with_alias(alias)
                .with_columns(columns)
                .with_range(Range::new(
                    group_range.start,
                    self.tokens()[idx - 1].end,
                ));
            table.is_subquery = true;
            table
        });
        (table, idx)
    }
}

fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('N').unwrap_or(text);
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(inner)
        .replace("''", "'")
}

pub(crate) fn unquote_alias(token: &Token) -> String {
    match token.kind {
        TokenKind::String => unquote(&token.text),
        _ => token.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_chunk;
    use sqlsense_ir::IssueKind;
    use sqlsense_lexer::tokenize;

    #[test]
    fn test_schema_and_database_parts() {
        let chunk = parse_chunk(&tokenize("SELECT * FROM Sales.dbo.Orders AS o, Archive..Orders"));
        let first = &chunk.tables[0];
        assert_eq!(first.database.as_deref(), Some("Sales"));
        assert_eq!(first.schema.as_deref(), Some("dbo"));
        assert_eq!(first.alias.as_deref(), Some("o"));
        let second = &chunk.tables[1];
        assert_eq!(second.database.as_deref(), Some("Archive"));
        assert_eq!(second.schema, None);
    }

    #[test]
    fn test_bracketed_names_and_hints() {
        let chunk = parse_chunk(&tokenize(
            "SELECT * FROM [dbo].[Order]]Lines] ol WITH (NOLOCK) JOIN Items (NOLOCK) ON 1 = 1",
        ));
        assert_eq!(chunk.tables[0].name, "Order]Lines");
        assert_eq!(chunk.tables[0].alias.as_deref(), Some("ol"));
        assert_eq!(chunk.tables[1].name, "Items");
        assert!(!chunk.tables[1].is_tvf);
        assert!(chunk.ctes.is_empty());
    }

    #[test]
    fn test_table_valued_functions_and_apply() {
        let chunk = parse_chunk(&tokenize(
            "SELECT * FROM dbo.fn_Active(1) a CROSS APPLY STRING_SPLIT(a.Tags, ',') s",
        ));
        assert!(chunk.tables[0].is_tvf);
        assert_eq!(chunk.tables[0].alias.as_deref(), Some("a"));
        assert!(chunk.tables[1].is_tvf);
        assert_eq!(chunk.tables[1].name, "STRING_SPLIT");
    }

    #[test]
    fn test_temp_table_reference() {
        let chunk = parse_chunk(&tokenize("SELECT * FROM #stage s JOIN ##shared g ON 1 = 1"));
        assert!(chunk.tables.iter().all(|t| t.is_temp_table));
    }

    #[test]
    fn test_derived_table_with_column_aliases() {
        let chunk = parse_chunk(&tokenize("SELECT d.a FROM (SELECT 1, 2) AS d (a, b)"));
        let derived = &chunk.tables[0];
        assert!(derived.is_subquery);
        assert_eq!(derived.columns.len(), 2);
        assert_eq!(derived.subquery_index, Some(0));
    }

    #[test]
    fn test_unclosed_derived_table_needs_no_alias_yet() {
        let chunk = parse_chunk(&tokenize("SELECT * FROM (SELECT a FROM t"));
        assert!(!chunk.has_errors());
        assert_eq!(chunk.subqueries.len(), 1);
    }

    #[test]
    fn test_as_without_table() {
        let chunk = parse_chunk(&tokenize("SELECT * FROM AS x"));
        assert_eq!(chunk.issues[0].kind, IssueKind::AsWithoutExpression);
    }

    #[test]
    fn test_parenthesized_join() {
        let chunk = parse_chunk(&tokenize("SELECT * FROM (a JOIN b ON a.id = b.id) JOIN c ON 1 = 1"));
        let names: Vec<_> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
