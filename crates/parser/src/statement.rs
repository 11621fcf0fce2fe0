// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Statement boundaries and statement type recognition

use crate::cursor::word_is;
use sqlsense_ir::{StatementType, Token, TokenKind};
use std::ops::Range as IndexRange;

/// Keywords that can open a new statement at the top level of a batch
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "TRUNCATE",
    "WITH", "DECLARE", "SET", "EXEC", "EXECUTE", "USE", "IF", "WHILE", "PRINT",
];

/// Object kinds that may be followed by `IF EXISTS` in a `DROP`
const OBJECT_KINDS: &[&str] = &[
    "TABLE", "VIEW", "PROCEDURE", "PROC", "FUNCTION", "INDEX", "TRIGGER", "SCHEMA",
];

/// Words following `BEGIN` that make it a statement instead of a block
const BEGIN_STATEMENTS: &[&str] = &["TRAN", "TRANSACTION", "DISTRIBUTED", "TRY", "CATCH"];

/// Recognize the statement type from the leading keyword(s)
///
/// For `WITH ... AS (...)` the type is taken from the first top-level
/// DML keyword after the CTE list.
pub fn statement_type(tokens: &[Token]) -> StatementType {
    let Some(first) = tokens.first() else {
        return StatementType::Unknown;
    };
    if first.kind == TokenKind::ParenOpen {
        return match tokens.iter().find(|t| t.kind != TokenKind::ParenOpen) {
            Some(t) if t.is_keyword("SELECT") => StatementType::Select,
            _ => StatementType::Unknown,
        };
    }
    if first.kind != TokenKind::Keyword {
        return StatementType::Unknown;
    }

    match first.text.to_ascii_uppercase().as_str() {
        "SELECT" => StatementType::Select,
        "INSERT" => StatementType::Insert,
        "UPDATE" => StatementType::Update,
        "DELETE" => StatementType::Delete,
        "MERGE" => StatementType::Merge,
        "ALTER" => StatementType::Alter,
        "DROP" => StatementType::Drop,
        "TRUNCATE" => StatementType::Truncate,
        "DECLARE" => StatementType::Declare,
        "SET" => StatementType::Set,
        "EXEC" | "EXECUTE" => StatementType::Exec,
        "USE" => StatementType::Use,
        "CREATE" => create_type(&tokens[1..]),
        "WITH" => with_body_type(tokens),
        _ => StatementType::Unknown,
    }
}

fn create_type(rest: &[Token]) -> StatementType {
    let mut words = rest
        .iter()
        .skip_while(|t| t.is_any_keyword(&["OR", "ALTER"]));
    match words.next() {
        Some(t) if word_is(t, "TABLE") => StatementType::CreateTable,
        Some(t) if word_is(t, "VIEW") => StatementType::CreateView,
        Some(t) if word_is(t, "PROC") || word_is(t, "PROCEDURE") => StatementType::CreateProcedure,
        Some(t) if word_is(t, "FUNCTION") => StatementType::CreateFunction,
        _ => StatementType::Unknown,
    }
}

fn with_body_type(tokens: &[Token]) -> StatementType {
    let mut depth = 0usize;
    for token in tokens {
        match token.kind {
            TokenKind::ParenOpen => depth += 1,
            TokenKind::ParenClose => depth = depth.saturating_sub(1),
            TokenKind::Keyword if depth == 0 => {
                match token.text.to_ascii_uppercase().as_str() {
                    "SELECT" => return StatementType::Select,
                    "INSERT" => return StatementType::Insert,
                    "UPDATE" => return StatementType::Update,
                    "DELETE" => return StatementType::Delete,
                    "MERGE" => return StatementType::Merge,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    StatementType::Unknown
}

/// Check whether `WITH` at `idx` opens a CTE list (`WITH name AS`/`WITH name (`)
fn opens_cte(tokens: &[Token], idx: usize) -> bool {
    let name = tokens.get(idx + 1).is_some_and(Token::is_name);
    let follow = tokens
        .get(idx + 2)
        .is_some_and(|t| t.is_keyword("AS") || t.kind == TokenKind::ParenOpen);
    name && follow
}

/// Tracks the statement currently being accumulated
#[derive(Default)]
struct Pending {
    head: StatementType,
    /// `WITH` seen but its main statement keyword not yet reached
    awaiting_body: bool,
    /// `INSERT` has reached its `SELECT`/`EXEC` source
    insert_source: bool,
}

impl Pending {
    fn start(tokens: &[Token], idx: usize) -> Self {
        let head = statement_type(&tokens[idx..]);
        Self {
            head,
            awaiting_body: tokens[idx].is_keyword("WITH"),
            insert_source: false,
        }
    }

    /// Decide whether the keyword at `idx` starts a new statement
    ///
    /// Updates the pending state when the keyword continues the current one.
    fn breaks_at(&mut self, tokens: &[Token], idx: usize) -> bool {
        let token = &tokens[idx];
        if !token.is_any_keyword(STATEMENT_KEYWORDS) {
            return false;
        }
        let prev = idx.checked_sub(1).and_then(|p| tokens.get(p));
        if prev.is_some_and(|p| p.is_any_keyword(&["THEN", "ON", "FOR"])) {
            return false;
        }
        let keyword = token.text.to_ascii_uppercase();
        let is_dml = matches!(
            keyword.as_str(),
            "SELECT" | "INSERT" | "UPDATE" | "DELETE" | "MERGE"
        );

        if self.awaiting_body && is_dml {
            self.awaiting_body = false;
            return false;
        }

        match keyword.as_str() {
            "SELECT" => {
                if prev.is_some_and(|p| p.is_any_keyword(&["UNION", "ALL", "EXCEPT", "INTERSECT"])) {
                    return false;
                }
                if self.head == StatementType::Insert && !self.insert_source {
                    self.insert_source = true;
                    return false;
                }
                if self.head == StatementType::CreateView && prev.is_some_and(|p| p.is_keyword("AS"))
                {
                    return false;
                }
                true
            }
            "EXEC" | "EXECUTE" => {
                if prev.is_some_and(|p| p.is_keyword("WITH")) {
                    return false;
                }
                if self.head == StatementType::Insert && !self.insert_source {
                    self.insert_source = true;
                    return false;
                }
                true
            }
            "WITH" => {
                if !opens_cte(tokens, idx) {
                    return false;
                }
                !matches!(
                    self.head,
                    StatementType::CreateView
                        | StatementType::CreateProcedure
                        | StatementType::CreateFunction
                        | StatementType::CreateTable
                )
            }
            "SET" => !matches!(
                self.head,
                StatementType::Update | StatementType::Merge | StatementType::Alter
            ),
            "DROP" => self.head != StatementType::Alter,
            // `DROP TABLE IF EXISTS t`
            "IF" => !(prev.is_some_and(|p| p.is_any_keyword(OBJECT_KINDS))
                && tokens.get(idx + 1).is_some_and(|t| word_is(t, "EXISTS"))),
            _ => true,
        }
    }
}

fn flush(statements: &mut Vec<IndexRange<usize>>, from: usize, to: usize) {
    if from < to {
        statements.push(from..to);
    }
}

/// Split a batch's tokens into statements
///
/// Statements end at a top-level `;`, before a statement-leading keyword,
/// and around `BEGIN`/`END`/`ELSE` block delimiters, which belong to no
/// statement. Returned ranges index into `tokens` and are never empty.
pub fn split_statements(tokens: &[Token]) -> Vec<IndexRange<usize>> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut case_depth = 0usize;
    let mut pending: Option<Pending> = None;
    let mut idx = 0;

    while idx < tokens.len() {
        let token = &tokens[idx];
        if idx == start && pending.is_none() {
            pending = Some(Pending::start(tokens, idx));
        }
        match token.kind {
            TokenKind::ParenOpen => {
                depth += 1;
                idx += 1;
                continue;
            }
            TokenKind::ParenClose => {
                depth = depth.saturating_sub(1);
                idx += 1;
                continue;
            }
            TokenKind::Semicolon if depth == 0 => {
                flush(&mut statements, start, idx);
                start = idx + 1;
                pending = None;
                case_depth = 0;
                idx += 1;
                continue;
            }
            _ => {}
        }
        if depth > 0 || token.kind != TokenKind::Keyword {
            idx += 1;
            continue;
        }

        if token.is_keyword("CASE") {
            case_depth += 1;
        } else if token.is_keyword("END") && case_depth > 0 {
            case_depth -= 1;
        } else if token.is_keyword("END") || (token.is_keyword("ELSE") && case_depth == 0) {
            // Block delimiter: close the statement and drop the token
            flush(&mut statements, start, idx);
            let skip = if tokens
                .get(idx + 1)
                .is_some_and(|t| word_is(t, "TRY") || word_is(t, "CATCH"))
            {
                2
            } else {
                1
            };
            idx += skip;
            start = idx;
            pending = None;
            continue;
        } else if token.is_keyword("BEGIN")
            && !tokens
                .get(idx + 1)
                .is_some_and(|t| BEGIN_STATEMENTS.iter().any(|w| word_is(t, w)))
        {
            flush(&mut statements, start, idx);
            idx += 1;
            start = idx;
            pending = None;
            continue;
        }

        let breaks = idx > start
            && pending
                .as_mut()
                .is_some_and(|state| state.breaks_at(tokens, idx));
        if breaks {
            flush(&mut statements, start, idx);
            start = idx;
            case_depth = 0;
            pending = Some(Pending::start(tokens, idx));
        }
        idx += 1;
    }
    flush(&mut statements, start, tokens.len());
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::tokens_text;
    use sqlsense_lexer::tokenize;

    fn split(sql: &str) -> Vec<String> {
        let tokens = tokenize(sql);
        split_statements(&tokens)
            .into_iter()
            .map(|r| tokens_text(&tokens[r]))
            .collect()
    }

    #[test]
    fn test_statement_type() {
        let cases = [
            ("SELECT 1", StatementType::Select),
            ("insert into t values (1)", StatementType::Insert),
            ("CREATE OR ALTER VIEW v AS SELECT 1", StatementType::CreateView),
            ("CREATE PROC p AS SELECT 1", StatementType::CreateProcedure),
            ("CREATE TABLE #t (a int)", StatementType::CreateTable),
            ("WITH c AS (SELECT 1 AS x) UPDATE t SET a = 1", StatementType::Update),
            ("EXECUTE sp_who", StatementType::Exec),
            ("(SELECT 1)", StatementType::Select),
            ("foo", StatementType::Unknown),
        ];
        for (sql, expected) in cases {
            assert_eq!(statement_type(&tokenize(sql)), expected, "{sql}");
        }
    }

    #[test]
    fn test_split_on_semicolon_and_keywords() {
        assert_eq!(
            split("SELECT a FROM t; SELECT b FROM u\nUPDATE t SET a = 1"),
            vec!["SELECT a FROM t", "SELECT b FROM u", "UPDATE t SET a = 1"]
        );
    }

    #[test]
    fn test_set_operations_and_insert_select_stay_together() {
        assert_eq!(
            split("SELECT a FROM t UNION ALL SELECT a FROM u"),
            vec!["SELECT a FROM t UNION ALL SELECT a FROM u"]
        );
        assert_eq!(
            split("INSERT INTO t (a) SELECT a FROM u SELECT 1"),
            vec!["INSERT INTO t(a) SELECT a FROM u", "SELECT 1"]
        );
    }

    #[test]
    fn test_cte_body_stays_with_cte() {
        assert_eq!(
            split("WITH c AS (SELECT 1 AS x) SELECT x FROM c SELECT 2"),
            vec!["WITH c AS (SELECT 1 AS x) SELECT x FROM c", "SELECT 2"]
        );
        assert_eq!(
            split("SELECT * FROM t WITH (NOLOCK) WHERE a = 1"),
            vec!["SELECT * FROM t WITH (NOLOCK) WHERE a = 1"]
        );
    }

    #[test]
    fn test_merge_actions_do_not_split() {
        let sql = "MERGE t USING s ON t.id = s.id \
                   WHEN MATCHED THEN UPDATE SET a = s.a \
                   WHEN NOT MATCHED THEN INSERT (id) VALUES (s.id)";
        assert_eq!(split(sql).len(), 1);
    }

    #[test]
    fn test_blocks_and_case() {
        assert_eq!(
            split("IF @x = 1 BEGIN SELECT CASE WHEN a = 1 THEN 2 ELSE 3 END AS c FROM t END ELSE SELECT 4"),
            vec![
                "IF @x = 1",
                "SELECT CASE WHEN a = 1 THEN 2 ELSE 3 END AS c FROM t",
                "SELECT 4",
            ]
        );
        assert_eq!(
            split("BEGIN TRY DELETE FROM t END TRY BEGIN CATCH PRINT 1 END CATCH"),
            vec!["BEGIN TRY", "DELETE FROM t", "BEGIN CATCH", "PRINT 1"]
        );
    }

    #[test]
    fn test_drop_if_exists_is_one_statement() {
        assert_eq!(
            split("DROP TABLE IF EXISTS #stage\nIF 1 = 1 PRINT 'x'"),
            vec!["DROP TABLE IF EXISTS #stage", "IF 1 = 1", "PRINT 'x'"]
        );
    }

    #[test]
    fn test_create_view_body_is_one_statement() {
        assert_eq!(
            split("CREATE VIEW v AS SELECT a FROM t"),
            vec!["CREATE VIEW v AS SELECT a FROM t"]
        );
        assert_eq!(
            split("CREATE PROCEDURE p AS SELECT a FROM t"),
            vec!["CREATE PROCEDURE p AS", "SELECT a FROM t"]
        );
    }
}
