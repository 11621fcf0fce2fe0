// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion context detection
//!
//! Classifies a cursor position in a T-SQL buffer and gathers what a
//! completion provider needs there: the mode, the word being typed, the
//! tables, CTEs and temp tables in scope and the columns the mode offers.
//!
//! Detection runs the whole pipeline on every call:
//!
//! 1. a cursor inside a string or comment yields [`CompletionMode::None`]
//! 2. the buffer is parsed and the statement chunk holding the cursor found
//! 3. a structural error before the cursor yields [`CompletionMode::Error`]
//! 4. the innermost scope and clause at the cursor pick the mode
//! 5. the tables visible from that scope are resolved to columns

use crate::cursor::{CursorWord, offset_at, position_at};
use crate::keywords::{KeywordProvider, SqlKeyword};
use serde::{Deserialize, Serialize};
use sqlsense_function_registry::{FunctionRegistry, FunctionType};
use sqlsense_ir::{
    ClauseName, ColumnRef, Position, StatementChunk, TableRef, TempTable, Token, TokenKind,
    ident_eq,
};
use sqlsense_lexer::{ScannerState, mask_comments, state_at, tokenize};
use sqlsense_parser::{ParsedBuffer, parse_buffer};
use sqlsense_semantic::{
    ColumnResolver, ScopeId, ScopeTree, TempTableRegistry, Visibility, build_scope_tree_with_depth,
    collect_issues,
};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Keywords after which a table name is expected
const TABLE_KEYWORDS: &[&str] = &[
    "FROM", "JOIN", "INTO", "UPDATE", "MERGE", "USING", "APPLY", "TABLE",
];

/// What kind of completion the cursor position calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Right after `alias.` or `table.`
    Qualified,
    /// After `[alias].`, or inside an opened `[` after `alias.`
    QualifiedBracket,
    Select,
    Where,
    On,
    Having,
    GroupBy,
    OrderBy,
    /// `UPDATE ... SET` and `MERGE ... UPDATE SET`
    Set,
    Values,
    /// `INSERT INTO t (|`
    InsertColumns,
    Output,
    /// A table name is expected
    From,
    /// Statement start or between clauses
    Keyword,
    /// Inside a string literal or comment; nothing is offered
    None,
    /// The statement has a structural error before the cursor
    Error,
}

impl CompletionMode {
    /// Get the mode name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionMode::Qualified => "qualified",
            CompletionMode::QualifiedBracket => "qualified_bracket",
            CompletionMode::Select => "select",
            CompletionMode::Where => "where",
            CompletionMode::On => "on",
            CompletionMode::Having => "having",
            CompletionMode::GroupBy => "group_by",
            CompletionMode::OrderBy => "order_by",
            CompletionMode::Set => "set",
            CompletionMode::Values => "values",
            CompletionMode::InsertColumns => "insert_columns",
            CompletionMode::Output => "output",
            CompletionMode::From => "from",
            CompletionMode::Keyword => "keyword",
            CompletionMode::None => "none",
            CompletionMode::Error => "error",
        }
    }

    /// Check if no completion should be offered
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionMode::None | CompletionMode::Error)
    }

    /// Check if this mode offers column names
    pub fn offers_columns(&self) -> bool {
        matches!(
            self,
            CompletionMode::Qualified
                | CompletionMode::QualifiedBracket
                | CompletionMode::Select
                | CompletionMode::Where
                | CompletionMode::On
                | CompletionMode::Having
                | CompletionMode::GroupBy
                | CompletionMode::OrderBy
                | CompletionMode::Set
                | CompletionMode::InsertColumns
                | CompletionMode::Output
        )
    }

    fn offers_functions(&self) -> bool {
        matches!(
            self,
            CompletionMode::Select
                | CompletionMode::Where
                | CompletionMode::On
                | CompletionMode::Having
                | CompletionMode::GroupBy
                | CompletionMode::OrderBy
                | CompletionMode::Set
                | CompletionMode::Values
                | CompletionMode::Output
        )
    }

    /// Mode for an unqualified cursor in `clause`
    fn for_clause(clause: Option<ClauseName>) -> Self {
        match clause {
            Some(ClauseName::Select) => CompletionMode::Select,
            Some(ClauseName::Where) => CompletionMode::Where,
            Some(ClauseName::On) => CompletionMode::On,
            Some(ClauseName::Having) => CompletionMode::Having,
            Some(ClauseName::GroupBy) => CompletionMode::GroupBy,
            Some(ClauseName::OrderBy) => CompletionMode::OrderBy,
            Some(ClauseName::Set) => CompletionMode::Set,
            Some(ClauseName::Values) => CompletionMode::Values,
            Some(ClauseName::InsertColumns) => CompletionMode::InsertColumns,
            Some(ClauseName::Output) => CompletionMode::Output,
            _ => CompletionMode::Keyword,
        }
    }
}

impl std::fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a completion provider needs at one cursor position
///
/// Rebuilt on every request; never cached across edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionContext {
    pub mode: CompletionMode,
    /// Identifier text typed left of the cursor
    pub prefix: String,
    /// Character right before the prefix
    pub trigger: Option<char>,
    /// Qualifier before the `.`: an alias or table, or a schema in `from` mode
    pub table_ref: Option<String>,
    /// Clause holding the cursor
    pub clause: Option<ClauseName>,
    /// Tables visible from the cursor's scope, inner bindings first, with columns
    pub tables_in_scope: Vec<TableRef>,
    /// Alias to table name
    pub aliases: BTreeMap<String, String>,
    /// CTE names visible from the cursor's scope
    pub ctes: Vec<String>,
    /// Temp tables alive at the cursor line
    pub temp_tables: Vec<TempTable>,
    /// Statement holding the cursor; `None` between statements
    pub chunk: Option<StatementChunk>,
    pub keywords: Vec<SqlKeyword>,
    /// Columns offered in this mode
    pub columns: Vec<ColumnRef>,
    /// Function names offered in this mode
    pub functions: Vec<String>,
    /// Active database at the cursor
    pub database: Option<String>,
}

impl CompletionContext {
    fn empty(mode: CompletionMode, word: &CursorWord) -> Self {
        Self {
            mode,
            prefix: word.prefix.clone(),
            trigger: word.trigger,
            table_ref: None,
            clause: None,
            tables_in_scope: Vec::new(),
            aliases: BTreeMap::new(),
            ctes: Vec::new(),
            temp_tables: Vec::new(),
            chunk: None,
            keywords: Vec::new(),
            columns: Vec::new(),
            functions: Vec::new(),
            database: None,
        }
    }

    /// Display names of the tables in scope
    pub fn table_names(&self) -> Vec<&str> {
        self.tables_in_scope.iter().map(|t| t.display_name()).collect()
    }

    /// Names of the columns offered
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Detects completion contexts
///
/// Holds the column resolver (and through it the metadata source), the
/// keyword provider and the builtin function registry.
#[derive(Debug)]
pub struct ContextDetector<'r> {
    resolver: ColumnResolver<'r>,
    keywords: KeywordProvider,
    functions: FunctionRegistry,
}

impl<'r> ContextDetector<'r> {
    pub fn new(resolver: ColumnResolver<'r>) -> Self {
        Self {
            resolver,
            keywords: KeywordProvider::new(),
            functions: FunctionRegistry::new(),
        }
    }

    /// A detector without a metadata source
    ///
    /// Real tables get no columns; CTEs, derived tables and temp tables
    /// still resolve from their definitions.
    pub fn offline() -> Self {
        Self::new(ColumnResolver::offline())
    }

    /// Builder method: replace the function registry
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn resolver(&self) -> &ColumnResolver<'r> {
        &self.resolver
    }

    /// Detect the context at a 1-based `(line, col)` of `source`
    ///
    /// Temp tables are tracked for this call only; use [`detect_in`] to
    /// share a registry across calls.
    ///
    /// [`detect_in`]: ContextDetector::detect_in
    pub fn detect(&self, source: &str, line: usize, col: usize) -> CompletionContext {
        let parsed = parse_buffer(source, self.resolver.context().database.as_deref());
        let temps = TempTableRegistry::from_chunks(&parsed.chunks, &self.resolver);
        self.detect_in(source, &parsed, &temps, line, col)
    }

    /// Detect the context in an already parsed buffer
    #[instrument(skip_all, fields(line, col))]
    pub fn detect_in(
        &self,
        source: &str,
        parsed: &ParsedBuffer,
        temps: &TempTableRegistry,
        line: usize,
        col: usize,
    ) -> CompletionContext {
        let offset = offset_at(source, line, col);
        let state = state_at(source, offset);
        let word = CursorWord::read(source, offset, state == ScannerState::Bracket);
        if state.is_literal_or_comment() && state != ScannerState::Bracket {
            trace!(?state, "cursor inside literal or comment");
            return CompletionContext::empty(CompletionMode::None, &word);
        }

        let cursor = position_at(source, offset);
        let word_start = position_at(source, word.start);
        let tokens = tokenize(&mask_comments(source));
        let before: Vec<&Token> = tokens.iter().filter(|t| t.end <= word_start).collect();

        let Some(chunk) = enclosing_chunk(parsed, cursor, &before) else {
            return self.between_statements(parsed, temps, cursor, word);
        };

        let mut context = CompletionContext::empty(CompletionMode::Keyword, &word);
        context.database = chunk
            .database
            .clone()
            .or_else(|| self.resolver.context().database.clone());
        context.chunk = Some(chunk.clone());

        if let Some(issue) = collect_issues(std::slice::from_ref(chunk))
            .into_iter()
            .find(|i| i.is_error() && i.range.start <= cursor)
        {
            debug!(kind = ?issue.kind, "structural error before cursor");
            context.mode = CompletionMode::Error;
            return context;
        }

        let tree = build_scope_tree_with_depth(chunk, self.resolver.max_depth());
        let scope = tree.scope_at(cursor);
        let scope_chunk = tree.node(scope).map_or(chunk, |node| node.chunk);
        let clause = scope_chunk.clause_at(cursor);
        context.clause = clause;

        let prev = before.last().copied();
        let table_position = prev.is_some_and(|t| {
            t.is_any_keyword(TABLE_KEYWORDS)
                || (t.kind == TokenKind::Comma && clause == Some(ClauseName::From))
        });
        context.mode = match (&word.qualifier, table_position) {
            (_, true) => CompletionMode::From,
            (Some(_), false) if word.bracketed => CompletionMode::QualifiedBracket,
            (Some(_), false) => CompletionMode::Qualified,
            (None, false) => CompletionMode::for_clause(clause),
        };
        context.table_ref = word.qualifier.clone();

        let visible_temps = temps.visible_at(chunk.go_batch_index, cursor.line);
        let mut tables = self.resolver.resolve_scope(&tree, scope, &visible_temps);
        // A temp table this buffer only creates out of reach is not in scope
        tables.retain(|t| {
            !t.is_temp_table
                || visible_temps.iter().any(|v| ident_eq(&v.name, &t.name))
                || !temps.tables().any(|created| ident_eq(&created.name, &t.name))
        });

        context.columns = match context.mode {
            CompletionMode::Qualified | CompletionMode::QualifiedBracket => {
                self.qualified_columns(&tree, scope, &word, &visible_temps)
            }
            CompletionMode::On => {
                let lhs = lhs_qualifier(scope_chunk, cursor, &before)
                    .and_then(|name| tree.resolve_table(&name, scope).ok())
                    .map(|scoped| scoped.table.display_name().to_string());
                trace!(?lhs, "ON clause left-hand table");
                tables
                    .iter()
                    .filter(|t| lhs.as_deref().is_none_or(|l| !ident_eq(t.display_name(), l)))
                    .flat_map(concrete_columns)
                    .collect()
            }
            CompletionMode::Set | CompletionMode::InsertColumns => {
                self.target_columns(scope_chunk, &tables, &word, context.mode)
            }
            mode if mode.offers_columns() => tables.iter().flat_map(concrete_columns).collect(),
            _ => Vec::new(),
        };

        context.functions = self.function_names(context.mode);
        context.keywords =
            self.keywords
                .for_mode(context.mode, clause, Some(scope_chunk.statement_type));
        context.aliases = tables
            .iter()
            .filter_map(|t| Some((t.alias.clone()?, t.name.clone())))
            .collect();
        context.ctes = tree
            .visible_ctes(scope)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        context.temp_tables = visible_temps.into_iter().cloned().collect();
        context.tables_in_scope = tables;

        debug!(
            mode = %context.mode,
            prefix = %context.prefix,
            tables = context.tables_in_scope.len(),
            columns = context.columns.len(),
            "completion context"
        );
        context
    }

    /// Context for a cursor that starts a new statement
    fn between_statements(
        &self,
        parsed: &ParsedBuffer,
        temps: &TempTableRegistry,
        cursor: Position,
        word: CursorWord,
    ) -> CompletionContext {
        let mut context = CompletionContext::empty(CompletionMode::Keyword, &word);
        let previous = parsed.chunks.iter().rev().find(|c| c.range.end <= cursor);
        context.database = previous
            .and_then(|c| c.database.clone())
            .or_else(|| self.resolver.context().database.clone());
        // A GO line after the previous statement starts a new batch
        let batch = previous.map_or(0, |c| {
            let go_between = parsed
                .chunks
                .iter()
                .any(|n| n.go_batch_index > c.go_batch_index && n.range.start <= cursor);
            c.go_batch_index + usize::from(go_between)
        });
        context.temp_tables = temps
            .visible_at(batch, cursor.line)
            .into_iter()
            .cloned()
            .collect();
        context.keywords = self.keywords.for_mode(CompletionMode::Keyword, None, None);
        debug!(prefix = %context.prefix, "completion context between statements");
        context
    }

    fn qualified_columns(
        &self,
        tree: &ScopeTree<'_>,
        scope: ScopeId,
        word: &CursorWord,
        temps: &[&TempTable],
    ) -> Vec<ColumnRef> {
        let Some(qualifier) = &word.qualifier else {
            return Vec::new();
        };
        let scoped = match tree.resolve_table(qualifier, scope) {
            Ok(scoped) => scoped,
            Err(err) => {
                debug!(%qualifier, error = %err, "qualifier not in scope");
                return Vec::new();
            }
        };
        let env = Visibility::for_scope(tree, scoped.scope, temps.to_vec());
        match self.resolver.resolve_table(scoped.table, scoped.owner, &env) {
            Ok(table) => concrete_columns(&table).collect(),
            Err(err) => {
                debug!(%qualifier, error = %err, "qualified column resolution failed");
                Vec::new()
            }
        }
    }

    /// Columns of the DML target; an INSERT column list skips named columns
    fn target_columns(
        &self,
        chunk: &StatementChunk,
        tables: &[TableRef],
        word: &CursorWord,
        mode: CompletionMode,
    ) -> Vec<ColumnRef> {
        let Some(target) = chunk.target_table() else {
            return Vec::new();
        };
        let Some(resolved) = tables
            .iter()
            .find(|t| ident_eq(t.display_name(), target.display_name()))
        else {
            return Vec::new();
        };
        concrete_columns(resolved)
            .filter(|c| {
                mode != CompletionMode::InsertColumns
                    || !chunk
                        .insert_columns
                        .iter()
                        .any(|named| ident_eq(named, &c.name) && !ident_eq(named, &word.prefix))
            })
            .collect()
    }

    fn function_names(&self, mode: CompletionMode) -> Vec<String> {
        let table_valued = match mode {
            CompletionMode::From => true,
            mode if mode.offers_functions() => false,
            _ => return Vec::new(),
        };
        self.functions
            .functions()
            .iter()
            .filter(|f| (f.function_type == FunctionType::Table) == table_valued)
            .map(|f| f.name.clone())
            .collect()
    }
}

impl Default for ContextDetector<'_> {
    fn default() -> Self {
        Self::offline()
    }
}

/// Detect the context at a 1-based `(line, col)` without a metadata source
///
/// # Examples
///
/// ```
/// use sqlsense_context::{CompletionMode, detect};
///
/// let sql = "SELECT * FROM (SELECT 1 AS id) t WHERE t.";
/// let context = detect(sql, 1, sql.len() + 1);
/// assert_eq!(context.mode, CompletionMode::Qualified);
/// assert_eq!(context.table_ref.as_deref(), Some("t"));
/// assert_eq!(context.columns[0].name, "id");
/// ```
pub fn detect(source: &str, line: usize, col: usize) -> CompletionContext {
    ContextDetector::offline().detect(source, line, col)
}

/// The statement a cursor at `cursor` continues
///
/// A `;`, a `GO` or any token between a statement's end and the typed word
/// means the cursor starts a new statement.
fn enclosing_chunk<'p>(
    parsed: &'p ParsedBuffer,
    cursor: Position,
    before: &[&Token],
) -> Option<&'p StatementChunk> {
    let chunk = parsed.chunks.iter().rev().find(|c| c.range.start < cursor)?;
    let ended = before.last().is_some_and(|t| t.kind == TokenKind::Semicolon)
        || before.iter().any(|t| t.start() >= chunk.range.end);
    (!ended).then_some(chunk)
}

/// Qualifier on the left of the comparison being typed in an ON clause
///
/// Looks at the current `AND`/`OR` operand only: in `ON a.x = b.y AND c.z = |`
/// that is `c`.
fn lhs_qualifier(chunk: &StatementChunk, cursor: Position, before: &[&Token]) -> Option<String> {
    let on_start = chunk
        .clause_positions
        .iter()
        .filter(|c| c.clause == ClauseName::On && c.range.start <= cursor)
        .map(|c| c.range.start)
        .last()?;
    let clause_tokens: Vec<&Token> = before
        .iter()
        .copied()
        .filter(|t| t.start() >= on_start)
        .collect();
    let operand_start = clause_tokens
        .iter()
        .rposition(|t| t.is_any_keyword(&["ON", "AND", "OR"]))
        .map_or(0, |i| i + 1);
    let operand = &clause_tokens[operand_start..];
    let op = operand.iter().position(|t| {
        t.kind == TokenKind::Operator
            && matches!(t.text.as_str(), "=" | "<>" | "!=" | "<" | ">" | "<=" | ">=")
    })?;
    operand[..op]
        .windows(2)
        .filter(|w| w[0].is_name() && w[1].kind == TokenKind::Dot)
        .map(|w| w[0].text.clone())
        .last()
}

fn concrete_columns(table: &TableRef) -> impl Iterator<Item = ColumnRef> + '_ {
    table.columns.iter().filter(|c| !c.is_star).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Detect at the position of the `|` marker
    fn at_marker(input: &str) -> CompletionContext {
        let offset = input.find('|').unwrap();
        let source = input.replacen('|', "", 1);
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let col = before[line_start..].chars().count() + 1;
        detect(&source, line, col)
    }

    #[test]
    fn test_qualified_after_alias_in_where() {
        let ctx = at_marker("SELECT * FROM (SELECT 1 AS a, 2 AS b) x WHERE x.|");
        assert_eq!(ctx.mode, CompletionMode::Qualified);
        assert_eq!(ctx.table_ref.as_deref(), Some("x"));
        assert_eq!(ctx.column_names(), vec!["a", "b"]);
        assert_eq!(ctx.clause, Some(ClauseName::Where));
        assert!(ctx.keywords.is_empty());
    }

    #[test]
    fn test_prefix_and_trigger() {
        let ctx = at_marker("SELECT * FROM (SELECT 1 AS amount) x WHERE x.am|");
        assert_eq!(ctx.mode, CompletionMode::Qualified);
        assert_eq!(ctx.prefix, "am");
        assert_eq!(ctx.trigger, Some('.'));

        let ctx = at_marker("SELECT Fir| FROM Employees");
        assert_eq!(ctx.mode, CompletionMode::Select);
        assert_eq!(ctx.prefix, "Fir");
        assert_eq!(ctx.trigger, Some(' '));
    }

    #[test]
    fn test_bracketed_qualifier() {
        let ctx = at_marker("SELECT [x].| FROM (SELECT 1 AS a) x");
        assert_eq!(ctx.mode, CompletionMode::QualifiedBracket);
        assert_eq!(ctx.table_ref.as_deref(), Some("x"));
        assert_eq!(ctx.column_names(), vec!["a"]);

        let ctx = at_marker("SELECT x.[a| FROM (SELECT 1 AS a) x");
        assert_eq!(ctx.mode, CompletionMode::QualifiedBracket);
        assert_eq!(ctx.prefix, "a");
        assert_eq!(ctx.trigger, Some('['));
    }

    #[test]
    fn test_none_inside_string_and_comment() {
        let ctx = at_marker("SELECT * FROM t WHERE name = 'abc|'");
        assert_eq!(ctx.mode, CompletionMode::None);
        assert!(ctx.mode.is_terminal());

        let ctx = at_marker("SELECT * -- FROM t WHERE t.|\nFROM t");
        assert_eq!(ctx.mode, CompletionMode::None);

        let ctx = at_marker("SELECT /* t.| */ * FROM t");
        assert_eq!(ctx.mode, CompletionMode::None);
        assert!(ctx.chunk.is_none());
    }

    #[test]
    fn test_clause_modes() {
        let cases = [
            ("SELECT | FROM t", CompletionMode::Select),
            ("SELECT * FROM t WHERE |", CompletionMode::Where),
            ("SELECT a FROM t GROUP BY |", CompletionMode::GroupBy),
            ("SELECT a FROM t GROUP BY a HAVING |", CompletionMode::Having),
            ("SELECT a FROM t ORDER BY |", CompletionMode::OrderBy),
            ("SELECT * FROM a JOIN b ON |", CompletionMode::On),
            ("UPDATE t SET |", CompletionMode::Set),
            ("INSERT INTO t (|", CompletionMode::InsertColumns),
            ("INSERT INTO t (a) VALUES (|", CompletionMode::Values),
            ("DELETE FROM t OUTPUT |", CompletionMode::Output),
        ];
        for (input, mode) in cases {
            assert_eq!(at_marker(input).mode, mode, "{input}");
        }
    }

    #[test]
    fn test_from_mode_after_table_keywords() {
        for input in [
            "SELECT * FROM |",
            "SELECT * FROM a JOIN |",
            "SELECT * FROM a, |",
            "SELECT * FROM a CROSS APPLY |",
            "UPDATE |",
            "INSERT INTO |",
            "MERGE INTO t USING |",
        ] {
            assert_eq!(at_marker(input).mode, CompletionMode::From, "{input}");
        }

        let ctx = at_marker("SELECT * FROM dbo.|");
        assert_eq!(ctx.mode, CompletionMode::From);
        assert_eq!(ctx.table_ref.as_deref(), Some("dbo"));
        assert!(ctx.functions.iter().all(|f| !f.eq_ignore_ascii_case("SUM")));
    }

    #[test]
    fn test_keyword_mode() {
        let ctx = at_marker("|");
        assert_eq!(ctx.mode, CompletionMode::Keyword);
        assert!(ctx.chunk.is_none());
        assert!(ctx.keywords.iter().any(|k| k.label == "SELECT"));

        let ctx = at_marker("SELECT 1;\n|");
        assert_eq!(ctx.mode, CompletionMode::Keyword);
        assert!(ctx.chunk.is_none());

        let ctx = at_marker("SELECT * FROM t |");
        assert_eq!(ctx.mode, CompletionMode::Keyword);
        assert_eq!(ctx.clause, Some(ClauseName::From));
        assert!(ctx.keywords.iter().any(|k| k.label == "WHERE"));
    }

    #[test]
    fn test_error_mode_before_cursor_only() {
        let ctx = at_marker("SELECT * FROM a FROM b WHERE |");
        assert_eq!(ctx.mode, CompletionMode::Error);
        assert!(ctx.chunk.is_some());
        assert!(ctx.columns.is_empty());

        let ctx = at_marker("WITH c AS SELECT |");
        assert_eq!(ctx.mode, CompletionMode::Error);

        // An unclosed derived table is still being typed
        let ctx = at_marker("SELECT * FROM (SELECT | FROM t");
        assert_eq!(ctx.mode, CompletionMode::Select);
    }

    #[test]
    fn test_derived_table_columns_in_select() {
        let ctx = at_marker("SELECT | FROM (SELECT 1 AS a, 2 AS b) x JOIN (SELECT 3 AS c) y ON 1 = 1");
        assert_eq!(ctx.mode, CompletionMode::Select);
        assert_eq!(ctx.table_names(), vec!["x", "y"]);
        assert_eq!(ctx.column_names(), vec!["a", "b", "c"]);
        assert_eq!(ctx.columns[2].source_table.as_deref(), Some("y"));
        assert!(ctx.functions.iter().any(|f| f.eq_ignore_ascii_case("COUNT")));
    }

    #[test]
    fn test_on_excludes_left_hand_table() {
        let ctx = at_marker(
            "SELECT * FROM (SELECT 1 AS a) x JOIN (SELECT 2 AS b) y ON x.a = |",
        );
        assert_eq!(ctx.mode, CompletionMode::On);
        assert_eq!(ctx.column_names(), vec!["b"]);

        let ctx = at_marker(
            "SELECT * FROM (SELECT 1 AS a) x JOIN (SELECT 2 AS b) y ON x.a = y.b AND y.b > |",
        );
        assert_eq!(ctx.column_names(), vec!["a"]);

        let ctx = at_marker("SELECT * FROM (SELECT 1 AS a) x JOIN (SELECT 2 AS b) y ON |");
        assert_eq!(ctx.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_cte_names_and_aliases() {
        let ctx = at_marker("WITH c AS (SELECT 1 AS n) SELECT | FROM c AS k");
        assert_eq!(ctx.ctes, vec!["c"]);
        assert_eq!(ctx.aliases.get("k").map(String::as_str), Some("c"));
        assert_eq!(ctx.column_names(), vec!["n"]);
    }

    #[test]
    fn test_scope_inside_subquery() {
        let ctx = at_marker(
            "SELECT * FROM (SELECT 1 AS a) x WHERE EXISTS (SELECT * FROM (SELECT 2 AS b) y WHERE |)",
        );
        assert_eq!(ctx.mode, CompletionMode::Where);
        // Correlated: the inner table first, then the outer one
        assert_eq!(ctx.table_names(), vec!["y", "x"]);
    }

    #[test]
    fn test_temp_tables_respect_go() {
        let sql = "SELECT 1 AS id INTO #t\nSELECT 2 AS id INTO ##g\nGO\nSELECT * FROM #t, ##g WHERE |";
        let ctx = at_marker(sql);
        assert_eq!(ctx.mode, CompletionMode::Where);
        assert_eq!(ctx.table_names(), vec!["##g"]);
        let names: Vec<&str> = ctx.temp_tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["##g"]);

        let ctx = at_marker("SELECT 1 AS id INTO #t\nSELECT * FROM #t WHERE |");
        assert_eq!(ctx.table_names(), vec!["#t"]);
        assert_eq!(ctx.column_names(), vec!["id"]);
    }

    #[test]
    fn test_use_sets_database() {
        let ctx = at_marker("USE Sales;\nSELECT * FROM t WHERE |");
        assert_eq!(ctx.database.as_deref(), Some("Sales"));
    }

    #[test]
    fn test_cursor_past_line_end_is_clamped() {
        let source = "SELECT * FROM (SELECT 1 AS a) x WHERE x.";
        let ctx = detect(source, 1, 200);
        assert_eq!(ctx.mode, CompletionMode::Qualified);
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        assert_eq!(CompletionMode::QualifiedBracket.as_str(), "qualified_bracket");
        assert_eq!(CompletionMode::GroupBy.to_string(), "group_by");
    }
}
