// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # T-SQL Keywords for Completion
//!
//! This module defines T-SQL keywords organized by the context they are
//! offered in.

use crate::completion::CompletionMode;
use serde::{Deserialize, Serialize};
use sqlsense_ir::{ClauseName, StatementType};
use std::collections::HashSet;

/// SQL keyword with metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlKeyword {
    /// The keyword text
    pub label: String,
    /// Optional description/documentation
    pub description: Option<String>,
    /// Sort order (lower = higher priority)
    pub sort_priority: i32,
}

impl SqlKeyword {
    /// Create a new SQL keyword
    pub fn new(label: &str, description: Option<&str>, sort_priority: i32) -> Self {
        Self {
            label: label.to_uppercase(),
            description: description.map(|d| d.to_string()),
            sort_priority,
        }
    }

    /// Create a simple keyword without description
    pub fn simple(label: &str, sort_priority: i32) -> Self {
        Self::new(label, None, sort_priority)
    }
}

/// Keyword set for a specific context
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    /// Keywords in this set
    pub keywords: Vec<SqlKeyword>,
}

impl KeywordSet {
    /// Create a new keyword set
    pub fn new(keywords: Vec<SqlKeyword>) -> Self {
        Self { keywords }
    }

    /// Get all keyword labels as a HashSet for filtering
    pub fn labels(&self) -> HashSet<String> {
        self.keywords.iter().map(|k| k.label.clone()).collect()
    }

    /// Filter keywords excluding the given set
    pub fn exclude(&self, exclude: &HashSet<String>) -> Vec<SqlKeyword> {
        self.keywords
            .iter()
            .filter(|k| !exclude.contains(&k.label))
            .cloned()
            .collect()
    }

    /// Append `other`, renumbering its priorities after this set's
    fn then(mut self, other: KeywordSet) -> Self {
        let base = self.keywords.iter().map(|k| k.sort_priority).max().unwrap_or(0);
        self.keywords.extend(other.keywords.into_iter().map(|mut k| {
            k.sort_priority += base;
            k
        }));
        self
    }
}

/// Keyword provider for T-SQL completion contexts
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    /// Create a new keyword provider
    pub fn new() -> Self {
        Self
    }

    /// Get statement keywords (for start of statement)
    pub fn statement_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("SELECT", Some("Retrieve data from tables"), 1),
            SqlKeyword::new("INSERT", Some("Insert new rows into a table"), 2),
            SqlKeyword::new("UPDATE", Some("Modify existing rows in a table"), 3),
            SqlKeyword::new("DELETE", Some("Delete rows from a table"), 4),
            SqlKeyword::new("MERGE", Some("Insert, update or delete against a source"), 5),
            SqlKeyword::new("WITH", Some("Common Table Expression (CTE)"), 6),
            SqlKeyword::new("CREATE", Some("Create database objects"), 7),
            SqlKeyword::new("ALTER", Some("Modify database objects"), 8),
            SqlKeyword::new("DROP", Some("Remove database objects"), 9),
            SqlKeyword::new("TRUNCATE TABLE", Some("Remove all rows from a table"), 10),
            SqlKeyword::new("DECLARE", Some("Declare a variable"), 11),
            SqlKeyword::new("SET", Some("Assign a variable or session option"), 12),
            SqlKeyword::new("EXEC", Some("Execute a stored procedure"), 13),
            SqlKeyword::new("USE", Some("Change the database context"), 14),
            SqlKeyword::new("BEGIN TRAN", Some("Start a transaction"), 15),
            SqlKeyword::new("GO", Some("End the batch"), 16),
        ];

        KeywordSet::new(keywords)
    }

    /// Get SELECT clause keywords (for within SELECT statements)
    pub fn select_clause_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("TOP", Some("Limit number of rows"), 1),
            SqlKeyword::new("DISTINCT", Some("Remove duplicate rows"), 2),
            SqlKeyword::new("CASE", Some("Conditional expression"), 3),
            SqlKeyword::new("AS", Some("Alias for columns or tables"), 4),
            SqlKeyword::new("INTO", Some("Create a table from the result"), 5),
            SqlKeyword::new("FROM", Some("Specify tables to query"), 6),
            SqlKeyword::new("WHERE", Some("Filter rows"), 7),
            SqlKeyword::new("GROUP BY", Some("Group rows by values"), 8),
            SqlKeyword::new("HAVING", Some("Filter groups"), 9),
            SqlKeyword::new("ORDER BY", Some("Sort result rows"), 10),
            SqlKeyword::new("UNION", Some("Combine result sets"), 11),
            SqlKeyword::new("UNION ALL", Some("Combine result sets with duplicates"), 12),
            SqlKeyword::new("INTERSECT", Some("Intersection of result sets"), 13),
            SqlKeyword::new("EXCEPT", Some("Difference of result sets"), 14),
        ];

        KeywordSet::new(keywords)
    }

    /// Get FROM clause keywords: joins and APPLY
    pub fn join_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("JOIN", Some("Join with another table"), 1),
            SqlKeyword::new("INNER JOIN", Some("Inner join with another table"), 2),
            SqlKeyword::new("LEFT JOIN", Some("Left outer join"), 3),
            SqlKeyword::new("RIGHT JOIN", Some("Right outer join"), 4),
            SqlKeyword::new("FULL JOIN", Some("Full outer join"), 5),
            SqlKeyword::new("CROSS JOIN", Some("Cross join"), 6),
            SqlKeyword::new("CROSS APPLY", Some("Apply a table expression per row"), 7),
            SqlKeyword::new("OUTER APPLY", Some("Apply, keeping rows without matches"), 8),
            SqlKeyword::new("ON", Some("Join condition"), 9),
            SqlKeyword::new("WITH (NOLOCK)", Some("Table hint"), 10),
        ];

        KeywordSet::new(keywords)
    }

    /// Get expression/operator keywords
    pub fn expression_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("AND", Some("Logical AND"), 1),
            SqlKeyword::new("OR", Some("Logical OR"), 2),
            SqlKeyword::new("NOT", Some("Logical NOT"), 3),
            SqlKeyword::new("IN", Some("Value in list"), 4),
            SqlKeyword::new("EXISTS", Some("Subquery exists"), 5),
            SqlKeyword::new("BETWEEN", Some("Value between range"), 6),
            SqlKeyword::new("LIKE", Some("Pattern matching"), 7),
            SqlKeyword::new("IS NULL", Some("Check if value is NULL"), 8),
            SqlKeyword::new("IS NOT NULL", Some("Check if value is not NULL"), 9),
            SqlKeyword::new("CASE", Some("Conditional expression"), 10),
            SqlKeyword::new("WHEN", Some("CASE WHEN condition"), 11),
            SqlKeyword::new("THEN", Some("CASE THEN result"), 12),
            SqlKeyword::new("ELSE", Some("CASE ELSE default"), 13),
            SqlKeyword::new("END", Some("END CASE expression"), 14),
            SqlKeyword::new("NULL", Some("NULL value"), 15),
            SqlKeyword::new("CAST", Some("Cast to type"), 16),
            SqlKeyword::new("CONVERT", Some("Convert to type with style"), 17),
            SqlKeyword::new("COLLATE", Some("Apply a collation"), 18),
        ];

        KeywordSet::new(keywords)
    }

    /// Get CREATE statement keywords
    pub fn create_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("TABLE", Some("Create table"), 1),
            SqlKeyword::new("VIEW", Some("Create view"), 2),
            SqlKeyword::new("PROCEDURE", Some("Create procedure"), 3),
            SqlKeyword::new("FUNCTION", Some("Create function"), 4),
            SqlKeyword::new("INDEX", Some("Create index"), 5),
            SqlKeyword::new("NONCLUSTERED INDEX", Some("Create nonclustered index"), 6),
            SqlKeyword::new("TRIGGER", Some("Create trigger"), 7),
            SqlKeyword::new("SCHEMA", Some("Create schema"), 8),
            SqlKeyword::new("OR ALTER", Some("Replace if exists"), 9),
        ];

        KeywordSet::new(keywords)
    }

    /// Get DROP and ALTER target keywords
    pub fn object_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("TABLE", Some("Table"), 1),
            SqlKeyword::new("VIEW", Some("View"), 2),
            SqlKeyword::new("PROCEDURE", Some("Stored procedure"), 3),
            SqlKeyword::new("FUNCTION", Some("Function"), 4),
            SqlKeyword::new("INDEX", Some("Index"), 5),
            SqlKeyword::new("TRIGGER", Some("Trigger"), 6),
            SqlKeyword::new("IF EXISTS", Some("Only if the object exists"), 7),
        ];

        KeywordSet::new(keywords)
    }

    /// Get INSERT statement keywords
    pub fn insert_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("INTO", Some("Insert into table"), 1),
            SqlKeyword::new("VALUES", Some("Insert values"), 2),
            SqlKeyword::new("SELECT", Some("Insert the result of a query"), 3),
            SqlKeyword::new("OUTPUT", Some("Return inserted rows"), 4),
            SqlKeyword::new("DEFAULT VALUES", Some("Insert a row of defaults"), 5),
        ];

        KeywordSet::new(keywords)
    }

    /// Get UPDATE statement keywords
    pub fn update_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("SET", Some("Set column values"), 1),
            SqlKeyword::new("OUTPUT", Some("Return updated rows"), 2),
            SqlKeyword::new("FROM", Some("Join other tables into the update"), 3),
            SqlKeyword::new("WHERE", Some("Filter rows to update"), 4),
        ];

        KeywordSet::new(keywords)
    }

    /// Get DELETE statement keywords
    pub fn delete_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("FROM", Some("Delete from table"), 1),
            SqlKeyword::new("OUTPUT", Some("Return deleted rows"), 2),
            SqlKeyword::new("WHERE", Some("Filter rows to delete"), 3),
        ];

        KeywordSet::new(keywords)
    }

    /// Get MERGE statement keywords
    pub fn merge_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("USING", Some("Source of the merge"), 1),
            SqlKeyword::new("ON", Some("Match condition"), 2),
            SqlKeyword::new("WHEN MATCHED THEN", Some("Action for matching rows"), 3),
            SqlKeyword::new("WHEN NOT MATCHED THEN", Some("Action for new source rows"), 4),
            SqlKeyword::new(
                "WHEN NOT MATCHED BY SOURCE THEN",
                Some("Action for target rows without a source row"),
                5,
            ),
            SqlKeyword::new("OUTPUT", Some("Return affected rows"), 6),
        ];

        KeywordSet::new(keywords)
    }

    /// Get keywords available after a specific clause
    ///
    /// Clauses whose follow-up depends on the statement, such as the DML
    /// target, yield nothing here.
    pub fn keywords_after_clause(&self, clause: ClauseName) -> Vec<SqlKeyword> {
        match clause {
            ClauseName::Select => self.select_clause_keywords().keywords,
            ClauseName::From | ClauseName::On => self
                .join_keywords()
                .then(self.select_clause_keywords())
                .exclude(&HashSet::from([
                    "FROM".to_string(),
                    "TOP".to_string(),
                    "DISTINCT".to_string(),
                    "INTO".to_string(),
                ])),
            ClauseName::Where => vec![
                SqlKeyword::new("GROUP BY", Some("Group rows by values"), 1),
                SqlKeyword::new("ORDER BY", Some("Sort result rows"), 2),
                SqlKeyword::new("OPTION", Some("Query hints"), 3),
            ],
            ClauseName::GroupBy => vec![
                SqlKeyword::new("HAVING", Some("Filter groups"), 1),
                SqlKeyword::new("ORDER BY", Some("Sort result rows"), 2),
            ],
            ClauseName::Having => vec![SqlKeyword::new("ORDER BY", Some("Sort result rows"), 1)],
            ClauseName::OrderBy => self
                .sort_direction_keywords()
                .then(KeywordSet::new(vec![
                    SqlKeyword::new("OFFSET", Some("Skip rows"), 1),
                    SqlKeyword::new("FETCH NEXT", Some("Limit rows after OFFSET"), 2),
                ]))
                .keywords,
            ClauseName::Into => vec![
                SqlKeyword::new("FROM", Some("Specify tables to query"), 1),
                SqlKeyword::new("WHERE", Some("Filter rows"), 2),
            ],
            ClauseName::Using | ClauseName::When => self.merge_keywords().keywords,
            ClauseName::SetOperation => vec![
                SqlKeyword::new("ALL", Some("Include duplicates"), 1),
                SqlKeyword::new("SELECT", Some("Select statement"), 2),
            ],
            ClauseName::With => vec![SqlKeyword::new("AS", Some("CTE body"), 1)],
            _ => vec![],
        }
    }

    /// Get sort direction keywords (ASC, DESC)
    pub fn sort_direction_keywords(&self) -> KeywordSet {
        let keywords = vec![
            SqlKeyword::new("ASC", Some("Ascending order"), 1),
            SqlKeyword::new("DESC", Some("Descending order"), 2),
        ];

        KeywordSet::new(keywords)
    }

    /// Keywords to offer for a completion mode
    ///
    /// `clause` is the clause the cursor sits in and `statement_type` the
    /// enclosing statement, when there is one.
    pub fn for_mode(
        &self,
        mode: CompletionMode,
        clause: Option<ClauseName>,
        statement_type: Option<StatementType>,
    ) -> Vec<SqlKeyword> {
        match mode {
            CompletionMode::None
            | CompletionMode::Error
            | CompletionMode::Qualified
            | CompletionMode::QualifiedBracket
            | CompletionMode::InsertColumns => Vec::new(),
            CompletionMode::Select => self
                .select_clause_keywords()
                .then(self.expression_keywords())
                .keywords,
            CompletionMode::Where | CompletionMode::On | CompletionMode::Having => {
                let after = clause.map(|c| self.keywords_after_clause(c)).unwrap_or_default();
                self.expression_keywords()
                    .then(KeywordSet::new(after))
                    .keywords
            }
            CompletionMode::GroupBy | CompletionMode::OrderBy => clause
                .map(|c| self.keywords_after_clause(c))
                .unwrap_or_default(),
            CompletionMode::Set | CompletionMode::Values | CompletionMode::Output => {
                self.expression_keywords().keywords
            }
            CompletionMode::From => Vec::new(),
            CompletionMode::Keyword => self.statement_context_keywords(clause, statement_type),
        }
    }

    fn statement_context_keywords(
        &self,
        clause: Option<ClauseName>,
        statement_type: Option<StatementType>,
    ) -> Vec<SqlKeyword> {
        if let Some(clause) = clause {
            let after = self.keywords_after_clause(clause);
            if !after.is_empty() {
                return after;
            }
        }
        match statement_type {
            None => self.statement_keywords().keywords,
            Some(StatementType::Insert) => self.insert_keywords().keywords,
            Some(StatementType::Update) => self.update_keywords().keywords,
            Some(StatementType::Delete) => self.delete_keywords().keywords,
            Some(StatementType::Merge) => self.merge_keywords().keywords,
            Some(
                StatementType::CreateTable
                | StatementType::CreateView
                | StatementType::CreateProcedure
                | StatementType::CreateFunction,
            ) => self.create_keywords().keywords,
            Some(StatementType::Alter | StatementType::Drop) => self.object_keywords().keywords,
            Some(_) => self.statement_keywords().keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_keyword_creation() {
        let kw = SqlKeyword::new("select", Some("Test description"), 1);
        assert_eq!(kw.label, "SELECT");
        assert_eq!(kw.description, Some("Test description".to_string()));
        assert_eq!(kw.sort_priority, 1);
    }

    #[test]
    fn test_keyword_set_labels() {
        let keywords = vec![
            SqlKeyword::simple("SELECT", 1),
            SqlKeyword::simple("FROM", 2),
            SqlKeyword::simple("WHERE", 3),
        ];
        let set = KeywordSet::new(keywords);
        let labels = set.labels();
        assert!(labels.contains("SELECT"));
        assert!(labels.contains("FROM"));
        assert!(labels.contains("WHERE"));
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_keyword_set_exclude() {
        let keywords = vec![
            SqlKeyword::simple("SELECT", 1),
            SqlKeyword::simple("FROM", 2),
            SqlKeyword::simple("WHERE", 3),
        ];
        let set = KeywordSet::new(keywords);
        let exclude = HashSet::from(["FROM".to_string()]);
        let filtered = set.exclude(&exclude);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().any(|k| k.label == "SELECT"));
        assert!(filtered.iter().any(|k| k.label == "WHERE"));
        assert!(!filtered.iter().any(|k| k.label == "FROM"));
    }

    #[test]
    fn test_tsql_select_keywords() {
        let provider = KeywordProvider::new();
        let select_keywords = provider.select_clause_keywords();
        assert!(select_keywords.keywords.iter().any(|k| k.label == "TOP"));
        assert!(!select_keywords.keywords.iter().any(|k| k.label == "LIMIT"));
    }

    #[test]
    fn test_keywords_after_clause() {
        let provider = KeywordProvider::new();
        let after_from = provider.keywords_after_clause(ClauseName::From);
        // After FROM we should not get FROM keyword again
        assert!(!after_from.iter().any(|k| k.label == "FROM"));
        assert!(after_from.iter().any(|k| k.label == "WHERE"));
        assert!(after_from.iter().any(|k| k.label == "CROSS APPLY"));

        let priorities: Vec<i32> = after_from.iter().map(|k| k.sort_priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), priorities.len());
    }

    #[test]
    fn test_for_mode() {
        let provider = KeywordProvider::new();
        let start = provider.for_mode(CompletionMode::Keyword, None, None);
        assert_eq!(start[0].label, "SELECT");

        let update = provider.for_mode(
            CompletionMode::Keyword,
            Some(ClauseName::Target),
            Some(StatementType::Update),
        );
        assert_eq!(update[0].label, "SET");

        assert!(
            provider
                .for_mode(CompletionMode::Qualified, Some(ClauseName::Where), None)
                .is_empty()
        );
        let order = provider.for_mode(CompletionMode::OrderBy, Some(ClauseName::OrderBy), None);
        assert_eq!(order[0].label, "ASC");
    }
}
