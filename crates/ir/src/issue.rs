// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Parse issues
//!
//! Recoverable anomalies found while parsing a statement. Issues are recorded
//! on the chunk that produced them; parsing always continues.

use crate::span::Range;
use serde::{Deserialize, Serialize};

/// Severity of a parse issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structural error: no completions should be offered in the statement
    Error,
    /// Best-effort lint
    Warning,
}

/// Kind of parse issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A second `FROM` at the same nesting level of one SELECT
    DuplicateFrom,
    /// `AS` with no expression or table before it
    AsWithoutExpression,
    /// `WITH name AS` not followed by a parenthesized query
    CteWithoutBody,
    /// `(SELECT ...)` in a FROM clause without an alias
    DerivedTableWithoutAlias,
    /// More `(` than `)` or the reverse
    UnbalancedParentheses,
    /// A self-referencing CTE combined with `UNION` instead of `UNION ALL`
    RecursiveCteWithoutUnionAll,
    /// A CTE that references a CTE declared later in the same `WITH`
    CteForwardReference,
    /// A temp table used outside the lifetime of its creation in this buffer
    TempTableNotInScope,
}

impl IssueKind {
    /// Default severity for this kind of issue
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::DuplicateFrom
            | IssueKind::AsWithoutExpression
            | IssueKind::CteWithoutBody
            | IssueKind::DerivedTableWithoutAlias => Severity::Error,
            IssueKind::UnbalancedParentheses
            | IssueKind::RecursiveCteWithoutUnionAll
            | IssueKind::CteForwardReference
            | IssueKind::TempTableNotInScope => Severity::Warning,
        }
    }
}

/// A recoverable issue found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub range: Range,
}

impl ParseIssue {
    /// Create a new issue with the kind's default severity
    pub fn new(kind: IssueKind, message: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            range,
        }
    }

    /// Check whether this issue is a structural error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
