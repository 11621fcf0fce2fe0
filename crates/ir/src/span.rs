// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Source positions
//!
//! 1-based line/column positions and half-open ranges over a buffer.

use serde::{Deserialize, Serialize};

/// A 1-based position in source text
///
/// `col` counts characters, so `col == 1` is the first character of a line
/// and a cursor placed after the third character is at `col == 4`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Half-open range `[start, end)` between two positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a new range
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Check whether `pos` lies inside `[start, end)`
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Like [`Range::contains`] but also accepts `pos == end`
    ///
    /// A cursor sitting right after the last character of a range still
    /// belongs to it while the user is typing.
    pub fn contains_inclusive(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Check whether two ranges overlap
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}
