// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Temp table tracking
//!
//! Temp tables live per buffer, not per scope. A [`TempTableRegistry`]
//! replays a buffer's statements in order:
//!
//! - `SELECT ... INTO #t` and `CREATE TABLE #t (...)` create a table,
//!   visible from its creation line on
//! - `DROP TABLE #t` ends its lifetime after the drop line
//! - a `GO` boundary ends every `#local` table; `##global` tables survive
//!
//! A [`TempTableStore`] holds one registry per [`BufferId`], so requests for
//! different buffers never see each other's tables.

use crate::resolve::{ColumnResolver, Visibility};
use serde::{Deserialize, Serialize};
use sqlsense_ir::{StatementChunk, StatementType, TempTable, TempTableKind, ident_eq};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

/// Identity of an open editor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u64);

impl From<u64> for BufferId {
    fn from(id: u64) -> Self {
        BufferId(id)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct TempEntry {
    table: TempTable,
    /// `(batch, line)` of the `DROP TABLE`
    dropped_at: Option<(usize, usize)>,
}

impl TempEntry {
    fn is_visible_at(&self, batch: usize, line: usize) -> bool {
        let created = (self.table.created_in_batch, self.table.created_at_line);
        if created > (batch, line) {
            return false;
        }
        let in_lifetime = match self.table.kind {
            TempTableKind::Local => self.table.created_in_batch == batch,
            TempTableKind::Global => true,
        };
        in_lifetime && self.dropped_at.is_none_or(|dropped| (batch, line) <= dropped)
    }
}

/// Temp tables created in one buffer
#[derive(Debug, Clone, Default)]
pub struct TempTableRegistry {
    entries: Vec<TempEntry>,
}

impl TempTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a buffer's chunks
    pub fn from_chunks(chunks: &[StatementChunk], resolver: &ColumnResolver<'_>) -> Self {
        let mut registry = Self::new();
        registry.rebuild(chunks, resolver);
        registry
    }

    /// Replay every creation and drop in `chunks`, discarding prior state
    ///
    /// `SELECT * INTO #t` columns are expanded against the tables and temp
    /// tables visible at that statement.
    pub fn rebuild(&mut self, chunks: &[StatementChunk], resolver: &ColumnResolver<'_>) {
        self.entries.clear();
        for chunk in chunks {
            if let Some(temp) = &chunk.temp_table {
                let table = self.materialize(temp, chunk, resolver);
                trace!(
                    name = %table.name,
                    batch = table.created_in_batch,
                    line = table.created_at_line,
                    "temp table created"
                );
                self.entries.push(TempEntry {
                    table,
                    dropped_at: None,
                });
            }
            if chunk.statement_type == StatementType::Drop {
                for dropped in chunk.tables.iter().filter(|t| t.is_temp_table) {
                    self.drop_table(&dropped.name, chunk.go_batch_index, chunk.start_line);
                }
            }
        }
        debug!(tables = self.entries.len(), "temp table registry rebuilt");
    }

    fn materialize(
        &self,
        temp: &TempTable,
        chunk: &StatementChunk,
        resolver: &ColumnResolver<'_>,
    ) -> TempTable {
        let mut table = temp.clone();
        if chunk.statement_type != StatementType::Select {
            return table;
        }
        let env = Visibility::new(
            chunk.ctes.iter().collect(),
            self.visible_at(chunk.go_batch_index, chunk.start_line),
        );
        match resolver.output_columns(chunk, &env, 0) {
            Ok(columns) => table.columns = columns,
            Err(err) => {
                warn!(name = %temp.name, error = %err, "could not expand temp table columns");
                table.columns.retain(|c| !c.is_star);
            }
        }
        table
    }

    fn drop_table(&mut self, name: &str, batch: usize, line: usize) {
        let live = self
            .entries
            .iter_mut()
            .rev()
            .find(|e| ident_eq(&e.table.name, name) && e.dropped_at.is_none());
        if let Some(entry) = live {
            entry.dropped_at = Some((batch, line));
        }
    }

    /// Temp tables visible at a line of a `GO` batch, latest definition per name
    pub fn visible_at(&self, batch: usize, line: usize) -> Vec<&TempTable> {
        let mut visible: Vec<&TempTable> = Vec::new();
        for entry in self.entries.iter().rev() {
            if entry.is_visible_at(batch, line)
                && !visible.iter().any(|t| ident_eq(&t.name, &entry.table.name))
            {
                visible.push(&entry.table);
            }
        }
        visible.reverse();
        visible
    }

    /// Find a temp table by name as seen from a line of a batch
    pub fn find(&self, name: &str, batch: usize, line: usize) -> Option<&TempTable> {
        self.visible_at(batch, line)
            .into_iter()
            .find(|t| ident_eq(&t.name, name))
    }

    /// Every temp table ever created in the buffer, in creation order
    pub fn tables(&self) -> impl Iterator<Item = &TempTable> {
        self.entries.iter().map(|e| &e.table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Temp table registries keyed by buffer
#[derive(Debug, Default)]
pub struct TempTableStore {
    registries: HashMap<BufferId, TempTableRegistry>,
}

impl TempTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry of `buffer` from its current chunks
    pub fn refresh(
        &mut self,
        buffer: BufferId,
        chunks: &[StatementChunk],
        resolver: &ColumnResolver<'_>,
    ) -> &TempTableRegistry {
        let registry = self.registries.entry(buffer).or_default();
        registry.rebuild(chunks, resolver);
        registry
    }

    pub fn get(&self, buffer: BufferId) -> Option<&TempTableRegistry> {
        self.registries.get(&buffer)
    }

    /// Forget a closed buffer
    pub fn remove(&mut self, buffer: BufferId) -> Option<TempTableRegistry> {
        self.registries.remove(&buffer)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
