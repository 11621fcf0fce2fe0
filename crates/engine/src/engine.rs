// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine facade
//!
//! [`Engine`] owns the configuration, the metadata resolver, the function
//! registry and one temp-table registry per open buffer. Every entry point
//! takes the full buffer text; nothing is cached between calls except the
//! temp tables, which are rebuilt from the current text on each request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

use sqlsense_catalog::{MetadataResolver, StaticCatalog};
use sqlsense_context::{CompletionContext, ContextDetector};
use sqlsense_function_registry::FunctionRegistry;
use sqlsense_ir::{Batch, ParseIssue};
use sqlsense_lexer::DebugInfo;
use sqlsense_parser::ParsedBuffer;
use sqlsense_semantic::{
    BranchKind, BufferId, ColumnResolver, Operand, TempTableRegistry, TempTableStore, TypeChecker,
    Verdict, buffer_diagnostics,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Entry point for batch splitting, context detection and type checks
pub struct Engine {
    config: EngineConfig,
    resolver: Option<Arc<dyn MetadataResolver>>,
    functions: FunctionRegistry,
    checker: TypeChecker,
    temp_tables: Mutex<TempTableStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine from a validated configuration
    ///
    /// When `catalog_path` is set the JSON catalog becomes the metadata
    /// resolver.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let resolver = match &config.catalog_path {
            Some(path) => {
                let catalog = StaticCatalog::from_file(path)?;
                info!(path = %path.display(), "loaded static catalog");
                Some(Arc::new(catalog) as Arc<dyn MetadataResolver>)
            }
            None => None,
        };
        Ok(Self::assemble(config, resolver))
    }

    /// Create an engine backed by an existing metadata resolver
    ///
    /// `catalog_path` is ignored.
    pub fn with_resolver(
        config: EngineConfig,
        resolver: Arc<dyn MetadataResolver>,
    ) -> EngineResult<Self> {
        let config = EngineConfig {
            catalog_path: None,
            ..config
        };
        config.validate()?;
        Ok(Self::assemble(config, Some(resolver)))
    }

    fn assemble(config: EngineConfig, resolver: Option<Arc<dyn MetadataResolver>>) -> Self {
        let functions = FunctionRegistry::new();
        Self {
            config,
            resolver,
            checker: TypeChecker::with_registry(functions.clone()),
            functions,
            temp_tables: Mutex::new(TempTableStore::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Column resolver for one request
    ///
    /// The resolver is offline when `resolve_columns` is off or no metadata
    /// source is configured.
    pub fn column_resolver(&self) -> ColumnResolver<'_> {
        let metadata = self
            .resolver
            .as_deref()
            .filter(|_| self.config.resolve_columns);
        ColumnResolver::new(metadata, self.config.connection_context())
            .with_max_depth(self.config.max_scope_depth)
    }

    /// Split a buffer into `GO` batches with their active database
    pub fn parse_query(&self, source: &str) -> (Vec<Batch>, DebugInfo) {
        sqlsense_lexer::parse_query(source, self.config.default_database.as_deref())
    }

    /// Parse a buffer into statement chunks
    pub fn parse(&self, source: &str) -> ParsedBuffer {
        sqlsense_parser::parse_buffer(source, self.config.default_database.as_deref())
    }

    /// Detect the completion context at a 1-based `(line, col)`
    ///
    /// The temp tables of `buffer` are refreshed from `source` first, so a
    /// temp table dropped from the text disappears from later requests.
    #[instrument(skip(self, source, buffer), fields(buffer = buffer.0))]
    pub fn detect(
        &self,
        buffer: BufferId,
        source: &str,
        line: usize,
        col: usize,
    ) -> CompletionContext {
        let parsed = self.parse(source);
        let detector =
            ContextDetector::new(self.column_resolver()).with_functions(self.functions.clone());

        let mut store = self.store();
        let temps = store.refresh(buffer, &parsed.chunks, detector.resolver());
        let context = detector.detect_in(source, &parsed, temps, line, col);
        debug!(mode = %context.mode, tables = context.tables_in_scope.len(), "context detected");
        context
    }

    /// Forget the temp tables of a closed buffer
    pub fn close_buffer(&self, buffer: BufferId) -> bool {
        self.store().remove(buffer).is_some()
    }

    /// Number of buffers with tracked temp tables
    pub fn open_buffers(&self) -> usize {
        self.store().len()
    }

    /// Compare two declared types
    pub fn check(&self, type_a: &str, type_b: &str) -> Verdict {
        self.checker.check(type_a, type_b)
    }

    /// Compare two operands, honoring casts and `NULL`
    pub fn check_operands(&self, a: &Operand, b: &Operand) -> Verdict {
        self.checker.check_operands(a, b)
    }

    /// Check the argument of an aggregate call
    pub fn check_aggregate(&self, function: &str, argument: &Operand) -> Verdict {
        self.checker.check_aggregate(function, argument)
    }

    /// Check that the branches of a `CASE`-like expression agree
    pub fn check_branches(&self, kind: BranchKind, branches: &[Operand]) -> Verdict {
        self.checker.check_branches(kind, branches)
    }

    /// Structural issues and temp-table lints of a buffer, in source order
    pub fn diagnostics(&self, source: &str) -> Vec<ParseIssue> {
        let parsed = self.parse(source);
        let resolver = self.column_resolver();
        let temps = TempTableRegistry::from_chunks(&parsed.chunks, &resolver);
        buffer_diagnostics(&parsed.chunks, &temps)
    }

    fn store(&self) -> MutexGuard<'_, TempTableStore> {
        // The store is rebuilt on every request, so a poisoned one is still usable
        self.temp_tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
