// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use sqlsense::{BranchKind, BufferId, Engine, EngineConfig, Operand, init_tracing};

/// Context-aware T-SQL intelligence from the command line
#[derive(Debug, Parser)]
#[command(name = "sqlsense", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON catalog used to resolve table columns
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Database in effect before the first USE
    #[arg(long, global = true)]
    database: Option<String>,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    log: Option<String>,

    /// Print single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a file into GO batches with their active database
    Batches {
        /// SQL file, `-` for stdin
        file: PathBuf,
    },
    /// Parse a file into statement chunks
    Chunks {
        /// SQL file, `-` for stdin
        file: PathBuf,
    },
    /// Detect the completion context at a cursor position
    Context {
        /// SQL file, `-` for stdin
        file: PathBuf,
        /// 1-based line
        #[arg(long)]
        line: usize,
        /// 1-based column, counted in characters
        #[arg(long)]
        col: usize,
    },
    /// Compare two types; `NULL`, `cast:TYPE` and `?` are accepted
    Check { left: String, right: String },
    /// Check the argument type of an aggregate call
    Aggregate { function: String, argument: String },
    /// Check that CASE, COALESCE, IIF or NULLIF branches agree
    Branches {
        /// CASE, COALESCE, ISNULL, IIF or NULLIF
        kind: String,
        #[arg(required = true)]
        branches: Vec<String>,
    },
    /// Report structural issues of a file
    Diagnostics {
        /// SQL file, `-` for stdin
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_tracing(&config.log_filter)?;

    tracing::debug!(?config, "starting sqlsense");
    let engine = Engine::new(config)?;

    match &cli.command {
        Command::Batches { file } => {
            let (batches, debug_info) = engine.parse_query(&read_source(file)?);
            emit(&json!({ "batches": batches, "debug": debug_info }), cli.compact)
        }
        Command::Chunks { file } => emit(&engine.parse(&read_source(file)?), cli.compact),
        Command::Context { file, line, col } => {
            let source = read_source(file)?;
            emit(&engine.detect(BufferId(0), &source, *line, *col), cli.compact)
        }
        Command::Check { left, right } => {
            let verdict = engine.check_operands(&operand(left), &operand(right));
            emit(&verdict, cli.compact)
        }
        Command::Aggregate { function, argument } => {
            emit(&engine.check_aggregate(function, &operand(argument)), cli.compact)
        }
        Command::Branches { kind, branches } => {
            let Some(kind) = BranchKind::from_function(kind) else {
                bail!("unknown conditional '{kind}'");
            };
            let branches: Vec<Operand> = branches.iter().map(|b| operand(b)).collect();
            emit(&engine.check_branches(kind, &branches), cli.compact)
        }
        Command::Diagnostics { file } => {
            emit(&engine.diagnostics(&read_source(file)?), cli.compact)
        }
    }
}

fn build_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(catalog) = &cli.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(database) = &cli.database {
        config.default_database = Some(database.clone());
    }
    if let Some(filter) = &cli.log {
        config.log_filter = filter.clone();
    }
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn operand(text: &str) -> Operand {
    if text.eq_ignore_ascii_case("null") {
        return Operand::null();
    }
    if text == "?" {
        return Operand::unknown();
    }
    match text.split_once(':') {
        Some((prefix, type_name)) if prefix.eq_ignore_ascii_case("cast") => Operand::cast(type_name),
        _ => Operand::typed(text),
    }
}

fn emit<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}
