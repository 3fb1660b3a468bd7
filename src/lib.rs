//! fashion: a model-driven code generation engine.
//!
//! A project accumulates models (JSON documents) of various kinds in a
//! local store, transforms them through declared-input/declared-output
//! transform objects ordered by a dependency-graph planner, and renders
//! the results into files through a change-aware mirror that protects
//! hand-edited output from being silently clobbered.
//!
//! # Crate structure
//!
//! - [`core`]: store, schema validation, supervised model access, segments,
//!   warehouses, portfolios, the planner, the orchestrating runway, and the
//!   file mirror.
//! - [`plugins`]: the bundled `fashion.core.*` transform modules (JSON/XML
//!   loaders, the Tera-based generator).
//! - [`cli`]: command-line argument definitions.

pub mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Command, SegmentCommand};
use crate::core::error::FashionError;
use crate::core::portfolio::{find_portfolio, Portfolio};
use crate::core::runway::Runway;
use colored::Colorize;
use std::path::Path;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;

/// Dispatch a parsed CLI command. Returns the process exit code: `0` on
/// success (even with per-transform errors logged), `1` on a fatal
/// condition (no project found, unrecoverable store I/O). Usage errors
/// never reach here — clap exits with `2` itself while parsing.
pub fn run(cli: cli::Cli) -> i32 {
    let result = match cli.command {
        Command::Init { dir } => cmd_init(&dir),
        Command::Build { dir, force, verbose, tags } => cmd_build(&dir, force, verbose, &tags),
        Command::Segment { command } => cmd_segment(command),
    };
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("{} {}", "fatal:".red().bold(), e);
            EXIT_FATAL
        }
    }
}

fn cmd_init(dir: &Path) -> Result<(), FashionError> {
    let mut portfolio = Portfolio::new(dir);
    if portfolio.exists() {
        println!("fashion project already exists at {}", portfolio.fashion_path.display());
        return Ok(());
    }
    let log = portfolio.open_log(false);
    portfolio.create(&log)?;
    println!("Initialized fashion project at {}", portfolio.fashion_path.display());
    Ok(())
}

fn cmd_build(dir: &Path, force: bool, verbose: bool, tags: &[String]) -> Result<(), FashionError> {
    let portfolio = find_portfolio(dir).ok_or(FashionError::MissingProject)?;
    let log = portfolio.open_log(verbose);
    let mut store = portfolio.open_store()?;
    let mut warehouse = portfolio.load_warehouses();
    warehouse.load_segments(&log);

    let tags_opt = if tags.is_empty() { None } else { Some(tags) };

    {
        let mut runway = Runway::new(&mut store, &log, warehouse);
        runway.load_modules(tags_opt);
        runway.load_schemas();
        runway.init_mirror(&portfolio.project_path, &portfolio.mirror_path, force);
        runway.init_modules(tags_opt);
        runway.plan();
        runway.execute(tags_opt);
    }
    store.close()?;
    println!("{}", "Build complete.".green());
    Ok(())
}

fn cmd_segment(command: SegmentCommand) -> Result<(), FashionError> {
    match command {
        SegmentCommand::New { name, dir } => {
            let portfolio = find_portfolio(&dir).ok_or(FashionError::MissingProject)?;
            let log = portfolio.open_log(false);
            let warehouse = portfolio.load_warehouses();
            if let Some(seg) = warehouse.new_segment(&name, &log) {
                println!("Created segment {} at {}", name, seg.abs_dirname.display());
            }
            Ok(())
        }
        SegmentCommand::List { dir } => {
            let portfolio = find_portfolio(&dir).ok_or(FashionError::MissingProject)?;
            let log = portfolio.open_log(false);
            let mut warehouse = portfolio.load_warehouses();
            warehouse.load_segments(&log);
            for seg in warehouse.segments() {
                println!("{} v{} — {}", seg.descriptor.name, seg.descriptor.version, seg.abs_dirname.display());
            }
            Ok(())
        }
    }
}
