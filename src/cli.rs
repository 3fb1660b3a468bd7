//! CLI struct definitions for the fashion command-line interface.
//!
//! All clap-derived types live here; dispatch logic lives in [`crate::run`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "fashion",
    version = env!("CARGO_PKG_VERSION"),
    about = "A model-driven code generation engine: load models, transform them, and generate files from templates."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new fashion project in the given directory.
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(default_value = ".")]
        dir: PathBuf,
    },
    /// Run the full pipeline: load modules, plan, and execute transforms.
    Build {
        /// Directory inside the project to build from (defaults to current working directory).
        #[clap(default_value = ".")]
        dir: PathBuf,
        /// Overwrite generated files even if they were hand-edited since the last build.
        #[clap(long)]
        force: bool,
        /// Print debug-level build events to stderr.
        #[clap(short, long)]
        verbose: bool,
        /// Only run transforms matching ALL of these tags.
        #[clap(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Manage segments in the project's local warehouse.
    Segment {
        #[clap(subcommand)]
        command: SegmentCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SegmentCommand {
    /// Create a new, empty segment.
    New {
        name: String,
        /// Directory inside the project (defaults to current working directory).
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },
    /// List segments visible to the project (local warehouse plus bundled fallback).
    List {
        #[clap(long, default_value = ".")]
        dir: PathBuf,
    },
}
