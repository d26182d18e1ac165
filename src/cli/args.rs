//! CLI argument definitions using clap
//!
//! Commands:
//! - reviewdb schema [--config <path>] [--entity <kind>]
//! - reviewdb export-schema --out <path>
//! - reviewdb serve [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reviewdb - schema-validated object graph for code review
#[derive(Parser, Debug)]
#[command(name = "reviewdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print resolved entity shapes as JSON
    Schema {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only print this entity kind
        #[arg(long)]
        entity: Option<String>,
    },

    /// Write the builtin code review schema to a file
    ExportSchema {
        /// Destination path
        #[arg(long)]
        out: PathBuf,
    },

    /// Apply JSON requests from stdin, one per line
    Serve {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
