//! CLI module for reviewdb
//!
//! Provides command-line interface for:
//! - schema: print resolved entity shapes
//! - export-schema: write the builtin schema file
//! - serve: apply JSON requests from stdin to an in-memory store

mod args;
mod commands;
mod config;
mod errors;
mod handler;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{export_schema, run, run_command, schema, serve};
pub use config::Config;
pub use errors::{CliError, CliResult};
pub use handler::RequestHandler;
pub use io::{read_requests, write_error, write_response};
pub use request::{Request, WriteOp};
