//! reviewdb CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors are printed
//! to stderr with their code and the process exits non-zero.

use reviewdb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e.message());
        std::process::exit(1);
    }
}
