//! CLI command implementations

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::observability::{log_event, log_event_with_fields, Event};
use crate::schema::{review_schema, SchemaError, ShapeResolver};

use super::args::Command;
use super::config::Config;
use super::errors::CliResult;
use super::handler::RequestHandler;
use super::io::{read_requests, write_error, write_line, write_response};

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match cmd {
        Command::Schema { config, entity } => {
            schema(config.as_deref(), entity.as_deref(), &mut stdout)
        }
        Command::ExportSchema { out } => export_schema(&out, &mut stdout),
        Command::Serve { config } => serve(config.as_deref(), stdin.lock(), &mut stdout),
    }
}

/// Prints the resolved shapes of the configured schema
pub fn schema<W: Write>(config_path: Option<&Path>, entity: Option<&str>, out: &mut W) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    config.apply()?;
    let catalog = config.catalog()?;
    let resolver = ShapeResolver::new(&catalog);

    let data: Value = match entity {
        Some(kind) => {
            if catalog.entity(kind).is_none() {
                return Err(SchemaError::unknown_entity_kind(kind).into());
            }
            serde_json::to_value(resolver.resolve(kind)?)?
        }
        None => serde_json::to_value(resolver.resolve_all()?)?,
    };

    write_response(out, data)
}

/// Writes the builtin schema as a schema file
pub fn export_schema<W: Write>(path: &Path, out: &mut W) -> CliResult<()> {
    review_schema().save_file(path)?;
    write_response(out, json!({ "path": path.display().to_string() }))
}

/// Applies requests from `input` until it is exhausted.
///
/// Every request gets exactly one response line, in order. A rejected
/// request does not stop the loop; an I/O failure does.
pub fn serve<R: BufRead, W: Write>(config_path: Option<&Path>, input: R, out: &mut W) -> CliResult<()> {
    let config = Config::load_or_default(config_path)?;
    config.apply()?;
    let mut handler = RequestHandler::new(config.build_store()?);

    log_event(Event::Serving);

    let mut handled: u64 = 0;
    for line in read_requests(input) {
        match line {
            Ok(line) => {
                let response = handler.handle_line(&line);
                write_line(out, &response)?;
                handled += 1;
            }
            Err(e) => {
                write_error(out, e.code(), &e.message())?;
                return Err(e);
            }
        }
    }

    let handled = handled.to_string();
    log_event_with_fields(Event::ServeComplete, &[("requests", handled.as_str())]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_prints_all_shapes() {
        let mut out = Vec::new();
        schema(None, None, &mut out).unwrap();

        let response = &lines(&out)[0];
        assert_eq!(response["status"], "ok");
        for kind in ["User", "PullRequest", "Comment"] {
            assert!(response["data"].get(kind).is_some(), "missing {}", kind);
        }
    }

    #[test]
    fn test_schema_single_entity() {
        let mut out = Vec::new();
        schema(None, Some("Comment"), &mut out).unwrap();

        let response = &lines(&out)[0];
        assert_eq!(response["data"]["kind"], "Comment");
        assert!(response["data"]["fields"].get("body").is_some());
    }

    #[test]
    fn test_schema_unknown_entity() {
        let mut out = Vec::new();
        let err = schema(None, Some("Issue"), &mut out).unwrap_err();
        assert_eq!(err.code(), "REVIEW_UNKNOWN_ENTITY_KIND");
    }

    #[test]
    fn test_export_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("review.json");
        let mut out = Vec::new();

        export_schema(&path, &mut out).unwrap();
        assert!(path.exists());
        assert_eq!(lines(&out)[0]["status"], "ok");
    }

    #[test]
    fn test_serve_answers_every_line() {
        let input = Cursor::new(
            concat!(
                r#"{"op":"create","kind":"User","attributes":{"login":"amy","firstname":"A","lastname":"L"}}"#,
                "\n",
                r#"{"op":"create","kind":"User","attributes":{"login":"amy","firstname":"B","lastname":"M"}}"#,
                "\n",
                "garbage\n",
                r#"{"op":"stats"}"#,
                "\n"
            )
            .as_bytes()
            .to_vec(),
        );
        let mut out = Vec::new();
        serve(None, input, &mut out).unwrap();

        let responses = lines(&out);
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0]["status"], "ok");
        assert_eq!(responses[1]["code"], "REVIEW_UNIQUENESS_VIOLATION");
        assert_eq!(responses[2]["code"], "REVIEW_CLI_BAD_REQUEST");
        assert_eq!(responses[3]["data"]["commits"], 1);
        assert_eq!(responses[3]["data"]["rejections"], 1);
    }
}
