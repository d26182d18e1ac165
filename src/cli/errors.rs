//! CLI-specific error types
//!
//! Configuration and I/O failures end the process. Schema errors raised
//! while serving a request are reported on that request's response line
//! and the loop continues.

use std::io;

use thiserror::Error;

use crate::schema::SchemaError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing, unreadable or invalid
    #[error("{0}")]
    Config(String),

    /// Request line that is not a valid request
    #[error("{0}")]
    BadRequest(String),

    /// Schema or model error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// stdin/stdout or file failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn config(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        CliError::BadRequest(msg.into())
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "REVIEW_CLI_CONFIG_ERROR",
            CliError::BadRequest(_) => "REVIEW_CLI_BAD_REQUEST",
            CliError::Schema(err) => err.code().code(),
            CliError::Io(_) => "REVIEW_CLI_IO_ERROR",
            CliError::Json(_) => "REVIEW_CLI_JSON_ERROR",
        }
    }

    /// Message without the code prefix, for response lines
    pub fn message(&self) -> String {
        match self {
            CliError::Schema(err) => err.message().to_string(),
            other => other.to_string(),
        }
    }
}
