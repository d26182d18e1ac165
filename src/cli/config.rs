//! `reviewdb.json` configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::ModelStore;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::schema::{review_schema, SchemaCatalog};

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Schema file; the builtin code review schema when absent
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Minimum log level: trace, info, warn or error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reject attributes the schema does not declare (default true)
    #[serde(default = "default_strict_unknown_fields")]
    pub strict_unknown_fields: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_strict_unknown_fields() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: None,
            log_level: default_log_level(),
            strict_unknown_fields: default_strict_unknown_fields(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        self.severity()?;

        if let Some(path) = &self.schema_path {
            if path.as_os_str().is_empty() {
                return Err(CliError::config("schema_path must not be empty"));
            }
        }

        Ok(())
    }

    /// `log_level` as a logger severity
    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(|e| CliError::config(format!("Invalid log_level: {}", e)))
    }

    /// Applies process-wide settings (log level)
    pub fn apply(&self) -> CliResult<()> {
        Logger::set_min_severity(self.severity()?);
        let schema = self
            .schema_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "builtin".to_string());
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("log_level", self.log_level.as_str()), ("schema", schema.as_str())],
        );
        Ok(())
    }

    /// Schema named by the configuration
    pub fn catalog(&self) -> CliResult<SchemaCatalog> {
        match &self.schema_path {
            Some(path) => SchemaCatalog::load_file(path).map_err(|err| {
                log_event_with_fields(
                    Event::SchemaRejected,
                    &[("code", err.code().code()), ("message", err.message())],
                );
                CliError::from(err)
            }),
            None => Ok(review_schema()),
        }
    }

    /// Empty store governed by the configured schema
    pub fn build_store(&self) -> CliResult<ModelStore> {
        let mut store = ModelStore::new(self.catalog()?)?;
        store.set_strict_unknown_fields(self.strict_unknown_fields);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let file = write_config("{}");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.strict_unknown_fields);
        assert_eq!(config.severity().unwrap(), Severity::Info);
    }

    #[test]
    fn test_invalid_log_level() {
        let file = write_config(r#"{"log_level": "loud"}"#);
        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "REVIEW_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = write_config(r#"{"data_dir": "/tmp"}"#);
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/reviewdb.json")).unwrap_err();
        assert_eq!(err.code(), "REVIEW_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_lenient_store() {
        let file = write_config(r#"{"strict_unknown_fields": false, "log_level": "warn"}"#);
        let config = Config::load(file.path()).unwrap();
        let mut store = config.build_store().unwrap();

        let id = store
            .create(
                "User",
                serde_json::json!({"login": "amy", "firstname": "A", "lastname": "B", "x": 1}),
            )
            .unwrap();
        assert!(store.get(id).unwrap().get("x").is_none());
    }

    #[test]
    fn test_schema_path_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        review_schema().save_file(&path).unwrap();

        let config = Config {
            schema_path: Some(path),
            ..Config::default()
        };
        assert_eq!(config.catalog().unwrap(), review_schema());
    }
}
