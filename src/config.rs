use std::path::Path;

use serde::Deserialize;

use crate::error::SqlModelError;
use crate::sqlite::Database;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseOptions {
    pub db_path: String,
    #[serde(default)]
    pub wal: bool,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: false,
            busy_timeout_ms: None,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:".to_string())
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path == ":memory:" || self.db_path.starts_with("file::memory:")
    }

    /// Parse options from a JSON document such as
    /// `{"db_path": "app.db", "wal": true, "busy_timeout_ms": 500}`.
    ///
    /// # Errors
    /// Returns `SqlModelError::ConfigError` if the document is not valid options JSON or the
    /// path is empty.
    pub fn from_json_str(raw: &str) -> Result<Self, SqlModelError> {
        let opts: DatabaseOptions = serde_json::from_str(raw)
            .map_err(|e| SqlModelError::ConfigError(format!("invalid options JSON: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read and parse an options file.
    ///
    /// # Errors
    /// Returns `SqlModelError::ConfigError` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlModelError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub(crate) fn validate(&self) -> Result<(), SqlModelError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlModelError::ConfigError("db_path is empty".into()));
        }
        Ok(())
    }
}

/// Fluent builder for `DatabaseOptions`.
#[derive(Debug, Clone)]
pub struct DatabaseOptionsBuilder {
    opts: DatabaseOptions,
}

impl DatabaseOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: DatabaseOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, millis: u64) -> Self {
        self.opts.busy_timeout_ms = Some(millis);
        self
    }

    #[must_use]
    pub fn finish(self) -> DatabaseOptions {
        self.opts
    }

    /// Open a `Database` with these options.
    ///
    /// # Errors
    ///
    /// Returns `SqlModelError` if the options are invalid or the connection cannot be opened.
    pub fn open(self) -> Result<Database, SqlModelError> {
        Database::open(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_options_with_defaults() {
        let opts = DatabaseOptions::from_json_str(r#"{"db_path": "app.db"}"#).unwrap();
        assert_eq!(opts.db_path, "app.db");
        assert!(!opts.wal);
        assert_eq!(opts.busy_timeout_ms, None);
    }

    #[test]
    fn rejects_empty_path() {
        let err = DatabaseOptions::from_json_str(r#"{"db_path": "  "}"#).unwrap_err();
        assert!(matches!(err, SqlModelError::ConfigError(_)));
    }

    #[test]
    fn builder_sets_fields() {
        let opts = DatabaseOptionsBuilder::new(":memory:".into())
            .wal(true)
            .busy_timeout(250)
            .finish();
        assert!(opts.wal);
        assert!(opts.is_in_memory());
        assert_eq!(opts.busy_timeout_ms, Some(250));
    }
}
