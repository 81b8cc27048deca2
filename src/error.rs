use thiserror::Error;

/// Every failure surfaced by the gateway and the dispatcher.
///
/// None of these are retried internally. A descriptor, fetch-mode, table, statement or
/// params error means the call site is wrong; a driver error wraps whatever `rusqlite`
/// reported after execute.
#[derive(Debug, Error)]
pub enum SqlModelError {
    #[error("Malformed call descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid fetch mode: {0}")]
    InvalidFetchMode(String),

    #[error("Missing table in call: {0}")]
    MissingTable(String),

    #[error("No prepared statement: {0}")]
    MissingStatement(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    DriverError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}
