use std::fmt;
use std::time::Duration;

use rusqlite::Connection;

use super::params::NamedParams;
use super::query::build_result_set;
use super::transaction::ActiveTransaction;
use crate::config::DatabaseOptions;
use crate::error::SqlModelError;
use crate::results::shaped::{self, Fetched, KeyedRows, Materialized, Stepper};
use crate::results::{ResultSet, Row};
use crate::types::{FetchShape, RowValues};

/// SQL text plus what its last execution produced.
///
/// A statement is replaced, never reused, when the next one is prepared; its buffered rows go
/// with it.
#[derive(Debug)]
pub(crate) struct Statement {
    sql: String,
    result: Option<ResultSet>,
    consumed: usize,
    stepper: Option<Stepper>,
}

/// Connection gateway over one `rusqlite` connection.
///
/// Mirrors a classic driver handle: prepare a statement with [`Database::query`], run it with
/// [`Database::execute`], then read it with [`Database::row_count`], [`Database::fetch`] or
/// [`Database::fetch_all`]. Each `query` call replaces the current statement.
///
/// One instance per unit of work; it is not meant to be shared between threads.
pub struct Database {
    pub(crate) conn: Connection,
    statement: Option<Statement>,
    pub(crate) transaction: Option<ActiveTransaction>,
}

impl Database {
    /// Open (or create) the database described by `options`.
    ///
    /// # Errors
    /// Returns `SqlModelError::ConfigError` for invalid options and
    /// `SqlModelError::ConnectionError` if the file cannot be opened or configured.
    pub fn open(options: DatabaseOptions) -> Result<Self, SqlModelError> {
        options.validate()?;
        let conn = Connection::open(&options.db_path).map_err(|e| {
            SqlModelError::ConnectionError(format!("Failed to open {}: {e}", options.db_path))
        })?;

        if let Some(millis) = options.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(millis))
                .map_err(|e| SqlModelError::ConnectionError(format!("busy_timeout: {e}")))?;
        }

        if options.wal && !options.is_in_memory() {
            let mode: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .map_err(|e| SqlModelError::ConnectionError(format!("journal_mode: {e}")))?;
            tracing::debug!(db_path = %options.db_path, journal_mode = %mode, "opened database");
        }

        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns `SqlModelError::ConnectionError` if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqlModelError> {
        Self::open(DatabaseOptions::in_memory())
    }

    /// Wrap an already opened connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            statement: None,
            transaction: None,
        }
    }

    /// Borrow the underlying driver connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Prepare `sql` as the current statement, discarding the previous one.
    ///
    /// # Errors
    /// Returns `SqlModelError::DriverError` if the driver rejects the SQL.
    pub fn query(&mut self, sql: &str) -> Result<&mut Self, SqlModelError> {
        // warm the cache so execute doesn't re-prepare
        self.conn.prepare_cached(sql)?;
        self.statement = Some(Statement {
            sql: sql.to_owned(),
            result: None,
            consumed: 0,
            stepper: None,
        });
        Ok(self)
    }

    /// Execute the current statement with named parameters.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if nothing was prepared and
    /// `SqlModelError::DriverError` if execution fails.
    pub fn execute(&mut self, params: &NamedParams) -> Result<&mut Self, SqlModelError> {
        let statement = self
            .statement
            .as_mut()
            .ok_or_else(|| SqlModelError::MissingStatement("execute".into()))?;
        let result = build_result_set(&self.conn, &statement.sql, params)?;
        statement.result = Some(result);
        statement.consumed = 0;
        Ok(self)
    }

    fn executed(&self, ctx: &str) -> Result<&ResultSet, SqlModelError> {
        self.statement
            .as_ref()
            .and_then(|s| s.result.as_ref())
            .ok_or_else(|| SqlModelError::MissingStatement(ctx.to_string()))
    }

    fn executed_mut(&mut self, ctx: &str) -> Result<&mut Statement, SqlModelError> {
        match self.statement.as_mut() {
            Some(statement) if statement.result.is_some() => Ok(statement),
            _ => Err(SqlModelError::MissingStatement(ctx.to_string())),
        }
    }

    /// Rows changed by DML, or rows produced by a SELECT.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if no statement has been executed.
    pub fn row_count(&self) -> Result<usize, SqlModelError> {
        Ok(self.executed("row_count")?.rows_affected)
    }

    /// The SQL text of the current statement, if any.
    #[must_use]
    pub fn current_sql(&self) -> Option<&str> {
        self.statement.as_ref().map(|s| s.sql.as_str())
    }

    /// Advance one row. `Ok(None)` once the rows are exhausted, on every later call too.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if no statement has been executed and
    /// `SqlModelError::InvalidFetchMode` for shapes without a step-one form.
    pub fn fetch(&mut self, shape: FetchShape) -> Result<Option<Fetched>, SqlModelError> {
        if !shape.supports_step() {
            return Err(SqlModelError::InvalidFetchMode(format!(
                "{shape} cannot be fetched one row at a time"
            )));
        }
        let statement = self.executed_mut("fetch")?;
        let Some(result) = statement.result.as_mut() else {
            return Err(SqlModelError::MissingStatement("fetch".into()));
        };
        let Some(row) = result.take_row(statement.consumed) else {
            return Ok(None);
        };
        statement.consumed += 1;
        let stepper = match statement.stepper.take() {
            Some(stepper) if stepper.shape() == shape => stepper,
            _ => Stepper::new(shape, result.column_names())?,
        };
        let fetched = stepper.step(row);
        statement.stepper = Some(stepper);
        fetched.map(Some)
    }

    /// Drain the remaining rows of the current statement into `shape`.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if no statement has been executed.
    pub fn fetch_all(&mut self, shape: FetchShape) -> Result<Materialized, SqlModelError> {
        let result = self.take_result_set()?;
        let names = result.column_names().clone();
        shaped::materialize(shape, &names, result)
    }

    /// Move the remaining buffered rows out of the current statement.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if no statement has been executed.
    pub fn take_result_set(&mut self) -> Result<ResultSet, SqlModelError> {
        let statement = self.executed_mut("take_result_set")?;
        let skip = std::mem::take(&mut statement.consumed);
        statement
            .result
            .as_mut()
            .map(|result| result.take_remaining(skip))
            .ok_or_else(|| SqlModelError::MissingStatement("take_result_set".into()))
    }

    /// Drain the remaining rows, grouping second-column values under the first column.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingStatement` if no statement has been executed and
    /// `SqlModelError::InvalidFetchMode` when fewer than two columns were selected.
    pub fn fetch_all_grouped_column(
        &mut self,
    ) -> Result<KeyedRows<Vec<RowValues>>, SqlModelError> {
        let result = self.take_result_set()?;
        let names = result.column_names().clone();
        shaped::group_column(&names, result)
    }

    /// Rowid of the last successful INSERT on this connection (0 if none).
    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Execute one or more raw statements (DDL, pragmas) outside the statement cycle.
    ///
    /// # Errors
    /// Returns `SqlModelError::DriverError` if any statement fails.
    pub fn execute_raw(&self, sql: &str) -> Result<(), SqlModelError> {
        tracing::debug!(sql, "executing raw batch");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Column metadata of `table`: one row per column with `cid`, `name`, `type`,
    /// `notnull`, `dflt_value` and `pk`.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingTable` for an empty name and
    /// `SqlModelError::DriverError` if the pragma fails.
    pub fn table_fields(&mut self, table: &str) -> Result<Vec<Row>, SqlModelError> {
        if table.is_empty() {
            return Err(SqlModelError::MissingTable("table_fields".into()));
        }
        let sql = format!("PRAGMA table_info({})", crate::model::clauses::quote_ident(table)?);
        let rows = self
            .query(&sql)?
            .execute(&NamedParams::new())?
            .take_result_set()?;
        Ok(rows.results)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("statement", &self.statement)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}
