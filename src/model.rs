//! Call-name driven statements over a [`Database`].
//!
//! ```rust,no_run
//! use sql_model::prelude::*;
//!
//! # fn main() -> Result<(), SqlModelError> {
//! let mut model = Model::open_in_memory()?;
//! model.execute_raw("CREATE TABLE users (users_id INTEGER PRIMARY KEY, email TEXT)")?;
//!
//! let id = model
//!     .call("setUsersAndGetId", Fields::new().with("email", "a@b.c"))?
//!     .id();
//! let mut cursor = model.call("getAssocUsersByEmail", "a@b.c")?.into_cursor().unwrap();
//! let row = cursor.next()?;
//! # let _ = (id, row);
//! # Ok(())
//! # }
//! ```

mod args;
mod binder;
pub mod clauses;
mod cursor;
mod descriptor;
mod dispatch;
mod query;

pub use args::{Args, ConditionArgs, Fields, Range, Selection};
pub use binder::{bind_batch, bind_column, bind_condition, bind_row};
pub use cursor::Cursor;
pub use descriptor::CallDescriptor;
pub use dispatch::Outcome;
pub use query::{Operator, Query, Target, Verb};

use crate::config::DatabaseOptions;
use crate::error::SqlModelError;
use crate::results::{Materialized, Row};
use crate::sqlite::{Database, TableLock, TxOutcome};
use crate::types::FetchShape;

/// Dispatcher over one owned [`Database`].
///
/// Each call prepares a fresh statement; cursors returned by `get` own their rows and stay
/// readable after later calls.
#[derive(Debug)]
pub struct Model {
    db: Database,
}

impl Model {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// # Errors
    /// See [`Database::open`].
    pub fn open(options: DatabaseOptions) -> Result<Self, SqlModelError> {
        Database::open(options).map(Self::new)
    }

    /// # Errors
    /// See [`Database::open_in_memory`].
    pub fn open_in_memory() -> Result<Self, SqlModelError> {
        Database::open_in_memory().map(Self::new)
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    #[must_use]
    pub fn into_database(self) -> Database {
        self.db
    }

    /// Parse `name` and run it.
    ///
    /// ```text
    /// get{Assoc|Objects|Unique|Column|Indexed|Grouped}<Table>ByCondition
    /// get{...}<Table>{By|Like}<Column>
    /// getall<Table>
    /// set<Table>, set<Table>AndGetId
    /// update<Table>[ByCondition | {By|Like}<Column>]
    /// delete<Table>[ByCondition | {By|Like}<Column>]
    /// count<Table>ByCondition
    /// ```
    ///
    /// Grammar errors are raised before any SQL is built.
    ///
    /// # Errors
    /// Any `SqlModelError`; see [`CallDescriptor::parse`], [`Query::from_descriptor`] and
    /// [`Model::dispatch`].
    pub fn call(&mut self, name: &str, args: impl Into<Args>) -> Result<Outcome, SqlModelError> {
        let query = Query::parse(name)?;
        self.dispatch(&query, args)
    }

    /// Run an already resolved query.
    ///
    /// # Errors
    /// Returns `SqlModelError::MissingTable`, `SqlModelError::InvalidParams` or
    /// `SqlModelError::DriverError`.
    pub fn dispatch(
        &mut self,
        query: &Query,
        args: impl Into<Args>,
    ) -> Result<Outcome, SqlModelError> {
        dispatch::dispatch(&mut self.db, query, args.into())
    }

    /// `get<Shape><Table>...`
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn get(
        &mut self,
        shape: FetchShape,
        table: &str,
        target: Target,
        args: impl Into<Args>,
    ) -> Result<Cursor, SqlModelError> {
        let query = Query::new(Verb::Get, table)
            .with_shape(shape)
            .with_target(target);
        match self.dispatch(&query, args)? {
            Outcome::Cursor(cursor) => Ok(cursor),
            other => Err(SqlModelError::InvalidFetchMode(format!(
                "get on `{table}` produced {other:?}"
            ))),
        }
    }

    /// Every row of `table`.
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn get_all(&mut self, table: &str) -> Result<Vec<Row>, SqlModelError> {
        let outcome = self.dispatch(&Query::new(Verb::GetAll, table), Args::None)?;
        Ok(outcome
            .into_rows()
            .and_then(Materialized::into_assoc)
            .unwrap_or_default())
    }

    /// Insert one row; returns the number of inserted rows.
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn set(&mut self, table: &str, row: Fields) -> Result<usize, SqlModelError> {
        let outcome = self.dispatch(&Query::new(Verb::Set, table), row)?;
        Ok(outcome.count().unwrap_or_default())
    }

    /// Insert one row; returns its rowid.
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn set_and_get_id(&mut self, table: &str, row: Fields) -> Result<i64, SqlModelError> {
        let outcome = self.dispatch(&Query::new(Verb::Set, table).returning_id(), row)?;
        Ok(outcome.id().unwrap_or_default())
    }

    /// Insert several rows with one statement; returns the number of inserted rows.
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn set_batch(&mut self, table: &str, rows: Vec<Fields>) -> Result<usize, SqlModelError> {
        let outcome = self.dispatch(&Query::new(Verb::Set, table), rows)?;
        Ok(outcome.count().unwrap_or_default())
    }

    /// # Errors
    /// See [`Model::dispatch`].
    pub fn update(
        &mut self,
        table: &str,
        target: Target,
        args: impl Into<Args>,
    ) -> Result<usize, SqlModelError> {
        let query = Query::new(Verb::Update, table).with_target(target);
        Ok(self.dispatch(&query, args)?.count().unwrap_or_default())
    }

    /// # Errors
    /// See [`Model::dispatch`].
    pub fn delete(
        &mut self,
        table: &str,
        target: Target,
        args: impl Into<Args>,
    ) -> Result<usize, SqlModelError> {
        let query = Query::new(Verb::Delete, table).with_target(target);
        Ok(self.dispatch(&query, args)?.count().unwrap_or_default())
    }

    /// Rows the equivalent `get` would produce.
    ///
    /// # Errors
    /// See [`Model::dispatch`].
    pub fn count(&mut self, table: &str, args: ConditionArgs) -> Result<usize, SqlModelError> {
        let outcome = self.dispatch(&Query::new(Verb::Count, table), args)?;
        Ok(outcome.count().unwrap_or_default())
    }

    /// # Errors
    /// See [`Database::table_fields`].
    pub fn table_fields(&mut self, table: &str) -> Result<Vec<Row>, SqlModelError> {
        self.db.table_fields(table)
    }

    /// # Errors
    /// See [`Database::execute_raw`].
    pub fn execute_raw(&self, sql: &str) -> Result<(), SqlModelError> {
        self.db.execute_raw(sql)
    }

    /// # Errors
    /// See [`Database::begin_transaction`].
    pub fn begin_transaction(
        &mut self,
        locks: &[TableLock],
        token: Option<u64>,
    ) -> Result<TxOutcome, SqlModelError> {
        self.db.begin_transaction(locks, token)
    }

    /// # Errors
    /// See [`Database::commit`].
    pub fn commit(&mut self, token: Option<u64>) -> Result<TxOutcome, SqlModelError> {
        self.db.commit(token)
    }

    /// # Errors
    /// See [`Database::rollback`].
    pub fn rollback(&mut self, token: Option<u64>) -> Result<TxOutcome, SqlModelError> {
        self.db.rollback(token)
    }
}
