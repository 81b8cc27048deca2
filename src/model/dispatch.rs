use serde_json::Value as JsonValue;

use super::args::{Args, ConditionArgs, Fields};
use super::binder::{bind_batch, bind_column, bind_condition, bind_row};
use super::clauses::{
    batch_insert_statement, delete_statement, insert_statement, select_statement,
    update_statement,
};
use super::cursor::Cursor;
use super::query::{Query, Target, Verb};
use crate::error::SqlModelError;
use crate::results::Materialized;
use crate::sqlite::{Database, NamedParams};
use crate::types::FetchShape;

/// What a dispatched call produced.
#[derive(Debug)]
pub enum Outcome {
    /// `get`: rows waiting to be read with `all()` or `next()`.
    Cursor(Cursor),
    /// `getall`: every row, already materialized.
    Rows(Materialized),
    /// `set`, `update`, `delete`, `count`: the statement's row count.
    Count(usize),
    /// `set...AndGetId`: rowid of the inserted row.
    Id(i64),
}

impl Outcome {
    #[must_use]
    pub fn into_cursor(self) -> Option<Cursor> {
        match self {
            Outcome::Cursor(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<Materialized> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    #[must_use]
    pub fn count(&self) -> Option<usize> {
        match self {
            Outcome::Count(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Outcome::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Render the outcome as JSON, draining a cursor in its own shape.
    ///
    /// # Errors
    /// Returns whatever [`Cursor::all`] returns for a cursor outcome.
    pub fn into_json(self) -> Result<JsonValue, SqlModelError> {
        Ok(match self {
            Outcome::Cursor(cursor) => cursor.all()?.to_json(),
            Outcome::Rows(rows) => rows.to_json(),
            Outcome::Count(n) => JsonValue::from(n),
            Outcome::Id(id) => JsonValue::from(id),
        })
    }
}

fn condition_args(query: &Query, args: Args) -> Result<ConditionArgs, SqlModelError> {
    match args {
        Args::None => Ok(ConditionArgs::default()),
        Args::Row(fields) if fields.is_empty() => Ok(ConditionArgs::default()),
        Args::Condition(c) => Ok(c),
        other => Err(SqlModelError::InvalidParams(format!(
            "{} on `{}` takes a condition bundle, got {other:?}",
            query.verb.token(),
            query.table
        ))),
    }
}

// reads and deletes only bind the key, whatever else the row carries
fn key_only(column: &str, args: Args) -> Args {
    match args {
        Args::Row(fields) => fields
            .get(column)
            .cloned()
            .map_or(Args::Row(fields), Args::Column),
        other => other,
    }
}

fn run_statement<'db>(
    db: &'db mut Database,
    sql: &str,
    params: &NamedParams,
) -> Result<&'db mut Database, SqlModelError> {
    db.query(sql)?.execute(params)
}

/// Route `query` to its statement, execute it, and shape the result.
///
/// # Errors
/// Returns `SqlModelError::MissingTable` for an empty table, `SqlModelError::InvalidParams`
/// when `args` does not fit the operation, and `SqlModelError::DriverError` when execution
/// fails.
pub fn dispatch(db: &mut Database, query: &Query, args: Args) -> Result<Outcome, SqlModelError> {
    if query.table.is_empty() {
        return Err(SqlModelError::MissingTable(query.verb.token().to_string()));
    }
    match query.verb {
        Verb::Get => {
            let shape = query.shape.ok_or_else(|| {
                SqlModelError::InvalidFetchMode(format!("get on `{}` without a shape", query.table))
            })?;
            run_get(db, query, shape, args).map(Outcome::Cursor)
        }
        Verb::GetAll => run_get_all(db, query).map(Outcome::Rows),
        Verb::Set => run_set(db, query, args),
        Verb::Update => run_update(db, query, args).map(Outcome::Count),
        Verb::Delete => run_delete(db, query, args).map(Outcome::Count),
        Verb::Count => run_count(db, query, args).map(Outcome::Count),
    }
}

fn select_and_params(
    query: &Query,
    args: Args,
) -> Result<(String, NamedParams), SqlModelError> {
    match &query.target {
        Target::Condition => {
            let bundle = condition_args(query, args)?;
            let sql = select_statement(&query.table, &query.target, &bundle)?;
            Ok((sql, bind_condition(&bundle)))
        }
        Target::Column { name, operator } => {
            let params = bind_column(name, *operator, &key_only(name, args))?;
            let sql = select_statement(&query.table, &query.target, &ConditionArgs::default())?;
            Ok((sql, params))
        }
    }
}

fn run_get(
    db: &mut Database,
    query: &Query,
    shape: FetchShape,
    args: Args,
) -> Result<Cursor, SqlModelError> {
    let (sql, params) = select_and_params(query, args)?;
    let result = run_statement(db, &sql, &params)?.take_result_set()?;
    Ok(Cursor::new(shape, result))
}

fn run_get_all(db: &mut Database, query: &Query) -> Result<Materialized, SqlModelError> {
    let sql = select_statement(&query.table, &Target::Condition, &ConditionArgs::default())?;
    run_statement(db, &sql, &NamedParams::new())?.fetch_all(FetchShape::Assoc)
}

fn run_set(db: &mut Database, query: &Query, args: Args) -> Result<Outcome, SqlModelError> {
    match args {
        // a batch always reports the row count, with or without AndGetId
        Args::Batch(rows) => {
            let sql = batch_insert_statement(&query.table, &rows)?;
            let count = run_statement(db, &sql, &bind_batch(&rows))?.row_count()?;
            Ok(Outcome::Count(count))
        }
        Args::Row(row) => {
            let db = insert_row(db, &query.table, &row)?;
            if query.return_id {
                Ok(Outcome::Id(db.last_insert_id()))
            } else {
                db.row_count().map(Outcome::Count)
            }
        }
        other => Err(SqlModelError::InvalidParams(format!(
            "set on `{}` takes a row or a batch of rows, got {other:?}",
            query.table
        ))),
    }
}

fn insert_row<'db>(
    db: &'db mut Database,
    table: &str,
    row: &Fields,
) -> Result<&'db mut Database, SqlModelError> {
    let sql = insert_statement(table, row)?;
    run_statement(db, &sql, &bind_row(row))
}

fn run_update(db: &mut Database, query: &Query, args: Args) -> Result<usize, SqlModelError> {
    let (sql, params) = match &query.target {
        Target::Column { name, operator } => {
            let Args::Row(fields) = &args else {
                return Err(SqlModelError::InvalidParams(format!(
                    "update of `{}` by `{name}` takes a row containing `{name}`",
                    query.table
                )));
            };
            let sql = update_statement(&query.table, &query.target, fields, None)?;
            (sql, bind_column(name, *operator, &args)?)
        }
        Target::Condition => {
            let bundle = condition_args(query, args)?;
            let sql = update_statement(
                &query.table,
                &query.target,
                &bundle.values,
                bundle.condition.as_deref(),
            )?;
            (sql, bind_condition(&bundle))
        }
    };
    run_statement(db, &sql, &params)?.row_count()
}

fn run_delete(db: &mut Database, query: &Query, args: Args) -> Result<usize, SqlModelError> {
    let (sql, params) = match &query.target {
        Target::Column { name, operator } => (
            delete_statement(&query.table, &query.target, None)?,
            bind_column(name, *operator, &key_only(name, args))?,
        ),
        Target::Condition => {
            let bundle = condition_args(query, args)?;
            let sql = delete_statement(&query.table, &query.target, bundle.condition.as_deref())?;
            (sql, bind_condition(&bundle))
        }
    };
    run_statement(db, &sql, &params)?.row_count()
}

// Row count of the SELECT itself, so LIMIT and GROUP BY change the answer.
fn run_count(db: &mut Database, query: &Query, args: Args) -> Result<usize, SqlModelError> {
    let (sql, params) = select_and_params(query, args)?;
    run_statement(db, &sql, &params)?.row_count()
}
