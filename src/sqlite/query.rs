use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};

use super::params::{NamedParams, sqlite_value_to_row_value};
use crate::error::SqlModelError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlModelError::DriverError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlModelError> {
    let value: Value = row.get(idx)?;
    Ok(sqlite_value_to_row_value(value))
}

/// Run `sql` with named parameters and buffer what it produced.
///
/// Statements that yield columns are drained into the result set, and `rows_affected` is
/// the number of rows produced. Other statements report the driver's change count.
///
/// # Errors
/// Returns `SqlModelError::DriverError` if preparing, binding or stepping the statement fails.
pub fn build_result_set(
    conn: &Connection,
    sql: &str,
    params: &NamedParams,
) -> Result<ResultSet, SqlModelError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let values = params.to_sqlite_values();
    let named: Vec<(&str, &dyn ToSql)> = values
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect();

    tracing::debug!(sql, params = ?params.names().collect::<Vec<_>>(), "executing statement");

    if stmt.column_count() == 0 {
        let changed = stmt.execute(named.as_slice())?;
        return Ok(ResultSet::affected(changed));
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names, 10);

    let mut rows_iter = stmt.query(named.as_slice())?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
