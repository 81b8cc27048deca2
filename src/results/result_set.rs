use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Row, index_columns};
use crate::types::RowValues;

/// A buffered result set from an executed statement
///
/// This struct represents the result of a database query,
/// containing the rows returned by the query and metadata.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Row>,
    /// Rows produced by a SELECT, or rows changed by DML
    pub rows_affected: usize,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns with a known capacity
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> ResultSet {
        let column_index = index_columns(&column_names);
        ResultSet {
            results: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Result of a statement that produced no rows, only a change count.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Move row `idx` out, leaving an empty row sharing the column names in its place.
    pub(crate) fn take_row(&mut self, idx: usize) -> Option<Row> {
        let placeholder = Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            Vec::new(),
        );
        self.results
            .get_mut(idx)
            .map(|slot| std::mem::replace(slot, placeholder))
    }

    /// Add a row to the result set
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let row = Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            row_values,
        );
        self.results.push(row);
        self.rows_affected += 1;
    }

    /// Move out every row after the first `skip`, leaving this set empty.
    ///
    /// The returned set shares the column names and keeps `rows_affected`.
    pub fn take_remaining(&mut self, skip: usize) -> ResultSet {
        let mut results = std::mem::take(&mut self.results);
        results.drain(..skip.min(results.len()));
        ResultSet {
            results,
            rows_affected: self.rows_affected,
            column_names: Arc::clone(&self.column_names),
            column_index: Arc::clone(&self.column_index),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
