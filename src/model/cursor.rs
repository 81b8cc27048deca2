use std::sync::Arc;
use std::vec;

use serde::de::DeserializeOwned;

use crate::error::SqlModelError;
use crate::results::shaped::{self, Fetched, Materialized, Stepper};
use crate::results::{ResultSet, Row};
use crate::types::FetchShape;

/// Rows of an executed `get`, read either all at once or one at a time.
///
/// The cursor owns its rows, so later calls on the same model do not disturb it. Pick one
/// way of reading a cursor: mixing [`Cursor::next`] and [`Cursor::all`] is a caller error,
/// and `all` then only sees the rows `next` left behind.
#[derive(Debug)]
pub struct Cursor {
    shape: FetchShape,
    column_names: Arc<Vec<String>>,
    rows: vec::IntoIter<Row>,
    row_count: usize,
    stepper: Option<Stepper>,
}

impl Cursor {
    pub(crate) fn new(shape: FetchShape, result: ResultSet) -> Self {
        let column_names = Arc::clone(result.column_names());
        let row_count = result.rows_affected;
        Self {
            shape,
            column_names,
            rows: result.into_iter(),
            row_count,
            stepper: None,
        }
    }

    #[must_use]
    pub fn shape(&self) -> FetchShape {
        self.shape
    }

    /// Rows the statement produced, consumed or not.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Rows not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Next row in the cursor's shape, `Ok(None)` once exhausted (and on every call after).
    ///
    /// # Errors
    /// Returns `SqlModelError::InvalidFetchMode` for `Column`, which has no step-one form,
    /// and for an `Indexed` cursor that did not select exactly two columns.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Fetched>, SqlModelError> {
        if !self.shape.supports_step() {
            return Err(SqlModelError::InvalidFetchMode(format!(
                "{} cannot be fetched one row at a time",
                self.shape
            )));
        }
        let stepper = match self.stepper.take() {
            Some(stepper) => stepper,
            None => Stepper::new(self.shape, &self.column_names)?,
        };
        let fetched = self.rows.next().map(|row| stepper.step(row)).transpose();
        self.stepper = Some(stepper);
        fetched
    }

    /// Materialize every remaining row in the cursor's shape.
    ///
    /// # Errors
    /// Returns `SqlModelError::InvalidFetchMode` for an `Indexed` cursor that did not select
    /// exactly two columns.
    pub fn all(self) -> Result<Materialized, SqlModelError> {
        shaped::materialize(self.shape, &self.column_names, self.rows)
    }

    /// Deserialize every remaining row into `T`, ignoring the cursor's shape.
    ///
    /// # Errors
    /// Returns `SqlModelError::JsonError` if a row does not fit `T`.
    pub fn all_into<T: DeserializeOwned>(self) -> Result<Vec<T>, SqlModelError> {
        self.rows
            .map(|row| serde_json::from_value(row.to_json()).map_err(SqlModelError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn cursor(shape: FetchShape, n: i64) -> Cursor {
        let mut rs = ResultSet::with_columns(vec!["id".into(), "name".into()], n as usize);
        for i in 0..n {
            rs.add_row_values(vec![RowValues::Int(i), RowValues::Text(format!("n{i}"))]);
        }
        Cursor::new(shape, rs)
    }

    #[test]
    fn next_returns_none_repeatedly_at_exhaustion() {
        let mut c = cursor(FetchShape::Assoc, 2);
        assert!(c.next().unwrap().is_some());
        assert!(c.next().unwrap().is_some());
        assert!(c.next().unwrap().is_none());
        assert!(c.next().unwrap().is_none());
        assert_eq!(c.row_count(), 2);
    }

    #[test]
    fn all_after_next_returns_the_rest() {
        let mut c = cursor(FetchShape::Column, 3);
        assert!(matches!(c.next(), Err(SqlModelError::InvalidFetchMode(_))));
        let mut c2 = cursor(FetchShape::Assoc, 3);
        c2.next().unwrap();
        assert_eq!(c2.all().unwrap().len(), 2);
        assert_eq!(c.all().unwrap().into_column().unwrap().len(), 3);
    }

    #[test]
    fn indexed_and_grouped_step_until_exhausted() {
        let mut c = cursor(FetchShape::Indexed, 2);
        assert_eq!(
            c.next().unwrap(),
            Some(Fetched::Indexed(RowValues::Int(0), RowValues::Text("n0".into())))
        );
        assert!(c.next().unwrap().is_some());
        assert!(c.next().unwrap().is_none());
        assert!(c.next().unwrap().is_none());

        let mut c = cursor(FetchShape::Grouped, 2);
        c.next().unwrap();
        let Some(Fetched::Grouped(key, rest)) = c.next().unwrap() else {
            panic!("expected grouped");
        };
        assert_eq!(key, RowValues::Int(1));
        assert_eq!(rest.get("name"), Some(&RowValues::Text("n1".into())));
        assert_eq!(rest.get("id"), None);
        assert!(c.next().unwrap().is_none());
    }

    #[test]
    fn all_into_deserializes_rows() {
        #[derive(serde::Deserialize)]
        struct Rec {
            id: i64,
            name: String,
        }
        let recs: Vec<Rec> = cursor(FetchShape::Objects, 2).all_into().unwrap();
        assert_eq!(recs[1].id, 1);
        assert_eq!(recs[1].name, "n1");
    }
}
