use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::row::{Row, index_columns};
use crate::error::SqlModelError;
use crate::types::{FetchShape, RowValues};

/// Insertion-ordered map keyed by a column value.
///
/// Keyed shapes (`Unique`, `Indexed`, `Grouped`) use the first selected column as the key.
/// Re-inserting an existing key replaces the value in place, so the entry keeps the
/// position of its first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRows<T> {
    entries: Vec<(RowValues, T)>,
    positions: HashMap<String, usize>,
}

impl<T> Default for KeyedRows<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

fn key_repr(key: &RowValues) -> String {
    match key {
        RowValues::Int(i) => format!("i:{i}"),
        RowValues::Float(f) => format!("f:{}", f.to_bits()),
        RowValues::Text(s) => format!("s:{s}"),
        RowValues::Bool(b) => format!("b:{b}"),
        RowValues::Timestamp(dt) => format!("t:{dt}"),
        RowValues::Null => "n".to_string(),
        RowValues::JSON(j) => format!("j:{j}"),
        RowValues::Blob(b) => format!("x:{b:?}"),
    }
}

impl<T> KeyedRows<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &RowValues) -> Option<&T> {
        self.positions
            .get(&key_repr(key))
            .map(|&idx| &self.entries[idx].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowValues> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowValues, &T)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<(RowValues, T)> {
        self.entries
    }

    pub fn insert(&mut self, key: RowValues, value: T) {
        let repr = key_repr(&key);
        if let Some(&idx) = self.positions.get(&repr) {
            self.entries[idx].1 = value;
        } else {
            self.positions.insert(repr, self.entries.len());
            self.entries.push((key, value));
        }
    }
}

impl<T> KeyedRows<Vec<T>> {
    /// Append to the group for `key`, creating it on first sight.
    pub fn push_grouped(&mut self, key: RowValues, value: T) {
        let repr = key_repr(&key);
        if let Some(&idx) = self.positions.get(&repr) {
            self.entries[idx].1.push(value);
        } else {
            self.positions.insert(repr, self.entries.len());
            self.entries.push((key, vec![value]));
        }
    }
}

/// Every remaining row of a cursor, structured by its `FetchShape`.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    Assoc(Vec<Row>),
    Objects(Vec<JsonValue>),
    Unique(KeyedRows<Row>),
    Column(Vec<RowValues>),
    Indexed(KeyedRows<RowValues>),
    Grouped(KeyedRows<Vec<Row>>),
}

impl Materialized {
    #[must_use]
    pub fn shape(&self) -> FetchShape {
        match self {
            Materialized::Assoc(_) => FetchShape::Assoc,
            Materialized::Objects(_) => FetchShape::Objects,
            Materialized::Unique(_) => FetchShape::Unique,
            Materialized::Column(_) => FetchShape::Column,
            Materialized::Indexed(_) => FetchShape::Indexed,
            Materialized::Grouped(_) => FetchShape::Grouped,
        }
    }

    /// Number of top-level entries (rows, values or keys).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Materialized::Assoc(rows) => rows.len(),
            Materialized::Objects(objects) => objects.len(),
            Materialized::Unique(keyed) => keyed.len(),
            Materialized::Column(values) => values.len(),
            Materialized::Indexed(keyed) => keyed.len(),
            Materialized::Grouped(keyed) => keyed.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn into_assoc(self) -> Option<Vec<Row>> {
        if let Materialized::Assoc(rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_objects(self) -> Option<Vec<JsonValue>> {
        if let Materialized::Objects(objects) = self {
            Some(objects)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_column(self) -> Option<Vec<RowValues>> {
        if let Materialized::Column(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// JSON rendering; keyed shapes become objects keyed by the key's text.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        fn keyed<T>(keyed: &KeyedRows<T>, f: impl Fn(&T) -> JsonValue) -> JsonValue {
            let mut map = serde_json::Map::with_capacity(keyed.len());
            for (key, value) in keyed.iter() {
                map.insert(key.to_plain_string(), f(value));
            }
            JsonValue::Object(map)
        }

        match self {
            Materialized::Assoc(rows) => JsonValue::Array(rows.iter().map(Row::to_json).collect()),
            Materialized::Objects(objects) => JsonValue::Array(objects.clone()),
            Materialized::Unique(rows) => keyed(rows, Row::to_json),
            Materialized::Column(values) => {
                JsonValue::Array(values.iter().map(RowValues::to_json).collect())
            }
            Materialized::Indexed(pairs) => keyed(pairs, RowValues::to_json),
            Materialized::Grouped(groups) => keyed(groups, |rows| {
                JsonValue::Array(rows.iter().map(Row::to_json).collect())
            }),
        }
    }
}

/// One row of a cursor, structured by its `FetchShape`. `Column` has no step-one form.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Assoc(Row),
    Object(JsonValue),
    Unique(RowValues, Row),
    Indexed(RowValues, RowValues),
    Grouped(RowValues, Row),
}

impl Fetched {
    #[must_use]
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Fetched::Assoc(row) | Fetched::Unique(_, row) | Fetched::Grouped(_, row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&RowValues> {
        match self {
            Fetched::Unique(key, _) | Fetched::Indexed(key, _) | Fetched::Grouped(key, _) => {
                Some(key)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Fetched::Assoc(row) => row.to_json(),
            Fetched::Object(object) => object.clone(),
            Fetched::Unique(key, row) | Fetched::Grouped(key, row) => keyed_entry(key, row.to_json()),
            Fetched::Indexed(key, value) => keyed_entry(key, value.to_json()),
        }
    }
}

fn keyed_entry(key: &RowValues, value: JsonValue) -> JsonValue {
    let mut map = serde_json::Map::with_capacity(1);
    map.insert(key.to_plain_string(), value);
    JsonValue::Object(map)
}

/// Splits rows into (first column, remaining columns), sharing the remaining-column names.
#[derive(Debug)]
struct FirstColumnSplit {
    names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl FirstColumnSplit {
    fn new(column_names: &[String]) -> Self {
        let rest: Vec<String> = column_names.iter().skip(1).cloned().collect();
        let index = index_columns(&rest);
        Self {
            names: Arc::new(rest),
            index,
        }
    }

    fn split(&self, row: Row) -> Result<(RowValues, Row), SqlModelError> {
        let mut values = row.values.into_iter();
        let key = values.next().ok_or_else(|| {
            SqlModelError::InvalidFetchMode("keyed fetch on a row with no columns".into())
        })?;
        let rest = Row::with_index(
            Arc::clone(&self.names),
            Arc::clone(&self.index),
            values.collect(),
        );
        Ok((key, rest))
    }
}

fn ensure_pair(shape: FetchShape, column_names: &[String]) -> Result<(), SqlModelError> {
    if column_names.len() == 2 {
        Ok(())
    } else {
        Err(SqlModelError::InvalidFetchMode(format!(
            "{shape} fetch needs exactly two selected columns, got {}",
            column_names.len()
        )))
    }
}

fn pair(row: Row) -> (RowValues, RowValues) {
    let mut values = row.values.into_iter();
    let key = values.next().unwrap_or(RowValues::Null);
    let value = values.next().unwrap_or(RowValues::Null);
    (key, value)
}

/// Structure a batch of rows sharing `column_names` according to `shape`.
///
/// # Errors
/// Returns `SqlModelError::InvalidFetchMode` when `Indexed` is used with anything but two
/// columns, or a keyed shape meets a row with no columns.
pub fn materialize(
    shape: FetchShape,
    column_names: &[String],
    rows: impl IntoIterator<Item = Row>,
) -> Result<Materialized, SqlModelError> {
    let rows = rows.into_iter();
    Ok(match shape {
        FetchShape::Assoc => Materialized::Assoc(rows.collect()),
        FetchShape::Objects => Materialized::Objects(rows.map(|row| row.to_json()).collect()),
        FetchShape::Column => Materialized::Column(
            rows.map(|row| row.values.into_iter().next().unwrap_or(RowValues::Null))
                .collect(),
        ),
        FetchShape::Unique => {
            let split = FirstColumnSplit::new(column_names);
            let mut keyed = KeyedRows::new();
            for row in rows {
                let (key, rest) = split.split(row)?;
                keyed.insert(key, rest);
            }
            Materialized::Unique(keyed)
        }
        FetchShape::Indexed => {
            ensure_pair(shape, column_names)?;
            let mut keyed = KeyedRows::new();
            for row in rows {
                let (key, value) = pair(row);
                keyed.insert(key, value);
            }
            Materialized::Indexed(keyed)
        }
        FetchShape::Grouped => {
            let split = FirstColumnSplit::new(column_names);
            let mut keyed = KeyedRows::new();
            for row in rows {
                let (key, rest) = split.split(row)?;
                keyed.push_grouped(key, rest);
            }
            Materialized::Grouped(keyed)
        }
    })
}

/// Step-one structuring for rows that share one column list.
///
/// The remaining-column names of keyed shapes are computed once, not per row.
#[derive(Debug)]
pub(crate) struct Stepper {
    shape: FetchShape,
    split: Option<FirstColumnSplit>,
}

impl Stepper {
    /// # Errors
    /// Returns `SqlModelError::InvalidFetchMode` for `Column` (no step-one form) and for an
    /// `Indexed` stepper over anything but two columns.
    pub(crate) fn new(shape: FetchShape, column_names: &[String]) -> Result<Self, SqlModelError> {
        let split = match shape {
            FetchShape::Column => {
                return Err(SqlModelError::InvalidFetchMode(
                    "Column fetch cannot be consumed one row at a time".into(),
                ));
            }
            FetchShape::Indexed => {
                ensure_pair(shape, column_names)?;
                None
            }
            FetchShape::Unique | FetchShape::Grouped => Some(FirstColumnSplit::new(column_names)),
            FetchShape::Assoc | FetchShape::Objects => None,
        };
        Ok(Self { shape, split })
    }

    pub(crate) fn shape(&self) -> FetchShape {
        self.shape
    }

    pub(crate) fn step(&self, row: Row) -> Result<Fetched, SqlModelError> {
        match (self.shape, &self.split) {
            (FetchShape::Assoc, _) => Ok(Fetched::Assoc(row)),
            (FetchShape::Objects, _) => Ok(Fetched::Object(row.to_json())),
            (FetchShape::Indexed, _) => {
                let (key, value) = pair(row);
                Ok(Fetched::Indexed(key, value))
            }
            (FetchShape::Unique, Some(split)) => {
                split.split(row).map(|(key, rest)| Fetched::Unique(key, rest))
            }
            (FetchShape::Grouped, Some(split)) => {
                split.split(row).map(|(key, rest)| Fetched::Grouped(key, rest))
            }
            (shape, _) => Err(SqlModelError::InvalidFetchMode(format!(
                "{shape} cannot be fetched one row at a time"
            ))),
        }
    }
}

/// Structure a single row according to `shape`.
///
/// # Errors
/// Returns `SqlModelError::InvalidFetchMode` for `Column` (no step-one form) and for the
/// same column-count problems as [`materialize`].
pub fn step(shape: FetchShape, row: Row) -> Result<Fetched, SqlModelError> {
    Stepper::new(shape, &row.column_names)?.step(row)
}

/// Group the second column's values under the first column's value.
///
/// Columns past the second are ignored.
///
/// # Errors
/// Returns `SqlModelError::InvalidFetchMode` when fewer than two columns were selected.
pub fn group_column(
    column_names: &[String],
    rows: impl IntoIterator<Item = Row>,
) -> Result<KeyedRows<Vec<RowValues>>, SqlModelError> {
    if column_names.len() < 2 {
        return Err(SqlModelError::InvalidFetchMode(format!(
            "grouped column fetch needs at least two selected columns, got {}",
            column_names.len()
        )));
    }
    let mut keyed = KeyedRows::new();
    for row in rows {
        let (key, value) = pair(row);
        keyed.push_grouped(key, value);
    }
    Ok(keyed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(names: &[&str], data: Vec<Vec<RowValues>>) -> (Vec<String>, Vec<Row>) {
        let names: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        let shared = Arc::new(names.clone());
        let rows = data
            .into_iter()
            .map(|values| Row::new(Arc::clone(&shared), values))
            .collect();
        (names, rows)
    }

    fn city_rows() -> (Vec<String>, Vec<Row>) {
        rows(
            &["city", "name"],
            vec![
                vec!["London".into(), "Jerry".into()],
                vec!["Paris".into(), "Victor".into()],
                vec!["London".into(), "Mary".into()],
            ],
        )
    }

    #[test]
    fn grouped_keeps_first_seen_order_and_appends() {
        let (names, data) = city_rows();
        let Materialized::Grouped(groups) = materialize(FetchShape::Grouped, &names, data).unwrap()
        else {
            panic!("expected grouped");
        };
        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![RowValues::from("London"), RowValues::from("Paris")]);
        let london = groups.get(&"London".into()).unwrap();
        assert_eq!(london.len(), 2);
        assert_eq!(london[1].get("name"), Some(&RowValues::from("Mary")));
        assert_eq!(london[1].get("city"), None);
    }

    #[test]
    fn unique_and_indexed_let_the_last_duplicate_win() {
        let (names, data) = city_rows();
        let Materialized::Indexed(pairs) =
            materialize(FetchShape::Indexed, &names, data.clone()).unwrap()
        else {
            panic!("expected indexed");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get(&"London".into()), Some(&RowValues::from("Mary")));

        let Materialized::Unique(unique) = materialize(FetchShape::Unique, &names, data).unwrap()
        else {
            panic!("expected unique");
        };
        assert_eq!(unique.keys().next(), Some(&RowValues::from("London")));
        assert_eq!(
            unique.get(&"London".into()).unwrap().get("name"),
            Some(&RowValues::from("Mary"))
        );
    }

    #[test]
    fn indexed_rejects_three_columns() {
        let (names, data) = rows(&["a", "b", "c"], vec![vec![1.into(), 2.into(), 3.into()]]);
        let err = materialize(FetchShape::Indexed, &names, data).unwrap_err();
        assert!(matches!(err, SqlModelError::InvalidFetchMode(_)));
    }

    #[test]
    fn column_has_no_step_form() {
        let (_, mut data) = city_rows();
        let err = step(FetchShape::Column, data.remove(0)).unwrap_err();
        assert!(matches!(err, SqlModelError::InvalidFetchMode(_)));
    }

    #[test]
    fn indexed_and_grouped_step_one_row_at_a_time() {
        let (names, data) = city_rows();
        let stepper = Stepper::new(FetchShape::Indexed, &names).unwrap();
        let pairs: Vec<_> = data
            .iter()
            .cloned()
            .map(|row| stepper.step(row).unwrap())
            .collect();
        assert_eq!(pairs[2], Fetched::Indexed("London".into(), "Mary".into()));

        let stepper = Stepper::new(FetchShape::Grouped, &names).unwrap();
        let Fetched::Grouped(key, rest) = stepper.step(data[1].clone()).unwrap() else {
            panic!("expected grouped");
        };
        assert_eq!(key, RowValues::from("Paris"));
        assert_eq!(rest.column_names.as_slice(), ["name"]);
        assert_eq!(rest.get("name"), Some(&RowValues::from("Victor")));
    }

    #[test]
    fn indexed_stepper_rejects_three_columns() {
        let names = ["a", "b", "c"].map(String::from);
        let err = Stepper::new(FetchShape::Indexed, &names).unwrap_err();
        assert!(matches!(err, SqlModelError::InvalidFetchMode(_)));
    }

    #[test]
    fn group_column_collects_second_column_values() {
        let (names, data) = city_rows();
        let groups = group_column(&names, data).unwrap();
        assert_eq!(
            groups.get(&"London".into()),
            Some(&vec![RowValues::from("Jerry"), RowValues::from("Mary")])
        );
        assert_eq!(groups.keys().nth(1), Some(&RowValues::from("Paris")));

        let (names, data) = rows(&["only"], vec![vec![1.into()]]);
        assert!(matches!(
            group_column(&names, data),
            Err(SqlModelError::InvalidFetchMode(_))
        ));
    }

    #[test]
    fn objects_are_json_maps() {
        let (_, mut data) = city_rows();
        let Fetched::Object(object) = step(FetchShape::Objects, data.remove(0)).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(object["city"], "London");
        assert_eq!(object["name"], "Jerry");
    }
}
