use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single `RowValue` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Convert a rusqlite `Value` read from a row back into a `RowValue`.
#[must_use]
pub fn sqlite_value_to_row_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}

/// Named parameters for one execution, in binding order.
///
/// Names are stored with their leading `:`; a name given without it is normalized, so
/// `"id"` and `":id"` address the same placeholder. Setting a name twice keeps the first
/// position and the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    entries: Vec<(String, RowValues)>,
}

pub(crate) fn placeholder(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

impl NamedParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<RowValues>) {
        let key = placeholder(name);
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<RowValues>) -> Self {
        self.set(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        let key = placeholder(name);
        self.entries.iter().find(|(n, _)| *n == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Driver values paired with their placeholder names.
    #[must_use]
    pub fn to_sqlite_values(&self) -> Vec<(&str, Value)> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), row_value_to_sqlite_value(v)))
            .collect()
    }
}

impl<S: AsRef<str>, V: Into<RowValues>> FromIterator<(S, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut params = NamedParams::new();
        for (name, value) in iter {
            params.set(name.as_ref(), value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized_and_deduplicated() {
        let mut params = NamedParams::new();
        params.set("id", 1);
        params.set(":email", "a@b.c");
        params.set(":id", 2);
        assert_eq!(params.len(), 2);
        assert_eq!(params.names().collect::<Vec<_>>(), vec![":id", ":email"]);
        assert_eq!(params.get("id"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn booleans_bind_as_integers() {
        assert_eq!(row_value_to_sqlite_value(&RowValues::Bool(true)), Value::Integer(1));
    }
}
