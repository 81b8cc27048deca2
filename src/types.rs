use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for bound parameters and for fetched columns, so a value read
/// with one call can be passed straight back into another:
/// ```rust
/// use sql_model::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::from(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // SQLite hands timestamps back as text
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Scalar values are the only ones that can stand alone as a column-equality argument.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Text(_) | Self::Bool(_))
    }

    /// Render the value as plain text, the way it is spliced into a LIKE pattern.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Text(s) => s.clone(),
            RowValues::Bool(b) => i64::from(*b).to_string(),
            RowValues::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
            RowValues::Null => String::new(),
            RowValues::JSON(j) => j.to_string(),
            RowValues::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Convert to a JSON value for record-object output.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            RowValues::Text(s) => JsonValue::String(s.clone()),
            RowValues::Bool(b) => JsonValue::Bool(*b),
            RowValues::Timestamp(dt) => JsonValue::String(dt.format("%F %T%.f").to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(j) => j.clone(),
            RowValues::Blob(b) => JsonValue::Array(b.iter().map(|v| JsonValue::from(*v)).collect()),
        }
    }

    /// Convert a JSON scalar into a value. Arrays and objects are kept as `JSON`.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(*b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(RowValues::Int)
                .or_else(|| n.as_f64().map(RowValues::Float))
                .unwrap_or(RowValues::Null),
            JsonValue::String(s) => RowValues::Text(s.clone()),
            other => RowValues::JSON(other.clone()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<u32> for RowValues {
    fn from(value: u32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Result-structuring mode for read operations.
///
/// The variant names are the tokens accepted in call names, e.g. the `Assoc` of
/// `getAssocUsersByEmail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FetchShape {
    /// Sequence of field-name to value rows.
    Assoc,
    /// Sequence of record objects.
    Objects,
    /// Keyed by the first selected column, remaining fields as the value.
    Unique,
    /// Sequence of first-column values.
    Column,
    /// Keyed by the first column, second column as the value.
    Indexed,
    /// Keyed by the first column, all rows sharing that key as the value.
    Grouped,
}

impl FetchShape {
    pub const ALL: [FetchShape; 6] = [
        FetchShape::Assoc,
        FetchShape::Objects,
        FetchShape::Unique,
        FetchShape::Column,
        FetchShape::Indexed,
        FetchShape::Grouped,
    ];

    /// Resolve a call-name token (`"Assoc"`, `"Grouped"`, ...).
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.token() == token)
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            FetchShape::Assoc => "Assoc",
            FetchShape::Objects => "Objects",
            FetchShape::Unique => "Unique",
            FetchShape::Column => "Column",
            FetchShape::Indexed => "Indexed",
            FetchShape::Grouped => "Grouped",
        }
    }

    /// Whether step-one (`next`) consumption is available for this shape.
    #[must_use]
    pub fn supports_step(self) -> bool {
        !matches!(self, FetchShape::Column)
    }
}

impl std::fmt::Display for FetchShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
