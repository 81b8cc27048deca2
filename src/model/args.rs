use serde_json::Value as JsonValue;

use crate::error::SqlModelError;
use crate::sqlite::params::NamedParams;
use crate::types::RowValues;

/// Column list or raw SQL fragment for select, group-by and order-by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Identifiers, each quoted on output.
    Columns(Vec<String>),
    /// Caller-trusted SQL, inserted verbatim (order-by is still pattern-checked).
    Raw(String),
}

impl Selection {
    #[must_use]
    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Columns(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn raw(fragment: &str) -> Self {
        Selection::Raw(fragment.to_string())
    }

    fn from_json(key: &str, value: &JsonValue) -> Result<Option<Self>, SqlModelError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) => Ok(Some(Selection::Raw(s.clone()))),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SqlModelError::InvalidParams(format!("{key}: expected column names"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|cols| Some(Selection::Columns(cols))),
            other => Err(SqlModelError::InvalidParams(format!(
                "{key}: expected a string or a list of columns, got {other}"
            ))),
        }
    }
}

/// LIMIT window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Range {
    Window { offset: u64, count: u64 },
    /// `"<offset>,<count>"`; anything else is dropped when the statement is built.
    Raw(String),
}

/// Ordered field = value payload (one row to insert, or the values of an update).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, RowValues)>,
}

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing an earlier value but keeping its position.
    pub fn set(&mut self, field: &str, value: impl Into<RowValues>) {
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(f, _)| f == field) {
            slot.1 = value;
        } else {
            self.entries.push((field.to_string(), value));
        }
    }

    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<RowValues>) -> Self {
        self.set(field, value);
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&RowValues> {
        self.entries.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn from_json_object(map: &serde_json::Map<String, JsonValue>) -> Self {
        map.iter()
            .map(|(field, value)| (field.as_str(), RowValues::from_json(value)))
            .collect()
    }
}

impl<S: AsRef<str>, V: Into<RowValues>> FromIterator<(S, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (field, value) in iter {
            fields.set(field.as_ref(), value);
        }
        fields
    }
}

/// Parameter bundle of the condition form.
///
/// ```rust
/// use sql_model::prelude::*;
///
/// let args = ConditionArgs::new()
///     .select_raw("salt, user_name")
///     .condition("`users_id` < :id")
///     .param(":id", 20)
///     .order_raw("user_name ASC")
///     .range(0, 10);
/// # let _ = args;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionArgs {
    pub select: Option<Selection>,
    pub join: Option<String>,
    pub condition: Option<String>,
    /// Caller-named placeholders; `None` when no mapping was supplied.
    pub params: Option<NamedParams>,
    /// SET values of an update, bound as `:<field>`.
    pub values: Fields,
    pub group: Option<Selection>,
    pub order: Option<Selection>,
    pub range: Option<Range>,
}

const BUNDLE_KEYS: [&str; 8] = [
    "select",
    "join",
    "condition",
    "params",
    "values",
    "group",
    "order",
    "range",
];

impl ConditionArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(Selection::columns(names));
        self
    }

    #[must_use]
    pub fn select_raw(mut self, fragment: &str) -> Self {
        self.select = Some(Selection::raw(fragment));
        self
    }

    #[must_use]
    pub fn join(mut self, fragment: &str) -> Self {
        self.join = Some(fragment.to_string());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    #[must_use]
    pub fn param(mut self, name: &str, value: impl Into<RowValues>) -> Self {
        self.params.get_or_insert_with(NamedParams::new).set(name, value);
        self
    }

    #[must_use]
    pub fn params(mut self, params: NamedParams) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn value(mut self, field: &str, value: impl Into<RowValues>) -> Self {
        self.values.set(field, value);
        self
    }

    #[must_use]
    pub fn group_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = Some(Selection::columns(names));
        self
    }

    #[must_use]
    pub fn group_raw(mut self, fragment: &str) -> Self {
        self.group = Some(Selection::raw(fragment));
        self
    }

    #[must_use]
    pub fn order_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = Some(Selection::columns(names));
        self
    }

    #[must_use]
    pub fn order_raw(mut self, fragment: &str) -> Self {
        self.order = Some(Selection::raw(fragment));
        self
    }

    #[must_use]
    pub fn range(mut self, offset: u64, count: u64) -> Self {
        self.range = Some(Range::Window { offset, count });
        self
    }

    #[must_use]
    pub fn range_raw(mut self, literal: &str) -> Self {
        self.range = Some(Range::Raw(literal.to_string()));
        self
    }

    fn from_json_object(map: &serde_json::Map<String, JsonValue>) -> Result<Self, SqlModelError> {
        let mut args = ConditionArgs::new();
        for (key, value) in map {
            match key.as_str() {
                "select" => args.select = Selection::from_json(key, value)?,
                "group" => args.group = Selection::from_json(key, value)?,
                "order" => args.order = Selection::from_json(key, value)?,
                "join" | "condition" => {
                    let text = match value {
                        JsonValue::Null => None,
                        JsonValue::String(s) => Some(s.clone()),
                        other => {
                            return Err(SqlModelError::InvalidParams(format!(
                                "{key}: expected SQL text, got {other}"
                            )));
                        }
                    };
                    if key == "join" {
                        args.join = text;
                    } else {
                        args.condition = text;
                    }
                }
                // a params entry that is not a mapping means "no params"
                "params" => {
                    args.params = value.as_object().map(|params| {
                        params
                            .iter()
                            .map(|(name, v)| (name.as_str(), RowValues::from_json(v)))
                            .collect()
                    });
                }
                "values" => match value {
                    JsonValue::Null => {}
                    JsonValue::Object(values) => args.values = Fields::from_json_object(values),
                    other => {
                        return Err(SqlModelError::InvalidParams(format!(
                            "values: expected a field mapping, got {other}"
                        )));
                    }
                },
                "range" => {
                    args.range = match value {
                        JsonValue::Null => None,
                        JsonValue::Array(pair) if pair.len() == 2 => {
                            match (pair[0].as_u64(), pair[1].as_u64()) {
                                (Some(offset), Some(count)) => Some(Range::Window { offset, count }),
                                _ => Some(Range::Raw(value.to_string())),
                            }
                        }
                        JsonValue::String(s) => Some(Range::Raw(s.clone())),
                        other => Some(Range::Raw(other.to_string())),
                    };
                }
                other => {
                    return Err(SqlModelError::InvalidParams(format!(
                        "unknown condition key {other:?}"
                    )));
                }
            }
        }
        Ok(args)
    }
}

/// Argument of a call, resolved once into the shape the operation consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Args {
    #[default]
    None,
    /// Condition form bundle.
    Condition(ConditionArgs),
    /// Bare value for a column-suffix call (`getAssocUsersByEmail("a@b.c")`).
    Column(RowValues),
    /// One field = value row (insert, or update by column).
    Row(Fields),
    /// Several rows for a batch insert.
    Batch(Vec<Fields>),
}

impl Args {
    /// Resolve an untyped JSON argument.
    ///
    /// - `null` → `None`
    /// - a scalar → `Column`
    /// - an object whose keys are all bundle keys (`select`, `join`, `condition`,
    ///   `params`, `values`, `group`, `order`, `range`) → `Condition`; `{}` is the empty
    ///   bundle
    /// - any other object → `Row`
    /// - an array of objects → `Batch`
    ///
    /// # Errors
    /// Returns `SqlModelError::InvalidParams` for empty or mixed arrays and for bundle keys
    /// holding the wrong kind of value.
    pub fn from_json(value: &JsonValue) -> Result<Self, SqlModelError> {
        match value {
            JsonValue::Null => Ok(Args::None),
            JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                Ok(Args::Column(RowValues::from_json(value)))
            }
            JsonValue::Object(map) => {
                if map.keys().all(|k| BUNDLE_KEYS.contains(&k.as_str())) {
                    ConditionArgs::from_json_object(map).map(Args::Condition)
                } else {
                    Ok(Args::Row(Fields::from_json_object(map)))
                }
            }
            JsonValue::Array(items) => {
                if items.is_empty() {
                    return Err(SqlModelError::InvalidParams("empty row batch".into()));
                }
                items
                    .iter()
                    .map(|item| {
                        item.as_object().map(Fields::from_json_object).ok_or_else(|| {
                            SqlModelError::InvalidParams(format!(
                                "batch rows must be field mappings, got {item}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Args::Batch)
            }
        }
    }
}

impl From<ConditionArgs> for Args {
    fn from(args: ConditionArgs) -> Self {
        Args::Condition(args)
    }
}

impl From<Fields> for Args {
    fn from(fields: Fields) -> Self {
        Args::Row(fields)
    }
}

impl From<Vec<Fields>> for Args {
    fn from(rows: Vec<Fields>) -> Self {
        Args::Batch(rows)
    }
}

impl From<RowValues> for Args {
    fn from(value: RowValues) -> Self {
        Args::Column(value)
    }
}

impl From<i64> for Args {
    fn from(value: i64) -> Self {
        Args::Column(RowValues::Int(value))
    }
}

impl From<&str> for Args {
    fn from(value: &str) -> Self {
        Args::Column(RowValues::from(value))
    }
}

impl From<String> for Args {
    fn from(value: String) -> Self {
        Args::Column(RowValues::Text(value))
    }
}

impl From<()> for Args {
    fn from((): ()) -> Self {
        Args::None
    }
}
