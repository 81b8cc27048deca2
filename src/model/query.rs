use super::descriptor::CallDescriptor;
use crate::error::SqlModelError;
use crate::types::FetchShape;

/// Top-level operation keyword of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    GetAll,
    Set,
    Update,
    Delete,
    Count,
}

impl Verb {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "get" => Some(Verb::Get),
            "getall" => Some(Verb::GetAll),
            "set" => Some(Verb::Set),
            "update" => Some(Verb::Update),
            "delete" => Some(Verb::Delete),
            "count" => Some(Verb::Count),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::GetAll => "getall",
            Verb::Set => "set",
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::Count => "count",
        }
    }
}

/// Comparison used by a column-suffix WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    /// Contains-match: the bound value is wrapped as `%value%`.
    Like,
}

impl Operator {
    /// `Like` selects LIKE; any other operator segment (`By`, ...) means equality.
    #[must_use]
    pub fn from_segment(segment: Option<&str>) -> Self {
        if segment == Some("Like") {
            Operator::Like
        } else {
            Operator::Eq
        }
    }

    #[must_use]
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Like => "LIKE",
        }
    }
}

/// How the WHERE clause (and its parameters) is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Raw condition text plus caller-named parameters (`...ByCondition`).
    Condition,
    /// `WHERE <column> <op> :<column>` (`...ByEmail`, `...LikeEmail`).
    Column { name: String, operator: Operator },
}

impl Target {
    #[must_use]
    pub fn by(column: &str) -> Self {
        Target::Column {
            name: column.to_lowercase(),
            operator: Operator::Eq,
        }
    }

    #[must_use]
    pub fn like(column: &str) -> Self {
        Target::Column {
            name: column.to_lowercase(),
            operator: Operator::Like,
        }
    }

    /// Resolve a segment tail: the last segment is the column, the one before it the
    /// operator. `Condition` as last segment selects the condition form.
    fn from_tail(tail: &[String], default_column: Option<String>) -> Self {
        match tail.split_last() {
            None => default_column.map_or(Target::Condition, |name| Target::Column {
                name,
                operator: Operator::Eq,
            }),
            Some((last, _)) if last == "Condition" => Target::Condition,
            Some((last, rest)) => Target::Column {
                name: last.to_lowercase(),
                operator: Operator::from_segment(rest.last().map(String::as_str)),
            },
        }
    }
}

/// A fully resolved operation: what to run against which table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub verb: Verb,
    pub shape: Option<FetchShape>,
    pub table: String,
    pub target: Target,
    /// `set...AndGetId`: report the inserted id instead of the row count.
    pub return_id: bool,
}

fn table_segment(descriptor: &CallDescriptor, idx: usize) -> Result<String, SqlModelError> {
    let table = descriptor
        .segments()
        .get(idx)
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if table.is_empty() {
        return Err(SqlModelError::MissingTable(descriptor.name().to_string()));
    }
    Ok(table)
}

impl Query {
    #[must_use]
    pub fn new(verb: Verb, table: &str) -> Self {
        Self {
            verb,
            shape: None,
            table: table.to_string(),
            target: Target::Condition,
            return_id: false,
        }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: FetchShape) -> Self {
        self.shape = Some(shape);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn returning_id(mut self) -> Self {
        self.return_id = true;
        self
    }

    /// Resolve a parsed call name into a query.
    ///
    /// # Errors
    /// Returns `SqlModelError::InvalidFetchMode` when a `get` call does not start with a
    /// fetch shape and `SqlModelError::MissingTable` when the table segment is absent.
    pub fn from_descriptor(descriptor: &CallDescriptor) -> Result<Self, SqlModelError> {
        let segments = descriptor.segments();
        match descriptor.verb() {
            Verb::Get => {
                let shape = segments
                    .first()
                    .and_then(|s| FetchShape::from_token(s))
                    .ok_or_else(|| {
                        SqlModelError::InvalidFetchMode(format!(
                            "{} (expected one of Assoc, Objects, Unique, Column, Indexed, Grouped)",
                            descriptor.name()
                        ))
                    })?;
                let table = table_segment(descriptor, 1)?;
                let target = Target::from_tail(segments.get(2..).unwrap_or_default(), None);
                Ok(Query::new(Verb::Get, &table)
                    .with_shape(shape)
                    .with_target(target))
            }
            Verb::GetAll => Ok(Query::new(Verb::GetAll, &table_segment(descriptor, 0)?)),
            Verb::Set => {
                let table = table_segment(descriptor, 0)?;
                let tail = &segments[1..segments.len().min(4)];
                let mut query = Query::new(Verb::Set, &table);
                query.return_id = tail.concat() == "AndGetId";
                Ok(query)
            }
            verb @ (Verb::Update | Verb::Delete) => {
                let table = table_segment(descriptor, 0)?;
                let target = Target::from_tail(&segments[1..], Some(format!("{table}_id")));
                Ok(Query::new(verb, &table).with_target(target))
            }
            Verb::Count => Ok(Query::new(Verb::Count, &table_segment(descriptor, 0)?)),
        }
    }

    /// Parse and resolve a call name in one step.
    ///
    /// # Errors
    /// See [`CallDescriptor::parse`] and [`Query::from_descriptor`].
    pub fn parse(name: &str) -> Result<Self, SqlModelError> {
        Self::from_descriptor(&CallDescriptor::parse(name)?)
    }
}
