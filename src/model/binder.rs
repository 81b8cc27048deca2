use super::args::{Args, ConditionArgs, Fields};
use super::query::Operator;
use crate::error::SqlModelError;
use crate::sqlite::params::NamedParams;
use crate::types::RowValues;

/// Parameters for the column-suffix form.
///
/// A row that carries `column` binds every one of its fields (update by key); otherwise the
/// argument must be a scalar, bound as `:<column>` and wrapped as `%value%` for LIKE.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for anything else.
pub fn bind_column(
    column: &str,
    operator: Operator,
    arg: &Args,
) -> Result<NamedParams, SqlModelError> {
    match arg {
        Args::Row(fields) if fields.contains(column) => Ok(bind_row(fields)),
        Args::Column(value) if value.is_scalar() => {
            let value = match operator {
                Operator::Like => RowValues::Text(format!("%{}%", value.to_plain_string())),
                Operator::Eq => value.clone(),
            };
            Ok(NamedParams::new().with(column, value))
        }
        other => Err(SqlModelError::InvalidParams(format!(
            "`{column}` needs a scalar or a row containing it, got {other:?}"
        ))),
    }
}

/// Parameters for the condition form: the caller's `params`, plus `:<field>` for every
/// entry of `values`.
#[must_use]
pub fn bind_condition(args: &ConditionArgs) -> NamedParams {
    let mut params = args.params.clone().unwrap_or_default();
    for (field, value) in args.values.iter() {
        params.set(field, value.clone());
    }
    params
}

/// `:<field>` for each field of a single-row insert or update.
#[must_use]
pub fn bind_row(fields: &Fields) -> NamedParams {
    fields.iter().map(|(f, v)| (f, v.clone())).collect()
}

/// `:<field>_<index>` for every field of every row of a batch insert.
#[must_use]
pub fn bind_batch(rows: &[Fields]) -> NamedParams {
    rows.iter()
        .enumerate()
        .flat_map(|(idx, row)| {
            row.iter()
                .map(move |(f, v)| (format!("{f}_{idx}"), v.clone()))
        })
        .collect()
}
