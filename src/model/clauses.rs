//! SQL text for the statements the dispatcher runs.
//!
//! Every identifier that comes from a call name or a field list is backtick-quoted.
//! Raw fragments (`select`, `join`, `condition`, `group`) are trusted and inserted verbatim;
//! raw order-by and range literals are pattern-checked and dropped with a warning when they
//! do not match.

use std::sync::LazyLock;

use regex::Regex;

use super::args::{ConditionArgs, Fields, Range, Selection};
use super::query::Target;
use crate::error::SqlModelError;

static ORDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(,? ?`?[a-z0-9_]+`?(\.`?[a-z0-9_]+`?)? (asc|desc))+$")
        .expect("order pattern compiles")
});

static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+,[0-9]+$").expect("range pattern compiles"));

// SQLite named parameters end at the first non-word character
static PLACEHOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("placeholder pattern compiles"));

/// Quote an identifier with backticks, doubling embedded backticks.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for an empty name or one containing NUL.
pub fn quote_ident(name: &str) -> Result<String, SqlModelError> {
    if name.is_empty() || name.contains('\0') {
        return Err(SqlModelError::InvalidParams(format!(
            "invalid identifier {name:?}"
        )));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

fn placeholder_field(field: &str) -> Result<&str, SqlModelError> {
    if PLACEHOLDER_NAME.is_match(field) {
        Ok(field)
    } else {
        Err(SqlModelError::InvalidParams(format!(
            "field {field:?} cannot be used as a placeholder name"
        )))
    }
}

fn quoted_list(names: &[String]) -> Result<String, SqlModelError> {
    if names.is_empty() {
        return Err(SqlModelError::InvalidParams("empty column list".into()));
    }
    let quoted = names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join(", "))
}

pub(crate) fn select_list(select: Option<&Selection>) -> Result<String, SqlModelError> {
    match select {
        None => Ok("*".to_string()),
        Some(Selection::Columns(names)) => quoted_list(names),
        Some(Selection::Raw(raw)) => Ok(raw.clone()),
    }
}

/// WHERE clause for `target`. The condition form without condition text has none.
pub(crate) fn where_clause(
    target: &Target,
    condition: Option<&str>,
) -> Result<Option<String>, SqlModelError> {
    match target {
        Target::Column { name, operator } => Ok(Some(format!(
            "WHERE {} {} :{}",
            quote_ident(name)?,
            operator.sql(),
            placeholder_field(name)?
        ))),
        Target::Condition => Ok(condition
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("WHERE {c}"))),
    }
}

pub(crate) fn group_by(group: Option<&Selection>) -> Result<Option<String>, SqlModelError> {
    match group {
        None => Ok(None),
        Some(Selection::Columns(names)) => Ok(Some(format!("GROUP BY {}", quoted_list(names)?))),
        Some(Selection::Raw(raw)) => Ok(Some(format!("GROUP BY {raw}"))),
    }
}

pub(crate) fn order_by(order: Option<&Selection>) -> Result<Option<String>, SqlModelError> {
    match order {
        None => Ok(None),
        Some(Selection::Columns(names)) => Ok(Some(format!("ORDER BY {}", quoted_list(names)?))),
        Some(Selection::Raw(raw)) if ORDER_PATTERN.is_match(raw) => {
            Ok(Some(format!("ORDER BY {raw}")))
        }
        Some(Selection::Raw(raw)) => {
            tracing::warn!(order = %raw, "order-by literal dropped");
            Ok(None)
        }
    }
}

pub(crate) fn limit(range: Option<&Range>) -> Option<String> {
    match range? {
        Range::Window { offset, count } => Some(format!("LIMIT {offset}, {count}")),
        Range::Raw(raw) if RANGE_PATTERN.is_match(raw) => Some(format!("LIMIT {raw}")),
        Range::Raw(raw) => {
            tracing::warn!(range = %raw, "range literal dropped");
            None
        }
    }
}

fn assemble(parts: impl IntoIterator<Item = Option<String>>) -> String {
    parts.into_iter().flatten().collect::<Vec<_>>().join(" ")
}

/// `SELECT` used by `get` and `count`.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for unusable identifiers.
pub fn select_statement(
    table: &str,
    target: &Target,
    args: &ConditionArgs,
) -> Result<String, SqlModelError> {
    Ok(assemble([
        Some(format!(
            "SELECT {} FROM {}",
            select_list(args.select.as_ref())?,
            quote_ident(table)?
        )),
        args.join.as_deref().map(str::trim).filter(|j| !j.is_empty()).map(str::to_string),
        where_clause(target, args.condition.as_deref())?,
        group_by(args.group.as_ref())?,
        order_by(args.order.as_ref())?,
        limit(args.range.as_ref()),
    ]))
}

/// Single-row `INSERT`, one `:<field>` placeholder per field.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for an empty row or unusable field names.
pub fn insert_statement(table: &str, row: &Fields) -> Result<String, SqlModelError> {
    if row.is_empty() {
        return Err(SqlModelError::InvalidParams(format!("nothing to insert into {table}")));
    }
    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());
    for field in row.names() {
        columns.push(quote_ident(field)?);
        placeholders.push(format!(":{}", placeholder_field(field)?));
    }
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table)?,
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// Multi-row `INSERT`. Columns come from the first row; row `i` binds `:<field>_<i>`.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for an empty batch or a row whose fields differ
/// from the first row's.
pub fn batch_insert_statement(table: &str, rows: &[Fields]) -> Result<String, SqlModelError> {
    let Some(first) = rows.first() else {
        return Err(SqlModelError::InvalidParams(format!("empty batch for {table}")));
    };
    if first.is_empty() {
        return Err(SqlModelError::InvalidParams(format!("nothing to insert into {table}")));
    }

    let fields: Vec<&str> = first.names().collect();
    let columns = fields
        .iter()
        .map(|f| quote_ident(f))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tuples = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != fields.len() || !fields.iter().all(|f| row.contains(f)) {
            return Err(SqlModelError::InvalidParams(format!(
                "batch row {idx} does not have the fields of the first row"
            )));
        }
        let placeholders = fields
            .iter()
            .map(|f| placeholder_field(f).map(|f| format!(":{f}_{idx}")))
            .collect::<Result<Vec<_>, _>>()?;
        tuples.push(format!("({})", placeholders.join(", ")));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table)?,
        columns.join(", "),
        tuples.join(", ")
    ))
}

/// `UPDATE ... SET`. The target column is never part of the SET list.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` when nothing is left to set.
pub fn update_statement(
    table: &str,
    target: &Target,
    values: &Fields,
    condition: Option<&str>,
) -> Result<String, SqlModelError> {
    let key = match target {
        Target::Column { name, .. } => Some(name.as_str()),
        Target::Condition => None,
    };
    let assignments = values
        .names()
        .filter(|field| Some(*field) != key)
        .map(|field| -> Result<String, SqlModelError> {
            Ok(format!("{} = :{}", quote_ident(field)?, placeholder_field(field)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if assignments.is_empty() {
        return Err(SqlModelError::InvalidParams(format!("no fields to update in {table}")));
    }

    Ok(assemble([
        Some(format!("UPDATE {} SET {}", quote_ident(table)?, assignments.join(", "))),
        where_clause(target, condition)?,
    ]))
}

/// `DELETE FROM`; the condition form without condition text deletes every row.
///
/// # Errors
/// Returns `SqlModelError::InvalidParams` for unusable identifiers.
pub fn delete_statement(
    table: &str,
    target: &Target,
    condition: Option<&str>,
) -> Result<String, SqlModelError> {
    Ok(assemble([
        Some(format!("DELETE FROM {}", quote_ident(table)?)),
        where_clause(target, condition)?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes_identifiers() {
        assert_eq!(quote_ident("users").unwrap(), "`users`");
        assert_eq!(quote_ident("we`ird").unwrap(), "`we``ird`");
        assert!(quote_ident("").is_err());
    }

    #[test]
    fn select_by_column_and_like() {
        let sql = select_statement("users", &Target::by("email"), &ConditionArgs::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE `email` = :email");

        let sql = select_statement("users", &Target::like("email"), &ConditionArgs::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM `users` WHERE `email` LIKE :email");
    }

    #[test]
    fn select_with_every_clause() {
        let args = ConditionArgs::new()
            .select_columns(["user_name", "email"])
            .join("JOIN posts ON posts.users_id = users.users_id")
            .condition("users.users_id < :id")
            .group_columns(["user_name"])
            .order_raw("user_name ASC, users.email desc")
            .range(10, 5);
        let sql = select_statement("users", &Target::Condition, &args).unwrap();
        assert_eq!(
            sql,
            "SELECT `user_name`, `email` FROM `users` \
             JOIN posts ON posts.users_id = users.users_id \
             WHERE users.users_id < :id GROUP BY `user_name` \
             ORDER BY user_name ASC, users.email desc LIMIT 10, 5"
        );
    }

    #[test]
    fn condition_form_without_condition_has_no_where() {
        let sql = select_statement("users", &Target::Condition, &ConditionArgs::new()).unwrap();
        assert_eq!(sql, "SELECT * FROM `users`");
        let blank = ConditionArgs::new().condition("  ");
        let sql = delete_statement("users", &Target::Condition, blank.condition.as_deref()).unwrap();
        assert_eq!(sql, "DELETE FROM `users`");
    }

    #[test]
    fn bad_order_and_range_literals_are_dropped() {
        let args = ConditionArgs::new()
            .order_raw("1; DROP TABLE x")
            .range_raw("abc");
        let sql = select_statement("users", &Target::Condition, &args).unwrap();
        assert_eq!(sql, "SELECT * FROM `users`");

        let args = ConditionArgs::new().order_raw("`email` DESC").range_raw("0,3");
        let sql = select_statement("users", &Target::Condition, &args).unwrap();
        assert_eq!(sql, "SELECT * FROM `users` ORDER BY `email` DESC LIMIT 0,3");
    }

    #[test]
    fn order_needs_a_direction() {
        assert!(order_by(Some(&Selection::raw("email"))).unwrap().is_none());
        assert!(order_by(Some(&Selection::raw("email asc,"))).unwrap().is_none());
    }

    #[test]
    fn insert_and_batch_insert() {
        let row = Fields::new().with("email", "a@b.c").with("salt", "x");
        assert_eq!(
            insert_statement("users", &row).unwrap(),
            "INSERT INTO `users` (`email`, `salt`) VALUES (:email, :salt)"
        );

        let rows = vec![row.clone(), Fields::new().with("salt", "y").with("email", "d@e.f")];
        assert_eq!(
            batch_insert_statement("users", &rows).unwrap(),
            "INSERT INTO `users` (`email`, `salt`) VALUES (:email_0, :salt_0), (:email_1, :salt_1)"
        );

        let ragged = vec![row, Fields::new().with("email", "only")];
        assert!(matches!(
            batch_insert_statement("users", &ragged),
            Err(SqlModelError::InvalidParams(_))
        ));
    }

    #[test]
    fn update_skips_the_key_column() {
        let values = Fields::new().with("users_id", 3).with("email", "new@b.c");
        assert_eq!(
            update_statement("users", &Target::by("users_id"), &values, None).unwrap(),
            "UPDATE `users` SET `email` = :email WHERE `users_id` = :users_id"
        );

        let only_key = Fields::new().with("users_id", 3);
        assert!(update_statement("users", &Target::by("users_id"), &only_key, None).is_err());
    }

    #[test]
    fn field_names_must_be_placeholder_safe() {
        let row = Fields::new().with("bad name", 1);
        assert!(matches!(
            insert_statement("users", &row),
            Err(SqlModelError::InvalidParams(_))
        ));
    }
}
