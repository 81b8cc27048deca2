use std::process::Command;

use serde_json::json;
use sql_model::prelude::*;

const SCHEMA: &str = "
    CREATE TABLE users (
        users_id INTEGER PRIMARY KEY,
        salt TEXT,
        user_name TEXT,
        email TEXT
    );
    INSERT INTO users (salt, user_name, email) VALUES
        ('s1', 'Kris', 'kris_ro@some-non-domain.com'),
        ('s2', 'Ana', 'ana@example.org');
";

fn call(model: &mut Model, name: &str, args: serde_json::Value) -> Result<Outcome, SqlModelError> {
    model.call(name, Args::from_json(&args)?)
}

#[test]
fn untyped_bundles_resolve_per_operation() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = Model::open_in_memory()?;
    model.execute_raw(SCHEMA)?;

    let rows = call(
        &mut model,
        "getObjectsUsersByCondition",
        json!({"select": "salt, user_name", "condition": "`users_id` < :id", "params": {":id": 20}}),
    )?
    .into_json()?;
    assert_eq!(rows, json!([
        {"salt": "s1", "user_name": "Kris"},
        {"salt": "s2", "user_name": "Ana"}
    ]));

    let id = call(
        &mut model,
        "setUsersAndGetId",
        json!({"salt": "s3", "user_name": "Bob", "email": "bob@example.org"}),
    )?;
    assert_eq!(id.id(), Some(3));

    let batch = call(
        &mut model,
        "setUsers",
        json!([{"salt": "s4", "user_name": "C", "email": "c@x"}, {"salt": "s5", "user_name": "D", "email": "d@x"}]),
    )?;
    assert_eq!(batch.count(), Some(2));

    let updated = call(
        &mut model,
        "updateUsersByCondition",
        json!({"condition": "`users_id` = :id", "params": {":id": 1}, "values": {"email": "k@x"}}),
    )?;
    assert_eq!(updated.count(), Some(1));

    let updated = call(&mut model, "updateUsers", json!({"users_id": 2, "user_name": "Anna"}))?;
    assert_eq!(updated.count(), Some(1));

    let deleted = call(&mut model, "deleteUsers", json!(5))?;
    assert_eq!(deleted.count(), Some(1));

    let indexed = call(
        &mut model,
        "getIndexedUsersByCondition",
        json!({"select": ["users_id", "user_name"], "order": "users_id ASC", "range": [0, 2]}),
    )?
    .into_json()?;
    assert_eq!(indexed, json!({"1": "Kris", "2": "Anna"}));

    let count = call(&mut model, "countUsersByCondition", json!(null))?;
    assert_eq!(count.count(), Some(4));
    Ok(())
}

#[test]
fn empty_object_means_no_condition() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = Model::open_in_memory()?;
    model.execute_raw(SCHEMA)?;

    let count = call(&mut model, "countUsersByCondition", json!({}))?;
    assert_eq!(count.count(), Some(2));

    let rows = call(&mut model, "getAssocUsersByCondition", json!({}))?.into_json()?;
    assert_eq!(rows.as_array().map(Vec::len), Some(2));

    let deleted = call(&mut model, "deleteUsersByCondition", json!({}))?;
    assert_eq!(deleted.count(), Some(2));
    Ok(())
}

#[test]
fn empty_batch_is_invalid() {
    let err = Args::from_json(&json!([])).unwrap_err();
    assert!(matches!(err, SqlModelError::InvalidParams(_)));
}

#[test]
fn cli_prints_the_outcome_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let init = dir.path().join("schema.sql");
    std::fs::write(&init, SCHEMA)?;

    let output = Command::new(env!("CARGO_BIN_EXE_sql-model"))
        .arg("--init")
        .arg(&init)
        .arg("getAssocUsersLikeEmail")
        .arg("--args")
        .arg(r#""example""#)
        .output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let printed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(printed[0]["user_name"], "Ana");
    assert_eq!(printed.as_array().map(Vec::len), Some(1));

    let output = Command::new(env!("CARGO_BIN_EXE_sql-model"))
        .arg("getUsers")
        .output()?;
    assert!(!output.status.success());
    Ok(())
}
