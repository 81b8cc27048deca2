use sql_model::prelude::*;

fn model() -> Result<Model, SqlModelError> {
    let model = Model::open_in_memory()?;
    model.execute_raw("CREATE TABLE users (users_id INTEGER PRIMARY KEY, email TEXT);")?;
    Ok(model)
}

fn email(value: &str) -> Fields {
    Fields::new().with("email", value)
}

#[test]
fn matching_token_commits() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = model()?;
    let token = Some(42);

    assert_eq!(model.begin_transaction(&[TableLock::write("users")], token)?, TxOutcome::Applied);
    assert_eq!(
        model.database().locked_tables(),
        vec![&TableLock::write("users")]
    );
    model.set("users", email("a@b.c"))?;
    assert_eq!(model.commit(token)?, TxOutcome::Applied);

    assert!(!model.database().in_transaction());
    assert!(model.database().locked_tables().is_empty());
    assert_eq!(model.get_all("users")?.len(), 1);
    Ok(())
}

#[test]
fn mismatched_token_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = model()?;
    model.begin_transaction(&[], Some(1))?;
    model.set("users", email("a@b.c"))?;

    assert_eq!(model.commit(Some(2))?, TxOutcome::Skipped);
    assert_eq!(model.rollback(None)?, TxOutcome::Skipped);
    assert!(model.database().in_transaction());

    assert_eq!(model.rollback(Some(1))?, TxOutcome::Applied);
    assert!(model.get_all("users")?.is_empty());
    Ok(())
}

#[test]
fn nested_begin_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = model()?;
    assert!(model.begin_transaction(&[TableLock::read("users")], Some(7))?.is_applied());
    // an inner unit of work trying to open its own transaction
    assert_eq!(model.begin_transaction(&[], Some(8))?, TxOutcome::Skipped);
    assert_eq!(model.commit(Some(8))?, TxOutcome::Skipped);
    assert_eq!(model.commit(Some(7))?, TxOutcome::Applied);
    Ok(())
}

#[test]
fn commit_without_transaction_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = model()?;
    assert_eq!(model.commit(None)?, TxOutcome::Skipped);
    assert_eq!(model.rollback(Some(3))?, TxOutcome::Skipped);
    Ok(())
}

#[test]
fn exclusive_lock_blocks_a_second_connection() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("locks.db").display().to_string();

    let mut owner = Model::open(DatabaseOptions::new(path.clone()))?;
    owner.execute_raw("CREATE TABLE users (users_id INTEGER PRIMARY KEY, email TEXT);")?;

    let mut other = DatabaseOptionsBuilder::new(path).busy_timeout(10).open()?;
    other.query("SELECT * FROM users")?;

    owner.begin_transaction(&[TableLock::exclusive("users")], None)?;
    let blocked = other.execute(&NamedParams::new());
    assert!(matches!(blocked, Err(SqlModelError::DriverError(_))));

    owner.rollback(None)?;
    other.execute(&NamedParams::new())?;
    assert_eq!(other.row_count()?, 0);
    Ok(())
}

#[test]
fn empty_lock_table_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = model()?;
    let err = model
        .begin_transaction(&[TableLock::write("")], None)
        .unwrap_err();
    assert!(matches!(err, SqlModelError::InvalidParams(_)));
    assert!(!model.database().in_transaction());
    Ok(())
}
