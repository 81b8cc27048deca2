use serde::Deserialize;

use super::connection::Database;
use crate::error::SqlModelError;

/// Requested lock strength for a table taking part in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Read,
    Write,
    Exclusive,
}

/// A table to lock for the duration of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableLock {
    pub table: String,
    pub mode: LockMode,
}

impl TableLock {
    #[must_use]
    pub fn read(table: &str) -> Self {
        Self {
            table: table.to_string(),
            mode: LockMode::Read,
        }
    }

    #[must_use]
    pub fn write(table: &str) -> Self {
        Self {
            table: table.to_string(),
            mode: LockMode::Write,
        }
    }

    #[must_use]
    pub fn exclusive(table: &str) -> Self {
        Self {
            table: table.to_string(),
            mode: LockMode::Exclusive,
        }
    }
}

/// What a begin/commit/rollback call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// The statement was sent to the driver.
    Applied,
    /// Nothing happened: a transaction was already open (begin) or the token did not match
    /// the open one (commit/rollback).
    Skipped,
}

impl TxOutcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, TxOutcome::Applied)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveTransaction {
    token: Option<u64>,
    locks: Vec<TableLock>,
}

/// `SQLite` locks the whole database, so the strongest requested table lock picks the
/// `BEGIN` flavour.
fn begin_statement(locks: &[TableLock]) -> &'static str {
    if locks.iter().any(|l| l.mode == LockMode::Exclusive) {
        "BEGIN EXCLUSIVE"
    } else if locks.iter().any(|l| l.mode == LockMode::Write) {
        "BEGIN IMMEDIATE"
    } else {
        "BEGIN DEFERRED"
    }
}

impl Database {
    /// Begin a transaction, locking `locks` first.
    ///
    /// `token` is an opaque guard: only a commit or rollback carrying the same token ends
    /// this transaction. Beginning while a transaction is already open is a no-op.
    ///
    /// # Errors
    /// Returns `SqlModelError::InvalidParams` for a lock with an empty table name and
    /// `SqlModelError::DriverError` if the driver refuses to begin.
    pub fn begin_transaction(
        &mut self,
        locks: &[TableLock],
        token: Option<u64>,
    ) -> Result<TxOutcome, SqlModelError> {
        if self.transaction.is_some() {
            tracing::debug!(?token, "transaction already open; begin skipped");
            return Ok(TxOutcome::Skipped);
        }
        if let Some(lock) = locks.iter().find(|l| l.table.is_empty()) {
            return Err(SqlModelError::InvalidParams(format!(
                "lock with empty table name ({:?})",
                lock.mode
            )));
        }

        let sql = begin_statement(locks);
        tracing::debug!(sql, ?token, tables = ?locks.iter().map(|l| &l.table).collect::<Vec<_>>(), "begin transaction");
        self.conn.execute_batch(sql)?;
        self.transaction = Some(ActiveTransaction {
            token,
            locks: locks.to_vec(),
        });
        Ok(TxOutcome::Applied)
    }

    /// Commit the open transaction if `token` matches the one it was begun with.
    ///
    /// # Errors
    /// Returns `SqlModelError::DriverError` if the commit fails; the transaction stays open.
    pub fn commit(&mut self, token: Option<u64>) -> Result<TxOutcome, SqlModelError> {
        self.finish_transaction("COMMIT", token)
    }

    /// Roll back the open transaction if `token` matches the one it was begun with.
    ///
    /// # Errors
    /// Returns `SqlModelError::DriverError` if the rollback fails; the transaction stays open.
    pub fn rollback(&mut self, token: Option<u64>) -> Result<TxOutcome, SqlModelError> {
        self.finish_transaction("ROLLBACK", token)
    }

    fn finish_transaction(
        &mut self,
        sql: &'static str,
        token: Option<u64>,
    ) -> Result<TxOutcome, SqlModelError> {
        match &self.transaction {
            Some(active) if active.token == token => {}
            Some(active) => {
                tracing::debug!(sql, ?token, open = ?active.token, "token mismatch; skipped");
                return Ok(TxOutcome::Skipped);
            }
            None => {
                tracing::debug!(sql, ?token, "no open transaction; skipped");
                return Ok(TxOutcome::Skipped);
            }
        }

        self.conn.execute_batch(sql)?;
        self.unlock_tables();
        Ok(TxOutcome::Applied)
    }

    // SQLite drops its locks when the transaction ends; this only forgets them.
    fn unlock_tables(&mut self) {
        if let Some(active) = self.transaction.take()
            && !active.locks.is_empty()
        {
            tracing::debug!(tables = active.locks.len(), "tables unlocked");
        }
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Tables locked by the open transaction.
    #[must_use]
    pub fn locked_tables(&self) -> Vec<&TableLock> {
        self.transaction
            .as_ref()
            .map(|t| t.locks.iter().collect())
            .unwrap_or_default()
    }
}
