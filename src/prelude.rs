//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so that one
//! `use sql_model::prelude::*;` is enough to open a database and issue calls.

pub use crate::config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use crate::error::SqlModelError;
pub use crate::model::{
    Args, CallDescriptor, ConditionArgs, Cursor, Fields, Model, Operator, Outcome, Query,
    Range, Selection, Target, Verb,
};
pub use crate::results::{Fetched, KeyedRows, Materialized, ResultSet, Row};
pub use crate::sqlite::{Database, LockMode, NamedParams, TableLock, TxOutcome};
pub use crate::types::{FetchShape, RowValues};
