//! Minimal `SQLite` access layer with statements synthesized from call names.
//!
//! [`sqlite::Database`] is the connection gateway: prepare, execute, fetch, row counts, last
//! insert id and token-guarded transactions. [`model::Model`] sits on top and turns a call
//! such as `getAssocUsersByEmail` or `updateUsersByCondition` into a parameterized
//! statement, runs it, and returns a [`model::Outcome`].
//!
//! ```rust,no_run
//! use sql_model::prelude::*;
//!
//! # fn main() -> Result<(), SqlModelError> {
//! let mut model = Model::open(DatabaseOptions::new("app.db".into()))?;
//! let n = model.call(
//!     "countUsersByCondition",
//!     ConditionArgs::new().condition("users_id > :id").param("id", 10),
//! )?;
//! println!("{:?}", n.count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod prelude;
pub mod results;
pub mod sqlite;
pub mod types;

pub use config::{DatabaseOptions, DatabaseOptionsBuilder};
pub use error::SqlModelError;
pub use model::{Args, ConditionArgs, Cursor, Fields, Model, Outcome, Query};
pub use results::{Fetched, Materialized, ResultSet, Row};
pub use sqlite::Database;
pub use types::{FetchShape, RowValues};
