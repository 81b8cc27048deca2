// SQLite gateway - the connection/statement layer every model call runs through
//
// - connection: `Database`, the current statement and its buffered result
// - params: named parameters and conversion between `RowValues` and SQLite values
// - query: statement execution and result extraction
// - transaction: token-guarded begin/commit/rollback and table locks

pub mod connection;
pub mod params;
pub mod query;
pub mod transaction;

pub use connection::Database;
pub use params::NamedParams;
pub use query::build_result_set;
pub use transaction::{LockMode, TableLock, TxOutcome};
