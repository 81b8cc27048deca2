mod result_set;
mod row;
pub mod shaped;

pub use result_set::ResultSet;
pub use row::Row;
pub use shaped::{Fetched, KeyedRows, Materialized};
