pub mod duckdb_store;
pub mod value_sql;

pub use duckdb_store::DuckDbStore;
