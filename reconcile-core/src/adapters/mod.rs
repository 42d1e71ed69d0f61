//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the MovementStore port
//! - An in-memory MovementStore for tests and dry runs
//! - CSV and spreadsheet readers feeding raw rows to the import service

pub mod duckdb;
pub mod memory;
pub mod table_file;
