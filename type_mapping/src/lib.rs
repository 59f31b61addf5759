//! Unified type mapping between Rust types and PostgreSQL
//! This crate provides the column-type table and the runtime value
//! conversions used across the rowhaus ecosystem

pub mod sql;
pub mod types;

pub use sql::{pg_column_type, UnsupportedType};
pub use types::{FromPgValue, PgDefault, PgValue, ToPgValue, ValueError};
