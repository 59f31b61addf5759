//! Row Model - mapping engine between Rust structs and PostgreSQL tables
//!
//! This crate turns field descriptors emitted by the derive macro into table
//! schemas, renders the DDL for them, and moves rows in both directions:
//! struct to positional wire row on insert, result row to struct on select.
//! It has no database dependency of its own; storage is reached through the
//! traits in [`transport`].

pub mod marshal;
pub mod model;
pub mod naming;
pub mod registry;
pub mod scan;
pub mod schema;
pub mod transport;

pub use marshal::{marshal_rows, MarshalError};
pub use model::{FieldDef, FieldKind, Model};
pub use naming::{snake_case, upper_camel, NamingStrategy, SnakeCase};
pub use registry::{NotRegistered, Registry};
pub use scan::{scan_rows, ScanError};
pub use schema::{build_schema, ColumnDef, IndexDef, SchemaError, TableSchema};
pub use transport::{BulkSink, DdlExecutor, MemoryRows, ResultStream};
