//! Convenience re-exports for common RowHaus usage
//!
//! This prelude re-exports the items most programs need, so a single use
//! statement pulls in the engine, the model macros, and the value types.
//!
//! # Example
//!
//! ```rust
//! use rowhaus::prelude::*;
//! ```

// Core engine types
pub use crate::core::RowHaus;
pub use crate::errors::RowHausError;
pub use crate::transaction::RowHausTransaction;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig};

// Model macros and the trait they implement
pub use row_derive::{model, Model};
pub use row_model::Model;

// Schema and mapping types reached for in everyday use
pub use row_model::{
    FieldDef, FieldKind, MemoryRows, NamingStrategy, Registry, ResultStream, SnakeCase,
    TableSchema,
};
pub use type_mapping::{FromPgValue, PgValue, ToPgValue};

// Re-export mapping crates for macro-generated code
pub use row_model;
pub use type_mapping;

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{PgPool, Postgres, Transaction};
