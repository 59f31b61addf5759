//! # RowHaus
//!
//! A small PostgreSQL mapping layer: derives table schemas from plain Rust
//! structs, creates the tables, bulk-inserts through COPY, and scans query
//! results back into struct values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowhaus::prelude::*;
//!
//! #[model]
//! pub struct Member {
//!     #[primary_key]
//!     pub id: i64,
//!
//!     #[index]
//!     pub name: String,
//!
//!     #[unique]
//!     pub email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "rowhaus".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let mut haus = RowHaus::connect(&config).await?;
//!     haus.register_model::<Member>()?;
//!     haus.ensure_table::<Member>().await?;
//!
//!     let members = vec![
//!         Member { id: 1, name: "Ada".to_string(), email: "ada@example.com".to_string() },
//!         Member { id: 2, name: "Grace".to_string(), email: "grace@example.com".to_string() },
//!     ];
//!     let written = haus.insert(&members).await?;
//!     println!("inserted {written} rows");
//!
//!     let back: Vec<Member> = haus.fetch_all().await?;
//!     println!("loaded {} members", back.len());
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod driver;
pub mod errors;
pub mod prelude;
pub mod transaction;

// Re-export the main public types for convenience
pub use core::RowHaus;
pub use errors::RowHausError;
pub use transaction::RowHausTransaction;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use row_model;
pub use type_mapping;

// Derive macro and trait share the `Model` name on purpose; a single
// `use rowhaus::Model` picks up both.
pub use row_derive::{model, Model};
pub use row_model::Model;

// Re-export external dependencies used in public API
pub use sqlx;
pub use async_trait;
