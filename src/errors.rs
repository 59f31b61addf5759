//! Error types for the RowHaus crate
//!
//! This module contains all error types that can be returned by RowHaus
//! operations.

use row_model::{MarshalError, NotRegistered, ScanError, SchemaError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowHausError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    NotRegistered(#[from] NotRegistered),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
