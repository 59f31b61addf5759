//! Transport traits
//!
//! The engine never talks to a database directly. Schema statements go
//! through a [`DdlExecutor`], marshaled rows through a [`BulkSink`], and
//! query results come back as a [`ResultStream`]. The sqlx-backed
//! implementations live in the top-level crate; tests substitute in-memory
//! ones.

use std::collections::VecDeque;

use async_trait::async_trait;
use type_mapping::PgValue;

/// Executes schema statements.
#[async_trait]
pub trait DdlExecutor {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn execute_ddl(&self, sql: &str) -> Result<(), Self::Error>;
}

/// Receives marshaled rows for bulk insertion.
#[async_trait]
pub trait BulkSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write `rows` into `table`, values ordered like `columns`.
    /// Returns the number of rows written.
    async fn send_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<PgValue>>,
    ) -> Result<u64, Self::Error>;
}

/// A result set the scanner can drain row by row.
pub trait ResultStream {
    /// Column names in result order.
    fn columns(&self) -> &[String];

    /// The next row, or `None` once the stream is exhausted.
    fn next_row(&mut self) -> Option<Vec<PgValue>>;
}

/// A fully buffered result set.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<PgValue>>,
}

impl MemoryRows {
    pub fn new(columns: Vec<String>) -> Self {
        MemoryRows {
            columns,
            rows: VecDeque::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<PgValue>) {
        self.rows.push_back(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ResultStream for MemoryRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Vec<PgValue>> {
        self.rows.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_rows_drain_in_insertion_order() {
        let mut rows = MemoryRows::new(vec!["n".to_string()]);
        rows.push_row(vec![PgValue::Int(1)]);
        rows.push_row(vec![PgValue::Int(2)]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.next_row(), Some(vec![PgValue::Int(1)]));
        assert_eq!(rows.next_row(), Some(vec![PgValue::Int(2)]));
        assert_eq!(rows.next_row(), None);
        assert!(rows.is_empty());
    }
}
