//! Transactional variant of the engine surface.
//!
//! A [`RowHausTransaction`] borrows the registry from the [`RowHaus`](crate::RowHaus)
//! that started it and runs the same schema/insert/fetch operations on a
//! single connection. Nothing is visible to other connections until
//! [`commit`](RowHausTransaction::commit); dropping the value rolls back.

use row_model::{marshal_rows, scan_rows, Model, Registry};
use sqlx::{Postgres, Transaction};
use tracing::debug;

use crate::driver;
use crate::errors::RowHausError;

pub struct RowHausTransaction<'a> {
    tx: Transaction<'a, Postgres>,
    registry: &'a Registry,
}

impl<'a> RowHausTransaction<'a> {
    pub(crate) fn new(tx: Transaction<'a, Postgres>, registry: &'a Registry) -> Self {
        RowHausTransaction { tx, registry }
    }

    /// Create the table and indexes for `T` inside this transaction.
    pub async fn ensure_table<T: Model + 'static>(&mut self) -> Result<(), RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        driver::run_ddl(&mut self.tx, &schema.create_table_sql()).await?;
        for statement in schema.create_index_sql() {
            driver::run_ddl(&mut self.tx, &statement).await?;
        }
        Ok(())
    }

    /// Bulk-insert models through COPY on the transaction's connection.
    pub async fn insert<T: Model + 'static>(&mut self, models: &[T]) -> Result<u64, RowHausError> {
        if models.is_empty() {
            return Ok(0);
        }
        let schema = self.registry.schema_of::<T>()?;
        let rows = marshal_rows(&schema, models)?;
        let written =
            driver::copy_rows(&mut self.tx, &schema.table, &schema.column_names(), rows).await?;
        debug!(table = %schema.table, rows = written, "copied rows in transaction");
        Ok(written)
    }

    /// Insert a single model through COPY on the transaction's connection.
    pub async fn insert_one<T: Model + 'static>(&mut self, model: &T) -> Result<u64, RowHausError> {
        self.insert(std::slice::from_ref(model)).await
    }

    /// Fetch every row of `T`'s table as seen by this transaction.
    pub async fn fetch_all<T: Model + 'static>(&mut self) -> Result<Vec<T>, RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        let sql = format!(
            "SELECT {} FROM {}",
            schema.column_names().join(", "),
            schema.table
        );
        self.fetch_with(&sql).await
    }

    /// Run an arbitrary query on the transaction's connection and scan the
    /// results into models.
    pub async fn fetch_with<T: Model + 'static>(
        &mut self,
        sql: &str,
    ) -> Result<Vec<T>, RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        let mut stream = driver::fetch_stream_on(&mut self.tx, sql).await?;
        let models = scan_rows(&schema, &mut stream)?;
        Ok(models)
    }

    /// Run a query on the transaction's connection and scan the first result
    /// row, if any.
    pub async fn fetch_one<T: Model + 'static>(
        &mut self,
        sql: &str,
    ) -> Result<Option<T>, RowHausError> {
        let models = self.fetch_with(sql).await?;
        Ok(models.into_iter().next())
    }

    /// Execute a statement on the transaction's connection, returning the
    /// number of rows affected.
    pub async fn execute(&mut self, sql: &str) -> Result<u64, RowHausError> {
        let result = sqlx::raw_sql(sql).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn commit(self) -> Result<(), RowHausError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), RowHausError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
