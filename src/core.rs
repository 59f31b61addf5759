//! Core engine: connection management plus the schema/insert/fetch surface.

use std::sync::Arc;
use std::time::Duration;

use config::{AppConfig, DatabaseConfig};
use row_model::{
    marshal_rows, scan_rows, BulkSink, DdlExecutor, Model, NamingStrategy, Registry, TableSchema,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use crate::driver::{self, PgCopySink, PgDdl};
use crate::errors::RowHausError;
use crate::transaction::RowHausTransaction;

/// The main database handle.
///
/// Owns a connection pool and a model registry. Models are registered once,
/// which derives their table schema; after that the handle can create their
/// tables, bulk-insert rows, and scan query results back into struct values.
pub struct RowHaus {
    pool: PgPool,
    registry: Registry,
}

impl RowHaus {
    /// Connect to PostgreSQL using the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RowHausError> {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&config.connection_string()).await?;
        info!(database = %config.database, "connected to postgres");
        Ok(Self::from_pool(pool))
    }

    /// Connect using configuration from the environment: `ROWHAUS_CONFIG`,
    /// `./rowhaus.toml`, or `DATABASE_URL` alone.
    pub async fn connect_env() -> Result<Self, RowHausError> {
        let config = AppConfig::load()?;
        Self::connect(&config.database).await
    }

    /// Wrap an existing pool, mapping names with the default snake_case rule.
    pub fn from_pool(pool: PgPool) -> Self {
        RowHaus {
            pool,
            registry: Registry::new(),
        }
    }

    /// Wrap an existing pool with a custom naming strategy.
    pub fn with_naming(pool: PgPool, naming: Arc<dyn NamingStrategy>) -> Self {
        RowHaus {
            pool,
            registry: Registry::with_naming(naming),
        }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Derive and remember the table schema for `T`.
    pub fn register_model<T: Model + 'static>(&mut self) -> Result<Arc<TableSchema>, RowHausError> {
        let schema = self.registry.register::<T>()?;
        debug!(model = T::struct_name(), table = %schema.table, "registered model");
        Ok(schema)
    }

    /// Create the table and indexes for `T` if they do not exist.
    pub async fn ensure_table<T: Model + 'static>(&self) -> Result<(), RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        let ddl = PgDdl::new(&self.pool);
        apply_schema(&ddl, &schema).await?;
        info!(table = %schema.table, "ensured table");
        Ok(())
    }

    /// Create tables and indexes for every registered model.
    pub async fn ensure_all_tables(&self) -> Result<(), RowHausError> {
        let ddl = PgDdl::new(&self.pool);
        for schema in self.registry.schemas() {
            apply_schema(&ddl, schema).await?;
            info!(table = %schema.table, "ensured table");
        }
        Ok(())
    }

    /// Bulk-insert models through COPY. Returns the number of rows written.
    ///
    /// An empty slice is a no-op and never touches the database.
    pub async fn insert<T: Model + 'static>(&self, models: &[T]) -> Result<u64, RowHausError> {
        if models.is_empty() {
            return Ok(0);
        }
        let schema = self.registry.schema_of::<T>()?;
        let rows = marshal_rows(&schema, models)?;
        let sink = PgCopySink::new(&self.pool);
        let written = sink
            .send_rows(&schema.table, &schema.column_names(), rows)
            .await?;
        debug!(table = %schema.table, rows = written, "copied rows");
        Ok(written)
    }

    /// Insert a single model through COPY.
    pub async fn insert_one<T: Model + 'static>(&self, model: &T) -> Result<u64, RowHausError> {
        self.insert(std::slice::from_ref(model)).await
    }

    /// Fetch every row of `T`'s table.
    pub async fn fetch_all<T: Model + 'static>(&self) -> Result<Vec<T>, RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        let sql = format!(
            "SELECT {} FROM {}",
            schema.column_names().join(", "),
            schema.table
        );
        self.fetch_with(&sql).await
    }

    /// Run an arbitrary query and scan the result set into models.
    ///
    /// Result columns the model does not map are ignored; mapped columns
    /// decode into their fields by name.
    pub async fn fetch_with<T: Model + 'static>(&self, sql: &str) -> Result<Vec<T>, RowHausError> {
        let schema = self.registry.schema_of::<T>()?;
        let mut stream = driver::fetch_stream(&self.pool, sql).await?;
        let models = scan_rows(&schema, &mut stream)?;
        Ok(models)
    }

    /// Run a query and scan the first result row, if any.
    pub async fn fetch_one<T: Model + 'static>(&self, sql: &str) -> Result<Option<T>, RowHausError> {
        let models = self.fetch_with(sql).await?;
        Ok(models.into_iter().next())
    }

    /// Execute a statement, returning the number of rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64, RowHausError> {
        let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), RowHausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Start a transaction sharing this handle's registry.
    pub async fn begin(&self) -> Result<RowHausTransaction<'_>, RowHausError> {
        let tx = self.pool.begin().await?;
        Ok(RowHausTransaction::new(tx, &self.registry))
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) async fn apply_schema<E: DdlExecutor>(
    ddl: &E,
    schema: &TableSchema,
) -> Result<(), E::Error> {
    ddl.execute_ddl(&schema.create_table_sql()).await?;
    for statement in schema.create_index_sql() {
        ddl.execute_ddl(&statement).await?;
    }
    Ok(())
}
