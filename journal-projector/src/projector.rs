//! Relational projector
//!
//! Applies each completed transaction to the read model inside one database
//! transaction. A failing statement rolls the whole batch back.

use crate::config::DatabaseConfig;
use crate::dml::DataManipulation;
use crate::error::Result;
use crate::reassembly::CompletedTransaction;
use crate::schema;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Read model writer and query entry point
#[derive(Debug, Clone)]
pub struct Projector {
    pool: SqlitePool,
}

impl Projector {
    /// Open the pool and create the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout());
        if config.url.contains(":memory:") {
            // Every connection to an in-memory database is a new database
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options.connect(&config.url).await?;

        let projector = Self::from_pool(pool);
        projector.create_schema().await?;
        tracing::info!(url = %config.url, "Read model ready");
        Ok(projector)
    }

    /// Wrap an existing pool; the schema is not touched
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if missing
    pub async fn create_schema(&self) -> Result<()> {
        schema::create_schema(&self.pool).await
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply a completed transaction; returns the number of statements run
    pub async fn apply(&self, transaction: &CompletedTransaction) -> Result<usize> {
        let manipulations = transaction
            .events
            .iter()
            .map(DataManipulation::from_event)
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;
        for dml in &manipulations {
            if let Err(e) = dml.execute(&mut *tx).await {
                tracing::warn!(
                    transaction_id = %transaction.transaction_id,
                    table = dml.table(),
                    error = %e,
                    "Rolling back projection"
                );
                tx.rollback().await?;
                return Err(e);
            }
        }
        tx.commit().await?;

        tracing::debug!(
            transaction_id = %transaction.transaction_id,
            rows = manipulations.len(),
            "Transaction projected"
        );
        Ok(manipulations.len())
    }
}
