//! PostgreSQL metadata adapter.
//!
//! # Module Structure
//! - `connection`: connection string validation and the single-connection pool
//! - `metadata`: `information_schema` and `pg_catalog` queries for each request
//!
//! # Guarantees
//! - Sessions run with `default_transaction_read_only` and a statement timeout
//! - Connection strings are redacted before they are logged

mod connection;
mod metadata;

use super::{ConnectionConfig, MetadataConnection, MetadataRequest, MetadataRow};
use crate::Result;
use crate::error::CrawlError;
use crate::models::DatabaseInfo;
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL metadata connection.
pub struct PostgresAdapter {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[async_trait]
impl MetadataConnection for PostgresAdapter {
    async fn metadata(&self, request: &MetadataRequest) -> Result<Vec<MetadataRow>> {
        tracing::trace!("PostgreSQL metadata request for {}", request.object());
        match request {
            MetadataRequest::Schemas => metadata::schemas(&self.pool).await,
            MetadataRequest::Tables { schema, types } => {
                metadata::tables(&self.pool, schema, types).await
            }
            MetadataRequest::Columns(table) => metadata::columns(&self.pool, table).await,
            MetadataRequest::Indexes(table) => metadata::indexes(&self.pool, table).await,
            MetadataRequest::ForeignKeys(table) => metadata::foreign_keys(&self.pool, table).await,
            MetadataRequest::CheckConstraints(table) => {
                metadata::check_constraints(&self.pool, table).await
            }
            MetadataRequest::Triggers(table) => metadata::triggers(&self.pool, table).await,
            MetadataRequest::Procedures { schema } => {
                metadata::procedures(&self.pool, schema).await
            }
            MetadataRequest::ViewDefinitions { schema } => {
                metadata::view_definitions(&self.pool, schema).await
            }
        }
    }

    async fn query(&self, sql: &str) -> Result<Vec<MetadataRow>> {
        metadata::raw_query(&self.pool, sql).await
    }

    async fn database_info(&self) -> Result<DatabaseInfo> {
        let version: String = sqlx::query_scalar("SHOW server_version")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CrawlError::query_failed("Failed to get PostgreSQL version", e))?;

        Ok(DatabaseInfo::new("PostgreSQL").with_version(version))
    }

    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(CrawlError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(CrawlError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }
}
