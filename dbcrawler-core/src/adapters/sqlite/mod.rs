//! SQLite metadata adapter.
//!
//! # Module Structure
//! - `connection`: connection string handling and the single-connection pool
//! - `metadata`: `sqlite_master` and `PRAGMA` queries for each request
//!
//! # SQLite-Specific Behavior
//! - Schemas are the attached databases (`main` plus any `ATTACH`ed ones); `temp` is skipped
//! - Check constraints and procedures are not exposed and yield no rows
//! - Trigger event and timing come from the `CREATE TRIGGER` text

pub mod connection;
mod metadata;

use super::{ConnectionConfig, MetadataConnection, MetadataRequest, MetadataRow};
use crate::Result;
use crate::models::DatabaseInfo;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub use connection::{parse_sqlite_connection_config, validate_sqlite_connection_string};

/// SQLite metadata connection.
///
/// In-memory databases exist per connection, so the pool is limited to a
/// single connection for the adapter's whole lifetime.
pub struct SqliteAdapter {
    /// Single-connection pool
    pub pool: SqlitePool,
    pub config: ConnectionConfig,
    /// Original connection string (public for test access)
    pub connection_string: String,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("config", &self.config)
            .field("is_in_memory", &self.is_in_memory())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataConnection for SqliteAdapter {
    async fn metadata(&self, request: &MetadataRequest) -> Result<Vec<MetadataRow>> {
        tracing::trace!("SQLite metadata request for {}", request.object());
        match request {
            MetadataRequest::Schemas => metadata::schemas(&self.pool).await,
            MetadataRequest::Tables { schema, types } => {
                metadata::tables(&self.pool, schema, types).await
            }
            MetadataRequest::Columns(table) => metadata::columns(&self.pool, table).await,
            MetadataRequest::Indexes(table) => metadata::indexes(&self.pool, table).await,
            MetadataRequest::ForeignKeys(table) => metadata::foreign_keys(&self.pool, table).await,
            MetadataRequest::Triggers(table) => metadata::triggers(&self.pool, table).await,
            MetadataRequest::ViewDefinitions { schema } => {
                metadata::view_definitions(&self.pool, schema).await
            }
            // Not part of the SQLite catalog
            MetadataRequest::CheckConstraints(_) | MetadataRequest::Procedures { .. } => {
                Ok(Vec::new())
            }
        }
    }

    async fn query(&self, sql: &str) -> Result<Vec<MetadataRow>> {
        metadata::raw_query(&self.pool, sql).await
    }

    async fn database_info(&self) -> Result<DatabaseInfo> {
        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| crate::error::CrawlError::query_failed("Failed to get SQLite version", e))?;

        Ok(DatabaseInfo::new("SQLite").with_version(version))
    }

    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::CrawlError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(crate::error::CrawlError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }
}
