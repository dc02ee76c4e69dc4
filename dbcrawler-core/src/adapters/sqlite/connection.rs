//! SQLite connection handling.
//!
//! # Connection Modes
//! - File-based: `sqlite:///path/to/database.db`, `sqlite://./relative.db` or a bare `*.db` path
//! - In-memory: `sqlite::memory:` or `:memory:`
//!
//! File databases are opened read-only and must already exist.

use super::{ConnectionConfig, SqliteAdapter};
use crate::Result;
use crate::error::CrawlError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use url::Url;

impl SqliteAdapter {
    /// Creates a new SQLite adapter from a connection string.
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Database file does not exist (for file-based DBs)
    /// - Database cannot be opened
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_sqlite_connection_config(connection_string)?;
        let pool = create_sqlite_connection(connection_string, &config).await?;

        Ok(Self {
            pool,
            config,
            connection_string: connection_string.to_string(),
        })
    }

    /// Creates a new SQLite adapter with custom configuration.
    ///
    /// # Errors
    /// Returns error if the configuration or connection string is invalid,
    /// or the database cannot be opened.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        validate_sqlite_connection_string(connection_string)?;
        let pool = create_sqlite_connection(connection_string, &config).await?;

        Ok(Self {
            pool,
            config,
            connection_string: connection_string.to_string(),
        })
    }

    pub fn is_in_memory(&self) -> bool {
        is_in_memory(&self.connection_string)
    }

    /// Closes the connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

/// Parses a SQLite connection string into a connection configuration.
///
/// # Errors
/// Returns error if the connection string is not a SQLite location.
pub fn parse_sqlite_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_sqlite_connection_string(connection_string)?;

    let mut config = ConnectionConfig::new("localhost".to_string())
        .with_database(extract_database_name(connection_string));
    config.port = None;

    Ok(config)
}

/// Validates SQLite connection string format.
///
/// # Errors
/// Returns error if connection string is invalid
pub fn validate_sqlite_connection_string(connection_string: &str) -> Result<()> {
    if connection_string == ":memory:" {
        return Ok(());
    }

    if connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        return Ok(());
    }

    if connection_string.starts_with("sqlite:") {
        if is_in_memory(connection_string) {
            return Ok(());
        }

        if let Ok(url) = Url::parse(connection_string) {
            if url.scheme() != "sqlite" {
                return Err(CrawlError::configuration(
                    "Connection string must use sqlite:// scheme",
                ));
            }
            return Ok(());
        }

        if connection_string.starts_with("sqlite://") {
            return Ok(());
        }
    }

    Err(CrawlError::configuration(
        "Invalid SQLite connection string format: expected sqlite:// URL, file path, or :memory:",
    ))
}

/// Database name used in logs: the file name, or `:memory:`.
fn extract_database_name(connection_string: &str) -> String {
    if is_in_memory(connection_string) {
        return ":memory:".to_string();
    }

    let path = connection_string
        .strip_prefix("sqlite://")
        .or_else(|| connection_string.strip_prefix("sqlite:"))
        .unwrap_or(connection_string);
    let path = path.split('?').next().unwrap_or(path);

    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("main")
        .to_string()
}

/// Opens the single-connection pool.
///
/// Idle and lifetime limits are disabled so an in-memory database lives as
/// long as the adapter.
async fn create_sqlite_connection(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<SqlitePool> {
    let in_memory = is_in_memory(connection_string);

    let mut options = SqliteConnectOptions::from_str(connection_string)
        .map_err(|e| {
            CrawlError::configuration(format!("Invalid SQLite connection string: {}", e))
        })?
        .read_only(config.read_only && !in_memory);
    if let Some(timeout) = config.query_timeout {
        options = options.busy_timeout(timeout);
    }

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to open SQLite database {}: {}",
                extract_database_name(connection_string),
                e
            );
            CrawlError::connection_failed(e)
        })
}
