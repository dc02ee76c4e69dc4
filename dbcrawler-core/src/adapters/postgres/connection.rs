//! PostgreSQL connection handling and validation.
//!
//! # Session Settings
//! Every connection the pool opens runs with a statement timeout, a
//! read-only default transaction mode and an `application_name` that
//! identifies the crawler.

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use crate::error::{CrawlError, redact_database_url};
use sqlx::PgPool;
use std::time::Duration;
use url::Url;

impl PostgresAdapter {
    /// Creates a new PostgreSQL adapter.
    ///
    /// The pool connects lazily; the first metadata request opens the
    /// connection.
    ///
    /// # Errors
    /// Returns error if the connection string is malformed or contains
    /// invalid parameters.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Creates a new PostgreSQL adapter with custom configuration.
    ///
    /// # Errors
    /// Returns error if the configuration or connection string is invalid.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Self::validate_connection_string(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Closes the connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Parses a connection URL into a connection configuration.
    ///
    /// Recognized query parameters:
    /// - `connect_timeout`: seconds, 1 to 300
    /// - `statement_timeout`: milliseconds, 1 to 300000
    ///
    /// # Errors
    /// Returns error if the URL is malformed or names an invalid port,
    /// database or user.
    pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
        Self::validate_connection_string(connection_string)?;

        let url = Url::parse(connection_string).map_err(|e| {
            CrawlError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string())
            .with_port(url.port().unwrap_or(5432));

        let database = url.path().trim_start_matches('/');
        if !database.is_empty() {
            validate_identifier("Database name", database)?;
            config = config.with_database(database.to_string());
        }

        let username = url.username();
        if !username.is_empty() {
            validate_identifier("Username", username)?;
            config = config.with_username(username.to_string());
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    if let Ok(timeout_secs) = value.parse::<u64>()
                        && timeout_secs > 0
                        && timeout_secs <= 300
                    {
                        config.connect_timeout = Duration::from_secs(timeout_secs);
                    }
                }
                "statement_timeout" => {
                    if let Ok(timeout_ms) = value.parse::<u64>()
                        && timeout_ms > 0
                        && timeout_ms <= 300_000
                    {
                        config.query_timeout = Some(Duration::from_millis(timeout_ms));
                    }
                }
                _ => {}
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Validates connection string format.
    ///
    /// # Errors
    /// Returns error if the scheme is not `postgres`/`postgresql`, the host
    /// is missing, or `statement_timeout` exceeds 300 seconds.
    pub fn validate_connection_string(connection_string: &str) -> Result<()> {
        let url = Url::parse(connection_string).map_err(|e| {
            CrawlError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(CrawlError::configuration(
                "Connection string must use postgres:// or postgresql:// scheme",
            ));
        }

        if url.host_str().is_none() {
            return Err(CrawlError::configuration(
                "Connection string must specify a host",
            ));
        }

        for (key, value) in url.query_pairs() {
            if key == "statement_timeout"
                && let Ok(timeout_ms) = value.parse::<u64>()
                && timeout_ms > 300_000
            {
                return Err(CrawlError::configuration(
                    "statement_timeout should not exceed 300 seconds",
                ));
            }
        }

        Ok(())
    }

    /// Creates the single-connection pool with session settings applied on connect.
    pub(crate) fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        Self::validate_connection_string(connection_string)?;

        let query_timeout_ms = config.query_timeout.map(|timeout| timeout.as_millis());
        let read_only = config.read_only;

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(timeout_ms) = query_timeout_ms {
                        conn.execute(
                            format!("SET statement_timeout = '{}ms'", timeout_ms).as_str(),
                        )
                        .await?;
                    }

                    let app_name = format!("dbcrawler-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;

                    if read_only {
                        conn.execute("SET default_transaction_read_only = on")
                            .await?;
                    }

                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| {
                tracing::error!(
                    "Failed to create PostgreSQL connection pool to {}",
                    redact_database_url(connection_string)
                );
                CrawlError::connection_failed(e)
            })
    }
}

/// Checks a database or role name against PostgreSQL identifier rules.
fn validate_identifier(what: &str, value: &str) -> Result<()> {
    if value.len() > 63 {
        return Err(CrawlError::configuration(format!(
            "{} too long: maximum 63 characters",
            what
        )));
    }

    let starts_well = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_well {
        return Err(CrawlError::configuration(format!(
            "{} must start with a letter or underscore",
            what
        )));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(CrawlError::configuration(format!(
            "{} contains invalid characters (only letters, digits, underscores, and dollar signs allowed)",
            what
        )));
    }

    Ok(())
}
