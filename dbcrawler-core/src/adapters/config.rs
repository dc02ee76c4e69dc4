//! Database connection configuration.
//!
//! # Security
//! This struct intentionally does NOT store passwords. The bundled adapters
//! take credentials from the connection URL and never keep them around.

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for a crawl.
///
/// Crawls run every query on one connection, so `max_connections` is
/// always 1.
///
/// # Example
/// ```rust
/// use dbcrawler_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(5432)
///     .with_database("mydb".to_string())
///     .with_username("admin".to_string());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: Option<u16>,
    pub database: Option<String>,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    pub connect_timeout: Duration,
    /// Statement timeout handed to the driver when one was asked for.
    /// `None` leaves the server or driver default in place.
    pub query_timeout: Option<Duration>,
    pub max_connections: u32,
    pub read_only: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            query_timeout: None,
            max_connections: 1,
            read_only: true,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{}{})",
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Username and credentials are never displayed
    }
}

impl ConnectionConfig {
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Self::default()
        }
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(CrawlError::configuration("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(CrawlError::configuration("port must be greater than 0"));
        }

        if self.max_connections != 1 {
            return Err(CrawlError::configuration(
                "max_connections must be 1: metadata queries share a single connection",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(CrawlError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(CrawlError::configuration(
                "query_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}
