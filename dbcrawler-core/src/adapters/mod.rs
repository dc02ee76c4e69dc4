//! Metadata access layer.
//!
//! [`MetadataConnection`] is the single capability the crawler needs from a
//! database: answer generic metadata requests, run raw override SQL, and
//! describe the product. Rows come back as ordered `(field, value)` pairs
//! named after the usual driver metadata columns (`TABLE_SCHEM`,
//! `TABLE_NAME`, `COLUMN_NAME`, ...).
//!
//! # Module Structure
//! - `config`: connection settings shared by the bundled adapters
//! - `sqlite`, `postgres`: feature-gated implementations

use crate::crawler::MetadataCategory;
use crate::error::CrawlError;
use crate::models::{DatabaseInfo, TableRef};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod config;

pub use config::ConnectionConfig;

/// Table kinds a crawl can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    Table,
    View,
}

impl TableType {
    /// Metadata spelling, `TABLE` or `VIEW`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
        }
    }

    /// Classifies a reported `TABLE_TYPE` value.
    ///
    /// Anything containing `VIEW` is a view; `TABLE` and `BASE TABLE` are
    /// tables. Other kinds (sequences, synonyms, system tables) are `None`.
    pub fn from_metadata(text: &str) -> Option<Self> {
        let upper = text.trim().to_ascii_uppercase();
        if upper.contains("VIEW") {
            Some(Self::View)
        } else if upper == "TABLE" || upper == "BASE TABLE" {
            Some(Self::Table)
        } else {
            None
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableType {
    type Err = CrawlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            other => Err(CrawlError::configuration(format!(
                "Unknown table type '{}': expected table or view",
                other
            ))),
        }
    }
}

/// A generic metadata request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataRequest {
    Schemas,
    Tables {
        schema: String,
        types: Vec<TableType>,
    },
    Columns(TableRef),
    Indexes(TableRef),
    ForeignKeys(TableRef),
    CheckConstraints(TableRef),
    Triggers(TableRef),
    Procedures {
        schema: String,
    },
    ViewDefinitions {
        schema: String,
    },
}

impl MetadataRequest {
    /// Per-table request for `category`, if the category is retrieved per table.
    pub fn for_table(category: MetadataCategory, table: TableRef) -> Option<Self> {
        match category {
            MetadataCategory::Columns => Some(Self::Columns(table)),
            MetadataCategory::Indexes => Some(Self::Indexes(table)),
            MetadataCategory::ForeignKeys => Some(Self::ForeignKeys(table)),
            MetadataCategory::CheckConstraints => Some(Self::CheckConstraints(table)),
            MetadataCategory::Triggers => Some(Self::Triggers(table)),
            _ => None,
        }
    }

    /// The category this request serves; `None` for the schema list.
    pub fn category(&self) -> Option<MetadataCategory> {
        match self {
            Self::Schemas => None,
            Self::Tables { .. } => Some(MetadataCategory::Tables),
            Self::Columns(_) => Some(MetadataCategory::Columns),
            Self::Indexes(_) => Some(MetadataCategory::Indexes),
            Self::ForeignKeys(_) => Some(MetadataCategory::ForeignKeys),
            Self::CheckConstraints(_) => Some(MetadataCategory::CheckConstraints),
            Self::Triggers(_) => Some(MetadataCategory::Triggers),
            Self::Procedures { .. } => Some(MetadataCategory::Procedures),
            Self::ViewDefinitions { .. } => Some(MetadataCategory::ViewDefinitions),
        }
    }

    /// Full name of the object the request is about.
    pub fn object(&self) -> String {
        match self {
            Self::Schemas => "database".to_string(),
            Self::Tables { schema, .. }
            | Self::Procedures { schema }
            | Self::ViewDefinitions { schema } => schema.clone(),
            Self::Columns(table)
            | Self::Indexes(table)
            | Self::ForeignKeys(table)
            | Self::CheckConstraints(table)
            | Self::Triggers(table) => table.to_string(),
        }
    }
}

/// One result row: ordered, named, nullable text fields.
///
/// Field lookup ignores ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    fields: Vec<(String, Option<String>)>,
}

impl MetadataRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method appending a non-null field.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, Some(value.into()));
        self
    }

    /// Builder method appending a null field.
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.push(name, None);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.push((name.into(), value));
    }

    /// Value of the first field named `name`; `None` if absent or null.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Value of the first of `names` that is present and non-null.
    pub fn get_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// True if a field named `name` exists, even with a null value.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|(field, _)| field.eq_ignore_ascii_case(name))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Option<String>)> for MetadataRow {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Read-only access to a database's structural metadata.
///
/// Implementations own exactly one connection. The crawler awaits every
/// call before issuing the next, so implementations never see concurrent
/// requests from one crawl.
#[async_trait]
pub trait MetadataConnection: Send + Sync {
    /// Answers a generic metadata request.
    ///
    /// # Errors
    /// Returns an error if the underlying query fails or the request is
    /// not supported by this database.
    async fn metadata(&self, request: &MetadataRequest) -> Result<Vec<MetadataRow>>;

    /// Runs raw SQL, typically an override query, and returns every row.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    async fn query(&self, sql: &str) -> Result<Vec<MetadataRow>>;

    /// Database product name and version.
    ///
    /// # Errors
    /// Returns an error if the version query fails.
    async fn database_info(&self) -> Result<DatabaseInfo>;

    /// Checks connectivity without reading metadata.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    async fn test_connection(&self) -> Result<()>;
}

/// Database families with a bundled adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// Creates a metadata connection for a connection URL.
///
/// # Errors
/// Returns error if:
/// - The URL format is not recognized
/// - Support for the database was not compiled in
/// - The connection cannot be established
pub async fn create_adapter(connection_string: &str) -> Result<Box<dyn MetadataConnection>> {
    let database_type = detect_database_type(connection_string)?;

    match database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => {
            let adapter = postgres::PostgresAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(CrawlError::unsupported_feature(
            "PostgreSQL adapter",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            let adapter = sqlite::SqliteAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => Err(CrawlError::unsupported_feature(
            "SQLite adapter",
            "Compile with --features sqlite to enable SQLite support",
        )),
    }
}

/// Detects database type from connection string.
///
/// # Errors
/// Returns error if connection string format is unrecognized
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    if connection_string.starts_with("postgres://")
        || connection_string.starts_with("postgresql://")
    {
        Ok(DatabaseType::PostgreSQL)
    } else if connection_string.starts_with("sqlite:")
        || connection_string == ":memory:"
        || connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        Ok(DatabaseType::SQLite)
    } else {
        Err(CrawlError::configuration(
            "Unrecognized database connection string format",
        ))
    }
}

// Database-specific adapter modules
#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;
