//! Core crawling and rendering engine for DBCrawler.
//!
//! This crate inspects the structural metadata of a relational database
//! through a generic metadata-access layer, assembles it into an immutable
//! [`Catalog`], and renders catalog content as fixed-width text, CSV, or
//! HTML rows.
//!
//! # Architecture
//! - [`adapters`]: the [`MetadataConnection`] capability and the bundled
//!   SQLite/PostgreSQL implementations
//! - [`crawler`]: detail levels, query overrides, category retrievers and
//!   the [`CatalogBuilder`]
//! - [`models`]: the catalog entity graph
//! - [`render`]: format-aware cells, rows, and the [`ReportFormatter`]
//!
//! All database access is read-only and strictly sequential on a single
//! connection.

pub mod adapters;
pub mod crawler;
pub mod error;
pub mod logging;
pub mod models;
pub mod render;

// Re-export commonly used types
pub use adapters::{
    ConnectionConfig, MetadataConnection, MetadataRequest, MetadataRow, TableType, create_adapter,
};
pub use crawler::{
    CatalogBuilder, CrawlConfig, CrawlInfo, CrawlOutcome, DetailLevel, DetailPreset,
    InclusionRule, MetadataCategory, MetadataViewOverrides, TriggerTimingRules,
};
pub use error::{CrawlError, CrawlWarning, Result};
pub use logging::init_logging;
pub use models::{
    ActionTiming, Catalog, CheckConstraint, Column, ColumnReference, DatabaseInfo,
    EventManipulationType, ForeignKey, ForeignKeyColumn, Index, IndexColumn, Procedure, Schema,
    SortDirection, Table, TableKind, TableRef, Trigger,
};
pub use render::{Alignment, Cell, OutputFormat, ReportFormatter, Row};
