//! Tiered catalog crawling.
//!
//! [`CatalogBuilder`] drives one crawl: it validates the [`CrawlConfig`],
//! asks the category retrievers for rows in the order the
//! [`DetailLevel`] allows, maps rows to entities and links foreign keys
//! across schemas once every table exists.
//!
//! # Failure Policy
//! - Configuration errors abort before any query runs
//! - Failing to read the schema list aborts the crawl
//! - Any other failure empties one category of one object and becomes a
//!   [`CrawlWarning`]
//!
//! # Example
//! ```rust,no_run
//! use dbcrawler_core::{CatalogBuilder, CrawlConfig, DetailLevel, create_adapter};
//!
//! # async fn example() -> dbcrawler_core::Result<()> {
//! let connection = create_adapter("sqlite://inventory.db").await?;
//! let config = CrawlConfig::new().with_detail_level(DetailLevel::maximum());
//! let outcome = CatalogBuilder::new(connection.as_ref(), config).crawl().await?;
//!
//! for table in outcome.catalog.tables() {
//!     println!("{} ({} columns)", table.full_name(), table.columns.len());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod detail;
mod mapping;
mod overrides;
mod retrievers;
mod timing;

pub use config::{CrawlConfig, InclusionRule, InclusionRuleSpec};
pub use detail::{DetailLevel, DetailPreset, MetadataCategory};
pub use overrides::MetadataViewOverrides;
pub use timing::{TimingRuleSpec, TriggerTimingRules};

use crate::Result;
use crate::adapters::{MetadataConnection, TableType};
use crate::error::{CrawlError, CrawlWarning};
use crate::models::{Catalog, ColumnReference, DatabaseInfo, Schema, Table, TableKind, TableRef};
use chrono::{DateTime, Utc};
use retrievers::Retriever;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Facts about a crawl run, kept apart from the catalog so that
/// catalogs of the same database compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlInfo {
    pub crawled_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub crawler_version: String,
}

/// Result of a crawl: the catalog plus every non-fatal failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub catalog: Catalog,
    pub warnings: Vec<CrawlWarning>,
    pub info: CrawlInfo,
}

impl CrawlOutcome {
    /// True when every requested category was retrieved for every object.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Builds one [`Catalog`] per call to [`crawl`](Self::crawl).
///
/// Every query is awaited before the next one is issued; the connection
/// never sees concurrent statements.
pub struct CatalogBuilder<'a> {
    connection: &'a dyn MetadataConnection,
    config: CrawlConfig,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(connection: &'a dyn MetadataConnection, config: CrawlConfig) -> Self {
        Self { connection, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls the database.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid [`CrawlConfig`] and a
    /// connection error when the schema list cannot be retrieved. All other
    /// failures are reported as warnings in the outcome.
    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        self.config.validate()?;

        let crawled_at = Utc::now();
        let start_time = Instant::now();
        let mut warnings = Vec::new();

        tracing::info!(
            "Starting catalog crawl at detail level {}",
            self.config.detail_level
        );

        let database_info = match self.connection.database_info().await {
            Ok(info) => {
                tracing::debug!(
                    "Connected to {} {}",
                    info.product_name,
                    info.product_version.as_deref().unwrap_or("")
                );
                info
            }
            Err(e) => {
                let warning = CrawlWarning::new(
                    None,
                    "database",
                    format!("Failed to read database product information: {}", e),
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
                DatabaseInfo::default()
            }
        };

        let mut retriever = Retriever::new(self.connection, &self.config.overrides);

        let schema_rows = match retriever.schemas().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to retrieve schemas: {}", e);
                return Err(e);
            }
        };
        let schema_names: Vec<String> = mapping::schema_names(&schema_rows)
            .into_iter()
            .filter(|name| self.config.schema_rule.matches(name))
            .collect();
        tracing::info!("Found {} schemas to crawl", schema_names.len());

        let mut schemas = Vec::with_capacity(schema_names.len());
        for name in &schema_names {
            schemas.push(
                self.crawl_schema(&mut retriever, name, &mut warnings)
                    .await,
            );
        }

        let schemas = if self.config.retrieves(MetadataCategory::ForeignKeys) {
            link_foreign_keys(schemas, &mut warnings)
        } else {
            schemas
        };

        let catalog = Catalog {
            database_info,
            schemas,
        };

        let duration = start_time.elapsed();
        tracing::info!(
            "Catalog crawl completed in {:.2}s - found {} schemas, {} tables, {} procedures, {} warnings",
            duration.as_secs_f64(),
            catalog.schemas.len(),
            catalog.tables().count(),
            catalog.procedures().count(),
            warnings.len()
        );

        Ok(CrawlOutcome {
            catalog,
            warnings,
            info: CrawlInfo {
                crawled_at,
                duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    async fn crawl_schema(
        &self,
        retriever: &mut Retriever<'_>,
        name: &str,
        warnings: &mut Vec<CrawlWarning>,
    ) -> Schema {
        tracing::debug!("Crawling schema {}", name);
        let mut schema = Schema::new(name);

        if self.config.retrieves(MetadataCategory::Tables) {
            let entries = settle(
                retriever
                    .tables(name, &self.config.table_types)
                    .await
                    .map(|rows| mapping::table_entries(&rows)),
                MetadataCategory::Tables,
                name,
                warnings,
            );
            let entries: Vec<(String, TableType)> = entries
                .into_iter()
                .filter(|(table, table_type)| {
                    self.config.includes_table_type(*table_type)
                        && self.config.table_rule.matches(&format!("{}.{}", name, table))
                })
                .collect();

            let has_views = entries.iter().any(|(_, t)| *t == TableType::View);
            let definitions = if has_views
                && self.config.retrieves(MetadataCategory::ViewDefinitions)
            {
                settle(
                    retriever
                        .view_definitions(name)
                        .await
                        .map(|rows| mapping::view_definitions(&rows)),
                    MetadataCategory::ViewDefinitions,
                    name,
                    warnings,
                )
            } else {
                HashMap::new()
            };

            for (table_name, table_type) in entries {
                let key = TableRef::new(name, table_name);
                let kind = match table_type {
                    TableType::Table => TableKind::Table,
                    TableType::View => TableKind::View {
                        definition: definitions.get(&key.name).cloned(),
                    },
                };
                schema
                    .tables
                    .push(self.crawl_table(retriever, key, kind, warnings).await);
            }
        }

        if self.config.retrieves(MetadataCategory::Procedures) {
            schema.procedures = settle(
                retriever
                    .procedures(name)
                    .await
                    .map(|rows| mapping::procedures(name, &rows)),
                MetadataCategory::Procedures,
                name,
                warnings,
            );
        }

        tracing::debug!(
            "Schema {} has {} tables and {} procedures",
            name,
            schema.tables.len(),
            schema.procedures.len()
        );
        schema
    }

    async fn crawl_table(
        &self,
        retriever: &mut Retriever<'_>,
        key: TableRef,
        kind: TableKind,
        warnings: &mut Vec<CrawlWarning>,
    ) -> Table {
        let object = key.to_string();
        tracing::debug!("Crawling table {}", object);

        let columns = if self.config.retrieves(MetadataCategory::Columns) {
            settle(
                retriever
                    .columns(&key)
                    .await
                    .and_then(|rows| mapping::columns(&key, &rows)),
                MetadataCategory::Columns,
                &object,
                warnings,
            )
        } else {
            Vec::new()
        };

        let indexes = if self.config.retrieves(MetadataCategory::Indexes) {
            settle(
                retriever
                    .indexes(&key)
                    .await
                    .map(|rows| mapping::indexes(&rows)),
                MetadataCategory::Indexes,
                &object,
                warnings,
            )
        } else {
            Vec::new()
        };

        let foreign_keys = if self.config.retrieves(MetadataCategory::ForeignKeys) {
            settle(
                retriever
                    .foreign_keys(&key)
                    .await
                    .map(|rows| mapping::foreign_keys(&key, &rows)),
                MetadataCategory::ForeignKeys,
                &object,
                warnings,
            )
        } else {
            Vec::new()
        };

        let check_constraints = if self.config.retrieves(MetadataCategory::CheckConstraints) {
            settle(
                retriever
                    .check_constraints(&key)
                    .await
                    .map(|rows| mapping::check_constraints(&rows)),
                MetadataCategory::CheckConstraints,
                &object,
                warnings,
            )
        } else {
            Vec::new()
        };

        let triggers = if self.config.retrieves(MetadataCategory::Triggers) {
            settle(
                retriever
                    .triggers(&key)
                    .await
                    .map(|rows| mapping::triggers(&key, &rows, &self.config.timing_rules)),
                MetadataCategory::Triggers,
                &object,
                warnings,
            )
        } else {
            Vec::new()
        };

        Table {
            schema_name: key.schema,
            name: key.name,
            kind,
            columns,
            indexes,
            foreign_keys,
            check_constraints,
            triggers,
        }
    }
}

/// Unwraps a category result, turning a failure into a warning and an
/// empty category.
fn settle<T: Default>(
    result: Result<T>,
    category: MetadataCategory,
    object: &str,
    warnings: &mut Vec<CrawlWarning>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            let warning = match e {
                CrawlError::CategoryRetrieval {
                    category,
                    object,
                    context,
                    ..
                } => CrawlWarning::new(Some(category), object, context),
                other => CrawlWarning::new(Some(category), object, other.to_string()),
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
            T::default()
        }
    }
}

/// Second pass: marks each foreign key resolved when every referenced
/// column exists in the crawled catalog.
fn link_foreign_keys(schemas: Vec<Schema>, warnings: &mut Vec<CrawlWarning>) -> Vec<Schema> {
    let known: HashSet<ColumnReference> = schemas
        .iter()
        .flat_map(|schema| schema.tables.iter())
        .flat_map(|table| table.columns.iter())
        .map(|column| ColumnReference::new(&column.schema_name, &column.table_name, &column.name))
        .collect();

    let mut linked = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let mut tables = Vec::with_capacity(schema.tables.len());
        for table in schema.tables {
            let mut foreign_keys = Vec::with_capacity(table.foreign_keys.len());
            for foreign_key in table.foreign_keys {
                let missing = foreign_key
                    .columns
                    .iter()
                    .find(|pair| !known.contains(&pair.referenced));
                let resolved = match missing {
                    Some(pair) => {
                        let warning = CrawlWarning::new(
                            Some(MetadataCategory::ForeignKeys),
                            format!("{}.{}", table.schema_name, table.name),
                            format!(
                                "Foreign key {} references {}, which is not in the crawled catalog",
                                foreign_key.name,
                                pair.referenced.full_name()
                            ),
                        );
                        tracing::warn!("{}", warning);
                        warnings.push(warning);
                        false
                    }
                    None => !foreign_key.columns.is_empty(),
                };
                foreign_keys.push(crate::models::ForeignKey {
                    resolved,
                    ..foreign_key
                });
            }
            tables.push(Table {
                foreign_keys,
                ..table
            });
        }
        linked.push(Schema { tables, ..schema });
    }
    linked
}
