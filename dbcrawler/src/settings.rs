//! Crawl settings read from a JSON file and merged with command line flags.
//!
//! A settings file carries the same knobs as the command line plus the
//! override queries and exclusion patterns that have no flag:
//!
//! ```json
//! {
//!   "detail_level": "maximum",
//!   "include_procedures": true,
//!   "schemas": { "include": "sales|archive", "exclude": "archive" },
//!   "overrides": { "view_definitions": "SELECT ..." },
//!   "trigger_timing": [{ "pattern": "^BEFORE", "timing": "before" }]
//! }
//! ```

use dbcrawler_core::crawler::InclusionRuleSpec;
use dbcrawler_core::{
    CrawlConfig, CrawlError, DetailPreset, InclusionRule, MetadataViewOverrides, OutputFormat,
    Result, TableType, TriggerTimingRules,
};
use crate::report::ReportOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a crawl can be configured with outside of code.
///
/// Unset fields fall back to the [`CrawlConfig`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlSettings {
    pub detail_level: Option<DetailPreset>,
    pub include_procedures: Option<bool>,
    pub table_types: Option<Vec<TableType>>,
    /// Matched against schema names
    pub schemas: InclusionRuleSpec,
    /// Matched against `schema.table` full names
    pub tables: InclusionRuleSpec,
    pub overrides: MetadataViewOverrides,
    /// Replaces the default timing rules when set
    pub trigger_timing: Option<TriggerTimingRules>,
    pub format: Option<OutputFormat>,
    /// Whether the report header carries the crawl time; on when unset
    pub timestamp: Option<bool>,
}

impl CrawlSettings {
    /// Parses settings from JSON text.
    ///
    /// # Errors
    /// Returns a serialization error for malformed JSON, unknown keys or
    /// unknown category and level names.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CrawlError::Serialization {
            context: "Failed to parse crawl settings".to_string(),
            source: e,
        })
    }

    /// Reads a settings file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a serialization
    /// error if it is not valid settings JSON.
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CrawlError::Io {
                context: format!("Failed to read settings file {}", path.display()),
                source: e,
            })?;
        let settings = Self::from_json(&json)?;
        tracing::debug!("Loaded crawl settings from {}", path.display());
        Ok(settings)
    }

    /// Layers `flags` on top of these settings. Values set in `flags` win;
    /// override queries are merged per category.
    pub fn merge(mut self, flags: CrawlSettings) -> Self {
        self.detail_level = flags.detail_level.or(self.detail_level);
        self.include_procedures = flags.include_procedures.or(self.include_procedures);
        self.table_types = flags.table_types.or(self.table_types);
        self.schemas = merge_rule(self.schemas, flags.schemas);
        self.tables = merge_rule(self.tables, flags.tables);
        self.trigger_timing = flags.trigger_timing.or(self.trigger_timing);
        self.format = flags.format.or(self.format);
        self.timestamp = flags.timestamp.or(self.timestamp);
        for category in flags.overrides.categories() {
            if let Some(query) = flags.overrides.get(category) {
                self.overrides.set(category, query);
            }
        }
        self
    }

    /// Builds the crawl configuration these settings describe.
    ///
    /// # Errors
    /// Returns a configuration error if an inclusion pattern does not
    /// compile or the resulting configuration is invalid.
    pub fn to_config(&self) -> Result<CrawlConfig> {
        let mut config = CrawlConfig::new()
            .with_overrides(self.overrides.clone())
            .with_schema_rule(InclusionRule::try_from(self.schemas.clone())?)
            .with_table_rule(InclusionRule::try_from(self.tables.clone())?);

        if let Some(preset) = self.detail_level {
            config = config.with_detail_level(preset);
        }
        if let Some(include) = self.include_procedures {
            config = config.with_include_procedures(include);
        }
        if let Some(types) = &self.table_types {
            config = config.with_table_types(types.clone());
        }
        if let Some(rules) = &self.trigger_timing {
            config = config.with_timing_rules(rules.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    pub fn report_options(&self) -> ReportOptions {
        let options = ReportOptions::new(self.output_format());
        if self.timestamp == Some(false) {
            options.without_timestamp()
        } else {
            options
        }
    }
}

fn merge_rule(base: InclusionRuleSpec, flags: InclusionRuleSpec) -> InclusionRuleSpec {
    InclusionRuleSpec {
        include: flags.include.or(base.include),
        exclude: flags.exclude.or(base.exclude),
    }
}
