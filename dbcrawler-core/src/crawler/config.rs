//! Crawl configuration.
//!
//! This module provides the `CrawlConfig` struct that controls what a
//! single crawl retrieves, and the `InclusionRule` used to filter schemas
//! and tables by name.

use super::{DetailLevel, MetadataCategory, MetadataViewOverrides, TriggerTimingRules};
use crate::adapters::TableType;
use crate::error::CrawlError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Serialized form of an [`InclusionRule`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionRuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

/// Include/exclude regular expressions matched against a whole name.
///
/// A name is included when it matches the include pattern (everything, if
/// unset) and does not match the exclude pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "InclusionRuleSpec", into = "InclusionRuleSpec")]
pub struct InclusionRule {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl InclusionRule {
    pub fn include_all() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns a configuration error if a pattern does not compile.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> crate::Result<Self> {
        Ok(Self {
            include: include.map(compile_anchored).transpose()?,
            exclude: exclude.map(compile_anchored).transpose()?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        let included = self.include.as_ref().is_none_or(|re| re.is_match(name));
        let excluded = self.exclude.as_ref().is_some_and(|re| re.is_match(name));
        included && !excluded
    }

    fn spec(&self) -> InclusionRuleSpec {
        InclusionRuleSpec {
            include: self.include.as_ref().map(|re| unanchor(re.as_str())),
            exclude: self.exclude.as_ref().map(|re| unanchor(re.as_str())),
        }
    }
}

impl PartialEq for InclusionRule {
    fn eq(&self, other: &Self) -> bool {
        self.spec() == other.spec()
    }
}

impl Eq for InclusionRule {}

impl TryFrom<InclusionRuleSpec> for InclusionRule {
    type Error = CrawlError;

    fn try_from(spec: InclusionRuleSpec) -> Result<Self, Self::Error> {
        Self::new(spec.include.as_deref(), spec.exclude.as_deref())
    }
}

impl From<InclusionRule> for InclusionRuleSpec {
    fn from(rule: InclusionRule) -> Self {
        rule.spec()
    }
}

const ANCHOR_START: &str = "^(?:";
const ANCHOR_END: &str = ")$";

fn compile_anchored(pattern: &str) -> crate::Result<Regex> {
    Regex::new(&format!("{ANCHOR_START}{pattern}{ANCHOR_END}")).map_err(|e| {
        CrawlError::configuration(format!("Invalid inclusion pattern '{}': {}", pattern, e))
    })
}

fn unanchor(pattern: &str) -> String {
    pattern
        .strip_prefix(ANCHOR_START)
        .and_then(|p| p.strip_suffix(ANCHOR_END))
        .unwrap_or(pattern)
        .to_string()
}

/// Configuration for one catalog crawl.
///
/// # Example
/// ```rust
/// use dbcrawler_core::{CrawlConfig, DetailLevel, InclusionRule, MetadataCategory};
///
/// let config = CrawlConfig::new()
///     .with_detail_level(DetailLevel::maximum())
///     .with_include_procedures(true)
///     .with_schema_rule(InclusionRule::new(Some("PUBLIC"), None)?);
///
/// assert!(config.validate().is_ok());
/// assert!(config.retrieves(MetadataCategory::Procedures));
/// # Ok::<(), dbcrawler_core::CrawlError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub detail_level: DetailLevel,
    pub overrides: MetadataViewOverrides,
    /// Table kinds to retrieve; must not be empty
    pub table_types: Vec<TableType>,
    /// Procedures are retrieved only when this is set and the detail level enables them
    pub include_procedures: bool,
    /// Matched against schema names
    pub schema_rule: InclusionRule,
    /// Matched against `schema.table` full names
    pub table_rule: InclusionRule,
    pub timing_rules: TriggerTimingRules,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            detail_level: DetailLevel::default(),
            overrides: MetadataViewOverrides::default(),
            table_types: vec![TableType::Table, TableType::View],
            include_procedures: false,
            schema_rule: InclusionRule::include_all(),
            table_rule: InclusionRule::include_all(),
            timing_rules: TriggerTimingRules::default(),
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the crawl configuration before any query runs.
    ///
    /// Overrides for categories the detail level disables are not an
    /// error; they are logged and ignored.
    ///
    /// # Errors
    /// Returns a configuration error for invalid detail level combinations
    /// or an empty table type filter.
    pub fn validate(&self) -> crate::Result<()> {
        self.detail_level.validate()?;

        if self.table_types.is_empty() {
            return Err(CrawlError::configuration(
                "table_types must name at least one table type",
            ));
        }

        for category in self.overrides.categories() {
            if !self.retrieves(category) {
                tracing::debug!(
                    "Ignoring override for {} at detail level {}",
                    category,
                    self.detail_level
                );
            }
        }

        Ok(())
    }

    /// Whether the crawl retrieves `category`, taking the procedure switch into account.
    pub fn retrieves(&self, category: MetadataCategory) -> bool {
        match category {
            MetadataCategory::Procedures => {
                self.include_procedures && self.detail_level.resolve(category)
            }
            _ => self.detail_level.resolve(category),
        }
    }

    pub fn includes_table_type(&self, table_type: TableType) -> bool {
        self.table_types.contains(&table_type)
    }

    pub fn with_detail_level(mut self, detail_level: impl Into<DetailLevel>) -> Self {
        self.detail_level = detail_level.into();
        self
    }

    pub fn with_overrides(mut self, overrides: MetadataViewOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_override(mut self, category: MetadataCategory, query: impl Into<String>) -> Self {
        self.overrides.set(category, query);
        self
    }

    pub fn with_table_types(mut self, table_types: Vec<TableType>) -> Self {
        self.table_types = table_types;
        self
    }

    pub fn with_include_procedures(mut self, include: bool) -> Self {
        self.include_procedures = include;
        self
    }

    pub fn with_schema_rule(mut self, rule: InclusionRule) -> Self {
        self.schema_rule = rule;
        self
    }

    pub fn with_table_rule(mut self, rule: InclusionRule) -> Self {
        self.table_rule = rule;
        self
    }

    pub fn with_timing_rules(mut self, rules: TriggerTimingRules) -> Self {
        self.timing_rules = rules;
        self
    }
}
