//! Metadata categories and detail levels.
//!
//! A [`DetailLevel`] is a small set of named flags, one per
//! [`MetadataCategory`]. The four presets are ordered and monotone: every
//! category enabled at a lower preset is enabled at all higher ones.

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of metadata that can be retrieved independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataCategory {
    Tables,
    Columns,
    Indexes,
    ForeignKeys,
    CheckConstraints,
    Triggers,
    Procedures,
    ViewDefinitions,
}

impl MetadataCategory {
    /// Every category, in retrieval order.
    pub const ALL: [Self; 8] = [
        Self::Tables,
        Self::Columns,
        Self::Indexes,
        Self::ForeignKeys,
        Self::CheckConstraints,
        Self::Triggers,
        Self::Procedures,
        Self::ViewDefinitions,
    ];

    /// Categories retrieved once per table.
    pub const PER_TABLE: [Self; 5] = [
        Self::Columns,
        Self::Indexes,
        Self::ForeignKeys,
        Self::CheckConstraints,
        Self::Triggers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::Columns => "columns",
            Self::Indexes => "indexes",
            Self::ForeignKeys => "foreign_keys",
            Self::CheckConstraints => "check_constraints",
            Self::Triggers => "triggers",
            Self::Procedures => "procedures",
            Self::ViewDefinitions => "view_definitions",
        }
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataCategory {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CrawlError::configuration(format!("Unknown metadata category '{}'", s)))
    }
}

/// Named detail presets, ordered from least to most detail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DetailPreset {
    Minimum,
    #[default]
    Basic,
    Verbose,
    Maximum,
}

impl DetailPreset {
    pub const ALL: [Self; 4] = [Self::Minimum, Self::Basic, Self::Verbose, Self::Maximum];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Basic => "basic",
            Self::Verbose => "verbose",
            Self::Maximum => "maximum",
        }
    }
}

impl fmt::Display for DetailPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailPreset {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                CrawlError::configuration(format!(
                    "Unknown detail level '{}': expected minimum, basic, verbose or maximum",
                    s
                ))
            })
    }
}

/// Which metadata categories a crawl retrieves.
///
/// Construct one from a preset, or start from [`DetailLevel::none`] and
/// enable categories individually for a custom level.
///
/// # Example
/// ```rust
/// use dbcrawler_core::{DetailLevel, DetailPreset, MetadataCategory};
///
/// let level = DetailLevel::from_preset(DetailPreset::Verbose);
/// assert!(level.resolve(MetadataCategory::Indexes));
/// assert!(!level.resolve(MetadataCategory::Triggers));
///
/// let custom = DetailLevel::none()
///     .with(MetadataCategory::Tables, true)
///     .with(MetadataCategory::Columns, true);
/// assert_eq!(custom.preset(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailLevel {
    #[serde(default)]
    preset: Option<DetailPreset>,
    pub tables: bool,
    pub columns: bool,
    pub indexes: bool,
    pub foreign_keys: bool,
    pub check_constraints: bool,
    pub triggers: bool,
    pub procedures: bool,
    pub view_definitions: bool,
}

impl Default for DetailLevel {
    fn default() -> Self {
        Self::from_preset(DetailPreset::default())
    }
}

impl From<DetailPreset> for DetailLevel {
    fn from(preset: DetailPreset) -> Self {
        Self::from_preset(preset)
    }
}

impl DetailLevel {
    /// A level with every category disabled.
    pub const fn none() -> Self {
        Self {
            preset: None,
            tables: false,
            columns: false,
            indexes: false,
            foreign_keys: false,
            check_constraints: false,
            triggers: false,
            procedures: false,
            view_definitions: false,
        }
    }

    pub const fn from_preset(preset: DetailPreset) -> Self {
        let at_least_basic = !matches!(preset, DetailPreset::Minimum);
        let at_least_verbose = matches!(preset, DetailPreset::Verbose | DetailPreset::Maximum);
        let maximum = matches!(preset, DetailPreset::Maximum);

        Self {
            preset: Some(preset),
            tables: true,
            columns: at_least_basic,
            indexes: at_least_verbose,
            foreign_keys: at_least_verbose,
            check_constraints: maximum,
            triggers: maximum,
            procedures: at_least_verbose,
            view_definitions: maximum,
        }
    }

    pub const fn minimum() -> Self {
        Self::from_preset(DetailPreset::Minimum)
    }

    pub const fn basic() -> Self {
        Self::from_preset(DetailPreset::Basic)
    }

    pub const fn verbose() -> Self {
        Self::from_preset(DetailPreset::Verbose)
    }

    pub const fn maximum() -> Self {
        Self::from_preset(DetailPreset::Maximum)
    }

    /// The preset this level was built from, `None` for custom levels.
    pub fn preset(&self) -> Option<DetailPreset> {
        self.preset
    }

    /// Whether `category` is retrieved at this level.
    pub fn resolve(&self, category: MetadataCategory) -> bool {
        match category {
            MetadataCategory::Tables => self.tables,
            MetadataCategory::Columns => self.columns,
            MetadataCategory::Indexes => self.indexes,
            MetadataCategory::ForeignKeys => self.foreign_keys,
            MetadataCategory::CheckConstraints => self.check_constraints,
            MetadataCategory::Triggers => self.triggers,
            MetadataCategory::Procedures => self.procedures,
            MetadataCategory::ViewDefinitions => self.view_definitions,
        }
    }

    /// Builder method toggling one category. The result is a custom level
    /// unless the flag already had the requested value.
    pub fn with(mut self, category: MetadataCategory, enabled: bool) -> Self {
        if self.resolve(category) == enabled {
            return self;
        }
        let flag = match category {
            MetadataCategory::Tables => &mut self.tables,
            MetadataCategory::Columns => &mut self.columns,
            MetadataCategory::Indexes => &mut self.indexes,
            MetadataCategory::ForeignKeys => &mut self.foreign_keys,
            MetadataCategory::CheckConstraints => &mut self.check_constraints,
            MetadataCategory::Triggers => &mut self.triggers,
            MetadataCategory::Procedures => &mut self.procedures,
            MetadataCategory::ViewDefinitions => &mut self.view_definitions,
        };
        *flag = enabled;
        self.preset = None;
        self
    }

    /// Enabled categories in retrieval order.
    pub fn enabled(&self) -> impl Iterator<Item = MetadataCategory> + '_ {
        MetadataCategory::ALL
            .into_iter()
            .filter(|c| self.resolve(*c))
    }

    /// True if every category enabled in `other` is also enabled here.
    pub fn includes(&self, other: &DetailLevel) -> bool {
        other.enabled().all(|c| self.resolve(c))
    }

    /// Rejects flag combinations the crawler cannot honor.
    ///
    /// Per-table categories need tables, and indexes and foreign keys are
    /// lists of column references so they need columns.
    ///
    /// # Errors
    /// Returns a configuration error naming the offending category.
    pub fn validate(&self) -> crate::Result<()> {
        let per_table = MetadataCategory::PER_TABLE
            .into_iter()
            .chain([MetadataCategory::ViewDefinitions]);
        if !self.tables
            && let Some(category) = per_table.into_iter().find(|c| self.resolve(*c))
        {
            return Err(CrawlError::configuration(format!(
                "Detail level enables {} but not tables",
                category
            )));
        }

        for category in [MetadataCategory::Indexes, MetadataCategory::ForeignKeys] {
            if self.resolve(category) && !self.columns {
                return Err(CrawlError::configuration(format!(
                    "Detail level enables {} but not columns",
                    category
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset {
            Some(preset) => write!(f, "{}", preset),
            None => {
                let names: Vec<&str> = self.enabled().map(MetadataCategory::as_str).collect();
                write!(f, "custom[{}]", names.join(","))
            }
        }
    }
}
