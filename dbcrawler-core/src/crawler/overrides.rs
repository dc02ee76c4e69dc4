//! Per-category override queries.

use super::MetadataCategory;
use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Override query text keyed by metadata category.
///
/// When a category has an override, its retriever runs the query instead
/// of the generic metadata request. Queries are not checked here; a broken
/// query surfaces as a retrieval warning when it runs. Blank text counts
/// as unset.
///
/// Deserializes from a JSON object keyed by category name:
///
/// ```rust
/// use dbcrawler_core::{MetadataCategory, MetadataViewOverrides};
///
/// let overrides = MetadataViewOverrides::from_json(
///     r#"{"view_definitions": "SELECT * FROM INFORMATION_SCHEMA.VIEWS", "triggers": "  "}"#,
/// )?;
/// assert!(overrides.get(MetadataCategory::ViewDefinitions).is_some());
/// assert!(overrides.get(MetadataCategory::Triggers).is_none());
/// # Ok::<(), dbcrawler_core::CrawlError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataViewOverrides {
    queries: BTreeMap<MetadataCategory, String>,
}

impl MetadataViewOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the override for one category.
    pub fn with_query(mut self, category: MetadataCategory, query: impl Into<String>) -> Self {
        self.set(category, query);
        self
    }

    pub fn set(&mut self, category: MetadataCategory, query: impl Into<String>) {
        self.queries.insert(category, query.into());
    }

    pub fn remove(&mut self, category: MetadataCategory) -> Option<String> {
        self.queries.remove(&category)
    }

    /// The override query for `category`, if one is set and non-blank.
    pub fn get(&self, category: MetadataCategory) -> Option<&str> {
        self.queries
            .get(&category)
            .map(String::as_str)
            .filter(|q| !q.trim().is_empty())
    }

    /// Categories with a usable override, in category order.
    pub fn categories(&self) -> impl Iterator<Item = MetadataCategory> + '_ {
        self.queries
            .keys()
            .copied()
            .filter(|c| self.get(*c).is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.categories().next().is_none()
    }

    /// Parses overrides from a JSON object keyed by category name.
    ///
    /// # Errors
    /// Returns a serialization error for malformed JSON or unknown categories.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| CrawlError::Serialization {
            context: "Failed to parse metadata view overrides".to_string(),
            source: e,
        })
    }
}
