//! Classification of vendor trigger timing text.
//!
//! Databases report trigger timing as free text (`BEFORE`, `AFTER`,
//! `INSTEAD OF`, or vendor-specific strings such as `BEFORE EACH ROW`).
//! Rules are tried in order and the first match wins; text no rule matches
//! is [`ActionTiming::Unknown`], never a guessed timing.

use crate::error::CrawlError;
use crate::models::ActionTiming;
use regex::Regex;
use serde::{Deserialize, Serialize};

const DEFAULT_RULES: [(&str, ActionTiming); 3] = [
    (r"(?i)^\s*BEFORE\s*$", ActionTiming::Before),
    (r"(?i)^\s*AFTER\s*$", ActionTiming::After),
    (r"(?i)^\s*INSTEAD\s+OF\s*$", ActionTiming::InsteadOf),
];

/// Serialized form of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingRuleSpec {
    pub pattern: String,
    pub timing: ActionTiming,
}

#[derive(Debug, Clone)]
struct TimingRule {
    pattern: Regex,
    timing: ActionTiming,
}

/// Ordered `(pattern, timing)` rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimingRuleSpec>", into = "Vec<TimingRuleSpec>")]
pub struct TriggerTimingRules {
    rules: Vec<TimingRule>,
}

impl Default for TriggerTimingRules {
    /// Exact, case-insensitive `BEFORE`, `AFTER` and `INSTEAD OF`.
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .filter_map(|(pattern, timing)| {
                Regex::new(pattern).ok().map(|pattern| TimingRule {
                    pattern,
                    timing: *timing,
                })
            })
            .collect();
        Self { rules }
    }
}

impl PartialEq for TriggerTimingRules {
    fn eq(&self, other: &Self) -> bool {
        self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(&other.rules)
                .all(|(a, b)| a.pattern.as_str() == b.pattern.as_str() && a.timing == b.timing)
    }
}

impl Eq for TriggerTimingRules {}

impl TriggerTimingRules {
    /// An empty rule list; everything classifies as unknown.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. Patterns are unanchored regular expressions.
    ///
    /// # Errors
    /// Returns a configuration error if `pattern` does not compile.
    pub fn with_rule(mut self, pattern: &str, timing: ActionTiming) -> crate::Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| {
            CrawlError::configuration(format!("Invalid trigger timing pattern '{}': {}", pattern, e))
        })?;
        self.rules.push(TimingRule {
            pattern: compiled,
            timing,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn classify(&self, text: Option<&str>) -> ActionTiming {
        let Some(text) = text else {
            return ActionTiming::Unknown;
        };
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map_or(ActionTiming::Unknown, |rule| rule.timing)
    }
}

impl TryFrom<Vec<TimingRuleSpec>> for TriggerTimingRules {
    type Error = CrawlError;

    fn try_from(specs: Vec<TimingRuleSpec>) -> Result<Self, Self::Error> {
        specs
            .into_iter()
            .try_fold(Self::empty(), |rules, spec| {
                rules.with_rule(&spec.pattern, spec.timing)
            })
    }
}

impl From<TriggerTimingRules> for Vec<TimingRuleSpec> {
    fn from(rules: TriggerTimingRules) -> Self {
        rules
            .rules
            .into_iter()
            .map(|rule| TimingRuleSpec {
                pattern: rule.pattern.as_str().to_string(),
                timing: rule.timing,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = TriggerTimingRules::default();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules.classify(Some("BEFORE")), ActionTiming::Before);
        assert_eq!(rules.classify(Some("after")), ActionTiming::After);
        assert_eq!(rules.classify(Some("Instead  Of")), ActionTiming::InsteadOf);
    }

    #[test]
    fn test_unseen_values_are_unknown() {
        let rules = TriggerTimingRules::default();
        assert_eq!(rules.classify(Some("")), ActionTiming::Unknown);
        assert_eq!(rules.classify(None), ActionTiming::Unknown);
        assert_eq!(rules.classify(Some("BEFORE EACH ROW")), ActionTiming::Unknown);
        assert_eq!(rules.classify(Some("ON COMMIT")), ActionTiming::Unknown);
    }

    #[test]
    fn test_custom_prefix_rule() {
        let rules = TriggerTimingRules::empty()
            .with_rule(r"^BEFORE", ActionTiming::Before)
            .unwrap();
        assert_eq!(rules.classify(Some("BEFORE EACH ROW")), ActionTiming::Before);
        assert_eq!(rules.classify(Some("AFTER EACH ROW")), ActionTiming::Unknown);
    }

    #[test]
    fn test_invalid_pattern() {
        let result = TriggerTimingRules::empty().with_rule("(", ActionTiming::After);
        assert!(matches!(result, Err(CrawlError::Configuration { .. })));
    }

    #[test]
    fn test_serde_round_trip() {
        let json = r#"[{"pattern": "^AFTER", "timing": "after"}]"#;
        let rules: TriggerTimingRules = serde_json::from_str(json).unwrap();
        assert_eq!(rules.classify(Some("AFTER STATEMENT")), ActionTiming::After);

        let back = serde_json::to_value(&rules).unwrap();
        assert_eq!(back[0]["pattern"], "^AFTER");
        assert_eq!(back[0]["timing"], "after");

        let invalid: Result<TriggerTimingRules, _> =
            serde_json::from_str(r#"[{"pattern": "(", "timing": "after"}]"#);
        assert!(invalid.is_err());
    }
}
