//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the embedding schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add a structural feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove a feature → increment FEATURE_VERSION
//!
//! Category/platform indicator features come from the configured
//! [`Vocabulary`], not from this file, so vocabulary changes do not
//! require a version bump - embeddings are regenerated per batch anyway.

use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current structural feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// STRUCTURAL FEATURES (Authoritative source)
// ============================================================================

/// Structural feature names in exact order they appear in the vector.
/// This is the SINGLE SOURCE OF TRUTH for the structural block.
pub const STRUCTURAL_FEATURES: &[&str] = &[
    "filter_clauses",    // 0: where-clause count
    "aggregation_clauses", // 1: summarize/stats clause count
    "derived_fields",    // 2: extend/eval derived-field count
    "join_count",        // 3: join count
    "union_count",       // 4: union count
    "query_length",      // 5: character count / 100
    "string_ops",        // 6: contains/like/startswith/endswith
    "aggregation_fns",   // 7: count/sum/avg/max/min
    "logical_ops",       // 8: and/or/not
    "set_ops",           // 9: in/has_any/has_all
];

/// Number of structural features.
/// IMPORTANT: Must match STRUCTURAL_FEATURES.len()!
pub const STRUCTURAL_COUNT: usize = 10;

// ============================================================================
// DEFAULT VOCABULARY
// ============================================================================

/// Default threat-category vocabulary (indicator features, in order)
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "ransomware",
    "malware",
    "phishing",
    "data-exfiltration",
    "privilege-escalation",
    "lateral-movement",
    "persistence",
    "defense-evasion",
];

/// Default platform vocabulary (indicator features, in order)
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "sentinel",
    "splunk",
    "qradar",
    "exabeam",
    "custom",
];

/// Categories every healthy corpus is expected to cover
pub const DEFAULT_EXPECTED_COVERAGE: &[&str] = &[
    "ransomware",
    "malware",
    "phishing",
    "data-exfiltration",
    "privilege-escalation",
    "lateral-movement",
];

// ============================================================================
// VOCABULARY
// ============================================================================

/// Configured category/platform vocabulary.
///
/// Passed explicitly into the extractor and analysis layer so vocabulary
/// changes are a config edit, not a code edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Threat categories that get an indicator feature each
    pub categories: Vec<String>,
    /// Platforms that get an indicator feature each
    pub platforms: Vec<String>,
    /// Categories checked for coverage gaps
    pub expected_coverage: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            platforms: DEFAULT_PLATFORMS.iter().map(|s| s.to_string()).collect(),
            expected_coverage: DEFAULT_EXPECTED_COVERAGE
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Vocabulary {
    /// Total embedding length for this vocabulary
    pub fn feature_count(&self) -> usize {
        STRUCTURAL_COUNT + self.categories.len() + self.platforms.len()
    }

    /// Full feature name list in vector order (for logging/inspection)
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = STRUCTURAL_FEATURES.iter().map(|s| s.to_string()).collect();
        names.extend(self.categories.iter().map(|c| format!("category_{}", c)));
        names.extend(self.platforms.iter().map(|p| format!("platform_{}", p)));
        names
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_count() {
        assert_eq!(STRUCTURAL_COUNT, 10);
        assert_eq!(STRUCTURAL_FEATURES.len(), STRUCTURAL_COUNT);
    }

    #[test]
    fn test_default_feature_count() {
        let vocab = Vocabulary::default();
        // 10 structural + 8 categories + 5 platforms
        assert_eq!(vocab.feature_count(), 23);
        assert_eq!(vocab.feature_names().len(), 23);
    }

    #[test]
    fn test_expected_coverage_is_subset_of_categories() {
        let vocab = Vocabulary::default();
        for expected in &vocab.expected_coverage {
            assert!(vocab.categories.contains(expected));
        }
    }

    #[test]
    fn test_custom_vocabulary_changes_length() {
        let vocab = Vocabulary {
            categories: vec!["ransomware".to_string()],
            platforms: vec!["sentinel".to_string(), "splunk".to_string()],
            expected_coverage: vec!["ransomware".to_string()],
        };
        assert_eq!(vocab.feature_count(), 13);
    }

    #[test]
    fn test_feature_names_order() {
        let vocab = Vocabulary::default();
        let names = vocab.feature_names();
        assert_eq!(names[0], "filter_clauses");
        assert_eq!(names[STRUCTURAL_COUNT], "category_ransomware");
        assert_eq!(names[STRUCTURAL_COUNT + 8], "platform_sentinel");
    }
}
