//! Engine data model
//!
//! All records the engine computes and the storage adapter persists.
//! Everything is plain serde data - no behavior beyond constructors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_unknown() -> String {
    "unknown".to_string()
}

// ============================================================================
// RULE
// ============================================================================

/// A detection rule under similarity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique, stable identifier within a corpus
    pub id: String,
    /// Display name
    pub name: String,
    /// Detection logic as raw text, in the platform's native query language
    pub query: String,
    /// Threat classification label, matched case-insensitively
    #[serde(default = "default_unknown")]
    pub category: String,
    /// Originating security tool
    #[serde(default = "default_unknown")]
    pub platform: String,
}

// ============================================================================
// EMBEDDING
// ============================================================================

/// A rule's derived feature vector.
///
/// Values are max-normalized per feature index across the batch they were
/// generated in - embeddings from different batches are NOT comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub rule_id: String,
    pub vector: Vec<f64>,
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// One rule's row of the pairwise similarity matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub rule_id: String,
    /// Cosine similarity to every rule in the corpus (self = 1.0).
    /// BTreeMap keeps serialized output stable across runs.
    pub similarities: BTreeMap<String, f64>,
    /// Mean over all entries, self included
    pub average_similarity: f64,
    /// Up to 5 other rule ids with score > 0.5, descending by score
    pub most_similar: Vec<String>,
}

/// A similarity match returned by find_similar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarRule {
    pub rule_id: String,
    pub name: String,
    pub similarity: f64,
}

// ============================================================================
// CLUSTER
// ============================================================================

/// A cluster member and the score it was matched into the cluster with
/// (the seed carries 1.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub rule_id: String,
    pub similarity_score: f64,
}

/// A group of two or more mutually similar rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    /// Component-wise mean of member embeddings
    pub centroid: Vec<f64>,
    pub members: Vec<ClusterMember>,
    /// Mean pairwise cosine similarity across member pairs
    pub similarity: f64,
    /// Mean pairwise query-token Jaccard overlap, 0-100
    pub overlap_percentage: f64,
    /// Members whose pairwise similarity with another member exceeds 0.9
    pub redundant_rule_ids: Vec<String>,
    pub optimization_opportunities: Vec<String>,
    /// Expected categories entirely absent from member categories
    pub coverage_gaps: Vec<String>,
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// Tiered remediation recommendations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

/// Corpus-level clustering report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringAnalysis {
    pub clusters: Vec<Cluster>,
    pub total_rules: usize,
    /// Sum of redundant_rule_ids across clusters
    pub redundant_rules: usize,
    /// Sum of per-cluster coverage gaps
    pub coverage_gaps: usize,
    /// max(0, 100 - redundant/total * 100)
    pub optimization_score: f64,
    pub recommendations: Recommendations,
}

// ============================================================================
// OVERLAP & COVERAGE REPORTS
// ============================================================================

/// Pairwise overlap between the target rule and one other rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapDetail {
    pub rule_id: String,
    pub name: String,
    /// Token Jaccard overlap, 0-100
    pub overlap_percentage: f64,
    /// Query tokens shared with the target rule (sorted, capped)
    pub shared_terms: Vec<String>,
}

/// Report for overlap_analysis on a single rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapReport {
    pub rule_id: String,
    pub overlapping_rules: Vec<String>,
    pub overlap_details: Vec<OverlapDetail>,
    pub optimization_suggestions: Vec<String>,
}

/// Corpus-wide coverage gap report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Expected categories with no representative rule in the corpus
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_assessment: String,
}
