//! Analysis & Recommendation Layer
//!
//! Aggregates cluster statistics into corpus-wide metrics and tiered
//! remediation recommendations. Pure computation, no I/O; the only
//! failure mode is a malformed cluster (empty member list), which is a
//! programming error, not an expected input.

use std::collections::BTreeSet;

use super::error::EngineError;
use super::extractor::query_tokens;
use super::layout::Vocabulary;
use super::types::{
    Cluster, ClusteringAnalysis, CoverageReport, OverlapDetail, OverlapReport, Recommendations,
    Rule,
};

/// Redundant rules above this fraction of the corpus trigger an
/// immediate consolidation recommendation
const REDUNDANT_FRACTION_LIMIT: f64 = 0.2;

/// Cluster counts above this fraction of the corpus suggest merging
const CLUSTER_FRACTION_LIMIT: f64 = 0.3;

/// Per-cluster overlap above this is flagged as critical
const CRITICAL_OVERLAP_PERCENTAGE: f64 = 80.0;

/// Overlap percentage above this lists a rule in an overlap report
const REPORTED_OVERLAP_PERCENTAGE: f64 = 30.0;

/// Cap on shared terms listed per overlap detail
const SHARED_TERMS_LIMIT: usize = 10;

/// Aggregate clusters into the corpus-level report.
pub fn analyze(clusters: Vec<Cluster>, total_rules: usize) -> Result<ClusteringAnalysis, EngineError> {
    for cluster in &clusters {
        if cluster.members.is_empty() {
            return Err(EngineError::InvalidCluster(cluster.cluster_id.clone()));
        }
    }

    let redundant_rules: usize = clusters.iter().map(|c| c.redundant_rule_ids.len()).sum();
    let coverage_gaps: usize = clusters.iter().map(|c| c.coverage_gaps.len()).sum();

    let optimization_score = if total_rules == 0 {
        100.0
    } else {
        (100.0 - (redundant_rules as f64 / total_rules as f64) * 100.0).max(0.0)
    };

    let mut recommendations = Recommendations::default();

    if total_rules > 0 && redundant_rules as f64 > total_rules as f64 * REDUNDANT_FRACTION_LIMIT {
        recommendations.immediate.push(format!(
            "{} of {} rules are near-duplicates; prioritize consolidating redundant detections",
            redundant_rules, total_rules
        ));
    }

    if total_rules > 0 && clusters.len() as f64 > total_rules as f64 * CLUSTER_FRACTION_LIMIT {
        recommendations.short_term.push(format!(
            "{} clusters across {} rules; merge small clusters of related detections",
            clusters.len(),
            total_rules
        ));
    }

    for cluster in &clusters {
        if cluster.overlap_percentage > CRITICAL_OVERLAP_PERCENTAGE {
            recommendations.short_term.push(format!(
                "{} has critical query overlap ({:.1}%); review members for duplication",
                cluster.cluster_id, cluster.overlap_percentage
            ));
        }
    }

    recommendations.long_term.push(
        "Establish ongoing similarity monitoring so new rules are checked against the corpus before deployment"
            .to_string(),
    );

    Ok(ClusteringAnalysis {
        clusters,
        total_rules,
        redundant_rules,
        coverage_gaps,
        optimization_score,
        recommendations,
    })
}

/// Token-overlap report for one rule against the rest of the corpus.
pub fn overlap_report(rules: &[Rule], rule_id: &str) -> Result<OverlapReport, EngineError> {
    let target = rules
        .iter()
        .find(|r| r.id == rule_id)
        .ok_or_else(|| EngineError::RuleNotFound(rule_id.to_string()))?;

    let target_tokens: BTreeSet<String> = query_tokens(&target.query).into_iter().collect();

    let mut overlapping_rules = Vec::new();
    let mut overlap_details = Vec::new();

    for other in rules.iter().filter(|r| r.id != rule_id) {
        let other_tokens: BTreeSet<String> = query_tokens(&other.query).into_iter().collect();
        let union = target_tokens.union(&other_tokens).count();
        if union == 0 {
            continue;
        }
        let shared: Vec<String> = target_tokens.intersection(&other_tokens).cloned().collect();
        let overlap_percentage = shared.len() as f64 / union as f64 * 100.0;

        if overlap_percentage > REPORTED_OVERLAP_PERCENTAGE {
            overlapping_rules.push(other.id.clone());
            let mut shared_terms = shared;
            shared_terms.truncate(SHARED_TERMS_LIMIT);
            overlap_details.push(OverlapDetail {
                rule_id: other.id.clone(),
                name: other.name.clone(),
                overlap_percentage,
                shared_terms,
            });
        }
    }

    overlap_details.sort_by(|a, b| {
        b.overlap_percentage
            .partial_cmp(&a.overlap_percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut optimization_suggestions = Vec::new();
    if overlap_details.is_empty() {
        optimization_suggestions
            .push("No significant query overlap with other rules in the corpus".to_string());
    } else {
        if overlap_details
            .iter()
            .any(|d| d.overlap_percentage > CRITICAL_OVERLAP_PERCENTAGE)
        {
            optimization_suggestions.push(format!(
                "Query text is nearly identical to another rule; merge '{}' with its closest match",
                target.name
            ));
        }
        optimization_suggestions.push(format!(
            "{} rule(s) share substantial query logic with '{}'; consider a shared building block",
            overlap_details.len(),
            target.name
        ));
    }

    Ok(OverlapReport {
        rule_id: rule_id.to_string(),
        overlapping_rules,
        overlap_details,
        optimization_suggestions,
    })
}

/// Corpus-wide coverage gap report: expected categories with no
/// representative rule anywhere in the corpus. Per-cluster gaps live on
/// each [`Cluster`]; this is the whole-corpus granularity.
pub fn coverage_report(rules: &[Rule], vocab: &Vocabulary) -> CoverageReport {
    let categories: Vec<String> = rules.iter().map(|r| r.category.to_lowercase()).collect();

    let gaps: Vec<String> = vocab
        .expected_coverage
        .iter()
        .filter(|expected| {
            let expected = expected.to_lowercase();
            !categories.iter().any(|c| c.contains(&expected))
        })
        .cloned()
        .collect();

    let recommendations: Vec<String> = gaps
        .iter()
        .map(|gap| format!("Author detection rules covering {}", gap))
        .collect();

    let risk_assessment = match gaps.len() {
        0 => "low: all expected threat categories have at least one detection rule".to_string(),
        1..=2 => format!(
            "medium: {} expected threat categories lack any detection coverage",
            gaps.len()
        ),
        n => format!("high: {} expected threat categories lack any detection coverage", n),
    };

    CoverageReport { gaps, recommendations, risk_assessment }
}

// ============================================================================
// TESTS
// ============================================================================
