//! Cluster Builder
//!
//! Greedy single-pass grouping: walk the corpus in order, seed a cluster
//! at each unassigned rule, pull in every other unassigned rule at or
//! above the threshold, keep groups of two or more. A rule belongs to at
//! most one cluster per run.
//!
//! Output depends on iteration order, so the engine sorts the corpus by
//! rule id before calling in - the ordering dependency is deterministic
//! and documented rather than hidden.

use std::collections::{BTreeSet, HashMap};

use super::error::EngineError;
use super::extractor::query_tokens;
use super::layout::Vocabulary;
use super::similarity::cosine;
use super::types::{Cluster, ClusterMember, Embedding, Rule};

/// Pairwise similarity above this flags the lower-scoring member redundant
const REDUNDANCY_THRESHOLD: f64 = 0.9;

/// Member count above this suggests consolidation
const LARGE_CLUSTER_SIZE: usize = 5;

/// Overlap percentage above this suggests merging
const HIGH_OVERLAP_PERCENTAGE: f64 = 70.0;

/// Token-set Jaccard similarity of two lowercased query texts, 0-1
fn jaccard_overlap(a: &str, b: &str) -> f64 {
    let left: BTreeSet<String> = query_tokens(a).into_iter().collect();
    let right: BTreeSet<String> = query_tokens(b).into_iter().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

/// Partition a corpus into clusters of mutually similar rules.
///
/// `rules` and `embeddings` must be parallel slices from the same batch.
pub fn build_clusters(
    rules: &[Rule],
    embeddings: &[Embedding],
    threshold: f64,
    vocab: &Vocabulary,
) -> Result<Vec<Cluster>, EngineError> {
    let rules_by_id: HashMap<&str, &Rule> =
        rules.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut assigned: BTreeSet<String> = BTreeSet::new();
    let mut clusters = Vec::new();

    for (i, seed) in embeddings.iter().enumerate() {
        if assigned.contains(&seed.rule_id) {
            continue;
        }

        // Seed joins with the maximal self-match score
        let mut group: Vec<(usize, f64)> = vec![(i, 1.0)];
        for (j, other) in embeddings.iter().enumerate() {
            if j == i || assigned.contains(&other.rule_id) {
                continue;
            }
            let score = cosine(&seed.vector, &other.vector)?;
            if score >= threshold {
                group.push((j, score));
            }
        }

        // Singleton groups are discarded, not reported
        if group.len() < 2 {
            continue;
        }

        for (idx, _) in &group {
            assigned.insert(embeddings[*idx].rule_id.clone());
        }

        let cluster_id = format!("cluster-{}", clusters.len() + 1);
        clusters.push(finalize_cluster(cluster_id, &group, embeddings, &rules_by_id, vocab)?);
    }

    Ok(clusters)
}

/// Compute the derived statistics for a finalized group
fn finalize_cluster(
    cluster_id: String,
    group: &[(usize, f64)],
    embeddings: &[Embedding],
    rules_by_id: &HashMap<&str, &Rule>,
    vocab: &Vocabulary,
) -> Result<Cluster, EngineError> {
    let members: Vec<ClusterMember> = group
        .iter()
        .map(|(idx, score)| ClusterMember {
            rule_id: embeddings[*idx].rule_id.clone(),
            similarity_score: *score,
        })
        .collect();

    let centroid = compute_centroid(group, embeddings);

    // Pairwise stats over all member pairs
    let mut similarity_sum = 0.0;
    let mut overlap_sum = 0.0;
    let mut pair_count = 0usize;
    let mut redundant: BTreeSet<String> = BTreeSet::new();

    for (a, (i, score_a)) in group.iter().enumerate() {
        for (j, score_b) in group.iter().skip(a + 1) {
            let pair_similarity = cosine(&embeddings[*i].vector, &embeddings[*j].vector)?;
            similarity_sum += pair_similarity;
            pair_count += 1;

            let id_a = &embeddings[*i].rule_id;
            let id_b = &embeddings[*j].rule_id;
            if let (Some(rule_a), Some(rule_b)) =
                (rules_by_id.get(id_a.as_str()), rules_by_id.get(id_b.as_str()))
            {
                overlap_sum += jaccard_overlap(&rule_a.query, &rule_b.query);
            }

            if pair_similarity > REDUNDANCY_THRESHOLD {
                // Keep the higher match score; ties keep the higher rule id
                let loser = if score_a < score_b
                    || (score_a == score_b && id_a < id_b)
                {
                    id_a
                } else {
                    id_b
                };
                redundant.insert(loser.clone());
            }
        }
    }

    let similarity = if pair_count > 0 { similarity_sum / pair_count as f64 } else { 1.0 };
    let overlap_percentage =
        if pair_count > 0 { overlap_sum / pair_count as f64 * 100.0 } else { 0.0 };

    let categories: Vec<String> = members
        .iter()
        .filter_map(|m| rules_by_id.get(m.rule_id.as_str()))
        .map(|r| r.category.to_lowercase())
        .collect();

    Ok(Cluster {
        cluster_id,
        centroid,
        optimization_opportunities: optimization_hints(&members, overlap_percentage, &categories),
        coverage_gaps: coverage_gaps(&categories, vocab),
        redundant_rule_ids: redundant.into_iter().collect(),
        members,
        similarity,
        overlap_percentage,
    })
}

fn compute_centroid(group: &[(usize, f64)], embeddings: &[Embedding]) -> Vec<f64> {
    let dim = embeddings[group[0].0].vector.len();
    let mut centroid = vec![0.0f64; dim];
    for (idx, _) in group {
        for (i, value) in embeddings[*idx].vector.iter().enumerate() {
            centroid[i] += value;
        }
    }
    for value in &mut centroid {
        *value /= group.len() as f64;
    }
    centroid
}

fn optimization_hints(
    members: &[ClusterMember],
    overlap_percentage: f64,
    categories: &[String],
) -> Vec<String> {
    let mut hints = Vec::new();

    if members.len() > LARGE_CLUSTER_SIZE {
        hints.push(format!(
            "Cluster of {} rules; consider consolidating into a single parameterized rule",
            members.len()
        ));
    }

    if overlap_percentage > HIGH_OVERLAP_PERCENTAGE {
        hints.push(format!(
            "Query overlap of {:.1}% across members; strong merge candidates",
            overlap_percentage
        ));
    }

    if let Some(first) = categories.first() {
        if first != "unknown" && categories.iter().all(|c| c == first) {
            hints.push(format!(
                "All members target '{}'; consolidation carries low coverage risk",
                first
            ));
        }
    }

    hints
}

/// Expected categories with no representative among the member categories
fn coverage_gaps(categories: &[String], vocab: &Vocabulary) -> Vec<String> {
    vocab
        .expected_coverage
        .iter()
        .filter(|expected| {
            let expected = expected.to_lowercase();
            !categories.iter().any(|c| c.contains(&expected))
        })
        .map(|expected| format!("No {} coverage in this cluster", expected))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
