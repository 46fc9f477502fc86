//! Detection-rule similarity & clustering engine
//!
//! Stateless batch pipeline: embeddings → similarity matrix → clusters →
//! corpus analysis. A [`RuleEngine`] is a cheap value constructed per
//! request from the configured vocabulary; it holds no corpus state, so
//! there is no cross-request contamination and tests stay simple.

pub mod analysis;
pub mod cluster;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod similarity;
pub mod types;

pub use error::EngineError;
pub use layout::Vocabulary;
pub use types::{
    Cluster, ClusteringAnalysis, CoverageReport, Embedding, OverlapReport, Rule, SimilarRule,
    SimilarityEntry,
};

/// One similarity/clustering engine instance.
///
/// The corpus is passed into each operation; the engine only carries the
/// vocabulary configuration.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    vocab: Vocabulary,
}

impl RuleEngine {
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Sort a corpus by rule id. Clustering is greedy and order-dependent,
    /// so every operation works on an id-sorted copy to keep output
    /// reproducible regardless of storage order.
    fn sorted_corpus(&self, rules: &[Rule]) -> Vec<Rule> {
        let mut sorted = rules.to_vec();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        sorted
    }

    /// Extract and batch-normalize embeddings for the whole corpus.
    pub fn generate_embeddings(&self, rules: &[Rule]) -> Vec<Embedding> {
        let sorted = self.sorted_corpus(rules);
        let embeddings = extractor::generate(&sorted, &self.vocab);
        tracing::info!(
            rules = sorted.len(),
            dimensions = self.vocab.feature_count(),
            "generated embeddings"
        );
        embeddings
    }

    /// Run the full clustering pipeline and return the corpus analysis
    /// together with the similarity matrix it was derived from.
    pub fn cluster_rules(
        &self,
        rules: &[Rule],
        threshold: f64,
    ) -> Result<(ClusteringAnalysis, Vec<SimilarityEntry>), EngineError> {
        let sorted = self.sorted_corpus(rules);
        let embeddings = extractor::generate(&sorted, &self.vocab);
        let matrix = similarity::build_matrix(&embeddings)?;
        let clusters = cluster::build_clusters(&sorted, &embeddings, threshold, &self.vocab)?;
        let analysis = analysis::analyze(clusters, sorted.len())?;

        tracing::info!(
            rules = analysis.total_rules,
            clusters = analysis.clusters.len(),
            redundant = analysis.redundant_rules,
            score = analysis.optimization_score,
            "clustering run complete"
        );
        Ok((analysis, matrix))
    }

    /// Rules similar to `rule_id` at or above `threshold`, descending by
    /// score, excluding the rule itself.
    pub fn find_similar(
        &self,
        rules: &[Rule],
        rule_id: &str,
        threshold: f64,
    ) -> Result<Vec<SimilarRule>, EngineError> {
        let sorted = self.sorted_corpus(rules);
        let embeddings = extractor::generate(&sorted, &self.vocab);

        let target_index = sorted
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| EngineError::RuleNotFound(rule_id.to_string()))?;

        let mut matches = Vec::new();
        for (i, other) in embeddings.iter().enumerate() {
            if i == target_index {
                continue;
            }
            let score = similarity::cosine(&embeddings[target_index].vector, &other.vector)?;
            if score >= threshold {
                matches.push(SimilarRule {
                    rule_id: other.rule_id.clone(),
                    name: sorted[i].name.clone(),
                    similarity: score,
                });
            }
        }

        matches.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(matches)
    }

    /// Query-text overlap between one rule and the rest of the corpus.
    pub fn overlap_analysis(&self, rules: &[Rule], rule_id: &str) -> Result<OverlapReport, EngineError> {
        let sorted = self.sorted_corpus(rules);
        analysis::overlap_report(&sorted, rule_id)
    }

    /// Expected threat categories with no rule anywhere in the corpus.
    pub fn coverage_gap_analysis(&self, rules: &[Rule]) -> CoverageReport {
        analysis::coverage_report(rules, &self.vocab)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, query: &str, category: &str, platform: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: format!("Rule {}", id),
            query: query.to_string(),
            category: category.to_string(),
            platform: platform.to_string(),
        }
    }

    fn corpus() -> Vec<Rule> {
        vec![
            rule(
                "rule-001",
                "SecurityEvent | where EventID == 4688 | where CommandLine contains \"vssadmin delete shadows\"",
                "Ransomware",
                "Sentinel",
            ),
            rule(
                "rule-002",
                "SecurityEvent | where EventID == 4688 | where CommandLine contains \"vssadmin delete shadows /all\"",
                "Ransomware",
                "Sentinel",
            ),
            rule(
                "rule-003",
                "index=email sourcetype=o365 | stats count by sender | eval suspicious=1",
                "Phishing",
                "Splunk",
            ),
        ]
    }

    #[test]
    fn test_cluster_rules_end_to_end() {
        let engine = RuleEngine::new(Vocabulary::default());
        let (analysis, matrix) = engine.cluster_rules(&corpus(), 0.7).unwrap();

        assert_eq!(analysis.total_rules, 3);
        assert_eq!(analysis.clusters.len(), 1);
        assert_eq!(matrix.len(), 3);
        assert!(analysis.optimization_score >= 0.0 && analysis.optimization_score <= 100.0);
    }

    #[test]
    fn test_cluster_rules_is_order_independent() {
        let engine = RuleEngine::new(Vocabulary::default());
        let rules = corpus();
        let mut reversed = rules.clone();
        reversed.reverse();

        let (a, _) = engine.cluster_rules(&rules, 0.7).unwrap();
        let (b, _) = engine.cluster_rules(&reversed, 0.7).unwrap();

        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_find_similar_excludes_self_and_sorts_descending() {
        let engine = RuleEngine::new(Vocabulary::default());
        let matches = engine.find_similar(&corpus(), "rule-001", 0.0).unwrap();

        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.rule_id != "rule-001"));
        assert!(matches[0].similarity >= matches[1].similarity);
        assert_eq!(matches[0].rule_id, "rule-002");
    }

    #[test]
    fn test_find_similar_unknown_rule() {
        let engine = RuleEngine::new(Vocabulary::default());
        let err = engine.find_similar(&corpus(), "rule-999", 0.7).unwrap_err();
        assert!(matches!(err, EngineError::RuleNotFound(_)));
    }

    #[test]
    fn test_empty_corpus_operations_return_empty() {
        let engine = RuleEngine::new(Vocabulary::default());

        assert!(engine.generate_embeddings(&[]).is_empty());
        let (analysis, matrix) = engine.cluster_rules(&[], 0.7).unwrap();
        assert!(analysis.clusters.is_empty());
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_coverage_gap_analysis_corpus_wide() {
        let engine = RuleEngine::new(Vocabulary::default());
        let report = engine.coverage_gap_analysis(&corpus());

        // ransomware and phishing are covered, four expected categories are not
        assert!(!report.gaps.contains(&"ransomware".to_string()));
        assert!(!report.gaps.contains(&"phishing".to_string()));
        assert_eq!(report.gaps.len(), 4);
    }
}
