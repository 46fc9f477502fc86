//! Feature Extractor
//!
//! Turns one rule (query text + category + platform) into a raw feature
//! vector, and max-normalizes a whole batch so vectors are comparable
//! within that batch. Pure functions, no I/O, never fails.
//!
//! Keyword counting works on word tokens rather than raw substrings so
//! `or` inside `sourcetype` does not count as a logical operator.

use super::layout::Vocabulary;
use super::types::{Embedding, Rule};

// Structural keyword sets, one per feature slot
const FILTER_KEYWORDS: &[&str] = &["where"];
const AGGREGATION_CLAUSE_KEYWORDS: &[&str] = &["summarize", "stats"];
const DERIVED_FIELD_KEYWORDS: &[&str] = &["extend", "eval"];
const JOIN_KEYWORDS: &[&str] = &["join"];
const UNION_KEYWORDS: &[&str] = &["union"];
const STRING_OP_KEYWORDS: &[&str] = &["contains", "like", "startswith", "endswith"];
const AGGREGATION_FN_KEYWORDS: &[&str] = &["count", "sum", "avg", "max", "min"];
const LOGICAL_OP_KEYWORDS: &[&str] = &["and", "or", "not"];
const SET_OP_KEYWORDS: &[&str] = &["in", "has_any", "has_all"];

/// Lowercased word tokens of a query. Underscores stay inside tokens so
/// operators like `has_any` survive tokenization.
pub fn query_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn count_keywords(tokens: &[String], keywords: &[&str]) -> f64 {
    tokens
        .iter()
        .filter(|t| keywords.contains(&t.as_str()))
        .count() as f64
}

/// Extract the raw (un-normalized) feature vector for one rule.
///
/// Layout: 10 structural features, then one indicator per configured
/// category, then one per configured platform. Unknown categories and
/// platforms yield all-zero indicator blocks, not errors.
pub fn extract_raw(rule: &Rule, vocab: &Vocabulary) -> Vec<f64> {
    let query = rule.query.to_lowercase();
    let tokens = query_tokens(&query);

    let mut vector = Vec::with_capacity(vocab.feature_count());

    // Structural block (order fixed by layout::STRUCTURAL_FEATURES)
    vector.push(count_keywords(&tokens, FILTER_KEYWORDS));
    vector.push(count_keywords(&tokens, AGGREGATION_CLAUSE_KEYWORDS));
    vector.push(count_keywords(&tokens, DERIVED_FIELD_KEYWORDS));
    vector.push(count_keywords(&tokens, JOIN_KEYWORDS));
    vector.push(count_keywords(&tokens, UNION_KEYWORDS));
    vector.push(query.chars().count() as f64 / 100.0);
    vector.push(count_keywords(&tokens, STRING_OP_KEYWORDS));
    vector.push(count_keywords(&tokens, AGGREGATION_FN_KEYWORDS));
    vector.push(count_keywords(&tokens, LOGICAL_OP_KEYWORDS));
    vector.push(count_keywords(&tokens, SET_OP_KEYWORDS));

    // Category indicators
    let category = rule.category.to_lowercase();
    for entry in &vocab.categories {
        vector.push(if category.contains(&entry.to_lowercase()) { 1.0 } else { 0.0 });
    }

    // Platform indicators
    let platform = rule.platform.to_lowercase();
    for entry in &vocab.platforms {
        vector.push(if platform.contains(&entry.to_lowercase()) { 1.0 } else { 0.0 });
    }

    vector
}

/// Max-normalize every feature index across the batch, in place.
///
/// Each value is divided by the maximum absolute value observed at its
/// index; columns whose max is 0 stay 0. Idempotent: re-normalizing an
/// already-normalized batch is a no-op.
pub fn normalize(embeddings: &mut [Embedding]) {
    let Some(first) = embeddings.first() else {
        return;
    };
    let dim = first.vector.len();

    let mut maxima = vec![0.0f64; dim];
    for embedding in embeddings.iter() {
        for (i, value) in embedding.vector.iter().enumerate() {
            if value.abs() > maxima[i] {
                maxima[i] = value.abs();
            }
        }
    }

    for embedding in embeddings.iter_mut() {
        for (i, value) in embedding.vector.iter_mut().enumerate() {
            *value = if maxima[i] > 0.0 { *value / maxima[i] } else { 0.0 };
        }
    }
}

/// Extract and normalize embeddings for a whole corpus.
///
/// Output order follows input order. The result is corpus-relative;
/// mixing embeddings from different batches is invalid.
pub fn generate(rules: &[Rule], vocab: &Vocabulary) -> Vec<Embedding> {
    let mut embeddings: Vec<Embedding> = rules
        .iter()
        .map(|rule| Embedding {
            rule_id: rule.id.clone(),
            vector: extract_raw(rule, vocab),
        })
        .collect();
    normalize(&mut embeddings);
    embeddings
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::layout::STRUCTURAL_COUNT;

    fn rule(id: &str, query: &str, category: &str, platform: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            query: query.to_string(),
            category: category.to_string(),
            platform: platform.to_string(),
        }
    }

    #[test]
    fn test_structural_counts() {
        let vocab = Vocabulary::default();
        let r = rule(
            "r1",
            "SecurityEvent | where EventID == 4688 | where CommandLine contains \"vssadmin\" \
             | summarize count() by Computer | extend Risk = 1",
            "ransomware",
            "sentinel",
        );
        let v = extract_raw(&r, &vocab);

        assert_eq!(v.len(), vocab.feature_count());
        assert_eq!(v[0], 2.0); // two where clauses
        assert_eq!(v[1], 1.0); // summarize
        assert_eq!(v[2], 1.0); // extend
        assert_eq!(v[3], 0.0); // no join
        assert_eq!(v[6], 1.0); // contains
        assert_eq!(v[7], 1.0); // count
    }

    #[test]
    fn test_keyword_counting_is_token_based() {
        let vocab = Vocabulary::default();
        // "sourcetype" must not count as "or", "norm" must not count as "or"
        let r = rule("r1", "index=web sourcetype=access_norm", "malware", "splunk");
        let v = extract_raw(&r, &vocab);
        assert_eq!(v[8], 0.0); // logical_ops
    }

    #[test]
    fn test_indicator_blocks() {
        let vocab = Vocabulary::default();
        let r = rule("r1", "whatever", "Ransomware-Linux", "Microsoft Sentinel");
        let v = extract_raw(&r, &vocab);

        // ransomware is index 0 of the category block
        assert_eq!(v[STRUCTURAL_COUNT], 1.0);
        assert_eq!(v[STRUCTURAL_COUNT + 1], 0.0); // not malware
        // sentinel is index 0 of the platform block
        assert_eq!(v[STRUCTURAL_COUNT + vocab.categories.len()], 1.0);
    }

    #[test]
    fn test_unknown_metadata_yields_zero_indicators() {
        let vocab = Vocabulary::default();
        let r = rule("r1", "search *", "unknown", "unknown");
        let v = extract_raw(&r, &vocab);
        for value in &v[STRUCTURAL_COUNT..] {
            assert_eq!(*value, 0.0);
        }
    }

    #[test]
    fn test_query_length_feature() {
        let vocab = Vocabulary::default();
        let r = rule("r1", &"a".repeat(250), "unknown", "unknown");
        let v = extract_raw(&r, &vocab);
        assert!((v[5] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_scales_to_unit_max() {
        let mut embeddings = vec![
            Embedding { rule_id: "a".into(), vector: vec![2.0, 0.0, 5.0] },
            Embedding { rule_id: "b".into(), vector: vec![4.0, 0.0, 1.0] },
        ];
        normalize(&mut embeddings);

        assert_eq!(embeddings[0].vector, vec![0.5, 0.0, 1.0]);
        assert_eq!(embeddings[1].vector, vec![1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_normalize_zero_column_stays_zero() {
        let mut embeddings = vec![Embedding { rule_id: "a".into(), vector: vec![0.0, 3.0] }];
        normalize(&mut embeddings);
        assert_eq!(embeddings[0].vector[0], 0.0);
        assert_eq!(embeddings[0].vector[1], 1.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut embeddings = vec![
            Embedding { rule_id: "a".into(), vector: vec![2.0, 4.0] },
            Embedding { rule_id: "b".into(), vector: vec![1.0, 8.0] },
        ];
        normalize(&mut embeddings);
        let once = embeddings.clone();
        normalize(&mut embeddings);

        for (a, b) in once.iter().zip(embeddings.iter()) {
            assert_eq!(a.vector, b.vector);
        }
    }

    #[test]
    fn test_generate_preserves_order_and_ids() {
        let vocab = Vocabulary::default();
        let rules = vec![
            rule("r1", "a | where x", "malware", "splunk"),
            rule("r2", "b | where y", "phishing", "sentinel"),
        ];
        let embeddings = generate(&rules, &vocab);
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].rule_id, "r1");
        assert_eq!(embeddings[1].rule_id, "r2");
    }
}
