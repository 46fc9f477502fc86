//! Similarity Engine
//!
//! Cosine similarity between embeddings and the full O(n²) pairwise
//! matrix. Corpus sizes are small (hundreds of rules) so the quadratic
//! pass runs single-threaded; if that ever changes, row ranges partition
//! cleanly across workers.

use std::collections::BTreeMap;

use super::error::EngineError;
use super::types::{Embedding, SimilarityEntry};

/// Rules with score > this are eligible for a most_similar slot
const MOST_SIMILAR_MIN_SCORE: f64 = 0.5;

/// Cap on most_similar entries per rule
const MOST_SIMILAR_LIMIT: usize = 5;

/// Standard cosine similarity in [-1, 1].
///
/// A zero-magnitude vector on either side yields 0.0 (defined, not NaN).
/// Mismatched lengths are a programming error - embeddings must come from
/// the same batch.
pub fn cosine(a: &[f64], b: &[f64]) -> Result<f64, EngineError> {
    if a.len() != b.len() {
        return Err(EngineError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Build the full pairwise similarity matrix, one entry per rule.
///
/// Self-pairs are fixed at exactly 1.0 and included in the average.
/// most_similar ties break by corpus order (stable sort), the documented
/// reproducibility choice.
pub fn build_matrix(embeddings: &[Embedding]) -> Result<Vec<SimilarityEntry>, EngineError> {
    let mut matrix = Vec::with_capacity(embeddings.len());

    for (i, current) in embeddings.iter().enumerate() {
        let mut similarities = BTreeMap::new();
        let mut candidates: Vec<(String, f64)> = Vec::new();
        let mut total = 0.0;

        for (j, other) in embeddings.iter().enumerate() {
            let score = if i == j {
                1.0
            } else {
                cosine(&current.vector, &other.vector)?
            };
            total += score;
            similarities.insert(other.rule_id.clone(), score);
            if i != j && score > MOST_SIMILAR_MIN_SCORE {
                candidates.push((other.rule_id.clone(), score));
            }
        }

        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(MOST_SIMILAR_LIMIT);

        matrix.push(SimilarityEntry {
            rule_id: current.rule_id.clone(),
            average_similarity: total / embeddings.len() as f64,
            most_similar: candidates.into_iter().map(|(id, _)| id).collect(),
            similarities,
        });
    }

    Ok(matrix)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(id: &str, vector: Vec<f64>) -> Embedding {
        Embedding { rule_id: id.to_string(), vector }
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let score = cosine(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let score = cosine(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let score = cosine(&[1.0, 1.0], &[-1.0, -1.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero_not_nan() {
        let score = cosine(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_matrix_self_similarity_is_exactly_one() {
        let embeddings = vec![
            embedding("a", vec![1.0, 2.0]),
            embedding("b", vec![3.0, 1.0]),
        ];
        let matrix = build_matrix(&embeddings).unwrap();
        for entry in &matrix {
            assert_eq!(entry.similarities[&entry.rule_id], 1.0);
        }
    }

    #[test]
    fn test_matrix_symmetry() {
        let embeddings = vec![
            embedding("a", vec![1.0, 2.0, 0.5]),
            embedding("b", vec![3.0, 1.0, 2.0]),
            embedding("c", vec![0.1, 0.9, 0.4]),
        ];
        let matrix = build_matrix(&embeddings).unwrap();
        for left in &matrix {
            for right in &matrix {
                let ab = left.similarities[&right.rule_id];
                let ba = right.similarities[&left.rule_id];
                assert!((ab - ba).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_matrix_scores_in_range() {
        let embeddings = vec![
            embedding("a", vec![1.0, 0.0]),
            embedding("b", vec![-1.0, 0.0]),
            embedding("c", vec![0.0, 0.0]),
        ];
        let matrix = build_matrix(&embeddings).unwrap();
        for entry in &matrix {
            for score in entry.similarities.values() {
                assert!(*score >= -1.0 && *score <= 1.0);
            }
        }
    }

    #[test]
    fn test_most_similar_filters_and_caps() {
        // Seven near-identical vectors plus one orthogonal one
        let mut embeddings: Vec<Embedding> = (0..7)
            .map(|i| embedding(&format!("r{}", i), vec![1.0, 0.001 * i as f64]))
            .collect();
        embeddings.push(embedding("far", vec![0.0, 1.0]));

        let matrix = build_matrix(&embeddings).unwrap();
        let first = &matrix[0];
        assert_eq!(first.most_similar.len(), 5);
        assert!(!first.most_similar.contains(&"r0".to_string())); // excludes self
        assert!(!first.most_similar.contains(&"far".to_string())); // below 0.5
    }

    #[test]
    fn test_average_includes_self() {
        let embeddings = vec![
            embedding("a", vec![1.0, 0.0]),
            embedding("b", vec![0.0, 1.0]),
        ];
        let matrix = build_matrix(&embeddings).unwrap();
        // (1.0 + 0.0) / 2
        assert!((matrix[0].average_similarity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_is_deterministic() {
        let embeddings = vec![
            embedding("a", vec![1.0, 2.0]),
            embedding("b", vec![2.0, 1.0]),
            embedding("c", vec![1.0, 1.0]),
        ];
        let first = serde_json::to_string(&build_matrix(&embeddings).unwrap()).unwrap();
        let second = serde_json::to_string(&build_matrix(&embeddings).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
