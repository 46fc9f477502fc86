//! Analysis handlers
//!
//! Each handler builds a fresh engine from the configured vocabulary,
//! loads the corpus, runs the batch computation, and persists whatever
//! artifacts the run replaces. Unknown rule ids map to 404; an empty
//! corpus yields empty results, not errors.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::engine::{
    ClusteringAnalysis, CoverageReport, Embedding, OverlapReport, Rule, RuleEngine, SimilarRule,
};
use crate::storage::DocumentKind;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<f64>,
}

fn resolve_threshold(state: &AppState, query: &ThresholdQuery) -> AppResult<f64> {
    let threshold = query.threshold.unwrap_or(state.config.similarity_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AppError::ValidationError(format!(
            "threshold must be in [0, 1], got {}",
            threshold
        )));
    }
    Ok(threshold)
}

/// Regenerate and persist embeddings for the whole corpus
pub async fn generate_embeddings(State(state): State<AppState>) -> AppResult<Json<Vec<Embedding>>> {
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    let engine = RuleEngine::new(state.config.vocabulary.clone());

    let embeddings = engine.generate_embeddings(&rules);
    state.store.save(DocumentKind::Embeddings, &embeddings)?;
    Ok(Json(embeddings))
}

/// Run the clustering pipeline, persist clusters and the similarity
/// matrix, and return the corpus analysis
pub async fn run_clustering(
    State(state): State<AppState>,
    Query(query): Query<ThresholdQuery>,
) -> AppResult<Json<ClusteringAnalysis>> {
    let threshold = resolve_threshold(&state, &query)?;
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    let engine = RuleEngine::new(state.config.vocabulary.clone());

    let (analysis, matrix) = engine.cluster_rules(&rules, threshold)?;
    state.store.save(DocumentKind::Clusters, &analysis.clusters)?;
    state.store.save(DocumentKind::SimilarityMatrix, &matrix)?;
    Ok(Json(analysis))
}

/// Rules similar to one rule, descending by score
pub async fn find_similar(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Query(query): Query<ThresholdQuery>,
) -> AppResult<Json<Vec<SimilarRule>>> {
    let threshold = resolve_threshold(&state, &query)?;
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    let engine = RuleEngine::new(state.config.vocabulary.clone());

    let matches = engine.find_similar(&rules, &rule_id, threshold)?;
    Ok(Json(matches))
}

/// Query-text overlap between one rule and the rest of the corpus
pub async fn overlap(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> AppResult<Json<OverlapReport>> {
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    let engine = RuleEngine::new(state.config.vocabulary.clone());

    let report = engine.overlap_analysis(&rules, &rule_id)?;
    Ok(Json(report))
}

/// Corpus-wide coverage gap report
pub async fn coverage(State(state): State<AppState>) -> AppResult<Json<CoverageReport>> {
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    let engine = RuleEngine::new(state.config.vocabulary.clone());

    Ok(Json(engine.coverage_gap_analysis(&rules)))
}
