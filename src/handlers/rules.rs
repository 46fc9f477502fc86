//! Rule corpus handlers

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::HashSet;

use crate::engine::Rule;
use crate::storage::DocumentKind;
use crate::{AppError, AppResult, AppState};

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub stored: usize,
}

/// List the persisted rule corpus
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Rule>>> {
    let rules: Vec<Rule> = state.store.load(DocumentKind::Rules);
    Ok(Json(rules))
}

/// Replace the rule corpus wholesale.
///
/// Rule ids must be unique within the corpus; category/platform default
/// to "unknown" when absent from the payload.
pub async fn replace(
    State(state): State<AppState>,
    Json(rules): Json<Vec<Rule>>,
) -> AppResult<Json<ReplaceResponse>> {
    let mut seen = HashSet::new();
    for rule in &rules {
        if rule.id.is_empty() {
            return Err(AppError::ValidationError("Rule id must not be empty".to_string()));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(AppError::ValidationError(format!("Duplicate rule id: {}", rule.id)));
        }
    }

    state.store.save(DocumentKind::Rules, &rules)?;
    tracing::info!(rules = rules.len(), "rule corpus replaced");
    Ok(Json(ReplaceResponse { stored: rules.len() }))
}
