//! SigScope - Detection Rule Similarity & Clustering Service
//!
//! Batch analysis over a corpus of detection rules: derives feature
//! embeddings, computes pairwise cosine similarity, groups near-duplicate
//! rules into clusters, and reports redundancy and coverage gaps with
//! tiered remediation recommendations.
//!
//! # Architecture
//!
//! ```text
//! rules.json ─► Feature Extractor ─► Similarity Engine ─► Cluster Builder
//!                                                              │
//!     clusters.json / similarity_matrix.json ◄─ Analysis Layer ┘
//! ```
//!
//! The presentation layer consumes the persisted JSON documents read-only.

mod config;
mod engine;
mod error;
mod handlers;
mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sigscope=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("SigScope starting...");
    tracing::info!(
        data_dir = %config.data_dir.display(),
        threshold = config.similarity_threshold,
        categories = config.vocabulary.categories.len(),
        platforms = config.vocabulary.platforms.len(),
        "engine configuration loaded"
    );

    // Open the document store
    let store = storage::DocumentStore::new(&config.data_dir)
        .map_err(|e| anyhow::anyhow!("failed to open document store: {e}"))?;

    // Build application state
    let state = AppState { store: Arc::new(store), config: config.clone() };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<storage::DocumentStore>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        // Rule corpus
        .route("/api/v1/rules", get(handlers::rules::list))
        .route("/api/v1/rules", post(handlers::rules::replace))
        // Analysis pipeline
        .route("/api/v1/embeddings", post(handlers::analysis::generate_embeddings))
        .route("/api/v1/clusters", post(handlers::analysis::run_clustering))
        .route("/api/v1/rules/:id/similar", get(handlers::analysis::find_similar))
        .route("/api/v1/rules/:id/overlap", get(handlers::analysis::overlap))
        .route("/api/v1/coverage", get(handlers::analysis::coverage))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}
