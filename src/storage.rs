//! Flat-file document storage
//!
//! Each artifact type (rules, embeddings, clusters, similarity matrix)
//! persists as a single JSON array rewritten in full on every run - there
//! is no incremental update model. Writes go to a temp file and rename
//! into place so a reader never observes a partial document, and a mutex
//! per document enforces the single-writer discipline.
//!
//! A missing or corrupt document loads as an empty corpus rather than
//! failing; downstream operations on an empty corpus return empty results.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The four persisted artifact types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Rules,
    Embeddings,
    Clusters,
    SimilarityMatrix,
}

impl DocumentKind {
    fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Rules => "rules.json",
            DocumentKind::Embeddings => "embeddings.json",
            DocumentKind::Clusters => "clusters.json",
            DocumentKind::SimilarityMatrix => "similarity_matrix.json",
        }
    }

    fn index(self) -> usize {
        match self {
            DocumentKind::Rules => 0,
            DocumentKind::Embeddings => 1,
            DocumentKind::Clusters => 2,
            DocumentKind::SimilarityMatrix => 3,
        }
    }
}

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sigscope")
}

/// Whole-document JSON store for the engine's artifacts
pub struct DocumentStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; 4],
}

impl DocumentStore {
    /// Open (and create if needed) a store rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir, locks: Default::default() })
    }

    fn path(&self, kind: DocumentKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// Load a document as a record array.
    ///
    /// Missing file or invalid JSON means "empty corpus", never an error.
    pub fn load<T: DeserializeOwned>(&self, kind: DocumentKind) -> Vec<T> {
        let _guard = self.locks[kind.index()].lock();
        let path = self.path(kind);
        if !path.exists() {
            return Vec::new();
        }

        match fs::read(&path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(document = kind.file_name(), %err, "corrupt document, treating as empty");
                    Vec::new()
                }
            },
            Err(err) => {
                tracing::warn!(document = kind.file_name(), %err, "unreadable document, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace a document with a new record array, atomically.
    pub fn save<T: Serialize>(&self, kind: DocumentKind, records: &[T]) -> Result<(), StorageError> {
        let _guard = self.locks[kind.index()].lock();
        let path = self.path(kind);
        let json = serde_json::to_vec_pretty(records)?;

        let tmp = path.with_extension("json.tmp");
        write_then_rename(&tmp, &path, &json)?;
        Ok(())
    }
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    fs::write(tmp, data)?;
    fs::rename(tmp, path)
}

// ============================================================================
// TESTS
// ============================================================================
