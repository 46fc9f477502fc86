//! Configuration module

use std::env;
use std::path::PathBuf;

use crate::engine::Vocabulary;
use crate::storage::default_data_dir;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding the flat JSON documents
    pub data_dir: PathBuf,

    /// Default clustering/similarity threshold
    pub similarity_threshold: f64,

    /// Category/platform vocabulary for the engine
    pub vocabulary: Vocabulary,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut vocabulary = Vocabulary::default();
        if let Some(categories) = env_list("ENABLED_CATEGORIES") {
            vocabulary.categories = categories;
        }
        if let Some(platforms) = env_list("ENABLED_PLATFORMS") {
            vocabulary.platforms = platforms;
        }
        if let Some(expected) = env_list("EXPECTED_COVERAGE") {
            vocabulary.expected_coverage = expected;
        }

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),

            similarity_threshold: env::var("SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.7),

            vocabulary,

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Comma-separated env var as a trimmed, non-empty string list
fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let values: Vec<String> = raw
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_list_parsing() {
        env::set_var("SIGSCOPE_TEST_LIST", "Ransomware, phishing ,,Malware");
        let values = env_list("SIGSCOPE_TEST_LIST").unwrap();
        assert_eq!(values, vec!["ransomware", "phishing", "malware"]);
        env::remove_var("SIGSCOPE_TEST_LIST");
    }

    #[test]
    fn test_env_list_absent() {
        assert!(env_list("SIGSCOPE_TEST_MISSING").is_none());
    }
}
