//! Configuration management for tenant-rag
//!
//! Handles loading, environment overrides and validation of the retrieval
//! engine's tunables: which embedding backend to run, how vectors are
//! indexed, and how keyword and vector signals are weighted.

use crate::error::{RagError, Result};
use crate::retrieval::{FusionConfig, FusionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version written by this release
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Prefix for environment overrides: `TENANT_RAG_SECTION__KEY=value`
const ENV_PREFIX: &str = "TENANT_RAG_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Which embedding implementation produces document and query vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local sentence-transformer model via fastembed
    #[serde(alias = "fast_embed")]
    FastEmbed,
    /// Deterministic feature hashing, no model download
    Hash,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Model name, used by the fastembed backend
    pub model: String,
    /// Embedding dimension (384 for MiniLM)
    pub dimension: usize,
    /// Documents embedded per provider call during index builds
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::FastEmbed,
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            batch_size: 32,
        }
    }
}

/// Vector index implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Exact brute-force L2 search
    Flat,
    /// Approximate L2 search over an HNSW graph
    Hnsw,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub vector_backend: VectorBackend,
    /// HNSW M parameter (number of connections per layer)
    pub hnsw_m: usize,
    /// HNSW construction parameter (higher = better recall, slower build)
    pub hnsw_ef_construction: usize,
    /// HNSW search parameter (raised to k when smaller)
    pub hnsw_ef_search: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            vector_backend: VectorBackend::Flat,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
        }
    }
}

/// Score fusion and query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Weight of the max-normalized BM25 score
    pub keyword_weight: f32,
    /// Weight of the rank-decayed vector contribution
    pub semantic_weight: f32,
    /// Contribution lost per vector rank
    pub rank_decay: f32,
    /// Results returned when the caller does not ask for a count
    pub default_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.4,
            semantic_weight: 0.6,
            rank_decay: 0.1,
            default_top_k: crate::retrieval::DEFAULT_TOP_K,
        }
    }
}

impl RetrievalConfig {
    /// Fusion parameters derived from this configuration
    pub fn fusion(&self) -> std::result::Result<FusionConfig, FusionError> {
        FusionConfig::new(self.keyword_weight, self.semantic_weight, self.rank_decay)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when no file exists there
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::warn!(
                "Config file {} not found, using defaults. Run 'tenant-rag config init' to create one.",
                path.display()
            );
            let mut config = Config::default();
            config.apply_env_overrides();
            ConfigValidator::validate(&config)?;
            return Ok(config);
        }

        Self::load(&path)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TENANT_RAG_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `(KEY, value)` overrides; keys carry the `TENANT_RAG_` prefix
    pub fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__BACKEND" => {
                self.embedding.backend = match value.to_ascii_lowercase().as_str() {
                    "fastembed" | "fast_embed" => EmbeddingBackend::FastEmbed,
                    "hash" => EmbeddingBackend::Hash,
                    _ => return Err(invalid(path, value, "an embedding backend")),
                };
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "EMBEDDING__DIMENSION" => {
                self.embedding.dimension = parse(path, value)?;
            }
            "EMBEDDING__BATCH_SIZE" => {
                self.embedding.batch_size = parse(path, value)?;
            }
            "INDEXING__VECTOR_BACKEND" => {
                self.indexing.vector_backend = match value.to_ascii_lowercase().as_str() {
                    "flat" => VectorBackend::Flat,
                    "hnsw" => VectorBackend::Hnsw,
                    _ => return Err(invalid(path, value, "a vector backend")),
                };
            }
            "INDEXING__HNSW_M" => {
                self.indexing.hnsw_m = parse(path, value)?;
            }
            "INDEXING__HNSW_EF_CONSTRUCTION" => {
                self.indexing.hnsw_ef_construction = parse(path, value)?;
            }
            "INDEXING__HNSW_EF_SEARCH" => {
                self.indexing.hnsw_ef_search = parse(path, value)?;
            }
            "RETRIEVAL__KEYWORD_WEIGHT" => {
                self.retrieval.keyword_weight = parse(path, value)?;
            }
            "RETRIEVAL__SEMANTIC_WEIGHT" => {
                self.retrieval.semantic_weight = parse(path, value)?;
            }
            "RETRIEVAL__RANK_DECAY" => {
                self.retrieval.rank_decay = parse(path, value)?;
            }
            "RETRIEVAL__DEFAULT_TOP_K" => {
                self.retrieval.default_top_k = parse(path, value)?;
            }
            _ => {
                return Err(RagError::InvalidConfigValue {
                    path: path.to_string(),
                    message: "Unknown configuration key".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("tenant-rag").join("config.toml"))
    }
}

fn parse<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| invalid(path, value, std::any::type_name::<T>()))
}

fn invalid(path: &str, value: &str, expected: &str) -> RagError {
    RagError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}' as {}", value, expected),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            embedding: EmbeddingConfig::default(),
            indexing: IndexingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_fusion_weights() {
        let config = Config::default();
        let fusion = config.retrieval.fusion().unwrap();
        assert_eq!(fusion.keyword_weight, 0.4);
        assert_eq!(fusion.semantic_weight, 0.6);
        assert_eq!(fusion.rank_decay, 0.1);
        assert_eq!(config.retrieval.default_top_k, 5);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("TENANT_RAG_EMBEDDING__BACKEND", "hash"),
            ("TENANT_RAG_EMBEDDING__DIMENSION", "128"),
            ("TENANT_RAG_INDEXING__VECTOR_BACKEND", "HNSW"),
            ("TENANT_RAG_RETRIEVAL__DEFAULT_TOP_K", "3"),
            ("UNRELATED", "ignored"),
        ]));

        assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(config.embedding.dimension, 128);
        assert_eq!(config.indexing.vector_backend, VectorBackend::Hnsw);
        assert_eq!(config.retrieval.default_top_k, 3);
    }

    #[test]
    fn test_tuning_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("TENANT_RAG_INDEXING__HNSW_M", "8"),
            ("TENANT_RAG_INDEXING__HNSW_EF_CONSTRUCTION", "100"),
            ("TENANT_RAG_RETRIEVAL__RANK_DECAY", "0.05"),
        ]));

        assert_eq!(config.indexing.hnsw_m, 8);
        assert_eq!(config.indexing.hnsw_ef_construction, 100);
        assert_eq!(config.retrieval.rank_decay, 0.05);
    }

    #[test]
    fn test_unknown_override_key_rejected() {
        let mut config = Config::default();
        let result = config.set_value_from_env("RETRIEVAL__NO_SUCH_KEY", "1");
        assert!(matches!(
            result,
            Err(RagError::InvalidConfigValue { ref path, .. }) if path == "RETRIEVAL__NO_SUCH_KEY"
        ));

        // Unknown keys are skipped, leaving the rest applied
        config.apply_overrides(vars(&[
            ("TENANT_RAG_RETRIEVAL__NO_SUCH_KEY", "1"),
            ("TENANT_RAG_RETRIEVAL__DEFAULT_TOP_K", "7"),
        ]));
        assert_eq!(config.retrieval.default_top_k, 7);
    }

    #[test]
    fn test_bad_override_is_skipped() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[("TENANT_RAG_EMBEDDING__DIMENSION", "lots")]));
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let config: Config = toml::from_str(
            r#"
            [_meta]
            schema_version = "1.0.0"

            [embedding]
            backend = "hash"
            dimension = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.indexing.vector_backend, VectorBackend::Flat);
        assert_eq!(config.retrieval.keyword_weight, 0.4);
    }
}
