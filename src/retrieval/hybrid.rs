//! Hybrid index combining keyword and vector search over one document collection

use crate::config::{Config, IndexingConfig};
use crate::embedding::{
    embed_documents, EmbeddingError, EmbeddingProvider, KeywordIndex, KeywordIndexError,
    VectorIndex, VectorIndexError,
};
use crate::retrieval::{
    fuse_scores, rank_scores, FusionConfig, FusionError, ScoredDocument, TenantId, DEFAULT_TOP_K,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("No index found for tenant {tenant_id}. Upload and index datasets first.")]
    IndexNotFound { tenant_id: TenantId },

    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Keyword index failed: {0}")]
    KeywordIndex(#[from] KeywordIndexError),

    #[error("Vector index failed: {0}")]
    VectorIndex(#[from] VectorIndexError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Whether this is the absent-index condition rather than a backend failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::IndexNotFound { .. })
    }
}

/// Settings shared by every index an [`IndexStore`](super::IndexStore) creates
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub fusion: FusionConfig,
    pub indexing: IndexingConfig,
    /// Documents per embedding call; 0 embeds the whole corpus at once
    pub batch_size: usize,
    /// Result count for queries that do not pass one
    pub default_top_k: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            indexing: IndexingConfig::default(),
            batch_size: 0,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Result<Self, FusionError> {
        Ok(Self {
            fusion: config.retrieval.fusion()?,
            indexing: config.indexing.clone(),
            batch_size: config.embedding.batch_size,
            default_top_k: config.retrieval.default_top_k,
        })
    }
}

/// Keyword and vector indexes over the same documents, built together
struct SubIndexes {
    keyword: KeywordIndex,
    vector: VectorIndex,
}

/// Immutable hybrid index over one ordered document collection
///
/// Document positions are the identity both sub-indexes report, so the
/// collection is never reordered or mutated after construction. An empty
/// collection holds no sub-indexes and answers every search with no results.
pub struct HybridIndex {
    documents: Vec<String>,
    indexes: Option<SubIndexes>,
    provider: Arc<dyn EmbeddingProvider>,
    fusion: FusionConfig,
}

impl HybridIndex {
    /// Build both sub-indexes over `documents`
    ///
    /// Every document is tokenized into the keyword index and embedded with
    /// `provider`, which is kept to embed queries at search time.
    pub fn build(
        documents: Vec<String>,
        provider: Arc<dyn EmbeddingProvider>,
        options: &IndexOptions,
    ) -> Result<Self, SearchError> {
        if documents.is_empty() {
            return Ok(Self {
                documents,
                indexes: None,
                provider,
                fusion: options.fusion,
            });
        }

        let keyword = KeywordIndex::build(&documents)?;

        let batch_size = match options.batch_size {
            0 => documents.len(),
            n => n,
        };
        let embeddings = embed_documents(provider.as_ref(), &documents, batch_size)?;
        let vector = VectorIndex::build(embeddings, provider.dimension(), &options.indexing)?;

        Ok(Self {
            documents,
            indexes: Some(SubIndexes { keyword, vector }),
            provider,
            fusion: options.fusion,
        })
    }

    /// Search and return the `top_k` best documents, best first
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, SearchError> {
        Ok(self
            .search_with_scores(query, top_k)?
            .into_iter()
            .map(|doc| doc.text)
            .collect())
    }

    /// Search and return the `top_k` best documents with their combined scores
    ///
    /// Every document is scored lexically; the `top_k` nearest by embedding
    /// distance additionally receive a rank-decayed vector contribution.
    /// Results are ordered by combined score, ties by document position.
    pub fn search_with_scores(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "top_k must be at least 1".to_string(),
            ));
        }

        let Some(indexes) = &self.indexes else {
            return Ok(Vec::new());
        };

        let keyword_scores = indexes.keyword.score_all(query)?;

        let query_embedding = self.provider.embed(query)?;
        let hits = indexes.vector.search(&query_embedding, top_k)?;
        let vector_ranking: Vec<usize> = hits.iter().map(|hit| hit.position).collect();

        debug!(
            "Hybrid search over {} documents: {} keyword hits, {} vector hits",
            self.documents.len(),
            keyword_scores.iter().filter(|s| **s > 0.0).count(),
            vector_ranking.len()
        );

        let combined = fuse_scores(&keyword_scores, &vector_ranking, &self.fusion);

        Ok(rank_scores(&combined, top_k)
            .into_iter()
            .map(|(position, score)| {
                ScoredDocument::new(position, self.documents[position].clone(), score)
            })
            .collect())
    }

    /// The indexed documents, in position order
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_none()
    }

    /// Name of the model that embeds documents and queries
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

impl std::fmt::Debug for HybridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIndex")
            .field("documents", &self.documents.len())
            .field("model", &self.provider.model_name())
            .field("fusion", &self.fusion)
            .finish()
    }
}
