mod batch;
mod hashing;
mod keyword_index;
/// Embedding & Indexing
///
/// This module provides embedding generation and the two per-corpus indexes
/// that hybrid retrieval fuses.
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HashEmbedder for deterministic, model-free embedding
/// - Flat or HNSW L2 index for vector similarity search
/// - Tantivy for keyword search
mod provider;
mod vector_index;

pub use batch::embed_documents;
pub use hashing::HashEmbedder;
pub use keyword_index::{tokenize, KeywordIndex, KeywordIndexError};
pub use provider::{build_provider, EmbeddingError, EmbeddingProvider, FastEmbedProvider};
pub use vector_index::{VectorHit, VectorIndex, VectorIndexError};
