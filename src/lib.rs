//! tenant-rag - Per-tenant hybrid retrieval engine
//!
//! Keeps one hybrid (BM25 keyword + vector similarity) index per tenant and
//! answers ranked queries over short documentation snippets, such as the
//! schema descriptions of uploaded datasets.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod retrieval;

pub use error::{RagError, Result};
pub use retrieval::{HybridIndex, IndexStore, ScoredDocument, SearchError, TenantId};
