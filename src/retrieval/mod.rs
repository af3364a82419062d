//! Hybrid Retrieval
//!
//! Per-tenant hybrid search: BM25 keyword scores over the whole collection
//! are max-normalized and fused with rank-decayed vector hits, and an
//! [`IndexStore`] keeps one immutable [`HybridIndex`] per tenant.

mod documents;
mod fusion;
mod hybrid;
mod store;
#[cfg(test)]
mod test_support;

pub use documents::describe_dataset;
pub use fusion::{fuse_scores, rank_scores, FusionConfig, FusionError};
pub use hybrid::{HybridIndex, IndexOptions, SearchError};
pub use store::{IndexStore, TenantId};

use serde::{Deserialize, Serialize};

/// Results returned when a caller does not ask for a specific count
pub const DEFAULT_TOP_K: usize = 5;

/// A document with its combined relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Position of the document in its index's collection
    pub position: usize,

    /// Document text
    pub text: String,

    /// Combined keyword + vector score (higher is better, not bounded)
    pub score: f32,
}

impl ScoredDocument {
    pub fn new(position: usize, text: String, score: f32) -> Self {
        Self {
            position,
            text,
            score,
        }
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        let doc = ScoredDocument::new(0, "Dataset région.csv".to_string(), 1.0);
        assert_eq!(doc.preview(100), "Dataset région.csv");
        assert_eq!(doc.preview(10), "Dataset ré...");
    }
}
