//! Test doubles shared by the retrieval tests

use crate::embedding::{EmbeddingError, EmbeddingProvider, HashEmbedder};
use std::sync::atomic::{AtomicBool, Ordering};

/// Embeds like [`HashEmbedder`] until switched to failing
pub struct FailingProvider {
    inner: HashEmbedder,
    failing: AtomicBool,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            inner: HashEmbedder::new(32),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), EmbeddingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::GenerationError("backend down".to_string()));
        }
        Ok(())
    }
}

impl EmbeddingProvider for FailingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.check()?;
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.check()?;
        self.inner.embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}
