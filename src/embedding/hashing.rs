//! Feature-hashing embedder
//!
//! FNV-1a hashed unigrams and bigrams, signed and L2-normalized. Needs no
//! model download and is fully deterministic, which makes it the offline
//! backend and the one the test suite runs against.

use super::{EmbeddingError, EmbeddingProvider};

const BIGRAM_WEIGHT: f32 = 0.5;

/// Hash embedder using FNV-1a
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("fnv1a-hash-{}", dimension),
        }
    }

    /// Embed text into a unit vector (the zero vector when no token survives)
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return embedding;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            accumulate(&mut embedding, token, 1.0);
        }
        for pair in tokens.windows(2) {
            accumulate(&mut embedding, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_text(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

fn accumulate(embedding: &mut [f32], feature: &str, weight: f32) {
    let feature_hash = fnv1a(feature.as_bytes());
    let dims = embedding.len();

    // A handful of salted hashes per feature spreads each token over several
    // dimensions without touching every one of them.
    for salt in 0..4u64 {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&feature_hash.to_le_bytes());
        bytes[8..].copy_from_slice(&salt.to_le_bytes());
        let hash = fnv1a(&bytes);

        let slot = ((hash >> 1) % dims as u64) as usize;
        if hash & 1 == 0 {
            embedding[slot] += weight;
        } else {
            embedding[slot] -= weight;
        }
    }
}

fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    data.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
