/// Batched embedding generation for index builds
use super::{EmbeddingError, EmbeddingProvider};
use tracing::debug;

/// Embed a corpus in batches of `batch_size`
///
/// Output position `i` always holds the embedding of `documents[i]`; a batch
/// returning the wrong number of vectors or a vector of the wrong dimension
/// fails the whole call.
pub fn embed_documents(
    provider: &dyn EmbeddingProvider,
    documents: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let start = std::time::Instant::now();
    let batch_size = batch_size.max(1);
    let mut embeddings = Vec::with_capacity(documents.len());

    for chunk in documents.chunks(batch_size) {
        let batch = provider.embed_batch(chunk)?;

        if batch.len() != chunk.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                chunk.len(),
                batch.len()
            )));
        }

        if let Some(bad) = batch.iter().find(|e| e.len() != provider.dimension()) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: provider.dimension(),
                actual: bad.len(),
            });
        }

        embeddings.extend(batch);
    }

    debug!(
        "Embedded {} documents with {} in {}ms",
        documents.len(),
        provider.model_name(),
        start.elapsed().as_millis()
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.0; 4])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![0.0; 4]; texts.len().saturating_sub(1)])
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    #[test]
    fn test_batches_preserve_order() {
        let embedder = HashEmbedder::new(32);
        let documents: Vec<String> = (0..10).map(|i| format!("document number {}", i)).collect();

        let embeddings = embed_documents(&embedder, &documents, 3).unwrap();
        assert_eq!(embeddings.len(), 10);
        for (doc, embedding) in documents.iter().zip(embeddings.iter()) {
            assert_eq!(&embedder.embed_text(doc), embedding);
        }
    }

    #[test]
    fn test_empty_corpus() {
        let embedder = HashEmbedder::new(32);
        let embeddings = embed_documents(&embedder, &[], 8).unwrap();
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let documents = vec!["a".to_string(), "b".to_string()];
        let result = embed_documents(&ShortProvider, &documents, 8);
        assert!(matches!(result, Err(EmbeddingError::GenerationError(_))));
    }
}
