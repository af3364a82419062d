/// L2 nearest-neighbour index over one embedding per document
use crate::config::{IndexingConfig, VectorBackend};
use hnsw_rs::prelude::*;
use thiserror::Error;

/// Upper bound on HNSW layers (hnsw_rs caps this at 16)
const HNSW_MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Position of the document in the indexed collection
    pub position: usize,
    /// Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

enum Backend {
    /// Exact search: every vector is compared against the query
    Flat(Vec<Vec<f32>>),
    /// Approximate search over an HNSW graph
    Hnsw {
        graph: Hnsw<'static, f32, DistL2>,
        ef_search: usize,
    },
}

/// Vector index built once from a complete set of embeddings
///
/// Position `i` in the input embeddings is the id reported back in
/// [`VectorHit::position`].
pub struct VectorIndex {
    backend: Backend,
    dimension: usize,
    count: usize,
}

impl VectorIndex {
    /// Build an index over `embeddings`
    ///
    /// # Arguments
    /// * `embeddings` - One vector per document, in document order
    /// * `dimension` - Expected vector dimension (must match embedding dimension)
    /// * `config` - Backend selection and HNSW parameters
    pub fn build(
        embeddings: Vec<Vec<f32>>,
        dimension: usize,
        config: &IndexingConfig,
    ) -> Result<Self, VectorIndexError> {
        if embeddings.is_empty() {
            return Err(VectorIndexError::InitializationError(
                "Cannot build a vector index over an empty collection".to_string(),
            ));
        }

        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
            return Err(VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let count = embeddings.len();
        let backend = match config.vector_backend {
            VectorBackend::Flat => Backend::Flat(embeddings),
            VectorBackend::Hnsw => {
                let graph = Hnsw::<f32, DistL2>::new(
                    config.hnsw_m,
                    count,
                    HNSW_MAX_LAYERS,
                    config.hnsw_ef_construction,
                    DistL2 {},
                );
                for (position, vector) in embeddings.iter().enumerate() {
                    graph.insert((vector, position));
                }
                Backend::Hnsw {
                    graph,
                    ef_search: config.hnsw_ef_search,
                }
            }
        };

        Ok(Self {
            backend,
            dimension,
            count,
        })
    }

    /// Search for the `k` nearest neighbours of `query`
    ///
    /// # Returns
    /// At most `min(k, len())` hits in ascending distance; equal distances
    /// are ordered by ascending position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.count);
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<VectorHit> = match &self.backend {
            Backend::Flat(vectors) => vectors
                .iter()
                .enumerate()
                .map(|(position, vector)| VectorHit {
                    position,
                    distance: l2_distance(query, vector),
                })
                .collect(),
            Backend::Hnsw { graph, ef_search } => graph
                .search(query, k, (*ef_search).max(k))
                .into_iter()
                .map(|neighbour| VectorHit {
                    position: neighbour.d_id,
                    distance: neighbour.distance,
                })
                .collect(),
        };

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dimension: usize, axis: usize, value: f32) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = value;
        v
    }

    fn test_vectors() -> Vec<Vec<f32>> {
        let mut near_first = vec![0.0; 8];
        near_first[0] = 0.9;
        near_first[1] = 0.1;
        vec![unit(8, 0, 1.0), unit(8, 1, 1.0), near_first]
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::build(test_vectors(), 8, &IndexingConfig::default()).unwrap();
        assert_eq!(index.dimension(), 8);
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_flat_search_ascending_distance() {
        let index = VectorIndex::build(test_vectors(), 8, &IndexingConfig::default()).unwrap();

        let hits = index.search(&unit(8, 0, 1.0), 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_k_capped_at_len() {
        let index = VectorIndex::build(test_vectors(), 8, &IndexingConfig::default()).unwrap();
        assert_eq!(index.search(&unit(8, 0, 1.0), 10).unwrap().len(), 3);
        assert!(index.search(&unit(8, 0, 1.0), 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_broken_by_position() {
        let vectors = vec![unit(4, 0, 1.0), unit(4, 1, 1.0), unit(4, 2, 1.0)];
        let index = VectorIndex::build(vectors, 4, &IndexingConfig::default()).unwrap();

        // The zero vector is equidistant from every unit vector
        let hits = index.search(&[0.0; 4], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_hnsw_backend() {
        let config = IndexingConfig {
            vector_backend: VectorBackend::Hnsw,
            ..IndexingConfig::default()
        };
        let index = VectorIndex::build(test_vectors(), 8, &config).unwrap();

        let hits = index.search(&unit(8, 1, 1.0), 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 1);
        assert!(hits[0].distance < 1e-6);
    }

    #[test]
    fn test_dimension_validation() {
        let result = VectorIndex::build(vec![vec![1.0; 4]], 8, &IndexingConfig::default());
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension {
                expected: 8,
                actual: 4
            })
        ));

        let index = VectorIndex::build(test_vectors(), 8, &IndexingConfig::default()).unwrap();
        assert!(index.search(&[1.0; 3], 1).is_err());
    }

    #[test]
    fn test_empty_collection_rejected() {
        let result = VectorIndex::build(Vec::new(), 8, &IndexingConfig::default());
        assert!(result.is_err());
    }
}
