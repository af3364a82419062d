//! Weighted score fusion for combining keyword and vector signals

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be positive")]
    InvalidWeights,

    #[error("Invalid rank decay: must be a non-negative number")]
    InvalidRankDecay,
}

/// Configuration for fusion algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Weight applied to the max-normalized keyword score
    pub keyword_weight: f32,

    /// Weight applied to the rank-decayed vector contribution
    pub semantic_weight: f32,

    /// Fraction of the vector contribution lost per rank
    pub rank_decay: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.4,
            semantic_weight: 0.6,
            rank_decay: 0.1,
        }
    }
}

impl FusionConfig {
    pub fn new(
        keyword_weight: f32,
        semantic_weight: f32,
        rank_decay: f32,
    ) -> Result<Self, FusionError> {
        if !(keyword_weight.is_finite() && semantic_weight.is_finite())
            || keyword_weight <= 0.0
            || semantic_weight <= 0.0
        {
            return Err(FusionError::InvalidWeights);
        }

        if !rank_decay.is_finite() || rank_decay < 0.0 {
            return Err(FusionError::InvalidRankDecay);
        }

        Ok(Self {
            keyword_weight,
            semantic_weight,
            rank_decay,
        })
    }

    /// Vector contribution for a hit at `rank` (0 = nearest)
    ///
    /// Not clamped: past `1 / rank_decay` ranks the contribution turns
    /// negative and a vector hit lowers the document's score.
    pub fn vector_contribution(&self, rank: usize) -> f32 {
        (1.0 - rank as f32 * self.rank_decay) * self.semantic_weight
    }
}

/// Fuse per-document keyword scores with a vector ranking
///
/// score(i) = keyword_weight * keyword[i] / max(keyword)
///          + semantic_weight * (1 - rank(i) * rank_decay)   if i was a vector hit
///
/// The keyword maximum is replaced by 1 when it is not positive.
///
/// # Arguments
/// * `keyword_scores` - one score per document position
/// * `vector_ranking` - document positions, nearest first
/// * `config` - Fusion configuration
///
/// # Returns
/// One combined score per document position
pub fn fuse_scores(
    keyword_scores: &[f32],
    vector_ranking: &[usize],
    config: &FusionConfig,
) -> Vec<f32> {
    let max_keyword = keyword_scores
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let divisor = if max_keyword > 0.0 { max_keyword } else { 1.0 };

    let mut combined: Vec<f32> = keyword_scores
        .iter()
        .map(|score| (score / divisor) * config.keyword_weight)
        .collect();

    for (rank, position) in vector_ranking.iter().enumerate() {
        if let Some(score) = combined.get_mut(*position) {
            *score += config.vector_contribution(rank);
        }
    }

    combined
}

/// Order positions by score descending, ties by ascending position, and
/// keep the first `limit`
pub fn rank_scores(scores: &[f32], limit: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
