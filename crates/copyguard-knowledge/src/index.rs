//! In-memory similarity index over rule chunks.
//!
//! Brute-force cosine similarity. Rule sets are small (tens to a few
//! thousand chunks), so a linear scan per query is cheap enough.

use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::types::RuleChunk;

/// Ordered chunks sharing one embedding dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    chunks: Vec<RuleChunk>,
    dimension: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from chunks, validating every embedding.
    pub fn from_chunks(chunks: Vec<RuleChunk>) -> Result<Self> {
        let mut index = Self::new();
        index.extend(chunks)?;
        Ok(index)
    }

    /// Append one chunk. The first chunk fixes the dimension.
    pub fn insert(&mut self, chunk: RuleChunk) -> Result<()> {
        let actual = chunk.embedding.len();
        if actual == 0 {
            return Err(CopyGuardError::Other(format!(
                "chunk from '{}' has an empty embedding",
                chunk.source_id
            )));
        }
        match self.dimension {
            Some(expected) if expected != actual => {
                return Err(CopyGuardError::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => self.dimension = Some(actual),
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Append many chunks; stops at the first invalid one.
    pub fn extend(&mut self, chunks: impl IntoIterator<Item = RuleChunk>) -> Result<()> {
        for chunk in chunks {
            self.insert(chunk)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn chunks(&self) -> &[RuleChunk] {
        &self.chunks
    }

    /// Top `k` chunks by decreasing cosine similarity.
    ///
    /// Equal scores keep insertion order, so results are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, RuleChunk)>> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(CopyGuardError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
            .collect();
        // Stable sort: ties stay in insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| (score, self.chunks[i].clone()))
            .collect())
    }
}

/// Cosine similarity; zero when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}
