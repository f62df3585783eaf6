//! Offline feature-hashing embedder.
//!
//! Produces deterministic vectors without any network access. Quality is far
//! below a trained embedding model, but shared vocabulary between a query and
//! a rule fragment still lands them close together, which is enough for
//! small rule sets, local runs, and tests.

use async_trait::async_trait;
use copyguard_core::error::Result;
use copyguard_core::traits::Embedder;

/// Smallest vector width the hasher will produce.
const MIN_DIMENSIONS: usize = 8;

/// Deterministic hashing embedder (`provider = "local"`).
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(MIN_DIMENSIONS),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed synchronously. Empty or whitespace-only text yields a zero vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0_f32; self.dimensions];
        for feature in features(text) {
            let hash = fnv1a(&feature);
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + ((hash >> 48) & 0xFF) as f32 / 255.0;
            vector[index] += sign * weight;
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "local"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

/// Word unigrams/bigrams for ASCII runs, character unigrams/bigrams for
/// everything else (CJK text has no spaces to split on).
fn features(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut out = Vec::new();

    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for word in &words {
        out.push(format!("w:{word}"));
    }
    for pair in words.windows(2) {
        out.push(format!("w2:{}_{}", pair[0], pair[1]));
    }

    let mut prev: Option<char> = None;
    for c in lowered.chars() {
        if c.is_ascii() || c.is_whitespace() || !c.is_alphanumeric() {
            prev = None;
            continue;
        }
        out.push(format!("c:{c}"));
        if let Some(p) = prev {
            out.push(format!("c2:{p}{c}"));
        }
        prev = Some(c);
    }

    out
}

/// 64-bit FNV-1a. Must stay stable across toolchains: vectors get persisted.
fn fnv1a(value: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in value.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
