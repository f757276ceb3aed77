use async_trait::async_trait;

use crate::{EmbeddingClient, EmbeddingError};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Offline embedder for air-gapped runs and tests.
///
/// Mixes per-character class counts with FNV-hashed word buckets, then
/// L2-normalizes. Purely lexical: similar wording scores high, meaning is
/// invisible. Deterministic across runs and platforms.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0f64; self.dimension];
        let lowered = text.to_lowercase();

        for byte in lowered.bytes() {
            let bucket = match byte {
                b'a'..=b'z' => (byte - b'a') as usize,
                b'0'..=b'9' => 26,
                b' ' | b'\t' | b'\n' => 27,
                b'.' | b',' | b';' | b':' => 28,
                b'-' | b'_' | b'\'' => 29,
                _ => 30,
            };
            vector[bucket % self.dimension] += 1.0;
        }

        // Word-level buckets separate texts that share letter frequencies.
        for word in lowered.split_whitespace() {
            let bucket = fnv1a_64(word.as_bytes()) as usize % self.dimension;
            vector[bucket] += 2.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[async_trait]
impl EmbeddingClient for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        Ok(self.vectorize(text))
    }

    fn provider_name(&self) -> &'static str {
        "hash"
    }
}
