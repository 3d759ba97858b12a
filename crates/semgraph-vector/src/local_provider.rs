//! A deterministic, local `VectorSearch` implementation (spec.md §4.5).
//! No real embedding model ships in this workspace (spec.md §1
//! Non-goals); this stand-in hashes overlapping word shingles into a
//! fixed-width vector so tests and the CLI demo get stable, repeatable
//! similarity behavior without a network call or a multi-gigabyte model
//! download. Grounded in the teacher's `local_provider.rs`
//! (`LocalEmbeddingConfig`, a provider struct implementing the shared
//! embedding trait) with the Candle/BERT machinery replaced by hashing,
//! since the model itself is out of scope here.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use semgraph_core::{CodeGraphError, Result, VectorSearch};

#[derive(Debug, Clone)]
pub struct LocalHashingConfig {
    pub dimensions: usize,
}

impl Default for LocalHashingConfig {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

#[derive(Debug, Clone)]
struct StoredVector {
    metadata: HashMap<String, String>,
}

/// Deterministic hashing-based stand-in for a real vector index. Upsert
/// is idempotent by construction: the same `(id, vector)` pair always
/// overwrites the prior entry for that id.
pub struct LocalHashingVectorSearch {
    config: LocalHashingConfig,
    vectors: DashMap<String, StoredVector>,
}

impl LocalHashingVectorSearch {
    pub fn new(config: LocalHashingConfig) -> Self {
        Self { config, vectors: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn hash_text(&self, text: &str) -> Vec<f32> {
        let mut bucket_sums = vec![0.0f32; self.config.dimensions];
        for token in text.split_whitespace() {
            let mut hasher = Sha256::new();
            hasher.update(token.to_lowercase().as_bytes());
            let digest = hasher.finalize();
            let bucket = (u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize) % self.config.dimensions;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            bucket_sums[bucket] += sign;
        }

        let norm: f32 = bucket_sums.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut bucket_sums {
                *v /= norm;
            }
        }
        bucket_sums
    }
}

impl Default for LocalHashingVectorSearch {
    fn default() -> Self {
        Self::new(LocalHashingConfig::default())
    }
}

#[async_trait]
impl VectorSearch for LocalHashingVectorSearch {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.hash_text(t)).collect())
    }

    async fn upsert(&self, ids: Vec<String>, vectors: Vec<Vec<f32>>, metadata: Vec<HashMap<String, String>>) -> Result<()> {
        if ids.len() != vectors.len() || ids.len() != metadata.len() {
            return Err(CodeGraphError::VectorIndex(format!(
                "upsert arity mismatch: {} ids, {} vectors, {} metadata entries",
                ids.len(),
                vectors.len(),
                metadata.len()
            )));
        }
        for (id, meta) in ids.into_iter().zip(metadata) {
            self.vectors.insert(id, StoredVector { metadata: meta });
        }
        Ok(())
    }

    async fn delete_orphaned(&self, repo_id: &str, current_keys: &[String]) -> Result<usize> {
        let current: std::collections::HashSet<&str> = current_keys.iter().map(|s| s.as_str()).collect();
        let to_remove: Vec<String> = self
            .vectors
            .iter()
            .filter(|entry| entry.value().metadata.get("repo_id").map(|r| r.as_str()) == Some(repo_id))
            .filter(|entry| !current.contains(entry.key().as_str()))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = to_remove.len();
        for id in to_remove {
            self.vectors.remove(&id);
        }
        Ok(removed)
    }
}
