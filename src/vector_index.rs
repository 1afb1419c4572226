//! # VectorIndex
//!
//! Persistent embedding index over corpus chunks.
//!
//! This module wraps a [HNSW](https://arxiv.org/abs/1603.09320) approximate
//! nearest-neighbor index (`hora` crate) together with an id → chunk-text
//! mapping and the raw embedding vectors. It is built offline from the
//! chunked corpus (one embedding per chunk), serialized to disk, and loaded
//! read-only at query time.
//!
//! ## Responsibilities
//! - **Build**: embed every chunk through an [`Embedder`] and index the vectors.
//! - **Query**: nearest-neighbor search re-ranked for diversity
//!   (maximal-marginal-relevance, see [`VectorIndex::query`]).
//! - **Persistence**: YAML metadata (dimension + chunks + vectors) next to a
//!   binary HNSW dump; rebuildable from scratch at any time.
//!
//! There is no global "current index": callers construct an instance, pass it
//! by reference, and hot-swap by building a fresh one and replacing the old.
//!
//! ## Quick Example
//! ```no_run
//! use docent::vector_index::VectorIndex;
//! # async fn demo(embedder: &dyn docent::embedder::Embedder) -> docent::error::Result<()> {
//! let chunks = vec!["Rust is great!".to_string(), "So is retrieval.".to_string()];
//! let index = VectorIndex::build(chunks, embedder).await?;
//! let query = embedder.embed("I love Rust!").await?;
//! let hits = index.query(&query, 1, 0.5)?;
//! println!("Top match: {}", hits[0]);
//! # Ok(()) }
//! ```

use hora::core::ann_index::{ANNIndex, SerializableIndex};
use hora::core::metrics::Metric;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::embedder::Embedder;
use crate::error::{DocentError, Result};

/// How many HNSW candidates to pull per requested result before the MMR
/// re-rank. A wider pool gives the diversity term something to choose from.
const CANDIDATE_FACTOR: usize = 4;

/// One indexed chunk: its text and its embedding.
///
/// The vector is kept (not just handed to HNSW) because the MMR re-rank
/// needs pairwise similarities between candidates.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct IndexEntry {
    text: String,
    vector: Vec<f32>,
}

/// Serialized form of the index metadata. The HNSW graph itself is dumped
/// to a sibling binary file and reloaded through `hora`.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Embedding index with diversity-aware search.
pub struct VectorIndex {
    /// ANN index for candidate retrieval. Entry ids are positions in `entries`.
    index: HNSWIndex<f32, usize>,
    /// Dimensionality of all vectors in the index.
    dimension: usize,
    /// Chunk texts and vectors, id = position.
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and build a fresh index.
    ///
    /// Embedding failures propagate as [`DocentError::EmbeddingService`];
    /// there is no partial index on failure. An empty chunk list produces a
    /// valid, empty index (queries against it fail with `IndexUnavailable`,
    /// but the retriever treats emptiness as "no context", not an error).
    pub async fn build(chunks: Vec<String>, embedder: &dyn Embedder) -> Result<Self> {
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension = 0usize;

        for chunk in chunks {
            let vector = embedder.embed(&chunk).await?;
            if dimension == 0 {
                dimension = vector.len();
            } else if vector.len() != dimension {
                return Err(DocentError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            entries.push(IndexEntry {
                text: chunk,
                vector,
            });
        }

        let index = Self::index_from_entries(dimension, &entries)?;
        info!(chunks = entries.len(), dimension, "vector index built");

        Ok(Self {
            index,
            dimension,
            entries,
        })
    }

    fn index_from_entries(
        dimension: usize,
        entries: &[IndexEntry],
    ) -> Result<HNSWIndex<f32, usize>> {
        let mut index = HNSWIndex::new(dimension.max(1), &HNSWParams::default());
        for (id, entry) in entries.iter().enumerate() {
            index
                .add(&entry.vector, id)
                .map_err(|_| DocentError::Index("failed to add vector".to_string()))?;
        }
        if !entries.is_empty() {
            index
                .build(Metric::Euclidean)
                .map_err(|_| DocentError::Index("failed to build index".to_string()))?;
        }
        Ok(index)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no chunks are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the binary HNSW dump that accompanies the YAML metadata.
    fn graph_path(path: &Path) -> PathBuf {
        path.with_extension("hnsw.bin")
    }

    /// Serialize metadata to YAML at `path` and dump the HNSW graph to a
    /// sibling `.hnsw.bin` file.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if !self.entries.is_empty() {
            let graph = Self::graph_path(path);
            self.index
                .dump(graph.to_str().ok_or_else(|| {
                    DocentError::Index("index path is not valid UTF-8".to_string())
                })?)
                .map_err(|_| DocentError::Index("failed to dump index".to_string()))?;
        }

        let snapshot = IndexSnapshot {
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        let yaml = serde_yaml::to_string(&snapshot)?;
        fs::write(path, yaml)?;
        debug!(path = %path.display(), "vector index saved");
        Ok(())
    }

    /// Reconstruct an index from a saved snapshot.
    ///
    /// The HNSW graph is reloaded from the sibling binary when chunks exist;
    /// an empty snapshot round-trips to an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)?;
        let snapshot: IndexSnapshot = serde_yaml::from_str(&yaml)?;

        let index = if snapshot.entries.is_empty() {
            HNSWIndex::new(snapshot.dimension.max(1), &HNSWParams::default())
        } else {
            let graph = Self::graph_path(path);
            HNSWIndex::load(graph.to_str().ok_or_else(|| {
                DocentError::Index("index path is not valid UTF-8".to_string())
            })?)
            .map_err(|_| DocentError::Index("failed to load index".to_string()))?
        };

        debug!(path = %path.display(), chunks = snapshot.entries.len(), "vector index loaded");

        Ok(Self {
            index,
            dimension: snapshot.dimension,
            entries: snapshot.entries,
        })
    }

    /// Return the `k` most relevant chunk texts for `query`, re-ranked so
    /// near-duplicates are not all returned.
    ///
    /// Selection is maximal-marginal-relevance: candidates come from the
    /// HNSW index, then results are picked one at a time maximising
    ///
    /// ```text
    /// lambda * sim(query, c) - (1 - lambda) * max over selected sim(c, s)
    /// ```
    ///
    /// with cosine similarity. `lambda` trades relevance against diversity:
    /// 0 = maximal diversity, 1 = pure relevance. Ties resolve to the
    /// earlier candidate in HNSW order, so the result is deterministic for a
    /// fixed index, query, `k`, and `lambda`.
    ///
    /// # Errors
    /// - [`DocentError::IndexUnavailable`] when the index holds no chunks.
    /// - [`DocentError::DimensionMismatch`] on a wrong-sized query vector.
    pub fn query(&self, query: &[f32], k: usize, lambda: f32) -> Result<Vec<String>> {
        if self.entries.is_empty() {
            return Err(DocentError::IndexUnavailable);
        }
        if query.len() != self.dimension {
            return Err(DocentError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch_k = (k * CANDIDATE_FACTOR).max(k).min(self.entries.len());
        let candidates = self.index.search(query, fetch_k);

        let lambda = lambda.clamp(0.0, 1.0);
        let mut selected: Vec<usize> = Vec::with_capacity(k);
        let mut remaining: Vec<usize> = candidates;

        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0usize;
            let mut best_score = f32::NEG_INFINITY;

            for (pos, &id) in remaining.iter().enumerate() {
                let relevance = cosine_similarity(query, &self.entries[id].vector);
                let redundancy = selected
                    .iter()
                    .map(|&s| cosine_similarity(&self.entries[id].vector, &self.entries[s].vector))
                    .fold(f32::NEG_INFINITY, f32::max);
                let novelty_penalty = if selected.is_empty() { 0.0 } else { redundancy };
                let score = lambda * relevance - (1.0 - lambda) * novelty_penalty;

                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        Ok(selected
            .into_iter()
            .map(|id| self.entries[id].text.clone())
            .collect())
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns `0.0` for empty vectors, mismatched lengths, or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}
