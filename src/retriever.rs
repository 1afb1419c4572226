//! Context retrieval for a chat turn.
//!
//! Given the user's question, the retriever embeds it, asks the vector index
//! for the top-k chunks with the diversity tradeoff applied, and joins the
//! chunk texts with newlines in the order the index returned them. The
//! result is the `context` block the prompt assembler embeds verbatim.
//!
//! An empty corpus is not an error: retrieval over an empty index yields an
//! empty context string, and the turn proceeds without grounding.

use tracing::debug;

use crate::embedder::Embedder;
use crate::error::Result;
use crate::vector_index::VectorIndex;

/// Reference defaults, matching the retrieval parameters the application
/// config falls back to.
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MMR_LAMBDA: f32 = 0.5;

/// Retrieves relevance/diversity-balanced context for a query.
pub struct Retriever<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    top_k: usize,
    mmr_lambda: f32,
}

impl<'a> Retriever<'a> {
    /// Create a retriever over a loaded index with fixed retrieval knobs.
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        top_k: usize,
        mmr_lambda: f32,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k,
            mmr_lambda,
        }
    }

    /// Embed `query_text` and return the joined context block.
    ///
    /// # Errors
    /// Embedding provider failures propagate as
    /// [`crate::error::DocentError::EmbeddingService`] — no retry. An empty
    /// index short-circuits to `Ok("")` before any provider call.
    pub async fn retrieve(&self, query_text: &str) -> Result<String> {
        if self.index.is_empty() {
            debug!("index is empty; returning empty context");
            return Ok(String::new());
        }

        let query_vector = self.embedder.embed(query_text).await?;
        let chunks = self
            .index
            .query(&query_vector, self.top_k, self.mmr_lambda)?;

        debug!(hits = chunks.len(), "retrieved context chunks");
        Ok(chunks.join("\n"))
    }
}
