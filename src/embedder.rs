//! Embedding provider trait and the OpenAI-compatible implementation.
//!
//! The pipeline treats embedding as an opaque external service with the
//! contract `embed(text) -> vector`. [`OpenAiEmbedder`] talks to the
//! `/embeddings` endpoint of any OpenAI-compatible server; tests and the
//! index build accept anything implementing [`Embedder`], so deterministic
//! stubs slot in without network access.
//!
//! Provider failures surface as [`DocentError::EmbeddingService`] and are
//! propagated to the caller without retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DocentConfig;
use crate::error::{DocentError, Result};

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Build an embedder from the application config (`api_base`, `api_key`,
    /// `embedding_model`).
    pub fn new(config: &DocentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, chars = text.len(), "embedding text");

        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocentError::EmbeddingService(e.to_string()))?
            .error_for_status()
            .map_err(|e| DocentError::EmbeddingService(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| DocentError::EmbeddingService(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| DocentError::EmbeddingService("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn mock_config(api_base: String) -> DocentConfig {
        DocentConfig {
            api_key: "mock_api_key".to_string(),
            api_base,
            model: "mock_model".to_string(),
            embedding_model: "mock_embeddings".to_string(),
            db_url: String::new(),
            index_path: String::new(),
            template_url: String::new(),
            few_shot_path: String::new(),
            chunk_size: 1000,
            chunk_overlap: 100,
            retriever_top_k: 5,
            mmr_lambda: 0.5,
            timezone: "Asia/Seoul".to_string(),
        }
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200)
                .json_body(serde_json::json!({
                    "data": [{"embedding": [0.1, 0.2, 0.3]}]
                }));
        });

        let embedder = OpenAiEmbedder::new(&mock_config(server.base_url()));
        let vector = embedder.embed("hello").await.unwrap();

        mock.assert();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_provider_failure_is_embedding_service_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(500);
        });

        let embedder = OpenAiEmbedder::new(&mock_config(server.base_url()));
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, DocentError::EmbeddingService(_)));
    }
}
