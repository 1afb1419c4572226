//! Response generation against an OpenAI-compatible chat completion API.
//!
//! The responder takes the fully assembled prompt and sends it as a single
//! user message, non-streaming, with temperature pinned to 0.0 so identical
//! prompts reproduce identical completions. Before the completion leaves this
//! module every `\n` is rewritten to the `<br>` marker; the history store and
//! the rendering layer both rely on single-line turn text.
//!
//! Provider failures surface as [`DocentError::GenerationService`] and are
//! not retried.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use tracing::debug;

use crate::config::DocentConfig;
use crate::error::{DocentError, Result};

/// Replace newlines with the `<br>` marker used for stored and rendered turn
/// text.
pub fn encode_line_breaks(text: &str) -> String {
    text.replace('\n', "<br>")
}

/// Generates completions for assembled prompts.
pub struct Responder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl Responder {
    /// Build a responder from the application config (`api_base`, `api_key`,
    /// `model`).
    pub fn new(config: &DocentConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    /// Send `prompt` as one user message and return the completion with line
    /// breaks encoded.
    ///
    /// # Errors
    /// [`DocentError::GenerationService`] on any provider failure. Callers
    /// must not persist anything for the turn when this fails.
    pub async fn respond(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let user_message =
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                name: None,
            });

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(0.0)
            .messages(vec![user_message])
            .build()
            .map_err(DocentError::GenerationService)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(DocentError::GenerationService)?;

        let mut completion = String::new();
        for choice in &response.choices {
            if let Some(ref content) = choice.message.content {
                completion.push_str(content);
            }
        }

        Ok(encode_line_breaks(&completion))
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

    #[test]
    fn test_encode_line_breaks() {
        assert_eq!(encode_line_breaks("one\ntwo\nthree"), "one<br>two<br>three");
        assert_eq!(encode_line_breaks("no breaks"), "no breaks");
        assert_eq!(encode_line_breaks(""), "");
    }

    #[tokio::test]
    async fn test_respond_encodes_completion() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "mock_model",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "first line\nsecond line"},
                    "finish_reason": "stop"
                }]
            }));
        });

        let responder = Responder::new(&mock_config(server.base_url()));
        let answer = responder.respond("a question").await.unwrap();

        mock.assert();
        assert_eq!(answer, "first line<br>second line");
    }

    #[tokio::test]
    async fn test_provider_failure_is_generation_service_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("upstream exploded");
        });

        let responder = Responder::new(&mock_config(server.base_url()));
        let err = responder.respond("a question").await.unwrap_err();
        assert!(matches!(err, DocentError::GenerationService(_)));
    }
}
