//! # Prompt assembly
//!
//! Builds the single prompt string sent to the generation service. The
//! composition order is fixed and load-bearing for response quality and
//! reproducibility:
//!
//! 1. An instruction prefix fetched from the prompt-template provider —
//!    curated externally, treated as opaque text, fetched per call.
//! 2. The few-shot examples, in configured order, each rendered as
//!    `"Q: {prompt}\nA: {completion}"`.
//! 3. A suffix holding the retrieved context, a labelled line embedding the
//!    running chat history, and the raw user input, each on its own line.
//!
//! Apart from the template fetch there is no I/O here — pure string
//! composition. A template fetch failure is [`DocentError::TemplateUnavailable`]
//! and is fatal for the turn: prompts must stay reproducible, so there is no
//! silent fallback to a stale or built-in prefix.
//!
//! ## Few-shot resource
//!
//! A static, ordered JSON list of prompt/completion pairs, loaded once at
//! construction:
//!
//! ```json
//! [
//!   {"prompt": "What is ownership?", "completion": "Ownership is..."},
//!   {"prompt": "What is borrowing?", "completion": "Borrowing lets..."}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::DocentConfig;
use crate::error::{DocentError, Result};

/// One curated prompt/completion pair injected into every prompt to steer
/// style and format.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FewShotExample {
    /// The example question.
    pub prompt: String,
    /// The answer the model should imitate.
    pub completion: String,
}

/// Load the few-shot example resource from a JSON file, preserving order.
pub fn load_few_shots(path: &Path) -> Result<Vec<FewShotExample>> {
    debug!(path = %path.display(), "loading few-shot examples");
    let content = fs::read_to_string(path)?;
    let examples: Vec<FewShotExample> = serde_json::from_str(&content)?;
    Ok(examples)
}

/// Assembles prompts from template prefix, few-shot examples, retrieved
/// context, chat history, and the user's input.
pub struct PromptAssembler {
    client: reqwest::Client,
    template_url: String,
    few_shots: Vec<FewShotExample>,
}

impl PromptAssembler {
    /// Build an assembler from the application config, loading the few-shot
    /// resource from `config.few_shot_path`.
    pub fn new(config: &DocentConfig) -> Result<Self> {
        let few_shots = load_few_shots(Path::new(&config.few_shot_path))?;
        Ok(Self::from_parts(config.template_url.clone(), few_shots))
    }

    /// Build an assembler from explicit parts (used by tests and callers
    /// that manage the resource themselves).
    pub fn from_parts(template_url: String, few_shots: Vec<FewShotExample>) -> Self {
        Self {
            client: reqwest::Client::new(),
            template_url,
            few_shots,
        }
    }

    /// Fetch the instruction prefix from the template provider.
    async fn fetch_template(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.template_url)
            .send()
            .await
            .map_err(|e| DocentError::TemplateUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| DocentError::TemplateUnavailable(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| DocentError::TemplateUnavailable(e.to_string()))
    }

    /// Compose the full prompt.
    ///
    /// # Errors
    /// [`DocentError::TemplateUnavailable`] when the template provider
    /// cannot be reached — fatal for the turn, by design.
    pub async fn assemble(
        &self,
        context_text: &str,
        user_input: &str,
        chat_history_text: &str,
    ) -> Result<String> {
        let prefix = self.fetch_template().await?;

        let mut parts: Vec<String> = Vec::with_capacity(self.few_shots.len() + 2);
        parts.push(prefix);
        for example in &self.few_shots {
            parts.push(format!("Q: {}\nA: {}", example.prompt, example.completion));
        }
        parts.push(format!(
            "{context_text}\nHistory: {chat_history_text}\n{user_input}\n"
        ));

        Ok(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn examples() -> Vec<FewShotExample> {
        vec![
            FewShotExample {
                prompt: "first question".to_string(),
                completion: "first answer".to_string(),
            },
            FewShotExample {
                prompt: "second question".to_string(),
                completion: "second answer".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_assemble_orders_parts() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/templates/docent");
            then.status(200).body("You are a careful assistant.");
        });

        let assembler = PromptAssembler::from_parts(
            format!("{}/templates/docent", server.base_url()),
            examples(),
        );

        let prompt = assembler.assemble("ctx", "question", "prev").await.unwrap();

        let positions: Vec<usize> = [
            "You are a careful assistant.",
            "Q: first question\nA: first answer",
            "Q: second question\nA: second answer",
            "ctx",
            "History: prev",
            "question",
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap_or_else(|| panic!("missing {needle:?}")))
        .collect();

        for pair in positions.windows(2) {
            assert!(pair[0] < pair[1], "prompt parts out of order:\n{prompt}");
        }
    }

    #[tokio::test]
    async fn test_template_failure_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/templates/docent");
            then.status(503);
        });

        let assembler = PromptAssembler::from_parts(
            format!("{}/templates/docent", server.base_url()),
            examples(),
        );

        let err = assembler.assemble("ctx", "q", "").await.unwrap_err();
        assert!(matches!(err, DocentError::TemplateUnavailable(_)));
    }

    #[test]
    fn test_load_few_shots_preserves_order() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
  {{"prompt": "a", "completion": "1"}},
  {{"prompt": "b", "completion": "2"}},
  {{"prompt": "c", "completion": "3"}}
]"#
        )
        .unwrap();

        let examples = load_few_shots(file.path()).unwrap();
        let prompts: Vec<&str> = examples.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_few_shots_missing_file() {
        assert!(load_few_shots(Path::new("non/existent.json")).is_err());
    }
}
