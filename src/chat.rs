//! The per-turn pipeline: history → retrieve → assemble → respond → persist.
//!
//! Persistence happens only after the completion arrives; a failure anywhere
//! in the chain leaves the history store untouched, so a failed turn is
//! invisible. The user's text is recorded with the same `<br>` line-break
//! encoding applied to completions, keeping stored turn text single-line on
//! both sides.

use tracing::{info, warn};

use crate::error::Result;
use crate::history::{ChatHistoryStore, Turn};
use crate::responder::{Responder, encode_line_breaks};
use crate::retriever::Retriever;
use crate::template::PromptAssembler;

/// Render prior turns into the running history text embedded in the prompt.
fn render_history(turns: &[Turn]) -> String {
    let mut out = String::new();
    for turn in turns {
        out.push_str("\nUser: ");
        out.push_str(&turn.user);
        out.push_str("\nAI: ");
        out.push_str(&turn.ai);
    }
    out
}

/// Run one chat turn for `username`.
///
/// With `conversation` set, prior turns feed the prompt and the new turn is
/// appended to that conversation; without it (or when the id is unknown) a
/// fresh conversation is started. Returns the conversation id the turn
/// landed in and the encoded completion.
pub async fn run_turn(
    retriever: &Retriever<'_>,
    assembler: &PromptAssembler,
    responder: &Responder,
    history: &mut ChatHistoryStore,
    username: &str,
    conversation: Option<i64>,
    user_input: &str,
) -> Result<(i64, String)> {
    let prior_turns = match conversation {
        Some(id) => history.get_conversation(id)?,
        None => None,
    };
    let history_text = render_history(prior_turns.as_deref().unwrap_or(&[]));

    let context = retriever.retrieve(user_input).await?;
    let prompt = assembler.assemble(&context, user_input, &history_text).await?;
    let ai_text = responder.respond(&prompt).await?;

    let recorded_user = encode_line_breaks(user_input);
    let conversation_id = match conversation {
        Some(id) => {
            if history.append_turn(id, &recorded_user, &ai_text)? {
                id
            } else {
                warn!(conversation_id = id, "unknown conversation; starting a new one");
                history.append_new(username, &recorded_user, &ai_text)?
            }
        }
        None => history.append_new(username, &recorded_user, &ai_text)?,
    };

    info!(conversation_id, username, "turn completed");
    Ok((conversation_id, ai_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocentConfig, establish_connection, setup_schema};
    use crate::embedder::OpenAiEmbedder;
    use crate::error::DocentError;
    use crate::template::FewShotExample;
    use crate::vector_index::VectorIndex;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn mock_config(api_base: String, template_url: String) -> DocentConfig {
        DocentConfig {
            api_key: "mock_api_key".to_string(),
            api_base,
            model: "mock_model".to_string(),
            embedding_model: "mock_embeddings".to_string(),
            db_url: String::new(),
            index_path: String::new(),
            template_url,
            few_shot_path: String::new(),
            chunk_size: 1000,
            chunk_overlap: 100,
            retriever_top_k: 5,
            mmr_lambda: 0.5,
            timezone: "Asia/Seoul".to_string(),
        }
    }

    fn history_store() -> (ChatHistoryStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let mut conn = establish_connection(path.to_str().unwrap()).unwrap();
        setup_schema(&mut conn).unwrap();
        (
            ChatHistoryStore::new(conn, "Asia/Seoul".parse().unwrap()),
            dir,
        )
    }

    fn mount_embeddings(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200).json_body(serde_json::json!({
                "data": [{"embedding": [1.0, 0.0, 0.0]}]
            }));
        });
    }

    fn mount_template(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/template");
            then.status(200).body("Answer carefully.");
        });
    }

    fn mount_completion(server: &MockServer, body: &str) {
        let content = body.to_string();
        server.mock(move |when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "mock_model",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }));
        });
    }

    fn assembler_for(server: &MockServer) -> PromptAssembler {
        PromptAssembler::from_parts(
            format!("{}/template", server.base_url()),
            vec![FewShotExample {
                prompt: "example question".to_string(),
                completion: "example answer".to_string(),
            }],
        )
    }

    #[tokio::test]
    async fn test_turn_persists_encoded_texts() {
        let server = MockServer::start();
        mount_embeddings(&server);
        mount_template(&server);
        mount_completion(&server, "line one\nline two");

        let config = mock_config(server.base_url(), format!("{}/template", server.base_url()));
        let embedder = OpenAiEmbedder::new(&config);
        let index = VectorIndex::build(vec!["some context".to_string()], &embedder)
            .await
            .unwrap();
        let retriever = Retriever::new(&index, &embedder, 1, 0.5);
        let assembler = assembler_for(&server);
        let responder = Responder::new(&config);
        let (mut history, _dir) = history_store();

        let (id, ai_text) = run_turn(
            &retriever,
            &assembler,
            &responder,
            &mut history,
            "mina",
            None,
            "hello\nthere",
        )
        .await
        .unwrap();

        assert_eq!(ai_text, "line one<br>line two");

        let turns = history.get_conversation(id).unwrap().unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user, "hello<br>there");
        assert_eq!(turns[0].ai, "line one<br>line two");
    }

    #[tokio::test]
    async fn test_second_turn_appends_to_conversation() {
        let server = MockServer::start();
        mount_embeddings(&server);
        mount_template(&server);
        mount_completion(&server, "an answer");

        let config = mock_config(server.base_url(), format!("{}/template", server.base_url()));
        let embedder = OpenAiEmbedder::new(&config);
        let index = VectorIndex::build(vec!["some context".to_string()], &embedder)
            .await
            .unwrap();
        let retriever = Retriever::new(&index, &embedder, 1, 0.5);
        let assembler = assembler_for(&server);
        let responder = Responder::new(&config);
        let (mut history, _dir) = history_store();

        let (id, _) = run_turn(
            &retriever, &assembler, &responder, &mut history, "mina", None, "first",
        )
        .await
        .unwrap();
        let (second_id, _) = run_turn(
            &retriever, &assembler, &responder, &mut history, "mina", Some(id), "second",
        )
        .await
        .unwrap();

        assert_eq!(second_id, id);
        let turns = history.get_conversation(id).unwrap().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].user, "second");
    }

    #[tokio::test]
    async fn test_failed_generation_persists_nothing() {
        let server = MockServer::start();
        mount_embeddings(&server);
        mount_template(&server);
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500);
        });

        let config = mock_config(server.base_url(), format!("{}/template", server.base_url()));
        let embedder = OpenAiEmbedder::new(&config);
        let index = VectorIndex::build(vec!["some context".to_string()], &embedder)
            .await
            .unwrap();
        let retriever = Retriever::new(&index, &embedder, 1, 0.5);
        let assembler = assembler_for(&server);
        let responder = Responder::new(&config);
        let (mut history, _dir) = history_store();

        let err = run_turn(
            &retriever, &assembler, &responder, &mut history, "mina", None, "question",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DocentError::GenerationService(_)));
        assert!(history.list_conversations("mina").unwrap().is_empty());
    }

    #[test]
    fn test_render_history_format() {
        let turns = vec![
            Turn {
                user: "hi".to_string(),
                ai: "hello".to_string(),
            },
            Turn {
                user: "bye".to_string(),
                ai: "goodbye".to_string(),
            },
        ];
        assert_eq!(
            render_history(&turns),
            "\nUser: hi\nAI: hello\nUser: bye\nAI: goodbye"
        );
        assert_eq!(render_history(&[]), "");
    }
}
