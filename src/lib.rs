//! # Docent (library root)
//!
//! Docent is the core of a retrieval-augmented chat application:
//! - Corpus storage and chunking (`corpus`, `chunker`).
//! - Embedding + diversity-aware vector search (`embedder`, `vector_index`).
//! - Context retrieval and prompt assembly (`retriever`, `template`).
//! - Completion generation (`responder`).
//! - Durable chat history and accounts (`history`, `accounts`, `models`, `schema`).
//! - Per-turn orchestration (`chat`) and CLI plumbing (`commands`, `config`).
//!
//! The web/auth layer that fronts this crate is an external collaborator; it
//! calls in through [`retriever::Retriever::retrieve`],
//! [`template::PromptAssembler::assemble`], [`responder::Responder::respond`],
//! and the [`history::ChatHistoryStore`] operations. Everything here is one
//! synchronous unit of work per chat turn — no internal parallelism.
//!
//! ## Typical flow per turn
//! 1. [`history::ChatHistoryStore`] supplies prior turns.
//! 2. [`retriever::Retriever`] embeds the question and pulls a
//!    relevance/diversity-balanced context from the [`vector_index::VectorIndex`].
//! 3. [`template::PromptAssembler`] merges the hub template, few-shot
//!    examples, context, and history into one prompt.
//! 4. [`responder::Responder`] produces the completion.
//! 5. The turn is appended to history — only after full success.
//!
//! ## Index lifecycle
//! The vector index is built offline from the corpus (`docent build-index`),
//! serialized to disk, and loaded read-only at query time. A rebuild produces
//! a fresh instance that callers swap in; there is no global singleton.

use directories::ProjectDirs;
use std::error::Error;

pub mod accounts;
pub mod chat;
pub mod chunker;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod error;
pub mod history;
pub mod models;
pub mod responder;
pub mod retriever;
pub mod schema;
pub mod template;
pub mod vector_index;

/// Return the per-platform configuration directory used by Docent.
///
/// Uses [`directories::ProjectDirs`] with the application triple
/// `("io", "docent", "docent")`, so you get the right place on each OS
/// (e.g. `~/.config/docent` on Linux via XDG).
///
/// The directory is **not** created by this function; callers that need it
/// should create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be
/// determined.
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("io", "docent", "docent")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
