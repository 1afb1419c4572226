//! Command-line interface definition using `clap`.
//!
//! The `Cli` struct holds the parsed arguments; `Commands` enumerates the
//! subcommands. Parsing happens in `main`, which dispatches each variant to
//! the corresponding library call.

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default config file and a sample few-shot resource.
    Init,

    /// Ingest text files into the corpus; each file becomes one section.
    #[clap(name = "ingest")]
    Ingest {
        /// Paths of the files to ingest.
        files: Vec<String>,
    },

    /// Chunk and embed the corpus, then write the index snapshot.
    #[clap(name = "build-index")]
    BuildIndex,

    /// Ask a question; continues a conversation when an id is given.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to be asked.
        question: String,

        /// Username the conversation is recorded under.
        #[arg(long, short = 'u', default_value = "default")]
        user: String,

        /// Existing conversation id to continue.
        #[arg(long, short = 'c')]
        conversation: Option<i64>,
    },

    /// Print a user's conversations, newest first.
    #[clap(name = "history")]
    History {
        /// Username whose conversations to print.
        user: String,
    },

    /// Register a new account.
    #[clap(name = "register")]
    Register {
        username: String,
        email: String,
        password: String,
    },
}
