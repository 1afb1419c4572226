//! Main module for the Docent CLI application.
//!
//! Handles command parsing, configuration loading, and dispatch to the
//! library's stores and pipeline.
//!
//! # Examples
//!
//! ```sh
//! docent init
//! docent ingest notes/*.txt
//! docent build-index
//! docent ask "What does the guide say about ownership?" --user mina
//! docent history mina
//! ```

use clap::Parser;
use once_cell::sync::OnceCell;
use std::{error::Error, fs, path::Path};
use tracing::{debug, info};

use docent::accounts::AccountStore;
use docent::chat::run_turn;
use docent::chunker::Chunker;
use docent::commands::{Cli, Commands};
use docent::config::{self, DocentConfig};
use docent::corpus;
use docent::embedder::OpenAiEmbedder;
use docent::history::ChatHistoryStore;
use docent::responder::Responder;
use docent::retriever::Retriever;
use docent::template::PromptAssembler;
use docent::vector_index::VectorIndex;

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return init();
    }

    let config_path = docent::config_dir()?.join("config.yaml");
    debug!("Loading config from: {}", config_path.display());
    let config = config::load_config(
        config_path
            .to_str()
            .ok_or("config path is not valid UTF-8")?,
    )?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Ingest { files } => ingest(&config, &files)?,
        Commands::BuildIndex => build_index(&config).await?,
        Commands::Ask {
            question,
            user,
            conversation,
        } => ask(&config, &question, &user, conversation).await?,
        Commands::History { user } => history(&config, &user)?,
        Commands::Register {
            username,
            email,
            password,
        } => register(&config, &username, &email, &password)?,
    }

    Ok(())
}

/// Write a starter config and a sample few-shot resource into the
/// per-platform config directory, and create the database schema.
fn init() -> Result<(), Box<dyn Error>> {
    let config_dir = docent::config_dir()?;
    fs::create_dir_all(&config_dir)?;

    let few_shot_path = config_dir.join("few_shot_prompts.json");
    info!("Creating few-shot resource: {}", few_shot_path.display());
    fs::write(
        &few_shot_path,
        r#"[
  {"prompt": "What is this assistant for?", "completion": "It answers questions grounded in the ingested documents."}
]
"#,
    )?;

    let config = DocentConfig {
        api_base: "http://localhost:5001/v1".to_string(),
        api_key: "CHANGEME".to_string(),
        model: "gpt-4o-mini".to_string(),
        embedding_model: "text-embedding-3-small".to_string(),
        db_url: config_dir.join("docent.db").display().to_string(),
        index_path: config_dir.join("index.yaml").display().to_string(),
        template_url: "http://localhost:8000/templates/docent".to_string(),
        few_shot_path: few_shot_path.display().to_string(),
        chunk_size: 1000,
        chunk_overlap: 100,
        retriever_top_k: 5,
        mmr_lambda: 0.5,
        timezone: "Asia/Seoul".to_string(),
    };

    let config_path = config_dir.join("config.yaml");
    info!("Creating config file: {}", config_path.display());
    fs::write(&config_path, serde_yaml::to_string(&config)?)?;

    let mut connection = config::establish_connection(&config.db_url)?;
    config::setup_schema(&mut connection)?;
    info!("Database initialized: {}", config.db_url);

    Ok(())
}

fn ingest(config: &DocentConfig, files: &[String]) -> Result<(), Box<dyn Error>> {
    let mut connection = config::establish_connection(&config.db_url)?;
    for file in files {
        let content = fs::read_to_string(file)?;
        let section = corpus::add_section(&mut connection, &content)?;
        println!("ingested {} as section {:?}", file, section.id);
    }
    Ok(())
}

async fn build_index(config: &DocentConfig) -> Result<(), Box<dyn Error>> {
    let mut connection = config::establish_connection(&config.db_url)?;
    let sections = corpus::all_contents(&mut connection)?;

    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
    let mut chunks = Vec::new();
    for section in &sections {
        chunks.extend(chunker.split(section));
    }
    info!(sections = sections.len(), chunks = chunks.len(), "chunked corpus");

    let embedder = OpenAiEmbedder::new(config);
    let mut index = VectorIndex::build(chunks, &embedder).await?;
    index.save(Path::new(&config.index_path))?;
    println!("indexed {} chunks into {}", index.len(), config.index_path);
    Ok(())
}

async fn ask(
    config: &DocentConfig,
    question: &str,
    user: &str,
    conversation: Option<i64>,
) -> Result<(), Box<dyn Error>> {
    let index = VectorIndex::load(Path::new(&config.index_path))?;
    let embedder = OpenAiEmbedder::new(config);
    let retriever = Retriever::new(
        &index,
        &embedder,
        config.retriever_top_k,
        config.mmr_lambda,
    );
    let assembler = PromptAssembler::new(config)?;
    let responder = Responder::new(config);

    let connection = config::establish_connection(&config.db_url)?;
    let mut history = ChatHistoryStore::new(connection, config.timezone()?);

    let (conversation_id, answer) = run_turn(
        &retriever,
        &assembler,
        &responder,
        &mut history,
        user,
        conversation,
        question,
    )
    .await?;

    println!("[conversation {conversation_id}]");
    println!("{}", answer.replace("<br>", "\n"));
    Ok(())
}

fn history(config: &DocentConfig, user: &str) -> Result<(), Box<dyn Error>> {
    let connection = config::establish_connection(&config.db_url)?;
    let mut store = ChatHistoryStore::new(connection, config.timezone()?);

    for (conversation_id, turns) in store.list_conversations(user)? {
        println!("conversation {conversation_id}");
        for turn in turns {
            println!("  You: {}", turn.user.replace("<br>", "\n       "));
            println!("  AI:  {}", turn.ai.replace("<br>", "\n       "));
        }
    }
    Ok(())
}

fn register(
    config: &DocentConfig,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn Error>> {
    let connection = config::establish_connection(&config.db_url)?;
    let mut store = AccountStore::new(connection);

    match store.create(username, email, password)? {
        Some(account) => println!("registered {} (id {})", account.username, account.id),
        None => println!("username or email already taken"),
    }
    Ok(())
}
