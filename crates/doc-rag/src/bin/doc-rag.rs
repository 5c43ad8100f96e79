//! doc-rag command line
//!
//! Run with: cargo run -p doc-rag -- ask https://paulgraham.com/worked.html --question "..."

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use doc_rag::{
    build_providers, IngestPipeline, LlmBackend, LlmConfig, QueryEngine, QueryOptions, RagConfig,
    SentenceChunker, SourceExtractor, TextExtractor, VectorIndex,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "doc-rag", about = "Ask questions about documents and web pages", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Embedding/completion backend (overrides the config file)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// API key for the openai backend
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Ollama,
    Openai,
}

#[derive(Subcommand)]
enum Command {
    /// Index the given sources and answer a question about them
    Ask {
        /// File paths or http(s) URLs
        #[arg(required = true)]
        sources: Vec<String>,
        /// Question to answer
        #[arg(long, short)]
        question: String,
        /// Number of nodes retrieved
        #[arg(long)]
        top_k: Option<usize>,
        /// Maximum chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Print the nodes a source splits into, without embedding anything
    Chunk {
        /// File path or http(s) URL
        source: String,
        /// Maximum chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Check that the configured backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Ask {
            sources,
            question,
            top_k,
            chunk_size,
        } => {
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
            }
            config.validate()?;
            ask(&config, &sources, &question).await
        }
        Command::Chunk { source, chunk_size } => {
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            chunk(&config, &source).await
        }
        Command::Health => health(&config).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RagConfig> {
    let mut config = match &cli.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RagConfig::default(),
    };

    match cli.backend {
        Some(Backend::Openai) if config.llm.backend != LlmBackend::OpenAi => {
            config.llm = LlmConfig::openai(String::new());
        }
        Some(Backend::Ollama) if config.llm.backend != LlmBackend::Ollama => {
            config.llm = LlmConfig::default();
        }
        _ => {}
    }
    if let Some(key) = &cli.api_key {
        config.llm.api_key = Some(key.clone());
    }

    Ok(config)
}

async fn ask(config: &RagConfig, sources: &[String], question: &str) -> anyhow::Result<()> {
    let (embedder, completion) = build_providers(&config.llm)?;
    let index = Arc::new(VectorIndex::new());
    let timeout = config.retrieval.timeout();

    let extractor = SourceExtractor::new(std::time::Duration::from_secs(config.llm.timeout_secs))?;
    let pipeline = IngestPipeline::new(
        Arc::new(extractor),
        SentenceChunker::new(config.chunking.chunk_size)?,
        Arc::clone(&embedder),
        Arc::clone(&index),
    )
    .with_timeout(timeout);

    for source in sources {
        let report = pipeline
            .ingest(source)
            .await
            .with_context(|| format!("ingesting {}", source))?;
        tracing::info!(
            "{}: {} documents, {} nodes",
            source,
            report.documents,
            report.nodes
        );
    }

    let engine = QueryEngine::new(
        index,
        embedder,
        completion,
        QueryOptions::from(&config.retrieval),
    );
    let result = engine.answer(question, config.retrieval.top_k).await?;

    println!("{}", result.answer_text.trim());
    if !result.citations.is_empty() {
        println!("\nSources:");
        for citation in &result.citations {
            println!(
                "  [{:.3}] node {} (#{} of document {})",
                citation.similarity, citation.node_id, citation.sequence_index, citation.document_id
            );
        }
    }

    Ok(())
}

async fn chunk(config: &RagConfig, source: &str) -> anyhow::Result<()> {
    let extractor = SourceExtractor::new(std::time::Duration::from_secs(config.llm.timeout_secs))?;
    let documents = extractor.extract(source).await?;
    let chunker = SentenceChunker::new(config.chunking.chunk_size)?;

    for document in &documents {
        for node in chunker.split(document)? {
            println!(
                "--- node {} ({} chars) ---\n{}\n",
                node.sequence_index,
                node.text.chars().count(),
                node.text
            );
        }
    }

    Ok(())
}

async fn health(config: &RagConfig) -> anyhow::Result<()> {
    let (embedder, completion) = build_providers(&config.llm)?;

    let embed_ok = embedder.health_check().await.unwrap_or(false);
    let complete_ok = completion.health_check().await.unwrap_or(false);

    println!(
        "embedding  {:<8} {}",
        embedder.name(),
        if embed_ok { "ok" } else { "unreachable" }
    );
    println!(
        "completion {:<8} {} ({})",
        completion.name(),
        if complete_ok { "ok" } else { "unreachable" },
        completion.model()
    );

    if !(embed_ok && complete_ok) {
        anyhow::bail!("backend at {} is not healthy", config.llm.base_url);
    }
    Ok(())
}
