use clap::{Parser, Subcommand, ValueEnum};
use medrag_embed::{DisabledProvider, EmbedConfig, EmbeddingProvider, HashingProvider};
use medrag_retriever::{ClinicalQuery, Pipeline, PipelineConfig, corpus};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::Level;

/// A CLI tool to search clinical guideline text with hybrid retrieval.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of .txt guideline files (pages separated by form feeds)
    #[arg(short, long, default_value = ".")]
    corpus: PathBuf,

    /// TOML file overriding pipeline defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Embedding backend for the semantic signal
    #[arg(short, long, value_enum, default_value_t = Embedder::Hashing)]
    embedder: Embedder,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Embedder {
    /// Deterministic feature hashing, no model files
    Hashing,
    /// Lexical ranking only
    None,
    /// Local all-MiniLM-L6-v2 (requires the `fastembed` feature)
    Fastembed,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest the corpus and print the ingestion summary
    Ingest,
    /// Search the corpus
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Skip answer verification
        #[arg(long)]
        no_verify: bool,
    },
    /// Verified search that echoes patient context
    Clinical {
        question: String,
        /// Patient context as a JSON object
        #[arg(long)]
        context: Option<String>,
    },
    /// Ingest the corpus and print pipeline status
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    let provider = build_provider(args.embedder).await?;
    let pipeline = Pipeline::new(config, provider)?;

    let documents = corpus::load_corpus(&args.corpus)?;
    let summary = pipeline.ingest(&documents).await?;

    match args.command {
        Commands::Ingest => print_json(&summary),
        Commands::Search {
            query,
            top_k,
            no_verify,
        } => print_json(&pipeline.search(&query, top_k, !no_verify).await?),
        Commands::Clinical { question, context } => {
            let patient_context = context
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .map_err(|e| anyhow::anyhow!("Invalid --context JSON: {e}"))?;
            let query = ClinicalQuery {
                question,
                patient_context,
            };
            print_json(&pipeline.clinical_search(query).await?)
        }
        Commands::Status => print_json(&pipeline.status().await),
    }
}

async fn build_provider(embedder: Embedder) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    let provider: Option<Arc<dyn EmbeddingProvider>> = match embedder {
        Embedder::None => None,
        Embedder::Hashing => Some(Arc::new(HashingProvider::new(
            EmbedConfig::new("hashing"),
        )?)),
        Embedder::Fastembed => Some(fastembed_provider().await),
    };
    Ok(provider)
}

#[cfg(feature = "fastembed")]
async fn fastembed_provider() -> Arc<dyn EmbeddingProvider> {
    match medrag_embed::FastEmbedProvider::create(EmbedConfig::default()).await {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!("FastEmbed unavailable, continuing lexically: {}", e);
            Arc::new(DisabledProvider::new(e.to_string()))
        }
    }
}

#[cfg(not(feature = "fastembed"))]
async fn fastembed_provider() -> Arc<dyn EmbeddingProvider> {
    tracing::warn!("Built without the fastembed feature, continuing lexically");
    Arc::new(DisabledProvider::new("built without the fastembed feature"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
