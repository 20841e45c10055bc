use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use matkon_core::llm::{create_provider_from_env, LlmProvider};
use matkon_core::{
    classify, normalize, ContentFetcher, DisabledFrameExtractor, FrameExtractor, HttpClient,
    HttpFrameExtractor, IngestRequest, Ingestor, MemoryStorage, MemoryStore, WebClient,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "matkon")]
#[command(about = "Matkon recipe ingestion CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which platform and extraction method a URL maps to
    Classify { url: String },
    /// Fetch a URL the way the pipeline would and print the content as JSON
    Fetch { url: String },
    /// Print the canonical form of an ingredient name
    Normalize { name: String },
    /// Run the full ingestion pipeline without saving anything.
    /// Uses the configured inference provider and frame extractor.
    Ingest {
        url: String,
        /// Skip frame extraction even if FRAME_EXTRACTOR_URL is set
        #[arg(long)]
        no_frames: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { url } => {
            let classification = classify(&url)?;
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::Fetch { url } => {
            fetch(&url).await?;
        }
        Commands::Normalize { name } => {
            println!("{}", normalize(&name));
        }
        Commands::Ingest { url, no_frames } => {
            ingest(&url, no_frames).await?;
        }
    }

    Ok(())
}

fn web_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(
        WebClient::new().context("Failed to build HTTP client")?,
    ))
}

async fn fetch(url: &str) -> Result<()> {
    let classification = classify(url)?;
    tracing::info!(
        url = %classification.url,
        platform = classification.platform.as_str(),
        "fetching"
    );
    let fetcher = ContentFetcher::new(web_client()?);

    let content = fetcher
        .fetch(&classification.url, classification.platform)
        .await?;
    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}

/// Dry run: real fetching and inference, in-memory storage and store.
async fn ingest(url: &str, no_frames: bool) -> Result<()> {
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider_from_env()?);
    tracing::info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        "inference provider ready"
    );
    let frames: Arc<dyn FrameExtractor> = match HttpFrameExtractor::from_env()? {
        Some(extractor) if !no_frames => Arc::new(extractor),
        _ => {
            tracing::info!("frame extraction disabled");
            Arc::new(DisabledFrameExtractor)
        }
    };

    let ingestor = Ingestor::new(
        web_client()?,
        provider,
        frames,
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryStore::new()),
    );

    let request = IngestRequest {
        url: Some(url.to_string()),
        images: None,
    };
    let recipe = ingestor.ingest(Uuid::nil(), request).await?;
    tracing::info!(
        title = %recipe.title,
        status = recipe.extraction_status.as_str(),
        ingredients = recipe.ingredients.len(),
        "dry run complete"
    );
    println!("{}", serde_json::to_string_pretty(&recipe)?);
    Ok(())
}
