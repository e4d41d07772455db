//! kbase: search, inspect and load a tiered knowledge base.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kbase_core::config::{resolve_with_base, Config, Settings};
use kbase_embed::build_provider;
use kbase_retrieval::{DocumentFilter, RetrievalEngine, SearchOptions, SearchResponse};
use kbase_vector::LanceStore;

#[derive(Parser, Debug)]
#[command(name = "kbase", version, about = "Hierarchical semantic retrieval over a LanceDB knowledge base")]
struct Args {
    /// Configuration file; defaults to config.toml (+ config.<RUST_ENV>.toml) in the working directory
    #[arg(short, long, env = "KBASE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query through every configured axis and print the answers
    Search(SearchArgs),
    /// Record counts for every tier collection
    Stats,
    /// Check that every tier exists and matches the embedding dimension
    Validate,
    /// Store reachability, embedder and effective search settings as JSON
    Status,
    /// Load JSON Lines exports of documents and embedding records
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
struct SearchArgs {
    query: String,
    #[arg(long)]
    max_total: Option<usize>,
    #[arg(long)]
    max_per_axis: Option<usize>,
    /// Default cascade threshold (maximum distance)
    #[arg(long)]
    threshold: Option<f32>,
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
    /// Keep only documents with this source type
    #[arg(long)]
    source_type: Option<String>,
    /// Keep only documents in this language
    #[arg(long)]
    language: Option<String>,
    /// Print the full response as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ImportArgs {
    #[arg(long, value_name = "JSONL")]
    documents: Option<PathBuf>,
    #[arg(long, value_name = "JSONL")]
    records: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let Some(path) = path else {
        return Ok(Config::load()?.settings()?);
    };
    let mut settings = Config::from_file(path)?.settings()?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    settings.store.uri = resolve_with_base(base, &settings.store.uri).to_string_lossy().into_owned();
    if let Some(dir) = settings.embedding.model_dir.take() {
        settings.embedding.model_dir = Some(resolve_with_base(base, dir).to_string_lossy().into_owned());
    }
    Ok(settings)
}

async fn open_store(settings: &Settings) -> anyhow::Result<LanceStore> {
    let path = settings.store_path();
    LanceStore::open(&path, &settings.store.documents_table)
        .await
        .with_context(|| format!("opening store at {}", path.display()))
}

fn print_response(response: &SearchResponse) {
    if response.answers.is_empty() {
        println!("No matching documents.");
    }
    for (rank, answer) in response.answers.iter().enumerate() {
        println!("# {}", rank + 1);
        println!("{}", answer.to_markdown());
    }
    for axis in &response.axes {
        match (&axis.failure, &axis.collection) {
            (Some(reason), _) => eprintln!("axis {}: failed ({})", axis.axis, reason),
            (None, Some(collection)) => eprintln!("axis {}: {} hits from {}", axis.axis, axis.hits, collection),
            (None, None) => eprintln!("axis {}: {} hits", axis.axis, axis.hits),
        }
    }
    if response.filtered_count > 0 {
        eprintln!("{} answer(s) removed by filters", response.filtered_count);
    }
    if response.dropped_count > 0 {
        eprintln!("{} matched document(s) could not be loaded", response.dropped_count);
    }
    eprintln!("took {} ms", response.elapsed.as_millis());
}

async fn search(settings: Settings, args: SearchArgs) -> anyhow::Result<()> {
    let provider = build_provider(&settings.embedding)?;
    let store = open_store(&settings).await?;
    let engine = RetrievalEngine::new(provider, Arc::new(store));
    engine.validate(&settings.axes).await.context("configuration does not match the store")?;

    let mut options = SearchOptions::from_settings(&settings)
        .with_filter(DocumentFilter { source_type: args.source_type, language: args.language });
    if let Some(n) = args.max_total { options.max_total = n; }
    if let Some(n) = args.max_per_axis { options.max_per_axis = n; }
    if let Some(t) = args.threshold { options.threshold = t; }
    if let Some(ms) = args.timeout_ms { options.timeout = Duration::from_millis(ms); }

    let response = engine.search(&args.query, &options).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

async fn stats(settings: Settings) -> anyhow::Result<()> {
    let provider = build_provider(&settings.embedding)?;
    let store = open_store(&settings).await?;
    let engine = RetrievalEngine::new(provider, Arc::new(store));
    for s in engine.collection_stats(&settings.axes).await {
        match (s.records, s.error) {
            (Some(n), _) => println!("{:<12} {:<36} {:>10}", s.axis, s.collection, n),
            (None, Some(e)) => println!("{:<12} {:<36} error: {}", s.axis, s.collection, e),
            (None, None) => println!("{:<12} {:<36} {:>10}", s.axis, s.collection, "-"),
        }
    }
    Ok(())
}

async fn validate(settings: Settings) -> anyhow::Result<()> {
    let provider = build_provider(&settings.embedding)?;
    let store = open_store(&settings).await?;
    let engine = RetrievalEngine::new(provider, Arc::new(store));
    SearchOptions::from_settings(&settings).validate()?;
    engine.validate(&settings.axes).await?;
    println!("{} axes OK ({} dimensions)", settings.axes.len(), engine.provider().dim());
    Ok(())
}

async fn status(settings: Settings) -> anyhow::Result<()> {
    let provider = build_provider(&settings.embedding)?;
    let store = open_store(&settings).await?;
    let engine = RetrievalEngine::new(provider, Arc::new(store));
    let status = engine.status(&SearchOptions::from_settings(&settings)).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn import(settings: Settings, args: ImportArgs) -> anyhow::Result<()> {
    if args.documents.is_none() && args.records.is_none() {
        anyhow::bail!("nothing to import: pass --documents and/or --records");
    }
    let store = open_store(&settings).await?;
    let summary = kbase_vector::import::import_corpus(
        store.connection(),
        store.documents_table(),
        args.documents.as_deref(),
        args.records.as_deref(),
    )
    .await?;
    println!("documents: {}", summary.documents);
    for (collection, n) in &summary.records {
        println!("{}: {}", collection, n);
    }
    store.close();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = load_settings(args.config.as_deref())?;
    match args.command {
        Command::Search(a) => search(settings, a).await,
        Command::Stats => stats(settings).await,
        Command::Validate => validate(settings).await,
        Command::Status => status(settings).await,
        Command::Import(a) => import(settings, a).await,
    }
}
