//! Knowledge-base import CLI
//!
//! Builds the SQLite triple store read by `entity-linker` from an N-Triples
//! dump (plain or gzip-compressed).
//!
//! Usage:
//!   kb_import --input latest-truthy.nt.gz --output assets/wikidata.sqlite
//!
//! Importing into an existing file appends to it; terms are shared.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_linker::kb::NTriplesImporter;
use entity_linker::{open_archive, SqliteTripleStore};

/// Load an N-Triples dump into a triple-store file
#[derive(Parser, Debug)]
#[command(name = "kb_import")]
#[command(about = "Build the entity-linker knowledge base from N-Triples")]
struct Args {
    /// N-Triples file (.nt or .nt.gz)
    #[arg(long, short)]
    input: PathBuf,

    /// SQLite file to create or extend
    #[arg(long, short, env = "ENTITY_LINKER_KB_PATH")]
    output: PathBuf,

    /// Triples per transaction
    #[arg(long, default_value_t = 10_000)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_linker=info,kb_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let started = Instant::now();

    let lines = open_archive(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    let store = SqliteTripleStore::create(&args.output)
        .await
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let importer = NTriplesImporter::new(store.clone(), args.batch_size);
    let stats = importer.import(lines).await.context("Import failed")?;
    store.close().await;

    tracing::info!(
        input = %args.input.display(),
        output = %args.output.display(),
        triples = stats.triples,
        skipped = stats.skipped,
        elapsed_secs = started.elapsed().as_secs(),
        "Knowledge base ready"
    );
    Ok(())
}
