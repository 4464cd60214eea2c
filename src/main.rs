//! Entity Linker CLI
//!
//! Links entity mentions in a WARC archive and prints one
//! `DocumentID<TAB>mention<TAB>identifier` line per linked mention.
//!
//! Usage:
//!   entity-linker INPUT
//!
//! Backends and limits come from `$ENTITY_LINKER_CONFIG` (or
//! `config/entity_linker.yaml`) and the `ENTITY_LINKER_*` environment
//! overrides. Logs go to stderr; set `RUST_LOG` to change verbosity.

use std::io::{self, BufWriter};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_linker::{
    archive::ArchiveLines, error::ConfigError, open_archive, CapitalizedSpanTagger, ElasticLabelSearch, EntityTagger,
    HttpTagger, LabelSearch, LinkerConfig, LinkerError, Pipeline, RecordSplitter, RunSummary,
    SqliteTripleStore, TsvWriter,
};

const USAGE: &str = "Usage: entity-linker INPUT";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    dotenvy::dotenv().ok();

    // stdout carries the triples, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_linker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(Path::new(&args[1])).await {
        Ok(summary) => {
            tracing::info!(
                records_read = summary.records_read,
                records_extracted = summary.records_extracted,
                mentions = summary.mentions,
                triples = summary.triples,
                unlinked = summary.unlinked,
                interrupted = summary.interrupted,
                "Linking run complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Linking run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(input: &Path) -> Result<RunSummary, LinkerError> {
    let config = LinkerConfig::load()?;
    tracing::info!(
        search = %config.search_endpoint,
        index = %config.search_index,
        kb = %config.kb_path.display(),
        ranking = ?config.ranking,
        "Configuration loaded"
    );

    let lines = open_archive(input)?;

    let store = SqliteTripleStore::open_with_connections(
        &config.kb_path,
        config.kb_retry_policy(),
        config.kb_connections(),
    )
    .await
    .map_err(|source| LinkerError::KnowledgeBase {
        path: config.kb_path.clone(),
        source,
    })?;

    store.close_after(link(&config, lines, &store)).await
}

/// Connect the remaining backends and stream the archive through the pipeline
async fn link(
    config: &LinkerConfig,
    lines: ArchiveLines,
    store: &SqliteTripleStore,
) -> Result<RunSummary, LinkerError> {
    let search = ElasticLabelSearch::new(
        config.search_endpoint.clone(),
        config.search_index.clone(),
        config.search_label_field.clone(),
        config.search_retry_policy(),
    )
    .map_err(LinkerError::SearchUnreachable)?;
    search.ping().await.map_err(LinkerError::SearchUnreachable)?;

    let tagger: Arc<dyn EntityTagger> = match &config.tagger_endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Using remote tagger");
            let tagger = HttpTagger::new(endpoint.clone(), config.search_retry_policy()).map_err(
                |e| ConfigError::Invalid {
                    key: "tagger_endpoint",
                    message: e.to_string(),
                },
            )?;
            Arc::new(tagger)
        }
        None => Arc::new(CapitalizedSpanTagger),
    };

    let pipeline = Pipeline::from_config(config, tagger, Arc::new(search), Arc::new(store.clone()));

    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing records in flight");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let mut sink = TsvWriter::new(BufWriter::new(io::stdout()));
    pipeline.run(RecordSplitter::new(lines), &mut sink).await
}
