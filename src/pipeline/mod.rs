//! Pipeline driver: records in, result triples out.
//!
//! ```text
//!  archive lines ──► RecordSplitter ──► [bounded channel] ──► link_record × workers
//!  (blocking thread)                                              │  extract
//!                                                                 │  tag
//!                                                                 │  resolve + rank (per mention)
//!                                                                 ▼
//!                                                  TripleSink (input order)
//! ```
//!
//! Records are linked concurrently but emitted in archive order, and the
//! triples of one record stay contiguous and in mention order.

mod output;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::archive::{RawRecord, RecordExtractor};
use crate::config::{LinkerConfig, RankingMode};
use crate::error::{LinkerError, Result};
use crate::kb::{PopularityRanker, TripleStore};
use crate::search::{CandidateResolver, LabelSearch};
use crate::tagger::{EntityTagger, Mention};

pub use output::{ResultTriple, TripleSink, TsvWriter};

/// Run limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Stop after this many records have been read
    pub max_records: Option<usize>,
    /// Records linked concurrently
    pub workers: usize,
    /// Mentions of one record resolved concurrently
    pub mention_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_records: None,
            workers: 4,
            mention_concurrency: 4,
        }
    }
}

/// Counters shared between the reader thread and the workers
#[derive(Debug, Default)]
struct RunStats {
    records_read: AtomicUsize,
    records_extracted: AtomicUsize,
    mentions: AtomicUsize,
    triples: AtomicUsize,
    unlinked: AtomicUsize,
}

/// Totals for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Payloads taken from the splitter (including ones that failed extraction)
    pub records_read: usize,
    /// Records with an identifier and HTML text
    pub records_extracted: usize,
    pub mentions: usize,
    pub triples: usize,
    /// Mentions that got no identifier
    pub unlinked: usize,
    /// The run stopped early on a shutdown request
    pub interrupted: bool,
}

/// The composed linking pipeline
pub struct Pipeline {
    extractor: RecordExtractor,
    tagger: Arc<dyn EntityTagger>,
    resolver: CandidateResolver,
    ranker: PopularityRanker,
    settings: PipelineSettings,
    shutdown: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        extractor: RecordExtractor,
        tagger: Arc<dyn EntityTagger>,
        resolver: CandidateResolver,
        ranker: PopularityRanker,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            tagger,
            resolver,
            ranker,
            settings: PipelineSettings {
                workers: settings.workers.max(1),
                mention_concurrency: settings.mention_concurrency.max(1),
                ..settings
            },
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Assemble a pipeline around the given backends using `config`
    pub fn from_config(
        config: &LinkerConfig,
        tagger: Arc<dyn EntityTagger>,
        search: Arc<dyn LabelSearch>,
        store: Arc<dyn TripleStore>,
    ) -> Self {
        let extractor = RecordExtractor::new(
            Arc::new(crate::archive::TagStripper),
            config.content_type_marker.clone(),
        );
        let resolver = CandidateResolver::new(search, config.search_result_cap);
        let mut ranker = PopularityRanker::new(store)
            .with_id_prefix(config.kb_id_prefix.clone())
            .with_concurrency(config.candidate_concurrency);
        if config.ranking == RankingMode::TypeAware {
            ranker = ranker
                .with_type_constraints(config.type_predicate.clone(), config.type_constraints.clone());
        }
        let settings = PipelineSettings {
            max_records: config.max_records,
            workers: config.workers,
            mention_concurrency: config.mention_concurrency,
        };
        Self::new(extractor, tagger, resolver, ranker, settings)
    }

    /// Flag that stops the reader when set; in-flight records still finish
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Link every record from `records` and hand the triples to `sink`.
    ///
    /// `records` is drained on a blocking thread. Only a sink write failure
    /// or a crashed reader aborts the run; backend failures cost individual
    /// mentions.
    pub async fn run<I, S>(&self, records: I, sink: &mut S) -> Result<RunSummary>
    where
        I: Iterator<Item = RawRecord> + Send + 'static,
        S: TripleSink + ?Sized,
    {
        let stats = Arc::new(RunStats::default());
        let (tx, rx) = mpsc::channel::<RawRecord>(self.settings.workers * 2);
        let limit = self.settings.max_records.unwrap_or(usize::MAX);

        info!(
            workers = self.settings.workers,
            max_records = ?self.settings.max_records,
            "Starting linking run"
        );

        let reader = {
            let stats = Arc::clone(&stats);
            let shutdown = Arc::clone(&self.shutdown);
            tokio::task::spawn_blocking(move || {
                for record in records.take(limit) {
                    if shutdown.load(Ordering::SeqCst) {
                        return true;
                    }
                    stats.records_read.fetch_add(1, Ordering::SeqCst);
                    if tx.blocking_send(record).is_err() {
                        // Receiver gone: the run is aborting
                        break;
                    }
                }
                false
            })
        };

        let run_stats: &RunStats = &stats;
        let mut linked = ReceiverStream::new(rx)
            .map(move |record| self.link_record(record, run_stats))
            .buffered(self.settings.workers);

        let mut write_result = Ok(());
        while let Some(triples) = linked.next().await {
            for triple in &triples {
                if let Err(err) = sink.emit(triple) {
                    write_result = Err(err);
                    break;
                }
                stats.triples.fetch_add(1, Ordering::SeqCst);
            }
            if write_result.is_err() {
                break;
            }
        }
        // Closes the channel so a blocked reader gives up
        drop(linked);

        let interrupted = reader
            .await
            .map_err(|e| LinkerError::Reader(e.to_string()))?;
        write_result?;
        sink.flush()?;

        let summary = RunSummary {
            records_read: stats.records_read.load(Ordering::SeqCst),
            records_extracted: stats.records_extracted.load(Ordering::SeqCst),
            mentions: stats.mentions.load(Ordering::SeqCst),
            triples: stats.triples.load(Ordering::SeqCst),
            unlinked: stats.unlinked.load(Ordering::SeqCst),
            interrupted,
        };
        if interrupted {
            warn!("Run interrupted, remaining records skipped");
        }
        Ok(summary)
    }

    /// Link one record; yields its triples in mention order
    async fn link_record(&self, record: RawRecord, stats: &RunStats) -> Vec<ResultTriple> {
        let Some(extracted) = self.extractor.extract(&record) else {
            debug!(bytes = record.payload.len(), "Skipping record without HTML text");
            return Vec::new();
        };
        let Some(document_id) = extracted.document_id else {
            debug!("Skipping record without WARC-Record-ID");
            return Vec::new();
        };
        stats.records_extracted.fetch_add(1, Ordering::SeqCst);

        let mentions = match self.tagger.tag(&extracted.text).await {
            Ok(mentions) => mentions,
            Err(err) => {
                warn!(document_id = %document_id, error = %err, "Tagging failed, skipping record");
                return Vec::new();
            }
        };
        let mention_count = mentions.len();
        stats.mentions.fetch_add(mention_count, Ordering::SeqCst);

        let chosen: Vec<Option<String>> = stream::iter(&mentions)
            .map(|mention| self.link_mention(mention))
            .buffered(self.settings.mention_concurrency)
            .collect()
            .await;

        let triples: Vec<ResultTriple> = mentions
            .into_iter()
            .zip(chosen)
            .filter_map(|(mention, entity)| {
                entity.map(|entity| ResultTriple::new(document_id.clone(), mention.text, entity))
            })
            .collect();

        let unlinked = mention_count - triples.len();
        stats.unlinked.fetch_add(unlinked, Ordering::SeqCst);
        debug!(
            document_id = %document_id,
            triples = triples.len(),
            unlinked,
            "Linked record"
        );
        triples
    }

    async fn link_mention(&self, mention: &Mention) -> Option<String> {
        let candidates = self.resolver.resolve(&mention.text).await;
        if candidates.is_empty() {
            return None;
        }
        self.ranker.rank(&candidates, &mention.label).await
    }
}
