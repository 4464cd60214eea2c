//! Entity Linker - named-entity linking over WARC web archives
//!
//! Reads an archive, finds entity mentions in each HTML record, looks the
//! mention text up in a label-search index and picks, among the candidates,
//! the entity with the most inbound references in a knowledge graph. Output
//! is one `DocumentID<TAB>mention<TAB>identifier` line per linked mention.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Archive (gzip / plain)  ->  RecordSplitter  ->  RawRecord       │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    RecordExtractor                              │
//! │          WARC-Record-ID + HTML body as plain text               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     EntityTagger                                │
//! │        (CapitalizedSpanTagger | HttpTagger) -> mentions         │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   CandidateResolver (LabelSearch / Elasticsearch)               │
//! │   PopularityRanker  (TripleStore / SQLite)                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 TripleSink (TSV on stdout)                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use entity_linker::{
//!     open_archive, CapitalizedSpanTagger, ElasticLabelSearch, LinkerConfig, Pipeline,
//!     RecordSplitter, SqliteTripleStore, TsvWriter,
//! };
//!
//! let config = LinkerConfig::load()?;
//! let store = SqliteTripleStore::open(&config.kb_path, config.kb_retry_policy()).await?;
//! let search = ElasticLabelSearch::new(
//!     &config.search_endpoint,
//!     &config.search_index,
//!     &config.search_label_field,
//!     config.search_retry_policy(),
//! )?;
//!
//! let pipeline = Pipeline::from_config(
//!     &config,
//!     Arc::new(CapitalizedSpanTagger),
//!     Arc::new(search),
//!     Arc::new(store),
//! );
//! let records = RecordSplitter::new(open_archive(Path::new("sample.warc.gz"))?);
//! let summary = pipeline.run(records, &mut TsvWriter::new(std::io::stdout())).await?;
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod kb;
pub mod pipeline;
pub mod retry;
pub mod search;
pub mod tagger;

// Re-export main types
pub use archive::{open_archive, RawRecord, RecordExtractor, RecordSplitter};
pub use config::{LinkerConfig, RankingMode};
pub use error::{BackendError, ConfigError, LinkerError, Result};
pub use kb::{PopularityRanker, SqliteTripleStore, TripleStore};
pub use pipeline::{Pipeline, PipelineSettings, ResultTriple, RunSummary, TripleSink, TsvWriter};
pub use retry::RetryPolicy;
pub use search::{CandidateResolver, CandidateSet, ElasticLabelSearch, LabelSearch};
pub use tagger::{CapitalizedSpanTagger, EntityTagger, HttpTagger, Mention};
