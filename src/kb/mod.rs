//! Knowledge-graph access and popularity ranking.
//!
//! The triple store is read-only at linking time. Terms (IRIs and literals)
//! are interned in a `terms` table; `triples` references them by id, so an
//! identifier is looked up once and then counted by integer key.

pub mod import;
pub mod ranker;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::BackendError;

pub use import::{parse_ntriple, ImportStats, NTriplesImporter, Triple};
pub use ranker::{PopularityRanker, RankedCandidate};
pub use sqlite::SqliteTripleStore;

/// Internal reference to an interned term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRef(pub i64);

/// Read-only view of a (subject, predicate, object) graph
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Resolve an identifier to its internal reference
    ///
    /// Returns `None` when the store has never seen the term.
    async fn lookup_id(&self, term: &str) -> Result<Option<TermRef>, BackendError>;

    /// Number of triples having `term` as object
    async fn count_as_object(&self, term: TermRef) -> Result<u64, BackendError>;

    /// Whether `subject predicate object` is in the graph
    async fn has_edge(
        &self,
        subject: TermRef,
        predicate: &str,
        object: &str,
    ) -> Result<bool, BackendError>;

    /// Check that the store can be queried
    async fn ping(&self) -> Result<(), BackendError>;
}

/// Canonical form of a term: trimmed, without one pair of surrounding `<>`
pub fn normalize_term(term: &str) -> &str {
    let term = term.trim();
    term.strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(term)
}
