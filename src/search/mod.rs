//! Candidate generation against a label-search index.
//!
//! [`LabelSearch`] abstracts the full-text index holding (identifier, label)
//! documents so that the Elasticsearch client can be swapped for an
//! in-memory double in tests.

pub mod elastic;
pub mod resolver;

use async_trait::async_trait;

use crate::error::BackendError;

pub use elastic::{escape_query_string, ElasticLabelSearch};
pub use resolver::{CandidateResolver, CandidateSet};

/// A single search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelHit {
    /// Knowledge-base identifier of the matched document
    pub id: String,
    /// Label that matched, when the index stores one
    pub label: Option<String>,
}

impl LabelHit {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }
}

/// Free-text search over entity labels
///
/// Implementations must be Send + Sync for use in async contexts.
#[async_trait]
pub trait LabelSearch: Send + Sync {
    /// Search for `query`, returning at most `limit` hits in relevance order
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<LabelHit>, BackendError>;

    /// Check that the backend answers at all
    async fn ping(&self) -> Result<(), BackendError>;
}
