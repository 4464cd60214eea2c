//! Named-entity tagging.
//!
//! The pipeline treats the tagger as a black box behind [`EntityTagger`]:
//! given extracted text it returns mentions in document order. Overlapping or
//! repeated mentions are passed through untouched.

pub mod heuristic;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

pub use heuristic::CapitalizedSpanTagger;
pub use http::HttpTagger;

/// A span of text referring to a named entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    /// Surface text as it appears in the document
    pub text: String,
    /// Coarse type label (e.g. `PERSON`, `ORG`, `GPE`, or `ENTITY` when untyped)
    pub label: String,
    /// Byte offsets into the tagged text, when the tagger reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
}

impl Mention {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }
}

/// Recognizes entity mentions in plain text
#[async_trait]
pub trait EntityTagger: Send + Sync {
    /// Tag `text`, returning mentions in document order
    async fn tag(&self, text: &str) -> Result<Vec<Mention>, BackendError>;
}
