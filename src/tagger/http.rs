//! Client for a remote tagging service.
//!
//! The service receives `{"text": "..."}` and answers with a JSON array of
//! `{"text", "label", "start"?, "end"?}` objects, which is what a thin
//! wrapper around spaCy's `doc.ents` returns.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EntityTagger, Mention};
use crate::error::BackendError;
use crate::retry::RetryPolicy;

const BACKEND: &str = "tagger";

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TaggedSpan {
    text: String,
    label: String,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

/// [`EntityTagger`] backed by an HTTP service
pub struct HttpTagger {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl HttpTagger {
    pub fn new(endpoint: impl Into<String>, policy: RetryPolicy) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| BackendError::from_http(BACKEND, policy.timeout, e))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            policy,
        })
    }

    async fn tag_once(&self, text: &str) -> Result<Vec<Mention>, BackendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TagRequest { text })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::from_http(BACKEND, self.policy.timeout, e))?;

        let spans: Vec<TaggedSpan> = response
            .json()
            .await
            .map_err(|e| BackendError::from_http(BACKEND, self.policy.timeout, e))?;

        Ok(spans
            .into_iter()
            .filter(|span| !span.text.trim().is_empty())
            .map(|span| {
                let mention = Mention::new(span.text, span.label);
                match (span.start, span.end) {
                    (Some(start), Some(end)) if start <= end => mention.with_span(start, end),
                    _ => mention,
                }
            })
            .collect())
    }
}

#[async_trait]
impl EntityTagger for HttpTagger {
    async fn tag(&self, text: &str) -> Result<Vec<Mention>, BackendError> {
        self.policy.run(BACKEND, || self.tag_once(text)).await
    }
}
