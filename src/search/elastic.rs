//! Elasticsearch-compatible label search client

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{LabelHit, LabelSearch};
use crate::error::BackendError;
use crate::retry::RetryPolicy;

const BACKEND: &str = "search";

/// Characters with special meaning in `query_string` syntax
const RESERVED: &[char] = &[
    '\\', '+', '-', '=', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?',
    ':', '/',
];

/// Boolean operators are only recognised in upper case
static OPERATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:AND|OR|NOT)\b").unwrap());

/// Label search over `POST {endpoint}/{index}/_search`
pub struct ElasticLabelSearch {
    client: Client,
    endpoint: String,
    index: String,
    label_field: String,
    policy: RetryPolicy,
}

impl ElasticLabelSearch {
    pub fn new(
        endpoint: impl Into<String>,
        index: impl Into<String>,
        label_field: impl Into<String>,
        policy: RetryPolicy,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| BackendError::from_http(BACKEND, policy.timeout, e))?;
        let endpoint: String = endpoint.into();
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index: index.into(),
            label_field: label_field.into(),
            policy,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.endpoint, self.index)
    }

    async fn search_once(&self, body: &Value) -> Result<Vec<LabelHit>, BackendError> {
        let response = self
            .client
            .post(self.search_url())
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::from_http(BACKEND, self.policy.timeout, e))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::from_http(BACKEND, self.policy.timeout, e))?;

        parse_hits(&payload, &self.label_field)
    }
}

#[async_trait]
impl LabelSearch for ElasticLabelSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<LabelHit>, BackendError> {
        let body = json!({
            "query": { "query_string": { "query": escape_query_string(query) } },
            "size": limit,
        });
        let mut hits = self.policy.run(BACKEND, || self.search_once(&body)).await?;
        hits.truncate(limit);
        debug!(query, hits = hits.len(), "Label search");
        Ok(hits)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::from_http(BACKEND, self.policy.timeout, e))?;
        Ok(())
    }
}

/// Escape `text` for use as a literal `query_string` query.
///
/// Reserved characters get a backslash; `<` and `>` cannot be escaped in
/// this syntax and are replaced by spaces. Standalone `AND`, `OR` and `NOT`
/// are lowercased, which the analyzer matches the same way.
pub fn escape_query_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '<' | '>' => escaped.push(' '),
            c if RESERVED.contains(&c) => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    OPERATOR_RE
        .replace_all(&escaped, |caps: &Captures| caps[0].to_lowercase())
        .into_owned()
}

/// Read `hits.hits[]` out of a `_search` response
fn parse_hits(payload: &Value, label_field: &str) -> Result<Vec<LabelHit>, BackendError> {
    let hits = payload
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::Decode {
            backend: BACKEND,
            message: "response has no hits.hits array".to_string(),
        })?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let id = hit.get("_id").and_then(Value::as_str)?;
            let label = hit
                .get("_source")
                .and_then(|source| source.get(label_field))
                .and_then(|value| match value {
                    Value::String(s) => Some(s.clone()),
                    Value::Array(values) => values.iter().find_map(Value::as_str).map(String::from),
                    _ => None,
                });
            Some(LabelHit {
                id: id.to_string(),
                label,
            })
        })
        .collect())
}
