//! Mention text -> candidate identifiers

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use super::LabelSearch;

/// Candidates for one mention, deduplicated by identifier.
///
/// Identifiers keep the order in which the search returned them first; each
/// keeps every label it matched under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    order: Vec<String>,
    labels: HashMap<String, BTreeSet<String>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit; a repeated identifier only gains the label
    pub fn insert(&mut self, id: impl Into<String>, label: Option<String>) {
        let id = id.into();
        if !self.labels.contains_key(&id) {
            self.order.push(id.clone());
        }
        let labels = self.labels.entry(id).or_default();
        if let Some(label) = label {
            labels.insert(label);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Labels matched by `id`
    pub fn labels(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.labels.get(id)
    }
}

impl<S: Into<String>> FromIterator<(S, Option<String>)> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = (S, Option<String>)>>(iter: T) -> Self {
        let mut set = CandidateSet::new();
        for (id, label) in iter {
            set.insert(id, label);
        }
        set
    }
}

/// Turns a mention into the set of knowledge-base entries it may refer to
#[derive(Clone)]
pub struct CandidateResolver {
    search: Arc<dyn LabelSearch>,
    cap: usize,
}

impl CandidateResolver {
    pub fn new(search: Arc<dyn LabelSearch>, cap: usize) -> Self {
        Self { search, cap }
    }

    /// Resolve `mention` to candidates.
    ///
    /// Never fails: a search error (after the backend's own retries) yields
    /// an empty set and the mention simply goes unlinked.
    pub async fn resolve(&self, mention: &str) -> CandidateSet {
        let mention = mention.trim();
        if mention.is_empty() {
            return CandidateSet::new();
        }

        match self.search.search(mention, self.cap).await {
            Ok(hits) => {
                let candidates: CandidateSet = hits
                    .into_iter()
                    .take(self.cap)
                    .map(|hit| (hit.id, hit.label))
                    .collect();
                debug!(mention, candidates = candidates.len(), "Resolved mention");
                candidates
            }
            Err(err) => {
                warn!(mention, error = %err, "Label search failed, dropping mention");
                CandidateSet::new()
            }
        }
    }
}
