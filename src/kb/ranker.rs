//! Disambiguation by inbound-reference count.
//!
//! Each candidate is scored by the number of triples that have it as object.
//! The highest score wins; among equal scores the candidate the search
//! returned first wins. Candidates the store does not know, or that fail to
//! score, take no part in the ranking.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{normalize_term, TermRef, TripleStore};
use crate::config::RankingMode;
use crate::search::CandidateSet;

/// A scored candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    /// Identifier as returned by the label search
    pub id: String,
    /// Inbound-reference count
    pub score: u64,
    term: TermRef,
}

/// Picks one identifier out of a [`CandidateSet`]
#[derive(Clone)]
pub struct PopularityRanker {
    store: Arc<dyn TripleStore>,
    id_prefix: Option<String>,
    mode: RankingMode,
    type_predicate: String,
    type_constraints: HashMap<String, Vec<String>>,
    concurrency: usize,
}

/// Candidates scored at once unless configured otherwise
pub const DEFAULT_CANDIDATE_CONCURRENCY: usize = 2;

impl PopularityRanker {
    /// Baseline popularity ranker
    pub fn new(store: Arc<dyn TripleStore>) -> Self {
        Self {
            store,
            id_prefix: None,
            mode: RankingMode::Popularity,
            type_predicate: String::new(),
            type_constraints: HashMap::new(),
            concurrency: DEFAULT_CANDIDATE_CONCURRENCY,
        }
    }

    /// Score at most `n` candidates of one mention at a time
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Prefix bare identifiers (e.g. `Q76`) before looking them up
    pub fn with_id_prefix(mut self, prefix: Option<String>) -> Self {
        self.id_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    /// Prefer candidates whose class fits the mention label
    pub fn with_type_constraints(
        mut self,
        predicate: impl Into<String>,
        constraints: HashMap<String, Vec<String>>,
    ) -> Self {
        self.mode = RankingMode::TypeAware;
        self.type_predicate = predicate.into();
        self.type_constraints = constraints;
        self
    }

    /// Store key for a search identifier
    pub fn store_key(&self, id: &str) -> String {
        let id = normalize_term(id);
        match &self.id_prefix {
            Some(prefix) if !id.contains("://") && !id.starts_with(prefix.as_str()) => {
                format!("{prefix}{id}")
            }
            _ => id.to_string(),
        }
    }

    /// Score every candidate the store knows, best first.
    ///
    /// The sort is stable, so equal scores keep first-seen order.
    pub async fn ranked(&self, candidates: &CandidateSet) -> Vec<RankedCandidate> {
        let scored: Vec<Option<RankedCandidate>> = stream::iter(candidates.ids())
            .map(|id| self.score(id))
            .buffered(self.concurrency)
            .collect()
            .await;
        let mut ranked: Vec<RankedCandidate> = scored.into_iter().flatten().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Choose the identifier for a mention with coarse type `label`.
    ///
    /// Returns `None` when no candidate could be scored.
    pub async fn rank(&self, candidates: &CandidateSet, label: &str) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let ranked = self.ranked(candidates).await;

        if self.mode == RankingMode::TypeAware {
            if let Some(classes) = self.type_constraints.get(label) {
                if let Some(best) = self.first_of_type(&ranked, classes).await {
                    return Some(best);
                }
                debug!(label, "No candidate matches the type constraint");
            }
        }

        ranked.into_iter().next().map(|c| c.id)
    }

    async fn score(&self, id: &str) -> Option<RankedCandidate> {
        let key = self.store_key(id);
        let term = match self.store.lookup_id(&key).await {
            Ok(Some(term)) => term,
            Ok(None) => {
                debug!(id, "Candidate not in knowledge base");
                return None;
            }
            Err(err) => {
                warn!(id, error = %err, "Knowledge base lookup failed, excluding candidate");
                return None;
            }
        };
        match self.store.count_as_object(term).await {
            Ok(score) => Some(RankedCandidate {
                id: id.to_string(),
                score,
                term,
            }),
            Err(err) => {
                warn!(id, error = %err, "Popularity count failed, excluding candidate");
                None
            }
        }
    }

    async fn first_of_type(&self, ranked: &[RankedCandidate], classes: &[String]) -> Option<String> {
        for candidate in ranked {
            for class in classes {
                match self
                    .store
                    .has_edge(candidate.term, &self.type_predicate, class)
                    .await
                {
                    Ok(true) => return Some(candidate.id.clone()),
                    Ok(false) => {}
                    Err(err) => {
                        warn!(id = %candidate.id, error = %err, "Type check failed");
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory store: id -> (ref, inbound count), plus typed edges
    #[derive(Default)]
    struct MemoryStore {
        terms: HashMap<String, (TermRef, u64)>,
        types: HashSet<(TermRef, String)>,
        broken: HashSet<String>,
    }

    impl MemoryStore {
        fn with(entries: &[(&str, u64)]) -> Self {
            let terms = entries
                .iter()
                .enumerate()
                .map(|(i, (id, count))| (id.to_string(), (TermRef(i as i64 + 1), *count)))
                .collect();
            Self {
                terms,
                ..Self::default()
            }
        }

        fn typed(mut self, id: &str, class: &str) -> Self {
            let term = self.terms[id].0;
            self.types.insert((term, class.to_string()));
            self
        }
    }

    #[async_trait]
    impl TripleStore for MemoryStore {
        async fn lookup_id(&self, term: &str) -> Result<Option<TermRef>, BackendError> {
            if self.broken.contains(term) {
                return Err(BackendError::Timeout {
                    backend: "kb",
                    millis: 5000,
                });
            }
            Ok(self.terms.get(term).map(|(r, _)| *r))
        }

        async fn count_as_object(&self, term: TermRef) -> Result<u64, BackendError> {
            Ok(self
                .terms
                .values()
                .find(|(r, _)| *r == term)
                .map(|(_, count)| *count)
                .unwrap_or(0))
        }

        async fn has_edge(
            &self,
            subject: TermRef,
            _predicate: &str,
            object: &str,
        ) -> Result<bool, BackendError> {
            Ok(self.types.contains(&(subject, object.to_string())))
        }

        async fn ping(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    /// Store whose lookups take a while and record how many overlap
    #[derive(Default)]
    struct SlowStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TripleStore for SlowStore {
        async fn lookup_id(&self, term: &str) -> Result<Option<TermRef>, BackendError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(term.parse().ok().map(TermRef))
        }

        async fn count_as_object(&self, term: TermRef) -> Result<u64, BackendError> {
            Ok(term.0 as u64)
        }

        async fn has_edge(&self, _: TermRef, _: &str, _: &str) -> Result<bool, BackendError> {
            Ok(false)
        }

        async fn ping(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn candidates(ids: &[&str]) -> CandidateSet {
        ids.iter().map(|id| (*id, None)).collect()
    }

    #[tokio::test]
    async fn test_highest_count_wins() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[
            ("A", 5),
            ("B", 9),
            ("C", 2),
        ])));
        let chosen = ranker.rank(&candidates(&["A", "B", "C"]), "PERSON").await;
        assert_eq!(chosen.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_tie_keeps_first_seen() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[("A", 5), ("B", 5)])));
        assert_eq!(
            ranker.rank(&candidates(&["A", "B"]), "").await.as_deref(),
            Some("A")
        );
        assert_eq!(
            ranker.rank(&candidates(&["B", "A"]), "").await.as_deref(),
            Some("B")
        );
    }

    #[tokio::test]
    async fn test_empty_and_unknown() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[("A", 5)])));
        assert_eq!(ranker.rank(&CandidateSet::new(), "").await, None);
        assert_eq!(ranker.rank(&candidates(&["X", "Y"]), "").await, None);
        assert_eq!(
            ranker.rank(&candidates(&["X", "A"]), "").await.as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_zero_count_is_still_a_candidate() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[("A", 0)])));
        assert_eq!(
            ranker.rank(&candidates(&["A"]), "").await.as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_store_error_excludes_candidate() {
        let mut store = MemoryStore::with(&[("A", 5), ("B", 9)]);
        store.broken.insert("B".to_string());
        let ranker = PopularityRanker::new(Arc::new(store));
        assert_eq!(
            ranker.rank(&candidates(&["A", "B"]), "").await.as_deref(),
            Some("A")
        );
    }

    #[tokio::test]
    async fn test_ranked_order() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[
            ("A", 5),
            ("B", 9),
            ("C", 5),
        ])));
        let ranked = ranker.ranked(&candidates(&["A", "B", "C"])).await;
        let order: Vec<_> = ranked.iter().map(|c| (c.id.as_str(), c.score)).collect();
        assert_eq!(order, vec![("B", 9), ("A", 5), ("C", 5)]);
    }

    #[tokio::test]
    async fn test_id_prefix() {
        let store = MemoryStore::with(&[("http://www.wikidata.org/entity/Q76", 7)]);
        let ranker = PopularityRanker::new(Arc::new(store))
            .with_id_prefix(Some("http://www.wikidata.org/entity/".to_string()));

        assert_eq!(ranker.store_key("Q76"), "http://www.wikidata.org/entity/Q76");
        assert_eq!(
            ranker.store_key("<http://www.wikidata.org/entity/Q76>"),
            "http://www.wikidata.org/entity/Q76"
        );
        // The emitted identifier is the one the search returned
        assert_eq!(
            ranker.rank(&candidates(&["Q76"]), "").await.as_deref(),
            Some("Q76")
        );
    }

    #[tokio::test]
    async fn test_type_aware_prefers_matching_class() {
        let store = MemoryStore::with(&[("Q90", 100), ("Q167646", 3)]).typed("Q167646", "Q5");
        let constraints = HashMap::from([("PERSON".to_string(), vec!["Q5".to_string()])]);
        let ranker =
            PopularityRanker::new(Arc::new(store)).with_type_constraints("P31", constraints);

        let set = candidates(&["Q90", "Q167646"]);
        assert_eq!(ranker.rank(&set, "PERSON").await.as_deref(), Some("Q167646"));
        // Unconstrained label falls back to popularity
        assert_eq!(ranker.rank(&set, "GPE").await.as_deref(), Some("Q90"));
    }

    #[tokio::test]
    async fn test_type_aware_falls_back_when_nothing_matches() {
        let store = MemoryStore::with(&[("Q90", 100), ("Q167646", 3)]);
        let constraints = HashMap::from([("PERSON".to_string(), vec!["Q5".to_string()])]);
        let ranker =
            PopularityRanker::new(Arc::new(store)).with_type_constraints("P31", constraints);

        assert_eq!(
            ranker
                .rank(&candidates(&["Q90", "Q167646"]), "PERSON")
                .await
                .as_deref(),
            Some("Q90")
        );
    }

    #[tokio::test]
    async fn test_scoring_concurrency_is_bounded() {
        let store = Arc::new(SlowStore::default());
        let ranker = PopularityRanker::new(store.clone()).with_concurrency(3);

        let ids: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        let set: CandidateSet = ids.iter().map(|id| (id.as_str(), None)).collect();
        let ranked = ranker.ranked(&set).await;

        assert_eq!(ranked.len(), 40);
        assert_eq!(ranked[0].id, "40");
        let peak = store.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "{peak} lookups overlapped");
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_scores() {
        let ranker = PopularityRanker::new(Arc::new(MemoryStore::with(&[("A", 5), ("B", 9)])))
            .with_concurrency(0);
        assert_eq!(
            ranker.rank(&candidates(&["A", "B"]), "").await.as_deref(),
            Some("B")
        );
    }
}
