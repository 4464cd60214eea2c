//! N-Triples loading into a [`SqliteTripleStore`]

use std::collections::HashMap;

use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use super::{normalize_term, SqliteTripleStore};
use crate::error::BackendError;

/// One parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Counters reported at the end of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub lines: u64,
    pub triples: u64,
    pub skipped: u64,
}

/// Parse one N-Triples line.
///
/// IRIs lose their angle brackets; blank nodes and literals (including any
/// language tag or datatype) are kept as written. Blank lines, comments and
/// lines that are not `subject predicate object .` yield `None`.
pub fn parse_ntriple(line: &str) -> Option<Triple> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let body = line.strip_suffix('.')?.trim_end();

    let (subject, rest) = next_term(body)?;
    let (predicate, rest) = next_term(rest)?;
    let object = rest.trim();
    if object.is_empty() {
        return None;
    }

    Some(Triple {
        subject: subject.to_string(),
        predicate: predicate.to_string(),
        object: normalize_term(object).to_string(),
    })
}

/// Split off a leading IRI or blank node
fn next_term(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if let Some(iri) = s.strip_prefix('<') {
        let end = iri.find('>')?;
        Some((&iri[..end], &iri[end + 1..]))
    } else if s.starts_with("_:") {
        let end = s.find(char::is_whitespace)?;
        Some((&s[..end], &s[end..]))
    } else {
        None
    }
}

/// Batch loader for triples
pub struct NTriplesImporter {
    store: SqliteTripleStore,
    batch_size: usize,
}

impl NTriplesImporter {
    pub fn new(store: SqliteTripleStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Load every parseable line, committing one transaction per batch
    pub async fn import<I>(&self, lines: I) -> Result<ImportStats, BackendError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut stats = ImportStats::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        for line in lines {
            stats.lines += 1;
            match parse_ntriple(&line) {
                Some(triple) => batch.push(triple),
                None => {
                    if !line.trim().is_empty() && !line.trim_start().starts_with('#') {
                        stats.skipped += 1;
                    }
                    continue;
                }
            }
            if batch.len() >= self.batch_size {
                stats.triples += self.write_batch(&batch).await?;
                batch.clear();
                debug!(triples = stats.triples, "Committed batch");
            }
        }
        if !batch.is_empty() {
            stats.triples += self.write_batch(&batch).await?;
        }

        info!(
            lines = stats.lines,
            triples = stats.triples,
            skipped = stats.skipped,
            "Import finished"
        );
        Ok(stats)
    }

    async fn write_batch(&self, batch: &[Triple]) -> Result<u64, BackendError> {
        let mut tx = self.store.pool().begin().await?;
        let mut interned: HashMap<&str, i64> = HashMap::new();

        for triple in batch {
            let subject = intern(&mut tx, &mut interned, &triple.subject).await?;
            let predicate = intern(&mut tx, &mut interned, &triple.predicate).await?;
            let object = intern(&mut tx, &mut interned, &triple.object).await?;
            sqlx::query("INSERT INTO triples (subject, predicate, object) VALUES (?, ?, ?)")
                .bind(subject)
                .bind(predicate)
                .bind(object)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(batch.len() as u64)
    }
}

async fn intern<'a>(
    tx: &mut Transaction<'_, Sqlite>,
    interned: &mut HashMap<&'a str, i64>,
    term: &'a str,
) -> Result<i64, BackendError> {
    if let Some(id) = interned.get(term) {
        return Ok(*id);
    }
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO terms (term) VALUES (?) \
         ON CONFLICT(term) DO UPDATE SET term = excluded.term \
         RETURNING id",
    )
    .bind(term)
    .fetch_one(&mut **tx)
    .await?;
    interned.insert(term, id);
    Ok(id)
}
