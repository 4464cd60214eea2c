//! SQLite-backed triple store

use std::future::Future;
use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use super::{normalize_term, TermRef, TripleStore};
use crate::error::BackendError;
use crate::retry::RetryPolicy;

const BACKEND: &str = "kb";

/// Read pool size used by [`SqliteTripleStore::open`]
pub const DEFAULT_READ_CONNECTIONS: u32 = 8;

/// Tables and indexes of a store file
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS terms (
    id   INTEGER PRIMARY KEY,
    term TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS triples (
    subject   INTEGER NOT NULL REFERENCES terms(id),
    predicate INTEGER NOT NULL REFERENCES terms(id),
    object    INTEGER NOT NULL REFERENCES terms(id)
);
CREATE INDEX IF NOT EXISTS idx_triples_object ON triples(object);
CREATE INDEX IF NOT EXISTS idx_triples_subject_predicate ON triples(subject, predicate);
"#;

/// [`TripleStore`] over a SQLite file using the [`SCHEMA`] layout
#[derive(Clone)]
pub struct SqliteTripleStore {
    pool: SqlitePool,
    policy: RetryPolicy,
}

impl SqliteTripleStore {
    /// Open an existing store file read-only
    pub async fn open(path: impl AsRef<Path>, policy: RetryPolicy) -> Result<Self, BackendError> {
        Self::open_with_connections(path, policy, DEFAULT_READ_CONNECTIONS).await
    }

    /// Open read-only with a pool of `max_connections` readers
    pub async fn open_with_connections(
        path: impl AsRef<Path>,
        policy: RetryPolicy,
        max_connections: u32,
    ) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(policy.timeout)
            .connect_with(options)
            .await?;

        let store = Self { pool, policy };
        store.ping().await?;
        info!(path = %path.display(), max_connections, "Opened triple store");
        Ok(store)
    }

    /// Create (or open for writing) a store file and ensure the schema exists
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        // A single writer; SQLite serializes writes anyway
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self {
            pool,
            policy: RetryPolicy::default(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Await `work`, then close the pool whatever it returned
    pub async fn close_after<T, F>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let output = work.await;
        self.close().await;
        output
    }

    async fn lookup_once(&self, term: &str) -> Result<Option<TermRef>, BackendError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM terms WHERE term = ?")
            .bind(term)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(TermRef))
    }

    async fn count_once(&self, term: TermRef) -> Result<u64, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM triples WHERE object = ?")
            .bind(term.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn edge_once(
        &self,
        subject: TermRef,
        predicate: &str,
        object: &str,
    ) -> Result<bool, BackendError> {
        let found: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM triples t
                JOIN terms p ON p.id = t.predicate
                JOIN terms o ON o.id = t.object
                WHERE t.subject = ? AND p.term = ? AND o.term = ?
            )
            "#,
        )
        .bind(subject.0)
        .bind(predicate)
        .bind(object)
        .fetch_one(&self.pool)
        .await?;
        Ok(found != 0)
    }
}

#[async_trait]
impl TripleStore for SqliteTripleStore {
    async fn lookup_id(&self, term: &str) -> Result<Option<TermRef>, BackendError> {
        let term = normalize_term(term);
        self.policy.run(BACKEND, || self.lookup_once(term)).await
    }

    async fn count_as_object(&self, term: TermRef) -> Result<u64, BackendError> {
        self.policy.run(BACKEND, || self.count_once(term)).await
    }

    async fn has_edge(
        &self,
        subject: TermRef,
        predicate: &str,
        object: &str,
    ) -> Result<bool, BackendError> {
        let predicate = normalize_term(predicate);
        let object = normalize_term(object);
        self.policy
            .run(BACKEND, || self.edge_once(subject, predicate, object))
            .await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        // Fails on a file without the expected tables
        sqlx::query("SELECT 1 FROM terms LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        sqlx::query("SELECT 1 FROM triples LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }
}
