//! The store seam used by the orchestrator.

use async_trait::async_trait;
use scholdb_core::NormalizedScholarship;
use scholdb_db::DbError;
use sqlx::PgPool;
use thiserror::Error;

/// Whether an upsert created a row or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Inserted,
    Updated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached at all.
    #[error("store unreachable: {0}")]
    Unavailable(#[source] DbError),

    /// The database was reachable but refused this record.
    #[error("store rejected record: {0}")]
    Rejected(#[source] DbError),
}

impl StoreError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_connection_failure() {
            StoreError::Unavailable(err)
        } else {
            StoreError::Rejected(err)
        }
    }
}

/// Natural-key merge of normalized scholarships into durable storage.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Verifies the store is reachable before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot answer a trivial query.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Inserts or updates the record keyed on its `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    async fn upsert(&self, scholarship: &NormalizedScholarship) -> Result<UpsertKind, StoreError>;
}

/// [`Persister`] backed by the Postgres `scholarships` table.
#[derive(Debug, Clone)]
pub struct PgPersister {
    pool: PgPool,
}

impl PgPersister {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Persister for PgPersister {
    async fn health_check(&self) -> Result<(), StoreError> {
        // Any failure here means the run cannot write, whatever the cause.
        scholdb_db::health_check(&self.pool)
            .await
            .map_err(StoreError::Unavailable)
    }

    async fn upsert(&self, scholarship: &NormalizedScholarship) -> Result<UpsertKind, StoreError> {
        let outcome = scholdb_db::upsert_scholarship(&self.pool, scholarship).await?;
        Ok(if outcome.inserted {
            UpsertKind::Inserted
        } else {
            UpsertKind::Updated
        })
    }
}
