use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use scholdb_core::{AppConfig, NormalizedScholarship};
use scholdb_scraper::{normalize_listing, DeadlineParser, SourceAdapter};

use crate::error::RunError;
use crate::guard::RunGuard;
use crate::persister::{Persister, UpsertKind};
use crate::retry::fetch_with_retry;
use crate::summary::{IngestionRun, RecordFailure, SourceOutcome, SourceReport};

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;

/// Knobs for one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Bound on each individual fetch attempt.
    pub fetch_timeout: Duration,
    /// Extra attempts after the first for retriable fetch errors.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_retries: config.fetch_max_retries,
            backoff_base: Duration::from_secs(config.fetch_retry_backoff_base_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Normalizing,
    Persisting,
    Done,
}

impl RunPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the fetch → normalize → persist pipeline over a fixed adapter set.
///
/// Both the manual `ingest` command and the scheduler call [`Orchestrator::run_until`];
/// there is no second code path.
pub struct Orchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    persister: Arc<dyn Persister>,
    guard: RunGuard,
    options: RunOptions,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        persister: Arc<dyn Persister>,
        options: RunOptions,
    ) -> Self {
        Self {
            adapters,
            persister,
            guard: RunGuard::new(),
            options,
        }
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Runs to completion with no cancellation.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run_until`].
    pub async fn run(&self) -> Result<IngestionRun, RunError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs one ingest, stopping early if `shutdown` completes first.
    ///
    /// Source failures, normalization rejections, and row-level store errors
    /// are recorded in the returned summary; a partially failed run is still
    /// `Ok`.
    ///
    /// # Errors
    ///
    /// - [`RunError::AlreadyRunning`] if this orchestrator is mid-run.
    /// - [`RunError::StoreUnavailable`] if the store fails its health check, or
    ///   every attempted write failed because the store was unreachable.
    /// - [`RunError::Cancelled`] if `shutdown` fires before the run finishes.
    pub async fn run_until<S>(&self, shutdown: S) -> Result<IngestionRun, RunError>
    where
        S: Future<Output = ()> + Send,
    {
        let _permit = self.guard.try_acquire()?;
        let started = Instant::now();
        let deadlines = DeadlineParser::new(Utc::now().date_naive());
        let mut run = IngestionRun::new(deadlines.run_date());
        tokio::pin!(shutdown);

        enter(RunPhase::Idle);
        tracing::info!(
            run_date = %run.run_date,
            sources = self.adapters.len(),
            "ingest run starting"
        );

        if let Err(e) = self.persister.health_check().await {
            tracing::error!(error = %e, "store health check failed, aborting run");
            return Err(RunError::StoreUnavailable {
                reason: e.to_string(),
            });
        }

        enter(RunPhase::Fetching);
        let fetches = join_all(self.adapters.iter().map(|adapter| {
            fetch_with_retry(
                adapter.as_ref(),
                self.options.fetch_timeout,
                self.options.max_retries,
                self.options.backoff_base,
            )
        }));
        let results = tokio::select! {
            results = fetches => results,
            () = &mut shutdown => return Err(cancelled(RunPhase::Fetching, run, started)),
        };

        let mut listings = Vec::new();
        for (adapter, result) in self.adapters.iter().zip(results) {
            let outcome = match result {
                Ok(batch) => {
                    tracing::info!(source = adapter.id(), listings = batch.len(), "source fetched");
                    run.fetched += batch.len();
                    let count = batch.len();
                    listings.extend(batch);
                    SourceOutcome::Fetched(count)
                }
                Err(err) => {
                    tracing::warn!(
                        source = adapter.id(),
                        retriable = err.is_retriable(),
                        error = %err.kind,
                        "source fetch failed, continuing with remaining sources"
                    );
                    SourceOutcome::Failed(err)
                }
            };
            run.sources.push(SourceReport {
                source_id: adapter.id().to_owned(),
                outcome,
            });
        }

        enter(RunPhase::Normalizing);
        let mut records: Vec<NormalizedScholarship> = Vec::with_capacity(listings.len());
        for listing in listings {
            match normalize_listing(listing, &deadlines) {
                Ok(record) => records.push(record),
                Err(rejection) => {
                    tracing::debug!(reason = %rejection, "listing rejected");
                    run.rejections.push(rejection);
                }
            }
        }
        run.normalized = records.len();

        enter(RunPhase::Persisting);
        let mut unavailable = 0usize;
        for record in &records {
            let result = tokio::select! {
                biased;
                () = &mut shutdown => return Err(cancelled(RunPhase::Persisting, run, started)),
                result = self.persister.upsert(record) => result,
            };
            match result {
                Ok(UpsertKind::Inserted) => run.inserted += 1,
                Ok(UpsertKind::Updated) => run.updated += 1,
                Err(error) => {
                    if error.is_unavailable() {
                        unavailable += 1;
                    }
                    tracing::warn!(
                        name = %record.name,
                        source = %record.source_id,
                        error = %error,
                        "failed to persist scholarship"
                    );
                    run.record_failures.push(RecordFailure {
                        name: record.name.clone(),
                        source_id: record.source_id.clone(),
                        error,
                    });
                }
            }
        }

        run.elapsed = started.elapsed();
        if !records.is_empty() && unavailable == records.len() {
            tracing::error!(summary = %run, "store became unreachable during run");
            return Err(RunError::StoreUnavailable {
                reason: format!("all {unavailable} writes failed to reach the store"),
            });
        }

        enter(RunPhase::Done);
        tracing::info!(
            fetched = run.fetched,
            normalized = run.normalized,
            rejected = run.rejected(),
            inserted = run.inserted,
            updated = run.updated,
            source_failures = run.source_failures().count(),
            record_failures = run.record_failures.len(),
            elapsed_ms = u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX),
            "ingest run complete"
        );
        Ok(run)
    }
}

fn enter(phase: RunPhase) {
    tracing::debug!(phase = %phase, "ingest phase");
}

fn cancelled(phase: RunPhase, mut run: IngestionRun, started: Instant) -> RunError {
    run.elapsed = started.elapsed();
    tracing::warn!(phase = %phase, summary = %run, "ingest run cancelled");
    RunError::Cancelled { phase }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
