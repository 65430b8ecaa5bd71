//! Ingestion pipeline: fetch every source, normalize, and merge into the store.
//!
//! [`Orchestrator::run`] is the single entry point shared by the manual
//! `ingest` command and the daily scheduler.

mod error;
mod guard;
mod orchestrator;
mod persister;
mod retry;
mod summary;

pub use error::RunError;
pub use guard::{RunGuard, RunPermit};
pub use orchestrator::{Orchestrator, RunOptions, RunPhase};
pub use persister::{PgPersister, Persister, StoreError, UpsertKind};
pub use summary::{IngestionRun, RecordFailure, SourceOutcome, SourceReport};
