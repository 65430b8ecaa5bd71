use thiserror::Error;

use crate::orchestrator::RunPhase;

/// Run-level failures. Per-source and per-record problems never surface
/// here; they are recorded in the [`crate::IngestionRun`] summary instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The store could not be reached before the run, or every attempted
    /// write failed because the store was unreachable.
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("an ingest run is already in progress")]
    AlreadyRunning,

    #[error("ingest run cancelled while {phase}")]
    Cancelled { phase: RunPhase },
}
