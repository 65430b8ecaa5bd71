use tokio::sync::{Mutex, MutexGuard};

use crate::error::RunError;

/// In-process mutual exclusion for ingest runs.
///
/// Only guards runs sharing one [`crate::Orchestrator`]. Separate processes
/// (a manual `ingest` during a scheduled tick) may still overlap; the
/// natural-key upsert keeps that safe.
#[derive(Debug, Default)]
pub struct RunGuard {
    lock: Mutex<()>,
}

/// Held for the duration of one run; dropping it releases the guard.
#[derive(Debug)]
pub struct RunPermit<'a> {
    _held: MutexGuard<'a, ()>,
}

impl RunGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the guard without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] if another run holds the guard.
    pub fn try_acquire(&self) -> Result<RunPermit<'_>, RunError> {
        self.lock
            .try_lock()
            .map(|held| RunPermit { _held: held })
            .map_err(|_| RunError::AlreadyRunning)
    }
}
