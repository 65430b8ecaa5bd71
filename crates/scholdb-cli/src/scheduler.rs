//! Daily ingest daemon.
//!
//! Registers one cron job on a [`JobScheduler`] that calls the same
//! [`Orchestrator::run_until`] as the `ingest` command. A tick that lands
//! while a run is still in progress is skipped.

use std::sync::Arc;

use scholdb_pipeline::{Orchestrator, RunError};
use tokio::sync::watch;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Runs the scheduler until ctrl-c or SIGTERM.
///
/// # Errors
///
/// Returns an error if migrations, the sources file, or the HTTP client cannot
/// be set up, the cron expression is rejected, or the scheduler fails to start
/// or stop.
pub(crate) async fn run_daemon(
    pool: sqlx::PgPool,
    config: &scholdb_core::AppConfig,
    run_on_start: bool,
) -> anyhow::Result<()> {
    let orchestrator = Arc::new(crate::ingest::prepare_orchestrator(pool, config).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut scheduler = JobScheduler::new().await?;
    let job = ingest_job(
        Arc::clone(&orchestrator),
        &config.ingest_cron,
        shutdown_rx.clone(),
    )?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(
        cron = %config.ingest_cron,
        sources = orchestrator.source_count(),
        "scheduler: ingest job registered"
    );

    if run_on_start {
        let orchestrator = Arc::clone(&orchestrator);
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { run_tick(&orchestrator, rx).await });
    }

    crate::shutdown_signal().await;
    // In-flight runs observe this and stop at their next await point.
    let _ = shutdown_tx.send(true);
    scheduler.shutdown().await?;
    tracing::info!("scheduler: stopped");
    Ok(())
}

/// Builds the recurring ingest job for `cron` (six fields, seconds first, UTC).
pub(crate) fn ingest_job(
    orchestrator: Arc<Orchestrator>,
    cron: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<Job, JobSchedulerError> {
    Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);
        let shutdown = shutdown.clone();
        Box::pin(async move {
            run_tick(&orchestrator, shutdown).await;
        })
    })
}

async fn run_tick(orchestrator: &Orchestrator, mut shutdown: watch::Receiver<bool>) {
    tracing::info!("scheduler: starting ingest run");
    let stop = async move {
        // A closed channel means the daemon is gone; treat it as shutdown.
        let _ = shutdown.wait_for(|stop| *stop).await;
    };

    match orchestrator.run_until(stop).await {
        Ok(run) => tracing::info!(summary = %run, "scheduler: ingest run complete"),
        Err(RunError::AlreadyRunning) => {
            tracing::warn!("scheduler: previous ingest run still in progress, skipping tick");
        }
        Err(RunError::Cancelled { phase }) => {
            tracing::info!(%phase, "scheduler: ingest run cancelled by shutdown");
        }
        Err(e @ RunError::StoreUnavailable { .. }) => {
            tracing::error!(error = %e, "scheduler: ingest run failed, will retry next tick");
        }
    }
}
