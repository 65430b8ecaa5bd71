//! Wiring for the ingest pipeline and the one-shot `ingest` command.

use std::sync::Arc;

use scholdb_pipeline::{IngestionRun, Orchestrator, PgPersister, RunError, RunOptions, SourceOutcome};
use scholdb_scraper::PageFetcher;

/// Applies pending migrations, then builds the orchestrator from the sources
/// registry and app config.
///
/// Shared by `ingest` and `schedule` so both trigger the same pipeline against
/// the same schema.
///
/// # Errors
///
/// Returns an error if migrations fail, the sources file cannot be loaded, or
/// the HTTP client cannot be constructed.
pub(crate) async fn prepare_orchestrator(
    pool: sqlx::PgPool,
    config: &scholdb_core::AppConfig,
) -> anyhow::Result<Orchestrator> {
    let applied = scholdb_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }

    let sources = scholdb_core::load_sources(&config.sources_path)?;
    let fetcher = PageFetcher::new(config.fetch_timeout_secs, &config.user_agent)?;
    let adapters = scholdb_scraper::build_adapters(&sources, &fetcher);
    if adapters.is_empty() {
        tracing::warn!(
            path = %config.sources_path.display(),
            "no enabled sources configured; runs will fetch nothing"
        );
    }

    Ok(Orchestrator::new(
        adapters,
        Arc::new(PgPersister::new(pool)),
        RunOptions::from_app_config(config),
    ))
}

/// Runs one ingest pass and prints its summary.
///
/// Source and record failures are reported but do not fail the command.
///
/// # Errors
///
/// Returns an error if setup fails, the store is unreachable, or another run
/// holds the guard.
pub(crate) async fn run_ingest(
    pool: sqlx::PgPool,
    config: &scholdb_core::AppConfig,
) -> anyhow::Result<()> {
    let orchestrator = prepare_orchestrator(pool, config).await?;
    let result = orchestrator.run_until(crate::shutdown_signal()).await;
    if let Some(run) = settle(result)? {
        print_summary(&run);
    }
    Ok(())
}

/// Maps a run result to the command outcome: `Ok(None)` for a cancelled run,
/// an error for anything that kept the run from writing.
pub(crate) fn settle(
    result: Result<IngestionRun, RunError>,
) -> anyhow::Result<Option<IngestionRun>> {
    match result {
        Ok(run) => Ok(Some(run)),
        Err(RunError::Cancelled { phase }) => {
            tracing::info!(%phase, "ingest cancelled by shutdown signal");
            Ok(None)
        }
        Err(e @ (RunError::StoreUnavailable { .. } | RunError::AlreadyRunning)) => Err(e.into()),
    }
}

fn print_summary(run: &IngestionRun) {
    println!("{run}");
    for source in &run.sources {
        if let SourceOutcome::Failed(err) = &source.outcome {
            println!("  source failed: {err}");
        }
    }
    for failure in &run.record_failures {
        println!(
            "  record failed: '{}' from {}: {}",
            failure.name, failure.source_id, failure.error
        );
    }
}
