use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scholdb_core::{DegreeLevel, NormalizedScholarship, RawListing};
use scholdb_db::DbError;
use scholdb_scraper::{FetchError, FetchErrorKind, SourceAdapter};

use super::*;
use crate::persister::StoreError;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

enum Behavior {
    Listings(Vec<RawListing>),
    NotFound,
    /// Fails with a 503 on the first call, then serves the listings.
    FlakyThen(Vec<RawListing>),
    Hang,
}

struct FakeAdapter {
    id: String,
    behavior: Behavior,
    calls: AtomicU32,
}

impl FakeAdapter {
    fn new(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_listings(&self) -> Result<Vec<RawListing>, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Listings(listings) => Ok(listings.clone()),
            Behavior::NotFound => Err(FetchError::new(
                &self.id,
                FetchErrorKind::NotFound {
                    url: format!("https://{}.example.org/", self.id),
                },
            )),
            Behavior::FlakyThen(listings) => {
                if call == 0 {
                    Err(FetchError::new(
                        &self.id,
                        FetchErrorKind::UnexpectedStatus {
                            status: 503,
                            url: format!("https://{}.example.org/", self.id),
                        },
                    ))
                } else {
                    Ok(listings.clone())
                }
            }
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    Healthy,
    Down,
    /// Health check passes, every write fails with a connection error.
    DropsWrites,
}

/// In-memory persister keyed on `name`, mirroring the table's merge policy.
struct MemoryPersister {
    mode: StoreMode,
    refuse: Vec<String>,
    rows: Mutex<HashMap<String, NormalizedScholarship>>,
    upserts: AtomicU32,
}

impl MemoryPersister {
    fn new(mode: StoreMode) -> Arc<Self> {
        Self::refusing(mode, &[])
    }

    fn refusing(mode: StoreMode, names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            mode,
            refuse: names.iter().map(ToString::to_string).collect(),
            rows: Mutex::new(HashMap::new()),
            upserts: AtomicU32::new(0),
        })
    }

    fn row(&self, name: &str) -> Option<NormalizedScholarship> {
        self.rows.lock().unwrap().get(name).cloned()
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn unreachable_store() -> StoreError {
    StoreError::from(DbError::Sqlx(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Persister for MemoryPersister {
    async fn health_check(&self) -> Result<(), StoreError> {
        match self.mode {
            StoreMode::Down => Err(unreachable_store()),
            StoreMode::Healthy | StoreMode::DropsWrites => Ok(()),
        }
    }

    async fn upsert(&self, scholarship: &NormalizedScholarship) -> Result<UpsertKind, StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.mode != StoreMode::Healthy {
            return Err(unreachable_store());
        }
        if self.refuse.contains(&scholarship.name) {
            return Err(StoreError::from(DbError::NotFound));
        }
        let previous = self
            .rows
            .lock()
            .unwrap()
            .insert(scholarship.name.clone(), scholarship.clone());
        Ok(if previous.is_some() {
            UpsertKind::Updated
        } else {
            UpsertKind::Inserted
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn listing(source_id: &str, title: &str, level: Option<&str>) -> RawListing {
    RawListing {
        source_id: source_id.to_string(),
        title_text: title.to_string(),
        description_text: format!("{title} description"),
        deadline_text: Some("2027-01-31".to_string()),
        level_text: level.map(ToString::to_string),
        apply_link_text: format!("https://{source_id}.example.org/apply"),
        ..RawListing::default()
    }
}

fn fast_options() -> RunOptions {
    RunOptions {
        fetch_timeout: Duration::from_millis(100),
        max_retries: 0,
        backoff_base: Duration::ZERO,
    }
}

fn orchestrator(
    adapters: &[Arc<FakeAdapter>],
    persister: &Arc<MemoryPersister>,
    options: RunOptions,
) -> Orchestrator {
    let adapters: Vec<Arc<dyn SourceAdapter>> = adapters
        .iter()
        .map(|a| Arc::clone(a) as Arc<dyn SourceAdapter>)
        .collect();
    let persister: Arc<dyn Persister> = Arc::clone(persister) as Arc<dyn Persister>;
    Orchestrator::new(adapters, persister, options)
}

// ---------------------------------------------------------------------------
// Isolation and partial failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_and_hanging_sources_do_not_block_healthy_ones() {
    let healthy = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![
            listing("hub", "Horizon Scholarship", Some("Bachelor of Science")),
            listing("hub", "Doctoral Fellowship", Some("PhD Fellowship")),
        ]),
    );
    let missing = FakeAdapter::new("gone", Behavior::NotFound);
    let slow = FakeAdapter::new("slow", Behavior::Hang);
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[missing, healthy, slow], &store, fast_options())
        .run()
        .await
        .expect("partial failure is still a completed run");

    assert_eq!(run.fetched, 2);
    assert_eq!(run.persisted(), 2);
    assert_eq!(store.len(), 2);

    let failures: Vec<_> = run.source_failures().collect();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .any(|e| e.source_id == "gone" && matches!(e.kind, FetchErrorKind::NotFound { .. })));
    assert!(failures
        .iter()
        .any(|e| e.source_id == "slow" && matches!(e.kind, FetchErrorKind::Timeout { .. })));
    assert!(!run.is_clean());

    assert_eq!(
        store.row("Horizon Scholarship").unwrap().degree_level,
        DegreeLevel::Undergraduate
    );
    assert_eq!(
        store.row("Doctoral Fellowship").unwrap().degree_level,
        DegreeLevel::PhD
    );
}

#[tokio::test]
async fn source_reports_keep_adapter_order() {
    let a = FakeAdapter::new("a", Behavior::Listings(vec![listing("a", "One", None)]));
    let b = FakeAdapter::new("b", Behavior::NotFound);
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[a, b], &store, fast_options())
        .run()
        .await
        .unwrap();

    let ids: Vec<&str> = run.sources.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(matches!(run.sources[0].outcome, SourceOutcome::Fetched(1)));
    assert!(matches!(run.sources[1].outcome, SourceOutcome::Failed(_)));
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let flaky = FakeAdapter::new(
        "flaky",
        Behavior::FlakyThen(vec![listing("flaky", "Retry Award", None)]),
    );
    let store = MemoryPersister::new(StoreMode::Healthy);
    let options = RunOptions {
        max_retries: 2,
        ..fast_options()
    };

    let run = orchestrator(&[Arc::clone(&flaky)], &store, options)
        .run()
        .await
        .unwrap();

    assert_eq!(flaky.calls(), 2);
    assert!(run.is_clean());
    assert_eq!(run.inserted, 1);
}

// ---------------------------------------------------------------------------
// Normalization and merge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_titles_are_rejected_and_counted() {
    let adapter = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![
            listing("hub", "Valid Award", None),
            listing("hub", "   ", None),
        ]),
    );
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[adapter], &store, fast_options())
        .run()
        .await
        .unwrap();

    assert_eq!(run.fetched, 2);
    assert_eq!(run.normalized, 1);
    assert_eq!(run.rejected(), 1);
    assert_eq!(run.persisted(), 1);
    assert!(run.is_clean(), "rejections are not failures");
}

#[tokio::test]
async fn same_name_from_two_sources_merges_into_one_record() {
    let first = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![listing("hub", "Horizon Scholarship", Some("Masters"))]),
    );
    let second = FakeAdapter::new(
        "feed",
        Behavior::Listings(vec![listing("feed", " Horizon Scholarship\n", Some("PhD"))]),
    );
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[first, second], &store, fast_options())
        .run()
        .await
        .unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(run.inserted, 1);
    assert_eq!(run.updated, 1);
    let merged = store.row("Horizon Scholarship").unwrap();
    assert_eq!(merged.source_id, "feed");
    assert_eq!(merged.degree_level, DegreeLevel::PhD);
}

#[tokio::test]
async fn names_differing_in_internal_whitespace_stay_separate() {
    let adapter = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![
            listing("hub", "Horizon Award", None),
            listing("hub", "Horizon   Award", None),
        ]),
    );
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[adapter], &store, fast_options())
        .run()
        .await
        .unwrap();

    assert_eq!(run.inserted, 2);
    assert_eq!(store.len(), 2);
    assert!(store.row("Horizon   Award").is_some());
}

#[tokio::test]
async fn second_run_over_same_data_only_updates() {
    let adapter = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![
            listing("hub", "Alpha", None),
            listing("hub", "Bravo", None),
        ]),
    );
    let store = MemoryPersister::new(StoreMode::Healthy);
    let orch = orchestrator(&[adapter], &store, fast_options());

    let first = orch.run().await.unwrap();
    let second = orch.run().await.unwrap();

    assert_eq!((first.inserted, first.updated), (2, 0));
    assert_eq!((second.inserted, second.updated), (0, 2));
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn unparseable_deadline_falls_back_to_run_date() {
    let mut raw = listing("hub", "Rolling Award", None);
    raw.deadline_text = Some("rolling admissions".to_string());
    let adapter = FakeAdapter::new("hub", Behavior::Listings(vec![raw]));
    let store = MemoryPersister::new(StoreMode::Healthy);

    let run = orchestrator(&[adapter], &store, fast_options())
        .run()
        .await
        .unwrap();

    assert_eq!(
        store.row("Rolling Award").unwrap().application_deadline,
        run.run_date
    );
}

#[tokio::test]
async fn no_sources_is_an_empty_clean_run() {
    let store = MemoryPersister::new(StoreMode::Healthy);
    let run = orchestrator(&[], &store, fast_options()).run().await.unwrap();
    assert!(run.is_clean());
    assert_eq!(run.fetched, 0);
    assert!(run.sources.is_empty());
}

// ---------------------------------------------------------------------------
// Store failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_store_aborts_before_fetching() {
    let adapter = FakeAdapter::new("hub", Behavior::Listings(vec![listing("hub", "A", None)]));
    let store = MemoryPersister::new(StoreMode::Down);

    let err = orchestrator(&[Arc::clone(&adapter)], &store, fast_options())
        .run()
        .await
        .expect_err("health check failure aborts the run");

    assert!(matches!(err, RunError::StoreUnavailable { .. }));
    assert_eq!(adapter.calls(), 0);
}

#[tokio::test]
async fn every_write_unreachable_is_a_run_failure() {
    let adapter = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![listing("hub", "A", None), listing("hub", "B", None)]),
    );
    let store = MemoryPersister::new(StoreMode::DropsWrites);

    let err = orchestrator(&[adapter], &store, fast_options())
        .run()
        .await
        .expect_err("store lost mid-run");

    assert!(matches!(err, RunError::StoreUnavailable { .. }));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 2, "every record attempted");
}

#[tokio::test]
async fn one_refused_record_does_not_stop_the_rest() {
    let adapter = FakeAdapter::new(
        "hub",
        Behavior::Listings(vec![
            listing("hub", "Alpha", None),
            listing("hub", "Bravo", None),
            listing("hub", "Charlie", None),
        ]),
    );
    let store = MemoryPersister::refusing(StoreMode::Healthy, &["Bravo"]);

    let run = orchestrator(&[adapter], &store, fast_options())
        .run()
        .await
        .unwrap();

    assert_eq!(run.persisted(), 2);
    assert_eq!(run.record_failures.len(), 1);
    assert_eq!(run.record_failures[0].name, "Bravo");
    assert!(!run.record_failures[0].error.is_unavailable());
}

// ---------------------------------------------------------------------------
// Guard and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_run_is_refused() {
    let store = MemoryPersister::new(StoreMode::Healthy);
    let orch = orchestrator(&[], &store, fast_options());

    let _in_progress = orch.guard.try_acquire().unwrap();
    let err = orch.run().await.expect_err("guard is held");
    assert!(matches!(err, RunError::AlreadyRunning));
}

#[tokio::test]
async fn guard_is_released_after_a_run() {
    let store = MemoryPersister::new(StoreMode::Healthy);
    let orch = orchestrator(&[], &store, fast_options());

    orch.run().await.unwrap();
    assert!(orch.guard.try_acquire().is_ok());
}

#[tokio::test]
async fn shutdown_during_fetch_cancels_the_run() {
    let slow = FakeAdapter::new("slow", Behavior::Hang);
    let store = MemoryPersister::new(StoreMode::Healthy);
    let options = RunOptions {
        fetch_timeout: Duration::from_secs(3600),
        ..fast_options()
    };
    let orch = orchestrator(&[slow], &store, options);

    let err = orch
        .run_until(tokio::time::sleep(Duration::from_millis(20)))
        .await
        .expect_err("shutdown fires first");

    assert!(matches!(
        err,
        RunError::Cancelled {
            phase: RunPhase::Fetching
        }
    ));
    assert_eq!(store.len(), 0);
    assert!(orch.guard.try_acquire().is_ok(), "cancelled run releases the guard");
}

#[test]
fn run_options_follow_app_config() {
    let config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: scholdb_core::Environment::Test,
        log_level: "info".to_string(),
        sources_path: std::path::PathBuf::from("./config/sources.yaml"),
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        fetch_timeout_secs: 12,
        user_agent: "ua".to_string(),
        fetch_max_retries: 4,
        fetch_retry_backoff_base_secs: 3,
        ingest_cron: "0 0 3 * * *".to_string(),
    };

    let options = RunOptions::from_app_config(&config);
    assert_eq!(options.fetch_timeout, Duration::from_secs(12));
    assert_eq!(options.max_retries, 4);
    assert_eq!(options.backoff_base, Duration::from_secs(3));
}
