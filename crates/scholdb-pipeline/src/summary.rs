use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use scholdb_scraper::{FetchError, NormalizationRejection};

use crate::persister::StoreError;

/// What happened to one source during a run.
#[derive(Debug)]
pub enum SourceOutcome {
    /// Fetched successfully with this many raw listings.
    Fetched(usize),
    Failed(FetchError),
}

#[derive(Debug)]
pub struct SourceReport {
    pub source_id: String,
    pub outcome: SourceOutcome,
}

/// A normalized record the store refused.
#[derive(Debug)]
pub struct RecordFailure {
    pub name: String,
    pub source_id: String,
    pub error: StoreError,
}

/// Summary of one ingest invocation. Logged and printed, never persisted.
#[derive(Debug)]
pub struct IngestionRun {
    pub run_date: NaiveDate,
    pub sources: Vec<SourceReport>,
    pub fetched: usize,
    pub normalized: usize,
    pub rejections: Vec<NormalizationRejection>,
    pub inserted: usize,
    pub updated: usize,
    pub record_failures: Vec<RecordFailure>,
    pub elapsed: Duration,
}

impl IngestionRun {
    #[must_use]
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            sources: Vec::new(),
            fetched: 0,
            normalized: 0,
            rejections: Vec::new(),
            inserted: 0,
            updated: 0,
            record_failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn source_failures(&self) -> impl Iterator<Item = &FetchError> {
        self.sources.iter().filter_map(|s| match &s.outcome {
            SourceOutcome::Failed(err) => Some(err),
            SourceOutcome::Fetched(_) => None,
        })
    }

    /// `true` when every source fetched and every normalized record was stored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.source_failures().next().is_none() && self.record_failures.is_empty()
    }
}

impl fmt::Display for IngestionRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ingest {}: {} sources ({} failed), {} fetched, {} normalized, {} rejected, \
             {} persisted ({} inserted, {} updated), {} record failures in {:.1}s",
            self.run_date,
            self.sources.len(),
            self.source_failures().count(),
            self.fetched,
            self.normalized,
            self.rejected(),
            self.persisted(),
            self.inserted,
            self.updated,
            self.record_failures.len(),
            self.elapsed.as_secs_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholdb_scraper::FetchErrorKind;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn display_renders_one_line_summary() {
        let mut run = IngestionRun::new(run_date());
        run.sources.push(SourceReport {
            source_id: "hub".to_string(),
            outcome: SourceOutcome::Fetched(3),
        });
        run.sources.push(SourceReport {
            source_id: "board".to_string(),
            outcome: SourceOutcome::Failed(FetchError::new(
                "board",
                FetchErrorKind::Timeout { timeout_secs: 30 },
            )),
        });
        run.fetched = 3;
        run.normalized = 2;
        run.rejections.push(NormalizationRejection::EmptyName {
            source_id: "hub".to_string(),
        });
        run.inserted = 1;
        run.updated = 1;
        run.elapsed = Duration::from_millis(1_300);

        assert_eq!(
            run.to_string(),
            "ingest 2026-10-19: 2 sources (1 failed), 3 fetched, 2 normalized, 1 rejected, \
             2 persisted (1 inserted, 1 updated), 0 record failures in 1.3s"
        );
        assert!(!run.is_clean());
    }

    #[test]
    fn empty_run_is_clean() {
        let run = IngestionRun::new(run_date());
        assert!(run.is_clean());
        assert_eq!(run.persisted(), 0);
    }
}
