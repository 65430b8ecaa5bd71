//! Deadline parsing with an explicit fallback policy.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

/// Accepted `strftime` date formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d %B, %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

/// Labels sources commonly prefix the date with. Matched case-insensitively.
const LABELS: &[&str] = &[
    "application deadline",
    "closing date",
    "deadline",
    "closes",
    "apply by",
    "due",
];

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid ordinal regex")
});

/// What to return when deadline text is absent or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineFallback {
    /// The date the pipeline run executed on.
    RunDate,
    /// A fixed date chosen by the caller.
    Fixed(NaiveDate),
}

/// Converts free-text deadlines into calendar dates for one pipeline run.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineParser {
    run_date: NaiveDate,
    fallback: DeadlineFallback,
}

impl DeadlineParser {
    /// Parser for a run executing on `run_date`, falling back to that date.
    #[must_use]
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            fallback: DeadlineFallback::RunDate,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: DeadlineFallback) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    /// Parses `deadline_text`, applying the fallback policy when the text is
    /// absent or matches no accepted format. Never fails.
    #[must_use]
    pub fn parse(&self, deadline_text: Option<&str>) -> NaiveDate {
        deadline_text
            .and_then(parse_deadline_text)
            .unwrap_or(match self.fallback {
                DeadlineFallback::RunDate => self.run_date,
                DeadlineFallback::Fixed(date) => date,
            })
    }
}

/// Strict parse: returns `None` when no accepted format matches.
#[must_use]
pub fn parse_deadline_text(text: &str) -> Option<NaiveDate> {
    let cleaned = clean_deadline_text(text);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
    {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(dt.date_naive());
    }

    // ISO date followed by a time part without an offset, e.g. `2026-03-01T23:59`.
    let (head, tail) = cleaned.split_at_checked(10)?;
    if tail.starts_with('T') || tail.starts_with(' ') {
        return NaiveDate::parse_from_str(head, "%Y-%m-%d").ok();
    }

    None
}

fn clean_deadline_text(text: &str) -> String {
    let mut rest = text.trim();

    if let Some(label) = LABELS.iter().find(|l| {
        rest.get(..l.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(l))
    }) {
        rest = rest[label.len()..].trim_start_matches([':', ' ', '-', '\t']);
    }

    let without_ordinals = ORDINAL_RE.replace_all(rest, "$1");
    without_ordinals
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_string()
}
