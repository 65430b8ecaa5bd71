use thiserror::Error;

/// A failed fetch from one source, tagged with the source that failed.
#[derive(Debug, Error)]
#[error("source '{source_id}': {kind}")]
pub struct FetchError {
    pub source_id: String,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    #[must_use]
    pub fn new(source_id: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
        }
    }

    /// Returns `true` if another attempt could plausibly succeed.
    ///
    /// Network failures, timeouts, and 5xx/429 statuses are transient.
    /// Not-found, other 4xx, and markup failures return the same result on
    /// every attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match &self.kind {
            FetchErrorKind::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            FetchErrorKind::Timeout { .. } => true,
            FetchErrorKind::UnexpectedStatus { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            FetchErrorKind::NotFound { .. }
            | FetchErrorKind::Markup { .. }
            | FetchErrorKind::Xml { .. }
            | FetchErrorKind::Json { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchErrorKind {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("unexpected markup at {url}: {reason}")]
    Markup { url: String, reason: String },

    #[error("malformed XML from {url}: {reason}")]
    Xml { url: String, reason: String },

    #[error("malformed JSON-LD at {url}: {reason}")]
    Json { url: String, reason: String },
}
