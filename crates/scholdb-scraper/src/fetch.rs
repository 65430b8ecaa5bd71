//! Shared HTTP page fetcher used by every source adapter.

use std::time::Duration;

use reqwest::Client;

use crate::error::FetchErrorKind;

/// Thin wrapper around a configured `reqwest::Client`.
///
/// Cloning is cheap; all adapters share one connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Creates a fetcher with the given per-request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchErrorKind::Http`] if the underlying client cannot be
    /// constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchErrorKind> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// GETs `url` and returns the response body as text.
    ///
    /// # Errors
    ///
    /// - [`FetchErrorKind::NotFound`] for HTTP 404.
    /// - [`FetchErrorKind::UnexpectedStatus`] for any other non-2xx status.
    /// - [`FetchErrorKind::Http`] for network, TLS, or body-read failures.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchErrorKind> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/rss+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchErrorKind::NotFound {
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(FetchErrorKind::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}
