//! The source adapter capability and the registry that builds adapters from
//! `config/sources.yaml`.

use std::sync::Arc;

use async_trait::async_trait;
use scholdb_core::{RawListing, SourceConfig, SourceKind, SourcesFile};

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::sources::{CardListAdapter, JsonLdAdapter, RssFeedAdapter};

/// One external listing source.
///
/// Implementations fetch their page once per call and extract every listing
/// on it. They never retry and never touch the store.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used in logs, summaries, and `RawListing::source_id`.
    fn id(&self) -> &str;

    /// Fetches and extracts the source's current listings.
    ///
    /// An empty `Vec` means the page was reachable and well-formed but listed
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network failure, non-2xx status, or when the
    /// page lacks the structure this adapter extracts from.
    async fn fetch_listings(&self) -> Result<Vec<RawListing>, FetchError>;
}

/// Builds one adapter per enabled source, in file order.
#[must_use]
pub fn build_adapters(sources: &SourcesFile, fetcher: &PageFetcher) -> Vec<Arc<dyn SourceAdapter>> {
    sources
        .enabled()
        .map(|source| build_adapter(source, fetcher.clone()))
        .collect()
}

fn build_adapter(source: &SourceConfig, fetcher: PageFetcher) -> Arc<dyn SourceAdapter> {
    let id = source.id.trim().to_string();
    let url = source.url.clone();
    match source.kind {
        SourceKind::Jsonld => Arc::new(JsonLdAdapter::new(id, url, fetcher)),
        SourceKind::Cards => Arc::new(CardListAdapter::new(id, url, fetcher)),
        SourceKind::Rss => Arc::new(RssFeedAdapter::new(id, url, fetcher)),
    }
}
