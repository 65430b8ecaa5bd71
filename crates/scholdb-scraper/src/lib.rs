pub mod adapter;
pub mod classify;
pub mod deadline;
pub mod error;
pub mod fetch;
mod html;
pub mod normalize;
pub mod sources;

pub use adapter::{build_adapters, SourceAdapter};
pub use classify::classify_degree_level;
pub use deadline::{DeadlineFallback, DeadlineParser};
pub use error::{FetchError, FetchErrorKind};
pub use fetch::PageFetcher;
pub use normalize::{normalize_listing, NormalizationRejection};
pub use sources::{CardListAdapter, JsonLdAdapter, RssFeedAdapter};
