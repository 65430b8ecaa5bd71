//! Concrete source adapters, one per markup family.

mod cards;
mod jsonld;
mod rss;

pub use cards::{parse_card_list, CardListAdapter};
pub use jsonld::{parse_jsonld_listings, JsonLdAdapter};
pub use rss::{parse_rss_listings, RssFeedAdapter};
