//! Adapter for listing pages that render one `<article>` card per scholarship.
//!
//! Expected card shape (class names matter, tag names mostly do not):
//!
//! ```html
//! <section class="scholarship-list">
//!   <article class="scholarship-card">
//!     <h3><a href="/s/horizon">Horizon Scholarship</a></h3>
//!     <img src="/img/horizon.jpg">
//!     <p class="description">...</p>
//!     <p class="eligibility">...</p>
//!     <span class="level">Undergraduate</span>
//!     <span class="deadline"><time datetime="2026-12-01">Dec 1</time></span>
//!     <a class="apply" href="https://apply.example.org/horizon">Apply</a>
//!   </article>
//! </section>
//! ```

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scholdb_core::RawListing;

use crate::adapter::SourceAdapter;
use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::PageFetcher;
use crate::html::{
    attr_value, clean_text, has_class, inner_html_by_class, resolve_url, text_by_class,
    time_datetime,
};

static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<article\b([^>]*)>(.*?)</article\s*>").expect("valid article regex")
});

static LIST_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class\s*=\s*["'](?:[^"']*\s)?scholarship-list(?:\s[^"']*)?["']"#)
        .expect("valid list marker regex")
});

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-4]\b[^>]*>(.*?)</h[1-4]\s*>").expect("valid heading regex"));

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>").expect("valid anchor regex"));

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b([^>]*)>").expect("valid img regex"));

const CARD_CLASSES: &[&str] = &["scholarship", "scholarship-card", "scholarship-item"];

pub struct CardListAdapter {
    id: String,
    url: String,
    fetcher: PageFetcher,
}

impl CardListAdapter {
    #[must_use]
    pub fn new(id: String, url: String, fetcher: PageFetcher) -> Self {
        Self { id, url, fetcher }
    }
}

#[async_trait]
impl SourceAdapter for CardListAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_listings(&self) -> Result<Vec<RawListing>, FetchError> {
        let html = self
            .fetcher
            .get_text(&self.url)
            .await
            .map_err(|kind| FetchError::new(&self.id, kind))?;
        parse_card_list(&html, &self.id, &self.url).map_err(|kind| FetchError::new(&self.id, kind))
    }
}

/// Extracts one listing per scholarship card.
///
/// # Errors
///
/// Returns [`FetchErrorKind::Markup`] when the page has neither a
/// `scholarship-list` container nor any scholarship card, which usually means
/// the site layout changed or an error page was served with a 200.
pub fn parse_card_list(
    html: &str,
    source_id: &str,
    page_url: &str,
) -> Result<Vec<RawListing>, FetchErrorKind> {
    let listings: Vec<RawListing> = ARTICLE_RE
        .captures_iter(html)
        .filter(|cap| {
            let attrs = cap.get(1).map_or("", |m| m.as_str());
            CARD_CLASSES.iter().any(|c| has_class(attrs, c))
        })
        .map(|cap| {
            let body = cap.get(2).map_or("", |m| m.as_str());
            parse_card(body, source_id, page_url)
        })
        .collect();

    if listings.is_empty() && !LIST_MARKER_RE.is_match(html) {
        return Err(FetchErrorKind::Markup {
            url: page_url.to_owned(),
            reason: "no scholarship-list container or scholarship cards found".to_owned(),
        });
    }

    Ok(listings)
}

fn parse_card(body: &str, source_id: &str, page_url: &str) -> RawListing {
    let title_text = text_by_class(body, "title")
        .or_else(|| {
            HEADING_RE
                .captures(body)
                .and_then(|cap| cap.get(1))
                .map(|m| clean_text(m.as_str()))
        })
        .unwrap_or_default();

    let deadline_text = inner_html_by_class(body, "deadline")
        .and_then(|inner| time_datetime(inner).or_else(|| Some(clean_text(inner))))
        .or_else(|| time_datetime(body))
        .filter(|s| !s.is_empty());

    let level_text = text_by_class(body, "level").or_else(|| text_by_class(body, "degree-level"));

    RawListing {
        source_id: source_id.to_owned(),
        title_text,
        description_text: text_by_class(body, "description")
            .or_else(|| text_by_class(body, "summary"))
            .unwrap_or_default(),
        eligibility_text: text_by_class(body, "eligibility").unwrap_or_default(),
        deadline_text,
        level_text,
        apply_link_text: apply_href(body)
            .map(|href| resolve_url(page_url, &href))
            .unwrap_or_default(),
        image_url_text: IMG_RE
            .captures(body)
            .and_then(|cap| cap.get(1))
            .and_then(|attrs| {
                attr_value(attrs.as_str(), "data-src").or_else(|| attr_value(attrs.as_str(), "src"))
            })
            .filter(|src| !src.is_empty())
            .map(|src| resolve_url(page_url, &src)),
    }
}

/// The `apply`-classed link if the card has one, otherwise its first link.
fn apply_href(body: &str) -> Option<String> {
    let anchors: Vec<&str> = ANCHOR_RE
        .captures_iter(body)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    anchors
        .iter()
        .find(|attrs| has_class(attrs, "apply"))
        .or_else(|| anchors.first())
        .and_then(|attrs| attr_value(attrs, "href"))
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
}
