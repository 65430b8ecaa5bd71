//! Adapter for RSS 2.0 scholarship feeds.
//!
//! Each `<item>` becomes one listing. The degree level comes from
//! `<category>` elements, the image from `<enclosure>` / `<media:content>` /
//! `<media:thumbnail>`, and the deadline from a `<deadline>` element in any
//! namespace or, failing that, a `Deadline: ...` phrase in the description.

use std::sync::LazyLock;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use scholdb_core::RawListing;

use crate::adapter::SourceAdapter;
use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::PageFetcher;
use crate::html::{clean_text, decode_entities, resolve_url};

static INLINE_DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bdeadline\s*[:\-]?\s*([^.;<\n]+)").expect("valid inline deadline regex")
});

pub struct RssFeedAdapter {
    id: String,
    url: String,
    fetcher: PageFetcher,
}

impl RssFeedAdapter {
    #[must_use]
    pub fn new(id: String, url: String, fetcher: PageFetcher) -> Self {
        Self { id, url, fetcher }
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_listings(&self) -> Result<Vec<RawListing>, FetchError> {
        let xml = self
            .fetcher
            .get_text(&self.url)
            .await
            .map_err(|kind| FetchError::new(&self.id, kind))?;
        parse_rss_listings(&xml, &self.id, &self.url).map_err(|kind| FetchError::new(&self.id, kind))
    }
}

#[derive(Default)]
struct ItemFields {
    title: String,
    link: String,
    description: String,
    eligibility: String,
    deadline: String,
    categories: Vec<String>,
    image: Option<String>,
}

impl ItemFields {
    fn into_listing(self, source_id: &str, feed_url: &str) -> RawListing {
        let description_text = clean_text(&self.description);
        let deadline_text = Some(clean_text(&self.deadline))
            .filter(|d| !d.is_empty())
            .or_else(|| {
                INLINE_DEADLINE_RE
                    .captures(&description_text)
                    .and_then(|cap| cap.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|d| !d.is_empty())
            });
        let level_text = Some(self.categories.join(" ")).filter(|c| !c.trim().is_empty());

        RawListing {
            source_id: source_id.to_owned(),
            title_text: clean_text(&self.title),
            description_text,
            eligibility_text: clean_text(&self.eligibility),
            deadline_text,
            level_text,
            apply_link_text: resolve_url(feed_url, &self.link),
            image_url_text: self.image.map(|src| resolve_url(feed_url, &src)),
        }
    }
}

/// Parses an RSS 2.0 document into listings.
///
/// # Errors
///
/// - [`FetchErrorKind::Xml`] if the document is not well-formed XML.
/// - [`FetchErrorKind::Markup`] if it parses but has no `<channel>`.
pub fn parse_rss_listings(
    xml: &str,
    source_id: &str,
    feed_url: &str,
) -> Result<Vec<RawListing>, FetchErrorKind> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut listings = Vec::new();
    let mut saw_channel = false;
    let mut current: Option<ItemFields> = None;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "channel" => saw_channel = true,
                    "item" => current = Some(ItemFields::default()),
                    _ => {
                        if let Some(item) = current.as_mut() {
                            take_image(item, &name, &e);
                        }
                    }
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                if let Some(item) = current.as_mut() {
                    take_image(item, &local_name(&e), &e);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(item) = current.as_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            tracing::debug!(
                                source = source_id,
                                tag = %current_tag,
                                error = %err,
                                "non-XML entity in feed text, decoding as HTML"
                            );
                            decode_entities(&String::from_utf8_lossy(e.as_ref()))
                        }
                    };
                    push_field(item, &current_tag, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(item) = current.as_mut() {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    push_field(item, &current_tag, &text);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        listings.push(item.into_listing(source_id, feed_url));
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchErrorKind::Xml {
                    url: feed_url.to_owned(),
                    reason: e.to_string(),
                })
            }
            _ => {}
        }
    }

    if !saw_channel {
        return Err(FetchErrorKind::Markup {
            url: feed_url.to_owned(),
            reason: "document has no RSS <channel>".to_owned(),
        });
    }

    Ok(listings)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn push_field(item: &mut ItemFields, tag: &str, text: &str) {
    match tag {
        "title" => item.title.push_str(text),
        "link" => item.link.push_str(text),
        "description" | "summary" => item.description.push_str(text),
        "eligibility" => item.eligibility.push_str(text),
        "deadline" => item.deadline.push_str(text),
        "category" => item.categories.push(text.trim().to_string()),
        _ => {}
    }
}

/// Records the first image URL found on an enclosure or media element.
fn take_image(item: &mut ItemFields, name: &str, e: &BytesStart<'_>) {
    if item.image.is_some() || !matches!(name, "enclosure" | "content" | "thumbnail") {
        return;
    }

    let mut url = None;
    let mut media_type = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(attr.value.as_ref()).trim().to_string();
        match attr.key.local_name().as_ref() {
            b"url" => url = Some(value),
            b"type" => media_type = Some(value),
            _ => {}
        }
    }

    let is_image = media_type.as_deref().is_none_or(|t| t.starts_with("image/"));
    if is_image {
        item.image = url.filter(|u| !u.is_empty());
    }
}
