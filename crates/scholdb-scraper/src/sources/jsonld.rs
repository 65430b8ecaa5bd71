//! Adapter for pages that publish schema.org JSON-LD scholarship data.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scholdb_core::RawListing;
use serde_json::{Map, Value};

use crate::adapter::SourceAdapter;
use crate::error::{FetchError, FetchErrorKind};
use crate::fetch::PageFetcher;
use crate::html::{clean_text, resolve_url};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid json-ld script regex")
});

/// schema.org types treated as a scholarship node.
const SCHOLARSHIP_TYPES: &[&str] = &[
    "scholarship",
    "monetarygrant",
    "grant",
    "educationaloccupationalprogram",
];

pub struct JsonLdAdapter {
    id: String,
    url: String,
    fetcher: PageFetcher,
}

impl JsonLdAdapter {
    #[must_use]
    pub fn new(id: String, url: String, fetcher: PageFetcher) -> Self {
        Self { id, url, fetcher }
    }
}

#[async_trait]
impl SourceAdapter for JsonLdAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_listings(&self) -> Result<Vec<RawListing>, FetchError> {
        let html = self
            .fetcher
            .get_text(&self.url)
            .await
            .map_err(|kind| FetchError::new(&self.id, kind))?;
        parse_jsonld_listings(&html, &self.id, &self.url).map_err(|kind| FetchError::new(&self.id, kind))
    }
}

/// Extracts every scholarship node from the page's JSON-LD blocks.
///
/// Blocks that are not valid JSON are skipped with a warning as long as at
/// least one block parses.
///
/// # Errors
///
/// - [`FetchErrorKind::Markup`] if the page has no JSON-LD block.
/// - [`FetchErrorKind::Json`] if none of its blocks is valid JSON.
pub fn parse_jsonld_listings(
    html: &str,
    source_id: &str,
    page_url: &str,
) -> Result<Vec<RawListing>, FetchErrorKind> {
    let mut blocks = 0usize;
    let mut parsed_blocks = 0usize;
    let mut last_json_error = None;
    let mut listings = Vec::new();

    for cap in SCRIPT_RE.captures_iter(html) {
        blocks += 1;
        let raw = cap.get(1).map_or("", |m| m.as_str()).trim();
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(source = source_id, error = %e, "skipping malformed JSON-LD block");
                last_json_error = Some(e);
                continue;
            }
        };
        parsed_blocks += 1;
        collect_scholarship_nodes(&value, source_id, page_url, &mut listings);
    }

    if blocks == 0 {
        return Err(FetchErrorKind::Markup {
            url: page_url.to_owned(),
            reason: "no JSON-LD blocks found".to_owned(),
        });
    }
    if parsed_blocks == 0 {
        let detail = last_json_error.map(|e| e.to_string()).unwrap_or_default();
        return Err(FetchErrorKind::Json {
            url: page_url.to_owned(),
            reason: format!("none of {blocks} JSON-LD blocks is valid JSON ({detail})"),
        });
    }

    Ok(listings)
}

fn collect_scholarship_nodes(
    value: &Value,
    source_id: &str,
    page_url: &str,
    out: &mut Vec<RawListing>,
) {
    match value {
        Value::Object(map) => {
            if is_scholarship_node(map.get("@type")) {
                out.push(listing_from_node(map, source_id, page_url));
                return;
            }
            // Descend through @graph, ItemList elements, and ListItem wrappers.
            for child in map.values() {
                collect_scholarship_nodes(child, source_id, page_url, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_scholarship_nodes(child, source_id, page_url, out);
            }
        }
        _ => {}
    }
}

fn is_scholarship_node(node_type: Option<&Value>) -> bool {
    let matches = |s: &str| SCHOLARSHIP_TYPES.contains(&s.to_lowercase().as_str());
    match node_type {
        Some(Value::String(s)) => matches(s),
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn listing_from_node(map: &Map<String, Value>, source_id: &str, page_url: &str) -> RawListing {
    let text = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| map.get(*k).and_then(text_value))
            .filter(|s| !s.is_empty())
    };

    let apply_link = text(&["url", "sameAs"])
        .map(|href| resolve_url(page_url, &href))
        .unwrap_or_default();
    let image = map
        .get("image")
        .and_then(url_value)
        .map(|src| resolve_url(page_url, &src));

    RawListing {
        source_id: source_id.to_owned(),
        title_text: text(&["name", "headline"]).unwrap_or_default(),
        description_text: text(&["description"]).unwrap_or_default(),
        eligibility_text: text(&["eligibility", "programPrerequisites", "audience"])
            .unwrap_or_default(),
        deadline_text: text(&["applicationDeadline", "validThrough", "endDate"]),
        level_text: text(&[
            "educationalLevel",
            "educationalCredentialAwarded",
            "educationalProgramMode",
        ]),
        apply_link_text: apply_link,
        image_url_text: image,
    }
}

/// Plain text from a string, a `{ "name" | "description": ... }` object, or
/// the first usable element of an array.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)),
        Value::Object(obj) => ["name", "description", "audienceType"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(clean_text),
        Value::Array(items) => items.iter().find_map(text_value),
        _ => None,
    }
}

/// URL from a string, an `ImageObject` (`url` / `contentUrl`), or an array.
fn url_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("contentUrl"))
            .and_then(url_value),
        Value::Array(items) => items.iter().find_map(url_value),
        _ => None,
    }
}
