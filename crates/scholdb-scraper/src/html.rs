//! Regex-based HTML helpers shared by the markup adapters.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid entity regex")
});

static TIME_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<time\b[^>]*\bdatetime\s*=\s*["']([^"']+)["']"#)
        .expect("valid time datetime regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:^|\s)([a-z_:][-a-z0-9_:.]*)\s*=\s*["']([^"']*)["']"#)
        .expect("valid attribute regex")
});

// Elements searched when looking an element up by class name.
static CLASS_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(p|div|span|dd|li|section|time|strong|small|em)\b([^>]*)>")
        .expect("valid class element regex")
});

static CLASS_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)</(p|div|span|dd|li|section|time|strong|small|em)\s*>")
        .expect("valid closing element regex")
});

/// Strips tags, decodes entities, and collapses whitespace.
pub(crate) fn clean_text(input: &str) -> String {
    let no_tags = TAG_RE.replace_all(input, " ");
    decode_entities(&no_tags)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decodes the handful of named entities listing pages actually use, plus
/// decimal and hex numeric references. Unknown entities are left untouched.
pub(crate) fn decode_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or(body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('\u{2013}'),
                    "mdash" => Some('\u{2014}'),
                    "lsquo" => Some('\u{2018}'),
                    "rsquo" => Some('\u{2019}'),
                    "ldquo" => Some('\u{201c}'),
                    "rdquo" => Some('\u{201d}'),
                    "hellip" => Some('\u{2026}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Returns the value of attribute `name` from a tag's attribute string.
pub(crate) fn attr_value(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|cap| cap[1].eq_ignore_ascii_case(name))
        .and_then(|cap| cap.get(2))
        .map(|m| decode_entities(m.as_str().trim()))
}

/// Returns `true` if the class attribute in `attrs` contains `class` as a
/// whole token.
pub(crate) fn has_class(attrs: &str, class: &str) -> bool {
    attr_value(attrs, "class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Returns the inner HTML of the first element (earliest in the fragment)
/// whose class list contains `class`.
pub(crate) fn inner_html_by_class<'a>(fragment: &'a str, class: &str) -> Option<&'a str> {
    CLASS_OPEN_RE
        .captures_iter(fragment)
        .filter(|cap| has_class(&cap[2], class))
        .find_map(|cap| {
            let open = cap.get(0)?;
            let tag = &cap[1];
            let rest = &fragment[open.end()..];
            CLASS_CLOSE_RE
                .captures_iter(rest)
                .find(|close| close[1].eq_ignore_ascii_case(tag))
                .and_then(|close| close.get(0))
                .map(|close| &rest[..close.start()])
        })
}

/// Cleaned text of the first element carrying `class`, if any.
pub(crate) fn text_by_class(fragment: &str, class: &str) -> Option<String> {
    inner_html_by_class(fragment, class)
        .map(clean_text)
        .filter(|t| !t.is_empty())
}

/// `datetime` attribute of the first `<time>` element in the fragment.
pub(crate) fn time_datetime(fragment: &str) -> Option<String> {
    TIME_DATETIME_RE
        .captures(fragment)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves `href` against `base`, returning `href` unchanged when either
/// side cannot be parsed.
pub(crate) fn resolve_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    reqwest::Url::parse(base)
        .and_then(|b| b.join(href))
        .map_or_else(|_| href.to_string(), |u| u.to_string())
}
