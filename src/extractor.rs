//! HTML extraction of news items from a fetched source page.
//!
//! Each element matching the source's CSS selector becomes at most one
//! [`ExtractedItem`]. The rules, in order:
//!
//! 1. **Title**: text of the first `h1`–`h6` inside the element, otherwise
//!    the element's own text cut to 100 characters. Empty titles are skipped.
//! 2. **Category**: a configured prefix at the start of the title is split off.
//! 3. **Link**: the element's own `href` when it is an `<a>`, otherwise the
//!    first `a[href]` inside it, resolved against the source URL.
//! 4. **Date**: the first `<time>` element's `datetime` attribute, or its text.
//!
//! Duplicate items (same link, or same title when there is no link) are
//! dropped before the per-source limit is applied. Malformed HTML never
//! fails; a page without matching elements simply yields nothing.

use crate::models::{ExtractedItem, Source};
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::NaiveDateTime;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Characters kept when an item has no heading and its full text is used.
pub const FALLBACK_TITLE_CHARS: usize = 100;

static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());

/// Extract up to `max_items` items from `html` using `source`'s selector.
///
/// # Arguments
///
/// * `html` - Raw page body as fetched
/// * `source` - The configured source; provides the selector, base URL and category prefixes
/// * `max_items` - Upper bound on returned items
/// * `scraped_at` - Timestamp stamped onto every item
///
/// # Returns
///
/// Items in document order. Never fails: an invalid selector is logged and
/// yields an empty list (configuration validation normally rejects those).
#[instrument(level = "info", skip(html, source, scraped_at), fields(source = %source.name, selector = %source.selector))]
pub fn extract_items(
    html: &str,
    source: &Source,
    max_items: usize,
    scraped_at: NaiveDateTime,
) -> Vec<ExtractedItem> {
    let selector = match Selector::parse(&source.selector) {
        Ok(selector) => selector,
        Err(e) => {
            warn!(error = %e, "Invalid selector; extracting nothing");
            return Vec::new();
        }
    };
    let base = Url::parse(&source.url).ok();
    let document = Html::parse_document(html);

    let matched = document.select(&selector).count();
    let items: Vec<ExtractedItem> = document
        .select(&selector)
        .filter_map(|element| extract_item(element, source, base.as_ref(), scraped_at))
        .unique_by(dedupe_key)
        .take(max_items)
        .collect();

    info!(matched, count = items.len(), "Extracted items");
    debug!(titles = ?items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(), "Item titles");
    items
}

fn dedupe_key(item: &ExtractedItem) -> String {
    match &item.link {
        Some(link) => format!("link:{link}"),
        None => format!("title:{}", item.title),
    }
}

fn extract_item(
    element: ElementRef<'_>,
    source: &Source,
    base: Option<&Url>,
    scraped_at: NaiveDateTime,
) -> Option<ExtractedItem> {
    let heading = element
        .select(&HEADING)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    let raw_title = match heading {
        Some(title) => title,
        None => truncate_chars(&element_text(element), FALLBACK_TITLE_CHARS),
    };
    if raw_title.is_empty() {
        return None;
    }

    let (category, title) = split_category(&raw_title, &source.category_prefixes);
    let link = item_href(element).and_then(|href| resolve_link(base, href));
    let date = element.select(&TIME).next().and_then(time_text);

    Some(ExtractedItem {
        title,
        link,
        category,
        date,
        scraped_at,
    })
}

/// Visible text of `element`, skipping anything under `<script>`, `<style>` or `<noscript>`.
fn element_text(element: ElementRef<'_>) -> String {
    let text = element
        .descendants()
        .filter_map(|node| node.value().as_text().map(|t| (node, t)))
        .filter(|(node, _)| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
            })
        })
        .map(|(_, t)| &**t)
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&text)
}

fn item_href<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    if element.value().name() == "a" {
        if let Some(href) = element.value().attr("href") {
            return Some(href);
        }
    }
    element
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
}

fn time_text(time: ElementRef<'_>) -> Option<String> {
    time.value()
        .attr("datetime")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| Some(element_text(time)).filter(|s| !s.is_empty()))
}

/// Resolve `href` against the source page URL, keeping only http(s) targets.
///
/// Fragment-only links, `javascript:`/`mailto:` links and anything that
/// fails to parse resolve to `None`.
pub fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Split the first matching prefix off `title` as its category.
///
/// The prefix must end on a word boundary (whitespace, `:` or `|`), so
/// "Policymakers meet" keeps its title. A prefix is only split when
/// something is left of the title afterwards.
pub fn split_category(title: &str, prefixes: &[String]) -> (Option<String>, String) {
    for prefix in prefixes {
        if let Some(rest) = title.strip_prefix(prefix.as_str()) {
            if !rest.starts_with(|c: char| c.is_whitespace() || c == ':' || c == '|') {
                continue;
            }
            let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '|');
            if !rest.is_empty() {
                return (Some(prefix.clone()), rest.to_string());
            }
        }
    }
    (None, title.to_string())
}
