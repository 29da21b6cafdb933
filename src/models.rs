//! Data models for configured sources, extracted items and the daily report.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A competitor website entry loaded from configuration
//! - [`ExtractedItem`]: One announcement or blog post pulled from a page
//! - [`SourceReport`]: The outcome of scraping a single source
//! - [`Report`]: All source outcomes for one calendar date

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

fn default_selector() -> String {
    "article".to_string()
}

/// A competitor website to scrape.
///
/// Sources are defined in the configuration file and never change for the
/// duration of a run.
///
/// # Fields
///
/// * `name` - Display name used as the report section heading
/// * `url` - Absolute page URL, also the base for resolving relative links
/// * `selector` - CSS selector matching one element per news item
/// * `max_items` - Per-source override of the global item limit
/// * `category_prefixes` - Title prefixes that are split off into a category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(default = "default_selector")]
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_prefixes: Vec<String>,
}

impl Source {
    /// Convenience constructor using the default selector.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selector: default_selector(),
            max_items: None,
            category_prefixes: Vec::new(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }
}

/// A single piece of text pulled from a source page.
///
/// Items have no identity beyond their content and are never persisted
/// individually, only as part of a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractedItem {
    /// Headline text, whitespace-collapsed.
    pub title: String,
    /// Absolute link to the full post, if one was found.
    pub link: Option<String>,
    /// Category split off the title via the source's prefix list.
    pub category: Option<String>,
    /// Publication date as shown on the page (not normalized).
    pub date: Option<String>,
    /// Local time the item was extracted.
    pub scraped_at: NaiveDateTime,
}

/// What happened when a source was scraped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Fetched { items: Vec<ExtractedItem> },
    Failed { error: String },
}

/// A source together with the outcome of scraping it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn fetched(source: &Source, items: Vec<ExtractedItem>) -> Self {
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            outcome: SourceOutcome::Fetched { items },
        }
    }

    pub fn failed(source: &Source, error: impl ToString) -> Self {
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            outcome: SourceOutcome::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Failed { .. })
    }

    /// Items extracted for this source; empty when the fetch failed.
    pub fn items(&self) -> &[ExtractedItem] {
        match &self.outcome {
            SourceOutcome::Fetched { items } => items,
            SourceOutcome::Failed { .. } => &[],
        }
    }
}

/// The daily report.
///
/// Each run produces exactly one `Report`, holding one [`SourceReport`] per
/// configured source in configuration order. It is rendered to Markdown
/// (and optionally JSON) once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Report {
    /// The calendar date the report covers.
    pub date: NaiveDate,
    /// Local time the report was assembled.
    pub generated_at: NaiveDateTime,
    pub sources: Vec<SourceReport>,
}

impl Report {
    pub fn failed_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_failed()).count()
    }

    pub fn item_count(&self) -> usize {
        self.sources.iter().map(|s| s.items().len()).sum()
    }

    /// True when there was at least one source and none of them could be fetched.
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.failed_count() == self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn item(title: &str) -> ExtractedItem {
        ExtractedItem {
            title: title.to_string(),
            link: None,
            category: None,
            date: None,
            scraped_at: scraped_at(),
        }
    }

    #[test]
    fn test_source_deserialize_defaults() {
        let yaml = "name: OpenAI\nurl: https://openai.com/blog\n";
        let source: Source = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(source.selector, "article");
        assert_eq!(source.max_items, None);
        assert!(source.category_prefixes.is_empty());
    }

    #[test]
    fn test_source_report_items_on_failure() {
        let source = Source::new("Acme", "https://acme.example/news");
        let report = SourceReport::failed(&source, "HTTP status 503");
        assert!(report.is_failed());
        assert!(report.items().is_empty());
    }

    #[test]
    fn test_report_counts() {
        let a = Source::new("A", "https://a.example");
        let b = Source::new("B", "https://b.example");
        let report = Report {
            date: scraped_at().date(),
            generated_at: scraped_at(),
            sources: vec![
                SourceReport::fetched(&a, vec![item("one"), item("two")]),
                SourceReport::failed(&b, "timeout"),
            ],
        };
        assert_eq!(report.item_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.all_failed());
    }

    #[test]
    fn test_all_failed_needs_sources() {
        let report = Report {
            date: scraped_at().date(),
            generated_at: scraped_at(),
            sources: vec![],
        };
        assert!(!report.all_failed());
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let source = Source::new("Acme", "https://acme.example/news");
        let json = serde_json::to_value(SourceReport::failed(&source, "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["name"], "Acme");
    }
}
