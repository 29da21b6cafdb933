//! The scrape stage of a run: fetch and extract every configured source.
//!
//! Sources are processed strictly one after another in configuration order,
//! with the configured politeness delay between consecutive requests. A
//! source that fails to fetch is recorded as failed in its
//! [`SourceReport`] and never stops the remaining sources.

use crate::config::Config;
use crate::extractor::extract_items;
use crate::fetcher::FetchPage;
use crate::models::{Report, Source, SourceReport};
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Fetch and extract a single source.
#[instrument(level = "info", skip_all, fields(source = %source.name, url = %source.url))]
pub async fn scrape_source<F: FetchPage>(
    fetcher: &F,
    source: &Source,
    max_items: usize,
) -> SourceReport {
    let t0 = Instant::now();
    match fetcher.fetch(&source.url).await {
        Ok(html) => {
            let items = extract_items(&html, source, max_items, Local::now().naive_local());
            if items.is_empty() {
                warn!(
                    bytes = html.len(),
                    "No items matched; the page layout may have changed"
                );
            }
            info!(
                count = items.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Scraped source"
            );
            SourceReport::fetched(source, items)
        }
        Err(e) => {
            error!(error = %e, elapsed_ms = t0.elapsed().as_millis() as u64, "Fetch failed; continuing with remaining sources");
            SourceReport::failed(source, e)
        }
    }
}

/// Scrape every configured source and assemble the report for `date`.
///
/// # Returns
///
/// A [`Report`] with exactly one entry per configured source, in
/// configuration order.
#[instrument(level = "info", skip_all, fields(sources = config.competitors.len(), %date))]
pub async fn scrape_all<F: FetchPage>(fetcher: &F, config: &Config, date: NaiveDate) -> Report {
    let delay = config.request_delay();

    let sources: Vec<SourceReport> = stream::iter(config.competitors.iter().enumerate())
        .then(|(i, source)| async move {
            if i > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            scrape_source(fetcher, source, config.max_items_for(source)).await
        })
        .collect()
        .await;

    let report = Report {
        date,
        generated_at: Local::now().naive_local(),
        sources,
    };
    info!(
        ok = report.sources.len() - report.failed_count(),
        failed = report.failed_count(),
        items = report.item_count(),
        "Scrape stage complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchError;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages; unknown URLs answer 404.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, Result<String, StatusCode>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(html.to_string()));
            self
        }

        fn status(mut self, url: &str, status: StatusCode) -> Self {
            self.pages.insert(url.to_string(), Err(status));
            self
        }
    }

    impl FetchPage for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: StatusCode::NOT_FOUND,
                }),
            }
        }
    }

    fn config(sources: &[(&str, &str)]) -> Config {
        Config {
            competitors: sources.iter().map(|(n, u)| Source::new(*n, *u)).collect(),
            delay_between_requests_ms: 0,
            ..Config::default()
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    const PAGE: &str = "<article><h2>Launch</h2><a href='/launch'>x</a></article>\
                        <article><h2>Pricing change</h2></article>";

    #[tokio::test]
    async fn test_one_entry_per_source_in_order() {
        let fetcher = StubFetcher::default()
            .page("https://a.example/news", PAGE)
            .page("https://b.example/blog", "<html></html>")
            .page("https://c.example/", PAGE);
        let config = config(&[
            ("A", "https://a.example/news"),
            ("B", "https://b.example/blog"),
            ("C", "https://c.example/"),
        ]);

        let report = scrape_all(&fetcher, &config, date()).await;
        let names: Vec<_> = report.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(report.date, date());
        assert_eq!(report.sources[0].items().len(), 2);
        assert_eq!(
            report.sources[0].items()[0].link.as_deref(),
            Some("https://a.example/launch")
        );
        assert!(report.sources[1].items().is_empty());
        assert!(!report.sources[1].is_failed());
        assert_eq!(
            *fetcher.calls.lock().unwrap(),
            [
                "https://a.example/news",
                "https://b.example/blog",
                "https://c.example/"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_source_does_not_stop_the_rest() {
        let fetcher = StubFetcher::default()
            .status("https://down.example/", StatusCode::INTERNAL_SERVER_ERROR)
            .page("https://up.example/", PAGE);
        let config = config(&[
            ("Down", "https://down.example/"),
            ("Up", "https://up.example/"),
        ]);

        let report = scrape_all(&fetcher, &config, date()).await;
        assert_eq!(report.sources.len(), 2);
        assert!(report.sources[0].is_failed());
        assert_eq!(report.sources[1].items().len(), 2);
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn test_all_failed() {
        let fetcher = StubFetcher::default();
        let config = config(&[("A", "https://a.example/"), ("B", "https://b.example/")]);
        let report = scrape_all(&fetcher, &config, date()).await;
        assert!(report.all_failed());
        assert_eq!(report.item_count(), 0);
    }

    #[tokio::test]
    async fn test_per_source_item_limit() {
        let fetcher = StubFetcher::default().page("https://a.example/", PAGE);
        let mut config = config(&[("A", "https://a.example/")]);
        config.competitors[0].max_items = Some(1);
        let report = scrape_all(&fetcher, &config, date()).await;
        assert_eq!(report.sources[0].items().len(), 1);
    }

    #[tokio::test]
    async fn test_politeness_delay_between_sources_only() {
        let fetcher = StubFetcher::default();
        let mut config = config(&[
            ("A", "https://a.example/"),
            ("B", "https://b.example/"),
            ("C", "https://c.example/"),
        ]);
        config.delay_between_requests_ms = 100;

        let t0 = Instant::now();
        scrape_all(&fetcher, &config, date()).await;
        let elapsed = t0.elapsed();
        // Two gaps for three sources, none after the last
        assert!(elapsed >= std::time::Duration::from_millis(200));
        assert!(elapsed < std::time::Duration::from_secs(2));
    }
}
