//! # Competitor Watch
//!
//! Scrapes competitors' news and blog pages and writes a dated Markdown
//! report of their latest announcements.
//!
//! ## Usage
//!
//! ```sh
//! competitor_watch -c config.yaml -o ./reports
//! ```
//!
//! Meant to be run once a day by an external scheduler (cron, systemd timer).
//!
//! ## Architecture
//!
//! Each run is a strictly sequential pipeline:
//! 1. **Configuration**: Load and validate the source list once
//! 2. **Fetching**: GET each source page, retrying transient failures
//! 3. **Extraction**: Select news items from the HTML
//! 4. **Output**: Render the Markdown report (and optionally JSON)
//!
//! A source that cannot be fetched is noted in the report and never aborts
//! the run. The process exits non-zero only when the configuration is
//! invalid, the report (or its requested JSON copy) cannot be written, or
//! every source failed.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod extractor;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod utils;

use cli::Cli;
use config::load_config;
use fetcher::{HttpFetcher, RetryFetch};
use outputs::markdown;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("competitor_watch starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Load configuration ----
    let config = match load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    let reports_dir = PathBuf::from(
        args.reports_dir
            .clone()
            .unwrap_or_else(|| config.reports_dir.clone()),
    );
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(
        sources = config.competitors.len(),
        reports_dir = %reports_dir.display(),
        %date,
        "Configuration ready"
    );

    // Early check: fail before any network traffic if the report can't be written
    if !args.stdout {
        if let Err(e) = ensure_writable_dir(&reports_dir).await {
            error!(
                path = %reports_dir.display(),
                error = %e,
                "Reports directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Fetch and extract ----
    let http = HttpFetcher::from_config(&config)?;
    let fetcher = RetryFetch::new(http, config.max_retries, config.retry_base_delay());
    debug!(?fetcher, "Fetcher ready");

    let report = pipeline::scrape_all(&fetcher, &config, date).await;

    // ---- Output ----
    if args.stdout {
        print!("{}", markdown::render_markdown(&report));
    } else {
        let written = outputs::write_outputs(&report, &reports_dir, args.json).await?;
        info!(paths = ?written, "Report saved");
    }

    let elapsed = start_time.elapsed();
    let failed = report.failed_count();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        sources_ok = report.sources.len() - failed,
        sources_failed = failed,
        items = report.item_count(),
        "Execution complete"
    );

    if report.all_failed() {
        warn!("Every source failed to fetch");
        return Err("all sources failed to fetch".into());
    }

    Ok(())
}
