//! Command-line interface definitions for Competitor Watch.
//!
//! All arguments can be provided via command-line flags; the config path and
//! reports directory also fall back to environment variables.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for a single scrape-and-report run.
///
/// # Examples
///
/// ```sh
/// # Scrape everything in config.yaml and write reports/report_<today>.md
/// competitor_watch
///
/// # Custom config and output directory, plus a JSON copy of the data
/// competitor_watch -c competitors.json -o /var/reports --json
///
/// # Preview the report without touching the filesystem
/// competitor_watch --stdout
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML (or .json) configuration file
    #[arg(short, long, env = "COMPETITOR_WATCH_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Directory for report files (overrides `reports_dir` from the config)
    #[arg(short = 'o', long, env = "COMPETITOR_WATCH_REPORTS_DIR")]
    pub reports_dir: Option<String>,

    /// Date stamped on the report, YYYY-MM-DD (defaults to today, local time)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Also write the extracted data as report_<date>.json
    #[arg(long)]
    pub json: bool,

    /// Print the Markdown report to stdout instead of writing files
    #[arg(long, conflicts_with = "json")]
    pub stdout: bool,
}
