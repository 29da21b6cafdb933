//! Output generation for the daily report.
//!
//! # Submodules
//!
//! - [`markdown`]: Renders a [`Report`](crate::models::Report) to Markdown and writes it
//! - [`json`]: Writes the same `Report` as JSON (`--json`)
//!
//! # Output Structure
//!
//! ```text
//! reports_dir/
//! ├── report_2025-05-06.md
//! ├── report_2025-05-06.json   # only with --json
//! └── report_2025-05-07.md
//! ```
//!
//! A second run on the same date overwrites that date's files.

use crate::models::Report;
use chrono::NaiveDate;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{error, instrument};

pub mod json;
pub mod markdown;

/// Write the Markdown report and, when `with_json` is set, its JSON copy.
///
/// Either write failing fails the whole call, so a requested JSON copy is
/// never silently missing.
///
/// # Returns
///
/// The paths written, Markdown first.
#[instrument(level = "info", skip(report), fields(reports_dir = %reports_dir.display()))]
pub async fn write_outputs(
    report: &Report,
    reports_dir: &Path,
    with_json: bool,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut written = vec![markdown::write_report(report, reports_dir).await?];
    if with_json {
        match json::write_report_json(report, reports_dir).await {
            Ok(path) => written.push(path),
            Err(e) => {
                error!(error = %e, "Failed to write JSON report");
                return Err(e);
            }
        }
    }
    Ok(written)
}

/// Path of the report file for `date` with the given extension.
pub fn dated_path(dir: &Path, date: NaiveDate, extension: &str) -> PathBuf {
    dir.join(format!("report_{}.{}", date.format("%Y-%m-%d"), extension))
}
