//! JSON output of the raw report data.
//!
//! Written next to the Markdown report when `--json` is passed, so the
//! extracted items can be consumed by other tools without re-parsing
//! Markdown.

use super::dated_path;
use crate::models::Report;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` as pretty-printed JSON to `{reports_dir}/report_{date}.json`.
#[instrument(level = "info", skip_all, fields(reports_dir = %reports_dir.display()))]
pub async fn write_report_json(
    report: &Report,
    reports_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(reports_dir).await {
        error!(error = %e, "Failed to create reports dir");
        return Err(e.into());
    }

    let path = dated_path(reports_dir, report.date, "json");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(path)
}
