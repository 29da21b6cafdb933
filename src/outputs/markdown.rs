//! Markdown rendering of the daily report.
//!
//! # Layout
//!
//! ```text
//! # Competitor Intelligence Report
//! **Date:** 2025-05-06
//! **Generated:** 2025-05-06 09:30:00
//!
//! ## OpenAI
//! Source: https://openai.com/blog
//!
//! ### Recent Updates:
//! - **Introducing GPT-5**
//!   - Date: 2025-05-06
//!   - Link: https://openai.com/blog/gpt-5
//!
//! ---
//! ```

use super::dated_path;
use crate::models::{Report, SourceOutcome};
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Backslash-escape characters that would start emphasis, code or link syntax.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render `report` as a Markdown document.
///
/// Sources appear in report order, each closed by a `---` rule. Sources
/// without items say so; failed sources carry their error instead.
pub fn render_markdown(report: &Report) -> String {
    let mut md = String::new();

    writeln!(md, "# Competitor Intelligence Report").unwrap();
    writeln!(md, "**Date:** {}", report.date.format("%Y-%m-%d")).unwrap();
    writeln!(
        md,
        "**Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    )
    .unwrap();

    for source in &report.sources {
        writeln!(md, "## {}", source.name).unwrap();
        writeln!(md, "Source: {}\n", source.url).unwrap();

        match &source.outcome {
            SourceOutcome::Failed { error } => {
                writeln!(md, "_Fetch failed: {}_", escape_markdown(error)).unwrap();
            }
            SourceOutcome::Fetched { items } if items.is_empty() => {
                writeln!(md, "No recent updates found.").unwrap();
            }
            SourceOutcome::Fetched { items } => {
                writeln!(md, "### Recent Updates:").unwrap();
                for item in items {
                    writeln!(md, "- **{}**", escape_markdown(&item.title)).unwrap();
                    if let Some(category) = &item.category {
                        writeln!(md, "  - Category: {}", escape_markdown(category)).unwrap();
                    }
                    if let Some(date) = &item.date {
                        writeln!(md, "  - Date: {}", escape_markdown(date)).unwrap();
                    }
                    if let Some(link) = &item.link {
                        writeln!(md, "  - Link: {}", link).unwrap();
                    }
                }
            }
        }

        writeln!(md, "\n---\n").unwrap();
    }

    md
}

/// Render `report` and write it to `{reports_dir}/report_{date}.md`.
///
/// Creates `reports_dir` if needed and overwrites an existing report for
/// the same date.
///
/// # Returns
///
/// The path written.
#[instrument(level = "info", skip_all, fields(reports_dir = %reports_dir.display(), date = %report.date))]
pub async fn write_report(report: &Report, reports_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(reports_dir).await?;
    let path = dated_path(reports_dir, report.date, "md");
    let md = render_markdown(report);
    fs::write(&path, md.as_bytes()).await?;
    info!(path = %path.display(), bytes = md.len(), "Wrote Markdown report");
    Ok(path)
}
