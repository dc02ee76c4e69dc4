//! Report destinations.
//!
//! Handles writing a rendered report to a file or standard output.

use dbcrawler_core::{CrawlError, CrawlWarning, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Writes a report to `path`, or to standard output when no path is given.
///
/// # Errors
/// Returns an I/O error if the destination cannot be written.
pub async fn write_report(report: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => save_report(report, path).await,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(report.as_bytes())
                .await
                .map_err(|e| CrawlError::Io {
                    context: "Failed to write report to stdout".to_string(),
                    source: e,
                })?;
            stdout.flush().await.map_err(|e| CrawlError::Io {
                context: "Failed to flush stdout".to_string(),
                source: e,
            })?;
            Ok(())
        }
    }
}

/// Saves a report to a file, replacing any existing content.
///
/// # Errors
/// Returns an I/O error if the file cannot be written.
pub async fn save_report(report: &str, path: &Path) -> Result<()> {
    tokio::fs::write(path, report)
        .await
        .map_err(|e| CrawlError::Io {
            context: format!("Failed to write to {}", path.display()),
            source: e,
        })?;
    tracing::info!("Report saved to {}", path.display());
    Ok(())
}

/// One line per warning, headed by a count. Empty when there are none.
pub fn warning_summary(warnings: &[CrawlWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut summary = format!("Crawl completed with {} warning(s):\n", warnings.len());
    for warning in warnings {
        summary.push_str(&format!("  - {}\n", warning));
    }
    summary
}
