//! Schema report command line for DBCrawler.
//!
//! The binary crawls a database with [`dbcrawler_core`], renders the
//! resulting catalog as a text, CSV or HTML schema report, and writes it to
//! a file or standard output. These modules are exposed for testing.

pub mod output;
pub mod report;
pub mod settings;

pub use report::{ReportOptions, render_report, render_report_with};
pub use settings::CrawlSettings;
