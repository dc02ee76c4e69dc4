//! Format-aware report rendering.
//!
//! A [`Cell`] carries its content plus every layout parameter any format
//! might need; a [`Row`] renders its cells through the [`CellRenderer`]
//! registered for its [`OutputFormat`]. Each format consumes only the
//! parameters it understands:
//!
//! | Format | Width/alignment | Colspan | Style tag |
//! |--------|-----------------|---------|-----------|
//! | text   | truncate + pad  | ignored | ignored   |
//! | csv    | ignored         | ignored | ignored   |
//! | html   | ignored         | `colspan='N'` | `class='TAG'` |
//!
//! Renderers are stateless; output is byte-for-byte reproducible for
//! identical cells.

mod cell;
mod csv;
mod formatter;
mod html;
mod text;

pub use cell::{Alignment, Cell, RenderError, Row};
pub use formatter::ReportFormatter;
pub use html::escape_html;

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Report output encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Fixed-width, space-padded text
    #[default]
    Text,
    /// Comma-separated values, no padding
    Csv,
    /// HTML table rows with attributed cells
    Html,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Text, OutputFormat::Csv, OutputFormat::Html];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "html" | "htm" => Ok(OutputFormat::Html),
            other => Err(CrawlError::configuration(format!(
                "Unknown output format '{}'; expected one of text, csv, html",
                other
            ))),
        }
    }
}

/// One output encoding.
///
/// Implementations receive cells that already passed validation.
pub trait CellRenderer: Send + Sync {
    fn render_cell(&self, cell: &Cell) -> String;

    fn render_row(&self, cells: &[Cell]) -> String;
}

static TEXT: text::TextRenderer = text::TextRenderer;
static CSV: self::csv::CsvRenderer = self::csv::CsvRenderer;
static HTML: html::HtmlRenderer = html::HtmlRenderer;

/// Returns the renderer for `format`.
pub fn renderer_for(format: OutputFormat) -> &'static dyn CellRenderer {
    match format {
        OutputFormat::Text => &TEXT,
        OutputFormat::Csv => &CSV,
        OutputFormat::Html => &HTML,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("htm".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("markdown".parse::<OutputFormat>().is_err());

        for format in OutputFormat::ALL {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_output_format_serde() {
        assert_eq!(serde_json::to_string(&OutputFormat::Html).unwrap(), "\"html\"");
        let format: OutputFormat = serde_json::from_str("\"csv\"").unwrap();
        assert_eq!(format, OutputFormat::Csv);
    }

    #[test]
    fn test_same_row_three_encodings() {
        let cells = |format| {
            vec![
                Cell::new("CUSTOMER_ID", format).with_max_width(12),
                Cell::new("INTEGER", format)
                    .with_max_width(10)
                    .with_style("type"),
            ]
        };

        assert_eq!(
            renderer_for(OutputFormat::Text).render_row(&cells(OutputFormat::Text)),
            "CUSTOMER_ID   INTEGER   "
        );
        assert_eq!(
            renderer_for(OutputFormat::Csv).render_row(&cells(OutputFormat::Csv)),
            "CUSTOMER_ID,INTEGER"
        );
        assert_eq!(
            renderer_for(OutputFormat::Html).render_row(&cells(OutputFormat::Html)),
            "<tr><td>CUSTOMER_ID</td><td class='type'>INTEGER</td></tr>"
        );
    }
}
