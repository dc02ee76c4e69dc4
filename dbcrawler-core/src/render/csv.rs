//! CSV encoding through the `csv` crate writer.

use super::{Cell, CellRenderer};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Quotes a field only when it contains `,`, `"`, `\r` or `\n`.
pub(crate) struct CsvRenderer;

impl CsvRenderer {
    fn encode<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
        let fields: Vec<&str> = fields.into_iter().collect();
        // The writer quotes a lone empty field so the record is not a blank line
        if let [""] = fields.as_slice() {
            return String::new();
        }

        let mut writer = WriterBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(Vec::new());

        let encoded = writer
            .write_record(fields)
            .map_err(|e| e.to_string())
            .and_then(|()| writer.into_inner().map_err(|e| e.to_string()))
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

        match encoded {
            Ok(mut line) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                line
            }
            Err(e) => {
                tracing::warn!("Failed to encode CSV row: {}", e);
                String::new()
            }
        }
    }
}

impl CellRenderer for CsvRenderer {
    fn render_cell(&self, cell: &Cell) -> String {
        Self::encode([cell.content.as_str()])
    }

    fn render_row(&self, cells: &[Cell]) -> String {
        if cells.is_empty() {
            return String::new();
        }
        Self::encode(cells.iter().map(|cell| cell.content.as_str()))
    }
}
