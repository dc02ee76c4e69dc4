//! Canonical report row shapes.

use super::{Alignment, Cell, OutputFormat, Row};

const ORDINAL_WIDTH: usize = 2;
const SUBNAME_WIDTH: usize = 32;
const TYPE_WIDTH: usize = 28;
const NAME_WIDTH: usize = 34;
const DESCRIPTION_WIDTH: usize = 36;
const NAME_VALUE_WIDTH: usize = 36;
const EMPTY_ROW_CELLS: usize = 4;

/// Builds the row shapes every report is made of, for one output format.
///
/// # Example
/// ```rust
/// use dbcrawler_core::{OutputFormat, ReportFormatter};
///
/// let formatter = ReportFormatter::new(OutputFormat::Csv);
/// assert_eq!(formatter.detail_row("1", "ID", "INTEGER"), "1,ID,INTEGER");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportFormatter {
    format: OutputFormat,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn cell(&self, content: &str) -> Cell {
        Cell::new(content, self.format)
    }

    /// Free text under a blank ordinal, e.g. a view definition.
    pub fn definition_row(&self, definition: &str) -> String {
        Row::new(self.format)
            .with_cell(self.cell("").with_style("ordinal"))
            .with_cell(
                self.cell(definition)
                    .with_colspan(2)
                    .with_style("definition"),
            )
            .render()
    }

    /// Ordinal, name and type of a sub-item such as a column.
    ///
    /// A blank ordinal renders as an empty, unpadded cell.
    pub fn detail_row(&self, ordinal: &str, sub_name: &str, type_name: &str) -> String {
        let ordinal_cell = if ordinal.trim().is_empty() {
            self.cell("")
        } else {
            self.cell(ordinal).with_max_width(ORDINAL_WIDTH)
        };

        Row::new(self.format)
            .with_cell(ordinal_cell.with_style("ordinal"))
            .with_cell(
                self.cell(sub_name)
                    .with_max_width(SUBNAME_WIDTH)
                    .with_style("subname"),
            )
            .with_cell(
                self.cell(type_name)
                    .with_max_width(TYPE_WIDTH)
                    .with_style("type"),
            )
            .render()
    }

    /// Object name with a right-aligned description.
    pub fn name_row(&self, name: &str, description: &str) -> String {
        Row::new(self.format)
            .with_cell(
                self.cell(name)
                    .with_colspan(2)
                    .with_max_width(NAME_WIDTH)
                    .with_style("name"),
            )
            .with_cell(
                self.cell(description)
                    .with_max_width(DESCRIPTION_WIDTH)
                    .with_alignment(Alignment::Right)
                    .with_style("description"),
            )
            .render()
    }

    pub fn name_value_row(&self, name: &str, value: &str) -> String {
        Row::new(self.format)
            .with_cell(self.cell(name).with_max_width(NAME_VALUE_WIDTH))
            .with_cell(self.cell(value))
            .render()
    }

    pub fn empty_row(&self) -> String {
        Row::blank(self.format, EMPTY_ROW_CELLS).render()
    }

    /// Header of an ad-hoc result set. Text output is rendered as CSV.
    pub fn row_header<S: AsRef<str>>(&self, column_names: &[S]) -> String {
        let format = self.tabular_format();
        column_names
            .iter()
            .fold(Row::new(format), |row, name| {
                row.with_cell(Cell::new(name.as_ref(), format).with_style("name"))
            })
            .render()
    }

    /// Data row of an ad-hoc result set. Text output is rendered as CSV.
    pub fn row<S: AsRef<str>>(&self, values: &[S]) -> String {
        let format = self.tabular_format();
        values
            .iter()
            .fold(Row::new(format), |row, value| {
                row.with_cell(Cell::new(value.as_ref(), format))
            })
            .render()
    }

    fn tabular_format(&self) -> OutputFormat {
        match self.format {
            OutputFormat::Text => OutputFormat::Csv,
            other => other,
        }
    }
}
