//! Cells and rows.

use super::{OutputFormat, renderer_for};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Side a text cell is aligned to; padding goes on the opposite side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Malformed cell parameters.
///
/// Never returned to report producers; an invalid cell renders as a
/// placeholder instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Cell column span must be at least 1")]
    ZeroColspan,

    #[error("Invalid style tag '{tag}'")]
    InvalidStyle { tag: String },
}

/// Content shown in place of a malformed cell.
pub(crate) const PLACEHOLDER: &str = "?";

/// One unit of report output.
///
/// `max_width` only affects text output, `style` only affects HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub content: String,
    pub format: OutputFormat,
    pub alignment: Alignment,
    pub colspan: usize,
    pub max_width: Option<usize>,
    pub style: Option<String>,
}

impl Cell {
    pub fn new(content: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            content: content.into(),
            format,
            alignment: Alignment::Left,
            colspan: 1,
            max_width: None,
            style: None,
        }
    }

    pub fn empty(format: OutputFormat) -> Self {
        Self::new("", format)
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_colspan(mut self, colspan: usize) -> Self {
        self.colspan = colspan;
        self
    }

    pub fn with_max_width(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Checks the parameters that can make a cell unrenderable.
    ///
    /// # Errors
    /// Returns [`RenderError::ZeroColspan`] for a span of 0 and
    /// [`RenderError::InvalidStyle`] for a style tag that is not a single
    /// markup class token.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.colspan == 0 {
            return Err(RenderError::ZeroColspan);
        }
        if let Some(tag) = &self.style
            && !is_class_token(tag)
        {
            return Err(RenderError::InvalidStyle { tag: tag.clone() });
        }
        Ok(())
    }

    /// Returns the cell itself, or a placeholder with the same width and
    /// alignment when it is malformed.
    pub fn sanitized(&self) -> Cell {
        match self.validate() {
            Ok(()) => self.clone(),
            Err(e) => {
                tracing::warn!("Rendering placeholder for malformed cell: {}", e);
                Cell {
                    content: PLACEHOLDER.to_string(),
                    format: self.format,
                    alignment: self.alignment,
                    colspan: 1,
                    max_width: self.max_width,
                    style: None,
                }
            }
        }
    }

    pub fn render(&self) -> String {
        renderer_for(self.format).render_cell(&self.sanitized())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn is_class_token(tag: &str) -> bool {
    !tag.is_empty()
        && !tag
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '<' | '>' | '&'))
}

/// Ordered cells rendered together as one line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub format: OutputFormat,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            cells: Vec::new(),
        }
    }

    /// A row of `count` blank cells.
    pub fn blank(format: OutputFormat, count: usize) -> Self {
        Self {
            format,
            cells: (0..count).map(|_| Cell::empty(format)).collect(),
        }
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.push(cell);
        self
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Renders every cell with the row's format.
    pub fn render(&self) -> String {
        let cells: Vec<Cell> = self.cells.iter().map(Cell::sanitized).collect();
        renderer_for(self.format).render_row(&cells)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_defaults() {
        let cell = Cell::new("ID", OutputFormat::Text);
        assert_eq!(cell.alignment, Alignment::Left);
        assert_eq!(cell.colspan, 1);
        assert_eq!(cell.max_width, None);
        assert_eq!(cell.style, None);
        assert!(cell.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let cell = Cell::new("ID", OutputFormat::Html).with_colspan(0);
        assert_eq!(cell.validate(), Err(RenderError::ZeroColspan));

        for tag in ["", "two words", "a'b", "x<y", "a&b", "q\"uote"] {
            let cell = Cell::new("ID", OutputFormat::Html).with_style(tag);
            assert!(
                matches!(cell.validate(), Err(RenderError::InvalidStyle { .. })),
                "style {:?} should be rejected",
                tag
            );
        }

        let cell = Cell::new("ID", OutputFormat::Html).with_style("subname");
        assert!(cell.validate().is_ok());
    }

    #[test]
    fn test_placeholder_keeps_width_and_alignment() {
        let cell = Cell::new("CUSTOMER", OutputFormat::Text)
            .with_colspan(0)
            .with_max_width(5)
            .with_alignment(Alignment::Right);
        let placeholder = cell.sanitized();
        assert_eq!(placeholder.content, PLACEHOLDER);
        assert_eq!(placeholder.colspan, 1);
        assert_eq!(placeholder.max_width, Some(5));
        assert_eq!(placeholder.alignment, Alignment::Right);
        assert_eq!(cell.render(), "    ?");
    }

    #[test]
    fn test_malformed_html_cell_does_not_abort_row() {
        let row = Row::new(OutputFormat::Html)
            .with_cell(Cell::new("A", OutputFormat::Html).with_style("bad style"))
            .with_cell(Cell::new("B", OutputFormat::Html).with_style("name"));
        assert_eq!(row.render(), "<tr><td>?</td><td class='name'>B</td></tr>");
    }

    #[test]
    fn test_blank_row() {
        let row = Row::blank(OutputFormat::Csv, 4);
        assert_eq!(row.len(), 4);
        assert_eq!(row.to_string(), ",,,");
        assert!(Row::new(OutputFormat::Html).is_empty());
        assert_eq!(Row::new(OutputFormat::Html).to_string(), "<tr></tr>");
    }
}
