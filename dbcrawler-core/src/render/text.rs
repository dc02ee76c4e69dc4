//! Fixed-width text encoding.

use super::{Alignment, Cell, CellRenderer};

/// Separator between text cells.
pub(crate) const SEPARATOR: &str = "  ";

/// Truncates and pads to `max_width` characters; colspan and style are ignored.
pub(crate) struct TextRenderer;

impl CellRenderer for TextRenderer {
    fn render_cell(&self, cell: &Cell) -> String {
        let Some(width) = cell.max_width else {
            return cell.content.clone();
        };

        let content: String = cell.content.chars().take(width).collect();
        match cell.alignment {
            Alignment::Left => format!("{:<width$}", content, width = width),
            Alignment::Right => format!("{:>width$}", content, width = width),
        }
    }

    fn render_row(&self, cells: &[Cell]) -> String {
        cells
            .iter()
            .map(|cell| self.render_cell(cell))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::OutputFormat;

    fn cell(content: &str, width: usize, alignment: Alignment) -> Cell {
        Cell::new(content, OutputFormat::Text)
            .with_max_width(width)
            .with_alignment(alignment)
    }

    #[test]
    fn test_pad_and_truncate() {
        let renderer = TextRenderer;
        assert_eq!(renderer.render_cell(&cell("ID", 5, Alignment::Left)), "ID   ");
        assert_eq!(renderer.render_cell(&cell("ID", 5, Alignment::Right)), "   ID");
        assert_eq!(
            renderer.render_cell(&cell("CUSTOMERLIST", 8, Alignment::Left)),
            "CUSTOMER"
        );
        assert_eq!(
            renderer.render_cell(&cell("CUSTOMERLIST", 8, Alignment::Right)),
            "CUSTOMER"
        );
        assert_eq!(renderer.render_cell(&cell("", 3, Alignment::Left)), "   ");
    }

    #[test]
    fn test_width_counts_characters() {
        let rendered = TextRenderer.render_cell(&cell("Größe", 7, Alignment::Left));
        assert_eq!(rendered, "Größe  ");
        assert_eq!(rendered.chars().count(), 7);
    }

    #[test]
    fn test_unbounded_cell_is_verbatim() {
        let cell = Cell::new(" padded ", OutputFormat::Text).with_alignment(Alignment::Right);
        assert_eq!(TextRenderer.render_cell(&cell), " padded ");
    }

    #[test]
    fn test_ignores_colspan_and_style() {
        let cells = vec![
            cell("a", 2, Alignment::Left).with_colspan(2).with_style("name"),
            Cell::new("b", OutputFormat::Text),
        ];
        assert_eq!(TextRenderer.render_row(&cells), "a   b");
    }
}
