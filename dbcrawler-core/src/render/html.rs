//! HTML table-row encoding.

use super::{Cell, CellRenderer};

/// Escapes `&`, `<` and `>`.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `<td>` cells carrying colspan and class attributes; width is ignored.
pub(crate) struct HtmlRenderer;

impl CellRenderer for HtmlRenderer {
    fn render_cell(&self, cell: &Cell) -> String {
        let mut rendered = String::from("<td");
        if cell.colspan > 1 {
            rendered.push_str(&format!(" colspan='{}'", cell.colspan));
        }
        if let Some(style) = &cell.style {
            rendered.push_str(&format!(" class='{}'", style));
        }
        rendered.push('>');
        rendered.push_str(&escape_html(&cell.content));
        rendered.push_str("</td>");
        rendered
    }

    fn render_row(&self, cells: &[Cell]) -> String {
        let mut rendered = String::from("<tr>");
        for cell in cells {
            rendered.push_str(&self.render_cell(cell));
        }
        rendered.push_str("</tr>");
        rendered
    }
}
