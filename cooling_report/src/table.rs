//! Grid tables built from paragraphs, laid out once and drawn row by row.

use crate::layout::{PageState, Paragraph, Rgb, TextBlock};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Padding {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Padding {
    pub fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub content: Paragraph,
    /// Number of grid columns covered.
    pub span: usize,
}

impl Cell {
    pub fn new(content: Paragraph) -> Self {
        Self::spanning(content, 1)
    }

    pub fn spanning(content: Paragraph, span: usize) -> Self {
        Self {
            content,
            span: span.max(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub padding: Padding,
    pub valign: VAlign,
    pub background: Option<Rgb>,
}

impl Row {
    pub fn new(cells: Vec<Cell>, padding: Padding, valign: VAlign) -> Self {
        Self {
            cells,
            padding,
            valign,
            background: None,
        }
    }

    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// Column widths in points.
    pub columns: Vec<f32>,
    pub rows: Vec<Row>,
    /// Leading rows repeated at the top of every page the table spans.
    pub header_rows: usize,
    /// Stroke width of the cell grid; zero draws no grid.
    pub grid_width: f32,
}

impl Table {
    /// Wrap every cell to its column width and size the rows.
    pub fn layout(&self) -> LaidTable {
        let rows = self
            .rows
            .iter()
            .map(|row| self.layout_row(row))
            .collect();
        LaidTable {
            width: self.columns.iter().sum(),
            rows,
            header_rows: self.header_rows.min(self.rows.len()),
            grid_width: self.grid_width,
        }
    }

    fn layout_row(&self, row: &Row) -> LaidRow {
        let padding = row.padding;
        let mut column = 0;
        let mut offset = 0.0;
        let mut cells = Vec::with_capacity(row.cells.len());
        for cell in &row.cells {
            let end = (column + cell.span).min(self.columns.len());
            let width: f32 = self.columns[column.min(end)..end].iter().sum();
            let inner = (width - padding.left - padding.right).max(0.0);
            cells.push(LaidCell {
                x: offset,
                width,
                block: cell.content.layout(inner),
            });
            offset += width;
            column = end;
        }
        let content = cells
            .iter()
            .map(|cell| cell.block.height())
            .fold(0.0_f32, f32::max);
        LaidRow {
            height: content + padding.top + padding.bottom,
            width: offset,
            padding,
            valign: row.valign,
            background: row.background,
            cells,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaidCell {
    /// Offset from the left edge of the table.
    pub x: f32,
    pub width: f32,
    pub block: TextBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaidRow {
    pub height: f32,
    pub width: f32,
    pub padding: Padding,
    pub valign: VAlign,
    pub background: Option<Rgb>,
    pub cells: Vec<LaidCell>,
}

impl LaidRow {
    /// Paint background, then text, then the grid.
    pub fn draw(&self, page: &mut PageState, x: f32, y_top: f32, grid_width: f32) {
        let y_bottom = y_top - self.height;
        if let Some(color) = self.background {
            page.fill_rect(x, y_bottom, self.width, self.height, color);
        }
        let available = self.height - self.padding.top - self.padding.bottom;
        for cell in &self.cells {
            let shift = match self.valign {
                VAlign::Top => 0.0,
                VAlign::Middle => (available - cell.block.height()) / 2.0,
            };
            cell.block.draw(
                page,
                x + cell.x + self.padding.left,
                y_top - self.padding.top - shift,
                cell.width - self.padding.left - self.padding.right,
            );
        }
        if grid_width > 0.0 {
            for cell in &self.cells {
                page.stroke_rect(x + cell.x, y_bottom, cell.width, self.height, grid_width);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaidTable {
    pub width: f32,
    pub rows: Vec<LaidRow>,
    pub header_rows: usize,
    pub grid_width: f32,
}

impl LaidTable {
    pub fn header_height(&self) -> f32 {
        self.rows[..self.header_rows].iter().map(|row| row.height).sum()
    }

    pub fn height(&self) -> f32 {
        self.rows.iter().map(|row| row.height).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::Font;
    use crate::layout::{Align, DrawOp, TextStyle};

    const STYLE: TextStyle = TextStyle {
        font: Font::Regular,
        size: 9.0,
        leading: 11.0,
        align: Align::Left,
    };

    fn cell(text: &str) -> Cell {
        Cell::new(Paragraph::plain(STYLE, text))
    }

    #[test]
    fn row_height_follows_tallest_cell() {
        let long = "uma observação longa que precisa quebrar em várias linhas";
        let table = Table {
            columns: vec![60.0, 60.0],
            rows: vec![Row::new(
                vec![cell("curto"), cell(long)],
                Padding::new(4.0, 4.0, 2.0, 6.0),
                VAlign::Top,
            )],
            header_rows: 0,
            grid_width: 0.5,
        };
        let laid = table.layout();
        let row = &laid.rows[0];
        let lines = row.cells[1].block.lines.len();
        assert!(lines > 1);
        assert_eq!(row.height, lines as f32 * 11.0 + 8.0);
        assert_eq!(laid.width, 120.0);
        assert_eq!(laid.header_height(), 0.0);
    }

    #[test]
    fn spanning_cells_cover_several_columns() {
        let table = Table {
            columns: vec![36.0, 138.0, 90.0],
            rows: vec![Row::new(
                vec![Cell::spanning(Paragraph::plain(STYLE, "título"), 2), cell("x")],
                Padding::uniform(3.0),
                VAlign::Middle,
            )],
            header_rows: 1,
            grid_width: 0.25,
        };
        let laid = table.layout();
        let cells = &laid.rows[0].cells;
        assert_eq!(cells[0].width, 174.0);
        assert_eq!(cells[1].x, 174.0);
        assert_eq!(laid.header_height(), laid.rows[0].height);
    }

    #[test]
    fn draws_background_text_then_grid() {
        let table = Table {
            columns: vec![50.0, 50.0],
            rows: vec![Row::new(vec![cell("a"), cell("b")], Padding::uniform(3.0), VAlign::Middle)
                .with_background(Rgb::LIGHT_GREY)],
            header_rows: 0,
            grid_width: 0.25,
        };
        let laid = table.layout();
        let mut page = PageState::default();
        laid.rows[0].draw(&mut page, 10.0, 100.0, laid.grid_width);
        assert!(matches!(page.ops[0], DrawOp::FillRect { width, .. } if width == 100.0));
        assert!(matches!(page.ops[1], DrawOp::Text { x, .. } if x == 13.0));
        assert!(matches!(page.ops[3], DrawOp::StrokeRect { x, .. } if x == 10.0));
        assert!(matches!(page.ops[4], DrawOp::StrokeRect { x, .. } if x == 60.0));
        assert_eq!(page.plain_text(), "a b");
    }
}
