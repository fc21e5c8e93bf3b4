//! Page layout: rich-text paragraphs, flowables and two-pass pagination.
//!
//! Layout works in PDF points with the origin at the bottom-left corner of an
//! A4 page. The first pass flows content top to bottom and records every draw
//! operation per page; the second pass, run once the page count is known,
//! lets the page decorations stamp running furniture such as `n de total`.

use crate::fonts::Font;
use crate::table::LaidTable;

pub const PAGE_WIDTH: f32 = 595.2756;
pub const PAGE_HEIGHT: f32 = 841.8898;

/// Superscript glyphs are set smaller and raised off the baseline.
const SUPERSCRIPT_SCALE: f32 = 0.7;
const SUPERSCRIPT_RISE: f32 = 0.4;
/// Baseline offset below the top of a line box, as a fraction of font size.
const ASCENT: f32 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const LIGHT_GREY: Rgb = Rgb(0.827, 0.827, 0.827);
    pub const WHITE_SMOKE: Rgb = Rgb(0.961, 0.961, 0.961);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageId {
    Logo,
    Chart,
}

impl ImageId {
    pub fn resource_name(self) -> &'static str {
        match self {
            ImageId::Logo => "Im1",
            ImageId::Chart => "Im2",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        font: Font,
        size: f32,
        rise: f32,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
    Image {
        id: ImageId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Everything drawn on one page, in painting order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageState {
    pub ops: Vec<DrawOp>,
}

impl PageState {
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: impl Into<String>) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            font,
            size,
            rise: 0.0,
            text: text.into(),
        });
    }

    /// Text whose right edge sits at `x_right`.
    pub fn text_right(&mut self, x_right: f32, y: f32, font: Font, size: f32, text: &str) {
        let width = font.text_width(text, size);
        self.text(x_right - width, y, font, size, text);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32) {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y,
            width,
            height,
            line_width,
        });
    }

    pub fn image(&mut self, id: ImageId, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image {
            id,
            x,
            y,
            width,
            height,
        });
    }

    /// Concatenated text of the page, for inspection.
    pub fn plain_text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub align: Align,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inline {
    Text {
        text: String,
        font: Font,
        superscript: bool,
    },
    Break,
}

/// Inline runs sharing one paragraph style; wrapped at layout time.
#[derive(Clone, Debug, PartialEq)]
pub struct Paragraph {
    pub style: TextStyle,
    pub inlines: Vec<Inline>,
}

impl Paragraph {
    pub fn new(style: TextStyle) -> Self {
        Self {
            style,
            inlines: Vec::new(),
        }
    }

    pub fn plain(style: TextStyle, text: impl Into<String>) -> Self {
        Self::new(style).text(text)
    }

    fn run(mut self, text: impl Into<String>, font: Font, superscript: bool) -> Self {
        self.inlines.push(Inline::Text {
            text: text.into(),
            font,
            superscript,
        });
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        let font = self.style.font;
        self.run(text, font, false)
    }

    pub fn bold(self, text: impl Into<String>) -> Self {
        self.run(text, Font::Bold, false)
    }

    pub fn superscript(self, text: impl Into<String>) -> Self {
        let font = self.style.font;
        self.run(text, font, true)
    }

    pub fn line_break(mut self) -> Self {
        self.inlines.push(Inline::Break);
        self
    }

    /// Greedy word wrap into lines no wider than `max_width` where possible.
    /// A single word wider than the line is kept whole on its own line.
    pub fn layout(&self, max_width: f32) -> TextBlock {
        let size = self.style.size;
        let mut lines = Vec::new();
        let mut current = LineBuilder::default();

        for inline in &self.inlines {
            let (text, font, superscript) = match inline {
                Inline::Break => {
                    lines.push(std::mem::take(&mut current).finish());
                    continue;
                }
                Inline::Text {
                    text,
                    font,
                    superscript,
                } => (text, *font, *superscript),
            };
            let run_size = if superscript {
                size * SUPERSCRIPT_SCALE
            } else {
                size
            };
            for (idx, word) in text.split(' ').enumerate() {
                if idx > 0 {
                    current.pending_space = Some(font.text_width(" ", run_size));
                }
                if word.is_empty() {
                    continue;
                }
                let width = font.text_width(word, run_size);
                if current.overflows(width, max_width) {
                    lines.push(std::mem::take(&mut current).finish());
                }
                current.push_word(word, font, superscript, run_size, width);
            }
        }
        lines.push(current.finish());

        TextBlock {
            lines,
            size,
            leading: self.style.leading,
            align: self.style.align,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub rise: f32,
    /// Offset from the start of the line.
    pub x: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: f32,
}

#[derive(Default)]
struct LineBuilder {
    fragments: Vec<Fragment>,
    width: f32,
    pending_space: Option<f32>,
}

impl LineBuilder {
    fn overflows(&self, word_width: f32, max_width: f32) -> bool {
        let space = self.pending_space.unwrap_or(0.0);
        !self.fragments.is_empty() && self.width + space + word_width > max_width
    }

    fn push_word(&mut self, word: &str, font: Font, superscript: bool, size: f32, width: f32) {
        let space = match self.pending_space.take() {
            Some(space) if !self.fragments.is_empty() => space,
            _ => 0.0,
        };
        let text = if space > 0.0 {
            format!(" {word}")
        } else {
            word.to_string()
        };
        let rise = if superscript {
            size / SUPERSCRIPT_SCALE * SUPERSCRIPT_RISE
        } else {
            0.0
        };
        match self.fragments.last_mut() {
            Some(last) if last.font == font && last.size == size && last.rise == rise => {
                last.text.push_str(&text);
            }
            _ => self.fragments.push(Fragment {
                text,
                font,
                size,
                rise,
                x: self.width,
            }),
        }
        self.width += space + width;
    }

    fn finish(self) -> Line {
        Line {
            fragments: self.fragments,
            width: self.width,
        }
    }
}

/// A wrapped paragraph ready to be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<Line>,
    pub size: f32,
    pub leading: f32,
    pub align: Align,
}

impl TextBlock {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.leading
    }

    /// Draw inside a box of `width` whose top edge is at `y_top`.
    pub fn draw(&self, page: &mut PageState, x: f32, y_top: f32, width: f32) {
        for (idx, line) in self.lines.iter().enumerate() {
            let baseline = y_top - idx as f32 * self.leading - self.size * ASCENT;
            let x_line = match self.align {
                Align::Left => x,
                Align::Center => x + (width - line.width) / 2.0,
                Align::Right => x + width - line.width,
            };
            for fragment in &line.fragments {
                page.ops.push(DrawOp::Text {
                    x: x_line + fragment.x,
                    y: baseline,
                    font: fragment.font,
                    size: fragment.size,
                    rise: fragment.rise,
                    text: fragment.text.clone(),
                });
            }
        }
    }
}

/// The content rectangle of a page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub width: f32,
    pub y_top: f32,
    pub y_bottom: f32,
}

impl Frame {
    pub fn height(&self) -> f32 {
        self.y_top - self.y_bottom
    }
}

pub enum Flowable {
    Spacer(f32),
    Paragraph(Paragraph),
    Image {
        id: ImageId,
        width: f32,
        height: f32,
    },
    Table(LaidTable),
}

/// Running page furniture.
pub trait PageDecorations {
    /// Drawn as soon as a page is opened.
    fn begin_page(&self, page: &mut PageState);

    /// Drawn once the total page count is known.
    fn finish_page(&self, page: &mut PageState, number: usize, total: usize);
}

/// Flows content into frames, opening pages as needed.
pub struct Paginator<'a> {
    frame: Frame,
    decorations: &'a dyn PageDecorations,
    pages: Vec<PageState>,
    current: PageState,
    cursor: f32,
    fresh: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(frame: Frame, decorations: &'a dyn PageDecorations) -> Self {
        let mut current = PageState::default();
        decorations.begin_page(&mut current);
        Self {
            frame,
            decorations,
            pages: Vec::new(),
            current,
            cursor: frame.y_top,
            fresh: true,
        }
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.frame.y_bottom
    }

    fn new_page(&mut self) {
        let mut next = PageState::default();
        self.decorations.begin_page(&mut next);
        self.pages.push(std::mem::replace(&mut self.current, next));
        self.cursor = self.frame.y_top;
        self.fresh = true;
    }

    /// Open a new page unless `height` fits or the page is still empty.
    fn reserve(&mut self, height: f32) {
        if height > self.remaining() && !self.fresh {
            self.new_page();
        }
    }

    pub fn add(&mut self, flowable: Flowable) {
        match flowable {
            Flowable::Spacer(height) => {
                if self.fresh {
                    return;
                }
                if height >= self.remaining() {
                    self.new_page();
                } else {
                    self.cursor -= height;
                }
            }
            Flowable::Paragraph(paragraph) => {
                let block = paragraph.layout(self.frame.width);
                let height = block.height();
                self.reserve(height);
                block.draw(&mut self.current, self.frame.x, self.cursor, self.frame.width);
                self.cursor -= height;
                self.fresh = false;
            }
            Flowable::Image { id, width, height } => {
                self.reserve(height);
                let x = self.frame.x + (self.frame.width - width) / 2.0;
                self.current.image(id, x, self.cursor - height, width, height);
                self.cursor -= height;
                self.fresh = false;
            }
            Flowable::Table(table) => self.add_table(&table),
        }
    }

    fn add_table(&mut self, table: &LaidTable) {
        let x = self.frame.x + (self.frame.width - table.width) / 2.0;
        let header_height = table.header_height();
        let (header, body) = table.rows.split_at(table.header_rows);

        let first_body = body.first().map_or(0.0, |row| row.height);
        self.reserve(header_height + first_body);
        for row in header {
            row.draw(&mut self.current, x, self.cursor, table.grid_width);
            self.cursor -= row.height;
        }
        self.fresh = false;

        for row in body {
            if row.height > self.remaining() {
                self.new_page();
                for repeated in header {
                    repeated.draw(&mut self.current, x, self.cursor, table.grid_width);
                    self.cursor -= repeated.height;
                }
            }
            row.draw(&mut self.current, x, self.cursor, table.grid_width);
            self.cursor -= row.height;
            self.fresh = false;
        }
    }

    /// Close the last page and run the finishing pass over every page.
    pub fn finish(mut self) -> Vec<PageState> {
        let mut pages = std::mem::take(&mut self.pages);
        pages.push(self.current);
        let total = pages.len();
        for (idx, page) in pages.iter_mut().enumerate() {
            self.decorations.finish_page(page, idx + 1, total);
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Padding, Row, Table, VAlign};

    const BODY: TextStyle = TextStyle {
        font: Font::Regular,
        size: 9.0,
        leading: 11.0,
        align: Align::Left,
    };

    struct Numbering;

    impl PageDecorations for Numbering {
        fn begin_page(&self, page: &mut PageState) {
            page.text(10.0, 830.0, Font::Regular, 9.0, "header");
        }

        fn finish_page(&self, page: &mut PageState, number: usize, total: usize) {
            page.text_right(585.0, 20.0, Font::Regular, 9.0, &format!("{number} de {total}"));
        }
    }

    fn frame() -> Frame {
        Frame {
            x: 72.0,
            width: 451.0,
            y_top: 700.0,
            y_bottom: 50.0,
        }
    }

    fn texts(block: &TextBlock) -> Vec<String> {
        block
            .lines
            .iter()
            .map(|line| {
                line.fragments
                    .iter()
                    .map(|f| f.text.as_str())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let paragraph = Paragraph::plain(BODY, "alpha beta gamma");
        let width = Font::Regular.text_width("alpha beta", 9.0) + 1.0;
        let block = paragraph.layout(width);
        assert_eq!(texts(&block), vec!["alpha beta", "gamma"]);
        assert_eq!(block.height(), 22.0);
    }

    #[test]
    fn collapses_repeated_spaces_and_honours_breaks() {
        let paragraph = Paragraph::new(BODY)
            .bold("Data:")
            .text(" 01/01/2024  •  ")
            .bold("Fim:")
            .line_break()
            .text("10:10");
        let block = paragraph.layout(500.0);
        assert_eq!(texts(&block), vec!["Data: 01/01/2024 • Fim:", "10:10"]);
        let first = &block.lines[0].fragments;
        assert_eq!(first[0].font, Font::Bold);
        assert_eq!(first[1].font, Font::Regular);
        assert_eq!(first[1].text, " 01/01/2024 •");
        assert_eq!(first[2].text, " Fim:");
    }

    #[test]
    fn superscript_is_raised_and_smaller() {
        let block = Paragraph::new(BODY).text("min").superscript("-1").layout(200.0);
        let fragments = &block.lines[0].fragments;
        assert_eq!(fragments.len(), 2);
        assert!(fragments[1].rise > 0.0);
        assert!(fragments[1].size < 9.0);
        assert_eq!(fragments[1].x, Font::Regular.text_width("min", 9.0));
    }

    #[test]
    fn centered_lines_are_offset() {
        let block = Paragraph::plain(
            TextStyle {
                align: Align::Center,
                ..BODY
            },
            "abc",
        )
        .layout(100.0);
        let mut page = PageState::default();
        block.draw(&mut page, 0.0, 100.0, 100.0);
        match &page.ops[0] {
            DrawOp::Text { x, .. } => {
                let expected = (100.0 - Font::Regular.text_width("abc", 9.0)) / 2.0;
                assert!((x - expected).abs() < 1e-4);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn finishing_pass_stamps_every_page() {
        let decorations = Numbering;
        let mut paginator = Paginator::new(frame(), &decorations);
        for _ in 0..3 {
            paginator.add(Flowable::Image {
                id: ImageId::Chart,
                width: 420.0,
                height: 400.0,
            });
        }
        let pages = paginator.finish();
        assert_eq!(pages.len(), 3);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.plain_text();
            assert!(text.starts_with("header"));
            assert!(text.ends_with(&format!("{} de 3", idx + 1)));
        }
    }

    #[test]
    fn spacer_is_dropped_at_top_of_page() {
        let decorations = Numbering;
        let mut paginator = Paginator::new(frame(), &decorations);
        paginator.add(Flowable::Spacer(50.0));
        paginator.add(Flowable::Image {
            id: ImageId::Chart,
            width: 100.0,
            height: 100.0,
        });
        let pages = paginator.finish();
        match pages[0].ops[1] {
            DrawOp::Image { y, .. } => assert_eq!(y, 600.0),
            ref other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn table_header_repeats_after_page_break() {
        let cell = |text: &str| Cell::new(Paragraph::plain(BODY, text));
        let padding = Padding::uniform(3.0);
        let mut rows = vec![Row::new(vec![cell("ID")], padding, VAlign::Middle)];
        for id in 0..60 {
            rows.push(Row::new(vec![cell(&id.to_string())], padding, VAlign::Middle));
        }
        let table = Table {
            columns: vec![60.0],
            rows,
            header_rows: 1,
            grid_width: 0.25,
        };
        let decorations = Numbering;
        let mut paginator = Paginator::new(frame(), &decorations);
        paginator.add(Flowable::Table(table.layout()));
        let pages = paginator.finish();
        assert_eq!(pages.len(), 2);
        for page in &pages {
            let count = page.plain_text().matches("ID").count();
            assert_eq!(count, 1);
        }
        assert!(pages[1].plain_text().contains("59"));
    }
}
