use super::ReportError;
use std::borrow::Cow;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 10.0;
pub const LINE_HEIGHT: f32 = 10.0;
const BOTTOM_MARGIN: f32 = 20.0;
const CELL_PADDING: f32 = 1.0;
const PT_TO_MM: f32 = 0.352_778;

pub const DARK_BLUE: (u8, u8, u8) = (0, 51, 102);
pub const GREY: (u8, u8, u8) = (128, 128, 128);
pub const BLACK: (u8, u8, u8) = (0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font: FontStyle,
    pub size: f32,
    pub color: (u8, u8, u8),
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// Top-down writer over an A4 document. `y` is the cursor in mm from the top
/// of the current page; content that does not fit starts a new page.
pub struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    y: f32,
    pages: usize,
}

impl PageWriter {
    pub fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(pdf_error)?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(pdf_error)?,
            italic: doc
                .add_builtin_font(BuiltinFont::HelveticaOblique)
                .map_err(pdf_error)?,
        };
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            fonts,
            y: MARGIN,
            pages: 1,
        })
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn ln(&mut self, height: f32) {
        self.y += height;
    }

    /// One line of text in a full-width cell, then moves to the next line.
    pub fn cell(&mut self, text: &str, style: TextStyle, align: Align) {
        self.ensure_space(LINE_HEIGHT);

        let text = win_ansi(text);
        let text = text.as_ref();
        let width = text_width(text, style.size);
        let x = match align {
            Align::Left => MARGIN + CELL_PADDING,
            Align::Center => (PAGE_WIDTH - width) / 2.0,
            Align::Right => PAGE_WIDTH - MARGIN - CELL_PADDING - width,
        };
        // Vertically centred in the cell.
        let baseline = self.y + LINE_HEIGHT / 2.0 + 0.3 * style.size * PT_TO_MM;

        self.layer.set_fill_color(rgb(style.color));
        self.layer.use_text(
            text,
            style.size,
            Mm(x),
            Mm(PAGE_HEIGHT - baseline),
            self.fonts.get(style.font),
        );
        self.y += LINE_HEIGHT;
    }

    /// Word-wrapped text across as many lines as it needs.
    pub fn multi_cell(&mut self, text: &str, style: TextStyle) {
        let max_width = PAGE_WIDTH - 2.0 * (MARGIN + CELL_PADDING);
        for line in wrap(text, style.size, max_width) {
            self.cell(&line, style, Align::Left);
        }
    }

    /// Horizontal rule across the printable width at the cursor.
    pub fn rule(&mut self, color: (u8, u8, u8), thickness_mm: f32) {
        let y = PAGE_HEIGHT - self.y;
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness_mm / PT_TO_MM);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Places `image` at the left margin, `width_mm` wide, aspect preserved.
    pub fn image(&mut self, image: Image, pixel_width: u32, pixel_height: u32, width_mm: f32) {
        let max_height = PAGE_HEIGHT - MARGIN - BOTTOM_MARGIN;
        let mut width = width_mm;
        let mut height = width * pixel_height as f32 / pixel_width as f32;
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }

        self.ensure_space(height);
        let dpi = pixel_width as f32 * 25.4 / width;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(PAGE_HEIGHT - self.y - height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.y += height;
    }

    /// Moves the cursor to `offset` mm above the bottom edge, on a fresh page
    /// if the cursor is already past that point.
    pub fn set_y_from_bottom(&mut self, offset: f32) {
        let target = PAGE_HEIGHT - offset;
        if self.y > target {
            self.new_page();
        }
        self.y = target;
    }

    pub fn finish(self) -> Result<Vec<u8>, ReportError> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - BOTTOM_MARGIN {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = MARGIN;
        self.pages += 1;
    }
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> ReportError {
    ReportError::Pdf(format!("{:?}", err))
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Characters above U+00FF that the WinAnsi encoding still covers.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// The builtin fonts only carry WinAnsi glyphs. Anything else is written as
/// `?` so it shows up in the PDF instead of being dropped.
pub fn win_ansi(text: &str) -> Cow<'_, str> {
    let encodable = |c: char| (c as u32) <= 0xFF || WIN_ANSI_EXTRAS.contains(c);
    if text.chars().all(encodable) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if encodable(c) { c } else { '?' })
            .collect(),
    )
}

/// Approximate Helvetica advance widths, in em.
fn glyph_width(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.278,
        ' ' | 'f' | 't' | 'I' | '(' | ')' | '/' | '[' | ']' | '-' => 0.3,
        'r' => 0.333,
        'm' | 'M' | 'W' | '%' | '@' => 0.85,
        'w' => 0.722,
        'A'..='Z' => 0.68,
        '0'..='9' => 0.556,
        _ => 0.54,
    }
}

pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * size * PT_TO_MM
}

/// Greedy word wrap. Explicit newlines are kept; a word wider than the line
/// is split by character.
pub fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                current.push(c);
                if text_width(&current, size) > max_width {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }

    lines
}
