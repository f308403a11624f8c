//! PDF drawing for discharge summaries.
//!
//! Draws a [`DocumentLayout`] onto A4 pages with `printpdf`: blue border, branded header with
//! optional logo, shaded section labels, wrapped bodies, signature and footer. Content flows
//! onto new pages as needed and every page gets the border.
//!
//! Coordinates in this module are measured from the top of the page and converted to
//! `printpdf`'s bottom-left origin when drawing.

use crate::constants::{ORGANISATION_NAME, ORGANISATION_TAGLINE};
use crate::layout::{DocumentLayout, LayoutBlock};
use crate::patient::PatientRecord;
use crate::synthesis::DischargeSummary;
use crate::{DischargeError, DischargeResult};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb,
};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const BORDER_INSET: f32 = 10.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 15.0;
const MARGIN_BOTTOM: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

const LOGO_TOP: f32 = 15.0;
const LOGO_LEFT: f32 = 85.0;
const LOGO_WIDTH: f32 = 40.0;
const HEADER_TOP: f32 = 55.0;

const BAND_HEIGHT: f32 = 10.0;
const TAGLINE_HEIGHT: f32 = 8.0;
const LINE_HEIGHT: f32 = 8.0;
const SECTION_GAP: f32 = 5.0;
const BODY_SIZE: f32 = 12.0;
const TITLE_SIZE: f32 = 14.0;
const TAGLINE_SIZE: f32 = 10.0;
const BODY_WRAP_CHARS: usize = 85;

const BLUE: (f32, f32, f32) = (0.0, 102.0 / 255.0, 204.0 / 255.0);
const LIGHT_GREY: (f32, f32, f32) = (240.0 / 255.0, 240.0 / 255.0, 240.0 / 255.0);
const WHITE: (f32, f32, f32) = (1.0, 1.0, 1.0);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Splits `text` into lines of at most `max_chars` characters on word boundaries.
///
/// Words longer than a whole line are hard-broken.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if !current.is_empty() && current.chars().count() + word_len + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }

        if word_len > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(max_chars).peekable();
            while let Some(chunk) = chunks.next() {
                let piece: String = chunk.iter().collect();
                if chunks.peek().is_some() {
                    lines.push(piece);
                } else {
                    current = piece;
                }
            }
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// Helvetica averages roughly half an em per character.
fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> DischargeResult<Self> {
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| DischargeError::Pdf(format!("font error: {e}")))
        };
        Ok(Self {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
        })
    }
}

/// Drawing cursor over the current page.
struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    /// Distance from the top of the page, in millimetres.
    y: f32,
    pages: usize,
}

impl<'a> Canvas<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference, fonts: Fonts) -> Self {
        let canvas = Self {
            doc,
            layer,
            fonts,
            y: MARGIN_TOP,
            pages: 1,
        };
        canvas.draw_border();
        canvas
    }

    fn draw_border(&self) {
        self.layer.set_outline_color(rgb(BLUE));
        self.layer.set_outline_thickness(0.5);
        let rect = Rect::new(
            Mm(BORDER_INSET),
            Mm(BORDER_INSET),
            Mm(PAGE_WIDTH - BORDER_INSET),
            Mm(PAGE_HEIGHT - BORDER_INSET),
        )
        .with_mode(PaintMode::Stroke);
        self.layer.add_rect(rect);
    }

    /// Starts a new page if fewer than `needed` millimetres remain.
    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed <= PAGE_HEIGHT - MARGIN_BOTTOM {
            return;
        }
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages + 1));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = MARGIN_TOP;
        self.draw_border();
    }

    fn baseline(&self, height: f32) -> Mm {
        // Text sits roughly a third of the way up from the bottom of its cell.
        Mm(PAGE_HEIGHT - self.y - height * 0.65)
    }

    fn band(&mut self, height: f32, fill: (f32, f32, f32)) {
        self.layer.set_fill_color(rgb(fill));
        let rect = Rect::new(
            Mm(MARGIN_LEFT),
            Mm(PAGE_HEIGHT - self.y - height),
            Mm(PAGE_WIDTH - MARGIN_RIGHT),
            Mm(PAGE_HEIGHT - self.y),
        )
        .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
    }

    fn text(&mut self, text: &str, size: f32, height: f32, font: FontStyle, centred: bool) {
        let x = if centred {
            MARGIN_LEFT + ((CONTENT_WIDTH - approx_text_width(text, size)) / 2.0).max(0.0)
        } else {
            MARGIN_LEFT + 1.0
        };
        let font = match font {
            FontStyle::Regular => &self.fonts.regular,
            FontStyle::Bold => &self.fonts.bold,
            FontStyle::Italic => &self.fonts.italic,
        };
        self.layer
            .use_text(text, size, Mm(x), self.baseline(height), font);
        self.y += height;
    }

    fn rule(&mut self) {
        self.layer.set_outline_color(rgb(BLUE));
        self.layer.set_outline_thickness(0.5);
        let y = Mm(PAGE_HEIGHT - self.y);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), y), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN_RIGHT), y), false),
            ],
            is_closed: false,
        });
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    /// Organisation name on a blue band with the tagline beneath.
    fn brand_block(&mut self) {
        self.ensure_space(BAND_HEIGHT + TAGLINE_HEIGHT);
        self.band(BAND_HEIGHT, BLUE);
        self.layer.set_fill_color(rgb(WHITE));
        self.text(ORGANISATION_NAME, TITLE_SIZE, BAND_HEIGHT, FontStyle::Bold, true);
        self.layer.set_fill_color(rgb(BLACK));
        self.text(ORGANISATION_TAGLINE, TAGLINE_SIZE, TAGLINE_HEIGHT, FontStyle::Italic, true);
    }

    fn label(&mut self, label: &str) {
        // Keep the label with at least one body line.
        self.ensure_space(BAND_HEIGHT + LINE_HEIGHT);
        self.band(BAND_HEIGHT, LIGHT_GREY);
        self.layer.set_fill_color(rgb(BLACK));
        self.text(label, BODY_SIZE, BAND_HEIGHT, FontStyle::Bold, false);
    }

    fn paragraph(&mut self, body: &str, style: FontStyle) {
        for line in wrap_text(body, BODY_WRAP_CHARS) {
            self.ensure_space(LINE_HEIGHT);
            self.text(&line, BODY_SIZE, LINE_HEIGHT, style, false);
        }
    }
}

#[derive(Clone, Copy)]
enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// Loads the branding image, logging and skipping it on any failure.
fn load_logo(path: &Path) -> Option<Image> {
    use printpdf::image_crate::codecs::png::PngDecoder;

    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "logo image not found");
            return None;
        }
    };
    let decoder = match PngDecoder::new(BufReader::new(file)) {
        Ok(decoder) => decoder,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "logo image is not a valid PNG");
            return None;
        }
    };
    match Image::try_from(decoder) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "logo image could not be embedded");
            None
        }
    }
}

fn place_logo(layer: &PdfLayerReference, image: Image) {
    const DPI: f32 = 300.0;
    let px_width = image.image.width.0 as f32;
    let px_height = image.image.height.0 as f32;
    if px_width <= 0.0 || px_height <= 0.0 {
        return;
    }

    let natural_width = px_width / DPI * 25.4;
    let scale = LOGO_WIDTH / natural_width;
    let height = px_height / DPI * 25.4 * scale;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(LOGO_LEFT)),
            translate_y: Some(Mm(PAGE_HEIGHT - LOGO_TOP - height)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(DPI),
            ..Default::default()
        },
    );
}

/// Renders discharge summaries to PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    logo_path: Option<PathBuf>,
}

impl DocumentRenderer {
    pub fn new(logo_path: Option<PathBuf>) -> Self {
        Self { logo_path }
    }

    /// Lays out and draws the summary for `record`.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::Pdf` if the document cannot be assembled or serialised. A
    /// missing or undecodable logo is not an error.
    pub fn render(&self, record: &PatientRecord, summary: &DischargeSummary) -> DischargeResult<Vec<u8>> {
        let layout = DocumentLayout::build(record, summary);
        self.render_layout(&layout)
    }

    pub fn render_layout(&self, layout: &DocumentLayout) -> DischargeResult<Vec<u8>> {
        self.draw(layout).map(|(bytes, _)| bytes)
    }

    /// Draws the layout, returning the PDF bytes and the page count.
    fn draw(&self, layout: &DocumentLayout) -> DischargeResult<(Vec<u8>, usize)> {
        let (doc, page, layer) =
            PdfDocument::new(layout.title(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
        let first_layer = doc.get_page(page).get_layer(layer);
        let fonts = Fonts::load(&doc)?;

        if let Some(image) = self.logo_path.as_deref().and_then(load_logo) {
            place_logo(&first_layer, image);
        }

        let mut canvas = Canvas::new(&doc, first_layer, fonts);
        canvas.y = HEADER_TOP;
        canvas.brand_block();
        canvas.gap(10.0);
        canvas.rule();
        canvas.gap(SECTION_GAP);

        for block in layout.blocks() {
            match block {
                LayoutBlock::Section { label, body } => {
                    canvas.label(label);
                    for paragraph in body {
                        canvas.paragraph(paragraph, FontStyle::Regular);
                    }
                    canvas.gap(SECTION_GAP);
                }
                LayoutBlock::Notice(text) => {
                    // Sits directly under the identifying data.
                    canvas.y -= SECTION_GAP;
                    canvas.paragraph(text, FontStyle::Regular);
                    canvas.gap(SECTION_GAP);
                }
                LayoutBlock::Signature { label, role } => {
                    canvas.label(label);
                    canvas.paragraph(role, FontStyle::Italic);
                    canvas.gap(10.0);
                }
            }
        }

        canvas.ensure_space(SECTION_GAP + BAND_HEIGHT + TAGLINE_HEIGHT);
        canvas.rule();
        canvas.gap(SECTION_GAP);
        canvas.brand_block();

        let pages = canvas.pages;
        drop(canvas);

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| DischargeError::Pdf(format!("save error: {e}")))?;
        let bytes = buf
            .into_inner()
            .map_err(|e| DischargeError::Pdf(format!("buffer error: {e}")))?;

        tracing::debug!(pages, bytes = bytes.len(), "document rendered");
        Ok((bytes, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmentation::NarrativeAdapter;
    use crate::synthesis::synthesize;
    use std::collections::BTreeSet;

    fn summary_for(record: &PatientRecord, known: &[u32]) -> DischargeSummary {
        let ids: BTreeSet<u32> = known.iter().copied().collect();
        synthesize(
            record,
            None,
            None,
            "2025-04-13",
            &NarrativeAdapter::unavailable(),
            &ids,
        )
        .unwrap()
    }

    #[test]
    fn wrap_text_breaks_on_words() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn overlong_words_are_hard_broken() {
        let token = "x".repeat(200);
        let lines = wrap_text(&format!("see {token} now"), 85);
        assert!(lines.iter().all(|l| l.chars().count() <= 85), "{lines:?}");
        assert_eq!(lines[0], "see");
        assert_eq!(lines[1].len(), 85);
        assert_eq!(lines[2].len(), 85);
        assert_eq!(lines[3], format!("{} now", "x".repeat(30)));
        assert_eq!(lines.concat().matches('x').count(), 200);
    }

    #[test]
    fn renders_a_pdf() {
        let record = PatientRecord::new(1);
        let bytes = DocumentRenderer::default()
            .render(&record, &summary_for(&record, &[1]))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_logo_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let renderer = DocumentRenderer::new(Some(tmp.path().join("logo.png")));
        let record = PatientRecord::new(2);
        let bytes = renderer.render(&record, &summary_for(&record, &[])).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn undecodable_logo_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let logo = tmp.path().join("logo.png");
        std::fs::write(&logo, b"not a png").unwrap();
        assert!(load_logo(&logo).is_none());

        let record = PatientRecord::new(3);
        let bytes = DocumentRenderer::new(Some(logo))
            .render(&record, &summary_for(&record, &[3]))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_content_flows_onto_more_pages() {
        let mut record = PatientRecord::new(4);
        record.allergies = Some("Penicillin ".repeat(400));
        let layout = DocumentLayout::build(&record, &summary_for(&record, &[4]));
        let (bytes, pages) = DocumentRenderer::default().draw(&layout).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(pages >= 3, "only {pages} pages");

        let short = PatientRecord::new(5);
        let layout = DocumentLayout::build(&short, &summary_for(&short, &[5]));
        let (_, pages) = DocumentRenderer::default().draw(&layout).unwrap();
        assert!(pages < 3);
    }
}
