//! Crop recommendation report.
//!
//! [`render`] lays a [`RecommendationResult`] out as pages of styled blocks;
//! [`write_pdf`] turns that layout into PDF bytes. Keeping the two apart lets
//! the layout be asserted on directly.

use crate::errors::AppError;
use crate::models::{CropRecommendation, FertilizerTip, RecommendationResult};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rgb,
};

pub const PRODUCT_NAME: &str = "MITTI MITRA";
pub const SUBTITLE: &str = "Crop Recommendation Report";
pub const TOP_MARKER: &str = "★ Top Recommendation";
pub const FALLBACK_NOTE: &str = "Generic recommendations (prediction service unavailable)";
pub const WEATHER_ADVISORY: &str =
    "Based on current weather data, conditions are favorable for the recommended crops.";
pub const DISCLAIMER: &str = "Disclaimer: This recommendation is advisory and based on available data. Please consult with a local agronomist before making final decisions.";
pub const REPORT_FILENAME: &str = "crop-recommendation-report.pdf";

// ============ Layout model ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Title,
    Subtitle,
    Meta,
    Heading,
    Body,
    CropLine,
    /// Crop line of the rank-0 entry.
    TopCropLine,
    TopMarker,
    Bullet,
    Note,
    Disclaimer,
}

impl Style {
    /// Font size in points.
    pub fn font_size(self) -> f32 {
        match self {
            Style::Title => 24.0,
            Style::Subtitle => 16.0,
            Style::Heading => 14.0,
            Style::CropLine | Style::TopCropLine => 13.0,
            Style::Body => 12.0,
            Style::Meta | Style::TopMarker | Style::Bullet | Style::Note | Style::Disclaimer => {
                10.0
            }
        }
    }

    /// Fill colour as RGB in `[0, 1]`.
    pub fn color(self) -> (f32, f32, f32) {
        match self {
            Style::Title | Style::TopCropLine => rgb(0x2E, 0x7D, 0x32),
            Style::Subtitle => rgb(0x4C, 0xAF, 0x50),
            Style::TopMarker => rgb(0xFF, 0x98, 0x00),
            Style::Bullet | Style::Meta => rgb(0x55, 0x55, 0x55),
            Style::Disclaimer => rgb(0x99, 0x99, 0x99),
            Style::Heading | Style::Body | Style::CropLine | Style::Note => (0.0, 0.0, 0.0),
        }
    }

    pub fn bold(self) -> bool {
        matches!(
            self,
            Style::Title | Style::Heading | Style::TopCropLine | Style::TopMarker
        )
    }
}

fn rgb(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub style: Style,
    pub align: Align,
    pub indented: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Line(Line),
    /// Vertical space, in body-text lines.
    Gap(f32),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

impl Page {
    fn text(&mut self, text: impl Into<String>, style: Style) -> &mut Self {
        self.push(text, style, Align::Left, false)
    }

    fn centered(&mut self, text: impl Into<String>, style: Style) -> &mut Self {
        self.push(text, style, Align::Center, false)
    }

    fn indented(&mut self, text: impl Into<String>, style: Style) -> &mut Self {
        self.push(text, style, Align::Left, true)
    }

    fn gap(&mut self, lines: f32) -> &mut Self {
        self.blocks.push(Block::Gap(lines));
        self
    }

    fn push(
        &mut self,
        text: impl Into<String>,
        style: Style,
        align: Align,
        indented: bool,
    ) -> &mut Self {
        self.blocks.push(Block::Line(Line {
            text: text.into(),
            style,
            align,
            indented,
        }));
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Line(line) => Some(line),
            Block::Gap(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub pages: Vec<Page>,
}

impl ReportDocument {
    /// Every line across all pages, in reading order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.pages.iter().flat_map(|p| p.lines())
    }

    /// Index (in reading order) of the first line containing `needle`.
    pub fn find(&self, needle: &str) -> Option<usize> {
        self.lines().position(|l| l.text.contains(needle))
    }
}

// ============ Rendering ============

/// Lays out the report: title, input summary, ranked recommendations and
/// fertilizer advice on the first page; weather and disclaimer on the second.
pub fn render(result: &RecommendationResult) -> ReportDocument {
    let mut first = Page::default();

    first
        .centered(PRODUCT_NAME, Style::Title)
        .centered(SUBTITLE, Style::Subtitle)
        .centered(
            format!(
                "Report {} | Generated {}",
                result.request_id,
                result.generated_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Style::Meta,
        )
        .gap(2.0);

    let input = &result.input;
    first
        .text("Farmer Input Summary", Style::Heading)
        .gap(0.5)
        .text(format!("Location: {}", input.location), Style::Body)
        .text(format!("Soil pH: {}", fmt_num(input.ph)), Style::Body)
        .text(format!("Nitrogen (N): {}", fmt_num(input.n)), Style::Body)
        .text(format!("Phosphorus (P): {}", fmt_num(input.p)), Style::Body)
        .text(format!("Potassium (K): {}", fmt_num(input.k)), Style::Body)
        .gap(2.0);

    first.text("Recommended Crops", Style::Heading).gap(0.5);
    if result.is_fallback {
        first.text(FALLBACK_NOTE, Style::Note).gap(0.5);
    }
    for (rank, rec) in result.recommendations.iter().enumerate() {
        render_crop(&mut first, rank, rec);
    }

    if !result.fertilizer_tips.is_empty() {
        first.gap(1.0).text("Fertilizer Advice", Style::Heading).gap(0.5);
        for tip in &result.fertilizer_tips {
            first.indented(tip_line(tip), Style::Bullet);
        }
    }

    let weather = &result.weather;
    let mut second = Page::default();
    second
        .text("Weather Analysis", Style::Heading)
        .gap(0.5)
        .text(format!("Temperature: {}°C", fmt_num(weather.temp)), Style::Body)
        .text(format!("Humidity: {}%", fmt_num(weather.humidity)), Style::Body)
        .text(format!("Rainfall: {}mm", fmt_num(weather.rainfall)), Style::Body)
        .gap(1.0)
        .text(WEATHER_ADVISORY, Style::Note)
        .gap(4.0)
        .centered(DISCLAIMER, Style::Disclaimer);

    ReportDocument {
        title: format!("{} - {}", PRODUCT_NAME, SUBTITLE),
        pages: vec![first, second],
    }
}

fn render_crop(page: &mut Page, rank: usize, rec: &CropRecommendation) {
    let suitability = match rec.confidence {
        Some(pct) => format!("{}% Suitability", fmt_num(pct)),
        None => "Suitability: N/A".to_string(),
    };
    let is_top = rank == 0;

    page.text(
        format!("{}. {} ({})", rank + 1, rec.crop.to_uppercase(), suitability),
        if is_top { Style::TopCropLine } else { Style::CropLine },
    );
    if is_top {
        page.indented(TOP_MARKER, Style::TopMarker);
    }
    if let Some(yield_t) = rec.predicted_yield {
        page.indented(
            format!("Expected yield: {} tons/hectare", fmt_num(yield_t)),
            Style::Meta,
        );
    }
    for reason in rec.reasoning.iter().filter(|r| !r.trim().is_empty()) {
        page.indented(format!("• {}", reason), Style::Bullet);
    }
    page.gap(1.0);
}

fn tip_line(tip: &FertilizerTip) -> String {
    match tip {
        FertilizerTip::Structured {
            nutrient: Some(nutrient),
            fertilizer,
            reason,
        } => format!("• {}: {} - {}", nutrient, fertilizer, reason),
        FertilizerTip::Structured {
            nutrient: None,
            fertilizer,
            reason,
        } => format!("• {} - {}", fertilizer, reason),
        FertilizerTip::Plain(text) => format!("• {}", text),
    }
}

/// Up to two decimals, trailing zeros dropped.
pub fn fmt_num(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

// ============ PDF output ============

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const INDENT: f32 = 7.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.35;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Writes the laid-out report to PDF bytes, A4, builtin Helvetica.
///
/// The whole document is produced in memory; on error nothing has been
/// handed to the caller.
pub fn write_pdf(doc: &ReportDocument) -> Result<Vec<u8>, AppError> {
    let (pdf, page, layer) =
        PdfDocument::new(&doc.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Render(format!("Failed to load font: {}", e)))?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Render(format!("Failed to load font: {}", e)))?;
    let layer = pdf.get_page(page).get_layer(layer);

    let mut writer = PdfWriter {
        pdf,
        regular,
        bold,
        layer,
        y: PAGE_HEIGHT - MARGIN,
    };

    for (index, page) in doc.pages.iter().enumerate() {
        if index > 0 {
            writer.new_page();
        }
        for block in &page.blocks {
            match block {
                Block::Gap(lines) => writer.advance(lines * Style::Body.font_size() * PT_TO_MM),
                Block::Line(line) => writer.line(line),
            }
        }
    }

    writer
        .pdf
        .save_to_bytes()
        .map_err(|e| AppError::Render(format!("Failed to serialize PDF: {}", e)))
}

struct PdfWriter {
    pdf: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    /// Baseline cursor, millimetres from the bottom edge.
    y: f32,
}

impl PdfWriter {
    fn new_page(&mut self) {
        let (page, layer) = self.pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.pdf.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    fn line(&mut self, line: &Line) {
        let size = line.style.font_size();
        let height = size * PT_TO_MM * LINE_SPACING;
        let left = if line.indented { MARGIN + INDENT } else { MARGIN };
        let usable = PAGE_WIDTH - MARGIN - left;
        let glyph = size * AVG_GLYPH_WIDTH * PT_TO_MM;
        let max_chars = (usable / glyph).floor().max(1.0) as usize;

        let (r, g, b) = line.style.color();
        let font = if line.style.bold() {
            self.bold.clone()
        } else {
            self.regular.clone()
        };

        for chunk in wrap(&pdf_text(&line.text), max_chars) {
            if self.y - height < MARGIN {
                self.new_page();
            }
            self.y -= height;

            let x = match line.align {
                Align::Left => left,
                Align::Center => {
                    let width = chunk.chars().count() as f32 * glyph;
                    ((PAGE_WIDTH - width) / 2.0).max(MARGIN)
                }
            };

            self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
            self.layer.use_text(chunk, size, Mm(x), Mm(self.y), &font);
        }
    }
}

/// Replaces characters the builtin fonts cannot encode.
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '★' => '*',
            c if c == '•' || (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap to at most `max_chars` characters per line. Words longer
/// than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
