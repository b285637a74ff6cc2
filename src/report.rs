//! PDF investigation report.
//!
//! Layout is a single flowing column on US-Letter pages: title block, then
//! six numbered sections. Text is set in the standard Helvetica faces so no
//! font program has to be embedded.

use crate::chart::{ChartArtifact, RasterImage};
use crate::error::{ReportError, Result};
use crate::summarize::StructuredReport;
use chrono::{Local, NaiveDate};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Report title, also the PDF `/Title`
pub const REPORT_TITLE: &str = "OSINT Investigation Report";
/// Static recommendation closing every report
pub const RECOMMENDATION: &str = "Contact the company to verify software licensing.";

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const SPACER: f32 = 12.0;
const CHART_WIDTH: f32 = 300.0;
const CHART_HEIGHT: f32 = 200.0;
// Helvetica averages roughly half an em per glyph
const GLYPH_WIDTH_EM: f32 = 0.5;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";
const CHART_XOBJECT: &str = "Im1";

#[derive(Clone, Copy)]
struct TextStyle {
    font: &'static str,
    size: f32,
    leading: f32,
}

const TITLE: TextStyle = TextStyle { font: BOLD, size: 18.0, leading: 22.0 };
const HEADING: TextStyle = TextStyle { font: BOLD, size: 14.0, leading: 17.0 };
const NORMAL: TextStyle = TextStyle { font: REGULAR, size: 10.0, leading: 12.0 };

/// Lays out a [`StructuredReport`] and its chart as a PDF
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    case_id: String,
    date: NaiveDate,
}

impl ReportBuilder {
    /// Builder dated today
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            date: Local::now().date_naive(),
        }
    }

    /// Overrides the generation date printed in the header
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Writes the report to `path`, replacing any existing file
    pub fn build(&self, report: &StructuredReport, chart: &ChartArtifact, path: &Path) -> Result<PathBuf> {
        let bytes = self.render(report, chart)?;
        std::fs::write(path, bytes)?;
        info!("PDF report generated: {}", path.display());
        Ok(path.to_path_buf())
    }

    /// Renders the report into PDF bytes
    pub fn render(&self, report: &StructuredReport, chart: &ChartArtifact) -> Result<Vec<u8>> {
        let image = chart.load()?;
        let mut layout = Layout::new();

        layout.centered(REPORT_TITLE, TITLE);
        layout.paragraph(&format!("Date: {}", self.date.format("%B %d, %Y")), NORMAL);
        layout.paragraph(&format!("Case ID: {}", self.case_id), NORMAL);
        layout.space(SPACER);

        layout.section("1. Summary", &report.summary);
        layout.section("2. Company Information", &report.company_info);
        layout.section("3. Usage Data", &report.usage_data);

        layout.paragraph("4. Usage Visualization", HEADING);
        layout.image(CHART_XOBJECT, CHART_WIDTH, CHART_HEIGHT);
        layout.space(SPACER);

        layout.section("5. Key Contacts", &report.contacts);
        layout.paragraph("6. Recommendations", HEADING);
        layout.paragraph(RECOMMENDATION, NORMAL);

        assemble(layout.finish(), &image)
    }
}

/// Accumulates page content streams while tracking the vertical cursor
struct Layout {
    pages: Vec<Vec<Operation>>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // pages is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN && self.cursor < PAGE_HEIGHT - MARGIN {
            self.pages.push(Vec::new());
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
    }

    fn space(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn line(&mut self, text: &str, style: TextStyle, x: f32) {
        self.reserve(style.leading);
        self.cursor -= style.leading;
        let y = self.cursor + (style.leading - style.size);
        self.ops().extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(style.font.as_bytes().to_vec()), style.size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::String(encode_text(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn centered(&mut self, text: &str, style: TextStyle) {
        let width = text.chars().count() as f32 * style.size * GLYPH_WIDTH_EM;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.line(text, style, x);
    }

    fn paragraph(&mut self, text: &str, style: TextStyle) {
        for line in wrap(text, max_chars(style.size)) {
            self.line(&line, style, MARGIN);
        }
    }

    fn section(&mut self, heading: &str, body: &str) {
        self.paragraph(heading, HEADING);
        self.paragraph(body, NORMAL);
        self.space(SPACER);
    }

    fn image(&mut self, name: &str, width: f32, height: f32) {
        self.reserve(height);
        self.cursor -= height;
        let y = self.cursor;
        self.ops().extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.0f32.into(), 0.0f32.into(), height.into(), MARGIN.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn finish(self) -> Vec<Vec<Operation>> {
        self.pages
    }
}

fn max_chars(size: f32) -> usize {
    (((PAGE_WIDTH - 2.0 * MARGIN) / (size * GLYPH_WIDTH_EM)) as usize).max(1)
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            if current.is_empty() {
                current = word;
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(&word);
            } else {
                lines.push(std::mem::replace(&mut current, word));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// WinAnsi bytes for the standard fonts; unmappable characters become `?`
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn assemble(pages: Vec<Vec<Operation>>, image: &RasterImage) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let image_id = doc.add_object(image_xobject(image)?);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
        "XObject" => dictionary! {
            CHART_XOBJECT => image_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH as i64),
                Object::Integer(PAGE_HEIGHT as i64),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(REPORT_TITLE),
        "Producer" => Object::string_literal("osintreport"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReportError::Report(format!("Failed to serialize PDF: {}", e)))?;
    Ok(buffer)
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn image_xobject(image: &RasterImage) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&image.rgb)?;
    let compressed = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(i64::from(image.width)),
        "Height" => Object::Integer(i64::from(image.height)),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Text shown by `Tj` operators, page by page
pub fn page_texts(pdf: &[u8]) -> Result<Vec<Vec<String>>> {
    let doc = Document::load_mem(pdf)?;
    let mut pages = Vec::new();
    for (_, page_id) in doc.get_pages() {
        pages.push(tj_strings(&doc, page_id)?);
    }
    Ok(pages)
}

fn tj_strings(doc: &Document, page_id: ObjectId) -> Result<Vec<String>> {
    let content = Content::decode(&doc.get_page_content(page_id)?)?;
    Ok(content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|operand| operand.as_str().ok())
        .map(|bytes| bytes.iter().map(|&b| b as char).collect())
        .collect())
}
