//! Usage bar chart rendered straight to a PNG raster.
//!
//! Bars and axes are filled on a `tiny_skia` pixmap. Text is rasterized with
//! `ab_glyph` from a font bundled into the binary, so no system fonts are read.

use crate::error::{ReportError, Result};
use ab_glyph::{point, Font, FontRef, PxScale, ScaleFont};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d+").expect("valid number pattern");
}

/// Chart title, drawn above the plot and kept as a PNG text chunk
pub const CHART_TITLE: &str = "Software Usage Frequency";
/// Horizontal axis label
pub const X_AXIS_LABEL: &str = "Data Entries";
/// Vertical axis label
pub const Y_AXIS_LABEL: &str = "Usage Count";

const WIDTH: u32 = 600;
const HEIGHT: u32 = 400;
const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 40;
const MARGIN_BOTTOM: u32 = 50;
const AXIS_THICKNESS: u32 = 2;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const GRID: [u8; 3] = [225, 225, 225];
const SKY_BLUE: [u8; 3] = [135, 206, 235];

/// One bar of the usage chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartBar {
    /// `Entry {n}`, 1-based
    pub label: String,
    /// First number found in the usage mention
    pub height: u64,
}

/// A chart written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    /// Location of the PNG
    pub path: PathBuf,
    /// Bars in input order
    pub bars: Vec<ChartBar>,
}

/// Decoded 8-bit RGB pixels
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGB triples
    pub rgb: Vec<u8>,
}

/// Pulls the first embedded number out of each usage mention
///
/// A mention without digits is an error; nothing guesses a count for it.
/// Counts beyond `u64::MAX` are clamped to it.
pub fn usage_counts(usages: &[String]) -> Result<Vec<u64>> {
    usages
        .iter()
        .enumerate()
        .map(|(i, usage)| {
            let digits = FIRST_NUMBER.find(usage).ok_or_else(|| {
                ReportError::Chart(format!("usage entry {} has no count: {:?}", i + 1, usage))
            })?;
            // a digit run only fails to parse by overflowing
            Ok(digits.as_str().parse::<u64>().unwrap_or(u64::MAX))
        })
        .collect()
}

/// Builds the bars for a list of usage mentions
pub fn build_bars(usages: &[String]) -> Result<Vec<ChartBar>> {
    Ok(usage_counts(usages)?
        .into_iter()
        .enumerate()
        .map(|(i, height)| ChartBar {
            label: format!("Entry {}", i + 1),
            height,
        })
        .collect())
}

/// Renders the usage chart and writes it to `path`, replacing any existing file
pub fn render_usage_chart(usages: &[String], path: &Path) -> Result<ChartArtifact> {
    let bars = build_bars(usages)?;
    let font = chart_font()?;
    let canvas = draw(&bars, &font)?;
    write_png(&canvas, &bars, path)?;
    info!("Usage chart with {} bars written to {}", bars.len(), path.display());

    Ok(ChartArtifact {
        path: path.to_path_buf(),
        bars,
    })
}

const TITLE_SIZE: f32 = 16.0;
const AXIS_LABEL_SIZE: f32 = 13.0;
const TICK_LABEL_SIZE: f32 = 11.0;
const TICK_LENGTH: u32 = 6;
const LABEL_GAP: f32 = 4.0;

/// First bundled font that parses
fn chart_font() -> Result<FontRef<'static>> {
    typst_assets::fonts()
        .find_map(|data| FontRef::try_from_slice(data).ok())
        .ok_or_else(|| ReportError::Chart("no bundled font could be loaded".into()))
}

/// Antialiased coverage of one line of text, origin at its top-left corner
struct TextMask {
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl TextMask {
    fn render(font: &FontRef<'_>, text: &str, size: f32) -> Self {
        let scale = PxScale::from(size);
        let scaled = font.as_scaled(scale);
        let ascent = scaled.ascent();
        let height = (ascent - scaled.descent()).ceil().max(1.0) as u32;

        let mut caret = 0.0f32;
        let mut previous = None;
        let mut glyphs = Vec::with_capacity(text.len());
        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, ascent)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let width = caret.ceil().max(1.0) as u32;
        let mut coverage = vec![0.0f32; (width * height) as usize];
        for glyph in glyphs {
            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, c| {
                let px = bounds.min.x as i64 + i64::from(x);
                let py = bounds.min.y as i64 + i64::from(y);
                if px >= 0 && py >= 0 && px < i64::from(width) && py < i64::from(height) {
                    let idx = (py as u32 * width + px as u32) as usize;
                    coverage[idx] = (coverage[idx] + c).min(1.0);
                }
            });
        }

        Self { width, height, coverage }
    }
}

struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| ReportError::Chart(format!("cannot allocate a {}x{} canvas", width, height)))?;
        pixmap.fill(Color::from_rgba8(WHITE[0], WHITE[1], WHITE[2], 255));
        Ok(Self { pixmap })
    }

    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Fills `[x0, x1) x [y0, y1)`; y grows downwards
    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: [u8; 3]) {
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        if let Some(rect) = Rect::from_ltrb(x0 as f32, y0 as f32, x1 as f32, y1 as f32) {
            let mut paint = Paint::default();
            paint.set_color_rgba8(color[0], color[1], color[2], 255);
            paint.anti_alias = false;
            self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    /// Blends `mask` in `color` with its top-left corner at (`left`, `top`)
    ///
    /// A rotated mask reads bottom to top and occupies `mask.height` columns.
    fn blit(&mut self, mask: &TextMask, left: i64, top: i64, rotated: bool, color: [u8; 3]) {
        let width = i64::from(self.pixmap.width());
        let height = i64::from(self.pixmap.height());
        let data = self.pixmap.data_mut();

        for my in 0..mask.height {
            for mx in 0..mask.width {
                let alpha = mask.coverage[(my * mask.width + mx) as usize];
                if alpha <= 0.0 {
                    continue;
                }
                let (x, y) = if rotated {
                    (left + i64::from(my), top + i64::from(mask.width - 1 - mx))
                } else {
                    (left + i64::from(mx), top + i64::from(my))
                };
                if x < 0 || y < 0 || x >= width || y >= height {
                    continue;
                }
                let idx = ((y * width + x) * 4) as usize;
                for (channel, &ink) in color.iter().enumerate() {
                    let base = f32::from(data[idx + channel]);
                    data[idx + channel] = (base + (f32::from(ink) - base) * alpha).round() as u8;
                }
            }
        }
    }

    /// 8-bit RGB rows; the canvas is opaque so the alpha channel is dropped
    fn rgb(&self) -> Vec<u8> {
        self.pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }
}

/// Horizontal placement of one bar, in whole pixels
fn bar_span(index: usize, count: usize, plot_left: u32, plot_width: u32) -> (u32, u32) {
    let slot = plot_width as f32 / count as f32;
    let bar_width = (slot * 0.8).round().max(1.0);
    let x0 = (plot_left as f32 + slot * index as f32 + (slot - bar_width) / 2.0).floor();
    let max_x0 = (plot_left + plot_width) as f32 - bar_width;
    let x0 = x0.clamp(plot_left as f32, max_x0);
    (x0 as u32, (x0 + bar_width) as u32)
}

fn draw(bars: &[ChartBar], font: &FontRef<'_>) -> Result<Canvas> {
    let mut canvas = Canvas::new(WIDTH, HEIGHT)?;
    let plot_left = MARGIN_LEFT;
    let plot_right = WIDTH - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let plot_bottom = HEIGHT - MARGIN_BOTTOM;
    let plot_height = plot_bottom - plot_top;
    let plot_width = plot_right - plot_left;

    let max = bars.iter().map(|b| b.height).max().unwrap_or(0);
    for step in 0..=4u32 {
        let y = plot_bottom - plot_height * step / 4;
        if step > 0 {
            canvas.fill_rect(plot_left, y, plot_right, y + 1, GRID);
        }
        if max > 0 || step == 0 {
            let value = (max as f64 * f64::from(step) / 4.0).round() as u64;
            let mask = TextMask::render(font, &value.to_string(), TICK_LABEL_SIZE);
            let left = i64::from(plot_left - AXIS_THICKNESS) - LABEL_GAP as i64 - i64::from(mask.width);
            let top = i64::from(y) - i64::from(mask.height / 2);
            canvas.blit(&mask, left, top, false, BLACK);
        }
    }

    if !bars.is_empty() {
        // thin the labels to every n-th bar once they would collide
        let widest = TextMask::render(font, &bars[bars.len() - 1].label, TICK_LABEL_SIZE).width as f32;
        let slot = plot_width as f32 / bars.len() as f32;
        let stride = ((widest + LABEL_GAP) / slot).ceil().max(1.0) as usize;

        for (i, bar) in bars.iter().enumerate() {
            let (x0, x1) = bar_span(i, bars.len(), plot_left, plot_width);
            let scaled = if max == 0 {
                0
            } else {
                (bar.height as f64 / max as f64 * f64::from(plot_height)).round() as u32
            };
            canvas.fill_rect(x0, plot_bottom - scaled, x1, plot_bottom, SKY_BLUE);

            let centre = (x0 + x1) / 2;
            canvas.fill_rect(centre, plot_bottom, centre + 1, plot_bottom + TICK_LENGTH, BLACK);
            if i % stride == 0 {
                let mask = TextMask::render(font, &bar.label, TICK_LABEL_SIZE);
                let left = i64::from(centre) - i64::from(mask.width / 2);
                canvas.blit(&mask, left, i64::from(plot_bottom + TICK_LENGTH + 2), false, BLACK);
            }
        }
    }

    canvas.fill_rect(plot_left - AXIS_THICKNESS, plot_top, plot_left, plot_bottom + AXIS_THICKNESS, BLACK);
    canvas.fill_rect(plot_left - AXIS_THICKNESS, plot_bottom, plot_right, plot_bottom + AXIS_THICKNESS, BLACK);

    let title = TextMask::render(font, CHART_TITLE, TITLE_SIZE);
    let left = (i64::from(canvas.width()) - i64::from(title.width)) / 2;
    canvas.blit(&title, left, 10, false, BLACK);

    let x_label = TextMask::render(font, X_AXIS_LABEL, AXIS_LABEL_SIZE);
    let left = i64::from(plot_left + plot_width / 2) - i64::from(x_label.width / 2);
    canvas.blit(&x_label, left, i64::from(plot_bottom + 28), false, BLACK);

    let y_label = TextMask::render(font, Y_AXIS_LABEL, AXIS_LABEL_SIZE);
    let top = i64::from(plot_top + plot_height / 2) - i64::from(y_label.width / 2);
    canvas.blit(&y_label, 4, top, true, BLACK);

    Ok(canvas)
}

fn write_png(canvas: &Canvas, bars: &[ChartBar], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), WIDTH, HEIGHT);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.add_text_chunk("Title".to_string(), CHART_TITLE.to_string())?;
    encoder.add_text_chunk("XLabel".to_string(), X_AXIS_LABEL.to_string())?;
    encoder.add_text_chunk("YLabel".to_string(), Y_AXIS_LABEL.to_string())?;
    encoder.add_text_chunk("Bars".to_string(), describe_bars(bars))?;

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&canvas.rgb())?;
    writer.finish()?;
    Ok(())
}

/// `Entry 1=50; Entry 2=30`
fn describe_bars(bars: &[ChartBar]) -> String {
    bars.iter()
        .map(|b| format!("{}={}", b.label, b.height))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decodes a PNG into 8-bit RGB, dropping any alpha channel
pub fn read_png(path: &Path) -> Result<RasterImage> {
    let mut decoder = png::Decoder::new(File::open(path)?);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let rgb = match frame.color_type {
        png::ColorType::Rgb => buf,
        png::ColorType::Rgba => buf
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0]])
            .collect(),
        other => {
            return Err(ReportError::Chart(format!(
                "unsupported PNG color type {:?} in {}",
                other,
                path.display()
            )))
        }
    };

    Ok(RasterImage {
        width: frame.width,
        height: frame.height,
        rgb,
    })
}

impl ChartArtifact {
    /// Decodes the chart from disk
    pub fn load(&self) -> Result<RasterImage> {
        read_png(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn usages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// True when some pixel in `[x0, x1) x [y0, y1)` is dark enough to be text
    fn has_ink(image: &RasterImage, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
        (y0..y1).any(|y| {
            (x0..x1).any(|x| {
                let idx = ((y * image.width + x) * 3) as usize;
                image.rgb[idx..idx + 3].iter().all(|&c| c < 200)
            })
        })
    }

    #[test]
    fn test_two_bar_scenario() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("usage_chart.png");
        let artifact = render_usage_chart(&usages(&["50 times in 30 days", "30 times in 15 days"]), &path)?;

        assert_eq!(
            artifact.bars,
            vec![
                ChartBar { label: "Entry 1".into(), height: 50 },
                ChartBar { label: "Entry 2".into(), height: 30 },
            ]
        );
        assert_eq!(artifact.path, path);
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_png_round_trip_and_text_chunks() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        render_usage_chart(&usages(&["50 times", "30 times"]), &path)?;

        let image = read_png(&path)?;
        assert_eq!((image.width, image.height), (WIDTH, HEIGHT));
        assert_eq!(image.rgb.len(), (WIDTH * HEIGHT * 3) as usize);
        assert_eq!(&image.rgb[0..3], &WHITE);

        let decoder = png::Decoder::new(File::open(&path)?);
        let reader = decoder.read_info()?;
        let chunks = &reader.info().uncompressed_latin1_text;
        let bars = chunks.iter().find(|c| c.keyword == "Bars").expect("bars chunk");
        assert_eq!(bars.text, "Entry 1=50; Entry 2=30");
        assert!(chunks.iter().any(|c| c.keyword == "Title" && c.text == CHART_TITLE));
        Ok(())
    }

    #[test]
    fn test_tallest_bar_reaches_plot_top() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        render_usage_chart(&usages(&["10", "40"]), &path)?;
        let image = read_png(&path)?;

        // second slot centre, one pixel below the top of the plot area
        let slot = (WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / 2;
        let x = MARGIN_LEFT + slot + slot / 2;
        let idx = (((MARGIN_TOP + 1) * WIDTH + x) * 3) as usize;
        assert_eq!(&image.rgb[idx..idx + 3], &SKY_BLUE);
        Ok(())
    }

    #[test]
    fn test_first_number_wins() -> Result<()> {
        assert_eq!(usage_counts(&usages(&["7 logins in 30 days", "x12y3"]))?, vec![7, 12]);
        Ok(())
    }

    #[test]
    fn test_oversized_count_is_clamped() -> Result<()> {
        let counts = usage_counts(&usages(&["123456789012345678901234567890 times", "4 times"]))?;
        assert_eq!(counts, vec![u64::MAX, 4]);

        let dir = TempDir::new()?;
        let artifact = render_usage_chart(
            &usages(&["123456789012345678901234567890 times", "4 times"]),
            &dir.path().join("chart.png"),
        )?;
        assert_eq!(artifact.bars[0].height, u64::MAX);
        Ok(())
    }

    #[test]
    fn test_labels_are_drawn() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        render_usage_chart(&usages(&["50 times in 30 days", "30 times in 15 days"]), &path)?;
        let image = read_png(&path)?;
        let plot_bottom = HEIGHT - MARGIN_BOTTOM;

        // title band above the plot
        assert!(has_ink(&image, 0, 0, WIDTH, MARGIN_TOP));
        // "Entry 1" under the first bar, clear of the axis and tick marks
        let slot = (WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / 2;
        let centre = MARGIN_LEFT + slot / 2;
        assert!(has_ink(&image, centre - 30, plot_bottom + TICK_LENGTH + 1, centre + 30, plot_bottom + 26));
        // rotated axis label left of the value ticks
        assert!(has_ink(&image, 0, MARGIN_TOP, 24, plot_bottom));
        // horizontal axis label below the bar labels
        assert!(has_ink(&image, MARGIN_LEFT, plot_bottom + 28, WIDTH - MARGIN_RIGHT, HEIGHT));
        Ok(())
    }

    #[test]
    fn test_thousand_bars_stay_on_canvas() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        let entries: Vec<String> = (0..1000).map(|_| "7 times in 30 days".to_string()).collect();
        let artifact = render_usage_chart(&entries, &path)?;
        assert_eq!(artifact.bars.len(), 1000);

        let image = read_png(&path)?;
        let y = HEIGHT - MARGIN_BOTTOM - 2;
        let at = |x: u32| {
            let idx = ((y * WIDTH + x) * 3) as usize;
            image.rgb[idx..idx + 3].to_vec()
        };
        assert_eq!(at(MARGIN_LEFT), SKY_BLUE.to_vec());
        assert_eq!(at(WIDTH - MARGIN_RIGHT - 1), SKY_BLUE.to_vec());
        Ok(())
    }

    #[test]
    fn test_bar_spans_never_leave_the_plot() {
        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        for count in [1, 2, 7, 520, 521, 1000, 5000] {
            for index in [0, count / 2, count - 1] {
                let (x0, x1) = bar_span(index, count, MARGIN_LEFT, plot_width);
                assert!(x0 >= MARGIN_LEFT && x1 <= MARGIN_LEFT + plot_width && x0 < x1, "{} of {}", index, count);
            }
        }
    }

    #[test]
    fn test_usage_without_digits_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        let err = render_usage_chart(&usages(&["50 times", "heavy use"]), &path).unwrap_err();
        assert!(matches!(err, ReportError::Chart(ref msg) if msg.contains("entry 2")));
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_usage_renders_axes_only() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        let artifact = render_usage_chart(&[], &path)?;
        assert!(artifact.bars.is_empty());
        let image = read_png(&path)?;
        assert!(!image.rgb.chunks_exact(3).any(|px| px == &SKY_BLUE[..]));
        Ok(())
    }

    #[test]
    fn test_overwrites_existing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("chart.png");
        std::fs::write(&path, b"stale")?;
        render_usage_chart(&usages(&["5 times"]), &path)?;
        assert!(read_png(&path).is_ok());
        Ok(())
    }

    proptest! {
        #[test]
        fn one_bar_per_usage_with_its_first_number(
            entries in prop::collection::vec((0u64..100_000, "[a-z ]{0,12}"), 0..8)
        ) {
            let usages: Vec<String> = entries
                .iter()
                .map(|(n, rest)| format!("{} times{}", n, rest))
                .collect();
            let bars = build_bars(&usages).unwrap();
            prop_assert_eq!(bars.len(), usages.len());
            for (i, (bar, (n, _))) in bars.iter().zip(&entries).enumerate() {
                prop_assert_eq!(bar.height, *n);
                prop_assert_eq!(&bar.label, &format!("Entry {}", i + 1));
            }
        }
    }
}
