use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, warn};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle, TextStyle};

use super::ChartSpec;
use crate::error::{LeadLensError, Result};

/// Draws a chart to a local image file.
pub trait ChartRenderer {
    fn render(&self, chart: &ChartSpec, path: &Path) -> Result<()>;
}

/// Horizontal bar chart rendered to a PNG bitmap.
///
/// Bars appear top to bottom in series order. Titles and labels need a
/// TrueType font: `font` when set, otherwise the first common system font
/// found. Without one the bars are still drawn.
#[derive(Debug, Clone)]
pub struct PngBarChart {
    pub width: u32,
    pub bar_height: u32,
    pub label_width: u32,
    pub font: Option<PathBuf>,
}

impl Default for PngBarChart {
    fn default() -> Self {
        Self {
            width: 720,
            bar_height: 28,
            label_width: 180,
            font: None,
        }
    }
}

const TITLE_HEIGHT: u32 = 48;
const BAR_GAP: u32 = 10;
const MARGIN: u32 = 16;
const VALUE_WIDTH: u32 = 72;
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

const FONT_FAMILY: &str = "leadlens-sans";
const SYSTEM_FONTS: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

impl PngBarChart {
    fn plot_width(&self) -> u32 {
        self.width
            .saturating_sub(self.label_width + VALUE_WIDTH + 2 * MARGIN)
            .max(1)
    }

    fn height(&self, rows: usize) -> u32 {
        let rows = u32::try_from(rows).unwrap_or(u32::MAX).max(1);
        TITLE_HEIGHT
            .saturating_add(rows.saturating_mul(self.bar_height + BAR_GAP))
            .saturating_add(MARGIN)
    }

    fn axis_x(&self) -> i32 {
        to_coord(MARGIN + self.label_width)
    }

    fn row_top(&self, row: usize) -> i32 {
        let row = u32::try_from(row).unwrap_or(u32::MAX);
        to_coord(TITLE_HEIGHT.saturating_add(row.saturating_mul(self.bar_height + BAR_GAP)))
    }

    /// Bar length in pixels for every entry; the largest value spans the
    /// plot width and negative values draw nothing.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bar_lengths(&self, chart: &ChartSpec) -> Vec<u32> {
        let max_value = chart.series.values().copied().fold(0.0_f64, f64::max);
        let scale = if max_value > 0.0 {
            f64::from(self.plot_width()) / max_value
        } else {
            0.0
        };

        chart
            .series
            .values()
            .map(|value| (value.max(0.0) * scale).round() as u32)
            .collect()
    }

    fn draw_bars<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        chart: &ChartSpec,
    ) -> DrawResult<DB> {
        area.fill(&WHITE)?;

        let axis_x = self.axis_x();
        let bar_height = to_coord(self.bar_height);

        for (row, length) in self.bar_lengths(chart).into_iter().enumerate() {
            if length == 0 {
                continue;
            }
            let top = self.row_top(row);
            area.draw(&Rectangle::new(
                [(axis_x, top), (axis_x + to_coord(length), top + bar_height)],
                BAR_COLOR.filled(),
            ))?;
        }

        let bottom = to_coord(self.height(chart.series.len()) - MARGIN);
        area.draw(&PathElement::new(
            vec![(axis_x, to_coord(TITLE_HEIGHT)), (axis_x, bottom)],
            BLACK.stroke_width(1),
        ))?;

        Ok(())
    }

    fn draw_labels<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        chart: &ChartSpec,
    ) -> DrawResult<DB> {
        let title_style = text_style(18.0, HPos::Center);
        let label_style = text_style(13.0, HPos::Right);
        let value_style = text_style(12.0, HPos::Left);

        area.draw_text(
            &chart.title,
            &title_style,
            (to_coord(self.width / 2), to_coord(TITLE_HEIGHT / 2)),
        )?;

        let axis_x = self.axis_x();
        let half_bar = to_coord(self.bar_height / 2);
        let lengths = self.bar_lengths(chart);

        for (row, ((label, value), length)) in chart.series.iter().zip(lengths).enumerate() {
            let middle = self.row_top(row) + half_bar;
            area.draw_text(label, &label_style, (axis_x - 8, middle))?;
            area.draw_text(
                &format_value(*value),
                &value_style,
                (axis_x + to_coord(length) + 6, middle),
            )?;
        }

        Ok(())
    }
}

impl ChartRenderer for PngBarChart {
    fn render(&self, chart: &ChartSpec, path: &Path) -> Result<()> {
        let root = BitMapBackend::new(path, (self.width, self.height(chart.series.len())))
            .into_drawing_area();

        self.draw_bars(&root, chart)
            .map_err(|e| render_error(chart, e))?;

        if label_font_loaded(self.font.as_deref()) {
            if let Err(e) = self.draw_labels(&root, chart) {
                warn!("Labels of {} were not drawn: {e}", chart.filename);
            }
        }

        root.present().map_err(|e| render_error(chart, e))?;

        debug!("Rendered {} to {}", chart.title, path.display());

        Ok(())
    }
}

/// Registers the label font once per process.
fn label_font_loaded(preferred: Option<&Path>) -> bool {
    static LOADED: OnceLock<bool> = OnceLock::new();

    *LOADED.get_or_init(|| {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        for candidate in candidates {
            let Ok(bytes) = std::fs::read(&candidate) else {
                continue;
            };
            // plotters keeps registered fonts for the life of the process
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                debug!("Chart labels use {}", candidate.display());
                return true;
            }
        }

        warn!("No TrueType font found, charts are drawn without labels");
        false
    })
}

fn text_style(size: f64, horizontal: HPos) -> TextStyle<'static> {
    TextStyle::from(FontDesc::new(
        FontFamily::Name(FONT_FAMILY),
        size,
        FontStyle::Normal,
    ))
    .pos(Pos::new(horizontal, VPos::Center))
}

fn render_error(chart: &ChartSpec, e: impl std::fmt::Display) -> LeadLensError {
    LeadLensError::Render(format!("{}: {e}", chart.filename))
}

fn to_coord(pixels: u32) -> i32 {
    i32::try_from(pixels).unwrap_or(i32::MAX)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn chart_spec(pairs: &[(&str, f64)]) -> ChartSpec {
        let series: IndexMap<String, f64> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect();
        ChartSpec::new(series, "Average Lead Time (days)", "lead.png").unwrap()
    }

    fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
        let width = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(bytes[20..24].try_into().unwrap());
        (width, height)
    }

    #[test]
    fn test_render_writes_png_sized_to_the_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lead.png");
        let chart = PngBarChart::default();

        chart
            .render(&chart_spec(&[("web", 1.5), ("api", 3.0), ("worker", 0.0)]), &path)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(png_dimensions(&bytes), (720, chart.height(3)));
        assert_eq!(chart.height(3), TITLE_HEIGHT + 3 * (28 + BAR_GAP) + MARGIN);
    }

    #[test]
    fn test_bar_lengths_follow_series_order() {
        let chart = PngBarChart::default();
        let lengths = chart.bar_lengths(&chart_spec(&[("a", 2.0), ("b", 4.0), ("c", 0.0)]));

        assert_eq!(lengths, vec![chart.plot_width() / 2, chart.plot_width(), 0]);
    }

    #[test]
    fn test_all_zero_series_draws_no_bars() {
        let chart = PngBarChart::default();
        assert_eq!(chart.bar_lengths(&chart_spec(&[("a", 0.0), ("b", 0.0)])), vec![0, 0]);
    }

    #[test]
    fn test_empty_series_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freq.png");

        PngBarChart::default().render(&chart_spec(&[]), &path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.126), "0.13");
    }
}
