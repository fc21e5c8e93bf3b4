//! Cooling chart: exponential curve and tabulated temperatures on the left
//! axis, relative humidity on the right, rendered into an RGB pixel buffer.

use std::error::Error;
use std::ops::Range;
use std::panic;

use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::{
    text_anchor, BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend,
    DrawingErrorKind,
};
use tracing::debug;

use crate::format::{clock_label, decimal};
use crate::glyphs;
use crate::model::{GlobalFit, SampleSeries};
use crate::request::ParsedRequest;
use crate::ReportError;

const CURVE_COLOR: RGBColor = RGBColor(31, 119, 180);
const TEMPERATURE_COLOR: RGBColor = RGBColor(255, 127, 14);
const HUMIDITY_COLOR: RGBColor = RGBColor(44, 160, 44);

/// Rendered chart pixels, row-major RGB.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Draw the cooling chart at `size` pixels.
///
/// Backend panics are caught and reported as [`ReportError::Render`].
pub fn render_chart(
    request: &ParsedRequest,
    series: &SampleSeries,
    fit: &GlobalFit,
    size: (u32, u32),
) -> Result<ChartImage, ReportError> {
    let (width, height) = size;
    if width < 200 || height < 150 {
        return Err(ReportError::Render(format!(
            "chart of {width}x{height} px is too small"
        )));
    }
    let mut rgb = vec![u8::MAX; width as usize * height as usize * 3];

    let render = || -> Result<(), String> {
        let backend = BitMapBackend::with_buffer(&mut rgb, size);
        let root = GlyphBackend::new(backend).into_drawing_area();
        draw_cooling_chart(root, request, series, fit).map_err(|e| e.to_string())
    };
    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| ReportError::Render("plotting backend panicked".into()))?
        .map_err(|e| ReportError::Render(format!("plotting error: {e}")))?;

    debug!("Rendered chart at {width}x{height} px");
    Ok(ChartImage { width, height, rgb })
}

/// Elapsed-minute x-axis whose bold key points are exactly the selected ticks.
#[derive(Clone)]
struct MinuteAxis {
    inner: RangedCoordf64,
    ticks: Vec<f64>,
}

impl MinuteAxis {
    fn new(minutes: f64, ticks: &[u32]) -> Self {
        Self {
            inner: (0.0..minutes).into(),
            ticks: ticks.iter().map(|&m| f64::from(m)).collect(),
        }
    }
}

impl Ranged for MinuteAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.inner.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            return Vec::new();
        }
        self.ticks.clone()
    }

    fn range(&self) -> Range<f64> {
        self.inner.range()
    }
}

fn humidity_label(value: &f64) -> String {
    decimal(value.abs(), 1)
}

/// Value range padded by a tenth of its span, optionally floored at zero.
fn padded_range(values: impl Iterator<Item = f64>, floor_at_zero: bool) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.1).max(0.5);
    let start = if floor_at_zero { (lo - pad).max(0.0) } else { lo - pad };
    start..(hi + pad)
}

fn draw_cooling_chart<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    request: &ParsedRequest,
    series: &SampleSeries,
    fit: &GlobalFit,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (width, _) = root.dim_in_pixel();
    let (title_area, plot_area) = root.split_vertically(70);

    let centered = Pos::new(HPos::Center, VPos::Top);
    let title_font = FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal);
    let caption_font = FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal);
    title_area.draw_text(
        &format!("Validação de Resfriamento - {}", request.date_text),
        &title_font.color(&BLACK).pos(centered),
        (width as i32 / 2, 12),
    )?;
    title_area.draw_text(
        "Tabela linear; k por minuto; curva exponencial (Newton)",
        &caption_font.color(&BLACK.mix(0.7)).pos(centered),
        (width as i32 / 2, 44),
    )?;

    let minutes = f64::from(series.elapsed_minutes);
    let temperature_range = padded_range(
        series
            .samples
            .iter()
            .map(|s| s.temperature)
            .chain(fit.fine_curve.iter().map(|p| p.temperature)),
        false,
    );
    let humidity_range = padded_range(series.samples.iter().map(|s| s.humidity), true);

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Right, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(MinuteAxis::new(minutes, &fit.ticks), temperature_range)?
        .set_secondary_coord(0.0..minutes, humidity_range);

    let start = series.start;
    let clock = |m: &f64| clock_label(start, *m);
    let temperature_label = |v: &f64| decimal(*v, 1);
    let axis_font = FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal);

    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(&BLACK.mix(0.1))
        .x_label_formatter(&clock)
        .y_label_formatter(&temperature_label)
        .x_desc("Tempo (hh:mm)")
        .y_desc("Temperatura (°C)")
        .label_style(axis_font.clone().color(&BLACK.mix(0.85)))
        .axis_desc_style(axis_font.clone())
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_label_formatter(&humidity_label)
        .y_desc("Umidade Relativa (%Hr)")
        .label_style(axis_font.clone().color(&BLACK.mix(0.85)))
        .axis_desc_style(axis_font)
        .draw()?;

    let curve_style = ShapeStyle {
        color: CURVE_COLOR.to_rgba(),
        filled: false,
        stroke_width: 2,
    };
    chart
        .draw_series(LineSeries::new(
            fit.fine_curve.iter().map(|p| (p.minute, p.temperature)),
            curve_style,
        ))?
        .label(format!(
            "K constante de resfriamento (k={} min⁻¹)",
            decimal(fit.k, 4)
        ))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], curve_style));

    chart
        .draw_series(series.samples.iter().map(|s| {
            Circle::new(
                (f64::from(s.minute), s.temperature),
                4,
                TEMPERATURE_COLOR.filled(),
            )
        }))?
        .label("ºC evolução do resfriamento")
        .legend(|(x, y)| Circle::new((x + 15, y), 4, TEMPERATURE_COLOR.filled()));

    let humidity_style = ShapeStyle {
        color: HUMIDITY_COLOR.to_rgba(),
        filled: false,
        stroke_width: 2,
    };
    let humidity_points: Vec<(f64, f64)> = series
        .samples
        .iter()
        .map(|s| (f64::from(s.minute), s.humidity))
        .collect();
    chart.draw_secondary_series(DashedLineSeries::new(
        humidity_points.clone(),
        10,
        6,
        humidity_style,
    ))?;
    chart.draw_secondary_series(
        humidity_points
            .iter()
            .map(|&point| Cross::new(point, 4, humidity_style)),
    )?;
    // Registered on the primary axes so both coordinate systems share one legend.
    chart
        .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())?
        .label("UR [%Hr]")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], humidity_style));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .label_font(
            FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal).color(&BLACK),
        )
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Forwards drawing to the inner backend but sets all text with the built-in
/// bitmap glyphs, so output never depends on installed fonts.
struct GlyphBackend<DB> {
    inner: DB,
}

impl<DB> GlyphBackend<DB> {
    fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> DrawingBackend for GlyphBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }
        let scale = glyphs::scale_for(style.size());
        let (width, height) = glyphs::text_extent(text, scale);
        let (width, height) = (width as i32, height as i32);
        let anchor = style.anchor();
        let dx = match anchor.h_pos {
            text_anchor::HPos::Left => 0,
            text_anchor::HPos::Right => -width,
            text_anchor::HPos::Center => -width / 2,
        };
        let dy = match anchor.v_pos {
            text_anchor::VPos::Top => 0,
            text_anchor::VPos::Center => -height / 2,
            text_anchor::VPos::Bottom => -height,
        };
        let transform = style.transform();

        let mut cursor = dx;
        for ch in text.chars() {
            let glyph = glyphs::lookup(ch);
            for (row, pattern) in glyph.iter().enumerate() {
                for (col, cell) in pattern.bytes().enumerate() {
                    if cell != b'#' {
                        continue;
                    }
                    let x = cursor + col as i32 * scale;
                    let y = dy + row as i32 * scale;
                    for sx in 0..scale {
                        for sy in 0..scale {
                            let (tx, ty) = transform.transform(x + sx, y + sy);
                            self.inner.draw_pixel((pos.0 + tx, pos.1 + ty), color)?;
                        }
                    }
                }
            }
            cursor += glyphs::advance(glyph, scale);
        }
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        Ok(glyphs::text_extent(text, glyphs::scale_for(style.size())))
    }
}
