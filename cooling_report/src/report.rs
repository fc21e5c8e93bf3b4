//! Report composition: header block, chart, per-minute table and page
//! furniture, paginated and serialised to PDF.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::assets::{load_logo, LogoImage};
use crate::chart::render_chart;
use crate::fonts::Font;
use crate::format::{clock_with_seconds, decimal, pin_second, timestamp};
use crate::layout::{
    Align, Flowable, Frame, ImageId, PageDecorations, PageState, Paginator, Paragraph, Rgb,
    TextStyle, PAGE_HEIGHT, PAGE_WIDTH,
};
use crate::model::{GlobalFit, SampleSeries};
use crate::options::ReportOptions;
use crate::pdf::{write_pdf, DocumentInfo, PdfImage};
use crate::request::ParsedRequest;
use crate::table::{Cell, Padding, Row, Table, VAlign};
use crate::ReportError;

const MARGIN: f32 = 72.0;
const BOTTOM_MARGIN: f32 = 50.0;
const LOGO_WIDTH: f32 = 70.0;
const MIN_LOGO_HEIGHT: f32 = 16.0;
const LOGO_GAP: f32 = 8.0;
const PAGE_NUMBER_Y: f32 = 38.0;
const FOOTER_Y: f32 = 26.0;
const CHART_WIDTH: f32 = 420.0;
const CHART_HEIGHT: f32 = 260.0;
const HEADER_COLUMNS: [f32; 2] = [210.0, 210.0];
const DATA_COLUMNS: [f32; 5] = [36.0, 138.0, 90.0, 112.0, 54.0];

const TITLE: TextStyle = TextStyle {
    font: Font::Bold,
    size: 12.0,
    leading: 14.0,
    align: Align::Center,
};
const BODY: TextStyle = TextStyle {
    font: Font::Regular,
    size: 9.0,
    leading: 11.0,
    align: Align::Left,
};
const CELL: TextStyle = TextStyle {
    align: Align::Center,
    ..BODY
};
const OBSERVATION: TextStyle = TextStyle {
    font: Font::Oblique,
    size: 9.0,
    leading: 12.0,
    align: Align::Center,
};

/// Per-request rendering inputs that do not come from the form.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub options: ReportOptions,
    pub generated_at: NaiveDateTime,
    pub logo: Option<LogoImage>,
}

impl RenderContext {
    /// Loads the logo named by the options; a missing logo is not an error.
    pub fn new(options: &ReportOptions, generated_at: NaiveDateTime) -> Self {
        Self {
            options: options.clone(),
            generated_at,
            logo: load_logo(options.logo_path.as_deref()),
        }
    }
}

/// A finished document. Only ever built after serialisation succeeded.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub page_count: usize,
    pub generated_at: NaiveDateTime,
}

pub fn default_file_name(generated_at: NaiveDateTime) -> String {
    generated_at.format("Report_%H%M%S.pdf").to_string()
}

struct Furniture {
    /// Drawn logo height at `LOGO_WIDTH`, aspect ratio preserved.
    logo_height: Option<f32>,
    header_top: f32,
    header_bottom: f32,
    generated: String,
    footer: String,
}

impl Furniture {
    fn new(context: &RenderContext) -> Self {
        let logo_height = context
            .logo
            .as_ref()
            .map(|logo| LOGO_WIDTH * logo.aspect_ratio());
        let band = logo_height.unwrap_or(0.0).max(MIN_LOGO_HEIGHT);
        let header_top = PAGE_HEIGHT - MARGIN;
        Self {
            logo_height,
            header_top,
            header_bottom: header_top - band,
            generated: timestamp(context.generated_at),
            footer: context.options.footer_text.clone(),
        }
    }

    fn frame(&self) -> Frame {
        Frame {
            x: MARGIN,
            width: PAGE_WIDTH - 2.0 * MARGIN,
            y_top: self.header_bottom - LOGO_GAP,
            y_bottom: BOTTOM_MARGIN,
        }
    }
}

impl PageDecorations for Furniture {
    fn begin_page(&self, page: &mut PageState) {
        if let Some(height) = self.logo_height {
            let band = self.header_top - self.header_bottom;
            let y = self.header_bottom + (band - height) / 2.0;
            page.image(ImageId::Logo, MARGIN, y, LOGO_WIDTH, height);
        }
        let center = (self.header_top + self.header_bottom) / 2.0;
        page.text_right(
            PAGE_WIDTH - MARGIN,
            center + 6.0,
            Font::Regular,
            9.0,
            &self.generated,
        );
    }

    fn finish_page(&self, page: &mut PageState, number: usize, total: usize) {
        let right = PAGE_WIDTH - MARGIN;
        let number = format!("{number} de {total}");
        page.text_right(right, PAGE_NUMBER_Y, Font::Regular, 9.0, &number);
        page.text_right(right, FOOTER_Y, Font::Oblique, 8.0, &self.footer);
    }
}

fn header_table(request: &ParsedRequest, series: &SampleSeries, fit: &GlobalFit) -> Table {
    let stats = series.stats();
    let padding = Padding::new(6.0, 6.0, 4.0, 4.0);
    let row = |cells| Row::new(cells, padding, VAlign::Top);
    let body = || Paragraph::new(BODY);

    let info = body()
        .bold("Data:")
        .text(format!(" {}  •  ", request.date_text))
        .bold("Início:")
        .text(format!(" {}  •  ", request.start_text))
        .bold("Fim:")
        .text(format!(" {}  •  ", request.end_text))
        .bold("Intervalo (min):")
        .text(format!(" {}", series.elapsed_minutes));
    let temperature = body()
        .bold("Temperatura (Máx/Mín/Méd)")
        .line_break()
        .text(format!(
            "{} ºC / {} ºC / {} ºC",
            decimal(stats.temperature_max, 1),
            decimal(stats.temperature_min, 1),
            decimal(stats.temperature_mean, 1)
        ));
    let humidity = body()
        .bold("UR [%Hr] (Máx/Mín/Méd)")
        .line_break()
        .text(format!(
            "{} / {} / {}",
            decimal(stats.humidity_max, 1),
            decimal(stats.humidity_min, 1),
            decimal(stats.humidity_mean, 1)
        ));
    let rate = body()
        .bold("Taxa média de resfriamento")
        .line_break()
        .text(format!("{} ºC/min", decimal(series.cooling_rate, 5)));
    let k = body()
        .bold("K constante (global)")
        .line_break()
        .text(format!("{} min", decimal(fit.k, 4)))
        .superscript("-1");

    Table {
        columns: HEADER_COLUMNS.to_vec(),
        rows: vec![
            row(vec![Cell::spanning(Paragraph::plain(TITLE, &request.title), 2)])
                .with_background(Rgb::LIGHT_GREY),
            row(vec![Cell::spanning(Paragraph::plain(BODY, &request.objective), 2)])
                .with_background(Rgb::WHITE_SMOKE),
            row(vec![
                Cell::new(info),
                Cell::new(body().bold("Produto:").text(format!(" {}", request.product))),
            ]),
            row(vec![Cell::new(temperature), Cell::new(humidity)]),
            row(vec![Cell::new(rate), Cell::new(k)]),
        ],
        header_rows: 0,
        grid_width: 0.6,
    }
}

fn data_table(series: &SampleSeries, pinned_second: u32) -> Table {
    let cell = |text: String| Cell::new(Paragraph::plain(CELL, text));
    let header = Row::new(
        vec![
            cell("ID".into()),
            cell("Data/Hora".into()),
            cell("Temperatura [°C]".into()),
            cell("UR [%Hr]".into()),
            Cell::new(Paragraph::new(CELL).text("k (min").superscript("-1").text(")")),
        ],
        Padding::new(6.0, 6.0, 3.0, 8.0),
        VAlign::Middle,
    )
    .with_background(Rgb::LIGHT_GREY);

    let mut rows = Vec::with_capacity(series.len() + 1);
    rows.push(header);
    rows.extend(series.samples.iter().map(|sample| {
        Row::new(
            vec![
                cell(sample.id.to_string()),
                cell(timestamp(pin_second(sample.timestamp, pinned_second))),
                cell(decimal(sample.temperature, 1)),
                cell(decimal(sample.humidity, 1)),
                cell(decimal(sample.k, 4)),
            ],
            Padding::new(6.0, 6.0, 3.0, 3.0),
            VAlign::Middle,
        )
    }));

    Table {
        columns: DATA_COLUMNS.to_vec(),
        rows,
        header_rows: 1,
        grid_width: 0.25,
    }
}

fn observation(request: &ParsedRequest, pinned_second: u32) -> Paragraph {
    Paragraph::plain(
        OBSERVATION,
        format!(
            "Registro iniciado manual às {}; fim ao atingir {} ºC às {}.",
            clock_with_seconds(pin_second(request.start, pinned_second)),
            decimal(request.end_temperature, 1),
            clock_with_seconds(pin_second(request.end, pinned_second)),
        ),
    )
}

struct Composition {
    pages: Vec<PageState>,
    images: Vec<PdfImage>,
}

fn compose(
    request: &ParsedRequest,
    series: &SampleSeries,
    fit: &GlobalFit,
    context: &RenderContext,
) -> Result<Composition, ReportError> {
    let chart = render_chart(request, series, fit, context.options.chart_size())?;
    let mut images = vec![PdfImage {
        id: ImageId::Chart,
        width: chart.width,
        height: chart.height,
        rgb: chart.rgb,
        alpha: None,
    }];
    if let Some(logo) = &context.logo {
        images.push(PdfImage {
            id: ImageId::Logo,
            width: logo.width,
            height: logo.height,
            rgb: logo.rgb.clone(),
            alpha: logo.alpha.clone(),
        });
    }

    let furniture = Furniture::new(context);
    let pinned = context.options.pinned_second;
    let mut paginator = Paginator::new(furniture.frame(), &furniture);
    paginator.add(Flowable::Table(header_table(request, series, fit).layout()));
    paginator.add(Flowable::Spacer(10.0));
    paginator.add(Flowable::Image {
        id: ImageId::Chart,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
    });
    paginator.add(Flowable::Spacer(8.0));
    paginator.add(Flowable::Table(data_table(series, pinned).layout()));
    paginator.add(Flowable::Spacer(8.0));
    paginator.add(Flowable::Paragraph(observation(request, pinned)));
    let pages = paginator.finish();
    debug!("Laid out {} rows on {} pages", series.len(), pages.len());

    Ok(Composition { pages, images })
}

/// Lay out and serialise the report for one modeled run.
pub fn render(
    request: &ParsedRequest,
    series: &SampleSeries,
    fit: &GlobalFit,
    context: &RenderContext,
) -> Result<RenderedReport, ReportError> {
    let composition = compose(request, series, fit, context)?;
    let info = DocumentInfo {
        title: request.title.clone(),
        producer: concat!("cooling_report ", env!("CARGO_PKG_VERSION")).to_string(),
        created: context.generated_at,
    };
    let bytes = write_pdf(&composition.pages, &composition.images, &info)?;
    debug!("Serialised PDF: {} bytes", bytes.len());
    Ok(RenderedReport {
        bytes,
        file_name: default_file_name(context.generated_at),
        page_count: composition.pages.len(),
        generated_at: context.generated_at,
    })
}
