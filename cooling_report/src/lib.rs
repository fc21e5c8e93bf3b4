//! Cooling validation reports: a Newton's-law cooling curve model and a
//! paginated PDF renderer for its per-minute table and chart.

use chrono::NaiveDateTime;
use thiserror::Error;

mod assets;
pub mod chart;
mod fonts;
pub mod format;
mod glyphs;
pub mod layout;
pub mod model;
pub mod options;
mod pdf;
pub mod report;
pub mod request;
mod table;

pub use assets::LogoImage;
pub use chart::ChartImage;
pub use model::{
    build_series, compute, fit_global, select_ticks, CurvePoint, GlobalFit, ModelOptions, Sample,
    SampleSeries, SeriesStats, AMBIENT_TEMPERATURE,
};
pub use options::ReportOptions;
pub use report::{default_file_name, render, RenderContext, RenderedReport};
pub use request::{ParsedRequest, ReportRequest};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("invalid {field} '{value}': {reason}")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot fit the cooling curve with {field} = {value}: {reason}")]
    Domain {
        field: &'static str,
        value: f64,
        reason: String,
    },
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("report rendering failed: {0}")]
    Render(String),
}

/// Parse, model and render one report request.
///
/// Nothing is retained between calls; the finished document is owned by the
/// returned [`RenderedReport`].
pub fn generate_report(
    request: &ReportRequest,
    options: &ReportOptions,
    generated_at: NaiveDateTime,
) -> Result<RenderedReport, ReportError> {
    options.validate()?;
    let parsed = request.parse()?;
    let (series, fit) = compute(&parsed, &options.model())?;
    let context = RenderContext::new(options, generated_at);
    render(&parsed, &series, &fit, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(t_end: &str) -> ReportRequest {
        ReportRequest {
            title: "Test".into(),
            objective: "Verify".into(),
            product: "Sassami".into(),
            date: "01/01/2024".into(),
            start_time: "10:00".into(),
            end_time: "10:10".into(),
            start_temperature: "10,0".into(),
            end_temperature: t_end.into(),
            start_humidity: "50,0".into(),
            end_humidity: "60.0".into(),
        }
    }

    fn frozen_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 15, 42))
            .unwrap()
    }

    fn options() -> ReportOptions {
        ReportOptions {
            logo_path: None,
            chart_width_px: 460,
            chart_height_px: 270,
            ..ReportOptions::default()
        }
    }

    #[test]
    fn generates_a_pdf_document() {
        let report = generate_report(&request("0,1"), &options(), frozen_clock()).unwrap();
        assert!(report.bytes.starts_with(b"%PDF-"));
        assert_eq!(report.page_count, 1);
        assert_eq!(report.file_name, "Report_101542.pdf");
    }

    #[test]
    fn ambient_end_temperature_is_a_domain_error() {
        let err = generate_report(&request("0,0"), &options(), frozen_clock()).unwrap_err();
        match err {
            ReportError::Domain { field, value, .. } => {
                assert_eq!(field, "end temperature");
                assert_eq!(value, 0.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_reading_is_reported_with_field() {
        let mut bad = request("3,2");
        bad.start_humidity = "setenta".into();
        let err = generate_report(&bad, &options(), frozen_clock()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("start humidity"), "{message}");
        assert!(message.contains("setenta"), "{message}");
    }

    #[test]
    fn identical_inputs_render_identical_bytes() {
        let first = generate_report(&request("3,2"), &options(), frozen_clock()).unwrap();
        let second = generate_report(&request("3,2"), &options(), frozen_clock()).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn long_runs_paginate() {
        let mut long = request("3,2");
        long.start_time = "08:00".into();
        long.end_time = "11:00".into();
        let report = generate_report(&long, &options(), frozen_clock()).unwrap();
        assert!(report.page_count >= 3, "pages: {}", report.page_count);
        let reloaded = lopdf::Document::load_mem(&report.bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), report.page_count);
    }
}
