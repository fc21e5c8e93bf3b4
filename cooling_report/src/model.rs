//! Cooling curve model: linear per-minute tabulation plus a Newton's-law
//! exponential fit against a fixed ambient reference.

use chrono::{Duration, NaiveDateTime};
use ndarray::Array1;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::request::ParsedRequest;
use crate::ReportError;

/// Asymptote of the exponential model, in °C.
pub const AMBIENT_TEMPERATURE: f64 = 0.0;
pub const MIN_TICKS: usize = 6;
pub const MAX_TICKS: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelOptions {
    /// Sub-points per minute of the plotted exponential curve.
    pub ticks_per_minute: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            ticks_per_minute: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// 1-based row number.
    pub id: usize,
    /// Minutes since the start of the run.
    pub minute: u32,
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    /// Instantaneous cooling coefficient over the preceding minute (min⁻¹).
    pub k: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SampleSeries {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub elapsed_minutes: u32,
    /// Average cooling rate in °C/min.
    pub cooling_rate: f64,
    /// Unrounded linear temperatures the k values were computed from.
    pub linear_temperatures: Vec<f64>,
    pub samples: Vec<Sample>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub minute: f64,
    pub temperature: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalFit {
    /// Decay constant in min⁻¹.
    pub k: f64,
    pub ambient: f64,
    pub fine_curve: Vec<CurvePoint>,
    /// Time-axis tick positions in minutes since start.
    pub ticks: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SeriesStats {
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub temperature_mean: f64,
    pub humidity_max: f64,
    pub humidity_min: f64,
    pub humidity_mean: f64,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn stats(&self) -> SeriesStats {
        let temperatures = self.samples.iter().map(|s| s.temperature);
        let humidity: Vec<f64> = self.samples.iter().map(|s| s.humidity).collect();
        SeriesStats {
            temperature_max: max_of(temperatures.clone()),
            temperature_min: min_of(temperatures),
            temperature_mean: mean_of(&self.linear_temperatures),
            humidity_max: max_of(humidity.iter().copied()),
            humidity_min: min_of(humidity.iter().copied()),
            humidity_mean: mean_of(&humidity),
        }
    }
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values
        .map(OrderedFloat)
        .max()
        .map_or(0.0, OrderedFloat::into_inner)
}

fn min_of(values: impl Iterator<Item = f64>) -> f64 {
    values
        .map(OrderedFloat)
        .min()
        .map_or(0.0, OrderedFloat::into_inner)
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Whole minutes between start and end, never less than one.
pub fn elapsed_minutes(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let minutes = (end - start).num_seconds().div_euclid(60);
    minutes.clamp(1, i64::from(u32::MAX)) as u32
}

/// Tabulate the run minute by minute. Infallible once the request parsed.
pub fn build_series(request: &ParsedRequest) -> SampleSeries {
    let elapsed = elapsed_minutes(request.start, request.end);
    let count = elapsed as usize + 1;
    let minutes = f64::from(elapsed);
    let (t_start, t_end) = (request.start_temperature, request.end_temperature);
    let (h_start, h_end) = (request.start_humidity, request.end_humidity);

    let rate = (t_start - t_end) / minutes;
    let mut linear = Array1::from_iter((0..count).map(|i| t_start - rate * i as f64));
    linear[count - 1] = t_end;

    let mut temperature = linear.mapv(round_tenth);
    temperature[0] = t_start;
    temperature[count - 1] = t_end;

    let mut humidity = Array1::linspace(0.0, 1.0, count)
        .mapv(|f| round_tenth(h_start + (h_end - h_start) * f));
    humidity[0] = h_start;
    humidity[count - 1] = h_end;

    let mut k = Vec::with_capacity(count);
    k.push(0.0);
    for w in linear.windows(2) {
        k.push(step_k(w[0], w[1]));
    }

    let samples = (0..count)
        .map(|i| Sample {
            id: i + 1,
            minute: i as u32,
            timestamp: request.start + Duration::minutes(i as i64),
            temperature: temperature[i],
            humidity: humidity[i],
            k: k[i],
        })
        .collect();

    SampleSeries {
        start: request.start,
        end: request.end,
        elapsed_minutes: elapsed,
        cooling_rate: rate,
        linear_temperatures: linear.to_vec(),
        samples,
    }
}

/// Fit the single decay constant and sample the exponential for plotting.
pub fn fit_global(
    request: &ParsedRequest,
    series: &SampleSeries,
    options: &ModelOptions,
) -> Result<GlobalFit, ReportError> {
    let ambient = AMBIENT_TEMPERATURE;
    let t_start = request.start_temperature;
    let t_end = request.end_temperature;
    for (field, value) in [("start temperature", t_start), ("end temperature", t_end)] {
        if value <= ambient {
            return Err(ReportError::Domain {
                field,
                value,
                reason: format!(
                    "must stay above the ambient reference of {ambient:.1} °C for the logarithm to be defined"
                ),
            });
        }
    }

    let minutes = f64::from(series.elapsed_minutes);
    let k = -((t_end - ambient) / (t_start - ambient)).ln() / minutes + 0.0;
    if !k.is_finite() {
        return Err(ReportError::Domain {
            field: "end temperature",
            value: t_end,
            reason: "decay constant is not finite".into(),
        });
    }

    let per_minute = options.ticks_per_minute.max(1) as usize;
    let points = series.elapsed_minutes as usize * per_minute + 1;
    let fine_curve = Array1::linspace(0.0, minutes, points)
        .iter()
        .map(|&t| CurvePoint {
            minute: t,
            temperature: ambient + (t_start - ambient) * (-k * t).exp(),
        })
        .collect();

    Ok(GlobalFit {
        k,
        ambient,
        fine_curve,
        ticks: select_ticks(series.elapsed_minutes),
    })
}

/// Run both modeling stages.
pub fn compute(
    request: &ParsedRequest,
    options: &ModelOptions,
) -> Result<(SampleSeries, GlobalFit), ReportError> {
    let series = build_series(request);
    let fit = fit_global(request, &series, options)?;
    debug!(
        "Modeled {} minutes: rate {:.5} °C/min, k {:.4} min^-1, {} curve points",
        series.elapsed_minutes,
        series.cooling_rate,
        fit.k,
        fit.fine_curve.len()
    );
    Ok((series, fit))
}

/// Tick positions (minutes) for a span of `total` minutes.
///
/// Aims for one tick about every eight minutes, between [`MIN_TICKS`] and
/// [`MAX_TICKS`], always keeping both ends.
pub fn select_ticks(total: u32) -> Vec<u32> {
    let span = f64::from(total);
    let target = (span / 8.0).round_ties_even() as usize + 2;
    let n = target.clamp(MIN_TICKS, MAX_TICKS);

    let mut minutes: Vec<u32> = (0..n)
        .map(|i| (i as f64 * span / (n - 1) as f64).round_ties_even() as u32)
        .chain([0, total])
        .collect();
    minutes.sort_unstable();
    minutes.dedup();

    if minutes.len() > MAX_TICKS {
        let step = minutes.len().div_ceil(MAX_TICKS);
        let mut thinned: Vec<u32> = minutes.iter().step_by(step).copied().collect();
        if thinned.first() != Some(&0) {
            thinned.insert(0, 0);
        }
        if thinned.last() != Some(&total) {
            thinned.retain(|&m| m != total);
            thinned.push(total);
        }
        minutes = thinned;
    }
    minutes
}

fn step_k(previous: f64, current: f64) -> f64 {
    let a = previous - AMBIENT_TEMPERATURE;
    let b = current - AMBIENT_TEMPERATURE;
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    -(b / a).ln() + 0.0
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(start: &str, end: &str, t: (f64, f64), h: (f64, f64)) -> ParsedRequest {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let clock = |text: &str| chrono::NaiveTime::parse_from_str(text, "%H:%M").unwrap();
        let start_dt = date.and_time(clock(start));
        let mut end_dt = date.and_time(clock(end));
        if end_dt < start_dt {
            end_dt += Duration::days(1);
        }
        ParsedRequest {
            title: "Test".into(),
            objective: "Verify".into(),
            product: "P".into(),
            date,
            start: start_dt,
            end: end_dt,
            date_text: "01/01/2024".into(),
            start_text: start.into(),
            end_text: end.into(),
            start_temperature: t.0,
            end_temperature: t.1,
            start_humidity: h.0,
            end_humidity: h.1,
        }
    }

    #[test]
    fn series_has_one_sample_per_minute_plus_one() {
        let series = build_series(&request("10:00", "10:10", (10.0, 0.0), (50.0, 60.0)));
        assert_eq!(series.elapsed_minutes, 10);
        assert_eq!(series.len(), 11);
        assert_eq!(series.cooling_rate, 1.0);
        assert_eq!(series.samples[5].temperature, 5.0);
        assert_eq!(series.samples[5].humidity, 55.0);
        assert_eq!(series.samples[0].id, 1);
        assert_eq!(series.samples[10].id, 11);
    }

    #[test]
    fn sub_minute_span_still_counts_one_minute() {
        let series = build_series(&request("10:00", "10:00", (6.0, 4.0), (70.0, 80.0)));
        assert_eq!(series.elapsed_minutes, 1);
        assert_eq!(series.len(), 2);
        assert_eq!(series.cooling_rate, 2.0);
    }

    #[test]
    fn endpoints_are_pinned() {
        let series = build_series(&request("16:03", "16:53", (5.55, 3.17), (73.84, 89.46)));
        let first = &series.samples[0];
        let last = &series.samples[series.len() - 1];
        assert_eq!(first.temperature, 5.55);
        assert_eq!(last.temperature, 3.17);
        assert_eq!(first.humidity, 73.84);
        assert_eq!(last.humidity, 89.46);
        assert_eq!(series.linear_temperatures[series.len() - 1], 3.17);
        for sample in &series.samples[1..series.len() - 1] {
            let tenths = sample.temperature * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn timestamps_advance_by_one_minute() {
        let series = build_series(&request("23:50", "00:10", (8.0, 2.0), (60.0, 70.0)));
        assert_eq!(series.elapsed_minutes, 20);
        for pair in series.samples.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(1));
        }
        assert_eq!(series.samples[20].timestamp, series.end);
    }

    #[test]
    fn k_is_guarded_at_or_below_ambient() {
        let series = build_series(&request("10:00", "10:10", (2.0, -3.0), (50.0, 50.0)));
        assert_eq!(series.samples[0].k, 0.0);
        for sample in &series.samples {
            assert!(sample.k.is_finite());
        }
        // 2.0, 1.5, 1.0, 0.5, 0.0, -0.5 ...
        assert!(series.samples[1].k > 0.0);
        assert_eq!(series.samples[4].k, 0.0);
        assert_eq!(series.samples[5].k, 0.0);
        assert_eq!(series.samples[10].k, 0.0);
    }

    #[test]
    fn step_k_matches_log_ratio() {
        let series = build_series(&request("10:00", "10:02", (8.0, 2.0), (50.0, 50.0)));
        assert!((series.samples[1].k - (8.0f64 / 5.0).ln()).abs() < 1e-12);
        assert!((series.samples[2].k - (5.0f64 / 2.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn constant_temperature_has_zero_k() {
        let series = build_series(&request("10:00", "10:05", (4.0, 4.0), (50.0, 50.0)));
        assert!(series.samples.iter().all(|s| s.k == 0.0 && s.k.is_sign_positive()));
    }

    #[test]
    fn global_fit_rejects_ambient_endpoints() {
        let req = request("10:00", "10:10", (10.0, 0.0), (50.0, 60.0));
        let series = build_series(&req);
        match fit_global(&req, &series, &ModelOptions::default()) {
            Err(ReportError::Domain { field, .. }) => assert_eq!(field, "end temperature"),
            other => panic!("unexpected: {other:?}"),
        }

        let req = request("10:00", "10:10", (-1.0, -5.0), (50.0, 60.0));
        let series = build_series(&req);
        assert!(matches!(
            fit_global(&req, &series, &ModelOptions::default()),
            Err(ReportError::Domain { field: "start temperature", .. })
        ));
    }

    #[test]
    fn global_fit_near_ambient_is_large_but_finite() {
        let req = request("10:00", "10:10", (10.0, 0.1), (50.0, 60.0));
        let (series, fit) = compute(&req, &ModelOptions::default()).unwrap();
        assert!(fit.k.is_finite());
        assert!(fit.k > 0.4);
        assert!((fit.k - (100.0f64).ln() / 10.0).abs() < 1e-12);
        assert_eq!(fit.fine_curve.len(), 101);
        let last = fit.fine_curve[fit.fine_curve.len() - 1];
        assert!((last.minute - 10.0).abs() < 1e-9);
        assert!((last.temperature - 0.1).abs() < 1e-9);
        assert_eq!(fit.fine_curve[0].temperature, 10.0);
        assert_eq!(series.len(), 11);
    }

    #[test]
    fn fine_curve_resolution_follows_options() {
        let req = request("10:00", "10:05", (6.0, 3.0), (50.0, 60.0));
        let options = ModelOptions {
            ticks_per_minute: 4,
        };
        let (_, fit) = compute(&req, &options).unwrap();
        assert_eq!(fit.fine_curve.len(), 21);
        assert!((fit.fine_curve[1].minute - 0.25).abs() < 1e-12);
    }

    #[test]
    fn ticks_for_fifty_minutes() {
        let ticks = select_ticks(50);
        assert!((MIN_TICKS..=MAX_TICKS).contains(&ticks.len()));
        assert_eq!(ticks.first(), Some(&0));
        assert_eq!(ticks.last(), Some(&50));
        assert_eq!(ticks, vec![0, 7, 14, 21, 29, 36, 43, 50]);
    }

    #[test]
    fn ticks_stay_within_bounds() {
        for total in [5, 10, 20, 47, 90, 240, 1439] {
            let ticks = select_ticks(total);
            assert!(
                (MIN_TICKS..=MAX_TICKS).contains(&ticks.len()),
                "{total}: {ticks:?}"
            );
            assert_eq!(ticks[0], 0);
            assert_eq!(*ticks.last().unwrap(), total);
            assert!(ticks.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn short_spans_tick_every_minute() {
        assert_eq!(select_ticks(1), vec![0, 1]);
        assert_eq!(select_ticks(3), vec![0, 1, 2, 3]);
    }

    #[test]
    fn stats_cover_both_readings() {
        let series = build_series(&request("10:00", "10:10", (10.0, 0.0), (50.0, 60.0)));
        let stats = series.stats();
        assert_eq!(stats.temperature_max, 10.0);
        assert_eq!(stats.temperature_min, 0.0);
        assert!((stats.temperature_mean - 5.0).abs() < 1e-12);
        assert_eq!(stats.humidity_max, 60.0);
        assert_eq!(stats.humidity_min, 50.0);
        assert!((stats.humidity_mean - 55.0).abs() < 1e-9);
    }
}
