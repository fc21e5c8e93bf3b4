use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use cooling_report::{
    build_series, compute, default_file_name, fit_global, render, RenderContext, ReportOptions,
    ReportRequest, SampleSeries,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cooling validation report CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the PDF report for one cooling run
    Report(ReportArgs),
    /// Write the per-minute cooling table as CSV
    Series(SeriesArgs),
}

#[derive(Args, Debug, Clone)]
struct RequestArgs {
    /// Read the whole request from a JSON file instead of the flags below
    #[arg(long, value_hint = ValueHint::FilePath)]
    request: Option<PathBuf>,

    /// Report title
    #[arg(
        long,
        default_value = "MONITORAMENTO PCC 2B NA CÂMARA 0 ºC DO SETOR PRODUTIVO DO IQF"
    )]
    title: String,

    /// Objective paragraph
    #[arg(
        long,
        default_value = "Verificação da capacidade do atendimento do binômio 4 ºC em 4 Horas"
    )]
    objective: String,

    /// Product name
    #[arg(long, default_value = "Sassami")]
    product: String,

    /// Run date (dd/mm/yyyy), defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Start time (HH:MM)
    #[arg(long, default_value = "16:03")]
    start: String,

    /// End time (HH:MM); earlier than start means the run crossed midnight
    #[arg(long, default_value = "16:53")]
    end: String,

    /// Start temperature in °C (comma or dot decimals)
    #[arg(long, default_value = "5.5", allow_hyphen_values = true)]
    t_start: String,

    /// End temperature in °C
    #[arg(long, default_value = "3.2", allow_hyphen_values = true)]
    t_end: String,

    /// Start relative humidity in %
    #[arg(long, default_value = "73,8")]
    ur_start: String,

    /// End relative humidity in %
    #[arg(long, default_value = "89,5")]
    ur_end: String,
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output PDF path (defaults to Report_<HHMMSS>.pdf)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Optional report options JSON path
    #[arg(long, value_hint = ValueHint::FilePath)]
    options: Option<PathBuf>,

    /// Logo image path (overrides the options file)
    #[arg(long, value_hint = ValueHint::FilePath)]
    logo: Option<PathBuf>,

    /// Render without a logo
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "logo")]
    no_logo: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Optional report options JSON path
    #[arg(long, value_hint = ValueHint::FilePath)]
    options: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Report(args) => args.verbose,
        Command::Series(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Series(args) => handle_series(args),
    }
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let generated_at = Local::now().naive_local();
    let timed = args.profile || args.verbose;

    let mut options = load_options(args.options.as_deref())?;
    if args.no_logo {
        options.logo_path = None;
    } else if let Some(logo) = args.logo.clone() {
        options.logo_path = Some(logo);
    }
    options.validate()?;

    let t_parse = Instant::now();
    let request = load_request(&args.request, generated_at.date())?;
    let parsed = request.parse()?;
    if timed {
        info!(
            "Parse stage: {:.1} ms",
            t_parse.elapsed().as_secs_f64() * 1000.0
        );
    }

    let t_compute = Instant::now();
    let (series, fit) = compute(&parsed, &options.model())?;
    if timed {
        info!(
            "Compute stage: {:.1} ms ({} samples, {} curve points)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            series.len(),
            fit.fine_curve.len()
        );
    }
    info!(
        "Cooling modeled: {} min, rate {:.5} °C/min, k {:.4} min^-1",
        series.elapsed_minutes, series.cooling_rate, fit.k
    );

    let t_render = Instant::now();
    let context = RenderContext::new(&options, generated_at);
    let report = render(&parsed, &series, &fit, &context)?;
    if timed {
        info!(
            "Render stage: {:.1} ms ({} pages, {} bytes)",
            t_render.elapsed().as_secs_f64() * 1000.0,
            report.page_count,
            report.bytes.len()
        );
    }

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name(generated_at)));
    fs::write(&path, &report.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote report: {} ({} pages)", path.display(), report.page_count);
    Ok(())
}

fn handle_series(args: SeriesArgs) -> Result<()> {
    let options = load_options(args.options.as_deref())?;
    options.validate()?;
    let request = load_request(&args.request, Local::now().date_naive())?;
    let parsed = request.parse()?;

    let series = build_series(&parsed);
    match fit_global(&parsed, &series, &options.model()) {
        Ok(fit) => info!(
            "Global fit: k {:.4} min^-1 over {} min",
            fit.k, series.elapsed_minutes
        ),
        Err(err) => warn!("Global fit unavailable: {err}"),
    }

    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut writer = csv::Writer::from_writer(stdout.lock());
        write_series_rows(&series, options.pinned_second, &mut writer)?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        write_series_rows(&series, options.pinned_second, &mut writer)?;
        info!("Wrote series CSV: {}", args.output.display());
    }
    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<ReportOptions> {
    let Some(path) = path else {
        return Ok(ReportOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read options {}", path.display()))?;
    let options = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid options file", path.display()))?;
    Ok(options)
}

fn load_request(args: &RequestArgs, today: NaiveDate) -> Result<ReportRequest> {
    if let Some(path) = args.request.as_ref() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?;
        let request = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid request file", path.display()))?;
        return Ok(request);
    }
    Ok(ReportRequest {
        title: args.title.clone(),
        objective: args.objective.clone(),
        product: args.product.clone(),
        date: args
            .date
            .clone()
            .unwrap_or_else(|| today.format("%d/%m/%Y").to_string()),
        start_time: args.start.clone(),
        end_time: args.end.clone(),
        start_temperature: args.t_start.clone(),
        end_temperature: args.t_end.clone(),
        start_humidity: args.ur_start.clone(),
        end_humidity: args.ur_end.clone(),
    })
}

fn write_series_rows<W: Write>(
    series: &SampleSeries,
    pinned_second: u32,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record([
        "id",
        "timestamp",
        "minute",
        "temperature_c",
        "humidity_pct",
        "k_per_min",
    ])?;
    for sample in &series.samples {
        let stamp = cooling_report::format::pin_second(sample.timestamp, pinned_second);
        writer.write_record([
            sample.id.to_string(),
            stamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            sample.minute.to_string(),
            format!("{:.1}", sample.temperature),
            format!("{:.1}", sample.humidity),
            format!("{:.6}", sample.k),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
