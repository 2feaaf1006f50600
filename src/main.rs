//! Glucose analytics command line
//!
//! Reads a JSON array of `{"timestamp", "value"}` readings and prints the
//! requested document as JSON.
//!
//! Usage:
//!   glycemic agp readings.json                    - AGP report
//!   glycemic spikes readings.json --config c.txt  - Meal spike trend
//!   glycemic --help                               - Show help
//!   GLYCEMIC_DBG=1 glycemic tir readings.json     - Enable debug output

use std::env;
use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use glycemic::config::{config_file_path, get_config_dir, GlucoseConfig};
use glycemic::error::GlucoseError;
use glycemic::reading::{readings_from_json, retain_plausible, sort_readings, Reading};
use glycemic::report::{self, ExcursionKind};
use glycemic::snapshot::compute_snapshot;
use glycemic::units::Thresholds;

/// Parsed command line options following the command name
struct Options {
    readings_path: String,
    config_path: Option<String>,
    date: Option<NaiveDate>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, GlucoseError> {
        let mut readings_path = None;
        let mut config_path = None;
        let mut date = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config_path = Some(iter.next().ok_or(GlucoseError::MissingArgument("--config <file>"))?.clone());
                }
                "--date" | "-d" => {
                    let text = iter.next().ok_or(GlucoseError::MissingArgument("--date <YYYY-MM-DD>"))?;
                    let parsed = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .map_err(|_| GlucoseError::InvalidDate(text.clone()))?;
                    date = Some(parsed);
                }
                _ => readings_path = Some(arg.clone()),
            }
        }

        Ok(Self {
            readings_path: readings_path.ok_or(GlucoseError::MissingArgument("<readings.json>"))?,
            config_path,
            date,
        })
    }
}

fn main() -> Result<(), GlucoseError> {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("GLYCEMIC_DBG").is_ok();

    // Initialize logger
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    match args.get(1).map(|s| s.as_str()) {
        None | Some("--help") | Some("-h") | Some("help") => {
            print_help();
        }
        Some("--version") | Some("-V") => {
            println!("glycemic {}", env!("CARGO_PKG_VERSION"));
        }
        Some("path") | Some("paths") => {
            cmd_show_paths();
        }
        Some(command) => {
            let options = Options::parse(&args[2..])?;
            cmd_analyze(command, &options)?;
        }
    }

    Ok(())
}

/// Show config paths
fn cmd_show_paths() {
    println!("Glycemic Paths:");
    println!("  Config directory: {}", get_config_dir().display());
    println!("  Config file:      {}", config_file_path().display());
}

/// Explicit `--config` first, then the default location, then defaults
fn load_config(options: &Options) -> Result<GlucoseConfig, GlucoseError> {
    if let Some(path) = &options.config_path {
        return GlucoseConfig::load_any(path);
    }

    let default_path = config_file_path();
    if !default_path.exists() {
        return Ok(GlucoseConfig::default());
    }
    Ok(GlucoseConfig::load(&default_path).unwrap_or_else(|e| {
        warn!("Could not load config: {}. Using defaults.", e);
        GlucoseConfig::default()
    }))
}

fn load_readings(path: &Path) -> Result<Vec<Reading>, GlucoseError> {
    let mut readings = readings_from_json(&std::fs::read_to_string(path)?)?;
    let total = readings.len();
    retain_plausible(&mut readings);
    sort_readings(&mut readings);
    info!(
        "Loaded {} readings from {} ({} implausible dropped)",
        readings.len(),
        path.display(),
        total - readings.len()
    );
    Ok(readings)
}

fn print_json<T: Serialize>(document: &T) -> Result<(), GlucoseError> {
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}

fn cmd_analyze(command: &str, options: &Options) -> Result<(), GlucoseError> {
    let excursion_kind = match command {
        "dips-day" => Some(ExcursionKind::DayDips),
        "dips-night" => Some(ExcursionKind::NightDips),
        "spikes-day" => Some(ExcursionKind::DaySpikes),
        "spikes-night" => Some(ExcursionKind::NightSpikes),
        "night-dips" => Some(ExcursionKind::NightDipRuns),
        _ => None,
    };

    let known = matches!(
        command,
        "agp" | "tir" | "daily" | "spikes" | "range" | "mean" | "nauc" | "fbg" | "snapshot"
    );
    if !known && excursion_kind.is_none() {
        return Err(GlucoseError::UnknownCommand(command.to_string()));
    }

    let readings = load_readings(Path::new(&options.readings_path))?;
    let config = load_config(options)?;
    let focus = options.date;

    if let Some(kind) = excursion_kind {
        return print_json(&report::build_excursion_document(&readings, kind, &config, focus));
    }

    match command {
        "agp" => print_json(&report::build_agp_report(&readings)),
        "tir" => print_json(&report::build_tir_chart(&readings)),
        "daily" => print_json(&report::build_daily_rows(&readings)),
        "spikes" => print_json(&report::build_meal_spike_document(&readings, &config, focus)),
        "range" => print_json(&report::build_range_document(&readings, &Thresholds::default(), focus)),
        "mean" => print_json(&report::build_mean_document(&readings, focus)),
        "nauc" => print_json(&report::build_nauc_document(&readings, focus)),
        "fbg" => print_json(&report::build_fasting_document(&readings, &config, focus)),
        "snapshot" => {
            let date = focus
                .or_else(|| readings.last().map(|r| r.date()))
                .ok_or(GlucoseError::MissingArgument("--date <YYYY-MM-DD>"))?;
            print_json(&compute_snapshot(&readings, date, &config))
        }
        _ => Err(GlucoseError::UnknownCommand(command.to_string())),
    }
}

fn print_help() {
    eprintln!("Glucose analytics v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glycemic <command> <readings.json> [--config <file>] [--date YYYY-MM-DD]");
    eprintln!();
    eprintln!("COMMANDS:");
    eprintln!("  agp            AGP report: summary, TIR, percentiles, daily metrics");
    eprintln!("  tir            Time in range bands");
    eprintln!("  daily          Daily metrics rows (MAGE, LAGE, SDBG)");
    eprintln!("  spikes         Meal spike trend");
    eprintln!("  dips-day       Post-spike dips during the day");
    eprintln!("  dips-night     Post-spike dips at night");
    eprintln!("  spikes-day     Spike runs during the day");
    eprintln!("  spikes-night   Spike runs at night");
    eprintln!("  night-dips     Dip runs at night");
    eprintln!("  range          Time in/above/below range trend");
    eprintln!("  mean           Mean glucose and variability trend");
    eprintln!("  nauc           Normalised AUC trend");
    eprintln!("  fbg            Fasting blood glucose trend");
    eprintln!("  snapshot       Single-day snapshot (--date, default: last day)");
    eprintln!("  path           Show config file location");
    eprintln!("  help           Show this help");
    eprintln!();
    eprintln!("With --date, trend commands report only the ISO week containing it.");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLYCEMIC_DBG=1              Enable debug output");
    eprintln!();
    eprintln!("CONFIG:");
    eprintln!("  {}", config_file_path().display());
}
