//! Single-day glucose snapshot for the home screen

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::GlucoseConfig;
use crate::fasting::{default_fasting_end, fasting_reading_near};
use crate::reading::Reading;
use crate::stats::{coefficient_of_variation, estimated_hba1c, mean, population_std_dev};

/// Values below this are treated as sensor noise by the snapshot
pub const SNAPSHOT_MIN_MGDL: f64 = 50.0;

/// How far from the fasting end a fasting reading may be
pub const FASTING_TOLERANCE_MINUTES: i64 = 15;

/// CV of each part of the day, in whole percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlucoseVariability {
    pub day_glucose_stability: Option<u32>,
    pub night_glucose_stability: Option<u32>,
    pub overall_cv: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub highest_glucose: Option<f64>,
    pub lowest_glucose: Option<f64>,
    pub latest_glucose: Option<f64>,
    pub latest_timestamp: Option<NaiveDateTime>,
    pub fasting_glucose: Option<f64>,
    #[serde(rename = "estimated_HbA1c")]
    pub estimated_hba1c: Option<f64>,
    pub glucose_variability: GlucoseVariability,
}

fn snapshot_day_window() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

/// Population-SD CV rounded to whole percent, `None` when undefined
fn rounded_cv(values: &[f64]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let m = mean(values);
    if m == 0.0 {
        return None;
    }
    Some(coefficient_of_variation(population_std_dev(values, m), m).round_ties_even() as u32)
}

/// Variability of one day's plausible readings, split at 06:00 and 22:00
pub fn compute_variability(day: &[Reading]) -> GlucoseVariability {
    let (start, end) = snapshot_day_window();
    let mut day_values = Vec::new();
    let mut night_values = Vec::new();
    for r in day.iter().filter(|r| r.value >= SNAPSHOT_MIN_MGDL) {
        let time = r.timestamp.time();
        if start <= time && time <= end {
            day_values.push(r.value);
        } else {
            night_values.push(r.value);
        }
    }
    let all: Vec<f64> = day_values.iter().chain(night_values.iter()).copied().collect();

    GlucoseVariability {
        day_glucose_stability: rounded_cv(&day_values),
        night_glucose_stability: rounded_cv(&night_values),
        overall_cv: rounded_cv(&all),
    }
}

/// Snapshot of `date`. `readings` may also hold the previous day, which is
/// only used when looking for the fasting reading.
pub fn compute_snapshot(readings: &[Reading], date: NaiveDate, config: &GlucoseConfig) -> DailySnapshot {
    let today: Vec<Reading> = readings
        .iter()
        .filter(|r| r.date() == date && r.value >= SNAPSHOT_MIN_MGDL)
        .copied()
        .collect();

    if today.is_empty() {
        log::debug!("No valid readings for snapshot of {}", date);
        return DailySnapshot::default();
    }

    let highest = today.iter().map(|r| r.value).fold(f64::NEG_INFINITY, f64::max);
    let lowest = today.iter().map(|r| r.value).fold(f64::INFINITY, f64::min);
    let latest = today.iter().max_by_key(|r| r.timestamp).copied();

    let values: Vec<f64> = today.iter().map(|r| r.value).collect();
    let rounded_mean = mean(&values).round_ties_even();

    let fasting_end = config.fasting_end_time.unwrap_or_else(default_fasting_end);
    let fasting = fasting_reading_near(
        readings,
        date.and_time(fasting_end),
        Duration::minutes(FASTING_TOLERANCE_MINUTES),
    );

    DailySnapshot {
        highest_glucose: Some(highest),
        lowest_glucose: Some(lowest),
        latest_glucose: latest.map(|r| r.value),
        latest_timestamp: latest.map(|r| r.timestamp),
        fasting_glucose: fasting.map(|r| r.value),
        estimated_hba1c: estimated_hba1c(Some(rounded_mean)),
        glucose_variability: compute_variability(&today),
    }
}
