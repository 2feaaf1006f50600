//! Fasting blood glucose (FBG)

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::GlucoseConfig;
use crate::reading::{group_by_date, Reading};
use crate::rollup::{mean_of, weekday_name, DailyRecord};
use crate::stats::round_to;

/// Fasting glucose of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingDay {
    pub date: NaiveDate,
    pub fbg: f64,
    /// When the selected reading was taken
    pub measured_at: NaiveDateTime,
}

impl DailyRecord for FastingDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

fn distance(reading: &Reading, target: NaiveDateTime) -> Duration {
    let delta = reading.timestamp - target;
    if delta < Duration::zero() {
        -delta
    } else {
        delta
    }
}

/// Reading closest to `target`; the earliest wins a tie
pub fn closest_reading(readings: &[Reading], target: NaiveDateTime) -> Option<&Reading> {
    readings
        .iter()
        .fold(None, |best: Option<&Reading>, r| match best {
            Some(b) if distance(b, target) <= distance(r, target) => Some(b),
            _ => Some(r),
        })
}

/// Reading closest to `target` and strictly less than `tolerance` away
pub fn fasting_reading_near(
    readings: &[Reading],
    target: NaiveDateTime,
    tolerance: Duration,
) -> Option<&Reading> {
    closest_reading(readings, target).filter(|r| distance(r, target) < tolerance)
}

/// Per-day FBG: each day's reading closest to `fasting_end_time`.
/// Disabled (empty) when no fasting end time is configured.
pub fn compute_fasting_days(readings: &[Reading], config: &GlucoseConfig) -> Vec<FastingDay> {
    let Some(fasting_end) = config.fasting_end_time else {
        log::debug!("FBG disabled: fasting_end_time not configured");
        return Vec::new();
    };

    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, day)| {
            let target = date.and_time(fasting_end);
            let reading = closest_reading(&day, target)?;
            Some(FastingDay {
                date,
                fbg: reading.value,
                measured_at: reading.timestamp,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FastingSummary {
    pub fbg: f64,
}

pub fn summarize_fasting_week(days: &[&FastingDay]) -> FastingSummary {
    FastingSummary {
        fbg: round_to(mean_of(days, |d| d.fbg), 2),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingRow {
    pub date: NaiveDate,
    pub day: String,
    pub fbg: f64,
    pub measured_at: String,
}

impl From<&FastingDay> for FastingRow {
    fn from(day: &FastingDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            fbg: day.fbg,
            measured_at: day.measured_at.format("%H:%M").to_string(),
        }
    }
}

/// Default fasting end used by the daily snapshot
pub fn default_fasting_end() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN)
}
