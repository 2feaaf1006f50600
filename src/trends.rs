//! Day-by-day glucose trends: range, mean/variability and normalised AUC

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reading::{group_by_date, values, Reading};
use crate::rollup::{mean_of, weekday_name, DailyRecord};
use crate::stats::{percentage, round_to, trapezoid, GlucoseStats};
use crate::units::Thresholds;

/// Sampling interval assumed for the AUC, in minutes
pub const AUC_SPACING_MINUTES: f64 = 5.0;

/// Range classification of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDay {
    pub date: NaiveDate,
    pub time_in_range: f64,
    pub time_above_range: f64,
    pub time_below_range: f64,
    pub mean_glucose: f64,
}

impl DailyRecord for RangeDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Per-day range percentages against the given thresholds
pub fn compute_range_days(readings: &[Reading], thresholds: &Thresholds) -> Vec<RangeDay> {
    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, day)| {
            let values = values(&day);
            let stats = GlucoseStats::from_values(&values)?;
            let share = |f: &dyn Fn(f64) -> bool| {
                percentage(values.iter().filter(|&&v| f(v)).count(), values.len())
            };
            Some(RangeDay {
                date,
                time_in_range: share(&|v| thresholds.in_range(v)),
                time_above_range: share(&|v| thresholds.is_high(v)),
                time_below_range: share(&|v| thresholds.is_low(v)),
                mean_glucose: stats.mean,
            })
        })
        .collect()
}

/// Weekly means of the range percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub time_in_range: f64,
    pub time_above_range: f64,
    pub time_below_range: f64,
    pub mean_glucose: f64,
}

pub fn summarize_range_week(days: &[&RangeDay]) -> RangeSummary {
    RangeSummary {
        time_in_range: round_to(mean_of(days, |d| d.time_in_range), 2),
        time_above_range: round_to(mean_of(days, |d| d.time_above_range), 2),
        time_below_range: round_to(mean_of(days, |d| d.time_below_range), 2),
        mean_glucose: round_to(mean_of(days, |d| d.mean_glucose), 2),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRow {
    pub date: NaiveDate,
    pub day: String,
    pub time_in_range: f64,
    pub time_above_range: f64,
    pub time_below_range: f64,
    pub mean_glucose: f64,
}

impl From<&RangeDay> for RangeRow {
    fn from(day: &RangeDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            time_in_range: round_to(day.time_in_range, 2),
            time_above_range: round_to(day.time_above_range, 2),
            time_below_range: round_to(day.time_below_range, 2),
            mean_glucose: round_to(day.mean_glucose, 2),
        }
    }
}

/// Mean glucose and variability of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanDay {
    pub date: NaiveDate,
    pub mean_glucose: f64,
    /// Sample standard deviation, 0 for a single reading
    pub glycemic_variability: f64,
}

impl DailyRecord for MeanDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

pub fn compute_mean_days(readings: &[Reading]) -> Vec<MeanDay> {
    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, day)| {
            let stats = GlucoseStats::from_values(&values(&day))?;
            Some(MeanDay {
                date,
                mean_glucose: stats.mean,
                glycemic_variability: stats.std_dev,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanSummary {
    pub mean_glucose: f64,
    pub glycemic_variability: f64,
}

pub fn summarize_mean_week(days: &[&MeanDay]) -> MeanSummary {
    MeanSummary {
        mean_glucose: round_to(mean_of(days, |d| d.mean_glucose), 2),
        glycemic_variability: round_to(mean_of(days, |d| d.glycemic_variability), 2),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanRow {
    pub date: NaiveDate,
    pub day: String,
    pub mean_glucose: f64,
    pub glycemic_variability: f64,
}

impl From<&MeanDay> for MeanRow {
    fn from(day: &MeanDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            mean_glucose: round_to(day.mean_glucose, 2),
            glycemic_variability: round_to(day.glycemic_variability, 2),
        }
    }
}

/// Area under the glucose curve of one day, normalised by its mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AucDay {
    pub date: NaiveDate,
    pub auc: f64,
    pub mean_glucose: f64,
    pub nauc: f64,
}

impl DailyRecord for AucDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl AucDay {
    /// AUC of one day's sorted readings, `None` when empty
    pub fn from_day(date: NaiveDate, day: &[Reading]) -> Option<Self> {
        let values = values(day);
        let stats = GlucoseStats::from_values(&values)?;
        let auc = trapezoid(&values, AUC_SPACING_MINUTES);
        let nauc = if stats.mean == 0.0 { 0.0 } else { auc / stats.mean };
        Some(Self {
            date,
            auc,
            mean_glucose: stats.mean,
            nauc,
        })
    }
}

pub fn compute_auc_days(readings: &[Reading]) -> Vec<AucDay> {
    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, mut day)| {
            day.sort_by_key(|r| r.timestamp);
            AucDay::from_day(date, &day)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AucSummary {
    pub mean_glucose: f64,
    pub auc: f64,
    pub nauc: f64,
}

/// Mean of daily means, total AUC and mean nAUC of a week
pub fn summarize_auc_week(days: &[&AucDay]) -> AucSummary {
    AucSummary {
        mean_glucose: round_to(mean_of(days, |d| d.mean_glucose), 2),
        auc: round_to(days.iter().map(|d| d.auc).sum(), 2),
        nauc: round_to(mean_of(days, |d| d.nauc), 2),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AucRow {
    pub date: NaiveDate,
    pub day: String,
    pub mean_glucose: f64,
    pub auc: f64,
    pub nauc: f64,
}

impl From<&AucDay> for AucRow {
    fn from(day: &AucDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            mean_glucose: round_to(day.mean_glucose, 2),
            auc: round_to(day.auc, 2),
            nauc: round_to(day.nauc, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::at;

    fn sample() -> Vec<Reading> {
        vec![
            at("2024-03-04T08:00:00", 60.0),
            at("2024-03-04T08:05:00", 100.0),
            at("2024-03-04T08:10:00", 160.0),
            at("2024-03-04T08:15:00", 200.0),
            at("2024-03-05T08:00:00", 100.0),
        ]
    }

    #[test]
    fn test_range_days_with_default_thresholds() {
        let days = compute_range_days(&sample(), &Thresholds::default());
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].time_in_range, 50.0);
        assert_eq!(days[0].time_above_range, 25.0);
        assert_eq!(days[0].time_below_range, 25.0);
        assert_eq!(days[0].mean_glucose, 130.0);

        let refs: Vec<&RangeDay> = days.iter().collect();
        let summary = summarize_range_week(&refs);
        assert_eq!(summary.time_in_range, 75.0);
        assert_eq!(summary.mean_glucose, 115.0);
    }

    #[test]
    fn test_range_days_with_custom_thresholds() {
        let days = compute_range_days(&sample(), &Thresholds::new(70.0, 150.0));
        assert_eq!(days[0].time_above_range, 50.0);
        assert_eq!(days[0].time_in_range, 25.0);
    }

    #[test]
    fn test_mean_days_single_reading_has_zero_variability() {
        let days = compute_mean_days(&sample());
        assert_eq!(days[1].mean_glucose, 100.0);
        assert_eq!(days[1].glycemic_variability, 0.0);
        assert!(days[0].glycemic_variability > 0.0);
        assert_eq!(MeanRow::from(&days[1]).day, "Tuesday");
    }

    #[test]
    fn test_auc_days() {
        let days = compute_auc_days(&sample());
        // (60+100)/2*5 + (100+160)/2*5 + (160+200)/2*5 = 400 + 650 + 900
        assert_eq!(days[0].auc, 1950.0);
        assert_eq!(days[0].nauc, 15.0);
        assert_eq!(days[1].auc, 0.0);
        assert_eq!(days[1].nauc, 0.0);

        let refs: Vec<&AucDay> = days.iter().collect();
        let summary = summarize_auc_week(&refs);
        assert_eq!(summary.auc, 1950.0);
        assert_eq!(summary.nauc, 7.5);
        assert_eq!(summary.mean_glucose, 115.0);
    }
}
