//! Ambulatory Glucose Profile and monitoring-period summary
//!
//! The profile pools readings from every day by hour of day into twelve
//! fixed two-hour blocks and reports percentile bands per block.

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::stats::{self, estimated_hba1c, round_to, GlucoseStats};

/// Hours covered by one profile block
pub const BLOCK_HOURS: u32 = 2;

/// Number of blocks in a day
pub const BLOCK_COUNT: usize = 12;

const QUANTILES: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

/// Percentile band of one block; `None` when the block has no readings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
}

impl Percentiles {
    /// Percentiles of unsorted values, rounded to 2 decimals
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = stats::sorted(values);
        let [p10, p25, p50, p75, p90] =
            QUANTILES.map(|q| stats::quantile(&sorted, q).map(|v| round_to(v, 2)));
        Self { p10, p25, p50, p75, p90 }
    }
}

/// One two-hour block of the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Block start as "HH:MM"
    pub time_of_day: String,
    pub percentiles: Percentiles,
}

/// AGP document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgpProfile {
    pub time_blocks: Vec<TimeBlock>,
}

/// Compute the profile. Empty input yields no blocks; otherwise all twelve
/// blocks are present in clock order.
pub fn compute_agp(readings: &[Reading]) -> AgpProfile {
    if readings.is_empty() {
        return AgpProfile::default();
    }

    let mut blocks: Vec<Vec<f64>> = vec![Vec::new(); BLOCK_COUNT];
    for reading in readings {
        let block = (reading.timestamp.hour() / BLOCK_HOURS) as usize;
        blocks[block].push(reading.value);
    }

    let time_blocks = blocks
        .iter()
        .enumerate()
        .map(|(i, values)| TimeBlock {
            time_of_day: format!("{:02}:00", i as u32 * BLOCK_HOURS),
            percentiles: Percentiles::from_values(values),
        })
        .collect();

    AgpProfile { time_blocks }
}

/// Headline numbers for the whole monitoring period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub mean_glucose: f64,
    pub estimated_hba1c: Option<f64>,
    /// Coefficient of variation in percent (sample SD)
    pub cv: f64,
}

impl SummaryMetrics {
    /// "dd-mm-YYYY - dd-mm-YYYY (N days)"
    pub fn monitoring_period(&self) -> String {
        format!(
            "{} - {} ({} days)",
            self.start_date.format("%d-%m-%Y"),
            self.end_date.format("%d-%m-%Y"),
            self.total_days
        )
    }
}

/// Summarise the monitoring period, `None` for empty input
pub fn compute_summary(readings: &[Reading]) -> Option<SummaryMetrics> {
    let first = readings.iter().map(|r| r.timestamp).min()?;
    let last = readings.iter().map(|r| r.timestamp).max()?;
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let stats = GlucoseStats::from_values(&values)?;

    Some(SummaryMetrics {
        start_date: first.date(),
        end_date: last.date(),
        total_days: (last - first).num_days() + 1,
        mean_glucose: stats.mean,
        estimated_hba1c: estimated_hba1c(Some(stats.mean)),
        cv: stats.cv(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::at;

    #[test]
    fn test_agp_has_twelve_blocks() {
        let readings = vec![
            at("2024-03-04T00:30:00", 100.0),
            at("2024-03-04T01:59:00", 120.0),
            at("2024-03-05T01:00:00", 140.0),
            at("2024-03-05T23:10:00", 90.0),
        ];
        let agp = compute_agp(&readings);
        assert_eq!(agp.time_blocks.len(), 12);
        assert_eq!(agp.time_blocks[0].time_of_day, "00:00");
        assert_eq!(agp.time_blocks[11].time_of_day, "22:00");

        let first = agp.time_blocks[0].percentiles;
        assert_eq!(first.p50, Some(120.0));
        assert_eq!(first.p10, Some(104.0));
        assert_eq!(first.p90, Some(136.0));

        assert_eq!(agp.time_blocks[5].percentiles, Percentiles::default());
        assert_eq!(agp.time_blocks[11].percentiles.p25, Some(90.0));
    }

    #[test]
    fn test_agp_empty_input() {
        assert!(compute_agp(&[]).time_blocks.is_empty());
    }

    #[test]
    fn test_empty_block_serializes_nulls() {
        let block = TimeBlock {
            time_of_day: "04:00".to_string(),
            percentiles: Percentiles::default(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert!(json["percentiles"]["p90"].is_null());
    }

    #[test]
    fn test_summary_metrics() {
        let readings = vec![
            at("2024-03-04T08:00:00", 110.0),
            at("2024-03-06T20:00:00", 130.0),
        ];
        let summary = compute_summary(&readings).unwrap();
        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.mean_glucose, 120.0);
        assert_eq!(summary.estimated_hba1c, Some(5.8));
        assert_eq!(summary.monitoring_period(), "04-03-2024 - 06-03-2024 (3 days)");
        assert!(compute_summary(&[]).is_none());
    }
}
