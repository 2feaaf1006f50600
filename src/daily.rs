//! Per-day statistics and glycemic excursion metrics (LAGE, MAGE)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reading::{group_by_date, values, Reading};
use crate::rollup::DailyRecord;
use crate::stats::{percentage, GlucoseStats};
use crate::units::{MgDl, Thresholds};

/// Statistics for one calendar day, kept at full precision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub mean: f64,
    /// Sample standard deviation (SDBG)
    pub sd: f64,
    pub cv: f64,
    pub highest: f64,
    pub lowest: f64,
    pub lage: f64,
    pub mage: u32,
    pub pct_high: f64,
    pub pct_low: f64,
    pub tir: f64,
}

impl DailyRecord for DailyMetrics {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Display row for a day, labelled the way the dashboard expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricsRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Average Glucose")]
    pub average_glucose: String,
    #[serde(rename = "SDBG")]
    pub sdbg: String,
    #[serde(rename = "CV")]
    pub cv: String,
    #[serde(rename = "Highest Glucose")]
    pub highest_glucose: String,
    #[serde(rename = "Lowest Glucose")]
    pub lowest_glucose: String,
    #[serde(rename = "Lage")]
    pub lage: String,
    #[serde(rename = "Mage")]
    pub mage: String,
    #[serde(rename = "Percentage high  ≥180mg/dL")]
    pub percentage_high: String,
    #[serde(rename = "Percentage low ≤70mg/dL")]
    pub percentage_low: String,
    #[serde(rename = "Tir")]
    pub tir: String,
}

impl DailyMetrics {
    /// Metrics for one day's readings, sorted ascending. `None` when empty.
    pub fn from_day(date: NaiveDate, readings: &[Reading]) -> Option<Self> {
        let values = values(readings);
        let stats = GlucoseStats::from_values(&values)?;
        let thresholds = Thresholds::default();
        let total = values.len();

        Some(Self {
            date,
            mean: stats.mean,
            sd: stats.std_dev,
            cv: stats.cv(),
            highest: stats.max,
            lowest: stats.min,
            lage: stats.range(),
            mage: mage(&values, stats.std_dev),
            pct_high: percentage(values.iter().filter(|&&v| thresholds.is_high(v)).count(), total),
            pct_low: percentage(values.iter().filter(|&&v| thresholds.is_low(v)).count(), total),
            tir: percentage(values.iter().filter(|&&v| thresholds.in_range(v)).count(), total),
        })
    }

    /// Fixed-format strings for display
    pub fn to_row(&self) -> DailyMetricsRow {
        DailyMetricsRow {
            date: self.date.format("%m/%d").to_string(),
            average_glucose: MgDl(self.mean).format_fixed(2),
            sdbg: MgDl(self.sd).format_fixed(2),
            cv: format!("{:.2}%", self.cv),
            highest_glucose: format!("{}", self.highest.trunc()),
            lowest_glucose: format!("{}", self.lowest.trunc()),
            lage: format_rounded(self.lage),
            mage: self.mage.to_string(),
            percentage_high: format!("{:.2}%", self.pct_high),
            percentage_low: format!("{:.2}%", self.pct_low),
            tir: format!("{:.2}%", self.tir),
        }
    }
}

/// Round to 2 decimals, keeping one fractional digit for whole numbers
fn format_rounded(value: f64) -> String {
    let rounded = crate::stats::round_to(value, 2);
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// Compute metrics for every calendar date in the input, in date order
pub fn compute_daily_metrics(readings: &[Reading]) -> Vec<DailyMetrics> {
    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, mut day)| {
            day.sort_by_key(|r| r.timestamp);
            DailyMetrics::from_day(date, &day)
        })
        .collect()
}

/// Indices of strict local peaks and troughs (3-point comparison)
pub fn peaks_and_troughs(values: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let mut peaks = Vec::new();
    let mut troughs = Vec::new();

    for (offset, w) in values.windows(3).enumerate() {
        let i = offset + 1;
        if w[1] > w[0] && w[1] > w[2] {
            peaks.push(i);
        } else if w[1] < w[0] && w[1] < w[2] {
            troughs.push(i);
        }
    }

    (peaks, troughs)
}

/// Simplified mean amplitude of glycemic excursions.
///
/// Pairs `peaks[i]` with `troughs[i - 1]` by list position, not by time, so
/// a pair is not guaranteed to be adjacent excursions. This matches the
/// dashboard's historical numbers and is kept for parity; see DESIGN.md.
pub fn mage(values: &[f64], sd: f64) -> u32 {
    let (peaks, troughs) = peaks_and_troughs(values);
    let pairs = peaks.len().min(troughs.len());

    let fluctuations: Vec<f64> = (1..pairs)
        .map(|i| (values[peaks[i]] - values[troughs[i - 1]]).abs())
        .filter(|&f| f > sd)
        .collect();

    if fluctuations.is_empty() {
        return 0;
    }
    let mean = fluctuations.iter().sum::<f64>() / fluctuations.len() as f64;
    mean.ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::at;

    #[test]
    fn test_constant_day_has_no_variability() {
        let readings: Vec<Reading> = (0..5)
            .map(|i| at(&format!("2024-03-04T08:{:02}:00", i * 5), 100.0))
            .collect();
        let metrics = compute_daily_metrics(&readings);
        assert_eq!(metrics.len(), 1);
        let day = &metrics[0];
        assert_eq!(day.sd, 0.0);
        assert_eq!(day.cv, 0.0);
        assert_eq!(day.lage, 0.0);
        assert_eq!(day.mage, 0);
        assert_eq!(day.tir, 100.0);
    }

    #[test]
    fn test_peaks_and_troughs() {
        let (peaks, troughs) = peaks_and_troughs(&[100.0, 150.0, 90.0, 95.0, 160.0, 80.0, 170.0]);
        assert_eq!(peaks, vec![1, 4]);
        assert_eq!(troughs, vec![2, 5]);
    }

    #[test]
    fn test_mage_pairs_by_list_position() {
        // peaks at 1 (200), 3 (220), 5 (210); troughs at 2 (80), 4 (100)
        let values = [100.0, 200.0, 80.0, 220.0, 100.0, 210.0, 150.0];
        // pairs: peaks[1]=220 with troughs[0]=80 -> 140 (only i = 1 since min(3, 2) = 2)
        assert_eq!(mage(&values, 10.0), 140);
        assert_eq!(mage(&values, 150.0), 0);
    }

    #[test]
    fn test_mage_rounds_up() {
        // peaks 150, 161, 170; troughs 100, 90, 120
        let values = [120.0, 150.0, 100.0, 161.0, 90.0, 170.0, 120.0, 130.0];
        // i=1: |161-100| = 61, i=2: |170-90| = 80 -> mean 70.5 -> 71
        assert_eq!(mage(&values, 20.0), 71);
    }

    #[test]
    fn test_daily_metrics_grouping_and_rows() {
        let readings = vec![
            at("2024-03-05T09:00:00", 200.0),
            at("2024-03-04T07:00:00", 60.0),
            at("2024-03-04T08:00:00", 100.0),
            at("2024-03-04T09:00:00", 190.5),
            at("2024-03-04T10:00:00", 149.9),
        ];
        let metrics = compute_daily_metrics(&readings);
        assert_eq!(metrics.len(), 2);

        let first = &metrics[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(first.highest, 190.5);
        assert_eq!(first.lowest, 60.0);
        assert_eq!(first.lage, 130.5);
        assert_eq!(first.pct_low, 25.0);
        assert_eq!(first.pct_high, 25.0);
        assert_eq!(first.tir, 50.0);

        let row = first.to_row();
        assert_eq!(row.date, "03/04");
        assert_eq!(row.average_glucose, "125.10 mg/dL");
        assert_eq!(row.highest_glucose, "190");
        assert_eq!(row.lage, "130.5");
        assert_eq!(row.tir, "50.00%");

        let second = metrics[1].to_row();
        assert_eq!(second.sdbg, "0.00 mg/dL");
        assert_eq!(second.lage, "0.0");
    }
}
