//! Statistics helpers shared by every metric family
//!
//! All functions are total: empty input and zero means produce 0 (or `None`
//! where a value is genuinely undefined) instead of NaN.

use serde::{Deserialize, Serialize};

/// Descriptive statistics over mg/dL values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl GlucoseStats {
    /// Calculate statistics from mg/dL values
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mean = mean(values);
        Some(Self {
            count: values.len(),
            mean,
            std_dev: sample_std_dev(values, mean),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// Coefficient of variation in percent
    pub fn cv(&self) -> f64 {
        coefficient_of_variation(self.std_dev, self.mean)
    }

    /// Largest amplitude of glycemic excursion (max - min)
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation, 0 with fewer than two values
pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance: f64 = values.iter()
        .map(|&v| (v - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation, 0 for an empty slice
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance: f64 = values.iter()
        .map(|&v| (v - mean).powi(2))
        .sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `100 * sd / mean`, 0 when the mean is 0
pub fn coefficient_of_variation(std_dev: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        0.0
    } else {
        std_dev / mean * 100.0
    }
}

/// Percentage of `count` in `total`, 0 for an empty population
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Quantile of ascending-sorted values by linear interpolation between
/// closest ranks (`pos = (n - 1) * q`)
pub fn quantile(sorted_values: &[f64], q: f64) -> Option<f64> {
    if sorted_values.is_empty() {
        return None;
    }
    let pos = (sorted_values.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    Some(sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * weight)
}

/// Sort a copy of the values ascending
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Round to a fixed number of decimals, ties to even
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Estimated HbA1c (%) from mean glucose in mg/dL.
///
/// `0.0348 * mean + 1.626` is an approximation, not a clinical formula.
pub fn estimated_hba1c(mean_glucose: Option<f64>) -> Option<f64> {
    mean_glucose.map(|m| round_to(0.0348 * m + 1.626, 2))
}

/// Trapezoidal area under evenly spaced values
pub fn trapezoid(values: &[f64], dx: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.windows(2).map(|w| (w[0] + w[1]) / 2.0 * dx).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glucose_stats() {
        let stats = GlucoseStats::from_values(&[100.0, 120.0, 140.0, 160.0, 180.0]).unwrap();
        assert_eq!(stats.count, 5);
        assert!((stats.mean - 140.0).abs() < 0.01);
        assert!((stats.std_dev - 31.62).abs() < 0.01);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 180.0);
        assert_eq!(stats.range(), 80.0);
        assert!(GlucoseStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_std_dev_edge_cases() {
        assert_eq!(sample_std_dev(&[120.0], 120.0), 0.0);
        assert_eq!(population_std_dev(&[], 0.0), 0.0);
        assert!((population_std_dev(&[90.0, 110.0], 100.0) - 10.0).abs() < 1e-9);
        assert_eq!(coefficient_of_variation(12.0, 0.0), 0.0);
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = sorted(&[40.0, 10.0, 30.0, 20.0]);
        assert_eq!(quantile(&values, 0.0), Some(10.0));
        assert_eq!(quantile(&values, 0.5), Some(25.0));
        assert!((quantile(&values, 0.9).unwrap() - 37.0).abs() < 1e-9);
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[55.0], 0.1), Some(55.0));
    }

    #[test]
    fn test_round_to_ties_even() {
        assert_eq!(round_to(6.25, 1), 6.2);
        assert_eq!(round_to(6.75, 1), 6.8);
        assert_eq!(round_to(0.5, 0), 0.0);
        assert_eq!(round_to(1.5, 0), 2.0);
        assert_eq!(round_to(33.333, 1), 33.3);
    }

    #[test]
    fn test_estimated_hba1c() {
        assert_eq!(estimated_hba1c(Some(120.0)), Some(5.8));
        assert_eq!(estimated_hba1c(None), None);
    }

    #[test]
    fn test_trapezoid() {
        assert_eq!(trapezoid(&[100.0], 5.0), 0.0);
        assert_eq!(trapezoid(&[100.0, 110.0, 90.0], 5.0), 1025.0);
    }
}
