//! Time-in-range band classification

use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::stats::{percentage, round_to};
use crate::units::GlucoseBand;

/// Per-band reading counts against a shared total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInRange {
    pub total: usize,
    pub normal: usize,
    pub low: usize,
    pub very_low: usize,
    pub high: usize,
    pub very_high: usize,
}

impl TimeInRange {
    /// Count readings per band; a reading may land in two bands
    pub fn from_values(values: &[f64]) -> Self {
        let mut tir = Self {
            total: values.len(),
            ..Self::default()
        };

        for &v in values {
            for band in GlucoseBand::ALL {
                if band.contains(v) {
                    *tir.count_mut(band) += 1;
                }
            }
        }

        tir
    }

    pub fn count(&self, band: GlucoseBand) -> usize {
        match band {
            GlucoseBand::Normal => self.normal,
            GlucoseBand::Low => self.low,
            GlucoseBand::VeryLow => self.very_low,
            GlucoseBand::High => self.high,
            GlucoseBand::VeryHigh => self.very_high,
        }
    }

    fn count_mut(&mut self, band: GlucoseBand) -> &mut usize {
        match band {
            GlucoseBand::Normal => &mut self.normal,
            GlucoseBand::Low => &mut self.low,
            GlucoseBand::VeryLow => &mut self.very_low,
            GlucoseBand::High => &mut self.high,
            GlucoseBand::VeryHigh => &mut self.very_high,
        }
    }

    /// Unrounded percentage for a band, 0 for an empty population
    pub fn percentage(&self, band: GlucoseBand) -> f64 {
        percentage(self.count(band), self.total)
    }
}

/// TIR document: five fixed labels and their percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TirChart {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl From<TimeInRange> for TirChart {
    fn from(tir: TimeInRange) -> Self {
        Self {
            labels: GlucoseBand::ALL.iter().map(|b| b.label().to_string()).collect(),
            data: GlucoseBand::ALL
                .iter()
                .map(|&b| round_to(tir.percentage(b), 1))
                .collect(),
        }
    }
}

/// Compute the TIR chart for a reading set. Empty input yields zeros.
pub fn compute_tir(readings: &[Reading]) -> TirChart {
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    TimeInRange::from_values(&values).into()
}
