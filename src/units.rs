//! Glucose units, clinical thresholds and TIR bands
//!
//! All values are mg/dL. Bands are overlapping by definition: a reading
//! below 54 is both `VeryLow` and `Low`, a reading above 250 is both
//! `VeryHigh` and `High`.

use serde::{Deserialize, Serialize};

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{} mg/dL", self.format_value())
    }

    /// Format just the value; whole numbers print without a fraction
    pub fn format_value(self) -> String {
        format!("{}", self.0)
    }

    /// Format with a fixed number of decimals and unit suffix
    pub fn format_fixed(self, decimals: usize) -> String {
        format!("{:.*} mg/dL", decimals, self.0)
    }
}

impl From<f64> for MgDl {
    fn from(value: f64) -> Self {
        MgDl(value)
    }
}

/// Low/high range bounds used for in-range classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Low threshold in mg/dL - default 70
    pub low_mgdl: f64,
    /// High threshold in mg/dL - default 180
    pub high_mgdl: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_mgdl: 70.0,
            high_mgdl: 180.0,
        }
    }
}

impl Thresholds {
    /// Clinical constant: severe hypoglycemia threshold
    pub const VERY_LOW_MGDL: f64 = 54.0;

    /// Clinical constant: severe hyperglycemia threshold
    pub const VERY_HIGH_MGDL: f64 = 250.0;

    pub fn new(low_mgdl: f64, high_mgdl: f64) -> Self {
        Self { low_mgdl, high_mgdl }
    }

    /// Inside `[low, high]`, both bounds inclusive
    pub fn in_range(&self, mg_dl: f64) -> bool {
        mg_dl >= self.low_mgdl && mg_dl <= self.high_mgdl
    }

    pub fn is_low(&self, mg_dl: f64) -> bool {
        mg_dl < self.low_mgdl
    }

    pub fn is_high(&self, mg_dl: f64) -> bool {
        mg_dl > self.high_mgdl
    }
}

/// Glycemic band for time-in-range reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseBand {
    Normal,   // 70 to 180 inclusive
    Low,      // < 70, includes VeryLow
    VeryLow,  // < 54
    High,     // > 180, includes VeryHigh
    VeryHigh, // > 250
}

impl GlucoseBand {
    /// Report order of the bands
    pub const ALL: [GlucoseBand; 5] = [
        GlucoseBand::Normal,
        GlucoseBand::Low,
        GlucoseBand::VeryLow,
        GlucoseBand::High,
        GlucoseBand::VeryHigh,
    ];

    /// Whether a reading counts towards this band (bands overlap)
    pub fn contains(self, mg_dl: f64) -> bool {
        let standard = Thresholds::default();
        match self {
            GlucoseBand::Normal => standard.in_range(mg_dl),
            GlucoseBand::Low => standard.is_low(mg_dl),
            GlucoseBand::VeryLow => mg_dl < Thresholds::VERY_LOW_MGDL,
            GlucoseBand::High => standard.is_high(mg_dl),
            GlucoseBand::VeryHigh => mg_dl > Thresholds::VERY_HIGH_MGDL,
        }
    }

    /// Display label used in TIR documents
    pub fn label(self) -> &'static str {
        match self {
            GlucoseBand::Normal => "Normal (70-180 mg/dL)",
            GlucoseBand::Low => "Low (<70 mg/dL)",
            GlucoseBand::VeryLow => "Very Low (<54 mg/dL)",
            GlucoseBand::High => "High (>180 mg/dL)",
            GlucoseBand::VeryHigh => "Very High (>250 mg/dL)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mgdl_formatting() {
        assert_eq!(MgDl(180.0).format(), "180 mg/dL");
        assert_eq!(MgDl(130.5).format_value(), "130.5");
        assert_eq!(MgDl(112.456).format_fixed(2), "112.46 mg/dL");
    }

    #[test]
    fn test_thresholds_boundaries() {
        let thresholds = Thresholds::default();
        assert!(thresholds.in_range(70.0));
        assert!(thresholds.in_range(180.0));
        assert!(thresholds.is_low(69.9));
        assert!(thresholds.is_high(180.1));
    }

    #[test]
    fn test_bands_overlap() {
        assert!(GlucoseBand::VeryLow.contains(50.0));
        assert!(GlucoseBand::Low.contains(50.0));
        assert!(!GlucoseBand::Normal.contains(50.0));
        assert!(GlucoseBand::VeryHigh.contains(300.0));
        assert!(GlucoseBand::High.contains(300.0));
        assert!(!GlucoseBand::VeryHigh.contains(250.0));
        assert!(GlucoseBand::High.contains(250.0));
    }
}
