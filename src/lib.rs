//! Glucose time-series analytics
//!
//! Pure computations over sorted glucose readings: time in range, the
//! ambulatory glucose profile, per-day excursion metrics, meal-window spike
//! detection, day/night spike and dip detection, and ISO-week trend
//! documents built on top of them.

pub mod agp;
pub mod config;
pub mod daily;
pub mod error;
pub mod excursion;
pub mod fasting;
pub mod meal;
pub mod reading;
pub mod report;
pub mod rollup;
pub mod snapshot;
pub mod stats;
pub mod tir;
pub mod trends;
pub mod units;

pub use config::GlucoseConfig;
pub use error::GlucoseError;
pub use reading::Reading;
