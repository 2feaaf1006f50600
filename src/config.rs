//! Per-patient glucose monitoring configuration
//!
//! Loaded either from a plain `key value # comment` text file or from the
//! JSON object handed over by the configuration provider. Every field is
//! optional; an absent field disables the detector that needs it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::GlucoseError;

/// Glucose day/night boundaries, meal windows and detector thresholds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlucoseConfig {
    pub day_start: Option<NaiveTime>,
    pub day_end: Option<NaiveTime>,
    pub night_start: Option<NaiveTime>,
    pub night_end: Option<NaiveTime>,
    pub fasting_end_time: Option<NaiveTime>,

    pub breakfast_start: Option<NaiveTime>,
    pub breakfast_end: Option<NaiveTime>,
    pub lunch_start: Option<NaiveTime>,
    pub lunch_end: Option<NaiveTime>,
    pub dinner_start: Option<NaiveTime>,
    pub dinner_end: Option<NaiveTime>,

    pub spike_threshold_day: Option<f64>,
    pub spike_threshold_night: Option<f64>,
    pub spike_threshold_breakfast: Option<f64>,
    pub spike_threshold_lunch: Option<f64>,
    pub spike_threshold_dinner: Option<f64>,
    pub spike_threshold_snack: Option<f64>,
    pub dip_threshold_day: Option<f64>,
    pub dip_threshold_night: Option<f64>,

    /// Window after a spike in which a dip is attributed to it
    pub time_after_spike_day: Option<Duration>,
}

impl GlucoseConfig {
    /// Load configuration from a `key value` text file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlucoseError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut config = GlucoseConfig::default();

        for line in reader.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse "key value" or "key value # comment"
            if let Some((key, rest)) = Self::parse_line(line) {
                let value = rest.split('#').next().unwrap_or("").trim();
                config.set(key, value)?;
            }
        }

        Ok(config)
    }

    /// Load a config file, choosing the JSON parser for `.json` paths
    pub fn load_any<P: AsRef<Path>>(path: P) -> Result<Self, GlucoseError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?),
            _ => Self::load(path),
        }
    }

    /// Parse the configuration provider's JSON object
    pub fn from_json_str(json: &str) -> Result<Self, GlucoseError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    /// Assign one field from its textual value. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), GlucoseError> {
        let clock = |v: &str| parse_optional_clock(key, v);
        let number = |v: &str| parse_optional_number(key, v);

        match key {
            "day_start" => self.day_start = clock(value)?,
            "day_end" => self.day_end = clock(value)?,
            "night_start" => self.night_start = clock(value)?,
            "night_end" => self.night_end = clock(value)?,
            "fasting_end_time" => self.fasting_end_time = clock(value)?,
            "breakfast_start" => self.breakfast_start = clock(value)?,
            "breakfast_end" => self.breakfast_end = clock(value)?,
            "lunch_start" => self.lunch_start = clock(value)?,
            "lunch_end" => self.lunch_end = clock(value)?,
            "dinner_start" => self.dinner_start = clock(value)?,
            "dinner_end" => self.dinner_end = clock(value)?,
            "spike_threshold_day" => self.spike_threshold_day = number(value)?,
            "spike_threshold_night" => self.spike_threshold_night = number(value)?,
            "spike_threshold_breakfast" => self.spike_threshold_breakfast = number(value)?,
            "spike_threshold_lunch" => self.spike_threshold_lunch = number(value)?,
            "spike_threshold_dinner" => self.spike_threshold_dinner = number(value)?,
            "spike_threshold_snack" => self.spike_threshold_snack = number(value)?,
            "dip_threshold_day" => self.dip_threshold_day = number(value)?,
            "dip_threshold_night" => self.dip_threshold_night = number(value)?,
            "time_after_spike_day" => {
                self.time_after_spike_day = clock(value)?.map(clock_to_duration)
            }
            _ => log::debug!("Ignoring unknown config key {}", key),
        }
        Ok(())
    }
}

fn is_absent(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("null")
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn parse_optional_clock(key: &str, value: &str) -> Result<Option<NaiveTime>, GlucoseError> {
    if is_absent(value) {
        return Ok(None);
    }
    parse_clock(value)
        .map(Some)
        .ok_or_else(|| GlucoseError::InvalidClockTime {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_optional_number(key: &str, value: &str) -> Result<Option<f64>, GlucoseError> {
    if is_absent(value) {
        return Ok(None);
    }
    value
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| GlucoseError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// "00:30:00" style clock values are durations in the provider's schema
fn clock_to_duration(time: NaiveTime) -> Duration {
    Duration::seconds(i64::from(time.num_seconds_from_midnight()))
}

/// JSON fields go through `set`, so errors carry the field name
impl<'de> Deserialize<'de> for GlucoseConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut config = GlucoseConfig::default();
        for (key, value) in &fields {
            let text = match value {
                Value::Null => String::new(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            config.set(key, &text).map_err(serde::de::Error::custom)?;
        }
        Ok(config)
    }
}

/// Get the application config directory
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glycemic")
}

/// Default config file location
pub fn config_file_path() -> PathBuf {
    get_config_dir().join("config.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_load_text_config() {
        let path = std::env::temp_dir().join(format!("glycemic-config-{}.txt", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "# patient thresholds").unwrap();
            writeln!(file, "breakfast_start 07:00:00").unwrap();
            writeln!(file, "breakfast_end   09:00 # with grace hour").unwrap();
            writeln!(file, "spike_threshold_breakfast 20").unwrap();
            writeln!(file, "dip_threshold_day none").unwrap();
            writeln!(file, "time_after_spike_day 00:30:00").unwrap();
            writeln!(file, "favourite_colour blue").unwrap();
        }

        let config = GlucoseConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.breakfast_start, Some(hm(7, 0)));
        assert_eq!(config.breakfast_end, Some(hm(9, 0)));
        assert_eq!(config.spike_threshold_breakfast, Some(20.0));
        assert_eq!(config.dip_threshold_day, None);
        assert_eq!(config.time_after_spike_day, Some(Duration::minutes(30)));
        assert_eq!(config.lunch_start, None);
    }

    #[test]
    fn test_from_json_with_nulls() {
        let json = r#"{
            "day_start": "06:00:00",
            "day_end": "22:00",
            "spike_threshold_day": 30.5,
            "spike_threshold_night": null,
            "time_after_spike_day": "01:00:00",
            "from_date": "2024-01-01"
        }"#;
        let config = GlucoseConfig::from_json_str(json).unwrap();
        assert_eq!(config.day_start, Some(hm(6, 0)));
        assert_eq!(config.day_end, Some(hm(22, 0)));
        assert_eq!(config.spike_threshold_day, Some(30.5));
        assert_eq!(config.spike_threshold_night, None);
        assert_eq!(config.time_after_spike_day, Some(Duration::hours(1)));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let mut config = GlucoseConfig::default();
        assert!(matches!(
            config.set("lunch_start", "noon"),
            Err(GlucoseError::InvalidClockTime { .. })
        ));
        assert!(matches!(
            config.set("spike_threshold_lunch", "lots"),
            Err(GlucoseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_json_error_names_field() {
        let err = GlucoseConfig::from_json_str(r#"{"day_start": "06:00", "lunch_start": "noon"}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("lunch_start"), "{}", message);
        assert!(message.contains("noon"), "{}", message);

        let err = GlucoseConfig::from_json_str(r#"{"spike_threshold_dinner": "lots"}"#).unwrap_err();
        assert!(err.to_string().contains("spike_threshold_dinner"));
    }
}
