//! Glucose readings as supplied by the reading source
//!
//! Timestamps are kept as wall-clock `NaiveDateTime`: every detector works on
//! the local time of day and the local calendar date, never on instants.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GlucoseError;

/// Lowest physiologically plausible value in mg/dL
pub const MIN_PLAUSIBLE_MGDL: f64 = 30.0;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A single glucose sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: NaiveDateTime,
    /// Glucose in mg/dL
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Build a reading from an ISO-8601 timestamp string
    pub fn parse(timestamp: &str, value: f64) -> Result<Self, GlucoseError> {
        Ok(Self::new(parse_timestamp(timestamp)?, value))
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Wall-clock time formatted as "HH:MM"
    pub fn clock_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Parse an ISO-8601 timestamp, keeping the wall clock of any offset
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, GlucoseError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| GlucoseError::InvalidTimestamp(text.to_string()))
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
    let text = String::deserialize(d)?;
    parse_timestamp(&text).map_err(serde::de::Error::custom)
}

/// Parse a JSON array of `{timestamp, value}` objects
pub fn readings_from_json(json: &str) -> Result<Vec<Reading>, GlucoseError> {
    Ok(serde_json::from_str(json)?)
}

/// Sort readings ascending by timestamp (stable for equal timestamps)
pub fn sort_readings(readings: &mut [Reading]) {
    readings.sort_by_key(|r| r.timestamp);
}

/// Drop readings below the plausibility floor
pub fn retain_plausible(readings: &mut Vec<Reading>) {
    readings.retain(|r| r.value >= MIN_PLAUSIBLE_MGDL);
}

/// Group readings by calendar date, preserving input order inside each day
pub fn group_by_date(readings: &[Reading]) -> BTreeMap<NaiveDate, Vec<Reading>> {
    let mut days: BTreeMap<NaiveDate, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        days.entry(reading.date()).or_default().push(*reading);
    }
    days
}

/// Extract the glucose values of a reading slice
pub fn values(readings: &[Reading]) -> Vec<f64> {
    readings.iter().map(|r| r.value).collect()
}

#[cfg(test)]
pub(crate) fn at(timestamp: &str, value: f64) -> Reading {
    Reading::parse(timestamp, value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-04T07:05:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-04 07:05:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-04T07:05").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-04T07:05:00+05:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-04T07:05:00.250").unwrap().format("%H:%M").to_string(), "07:05");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(GlucoseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_readings_from_json() {
        let json = r#"[
            {"timestamp": "2024-03-04T07:10:00", "value": 90},
            {"timestamp": "2024-03-04T07:00:00", "value": 125.5}
        ]"#;
        let mut readings = readings_from_json(json).unwrap();
        sort_readings(&mut readings);
        assert_eq!(readings[0].value, 125.5);
        assert_eq!(readings[1].clock_label(), "07:10");
    }

    #[test]
    fn test_malformed_json_timestamp_is_an_error() {
        let json = r#"[{"timestamp": "not a time", "value": 90}]"#;
        assert!(matches!(readings_from_json(json), Err(GlucoseError::Json(_))));
    }

    #[test]
    fn test_group_by_date_and_plausibility() {
        let mut readings = vec![
            at("2024-03-04T23:55:00", 110.0),
            at("2024-03-05T00:05:00", 20.0),
            at("2024-03-05T00:10:00", 105.0),
        ];
        retain_plausible(&mut readings);
        let days = group_by_date(&readings);
        assert_eq!(days.len(), 2);
        assert_eq!(days.values().map(Vec::len).collect::<Vec<_>>(), vec![1, 1]);
    }
}
