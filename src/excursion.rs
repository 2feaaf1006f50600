//! Spike and dip detection inside day and night time windows
//!
//! Two detectors share the same windows:
//! - the post-spike dip detector, which reports a dip only when it follows a
//!   spike within a bounded delay, and
//! - the window excursion detector, which reports the extreme of every run
//!   of consecutive readings beyond a threshold.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::GlucoseConfig;
use crate::meal::MealPeriod;
use crate::reading::{group_by_date, values, Reading};
use crate::rollup::{weekday_name, DailyRecord};
use crate::stats::mean;
use crate::units::MgDl;

/// A detected spike or dip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionEvent {
    /// Wall-clock time of the reading, "HH:MM"
    pub time: String,
    pub value: f64,
    /// `value - mean`; negative for dips
    pub delta_from_mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_period: Option<MealPeriod>,
    pub description: String,
}

pub type SpikeEvent = ExcursionEvent;
pub type DipEvent = ExcursionEvent;

impl ExcursionEvent {
    fn spike(reading: &Reading, mean: f64) -> Self {
        let time = reading.clock_label();
        let delta = reading.value - mean;
        Self {
            description: format!(
                "Spike to {} ({} above mean) at {}",
                MgDl(reading.value).format(),
                MgDl(delta).format(),
                time
            ),
            time,
            value: reading.value,
            delta_from_mean: delta,
            meal_period: None,
        }
    }

    fn dip(reading: &Reading, mean: f64) -> Self {
        let time = reading.clock_label();
        let delta = reading.value - mean;
        Self {
            description: format!(
                "Dip to {} ({} below mean) at {}",
                MgDl(reading.value).format(),
                MgDl(-delta).format(),
                time
            ),
            time,
            value: reading.value,
            delta_from_mean: delta,
            meal_period: None,
        }
    }
}

/// A wall-clock segment of the day. The start is inclusive; the end is
/// inclusive or exclusive depending on how the window was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub end_inclusive: bool,
}

impl TimeWindow {
    /// `[start, end]`
    pub fn inclusive(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end, end_inclusive: true }
    }

    /// `[00:00, end)`
    pub fn from_midnight(end: NaiveTime) -> Self {
        Self {
            start: NaiveTime::MIN,
            end,
            end_inclusive: false,
        }
    }

    /// `[start, 24:00)`
    pub fn until_midnight(start: NaiveTime) -> Self {
        let end = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        Self::inclusive(start, end)
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if time < self.start {
            return false;
        }
        if self.end_inclusive {
            time <= self.end
        } else {
            time < self.end
        }
    }

    /// Readings of a sorted day that fall in the window, in order
    pub fn select(&self, day: &[Reading]) -> Vec<Reading> {
        day.iter()
            .filter(|r| self.contains(r.timestamp.time()))
            .copied()
            .collect()
    }
}

/// Day window `[day_start, day_end]`
pub fn day_window(config: &GlucoseConfig) -> Option<Vec<TimeWindow>> {
    Some(vec![TimeWindow::inclusive(config.day_start?, config.day_end?)])
}

/// Night segments: morning `[00:00, day_start)` and evening
/// `[night_start, 24:00)`, each analysed on its own
pub fn night_windows(config: &GlucoseConfig) -> Option<Vec<TimeWindow>> {
    Some(vec![
        TimeWindow::from_midnight(config.day_start?),
        TimeWindow::until_midnight(config.night_start?),
    ])
}

/// Detect dips that follow a spike within `window`.
///
/// A reading above `mean + spike_threshold` (re)arms the detector at its
/// time. While armed, the first reading below `mean - dip_threshold` no
/// later than `window` after the spike is reported and disarms it.
pub fn detect_post_spike_dips(
    readings: &[Reading],
    mean: f64,
    spike_threshold: f64,
    dip_threshold: f64,
    window: Duration,
) -> Vec<DipEvent> {
    let mut dips = Vec::new();
    let mut spike_time = None;

    for reading in readings {
        if reading.value > mean + spike_threshold {
            spike_time = Some(reading.timestamp);
        }

        if let Some(armed_at) = spike_time {
            if reading.timestamp - armed_at <= window && reading.value < mean - dip_threshold {
                dips.push(ExcursionEvent::dip(reading, mean));
                spike_time = None;
            }
        }
    }

    dips
}

/// Side of the mean an excursion run lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Above,
    Below,
}

/// Report one event per run of consecutive readings beyond
/// `mean ± threshold`, at the run's extreme. A run still open after the last
/// reading is reported too.
pub fn detect_window_excursions(
    readings: &[Reading],
    mean: f64,
    threshold: f64,
    direction: Direction,
) -> Vec<ExcursionEvent> {
    let beyond = |value: f64| match direction {
        Direction::Above => value > mean + threshold,
        Direction::Below => value < mean - threshold,
    };
    let more_extreme = |candidate: &Reading, current: &Reading| match direction {
        Direction::Above => candidate.value > current.value,
        Direction::Below => candidate.value < current.value,
    };
    let event = |reading: &Reading| match direction {
        Direction::Above => ExcursionEvent::spike(reading, mean),
        Direction::Below => ExcursionEvent::dip(reading, mean),
    };

    let mut events = Vec::new();
    let mut extreme: Option<Reading> = None;

    for reading in readings {
        if beyond(reading.value) {
            if extreme.map_or(true, |current| more_extreme(reading, &current)) {
                extreme = Some(*reading);
            }
        } else if let Some(peak) = extreme.take() {
            events.push(event(&peak));
        }
    }
    if let Some(peak) = extreme {
        events.push(event(&peak));
    }

    events
}

/// Which detector a profile runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detector {
    /// Dips following a spike within the given delay
    PostSpikeDip {
        spike_threshold: f64,
        dip_threshold: f64,
        window: Duration,
    },
    /// Runs beyond `mean ± threshold`
    Runs { threshold: f64, direction: Direction },
}

/// A detector bound to its time segments
#[derive(Debug, Clone, PartialEq)]
pub struct ExcursionProfile {
    pub segments: Vec<TimeWindow>,
    pub detector: Detector,
}

impl ExcursionProfile {
    /// Post-spike dips in the day window
    pub fn day_dips(config: &GlucoseConfig) -> Option<Self> {
        let profile = (|| {
            Some(Self {
                segments: day_window(config)?,
                detector: Detector::PostSpikeDip {
                    spike_threshold: config.spike_threshold_day?,
                    dip_threshold: config.dip_threshold_day?,
                    window: config.time_after_spike_day?,
                },
            })
        })();
        disabled_unless(profile, "day post-spike dips")
    }

    /// Post-spike dips in the night segments
    pub fn night_dips(config: &GlucoseConfig) -> Option<Self> {
        let profile = (|| {
            Some(Self {
                segments: night_windows(config)?,
                detector: Detector::PostSpikeDip {
                    spike_threshold: config.spike_threshold_night?,
                    dip_threshold: config.dip_threshold_night?,
                    window: config.time_after_spike_day?,
                },
            })
        })();
        disabled_unless(profile, "night post-spike dips")
    }

    /// Spike runs in the day window
    pub fn day_spikes(config: &GlucoseConfig) -> Option<Self> {
        let profile = (|| {
            Some(Self {
                segments: day_window(config)?,
                detector: Detector::Runs {
                    threshold: config.spike_threshold_day?,
                    direction: Direction::Above,
                },
            })
        })();
        disabled_unless(profile, "day spikes")
    }

    /// Spike runs in the night segments
    pub fn night_spikes(config: &GlucoseConfig) -> Option<Self> {
        let profile = (|| {
            Some(Self {
                segments: night_windows(config)?,
                detector: Detector::Runs {
                    threshold: config.spike_threshold_night?,
                    direction: Direction::Above,
                },
            })
        })();
        disabled_unless(profile, "night spikes")
    }

    /// Dip runs in the night segments
    pub fn night_dip_runs(config: &GlucoseConfig) -> Option<Self> {
        let profile = (|| {
            Some(Self {
                segments: night_windows(config)?,
                detector: Detector::Runs {
                    threshold: config.dip_threshold_night?,
                    direction: Direction::Below,
                },
            })
        })();
        disabled_unless(profile, "night dip runs")
    }

    /// Run the detector on one segment's readings against their own mean
    pub fn detect(&self, segment: &[Reading]) -> Vec<ExcursionEvent> {
        let segment_mean = mean(&values(segment));
        match self.detector {
            Detector::PostSpikeDip {
                spike_threshold,
                dip_threshold,
                window,
            } => detect_post_spike_dips(segment, segment_mean, spike_threshold, dip_threshold, window),
            Detector::Runs { threshold, direction } => {
                detect_window_excursions(segment, segment_mean, threshold, direction)
            }
        }
    }
}

fn disabled_unless(profile: Option<ExcursionProfile>, name: &str) -> Option<ExcursionProfile> {
    if profile.is_none() {
        log::debug!("{} disabled: window or threshold not configured", name);
    }
    profile
}

/// Events of one calendar day across all segments of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionDay {
    pub date: NaiveDate,
    pub events: Vec<ExcursionEvent>,
}

impl DailyRecord for ExcursionDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Run a profile over every day that has readings inside its segments
pub fn compute_excursion_days(readings: &[Reading], profile: &ExcursionProfile) -> Vec<ExcursionDay> {
    group_by_date(readings)
        .into_iter()
        .filter_map(|(date, mut day)| {
            day.sort_by_key(|r| r.timestamp);
            let mut seen = false;
            let mut events = Vec::new();
            for window in &profile.segments {
                let segment = window.select(&day);
                if segment.is_empty() {
                    continue;
                }
                seen = true;
                events.extend(profile.detect(&segment));
            }
            seen.then_some(ExcursionDay { date, events })
        })
        .collect()
}

/// Weekly totals of a profile's events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcursionSummary {
    pub total: usize,
    /// Events per day with data, rounded ties to even
    pub daily_average: u32,
}

pub fn summarize_excursion_week(days: &[&ExcursionDay]) -> ExcursionSummary {
    let total: usize = days.iter().map(|d| d.events.len()).sum();
    let average = if days.is_empty() {
        0.0
    } else {
        total as f64 / days.len() as f64
    };
    ExcursionSummary {
        total,
        daily_average: average.round_ties_even() as u32,
    }
}

/// Display row for one day of events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionRow {
    pub date: NaiveDate,
    pub day: String,
    pub count: usize,
    pub individual_data: Vec<ExcursionEvent>,
}

impl From<&ExcursionDay> for ExcursionRow {
    fn from(day: &ExcursionDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            count: day.events.len(),
            individual_data: day.events.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::at;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_dip_inside_window() {
        let readings = vec![at("2024-03-04T08:00:00", 125.0), at("2024-03-04T08:10:00", 80.0)];
        let dips = detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30));
        assert_eq!(dips.len(), 1);
        assert_eq!(dips[0].time, "08:10");
        assert_eq!(dips[0].value, 80.0);
        assert_eq!(dips[0].delta_from_mean, -20.0);
        assert_eq!(dips[0].description, "Dip to 80 mg/dL (20 mg/dL below mean) at 08:10");
    }

    #[test]
    fn test_dip_after_window_is_ignored() {
        let readings = vec![at("2024-03-04T08:00:00", 125.0), at("2024-03-04T08:40:00", 80.0)];
        let dips = detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30));
        assert!(dips.is_empty());
    }

    #[test]
    fn test_later_spike_rearms_detector() {
        let readings = vec![
            at("2024-03-04T08:00:00", 125.0),
            at("2024-03-04T08:25:00", 130.0),
            at("2024-03-04T08:50:00", 80.0),
            at("2024-03-04T08:55:00", 70.0),
        ];
        let dips = detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30));
        assert_eq!(dips.len(), 1);
        assert_eq!(dips[0].time, "08:50");
    }

    #[test]
    fn test_dip_without_spike_is_ignored() {
        let readings = vec![at("2024-03-04T08:00:00", 110.0), at("2024-03-04T08:10:00", 60.0)];
        assert!(detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30)).is_empty());
    }

    #[test]
    fn test_runs_report_extremes() {
        let readings = vec![
            at("2024-03-04T10:00:00", 140.0),
            at("2024-03-04T10:05:00", 160.0),
            at("2024-03-04T10:10:00", 100.0),
            at("2024-03-04T10:15:00", 150.0),
        ];
        let spikes = detect_window_excursions(&readings, 100.0, 30.0, Direction::Above);
        assert_eq!(spikes.len(), 2);
        assert_eq!(spikes[0].value, 160.0);
        assert_eq!(spikes[0].time, "10:05");
        assert_eq!(spikes[1].time, "10:15");

        let dips = detect_window_excursions(&readings, 140.0, 20.0, Direction::Below);
        assert_eq!(dips.len(), 1);
        assert_eq!(dips[0].value, 100.0);
    }

    #[test]
    fn test_night_segments_bounds() {
        let config = GlucoseConfig {
            day_start: Some(hm(6, 0)),
            night_start: Some(hm(22, 0)),
            ..GlucoseConfig::default()
        };
        let segments = night_windows(&config).unwrap();
        assert!(segments[0].contains(hm(0, 0)));
        assert!(segments[0].contains(hm(5, 59)));
        assert!(!segments[0].contains(hm(6, 0)));
        assert!(segments[1].contains(hm(22, 0)));
        assert!(segments[1].contains(hm(23, 59)));
        assert!(!segments[1].contains(hm(21, 59)));
    }

    #[test]
    fn test_missing_config_disables_profile() {
        let config = GlucoseConfig {
            day_start: Some(hm(6, 0)),
            day_end: Some(hm(22, 0)),
            spike_threshold_day: Some(20.0),
            ..GlucoseConfig::default()
        };
        assert!(ExcursionProfile::day_dips(&config).is_none());
        assert!(ExcursionProfile::day_spikes(&config).is_some());
        assert!(ExcursionProfile::night_spikes(&config).is_none());
    }

    #[test]
    fn test_night_segments_use_own_mean() {
        let config = GlucoseConfig {
            day_start: Some(hm(6, 0)),
            night_start: Some(hm(22, 0)),
            spike_threshold_night: Some(20.0),
            ..GlucoseConfig::default()
        };
        let profile = ExcursionProfile::night_spikes(&config).unwrap();
        let readings = vec![
            // morning mean 100: one spike
            at("2024-03-04T02:00:00", 80.0),
            at("2024-03-04T02:05:00", 130.0),
            at("2024-03-04T02:10:00", 90.0),
            // day readings are outside both segments
            at("2024-03-04T12:00:00", 300.0),
            // evening mean 200: no spike
            at("2024-03-04T22:30:00", 200.0),
            at("2024-03-04T22:35:00", 200.0),
        ];
        let days = compute_excursion_days(&readings, &profile);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].events.len(), 1);
        assert_eq!(days[0].events[0].time, "02:05");
    }

    #[test]
    fn test_days_without_window_readings_are_skipped() {
        let config = GlucoseConfig {
            day_start: Some(hm(6, 0)),
            day_end: Some(hm(22, 0)),
            spike_threshold_day: Some(20.0),
            ..GlucoseConfig::default()
        };
        let profile = ExcursionProfile::day_spikes(&config).unwrap();
        let readings = vec![at("2024-03-04T03:00:00", 100.0), at("2024-03-05T10:00:00", 100.0)];
        let days = compute_excursion_days(&readings, &profile);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        let refs: Vec<&ExcursionDay> = days.iter().collect();
        let summary = summarize_excursion_week(&refs);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.daily_average, 0);
        assert_eq!(ExcursionRow::from(&days[0]).day, "Tuesday");
    }

    #[test]
    fn test_weekly_average_ties_round_to_even() {
        let event = ExcursionEvent {
            time: "10:00".to_string(),
            value: 150.0,
            delta_from_mean: 30.0,
            meal_period: None,
            description: "Spike".to_string(),
        };
        let monday = ExcursionDay {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            events: vec![event.clone()],
        };
        let tuesday = ExcursionDay {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            events: vec![],
        };
        // 1 event over 2 days
        assert_eq!(summarize_excursion_week(&[&monday, &tuesday]).daily_average, 0);

        let busy = ExcursionDay {
            date: monday.date,
            events: vec![event.clone(), event.clone(), event],
        };
        // 3 events over 2 days
        assert_eq!(summarize_excursion_week(&[&busy, &tuesday]).daily_average, 2);
    }

    #[test]
    fn test_detectors_are_idempotent() {
        let readings = vec![
            at("2024-03-04T08:00:00", 125.0),
            at("2024-03-04T08:10:00", 80.0),
            at("2024-03-04T08:20:00", 140.0),
        ];
        let first = detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30));
        let second = detect_post_spike_dips(&readings, 100.0, 20.0, 15.0, Duration::minutes(30));
        assert_eq!(first, second);
        assert_eq!(
            detect_window_excursions(&readings, 100.0, 20.0, Direction::Above),
            detect_window_excursions(&readings, 100.0, 20.0, Direction::Above)
        );
    }
}
