//! Meal-window spike detection
//!
//! Each reading belongs to one meal period. Breakfast, lunch and dinner
//! windows get a one-hour grace period after their configured end, capped by
//! the next meal's start; everything else is a snack. Every period runs its
//! own hysteresis state machine over the day's readings.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::GlucoseConfig;
use crate::excursion::SpikeEvent;
use crate::reading::{group_by_date, values, Reading};
use crate::rollup::{weekday_name, DailyRecord};
use crate::stats::mean;
use crate::units::MgDl;

/// Grace period after a meal window's configured end
pub const MEAL_GRACE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealPeriod {
    pub const ALL: [MealPeriod; 4] = [
        MealPeriod::Breakfast,
        MealPeriod::Lunch,
        MealPeriod::Dinner,
        MealPeriod::Snack,
    ];

    fn index(self) -> usize {
        match self {
            MealPeriod::Breakfast => 0,
            MealPeriod::Lunch => 1,
            MealPeriod::Dinner => 2,
            MealPeriod::Snack => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MealPeriod::Breakfast => "Breakfast",
            MealPeriod::Lunch => "Lunch",
            MealPeriod::Dinner => "Dinner",
            MealPeriod::Snack => "Snack",
        }
    }

    /// Spike threshold above the day mean, `None` disables the period
    pub fn threshold(self, config: &GlucoseConfig) -> Option<f64> {
        match self {
            MealPeriod::Breakfast => config.spike_threshold_breakfast,
            MealPeriod::Lunch => config.spike_threshold_lunch,
            MealPeriod::Dinner => config.spike_threshold_dinner,
            MealPeriod::Snack => config.spike_threshold_snack,
        }
    }
}

/// Inclusive wall-clock window of a meal, grace period applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MealWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl MealWindow {
    /// Window from configured bounds: `min(end + grace, next_start)`.
    /// A grace period running past midnight is clamped to the end of day.
    pub fn with_grace(start: NaiveTime, end: NaiveTime, next_start: Option<NaiveTime>) -> Self {
        let (extended, wrapped) = end.overflowing_add_signed(Duration::minutes(MEAL_GRACE_MINUTES));
        let mut effective = if wrapped != 0 { last_instant() } else { extended };
        if let Some(next) = next_start {
            effective = effective.min(next);
        }
        Self { start, end: effective }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

fn last_instant() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// Breakfast, lunch and dinner windows for a patient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MealWindows {
    pub breakfast: Option<MealWindow>,
    pub lunch: Option<MealWindow>,
    pub dinner: Option<MealWindow>,
}

impl MealWindows {
    pub fn from_config(config: &GlucoseConfig) -> Self {
        let window = |start: Option<NaiveTime>, end: Option<NaiveTime>, next: Option<NaiveTime>| {
            Some(MealWindow::with_grace(start?, end?, next))
        };
        Self {
            breakfast: window(config.breakfast_start, config.breakfast_end, config.lunch_start),
            lunch: window(config.lunch_start, config.lunch_end, config.dinner_start),
            dinner: window(config.dinner_start, config.dinner_end, None),
        }
    }

    /// Meal period of a wall-clock time; earlier meals win on overlap
    pub fn period_of(&self, time: NaiveTime) -> MealPeriod {
        let candidates = [
            (self.breakfast, MealPeriod::Breakfast),
            (self.lunch, MealPeriod::Lunch),
            (self.dinner, MealPeriod::Dinner),
        ];
        candidates
            .iter()
            .find(|(window, _)| window.is_some_and(|w| w.contains(time)))
            .map(|&(_, period)| period)
            .unwrap_or(MealPeriod::Snack)
    }
}

/// Spike events of one day, per meal period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealSpikes {
    pub breakfast: Vec<SpikeEvent>,
    pub lunch: Vec<SpikeEvent>,
    pub dinner: Vec<SpikeEvent>,
    pub snack: Vec<SpikeEvent>,
}

impl MealSpikes {
    pub fn events(&self, period: MealPeriod) -> &[SpikeEvent] {
        match period {
            MealPeriod::Breakfast => &self.breakfast,
            MealPeriod::Lunch => &self.lunch,
            MealPeriod::Dinner => &self.dinner,
            MealPeriod::Snack => &self.snack,
        }
    }

    fn events_mut(&mut self, period: MealPeriod) -> &mut Vec<SpikeEvent> {
        match period {
            MealPeriod::Breakfast => &mut self.breakfast,
            MealPeriod::Lunch => &mut self.lunch,
            MealPeriod::Dinner => &mut self.dinner,
            MealPeriod::Snack => &mut self.snack,
        }
    }

    pub fn total(&self) -> usize {
        MealPeriod::ALL.iter().map(|&p| self.events(p).len()).sum()
    }

    /// All events in period order
    pub fn all(&self) -> Vec<SpikeEvent> {
        MealPeriod::ALL
            .iter()
            .flat_map(|&p| self.events(p).iter().cloned())
            .collect()
    }
}

fn meal_spike_event(period: MealPeriod, peak: &Reading, day_mean: f64) -> SpikeEvent {
    let time = peak.clock_label();
    let delta = peak.value - day_mean;
    SpikeEvent {
        description: format!(
            "{} spike to {} ({} above mean) at {}",
            period.label(),
            MgDl(peak.value).format(),
            MgDl(delta).format(),
            time
        ),
        time,
        value: peak.value,
        delta_from_mean: delta,
        meal_period: Some(period),
    }
}

/// Detect meal spikes in one day's time-sorted readings against the day mean.
///
/// A run starts when a reading of a period exceeds `day_mean + threshold`,
/// tracks its maximum, and ends with one event when a reading of the same
/// period falls back to or below the line. Runs still open at the end of the
/// day are flushed.
pub fn detect_meal_spikes(day: &[Reading], day_mean: f64, config: &GlucoseConfig) -> MealSpikes {
    let windows = MealWindows::from_config(config);
    let thresholds = MealPeriod::ALL.map(|p| p.threshold(config));
    let mut active: [Option<Reading>; 4] = [None; 4];
    let mut spikes = MealSpikes::default();

    for reading in day {
        let period = windows.period_of(reading.timestamp.time());
        let Some(threshold) = thresholds[period.index()] else {
            continue;
        };
        let slot = &mut active[period.index()];

        if reading.value > day_mean + threshold {
            if slot.map_or(true, |peak| reading.value > peak.value) {
                *slot = Some(*reading);
            }
        } else if let Some(peak) = slot.take() {
            spikes.events_mut(period).push(meal_spike_event(period, &peak, day_mean));
        }
    }

    for period in MealPeriod::ALL {
        if let Some(peak) = active[period.index()].take() {
            spikes.events_mut(period).push(meal_spike_event(period, &peak, day_mean));
        }
    }

    spikes
}

/// Meal spikes of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSpikeDay {
    pub date: NaiveDate,
    pub mean_glucose: f64,
    pub spikes: MealSpikes,
}

impl DailyRecord for MealSpikeDay {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Run the meal spike detector for every day in the input
pub fn compute_meal_spike_days(readings: &[Reading], config: &GlucoseConfig) -> Vec<MealSpikeDay> {
    for period in MealPeriod::ALL {
        if period.threshold(config).is_none() {
            log::debug!("{} spike detection disabled: no threshold configured", period.label());
        }
    }

    group_by_date(readings)
        .into_iter()
        .map(|(date, mut day)| {
            day.sort_by_key(|r| r.timestamp);
            let mean_glucose = mean(&values(&day));
            let spikes = detect_meal_spikes(&day, mean_glucose, config);
            MealSpikeDay { date, mean_glucose, spikes }
        })
        .collect()
}

/// Weekly totals per meal period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealSpikeSummary {
    pub breakfast_spikes: usize,
    pub lunch_spikes: usize,
    pub dinner_spikes: usize,
    pub snack_spikes: usize,
    /// Spikes of all periods per day with data, rounded ties to even
    pub weekly_average_spikes: u32,
}

pub fn summarize_meal_week(days: &[&MealSpikeDay]) -> MealSpikeSummary {
    let sum = |period: MealPeriod| days.iter().map(|d| d.spikes.events(period).len()).sum::<usize>();
    let total: usize = days.iter().map(|d| d.spikes.total()).sum();
    let average = if days.is_empty() {
        0.0
    } else {
        total as f64 / days.len() as f64
    };

    MealSpikeSummary {
        breakfast_spikes: sum(MealPeriod::Breakfast),
        lunch_spikes: sum(MealPeriod::Lunch),
        dinner_spikes: sum(MealPeriod::Dinner),
        snack_spikes: sum(MealPeriod::Snack),
        weekly_average_spikes: average.round_ties_even() as u32,
    }
}

/// Display row for one day of meal spikes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSpikeRow {
    pub date: NaiveDate,
    pub day: String,
    pub breakfast_spikes: usize,
    pub lunch_spikes: usize,
    pub dinner_spikes: usize,
    pub snack_spikes: usize,
    pub individual_data: Vec<SpikeEvent>,
}

impl From<&MealSpikeDay> for MealSpikeRow {
    fn from(day: &MealSpikeDay) -> Self {
        Self {
            date: day.date,
            day: weekday_name(day.date),
            breakfast_spikes: day.spikes.breakfast.len(),
            lunch_spikes: day.spikes.lunch.len(),
            dinner_spikes: day.spikes.dinner.len(),
            snack_spikes: day.spikes.snack.len(),
            individual_data: day.spikes.all(),
        }
    }
}
