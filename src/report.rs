//! Output documents handed to the dashboard
//!
//! Weekly trend documents share one shape: chart metadata plus one entry
//! per ISO week with a summary and the week's daily rows. Anything that
//! cannot produce a document (no readings, feature not configured, focus
//! week without data) yields `{"error": "<reason>"}` instead.

use chrono::NaiveDate;
use serde::Serialize;

use crate::agp::{compute_agp, compute_summary, AgpProfile, SummaryMetrics};
use crate::config::GlucoseConfig;
use crate::daily::{compute_daily_metrics, DailyMetricsRow};
use crate::excursion::{
    compute_excursion_days, summarize_excursion_week, ExcursionProfile, ExcursionRow, ExcursionSummary,
};
use crate::fasting::{compute_fasting_days, summarize_fasting_week, FastingRow, FastingSummary};
use crate::meal::{compute_meal_spike_days, summarize_meal_week, MealSpikeRow, MealSpikeSummary};
use crate::reading::Reading;
use crate::rollup::{weekly_reports, DailyRecord, WeekReport};
use crate::tir::{compute_tir, TirChart};
use crate::trends::{
    compute_auc_days, compute_mean_days, compute_range_days, summarize_auc_week, summarize_mean_week,
    summarize_range_week, AucRow, AucSummary, MeanRow, MeanSummary, RangeRow, RangeSummary,
};
use crate::units::Thresholds;

/// Weeks the dashboard shows at once
pub const DISPLAY_WEEKS: u32 = 4;

const NO_DATA: &str = "No glucose data found";

/// A document or the reason it could not be produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document<T> {
    Report(T),
    Error { error: String },
}

impl<T> Document<T> {
    pub fn error(reason: impl Into<String>) -> Self {
        Document::Error { error: reason.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Document::Error { .. })
    }
}

/// One charted quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricInfo {
    pub key: &'static str,
    pub description: &'static str,
    pub axis_label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphTitles {
    pub weekly_summary: &'static str,
    pub daily_details: &'static str,
}

/// Chart description for a trend document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub metrics: Vec<MetricInfo>,
    pub x_axis_default: &'static str,
    pub y_axis: &'static str,
    pub graph_titles: GraphTitles,
    pub page_title: &'static str,
    pub description: &'static str,
    pub display_weeks: u32,
}

impl Metadata {
    fn new(
        page_title: &'static str,
        description: &'static str,
        y_axis: &'static str,
        graph_titles: GraphTitles,
        metrics: &[(&'static str, &'static str, &'static str)],
    ) -> Self {
        Self {
            metrics: metrics
                .iter()
                .map(|&(key, description, axis_label)| MetricInfo {
                    key,
                    description,
                    axis_label,
                })
                .collect(),
            x_axis_default: "date",
            y_axis,
            graph_titles,
            page_title,
            description,
            display_weeks: DISPLAY_WEEKS,
        }
    }
}

/// Weekly trend document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDocument<S, D> {
    pub metadata: Metadata,
    pub data: Vec<WeekReport<S, D>>,
}

fn trend_document<T, S, D>(
    days: &[T],
    focus: Option<NaiveDate>,
    metadata: Metadata,
    summarize: impl Fn(&[&T]) -> S,
    day_row: impl Fn(&T) -> D,
) -> Document<TrendDocument<S, D>>
where
    T: DailyRecord,
{
    if days.is_empty() {
        return Document::error(NO_DATA);
    }

    let data = weekly_reports(days, focus, summarize, day_row);
    if data.is_empty() {
        if let Some(date) = focus {
            return Document::error(format!("No glucose data for the week containing {}", date));
        }
        return Document::error(NO_DATA);
    }

    log::info!("{}: {} week(s) from {} day(s)", metadata.page_title, data.len(), days.len());
    Document::Report(TrendDocument { metadata, data })
}

/// Full AGP report: period summary, TIR, profile and daily rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgpReport {
    pub monitoring_period: String,
    pub summary: SummaryMetrics,
    pub tir: TirChart,
    pub agp: AgpProfile,
    pub daily_metrics: Vec<DailyMetricsRow>,
}

pub fn build_agp_report(readings: &[Reading]) -> Document<AgpReport> {
    let Some(summary) = compute_summary(readings) else {
        return Document::error(NO_DATA);
    };
    let daily_metrics = build_daily_rows(readings);

    log::info!(
        "AGP report over {} readings, {} day(s)",
        readings.len(),
        daily_metrics.len()
    );
    Document::Report(AgpReport {
        monitoring_period: summary.monitoring_period(),
        tir: compute_tir(readings),
        agp: compute_agp(readings),
        summary,
        daily_metrics,
    })
}

/// Formatted daily metrics rows, in date order
pub fn build_daily_rows(readings: &[Reading]) -> Vec<DailyMetricsRow> {
    compute_daily_metrics(readings).iter().map(|d| d.to_row()).collect()
}

pub fn build_tir_chart(readings: &[Reading]) -> TirChart {
    compute_tir(readings)
}

pub fn build_meal_spike_document(
    readings: &[Reading],
    config: &GlucoseConfig,
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<MealSpikeSummary, MealSpikeRow>> {
    let metadata = Metadata::new(
        "Meal Spike Monitoring Dashboard",
        "Overview of glucose spikes above the configured meal thresholds, with weekly, daily and individual spike details.",
        "Count",
        GraphTitles {
            weekly_summary: "Weekly Overview of Glucose Spikes",
            daily_details: "Daily Glucose Spike Details",
        },
        &[
            ("breakfast_spikes", "Number of Breakfast Spikes", "Spikes per Week"),
            ("lunch_spikes", "Number of Lunch Spikes", "Spikes per Week"),
            ("dinner_spikes", "Number of Dinner Spikes", "Spikes per Week"),
            ("snack_spikes", "Number of Snack Spikes", "Spikes per Week"),
            ("weekly_average_spikes", "Average Spikes per Day", "Spikes per Day"),
        ],
    );
    let days = compute_meal_spike_days(readings, config);
    trend_document(&days, focus, metadata, summarize_meal_week, |d| MealSpikeRow::from(d))
}

/// Day and night spike and dip documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExcursionKind {
    /// Dips following a spike during the day
    DayDips,
    /// Dips following a spike at night
    NightDips,
    /// Spike runs during the day
    DaySpikes,
    /// Spike runs at night
    NightSpikes,
    /// Dip runs at night
    NightDipRuns,
}

impl ExcursionKind {
    pub fn profile(self, config: &GlucoseConfig) -> Option<ExcursionProfile> {
        match self {
            ExcursionKind::DayDips => ExcursionProfile::day_dips(config),
            ExcursionKind::NightDips => ExcursionProfile::night_dips(config),
            ExcursionKind::DaySpikes => ExcursionProfile::day_spikes(config),
            ExcursionKind::NightSpikes => ExcursionProfile::night_spikes(config),
            ExcursionKind::NightDipRuns => ExcursionProfile::night_dip_runs(config),
        }
    }

    fn metadata(self) -> Metadata {
        let (page_title, description, weekly, daily, total, average) = match self {
            ExcursionKind::DayDips => (
                "Glucose Dip Monitoring Dashboard (Day)",
                "Overview of daytime glucose dips that follow a spike within the configured window.",
                "Weekly Overview of Glucose Dips",
                "Daily Glucose Dip Details",
                ("total", "Number of Glucose Dips", "Dips per Week"),
                ("daily_average", "Average Glucose Dips per Day", "Avg Dips per Day"),
            ),
            ExcursionKind::NightDips => (
                "Night Glucose Dip Monitoring Dashboard",
                "Overview of night-time glucose dips that follow a spike within the configured window.",
                "Weekly Night Dip Overview",
                "Daily Night Dip Details",
                ("total", "Number of Glucose Dips at Night", "Night Dips per Week"),
                ("daily_average", "Average Night Dips per Day", "Avg Night Dips per Day"),
            ),
            ExcursionKind::DaySpikes => (
                "Glucose Spike Monitoring Dashboard (Day)",
                "Overview of daytime glucose spikes above the configured threshold.",
                "Weekly Spike Overview",
                "Daily Spike Details",
                ("total", "Number of Glucose Spikes", "Spikes per Week"),
                ("daily_average", "Average Glucose Spikes per Day", "Avg Spikes per Day"),
            ),
            ExcursionKind::NightSpikes => (
                "Night Glucose Spike Monitoring Dashboard",
                "Overview of night-time glucose spikes above the configured threshold.",
                "Weekly Night Spike Overview",
                "Daily Night Spike Details",
                ("total", "Number of Glucose Spikes at Night", "Night Spikes per Week"),
                ("daily_average", "Average Night Spikes per Day", "Avg Night Spikes per Day"),
            ),
            ExcursionKind::NightDipRuns => (
                "Night Low Glucose Monitoring Dashboard",
                "Overview of night-time stretches below the configured dip threshold.",
                "Weekly Night Low Overview",
                "Daily Night Low Details",
                ("total", "Number of Night Lows", "Night Lows per Week"),
                ("daily_average", "Average Night Lows per Day", "Avg Night Lows per Day"),
            ),
        };
        Metadata::new(
            page_title,
            description,
            "Count",
            GraphTitles {
                weekly_summary: weekly,
                daily_details: daily,
            },
            &[total, average],
        )
    }
}

pub fn build_excursion_document(
    readings: &[Reading],
    kind: ExcursionKind,
    config: &GlucoseConfig,
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<ExcursionSummary, ExcursionRow>> {
    let Some(profile) = kind.profile(config) else {
        return Document::error(format!("{:?} detection is not configured", kind));
    };
    let days = compute_excursion_days(readings, &profile);
    trend_document(&days, focus, kind.metadata(), summarize_excursion_week, |d| ExcursionRow::from(d))
}

pub fn build_range_document(
    readings: &[Reading],
    thresholds: &Thresholds,
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<RangeSummary, RangeRow>> {
    let metadata = Metadata::new(
        "TIR view",
        "Weekly and daily time in, above and below range with mean glucose.",
        "Value",
        GraphTitles {
            weekly_summary: "Weekly Glucose Overview",
            daily_details: "Daily Glucose Details",
        },
        &[
            ("time_in_range", "Time in Range", "% Time in Range"),
            ("time_above_range", "Time Above Range", "% Time Above Range"),
            ("time_below_range", "Time Below Range", "% Time Below Range"),
            ("mean_glucose", "Average Glucose", "Mean Glucose (mg/dL)"),
        ],
    );
    let days = compute_range_days(readings, thresholds);
    trend_document(&days, focus, metadata, summarize_range_week, |d| RangeRow::from(d))
}

pub fn build_mean_document(
    readings: &[Reading],
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<MeanSummary, MeanRow>> {
    let metadata = Metadata::new(
        "Glucose Variability Dashboard",
        "Weekly and daily mean glucose and glycemic variability.",
        "Value",
        GraphTitles {
            weekly_summary: "Weekly Glucose Overview",
            daily_details: "Daily Glucose Details",
        },
        &[
            ("mean_glucose", "Average Daily Glucose", "Mean Glucose (mg/dL)"),
            ("glycemic_variability", "Daily Glycemic Variability", "Standard Deviation (mg/dL)"),
        ],
    );
    let days = compute_mean_days(readings);
    trend_document(&days, focus, metadata, summarize_mean_week, |d| MeanRow::from(d))
}

pub fn build_nauc_document(
    readings: &[Reading],
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<AucSummary, AucRow>> {
    let metadata = Metadata::new(
        "nAUC View",
        "Weekly and daily area under the glucose curve, normalised by mean glucose.",
        "Value",
        GraphTitles {
            weekly_summary: "Weekly Overview",
            daily_details: "Detailed Daily",
        },
        &[
            ("nauc", "Normalized AUC", "nAUC"),
            ("mean_glucose", "Average Glucose", "Mean Glucose (mg/dL)"),
            ("auc", "Area Under the Curve", "AUC"),
        ],
    );
    let days = compute_auc_days(readings);
    trend_document(&days, focus, metadata, summarize_auc_week, |d| AucRow::from(d))
}

pub fn build_fasting_document(
    readings: &[Reading],
    config: &GlucoseConfig,
    focus: Option<NaiveDate>,
) -> Document<TrendDocument<FastingSummary, FastingRow>> {
    if config.fasting_end_time.is_none() {
        return Document::error("Fasting end time is not configured");
    }
    let metadata = Metadata::new(
        "FBG Dashboard",
        "Weekly and daily fasting blood glucose.",
        "Value",
        GraphTitles {
            weekly_summary: "Weekly FBG Overview",
            daily_details: "Daily FBG Details",
        },
        &[("fbg", "Fasting Blood Glucose", "FBG (mg/dL)")],
    );
    let days = compute_fasting_days(readings, config);
    trend_document(&days, focus, metadata, summarize_fasting_week, |d| FastingRow::from(d))
}
