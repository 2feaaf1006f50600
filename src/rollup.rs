//! ISO-week rollup of per-day outputs

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// Anything produced once per calendar day
pub trait DailyRecord {
    fn date(&self) -> NaiveDate;
}

/// An ISO-8601 calendar week (Monday start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    /// The ISO week containing a date
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of the week
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Sunday of the week
    pub fn end(&self) -> NaiveDate {
        self.start() + Duration::days(6)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        IsoWeek::of(date) == *self
    }
}

/// Days belonging to one ISO week, in date order
#[derive(Debug)]
pub struct WeekGroup<'a, T> {
    pub week: IsoWeek,
    pub days: Vec<&'a T>,
}

/// Group daily records by ISO week. With a focus date only the week
/// containing it is kept (possibly none).
pub fn group_by_week<T: DailyRecord>(days: &[T], focus: Option<NaiveDate>) -> Vec<WeekGroup<'_, T>> {
    let focus_week = focus.map(IsoWeek::of);
    let mut weeks: BTreeMap<IsoWeek, Vec<&T>> = BTreeMap::new();

    for day in days {
        let week = IsoWeek::of(day.date());
        if focus_week.is_some_and(|f| f != week) {
            continue;
        }
        weeks.entry(week).or_default().push(day);
    }

    weeks
        .into_iter()
        .map(|(week, mut days)| {
            days.sort_by_key(|d| d.date());
            WeekGroup { week, days }
        })
        .collect()
}

/// One week of a trend document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekReport<S, D> {
    pub week_label: String,
    pub year: i32,
    pub week_number: u32,
    pub week_start_day: NaiveDate,
    pub week_end_day: NaiveDate,
    pub summary: S,
    pub daily_data: Vec<D>,
}

/// Build week reports: `summarize` aggregates the week's days, `day_row`
/// renders each day.
pub fn weekly_reports<T, S, D>(
    days: &[T],
    focus: Option<NaiveDate>,
    summarize: impl Fn(&[&T]) -> S,
    day_row: impl Fn(&T) -> D,
) -> Vec<WeekReport<S, D>>
where
    T: DailyRecord,
{
    group_by_week(days, focus)
        .into_iter()
        .map(|group| WeekReport {
            week_label: group.week.week.to_string(),
            year: group.week.year,
            week_number: group.week.week,
            week_start_day: group.week.start(),
            week_end_day: group.week.end(),
            summary: summarize(&group.days),
            daily_data: group.days.iter().map(|d| day_row(*d)).collect(),
        })
        .collect()
}

/// Mean of a per-day quantity across a week's days
pub fn mean_of<T>(days: &[&T], field: impl Fn(&T) -> f64) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    days.iter().map(|d| field(*d)).sum::<f64>() / days.len() as f64
}

/// Full weekday name, e.g. "Monday"
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Day(NaiveDate, f64);

    impl DailyRecord for Day {
        fn date(&self) -> NaiveDate {
            self.0
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_iso_week_bounds() {
        // 2021-01-03 is a Sunday in ISO week 53 of 2020
        let week = IsoWeek::of(d(2021, 1, 3));
        assert_eq!(week, IsoWeek { year: 2020, week: 53 });
        assert_eq!(week.start(), d(2020, 12, 28));
        assert_eq!(week.end(), d(2021, 1, 3));
        assert!(week.contains(d(2020, 12, 31)));
    }

    #[test]
    fn test_group_by_week_and_focus() {
        let days = vec![
            Day(d(2024, 3, 12), 3.0),
            Day(d(2024, 3, 4), 1.0),
            Day(d(2024, 3, 10), 2.0),
        ];
        let weeks = group_by_week(&days, None);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].days.len(), 2);
        assert_eq!(weeks[0].days[0].1, 1.0);

        let focused = group_by_week(&days, Some(d(2024, 3, 14)));
        assert_eq!(focused.len(), 1);
        assert_eq!(focused[0].week.start(), d(2024, 3, 11));

        assert!(group_by_week(&days, Some(d(2024, 5, 1))).is_empty());
    }

    #[test]
    fn test_weekly_reports_summary() {
        let days = vec![Day(d(2024, 3, 4), 1.0), Day(d(2024, 3, 5), 3.0)];
        let reports = weekly_reports(&days, None, |week| mean_of(week, |day| day.1), |day| day.1);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].week_label, "10");
        assert_eq!(reports[0].summary, 2.0);
        assert_eq!(reports[0].daily_data, vec![1.0, 3.0]);
        assert_eq!(weekday_name(d(2024, 3, 4)), "Monday");
    }
}
