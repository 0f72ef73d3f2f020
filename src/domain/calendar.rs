//! Calendar arithmetic for attendance reports.
//!
//! Everything here is pure: the database layer hands in punches and saved
//! day edits, these functions lay them out over a calendar month.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;

/// Candidate values for the last day of a month, longest first.
const LAST_DAY_CANDIDATES: [u32; 5] = [31, 30, 29, 28, 27];

/// Returns the last calendar day of `month` in `year`.
///
/// Each candidate day is tried in turn and the first one forming a real date
/// wins. An invalid month (0, 13, ...) yields `None`.
///
/// ```rust
/// use dochazka::domain::calendar::last_day_of_month;
///
/// assert_eq!(last_day_of_month(2024, 2), Some(29));
/// assert_eq!(last_day_of_month(2023, 2), Some(28));
/// assert_eq!(last_day_of_month(2023, 13), None);
/// ```
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    LAST_DAY_CANDIDATES
        .into_iter()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day).map(|date| date.day()))
}

/// Parses a `YYYY-MM` month key.
#[must_use]
pub fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    last_day_of_month(year, month)?;
    Some((year, month))
}

#[must_use]
pub fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// First instant of the month and first instant of the following month.
#[must_use]
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next))
}

/// Parses a wall-clock time written as `H:MM` or `HH:MM`.
#[must_use]
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Formats a time the way the calendar shows it (`8:00`, `16:30`).
#[must_use]
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-H:%M").to_string()
}

/// A start/end pair for one working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkWindow {
    #[must_use]
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self {
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        })
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

/// First and last punch of a day, already formatted as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchSpan {
    pub first: String,
    pub last: String,
}

/// One row of the monthly calendar.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    /// Monday = 0 ... Sunday = 6
    pub dow: u32,
    pub startdate: String,
    pub enddate: String,
    pub timespend: Option<f64>,
    pub first_punch: Option<String>,
    pub last_punch: Option<String>,
    pub edited: bool,
}

impl CalendarDay {
    #[must_use]
    pub const fn is_weekend(&self) -> bool {
        self.dow > 4
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    /// Weekdays whose hours reach the meal voucher threshold.
    pub meal_vouchers: u32,
}

/// Lays a month out day by day.
///
/// Weekends carry empty start/end. Weekdays use the saved edit for that day
/// when there is one, otherwise `default_window`. Punches are attached for
/// display only and never change the hours.
#[must_use]
pub fn build_month_calendar(
    year: i32,
    month: u32,
    default_window: WorkWindow,
    edits: &HashMap<u32, WorkWindow>,
    punches: &HashMap<u32, PunchSpan>,
    voucher_min_hours: f64,
) -> Option<MonthCalendar> {
    let last_day = last_day_of_month(year, month)?;
    let mut meal_vouchers = 0;
    let mut days = Vec::with_capacity(last_day as usize);

    for day in 1..=last_day {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let dow = date.weekday().num_days_from_monday();
        let span = punches.get(&day);

        let mut row = CalendarDay {
            day,
            dow,
            startdate: String::new(),
            enddate: String::new(),
            timespend: None,
            first_punch: span.map(|s| s.first.clone()),
            last_punch: span.map(|s| s.last.clone()),
            edited: false,
        };

        if !row.is_weekend() {
            let (window, edited) = edits
                .get(&day)
                .map_or((default_window, false), |w| (*w, true));
            let hours = window.hours();
            if hours >= voucher_min_hours {
                meal_vouchers += 1;
            }
            row.startdate = format_clock(window.start);
            row.enddate = format_clock(window.end);
            row.timespend = Some(hours);
            row.edited = edited;
        }

        days.push(row);
    }

    Some(MonthCalendar {
        year,
        month,
        days,
        meal_vouchers,
    })
}

/// Per-day entry of the calendar JSON feed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayTemplate {
    pub card_number: i64,
    pub day: u32,
    pub startdate: String,
    pub enddate: String,
}

/// Every day of the month pre-filled with the default work window.
#[must_use]
pub fn month_template(
    card_number: i64,
    year: i32,
    month: u32,
    window: WorkWindow,
) -> Option<Vec<DayTemplate>> {
    let last_day = last_day_of_month(year, month)?;
    Some(
        (1..=last_day)
            .map(|day| DayTemplate {
                card_number,
                day,
                startdate: format_clock(window.start),
                enddate: format_clock(window.end),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office_hours() -> WorkWindow {
        WorkWindow::parse("8:00", "16:00").unwrap()
    }

    #[test]
    fn test_last_day_of_month_every_month() {
        let expected = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (index, days) in expected.iter().enumerate() {
            let month = u32::try_from(index).unwrap() + 1;
            assert_eq!(last_day_of_month(2023, month), Some(*days), "month {month}");
        }
    }

    #[test]
    fn test_last_day_of_month_leap_years() {
        assert_eq!(last_day_of_month(2024, 2), Some(29));
        assert_eq!(last_day_of_month(2000, 2), Some(29));
        assert_eq!(last_day_of_month(1900, 2), Some(28));
        assert_eq!(last_day_of_month(2100, 2), Some(28));
    }

    #[test]
    fn test_last_day_of_month_invalid_month() {
        assert_eq!(last_day_of_month(2024, 0), None);
        assert_eq!(last_day_of_month(2024, 13), None);
    }

    #[test]
    fn test_parse_month_key() {
        assert_eq!(parse_month_key("2024-02"), Some((2024, 2)));
        assert_eq!(parse_month_key("2024-2"), None);
        assert_eq!(parse_month_key("2024-13"), None);
        assert_eq!(parse_month_key("garbage"), None);
        assert_eq!(month_key(2024, 2), "2024-02");
    }

    #[test]
    fn test_month_bounds_wraps_year() {
        let (first, next) = month_bounds(2023, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_and_format_clock() {
        assert_eq!(format_clock(parse_clock("8:00").unwrap()), "8:00");
        assert_eq!(format_clock(parse_clock("08:05").unwrap()), "8:05");
        assert_eq!(format_clock(parse_clock("16:30").unwrap()), "16:30");
        assert!(parse_clock("24:00").is_none());
        assert!(parse_clock("8").is_none());
        assert!(parse_clock("8:5").is_none());
        assert!(parse_clock(":30").is_none());
    }

    #[test]
    fn test_work_window_hours() {
        assert!((office_hours().hours() - 8.0).abs() < f64::EPSILON);
        let short = WorkWindow::parse("9:00", "11:30").unwrap();
        assert!((short.hours() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calendar_marks_weekends_and_counts_vouchers() {
        // March 2024 starts on a Friday and has 21 weekdays.
        let calendar =
            build_month_calendar(2024, 3, office_hours(), &HashMap::new(), &HashMap::new(), 3.0)
                .unwrap();

        assert_eq!(calendar.days.len(), 31);
        assert_eq!(calendar.meal_vouchers, 21);

        let friday = &calendar.days[0];
        assert_eq!(friday.dow, 4);
        assert_eq!(friday.startdate, "8:00");
        assert_eq!(friday.enddate, "16:00");
        assert_eq!(friday.timespend, Some(8.0));

        let saturday = &calendar.days[1];
        assert!(saturday.is_weekend());
        assert!(saturday.startdate.is_empty());
        assert!(saturday.timespend.is_none());
    }

    #[test]
    fn test_calendar_uses_edits_and_threshold() {
        let mut edits = HashMap::new();
        edits.insert(1, WorkWindow::parse("8:00", "10:00").unwrap());
        edits.insert(4, WorkWindow::parse("7:00", "15:30").unwrap());

        let calendar =
            build_month_calendar(2024, 3, office_hours(), &edits, &HashMap::new(), 3.0).unwrap();

        let first = &calendar.days[0];
        assert!(first.edited);
        assert_eq!(first.timespend, Some(2.0));

        let fourth = &calendar.days[3];
        assert_eq!(fourth.startdate, "7:00");
        assert_eq!(fourth.enddate, "15:30");

        // The two-hour day no longer earns a voucher.
        assert_eq!(calendar.meal_vouchers, 20);
    }

    #[test]
    fn test_calendar_attaches_punches_without_changing_hours() {
        let mut punches = HashMap::new();
        punches.insert(
            5,
            PunchSpan {
                first: "06:12".to_string(),
                last: "18:40".to_string(),
            },
        );

        let calendar =
            build_month_calendar(2024, 3, office_hours(), &HashMap::new(), &punches, 3.0).unwrap();
        let day = &calendar.days[4];
        assert_eq!(day.first_punch.as_deref(), Some("06:12"));
        assert_eq!(day.last_punch.as_deref(), Some("18:40"));
        assert_eq!(day.timespend, Some(8.0));
    }

    #[test]
    fn test_month_template_covers_whole_month() {
        let days = month_template(42, 2024, 2, office_hours()).unwrap();
        assert_eq!(days.len(), 29);
        assert_eq!(days[0].card_number, 42);
        assert_eq!(days[28].day, 29);
        assert_eq!(days[28].startdate, "8:00");
        assert!(month_template(42, 2024, 13, office_hours()).is_none());
    }
}
