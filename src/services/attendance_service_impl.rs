//! `SeaORM` implementation of the `AttendanceService` trait.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::AttendanceConfig;
use crate::db::{PunchMonthRow, Store, WorkDayEdit};
use crate::domain::calendar::{
    self, DayTemplate, MonthCalendar, PunchSpan, WorkWindow, format_clock, month_bounds,
};
use crate::services::attendance_service::{AttendanceError, AttendanceService, MonthlyReport};

pub struct SeaOrmAttendanceService {
    store: Store,
    default_window: WorkWindow,
    voucher_min_hours: f64,
}

impl SeaOrmAttendanceService {
    pub fn new(store: Store, config: &AttendanceConfig) -> anyhow::Result<Self> {
        let default_window = WorkWindow::parse(&config.workday_start, &config.workday_end)
            .context("Invalid default work window")?;

        Ok(Self {
            store,
            default_window,
            voucher_min_hours: config.meal_voucher_min_hours,
        })
    }

    fn bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AttendanceError> {
        month_bounds(year, month)
            .ok_or_else(|| AttendanceError::InvalidMonth(calendar::month_key(year, month)))
    }
}

fn parse_window(start: &str, end: &str) -> Result<WorkWindow, AttendanceError> {
    let window = WorkWindow::parse(start, end).ok_or_else(|| {
        AttendanceError::InvalidWorkHours("times must look like 8:00 or 16:30".to_string())
    })?;

    if window.end <= window.start {
        return Err(AttendanceError::InvalidWorkHours(
            "end must be later than start".to_string(),
        ));
    }

    Ok(window)
}

#[async_trait]
impl AttendanceService for SeaOrmAttendanceService {
    async fn record_punch(
        &self,
        card_number: i64,
        time: NaiveDateTime,
    ) -> Result<i32, AttendanceError> {
        let id = self.store.record_punch(card_number, time).await?;
        metrics::counter!("attendance_punches_total").increment(1);
        tracing::debug!(card_number, %time, id, "Punch recorded");
        Ok(id)
    }

    async fn months(&self, card_number: i64) -> Result<Vec<String>, AttendanceError> {
        Ok(self.store.punch_months(card_number).await?)
    }

    async fn monthly_report(
        &self,
        card_number: i64,
        month: &str,
    ) -> Result<MonthlyReport, AttendanceError> {
        let (year, month_number) = calendar::parse_month_key(month)
            .ok_or_else(|| AttendanceError::InvalidMonth(month.to_string()))?;
        let (from, until) = Self::bounds(year, month_number)?;

        let days = self
            .store
            .daily_punch_summary(card_number, from, until)
            .await?;

        Ok(MonthlyReport {
            month: month.to_string(),
            days,
        })
    }

    async fn punch_table(&self, from: u64, to: u64) -> Result<Vec<PunchMonthRow>, AttendanceError> {
        if from == 0 && to == 0 {
            return Ok(self.store.punch_slice(0, None).await?);
        }

        if to <= from {
            return Ok(Vec::new());
        }

        Ok(self.store.punch_slice(from, Some(to - from)).await?)
    }

    fn month_template(
        &self,
        card_number: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<DayTemplate>, AttendanceError> {
        calendar::month_template(card_number, year, month, self.default_window)
            .ok_or_else(|| AttendanceError::InvalidMonth(calendar::month_key(year, month)))
    }

    async fn calendar(
        &self,
        card_number: i64,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, AttendanceError> {
        let (from, until) = Self::bounds(year, month)?;

        let mut edits = HashMap::new();
        for edit in self.store.work_day_edits(card_number, from, until).await? {
            match WorkWindow::parse(&edit.start_time, &edit.end_time) {
                Some(window) => {
                    edits.insert(edit.day.day(), window);
                }
                None => tracing::warn!(
                    card_number,
                    day = %edit.day,
                    "Ignoring unparsable work day edit"
                ),
            }
        }

        let mut punches = HashMap::new();
        for row in self
            .store
            .daily_punch_summary(card_number, from, until)
            .await?
        {
            if let Ok(date) = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
                punches.insert(
                    date.day(),
                    PunchSpan {
                        first: row.first_punch,
                        last: row.last_punch,
                    },
                );
            }
        }

        calendar::build_month_calendar(
            year,
            month,
            self.default_window,
            &edits,
            &punches,
            self.voucher_min_hours,
        )
        .ok_or_else(|| AttendanceError::InvalidMonth(calendar::month_key(year, month)))
    }

    async fn day_window(
        &self,
        card_number: i64,
        date: NaiveDate,
    ) -> Result<WorkWindow, AttendanceError> {
        let edit = self.store.get_work_day_edit(card_number, date).await?;

        Ok(edit
            .and_then(|e| WorkWindow::parse(&e.start_time, &e.end_time))
            .unwrap_or(self.default_window))
    }

    async fn edit_day(
        &self,
        card_number: i64,
        date: NaiveDate,
        start: &str,
        end: &str,
    ) -> Result<WorkDayEdit, AttendanceError> {
        let window = parse_window(start, end)?;

        let edit = self
            .store
            .save_work_day_edit(
                card_number,
                date,
                &format_clock(window.start),
                &format_clock(window.end),
            )
            .await?;
        tracing::info!(card_number, day = %date, "Work day edited");

        Ok(edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_rejects_bad_input() {
        assert!(parse_window("8:00", "16:00").is_ok());
        assert!(matches!(
            parse_window("16:00", "8:00"),
            Err(AttendanceError::InvalidWorkHours(_))
        ));
        assert!(matches!(
            parse_window("8", "16:00"),
            Err(AttendanceError::InvalidWorkHours(_))
        ));
    }
}
