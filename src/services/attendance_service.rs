//! Domain service for attendance punches and the reports built from them.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::db::{DailySummaryRow, PunchMonthRow, WorkDayEdit};
use crate::domain::calendar::{DayTemplate, MonthCalendar, WorkWindow};

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Invalid work hours: {0}")]
    InvalidWorkHours(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for AttendanceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AttendanceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

/// Per-day summary of one month of punches.
#[derive(Debug, Clone)]
pub struct MonthlyReport {
    /// `YYYY-MM`
    pub month: String,
    pub days: Vec<DailySummaryRow>,
}

#[async_trait::async_trait]
pub trait AttendanceService: Send + Sync {
    /// Appends a badge swipe and returns its id.
    async fn record_punch(&self, card_number: i64, time: NaiveDateTime)
    -> Result<i32, AttendanceError>;

    /// Months (`YYYY-MM`) with punches for the card, newest first.
    async fn months(&self, card_number: i64) -> Result<Vec<String>, AttendanceError>;

    /// One row per day that has punches in `month` (`YYYY-MM`).
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::InvalidMonth`] for a malformed month key.
    async fn monthly_report(
        &self,
        card_number: i64,
        month: &str,
    ) -> Result<MonthlyReport, AttendanceError>;

    /// Punches in `[from, to)` by id; `0, 0` means every punch.
    async fn punch_table(&self, from: u64, to: u64) -> Result<Vec<PunchMonthRow>, AttendanceError>;

    /// Every day of the month with the default work window.
    fn month_template(
        &self,
        card_number: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<DayTemplate>, AttendanceError>;

    /// Calendar for the month with weekends, saved edits and meal vouchers.
    async fn calendar(
        &self,
        card_number: i64,
        year: i32,
        month: u32,
    ) -> Result<MonthCalendar, AttendanceError>;

    /// The window currently in effect for one day: the saved edit, or the
    /// default.
    async fn day_window(
        &self,
        card_number: i64,
        date: NaiveDate,
    ) -> Result<WorkWindow, AttendanceError>;

    /// Saves start/end for one day.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::InvalidWorkHours`] when a time does not
    /// parse or the end is not after the start.
    async fn edit_day(
        &self,
        card_number: i64,
        date: NaiveDate,
        start: &str,
        end: &str,
    ) -> Result<WorkDayEdit, AttendanceError>;
}
