use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use serde::Serialize;

use crate::entities::cards;

const MONTH_BUCKET: &str = r#"strftime('%Y-%m', "time")"#;
const DAY_BUCKET: &str = r#"strftime('%Y-%m-%d', "time")"#;

/// Largest LIMIT SQLite accepts
const NO_LIMIT: u64 = i64::MAX.unsigned_abs();

/// Distinct month that has punches
#[derive(Debug, Clone, FromQueryResult)]
pub struct MonthRow {
    pub month: String,
}

/// One aggregated day of punches for a card
#[derive(Debug, Clone, FromQueryResult)]
pub struct DailySummaryRow {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub first_punch: String,
    /// `HH:MM`
    pub last_punch: String,
    /// Hours between the first and the last punch
    pub hours: f64,
}

/// Punch reduced to its month, as served by the table feed
#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct PunchMonthRow {
    pub id: i32,
    pub time: String,
    pub card_number: i64,
}

pub struct CardRepository {
    conn: DatabaseConnection,
}

impl CardRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&self, card_number: i64, time: NaiveDateTime) -> Result<cards::Model> {
        let active = cards::ActiveModel {
            card_number: Set(card_number),
            time: Set(time),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert punch")
    }

    /// Months (`YYYY-MM`) with at least one punch, newest first
    pub async fn months(&self, card_number: i64) -> Result<Vec<String>> {
        let rows = cards::Entity::find()
            .select_only()
            .column_as(Expr::cust(MONTH_BUCKET), "month")
            .filter(cards::Column::CardNumber.eq(card_number))
            .group_by(Expr::cust(MONTH_BUCKET))
            .order_by_desc(Expr::cust(MONTH_BUCKET))
            .into_model::<MonthRow>()
            .all(&self.conn)
            .await
            .context("Failed to query punch months")?;

        Ok(rows.into_iter().map(|r| r.month).collect())
    }

    /// First/last punch per day for `card_number` in `[from, until)`
    pub async fn daily_summary(
        &self,
        card_number: i64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailySummaryRow>> {
        let rows = cards::Entity::find()
            .select_only()
            .column_as(Expr::cust(DAY_BUCKET), "date")
            .column_as(
                Expr::cust(r#"min(strftime('%H:%M', "time"))"#),
                "first_punch",
            )
            .column_as(
                Expr::cust(r#"max(strftime('%H:%M', "time"))"#),
                "last_punch",
            )
            .column_as(
                Expr::cust(r#"(julianday(max("time")) - julianday(min("time"))) * 24.0"#),
                "hours",
            )
            .filter(cards::Column::CardNumber.eq(card_number))
            .filter(cards::Column::Time.gte(from.and_time(chrono::NaiveTime::MIN)))
            .filter(cards::Column::Time.lt(until.and_time(chrono::NaiveTime::MIN)))
            .group_by(Expr::cust(DAY_BUCKET))
            .order_by_asc(Expr::cust(DAY_BUCKET))
            .into_model::<DailySummaryRow>()
            .all(&self.conn)
            .await
            .context("Failed to query daily punch summary")?;

        Ok(rows)
    }

    /// Punches ordered by id, skipping `offset` rows and returning at most
    /// `limit` (all when `None`)
    pub async fn slice(&self, offset: u64, limit: Option<u64>) -> Result<Vec<PunchMonthRow>> {
        let mut query = cards::Entity::find()
            .select_only()
            .column(cards::Column::Id)
            .column_as(Expr::cust(MONTH_BUCKET), "time")
            .column(cards::Column::CardNumber)
            .order_by_asc(cards::Column::Id);

        // SQLite only accepts OFFSET after a LIMIT
        if let Some(limit) = limit {
            query = query.limit(limit).offset(offset);
        } else if offset > 0 {
            query = query.limit(NO_LIMIT).offset(offset);
        }

        let rows = query
            .into_model::<PunchMonthRow>()
            .all(&self.conn)
            .await
            .context("Failed to query punches")?;

        Ok(rows)
    }
}
