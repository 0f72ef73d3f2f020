use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::work_day_edits;

pub use crate::entities::work_day_edits::Model as WorkDayEdit;

pub struct WorkDayRepository {
    conn: DatabaseConnection,
}

impl WorkDayRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, card_number: i64, day: NaiveDate) -> Result<Option<WorkDayEdit>> {
        work_day_edits::Entity::find()
            .filter(work_day_edits::Column::CardNumber.eq(card_number))
            .filter(work_day_edits::Column::Day.eq(day))
            .one(&self.conn)
            .await
            .context("Failed to query work day edit")
    }

    /// Edits for `card_number` in `[from, until)`
    pub async fn in_range(
        &self,
        card_number: i64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<WorkDayEdit>> {
        work_day_edits::Entity::find()
            .filter(work_day_edits::Column::CardNumber.eq(card_number))
            .filter(work_day_edits::Column::Day.gte(from))
            .filter(work_day_edits::Column::Day.lt(until))
            .order_by_asc(work_day_edits::Column::Day)
            .all(&self.conn)
            .await
            .context("Failed to query work day edits")
    }

    /// Insert or replace the edit for one card and day
    pub async fn upsert(
        &self,
        card_number: i64,
        day: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<WorkDayEdit> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = if let Some(existing) = self.get(card_number, day).await? {
            let mut active: work_day_edits::ActiveModel = existing.into();
            active.start_time = Set(start_time.to_string());
            active.end_time = Set(end_time.to_string());
            active.updated_at = Set(now);
            active.update(&self.conn).await
        } else {
            work_day_edits::ActiveModel {
                card_number: Set(card_number),
                day: Set(day),
                start_time: Set(start_time.to_string()),
                end_time: Set(end_time.to_string()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.conn)
            .await
        };

        model.context("Failed to save work day edit")
    }
}
