use crate::entities::{prelude::*, work_day_edits};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(WorkDayEdits)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One edit per card and day
        manager
            .create_index(
                Index::create()
                    .name("idx_work_day_edits_card_day")
                    .table(WorkDayEdits)
                    .col(work_day_edits::Column::CardNumber)
                    .col(work_day_edits::Column::Day)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkDayEdits).to_owned())
            .await
    }
}
