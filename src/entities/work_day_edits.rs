use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "work_day_edits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub card_number: i64,

    pub day: Date,

    /// `H:MM`
    pub start_time: String,

    /// `H:MM`
    pub end_time: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
