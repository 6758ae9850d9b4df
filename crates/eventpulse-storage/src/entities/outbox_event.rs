use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "outbox_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Event kind discriminator (`alert.raised`, `action.completed`, ...).
    #[sea_orm(column_name = "type")]
    pub kind: String,
    /// Serialized event envelope, exactly as published.
    pub payload: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
