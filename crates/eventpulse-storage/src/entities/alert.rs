use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fingerprint: String,
    pub status: String,
    /// Label mapping, serialized JSON.
    pub labels: String,
    /// Annotation mapping, serialized JSON.
    pub annotations: String,
    pub starts_at: String,
    pub ends_at: String,
    pub first_seen: String,
    pub last_seen: String,
    pub occurrences: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
