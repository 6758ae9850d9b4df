//! Inbox and outbox tables shared by every service schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum Inbox {
    Table,
    Id,
    DedupKey,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum OutboxEvents {
    Table,
    Id,
    Type,
    Payload,
    CreatedAt,
}

pub(crate) async fn create_inbox(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Inbox::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Inbox::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Inbox::DedupKey).text().not_null().unique_key())
                .col(ColumnDef::new(Inbox::CreatedAt).text().not_null())
                .to_owned(),
        )
        .await
}

pub(crate) async fn create_outbox(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(OutboxEvents::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(OutboxEvents::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(OutboxEvents::Type).text().not_null())
                .col(ColumnDef::new(OutboxEvents::Payload).text().not_null())
                .col(ColumnDef::new(OutboxEvents::CreatedAt).text().not_null())
                .to_owned(),
        )
        .await
}

pub(crate) async fn drop_mailboxes(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(Inbox::Table).if_exists().to_owned())
        .await?;
    manager
        .drop_table(Table::drop().table(OutboxEvents::Table).if_exists().to_owned())
        .await
}
