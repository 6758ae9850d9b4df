use sea_orm_migration::prelude::*;

use crate::mailbox;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_ingest_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alerts::Fingerprint).text().not_null())
                    .col(ColumnDef::new(Alerts::Status).text().not_null())
                    .col(ColumnDef::new(Alerts::Labels).text().not_null())
                    .col(ColumnDef::new(Alerts::Annotations).text().not_null())
                    .col(ColumnDef::new(Alerts::StartsAt).text().not_null())
                    .col(ColumnDef::new(Alerts::EndsAt).text().not_null())
                    .col(ColumnDef::new(Alerts::FirstSeen).text().not_null())
                    .col(ColumnDef::new(Alerts::LastSeen).text().not_null())
                    .col(
                        ColumnDef::new(Alerts::Occurrences)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_alerts_fp")
                    .table(Alerts::Table)
                    .col(Alerts::Fingerprint)
                    .to_owned(),
            )
            .await?;

        mailbox::create_inbox(manager).await?;
        mailbox::create_outbox(manager).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alerts::Table).if_exists().to_owned())
            .await?;
        mailbox::drop_mailboxes(manager).await
    }
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    Fingerprint,
    Status,
    Labels,
    Annotations,
    StartsAt,
    EndsAt,
    FirstSeen,
    LastSeen,
    Occurrences,
}
