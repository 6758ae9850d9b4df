use sea_orm_migration::prelude::*;

use crate::mailbox;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m002_rules_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        mailbox::create_inbox(manager).await?;
        mailbox::create_outbox(manager).await?;

        manager
            .create_table(
                Table::create()
                    .table(DecisionsLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DecisionsLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DecisionsLog::Decision).text().not_null())
                    .col(ColumnDef::new(DecisionsLog::CreatedAt).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DecisionsLog::Table).if_exists().to_owned())
            .await?;
        mailbox::drop_mailboxes(manager).await
    }
}

#[derive(DeriveIden)]
enum DecisionsLog {
    Table,
    Id,
    Decision,
    CreatedAt,
}
