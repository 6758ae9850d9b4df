use sea_orm_migration::prelude::*;

use crate::mailbox;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m003_action_schema"
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
                    .table(ActionExec::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActionExec::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ActionExec::ActionId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ActionExec::Kind).text().not_null())
                    .col(ColumnDef::new(ActionExec::DesiredReplicas).integer().not_null())
                    .col(ColumnDef::new(ActionExec::AlertFp).text().not_null())
                    .col(ColumnDef::new(ActionExec::Status).text().not_null())
                    .col(ColumnDef::new(ActionExec::Error).text())
                    .col(ColumnDef::new(ActionExec::CreatedAt).text().not_null())
                    .col(ColumnDef::new(ActionExec::UpdatedAt).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActionExec::Table).if_exists().to_owned())
            .await?;
        mailbox::drop_mailboxes(manager).await
    }
}

#[derive(DeriveIden)]
enum ActionExec {
    Table,
    Id,
    ActionId,
    Kind,
    DesiredReplicas,
    AlertFp,
    Status,
    Error,
    CreatedAt,
    UpdatedAt,
}
