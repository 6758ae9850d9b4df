use sea_orm_migration::prelude::*;

use crate::mailbox;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m004_incident_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        mailbox::create_inbox(manager).await?;

        manager
            .create_table(
                Table::create()
                    .table(Incidents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Incidents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Incidents::IncidentId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Incidents::AlertFp).text().not_null())
                    .col(ColumnDef::new(Incidents::Status).text().not_null())
                    .col(ColumnDef::new(Incidents::CreatedAt).text().not_null())
                    .col(ColumnDef::new(Incidents::UpdatedAt).text().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_incidents_fp")
                    .table(Incidents::Table)
                    .col(Incidents::AlertFp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IncidentEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncidentEvents::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IncidentEvents::IncidentId).text().not_null())
                    .col(ColumnDef::new(IncidentEvents::Type).text().not_null())
                    .col(ColumnDef::new(IncidentEvents::Payload).text().not_null())
                    .col(ColumnDef::new(IncidentEvents::CreatedAt).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Actions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Actions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Actions::ActionId).text().not_null().unique_key())
                    .col(ColumnDef::new(Actions::IncidentId).text())
                    .col(ColumnDef::new(Actions::Kind).text().not_null())
                    .col(ColumnDef::new(Actions::DesiredReplicas).integer().not_null())
                    .col(ColumnDef::new(Actions::Status).text().not_null())
                    .col(ColumnDef::new(Actions::Error).text())
                    .col(ColumnDef::new(Actions::CreatedAt).text().not_null())
                    .col(ColumnDef::new(Actions::UpdatedAt).text().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Actions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncidentEvents::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incidents::Table).if_exists().to_owned())
            .await?;
        mailbox::drop_mailboxes(manager).await
    }
}

#[derive(DeriveIden)]
enum Incidents {
    Table,
    Id,
    IncidentId,
    AlertFp,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum IncidentEvents {
    Table,
    Id,
    IncidentId,
    Type,
    Payload,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Actions {
    Table,
    Id,
    ActionId,
    IncidentId,
    Kind,
    DesiredReplicas,
    Status,
    Error,
    CreatedAt,
    UpdatedAt,
}
