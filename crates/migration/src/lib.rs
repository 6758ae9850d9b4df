pub use sea_orm_migration::prelude::*;

mod m001_ingest_schema;
mod m002_rules_schema;
mod m003_action_schema;
mod m004_incident_schema;
mod mailbox;

/// Schema for the Ingest service database.
pub struct IngestMigrator;

#[async_trait::async_trait]
impl MigratorTrait for IngestMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m001_ingest_schema::Migration)]
    }
}

/// Schema for the Rule Engine database.
pub struct RulesMigrator;

#[async_trait::async_trait]
impl MigratorTrait for RulesMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m002_rules_schema::Migration)]
    }
}

/// Schema for the Action Runner database.
pub struct ActionMigrator;

#[async_trait::async_trait]
impl MigratorTrait for ActionMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m003_action_schema::Migration)]
    }
}

/// Schema for the Incident API database.
pub struct IncidentMigrator;

#[async_trait::async_trait]
impl MigratorTrait for IncidentMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m004_incident_schema::Migration)]
    }
}
