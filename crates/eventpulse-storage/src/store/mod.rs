//! One store type per service database.
//!
//! Every store runs its own migrator at connect time, so a fresh database
//! (or an in-memory SQLite one in tests) is ready after construction.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::Result;

pub mod incident;
pub mod ingest;
pub mod rules;
pub mod runner;

pub(crate) async fn connect(options: ConnectOptions) -> Result<DatabaseConnection> {
    let mut options = options;
    options.sqlx_logging(false);
    Ok(Database::connect(options).await?)
}
