#![cfg(test)]
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use sea_orm::DatabaseConnection;

/// Fresh in-memory SQLite database with all migrations applied.
pub async fn sqlite_db() -> Result<DatabaseConnection, anyhow::Error> {
    let mut cfg = DatabaseConfig::from_env();
    cfg.url = "sqlite::memory:".to_string();
    cfg.min_connections = 1;
    let db = connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
