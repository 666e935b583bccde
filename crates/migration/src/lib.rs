//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240801_000001_create_measure;
mod m20240801_000002_add_measure_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240801_000001_create_measure::Migration),
            // Indexes should always be applied last
            Box::new(m20240801_000002_add_measure_indexes::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, Statement};

    #[tokio::test]
    async fn up_and_down_on_sqlite() -> Result<(), DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await?;

        Migrator::up(&db, None).await?;
        let row = db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT count(*) AS n FROM sqlite_master WHERE type = 'index' AND name = 'idx_measure_customer_type_month'".to_owned(),
            ))
            .await?
            .expect("count row");
        let n: i32 = row.try_get("", "n")?;
        assert_eq!(n, 1);

        Migrator::down(&db, None).await?;
        let row = db
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'measure'".to_owned(),
            ))
            .await?
            .expect("count row");
        let n: i32 = row.try_get("", "n")?;
        assert_eq!(n, 0);
        Ok(())
    }
}
