use crate::db::{connect_with_config, DatabaseConfig};
use crate::errors::ModelError;
use crate::measure::{self, MeasureType, NewMeasure};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut cfg = DatabaseConfig::from_env();
    cfg.url = "sqlite::memory:".to_string();
    let db = connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn new_measure(customer: &str, t: MeasureType, y: i32, m: u32, d: u32) -> NewMeasure {
    NewMeasure {
        uuid: Uuid::new_v4(),
        customer_code: customer.to_string(),
        measure_type: t,
        measure_datetime: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        measure_value: 42,
        image_file: "temp_image_test.jpg".to_string(),
    }
}

#[tokio::test]
async fn test_measure_create_and_find() -> Result<()> {
    let db = setup_test_db().await?;

    let created = measure::create(&db, new_measure("C1", MeasureType::Water, 2024, 5, 10)).await?;
    assert!(created.id > 0);
    assert_eq!(created.measure_month, "2024-05");
    assert!(!created.measure_confirmed);

    let found = measure::find_by_uuid(&db, created.uuid).await?.expect("by uuid");
    assert_eq!(found.id, created.id);
    assert_eq!(found.measure_type, MeasureType::Water);
    assert_eq!(found.measure_value, 42);

    let in_month = measure::find_for_month(&db, "C1", MeasureType::Water, "2024-05").await?;
    assert!(in_month.is_some());
    let other_type = measure::find_for_month(&db, "C1", MeasureType::Gas, "2024-05").await?;
    assert!(other_type.is_none());
    let other_month = measure::find_for_month(&db, "C1", MeasureType::Water, "2024-06").await?;
    assert!(other_month.is_none());
    Ok(())
}

#[tokio::test]
async fn test_unique_month_constraint() -> Result<()> {
    let db = setup_test_db().await?;

    measure::create(&db, new_measure("C1", MeasureType::Gas, 2024, 5, 1)).await?;
    let dup = measure::create(&db, new_measure("C1", MeasureType::Gas, 2024, 5, 31)).await;
    assert!(matches!(dup, Err(ModelError::Conflict(_))), "got {dup:?}");

    // other month, other type and other customer are all fine
    measure::create(&db, new_measure("C1", MeasureType::Gas, 2024, 6, 1)).await?;
    measure::create(&db, new_measure("C1", MeasureType::Water, 2024, 5, 1)).await?;
    measure::create(&db, new_measure("C2", MeasureType::Gas, 2024, 5, 1)).await?;
    Ok(())
}

#[tokio::test]
async fn test_confirm_only_once() -> Result<()> {
    let db = setup_test_db().await?;
    let created = measure::create(&db, new_measure("C1", MeasureType::Water, 2024, 5, 10)).await?;

    assert!(measure::confirm(&db, created.uuid, 1500).await?);
    let after = measure::find_by_uuid(&db, created.uuid).await?.expect("row");
    assert!(after.measure_confirmed);
    assert_eq!(after.measure_value, 1500);

    assert!(!measure::confirm(&db, created.uuid, 99).await?);
    let still = measure::find_by_uuid(&db, created.uuid).await?.expect("row");
    assert_eq!(still.measure_value, 1500);

    assert!(!measure::confirm(&db, Uuid::new_v4(), 1).await?);
    Ok(())
}

#[tokio::test]
async fn test_list_for_customer() -> Result<()> {
    let db = setup_test_db().await?;
    measure::create(&db, new_measure("C1", MeasureType::Water, 2024, 6, 1)).await?;
    measure::create(&db, new_measure("C1", MeasureType::Water, 2024, 5, 1)).await?;
    measure::create(&db, new_measure("C1", MeasureType::Gas, 2024, 5, 1)).await?;
    measure::create(&db, new_measure("C2", MeasureType::Gas, 2024, 5, 1)).await?;

    let all = measure::list_for_customer(&db, "C1", None).await?;
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].measure_datetime <= w[1].measure_datetime));

    let water = measure::list_for_customer(&db, "C1", Some(MeasureType::Water)).await?;
    assert_eq!(water.len(), 2);
    assert!(water.iter().all(|m| m.measure_type == MeasureType::Water));

    let none = measure::list_for_customer(&db, "C3", None).await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_create_rejects_blank_customer() -> Result<()> {
    let db = setup_test_db().await?;
    let res = measure::create(&db, new_measure(" ", MeasureType::Water, 2024, 5, 10)).await;
    assert!(matches!(res, Err(ModelError::Validation(_))));
    Ok(())
}
