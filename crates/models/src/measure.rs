use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{entity::prelude::*, sea_query::{Expr, StringLen}, DatabaseConnection, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors;

/// Kind of utility meter a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureType {
    #[sea_orm(string_value = "WATER")]
    Water,
    #[sea_orm(string_value = "GAS")]
    Gas,
}

impl MeasureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureType::Water => "WATER",
            MeasureType::Gas => "GAS",
        }
    }

    /// Exact match on the upper-case name, or ASCII case-folded when `case_insensitive`.
    pub fn parse(s: &str, case_insensitive: bool) -> Option<Self> {
        [MeasureType::Water, MeasureType::Gas].into_iter().find(|t| {
            if case_insensitive { t.as_str().eq_ignore_ascii_case(s) } else { t.as_str() == s }
        })
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "measure")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTimeWithTimeZone,
    /// `YYYY-MM` of `measure_datetime` in UTC; backs the one-per-month unique index.
    pub measure_month: String,
    pub measure_value: i64,
    pub measure_confirmed: bool,
    pub image_file: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Calendar month key used by the uniqueness invariant.
pub fn month_key(dt: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", dt.year(), dt.month())
}

/// Column width of `customer_code`.
pub const MAX_CUSTOMER_CODE_LEN: usize = 128;

pub fn validate_customer_code(code: &str) -> Result<(), errors::ModelError> {
    if code.trim().is_empty() {
        return Err(errors::ModelError::Validation("customer_code required".into()));
    }
    if code.len() > MAX_CUSTOMER_CODE_LEN {
        return Err(errors::ModelError::Validation(format!("customer_code too long (<={MAX_CUSTOMER_CODE_LEN})")));
    }
    Ok(())
}

/// Column values of a reading about to be inserted.
#[derive(Debug, Clone)]
pub struct NewMeasure {
    pub uuid: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub measure_value: i64,
    pub image_file: String,
}

/// Insert a new unconfirmed reading. A second reading for the same
/// customer, type and month fails with `ModelError::Conflict`.
pub async fn create(db: &DatabaseConnection, new: NewMeasure) -> Result<Model, errors::ModelError> {
    validate_customer_code(&new.customer_code)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        uuid: Set(new.uuid),
        customer_code: Set(new.customer_code),
        measure_type: Set(new.measure_type),
        measure_month: Set(month_key(&new.measure_datetime)),
        measure_datetime: Set(new.measure_datetime.into()),
        measure_value: Set(new.measure_value),
        measure_confirmed: Set(false),
        image_file: Set(new.image_file),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_uuid(db: &DatabaseConnection, uuid: Uuid) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find().filter(Column::Uuid.eq(uuid)).one(db).await?)
}

pub async fn find_for_month(
    db: &DatabaseConnection,
    customer_code: &str,
    measure_type: MeasureType,
    month: &str,
) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find()
        .filter(Column::CustomerCode.eq(customer_code))
        .filter(Column::MeasureType.eq(measure_type))
        .filter(Column::MeasureMonth.eq(month))
        .one(db)
        .await?)
}

/// Readings of a customer, oldest first, optionally restricted to one type.
pub async fn list_for_customer(
    db: &DatabaseConnection,
    customer_code: &str,
    measure_type: Option<MeasureType>,
) -> Result<Vec<Model>, errors::ModelError> {
    let mut finder = Entity::find().filter(Column::CustomerCode.eq(customer_code));
    if let Some(t) = measure_type {
        finder = finder.filter(Column::MeasureType.eq(t));
    }
    Ok(finder
        .order_by_asc(Column::MeasureDatetime)
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

/// Overwrite the value and mark the reading confirmed, only if it is still
/// unconfirmed. Returns whether a row changed.
pub async fn confirm(db: &DatabaseConnection, uuid: Uuid, value: i64) -> Result<bool, errors::ModelError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let res = Entity::update_many()
        .col_expr(Column::MeasureValue, Expr::value(value))
        .col_expr(Column::MeasureConfirmed, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Uuid.eq(uuid))
        .filter(Column::MeasureConfirmed.eq(false))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}
