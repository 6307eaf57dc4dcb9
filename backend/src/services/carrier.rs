//! Carrier catalog service

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use shared::{validate_code, Carrier, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CarrierService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarrierInput {
    #[validate(custom = "validate_code")]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1, message = "Daily capacity must be at least 1"))]
    pub max_daily_capacity: i32,
    pub cut_off_time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCarrierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Daily capacity must be at least 1"))]
    pub max_daily_capacity: Option<i32>,
    pub cut_off_time: Option<NaiveTime>,
    pub active: Option<bool>,
}

#[derive(Debug, FromRow)]
pub(crate) struct CarrierRow {
    id: Uuid,
    code: String,
    name: String,
    max_daily_capacity: i32,
    current_daily_shipments: i32,
    counter_date: Option<NaiveDate>,
    cut_off_time: Option<NaiveTime>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CarrierRow> for Carrier {
    fn from(row: CarrierRow) -> Self {
        Carrier {
            id: row.id,
            code: row.code,
            name: row.name,
            max_daily_capacity: row.max_daily_capacity,
            current_daily_shipments: row.current_daily_shipments,
            counter_date: row.counter_date,
            cut_off_time: row.cut_off_time,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CARRIER_COLUMNS: &str = "id, code, name, max_daily_capacity, current_daily_shipments, \
     counter_date, cut_off_time, active, created_at, updated_at";

impl CarrierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateCarrierInput) -> AppResult<Carrier> {
        input.validate()?;

        let row = sqlx::query_as::<_, CarrierRow>(&format!(
            r#"
            INSERT INTO carriers (id, code, name, max_daily_capacity, cut_off_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CARRIER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&input.code)
        .bind(&input.name)
        .bind(input.max_daily_capacity)
        .bind(input.cut_off_time)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique(e, "code"))?;

        tracing::info!(code = %input.code, "carrier created");
        Ok(row.into())
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<Vec<Carrier>> {
        let rows = sqlx::query_as::<_, CarrierRow>(&format!(
            "SELECT {CARRIER_COLUMNS} FROM carriers ORDER BY code LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Carrier::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Carrier> {
        sqlx::query_as::<_, CarrierRow>(&format!(
            "SELECT {CARRIER_COLUMNS} FROM carriers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Carrier::from)
        .ok_or_else(|| AppError::not_found("Carrier", id))
    }

    pub async fn update(&self, id: Uuid, input: UpdateCarrierInput) -> AppResult<Carrier> {
        input.validate()?;

        sqlx::query_as::<_, CarrierRow>(&format!(
            r#"
            UPDATE carriers
            SET name = COALESCE($2, name),
                max_daily_capacity = COALESCE($3, max_daily_capacity),
                cut_off_time = COALESCE($4, cut_off_time),
                active = COALESCE($5, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CARRIER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.max_daily_capacity)
        .bind(input.cut_off_time)
        .bind(input.active)
        .fetch_optional(&self.db)
        .await?
        .map(Carrier::from)
        .ok_or_else(|| AppError::not_found("Carrier", id))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shipments WHERE carrier_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::conflict(
                "carrier",
                "Carrier is referenced by shipments",
            ));
        }

        let result = sqlx::query("DELETE FROM carriers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Carrier", id));
        }
        Ok(())
    }
}

/// Load a carrier and lock it for a booking
pub(crate) async fn lock_carrier(conn: &mut PgConnection, id: Uuid) -> AppResult<Carrier> {
    sqlx::query_as::<_, CarrierRow>(&format!(
        "SELECT {CARRIER_COLUMNS} FROM carriers WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(Carrier::from)
    .ok_or_else(|| AppError::not_found("Carrier", id))
}

/// Persist the daily shipment counter of a booked carrier
pub(crate) async fn save_counter(conn: &mut PgConnection, carrier: &Carrier) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE carriers
        SET current_daily_shipments = $2, counter_date = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(carrier.id)
    .bind(carrier.current_daily_shipments)
    .bind(carrier.counter_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
