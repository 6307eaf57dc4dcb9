//! Warehouse catalog service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{generate_warehouse_code, validate_code, Pagination, UserRole, Warehouse};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouseInput {
    /// Generated when absent
    #[validate(custom = "validate_code")]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    pub manager_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    pub manager_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    code: String,
    name: String,
    location: Option<String>,
    active: bool,
    manager_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            code: row.code,
            name: row.name,
            location: row.location,
            active: row.active,
            manager_id: row.manager_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const WAREHOUSE_COLUMNS: &str =
    "id, code, name, location, active, manager_id, created_at, updated_at";

impl WarehouseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn require_manager(&self, manager_id: Uuid) -> AppResult<()> {
        let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = $1")
            .bind(manager_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User", manager_id))?;

        if role != UserRole::WarehouseManager.as_str() {
            return Err(AppError::validation(
                "managerId",
                "Warehouse manager must have the WAREHOUSE_MANAGER role",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        self.require_manager(input.manager_id).await?;

        let id = Uuid::new_v4();
        let code = input.code.unwrap_or_else(|| generate_warehouse_code(id));

        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            INSERT INTO warehouses (id, code, name, location, manager_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&code)
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.manager_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique(e, "code"))?;

        tracing::info!(code = %code, "warehouse created");
        Ok(row.into())
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY code LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Warehouse> {
        sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Warehouse::from)
        .ok_or_else(|| AppError::not_found("Warehouse", id))
    }

    pub async fn update(&self, id: Uuid, input: UpdateWarehouseInput) -> AppResult<Warehouse> {
        input.validate()?;
        if let Some(manager_id) = input.manager_id {
            self.require_manager(manager_id).await?;
        }

        sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            UPDATE warehouses
            SET name = COALESCE($2, name),
                location = COALESCE($3, location),
                manager_id = COALESCE($4, manager_id),
                active = COALESCE($5, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.manager_id)
        .bind(input.active)
        .fetch_optional(&self.db)
        .await?
        .map(Warehouse::from)
        .ok_or_else(|| AppError::not_found("Warehouse", id))
    }

    /// Delete a warehouse with no inventory records and no orders
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM inventories WHERE warehouse_id = $1)
                OR EXISTS(SELECT 1 FROM sales_orders WHERE warehouse_id = $1)
                OR EXISTS(SELECT 1 FROM purchase_orders WHERE warehouse_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::conflict(
                "warehouse",
                "Warehouse holds inventory or is referenced by orders",
            ));
        }

        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Warehouse", id));
        }
        Ok(())
    }
}

/// Ensure a warehouse exists and accepts new orders
pub(crate) async fn require_active_warehouse(
    conn: &mut sqlx::PgConnection,
    warehouse_id: Uuid,
) -> AppResult<()> {
    let active = sqlx::query_scalar::<_, bool>("SELECT active FROM warehouses WHERE id = $1")
        .bind(warehouse_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Warehouse", warehouse_id))?;

    if !active {
        return Err(AppError::validation(
            "warehouseId",
            format!("Warehouse {warehouse_id} is inactive"),
        ));
    }
    Ok(())
}
