//! HTTP handlers for inventory ledger views

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{Inventory, InventoryMovement, Pagination, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::InventoryService;
use crate::AppState;

const LEDGER_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::WarehouseManager];

/// Inventory rows held by a warehouse
pub async fn list_warehouse_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Vec<Inventory>>> {
    require_role(&current_user.0, LEDGER_ROLES, "view inventory")?;
    let rows = InventoryService::new(state.db)
        .list_for_warehouse(warehouse_id)
        .await?;
    Ok(Json(rows))
}

/// Movements recorded against one inventory row
pub async fn list_inventory_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    require_role(&current_user.0, LEDGER_ROLES, "view inventory")?;
    let movements = InventoryService::new(state.db)
        .list_movements(inventory_id, pagination)
        .await?;
    Ok(Json(movements))
}
