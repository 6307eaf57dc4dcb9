//! HTTP handlers for sales and purchase orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Pagination, PurchaseOrder, SalesOrder, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::purchase_order::{PurchaseOrderInput, PurchaseOrderService};
use crate::services::sales_order::{ReserveResponse, SalesOrderInput, SalesOrderService, ShipInput};
use crate::services::UserService;
use crate::AppState;

const ORDERING_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Client];
const WAREHOUSE_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::WarehouseManager];

fn sales_orders(state: &AppState) -> SalesOrderService {
    SalesOrderService::new(state.db.clone(), state.config.replenishment_lead_time())
}

fn purchase_orders(state: &AppState) -> PurchaseOrderService {
    PurchaseOrderService::new(state.db.clone(), state.config.replenishment_lead_time())
}

// ============================================================================
// Sales orders
// ============================================================================

/// Place a sales order; clients order for themselves
pub async fn create_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SalesOrderInput>,
) -> AppResult<(StatusCode, Json<SalesOrder>)> {
    require_role(&current_user.0, ORDERING_ROLES, "create sales orders")?;

    // A client's first order may arrive before any /users/me call
    if current_user.0.role == UserRole::Client {
        UserService::new(state.db.clone())
            .current(&current_user.0)
            .await?;
    }

    let order = sales_orders(&state)
        .create(current_user.0.caller(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_sales_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<SalesOrder>>> {
    let orders = sales_orders(&state)
        .list(current_user.0.caller(), pagination)
        .await?;
    Ok(Json(orders))
}

pub async fn get_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrder>> {
    let order = sales_orders(&state)
        .get(current_user.0.caller(), order_id)
        .await?;
    Ok(Json(order))
}

pub async fn update_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<SalesOrderInput>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, ORDERING_ROLES, "update sales orders")?;
    let order = sales_orders(&state)
        .update(current_user.0.caller(), order_id, input)
        .await?;
    Ok(Json(order))
}

/// Run the reservation algorithm for a CREATED order
pub async fn reserve_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ReserveResponse>> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "reserve sales orders")?;
    let outcome = sales_orders(&state)
        .reserve(current_user.0.caller(), order_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn ship_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ShipInput>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "ship sales orders")?;
    let order = sales_orders(&state)
        .ship(current_user.0.caller(), order_id, input)
        .await?;
    Ok(Json(order))
}

pub async fn deliver_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "deliver sales orders")?;
    let order = sales_orders(&state)
        .deliver(current_user.0.caller(), order_id)
        .await?;
    Ok(Json(order))
}

pub async fn cancel_sales_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SalesOrder>> {
    require_role(&current_user.0, ORDERING_ROLES, "cancel sales orders")?;
    let order = sales_orders(&state)
        .cancel(current_user.0.caller(), order_id)
        .await?;
    Ok(Json(order))
}

// ============================================================================
// Purchase orders
// ============================================================================

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrder>)> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "create purchase orders")?;
    let order = purchase_orders(&state)
        .create(current_user.0.caller(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "view purchase orders")?;
    let orders = purchase_orders(&state).list(pagination).await?;
    Ok(Json(orders))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    require_role(&current_user.0, WAREHOUSE_ROLES, "view purchase orders")?;
    let order = purchase_orders(&state).get(order_id).await?;
    Ok(Json(order))
}
