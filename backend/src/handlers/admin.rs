//! ADMIN-only handlers: status overrides and user listings

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{Pagination, Product, PurchaseOrder, User, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::product::ProductStatusInput;
use crate::services::purchase_order::PurchaseOrderStatusInput;
use crate::services::{ProductService, PurchaseOrderService, UserService};
use crate::AppState;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Query parameters for the user listing
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListUsersQuery {
    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Drive the purchase order state machine; RECEIVED books the stock
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<PurchaseOrderStatusInput>,
) -> AppResult<Json<PurchaseOrder>> {
    require_role(&current_user.0, ADMIN_ONLY, "change purchase order status")?;
    let order = PurchaseOrderService::new(state.db.clone(), state.config.replenishment_lead_time())
        .update_status(current_user.0.caller(), order_id, input.status)
        .await?;
    Ok(Json(order))
}

pub async fn update_product_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sku): Path<String>,
    Json(input): Json<ProductStatusInput>,
) -> AppResult<Json<Product>> {
    require_role(&current_user.0, ADMIN_ONLY, "change product status")?;
    let product = ProductService::new(state.db)
        .set_status(current_user.0.caller(), &sku, input.status)
        .await?;
    Ok(Json(product))
}

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    require_role(&current_user.0, ADMIN_ONLY, "list users")?;
    let users = UserService::new(state.db)
        .list(query.role, query.pagination())
        .await?;
    Ok(Json(users))
}

pub async fn list_warehouse_managers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<User>>> {
    require_role(&current_user.0, ADMIN_ONLY, "list warehouse managers")?;
    let users = UserService::new(state.db)
        .list(Some(UserRole::WarehouseManager), pagination)
        .await?;
    Ok(Json(users))
}
