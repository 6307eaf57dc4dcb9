//! HTTP handlers for the catalog: products, warehouses, suppliers and carriers
//!
//! Reads are open to every authenticated role; writes require ADMIN.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Carrier, Pagination, Product, Supplier, UserRole, Warehouse};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::carrier::{CarrierService, CreateCarrierInput, UpdateCarrierInput};
use crate::services::product::{CreateProductInput, ProductService, UpdateProductInput};
use crate::services::supplier::{SupplierInput, SupplierService};
use crate::services::warehouse::{CreateWarehouseInput, UpdateWarehouseInput, WarehouseService};
use crate::AppState;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

// ============================================================================
// Products
// ============================================================================

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    require_role(&current_user.0, ADMIN_ONLY, "create products")?;
    let product = ProductService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Product>>> {
    let products = ProductService::new(state.db).list(pagination).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let product = ProductService::new(state.db).get(product_id).await?;
    Ok(Json(product))
}

pub async fn get_product_by_sku(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sku): Path<String>,
) -> AppResult<Json<Product>> {
    let product = ProductService::new(state.db).get_by_sku(&sku).await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    require_role(&current_user.0, ADMIN_ONLY, "update products")?;
    let product = ProductService::new(state.db).update(product_id, input).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, ADMIN_ONLY, "delete products")?;
    ProductService::new(state.db).delete(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Warehouses
// ============================================================================

pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<(StatusCode, Json<Warehouse>)> {
    require_role(&current_user.0, ADMIN_ONLY, "create warehouses")?;
    let warehouse = WarehouseService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn list_warehouses(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Warehouse>>> {
    let warehouses = WarehouseService::new(state.db).list(pagination).await?;
    Ok(Json(warehouses))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<Json<Warehouse>> {
    let warehouse = WarehouseService::new(state.db).get(warehouse_id).await?;
    Ok(Json(warehouse))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    require_role(&current_user.0, ADMIN_ONLY, "update warehouses")?;
    let warehouse = WarehouseService::new(state.db)
        .update(warehouse_id, input)
        .await?;
    Ok(Json(warehouse))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, ADMIN_ONLY, "delete warehouses")?;
    WarehouseService::new(state.db).delete(warehouse_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Suppliers
// ============================================================================

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    require_role(&current_user.0, ADMIN_ONLY, "create suppliers")?;
    let supplier = SupplierService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Supplier>>> {
    let suppliers = SupplierService::new(state.db).list(pagination).await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(state.db).get(supplier_id).await?;
    Ok(Json(supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    require_role(&current_user.0, ADMIN_ONLY, "update suppliers")?;
    let supplier = SupplierService::new(state.db)
        .update(supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, ADMIN_ONLY, "delete suppliers")?;
    SupplierService::new(state.db).delete(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Carriers
// ============================================================================

pub async fn create_carrier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCarrierInput>,
) -> AppResult<(StatusCode, Json<Carrier>)> {
    require_role(&current_user.0, ADMIN_ONLY, "create carriers")?;
    let carrier = CarrierService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(carrier)))
}

pub async fn list_carriers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Vec<Carrier>>> {
    let carriers = CarrierService::new(state.db).list(pagination).await?;
    Ok(Json(carriers))
}

pub async fn get_carrier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(carrier_id): Path<Uuid>,
) -> AppResult<Json<Carrier>> {
    let carrier = CarrierService::new(state.db).get(carrier_id).await?;
    Ok(Json(carrier))
}

pub async fn update_carrier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(carrier_id): Path<Uuid>,
    Json(input): Json<UpdateCarrierInput>,
) -> AppResult<Json<Carrier>> {
    require_role(&current_user.0, ADMIN_ONLY, "update carriers")?;
    let carrier = CarrierService::new(state.db)
        .update(carrier_id, input)
        .await?;
    Ok(Json(carrier))
}

pub async fn delete_carrier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(carrier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, ADMIN_ONLY, "delete carriers")?;
    CarrierService::new(state.db).delete(carrier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
