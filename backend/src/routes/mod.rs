//! Route definitions for the logistics platform

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything under `/api` requires a bearer token
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/sales-orders", sales_order_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/admins", admin_routes())
        .nest("/products", product_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/carriers", carrier_routes())
        .nest("/inventory", inventory_routes())
        .nest("/users", user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Sales order lifecycle routes
fn sales_order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_sales_order))
        .route("/all", get(handlers::list_sales_orders))
        .route(
            "/:order_id",
            get(handlers::get_sales_order).put(handlers::update_sales_order),
        )
        .route("/:order_id/reserve", put(handlers::reserve_sales_order))
        .route("/:order_id/ship", put(handlers::ship_sales_order))
        .route("/:order_id/deliver", put(handlers::deliver_sales_order))
        .route("/:order_id/cancel", put(handlers::cancel_sales_order))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_purchase_order))
        .route("/all", get(handlers::list_purchase_orders))
        .route("/:order_id", get(handlers::get_purchase_order))
}

/// ADMIN-only routes
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchaseOrder-status/update/:order_id",
            patch(handlers::update_purchase_order_status),
        )
        .route(
            "/product-status/update/:sku",
            patch(handlers::update_product_status),
        )
        .route("/users", get(handlers::list_users))
        .route("/warehouse-managers", get(handlers::list_warehouse_managers))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/sku/:sku", get(handlers::get_product_by_sku))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_warehouses).post(handlers::create_warehouse))
        .route(
            "/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
}

fn carrier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_carriers).post(handlers::create_carrier))
        .route(
            "/:carrier_id",
            get(handlers::get_carrier)
                .put(handlers::update_carrier)
                .delete(handlers::delete_carrier),
        )
}

/// Inventory ledger views
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/warehouses/:warehouse_id",
            get(handlers::list_warehouse_inventory),
        )
        .route("/:inventory_id/movements", get(handlers::list_inventory_movements))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_me))
        .route("/me/profile", put(handlers::update_my_profile))
}
