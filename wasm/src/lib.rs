//! WebAssembly module for the Logistics Fulfillment Platform
//!
//! Lets the browser run the same checks the backend applies:
//! - Order status guards (which actions a status allows)
//! - Backorder preview for a draft sales order
//! - Catalog identifier validation

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use shared::{
    backorder_flags, validate_code, validate_sku, Inventory, PurchaseOrder, PurchaseOrderStatus,
    SalesOrder, SalesOrderStatus, WarehouseStock,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn sales_order_in(status: &str) -> Result<SalesOrder, JsValue> {
    let status: SalesOrderStatus = status.parse().map_err(js_error)?;
    let now = Utc::now();
    Ok(SalesOrder {
        id: Uuid::nil(),
        client_id: Uuid::nil(),
        warehouse_id: Uuid::nil(),
        status,
        lines: Vec::new(),
        shipment: None,
        created_at: now,
        reserved_at: None,
        shipped_at: None,
        delivered_at: None,
        canceled_at: None,
        updated_at: now,
    })
}

/// Actions a sales order in `status` allows
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SalesOrderActions {
    update: bool,
    reserve: bool,
    ship: bool,
    deliver: bool,
    cancel: bool,
}

/// JSON object of the actions allowed for a sales order status
#[wasm_bindgen]
pub fn sales_order_actions(status: &str) -> Result<String, JsValue> {
    let order = sales_order_in(status)?;
    let actions = SalesOrderActions {
        update: order.ensure_updatable().is_ok(),
        reserve: order.ensure_reservable().is_ok(),
        ship: order.ensure_shippable().is_ok(),
        deliver: order.ensure_deliverable().is_ok(),
        cancel: order.ensure_cancelable().is_ok(),
    };
    serde_json::to_string(&actions).map_err(js_error)
}

/// Check a purchase order status change; returns the refusal message, if any
#[wasm_bindgen]
pub fn purchase_order_status_error(from: &str, to: &str) -> Result<Option<String>, JsValue> {
    let from: PurchaseOrderStatus = from.parse().map_err(js_error)?;
    let to: PurchaseOrderStatus = to.parse().map_err(js_error)?;
    let now = Utc::now();
    let order = PurchaseOrder {
        id: Uuid::nil(),
        supplier_id: Uuid::nil(),
        warehouse_id: Uuid::nil(),
        status: from,
        source_sales_order_id: None,
        expected_delivery: None,
        actual_delivery: None,
        lines: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    Ok(order.ensure_status_change(to).err().map(|e| e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftLine {
    product_id: Uuid,
    quantity: i32,
}

/// Backorder flag per draft line, given the home warehouse's inventory rows
///
/// `inventory_json` is the array returned by the warehouse inventory endpoint;
/// `lines_json` is `[{ productId, quantity }]`.
#[wasm_bindgen]
pub fn preview_backorders(inventory_json: &str, lines_json: &str) -> Result<Vec<u8>, JsValue> {
    let rows: Vec<Inventory> = serde_json::from_str(inventory_json)
        .map_err(|e| js_error(format!("Invalid inventory JSON: {e}")))?;
    let lines: Vec<DraftLine> = serde_json::from_str(lines_json)
        .map_err(|e| js_error(format!("Invalid lines JSON: {e}")))?;

    let warehouse_id = rows.first().map(|r| r.warehouse_id).unwrap_or_default();
    let home = WarehouseStock::with_rows(warehouse_id, rows);
    let requested: Vec<(Uuid, i32)> = lines.iter().map(|l| (l.product_id, l.quantity)).collect();

    Ok(backorder_flags(&home, &requested)
        .into_iter()
        .map(u8::from)
        .collect())
}

/// Validation message for a SKU, or `None` when it is acceptable
#[wasm_bindgen]
pub fn sku_error(sku: &str) -> Option<String> {
    validate_sku(sku)
        .err()
        .and_then(|e| e.message.map(|m| m.into_owned()))
}

/// Validation message for a warehouse or carrier code
#[wasm_bindgen]
pub fn code_error(code: &str) -> Option<String> {
    validate_code(code)
        .err()
        .and_then(|e| e.message.map(|m| m.into_owned()))
}
