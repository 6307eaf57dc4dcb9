//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stock-keeping product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    /// Unique stock-keeping unit (e.g., "PRD-1A2B3C4D")
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub active: bool,
    /// Unit cost of the most recent purchase order receipt
    pub bought_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Activation status used by the admin status endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }
}

/// Facts about a product's usage that decide whether it may be deactivated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductUsage {
    /// Sales orders in CREATED or RESERVED status referencing the product
    pub open_sales_orders: i64,
    /// Sum of on-hand quantity across all warehouses
    pub qty_on_hand: i64,
}

impl ProductUsage {
    /// Reason the product cannot be deactivated, if any
    pub fn deactivation_blocker(&self) -> Option<&'static str> {
        if self.open_sales_orders > 0 {
            Some("Product is referenced by open sales orders")
        } else if self.qty_on_hand > 0 {
            Some("Product still has stock on hand")
        } else {
            None
        }
    }
}
