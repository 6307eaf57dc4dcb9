//! Inventory ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// Stock of one product held at one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub qty_on_hand: i32,
    /// Part of `qty_on_hand` earmarked for not-yet-shipped sales orders
    pub qty_reserved: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    /// Empty stock record for a product first seen at a warehouse
    pub fn empty(product_id: Uuid, warehouse_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            warehouse_id,
            qty_on_hand: 0,
            qty_reserved: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Units on hand that are not reserved
    pub fn available(&self) -> i32 {
        self.qty_on_hand - self.qty_reserved
    }

    /// `0 <= qty_reserved <= qty_on_hand`
    pub fn is_consistent(&self) -> bool {
        self.qty_reserved >= 0 && self.qty_on_hand >= 0 && self.qty_reserved <= self.qty_on_hand
    }
}

/// Direction of a stock change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Inbound,
    Outbound,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inbound => "INBOUND",
            MovementType::Outbound => "OUTBOUND",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INBOUND" => Ok(MovementType::Inbound),
            "OUTBOUND" => Ok(MovementType::Outbound),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            other => Err(UnknownVariant::new("movement type", other)),
        }
    }
}

/// Immutable ledger entry; quantity is a magnitude, the type gives the direction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub occurred_at: DateTime<Utc>,
    pub reference_document: Option<String>,
    pub description: Option<String>,
}

impl InventoryMovement {
    pub fn new(
        inventory_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        occurred_at: DateTime<Utc>,
        reference_document: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            inventory_id,
            movement_type,
            quantity,
            occurred_at,
            reference_document: reference_document.map(str::to_string),
            description: Some(description.into()),
        }
    }
}
