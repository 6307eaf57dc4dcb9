//! Purchase order models and status rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;
use crate::fulfillment::FulfillmentError;

/// Purchase order status
///
/// CREATED -> APPROVED -> RECEIVED, with CANCELED reachable from any status
/// before RECEIVED. RECEIVED and CANCELED are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Created,
    Approved,
    Received,
    Canceled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Created => "CREATED",
            PurchaseOrderStatus::Approved => "APPROVED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Canceled
        )
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseOrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(PurchaseOrderStatus::Created),
            "APPROVED" => Ok(PurchaseOrderStatus::Approved),
            "RECEIVED" => Ok(PurchaseOrderStatus::Received),
            "CANCELED" => Ok(PurchaseOrderStatus::Canceled),
            other => Err(UnknownVariant::new("purchase order status", other)),
        }
    }
}

/// Replenishment order placed with a supplier for one destination warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    /// Destination warehouse receiving the goods
    pub warehouse_id: Uuid,
    pub status: PurchaseOrderStatus,
    /// Sales order whose reservation asked for this replenishment
    pub source_sales_order_id: Option<Uuid>,
    pub expected_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub lines: Vec<PurchaseOrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PurchaseOrder {
    pub fn reference(&self) -> String {
        format!("PO-{}", self.id)
    }

    /// Check that the order may move to `next`
    pub fn ensure_status_change(&self, next: PurchaseOrderStatus) -> Result<(), FulfillmentError> {
        if self.status.is_terminal() {
            let state = match self.status {
                PurchaseOrderStatus::Received => "delivered",
                _ => "canceled",
            };
            return Err(FulfillmentError::InvalidState(format!(
                "Cannot update status of a {state} purchase order"
            )));
        }
        if next == PurchaseOrderStatus::Created && self.status != next {
            return Err(FulfillmentError::InvalidState(format!(
                "Cannot move a purchase order from {} back to CREATED",
                self.status
            )));
        }
        Ok(())
    }
}

/// Unsaved purchase order proposed when a reservation cannot be covered from stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDraft {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub expected_delivery: DateTime<Utc>,
    pub source_sales_order_id: Uuid,
    pub lines: Vec<PurchaseOrderDraftLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDraftLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: PurchaseOrderStatus) -> PurchaseOrder {
        PurchaseOrder {
            id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            status,
            source_sales_order_id: None,
            expected_delivery: None,
            actual_delivery: None,
            lines: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_received_is_terminal() {
        let err = order(PurchaseOrderStatus::Received)
            .ensure_status_change(PurchaseOrderStatus::Received)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot update status of a delivered purchase order"
        );
    }

    #[test]
    fn test_canceled_is_terminal() {
        assert!(order(PurchaseOrderStatus::Canceled)
            .ensure_status_change(PurchaseOrderStatus::Approved)
            .is_err());
    }

    #[test]
    fn test_forward_moves_allowed() {
        let created = order(PurchaseOrderStatus::Created);
        assert!(created
            .ensure_status_change(PurchaseOrderStatus::Approved)
            .is_ok());
        assert!(created
            .ensure_status_change(PurchaseOrderStatus::Received)
            .is_ok());
        assert!(order(PurchaseOrderStatus::Approved)
            .ensure_status_change(PurchaseOrderStatus::Canceled)
            .is_ok());
    }

    #[test]
    fn test_no_move_back_to_created() {
        assert!(order(PurchaseOrderStatus::Approved)
            .ensure_status_change(PurchaseOrderStatus::Created)
            .is_err());
    }
}
