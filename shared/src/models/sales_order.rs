//! Sales order models and status rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Shipment, UnknownVariant};
use crate::fulfillment::FulfillmentError;

/// Sales order status
///
/// CREATED -> RESERVED -> SHIPPED -> DELIVERED, with CANCELED reachable from
/// CREATED and RESERVED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    Created,
    Reserved,
    Shipped,
    Delivered,
    Canceled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Created => "CREATED",
            SalesOrderStatus::Reserved => "RESERVED",
            SalesOrderStatus::Shipped => "SHIPPED",
            SalesOrderStatus::Delivered => "DELIVERED",
            SalesOrderStatus::Canceled => "CANCELED",
        }
    }

    /// Statuses that still hold a claim on stock
    pub fn is_open(&self) -> bool {
        matches!(self, SalesOrderStatus::Created | SalesOrderStatus::Reserved)
    }
}

impl std::fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SalesOrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(SalesOrderStatus::Created),
            "RESERVED" => Ok(SalesOrderStatus::Reserved),
            "SHIPPED" => Ok(SalesOrderStatus::Shipped),
            "DELIVERED" => Ok(SalesOrderStatus::Delivered),
            "CANCELED" => Ok(SalesOrderStatus::Canceled),
            other => Err(UnknownVariant::new("sales order status", other)),
        }
    }
}

/// A client order fulfilled from one home warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    pub id: Uuid,
    pub client_id: Uuid,
    /// Home warehouse the order ships from
    pub warehouse_id: Uuid,
    pub status: SalesOrderStatus,
    pub lines: Vec<SalesOrderLine>,
    pub shipment: Option<Shipment>,
    pub created_at: DateTime<Utc>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One product line of a sales order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderLine {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Home warehouse could not cover the line; needs transfer or replenishment
    pub backorder: bool,
}

impl SalesOrder {
    /// Document reference written on ledger movements caused by this order
    pub fn reference(&self) -> String {
        format!("SO-{}", self.id)
    }

    pub fn total_amount(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum()
    }

    pub fn ensure_reservable(&self) -> Result<(), FulfillmentError> {
        if self.status != SalesOrderStatus::Created {
            return Err(FulfillmentError::InvalidState(
                "Only orders in CREATED status can be reserved".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_shippable(&self) -> Result<(), FulfillmentError> {
        if self.status != SalesOrderStatus::Reserved {
            return Err(FulfillmentError::InvalidState(
                "Only orders in RESERVED status can be shipped".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_deliverable(&self) -> Result<(), FulfillmentError> {
        if self.status != SalesOrderStatus::Shipped {
            return Err(FulfillmentError::InvalidState(
                "Only orders in SHIPPED status can be delivered".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_cancelable(&self) -> Result<(), FulfillmentError> {
        if self.status.is_open() {
            return Ok(());
        }
        let message = match self.status {
            SalesOrderStatus::Canceled => "Order is already canceled",
            _ => "Shipped or delivered orders cannot be canceled",
        };
        Err(FulfillmentError::InvalidState(message.to_string()))
    }

    pub fn ensure_updatable(&self) -> Result<(), FulfillmentError> {
        if matches!(
            self.status,
            SalesOrderStatus::Reserved | SalesOrderStatus::Shipped
        ) {
            return Err(FulfillmentError::InvalidState(
                "Reserved or shipped orders cannot be updated".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: SalesOrderStatus) -> SalesOrder {
        let id = Uuid::new_v4();
        SalesOrder {
            id,
            client_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            status,
            lines: vec![
                SalesOrderLine {
                    id: Uuid::new_v4(),
                    sales_order_id: id,
                    product_id: Uuid::new_v4(),
                    quantity: 3,
                    unit_price: Decimal::new(1050, 2),
                    backorder: false,
                },
                SalesOrderLine {
                    id: Uuid::new_v4(),
                    sales_order_id: id,
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: Decimal::new(500, 2),
                    backorder: true,
                },
            ],
            shipment: None,
            created_at: Utc::now(),
            reserved_at: None,
            shipped_at: None,
            delivered_at: None,
            canceled_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_created_orders_reserve() {
        assert!(order(SalesOrderStatus::Created).ensure_reservable().is_ok());
        let err = order(SalesOrderStatus::Reserved)
            .ensure_reservable()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only orders in CREATED status can be reserved"
        );
    }

    #[test]
    fn test_cancel_rules() {
        assert!(order(SalesOrderStatus::Created).ensure_cancelable().is_ok());
        assert!(order(SalesOrderStatus::Reserved).ensure_cancelable().is_ok());
        for status in [SalesOrderStatus::Shipped, SalesOrderStatus::Delivered] {
            assert_eq!(
                order(status).ensure_cancelable().unwrap_err().to_string(),
                "Shipped or delivered orders cannot be canceled"
            );
        }
    }

    #[test]
    fn test_update_rules() {
        assert!(order(SalesOrderStatus::Created).ensure_updatable().is_ok());
        for status in [SalesOrderStatus::Reserved, SalesOrderStatus::Shipped] {
            assert_eq!(
                order(status).ensure_updatable().unwrap_err().to_string(),
                "Reserved or shipped orders cannot be updated"
            );
        }
    }

    #[test]
    fn test_ship_and_deliver_follow_the_chain() {
        assert!(order(SalesOrderStatus::Created).ensure_shippable().is_err());
        assert!(order(SalesOrderStatus::Reserved).ensure_shippable().is_ok());
        assert!(order(SalesOrderStatus::Reserved).ensure_deliverable().is_err());
        assert!(order(SalesOrderStatus::Shipped).ensure_deliverable().is_ok());
    }

    #[test]
    fn test_total_amount() {
        // 3 x 10.50 + 1 x 5.00
        assert_eq!(
            order(SalesOrderStatus::Created).total_amount(),
            Decimal::new(3650, 2)
        );
    }
}
