//! Carrier and shipment models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;
use crate::fulfillment::FulfillmentError;

/// A transport company that ships sales orders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Carrier {
    pub id: Uuid,
    /// Unique carrier code (e.g., "DHL-EXP")
    pub code: String,
    pub name: String,
    pub max_daily_capacity: i32,
    pub current_daily_shipments: i32,
    /// Day the shipment counter refers to
    pub counter_date: Option<NaiveDate>,
    /// Latest time of day a shipment is handed over for same-day dispatch
    pub cut_off_time: Option<NaiveTime>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carrier {
    /// Shipments already booked on `today`; a counter from an earlier day reads as zero
    pub fn shipments_on(&self, today: NaiveDate) -> i32 {
        match self.counter_date {
            Some(date) if date == today => self.current_daily_shipments,
            _ => 0,
        }
    }

    /// Book one shipment for `today`, failing when the daily capacity is used up
    pub fn book_shipment(&mut self, today: NaiveDate) -> Result<(), FulfillmentError> {
        if !self.active {
            return Err(FulfillmentError::InvalidState(format!(
                "Carrier {} is not active",
                self.code
            )));
        }

        let booked = self.shipments_on(today);
        if booked >= self.max_daily_capacity {
            return Err(FulfillmentError::InvalidState(format!(
                "Carrier {} has reached its maximum daily capacity of {}",
                self.code, self.max_daily_capacity
            )));
        }

        self.current_daily_shipments = booked + 1;
        self.counter_date = Some(today);
        Ok(())
    }
}

/// Lifecycle of a shipment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Planned,
    Shipped,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Planned => "PLANNED",
            ShipmentStatus::Shipped => "SHIPPED",
            ShipmentStatus::Delivered => "DELIVERED",
        }
    }
}

impl std::str::FromStr for ShipmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(ShipmentStatus::Planned),
            "SHIPPED" => Ok(ShipmentStatus::Shipped),
            "DELIVERED" => Ok(ShipmentStatus::Delivered),
            other => Err(UnknownVariant::new("shipment status", other)),
        }
    }
}

/// Link between a sales order and the carrier moving it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub carrier_id: Uuid,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
