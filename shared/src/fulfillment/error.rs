//! Errors raised by the fulfillment core

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// Operation not allowed in the current order status
    #[error("{0}")]
    InvalidState(String),

    #[error("Insufficient inventory for product {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Quantity must not be negative, got {0}")]
    InvalidQuantity(i32),

    /// A stock counter would leave the `i32` range
    #[error("Stock of product {product_id} would exceed the storable quantity")]
    QuantityOverflow { product_id: Uuid },
}

impl FulfillmentError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        FulfillmentError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
