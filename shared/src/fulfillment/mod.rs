//! Stock allocation and order fulfillment core
//!
//! Every operation works on a [`StockBook`] loaded by the caller and returns
//! the [`StockChanges`] to persist. Nothing here performs I/O, so the backend
//! decides the transaction boundary: load, run, apply, commit.

mod allocation;
mod error;
mod ledger;
mod purchase;
mod sales;
mod stock;

pub use error::FulfillmentError;
pub use purchase::{receive_purchase_order, Receipt};
pub use sales::{
    backorder_flags, cancel_order, reserve_order, ship_order, ReservationOutcome,
    ReservationSummary,
};
pub use stock::{StockBook, StockChanges, WarehouseStock};
