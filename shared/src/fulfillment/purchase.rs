//! Purchase order receipt

use rust_decimal::Decimal;
use uuid::Uuid;

use super::{FulfillmentError, StockBook, StockChanges};
use crate::models::{PurchaseOrder, PurchaseOrderStatus};

/// Stock and pricing effects of receiving a purchase order
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub changes: StockChanges,
    /// New `bought_price` per product; the last line for a product wins
    pub bought_prices: Vec<(Uuid, Decimal)>,
}

/// Receive every line of a purchase order into its destination warehouse
pub fn receive_purchase_order(
    order: &PurchaseOrder,
    mut book: StockBook,
) -> Result<Receipt, FulfillmentError> {
    order.ensure_status_change(PurchaseOrderStatus::Received)?;
    let reference = order.reference();
    let mut bought_prices: Vec<(Uuid, Decimal)> = Vec::new();

    for line in &order.lines {
        book.receive(
            order.warehouse_id,
            line.product_id,
            line.quantity,
            Some(&reference),
        )?;

        match bought_prices.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some(entry) => entry.1 = line.unit_price,
            None => bought_prices.push((line.product_id, line.unit_price)),
        }
    }

    Ok(Receipt {
        changes: book.into_changes(),
        bought_prices,
    })
}
