//! Sales order reservation, shipping and cancellation against a [`StockBook`]

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use super::{FulfillmentError, StockBook, StockChanges, WarehouseStock};
use crate::models::{
    PurchaseOrderDraft, PurchaseOrderDraftLine, PurchaseOrderStatus, SalesOrder, SalesOrderStatus,
};

/// Result of running the reservation algorithm on a CREATED order
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationOutcome {
    /// Every line is covered; persist the changes and mark the order RESERVED
    Reserved {
        changes: StockChanges,
        /// Backorder lines fully covered by transfers
        cleared_backorders: Vec<Uuid>,
    },
    /// Some backorder lines could not be covered; nothing may be persisted
    ReplenishmentRequired(PurchaseOrderDraft),
}

/// Summary of a reservation outcome for logging and audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub lines_reserved: usize,
    pub backorders_cleared: usize,
    pub units_short: i32,
}

impl ReservationOutcome {
    pub fn summary(&self, order: &SalesOrder) -> ReservationSummary {
        match self {
            ReservationOutcome::Reserved {
                cleared_backorders, ..
            } => ReservationSummary {
                lines_reserved: order.lines.len(),
                backorders_cleared: cleared_backorders.len(),
                units_short: 0,
            },
            ReservationOutcome::ReplenishmentRequired(draft) => ReservationSummary {
                lines_reserved: 0,
                backorders_cleared: 0,
                units_short: draft
                    .lines
                    .iter()
                    .fold(0i32, |total, l| total.saturating_add(l.quantity)),
            },
        }
    }
}

/// Reserve stock for every line of a CREATED order.
///
/// Regular lines reserve from the home warehouse first and fail with
/// `InsufficientInventory` when it cannot cover them. Backorder lines then
/// take what the home warehouse still has available and pull the rest from
/// the other warehouses. When a backorder line stays short, the outcome is a
/// draft purchase order due after `lead_time`. Nothing from the attempted
/// transfers is kept in that case, so each draft line covers the whole part
/// of the line the home warehouse could not.
pub fn reserve_order(
    order: &SalesOrder,
    mut book: StockBook,
    lead_time: Duration,
) -> Result<ReservationOutcome, FulfillmentError> {
    order.ensure_reservable()?;
    let reference = order.reference();
    let mut cleared_backorders = Vec::new();
    let mut shortfall = Vec::new();

    for line in order.lines.iter().filter(|l| !l.backorder) {
        book.reserve(order.warehouse_id, line.product_id, line.quantity)?;
    }

    for line in order.lines.iter().filter(|l| l.backorder) {
        let from_home =
            book.reserve_available(order.warehouse_id, line.product_id, line.quantity)?;
        let outstanding = line.quantity - from_home;
        let remaining = if outstanding > 0 {
            book.transfer(
                order.warehouse_id,
                line.product_id,
                outstanding,
                Some(&reference),
            )?
        } else {
            0
        };

        if remaining == 0 {
            cleared_backorders.push(line.id);
        } else {
            shortfall.push(PurchaseOrderDraftLine {
                product_id: line.product_id,
                quantity: outstanding,
                unit_price: line.unit_price,
            });
        }
    }

    if !shortfall.is_empty() {
        return Ok(ReservationOutcome::ReplenishmentRequired(
            PurchaseOrderDraft {
                id: Uuid::new_v4(),
                warehouse_id: order.warehouse_id,
                status: PurchaseOrderStatus::Created,
                expected_delivery: book.now() + lead_time,
                source_sales_order_id: order.id,
                lines: shortfall,
            },
        ));
    }

    Ok(ReservationOutcome::Reserved {
        changes: book.into_changes(),
        cleared_backorders,
    })
}

/// Turn a RESERVED order's reservations into outbound stock.
///
/// Each line releases its reservation and consumes the same quantity from
/// the home warehouse.
pub fn ship_order(order: &SalesOrder, mut book: StockBook) -> Result<StockChanges, FulfillmentError> {
    order.ensure_shippable()?;
    let reference = order.reference();

    for line in &order.lines {
        let unreleased = book.release(order.warehouse_id, line.product_id, line.quantity)?;
        if unreleased > 0 {
            return Err(FulfillmentError::InvalidState(format!(
                "Order {} has no reservation for {} units of product {}",
                order.id, unreleased, line.product_id
            )));
        }

        let remaining = book.consume(
            order.warehouse_id,
            line.product_id,
            line.quantity,
            Some(&reference),
        )?;
        if remaining > 0 {
            return Err(FulfillmentError::InsufficientInventory {
                product_id: line.product_id,
                requested: line.quantity,
                available: line.quantity - remaining,
            });
        }
    }

    Ok(book.into_changes())
}

/// Release the reservations of an order being canceled.
///
/// CREATED orders hold nothing, so the change-set is empty for them.
pub fn cancel_order(order: &SalesOrder, mut book: StockBook) -> Result<StockChanges, FulfillmentError> {
    order.ensure_cancelable()?;

    if order.status == SalesOrderStatus::Reserved {
        for line in &order.lines {
            book.release(order.warehouse_id, line.product_id, line.quantity)?;
        }
    }

    Ok(book.into_changes())
}

/// Backorder flag per requested `(product_id, quantity)` line.
///
/// Lines draw on the home warehouse's available stock in order, so a second
/// line for the same product only sees what the first one left.
pub fn backorder_flags(home: &WarehouseStock, lines: &[(Uuid, i32)]) -> Vec<bool> {
    let mut claimed: HashMap<Uuid, i32> = HashMap::new();

    lines
        .iter()
        .map(|(product_id, quantity)| {
            let already = claimed.entry(*product_id).or_insert(0);
            let available = home.available(*product_id) - *already;
            if available >= *quantity {
                *already += quantity;
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Inventory;

    fn stocked(warehouse_id: Uuid, product_id: Uuid, on_hand: i32) -> WarehouseStock {
        let mut row = Inventory::empty(product_id, warehouse_id, Utc::now());
        row.qty_on_hand = on_hand;
        WarehouseStock::with_rows(warehouse_id, vec![row])
    }

    #[test]
    fn test_backorder_flags_share_availability() {
        let wh = Uuid::new_v4();
        let product = Uuid::new_v4();
        let home = stocked(wh, product, 10);

        let flags = backorder_flags(&home, &[(product, 6), (product, 6), (product, 4)]);
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_backorder_flags_unknown_product() {
        let home = WarehouseStock::new(Uuid::new_v4());
        assert_eq!(backorder_flags(&home, &[(Uuid::new_v4(), 1)]), vec![true]);
    }
}
