//! Physical stock movements: outbound consumption, inbound receipt and
//! reservation release

use uuid::Uuid;

use super::stock::{add_quantity, check_quantity};
use super::{FulfillmentError, StockBook};
use crate::models::{InventoryMovement, MovementType};

impl StockBook {
    /// Deduct `quantity` of a product from a warehouse, first matching row first.
    ///
    /// Each row gives up `min(qty_on_hand, remaining)` and records an OUTBOUND
    /// movement for exactly that amount. Returns the quantity that could not
    /// be deducted (0 when fully satisfied). Reservations are not touched;
    /// callers release them first.
    pub fn consume(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference: Option<&str>,
    ) -> Result<i32, FulfillmentError> {
        check_quantity(quantity)?;
        let index = self.index_of(warehouse_id)?;
        let now = self.now;
        let mut remaining = quantity;

        for row in self.warehouses[index]
            .rows
            .iter_mut()
            .filter(|r| r.product_id == product_id)
        {
            if remaining == 0 {
                break;
            }
            let deducted = row.qty_on_hand.min(remaining);
            if deducted <= 0 {
                continue;
            }

            row.qty_on_hand -= deducted;
            row.updated_at = now;
            remaining -= deducted;

            self.changes.stage_row(row, false);
            self.changes.record(InventoryMovement::new(
                row.id,
                MovementType::Outbound,
                deducted,
                now,
                reference,
                "Stock shipped",
            ));
        }

        Ok(remaining)
    }

    /// Add received stock to a warehouse, creating the product's row on first receipt.
    ///
    /// Records a single INBOUND movement and returns the affected row id.
    pub fn receive(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference: Option<&str>,
    ) -> Result<Uuid, FulfillmentError> {
        check_quantity(quantity)?;
        let index = self.index_of(warehouse_id)?;
        let now = self.now;
        let (pos, created) = self.find_or_create_row(index, product_id);

        let row = &mut self.warehouses[index].rows[pos];
        row.qty_on_hand = add_quantity(row.qty_on_hand, quantity, product_id)?;
        row.updated_at = now;

        self.changes.stage_row(row, created);
        self.changes.record(InventoryMovement::new(
            row.id,
            MovementType::Inbound,
            quantity,
            now,
            reference,
            "Purchase order receipt",
        ));

        Ok(row.id)
    }

    /// Give reserved units back to the available pool.
    ///
    /// Returns the part of `quantity` that was not reserved in this warehouse.
    pub fn release(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<i32, FulfillmentError> {
        check_quantity(quantity)?;
        let index = self.index_of(warehouse_id)?;
        let now = self.now;
        let mut remaining = quantity;

        for row in self.warehouses[index]
            .rows
            .iter_mut()
            .filter(|r| r.product_id == product_id)
        {
            if remaining == 0 {
                break;
            }
            let freed = row.qty_reserved.min(remaining);
            if freed <= 0 {
                continue;
            }

            row.qty_reserved -= freed;
            row.updated_at = now;
            remaining -= freed;
            self.changes.stage_row(row, false);
        }

        Ok(remaining)
    }
}
