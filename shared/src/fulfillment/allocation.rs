//! Reservation against a home warehouse and cross-warehouse transfer

use uuid::Uuid;

use super::stock::{add_quantity, check_quantity};
use super::{FulfillmentError, StockBook};
use crate::models::{InventoryMovement, MovementType};

impl StockBook {
    /// Reserve `quantity` units of a product in one warehouse.
    ///
    /// Fails with `InsufficientInventory` when the product's row is missing or
    /// its available quantity (`qty_on_hand - qty_reserved`) is too small.
    pub fn reserve(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), FulfillmentError> {
        check_quantity(quantity)?;
        let index = self.index_of(warehouse_id)?;
        let now = self.now;

        let row = self.warehouses[index]
            .rows
            .iter_mut()
            .find(|r| r.product_id == product_id);

        match row {
            Some(row) if row.available() >= quantity => {
                row.qty_reserved = add_quantity(row.qty_reserved, quantity, product_id)?;
                row.updated_at = now;
                self.changes.stage_row(row, false);
                Ok(())
            }
            Some(row) => Err(FulfillmentError::InsufficientInventory {
                product_id,
                requested: quantity,
                available: row.available(),
            }),
            None => Err(FulfillmentError::InsufficientInventory {
                product_id,
                requested: quantity,
                available: 0,
            }),
        }
    }

    /// Reserve whatever part of `quantity` the warehouse has available, row by row.
    ///
    /// Never fails for lack of stock; returns the number of units reserved.
    pub fn reserve_available(
        &mut self,
        warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<i32, FulfillmentError> {
        check_quantity(quantity)?;
        let index = self.index_of(warehouse_id)?;
        let now = self.now;
        let mut reserved = 0;

        for row in self.warehouses[index]
            .rows
            .iter_mut()
            .filter(|r| r.product_id == product_id)
        {
            let taken = row.available().min(quantity - reserved);
            if taken <= 0 {
                continue;
            }

            row.qty_reserved = add_quantity(row.qty_reserved, taken, product_id)?;
            row.updated_at = now;
            reserved += taken;
            self.changes.stage_row(row, false);
        }

        Ok(reserved)
    }

    /// Pull available stock of a product from every other warehouse into `destination_id`.
    ///
    /// Transferred units land in the destination as both on-hand and reserved,
    /// since they are moved for the order that asked for them. Returns the
    /// quantity no warehouse could supply.
    pub fn transfer(
        &mut self,
        destination_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        reference: Option<&str>,
    ) -> Result<i32, FulfillmentError> {
        check_quantity(quantity)?;
        let destination = self.index_of(destination_id)?;
        let now = self.now;
        let mut remaining = quantity;

        for source in 0..self.warehouses.len() {
            if source == destination {
                continue;
            }
            let source_id = self.warehouses[source].warehouse_id;

            for pos in 0..self.warehouses[source].rows.len() {
                if remaining == 0 {
                    return Ok(0);
                }

                let row = &mut self.warehouses[source].rows[pos];
                if row.product_id != product_id || row.qty_on_hand <= 0 {
                    continue;
                }
                let moved = row.available().min(remaining);
                if moved <= 0 {
                    continue;
                }

                row.qty_on_hand -= moved;
                row.updated_at = now;
                self.changes.stage_row(row, false);
                self.changes.record(InventoryMovement::new(
                    row.id,
                    MovementType::Outbound,
                    moved,
                    now,
                    reference,
                    format!("Transfer to warehouse {destination_id}"),
                ));

                self.credit_transfer(destination, product_id, moved, source_id, reference)?;
                remaining -= moved;
            }
        }

        Ok(remaining)
    }

    fn credit_transfer(
        &mut self,
        destination: usize,
        product_id: Uuid,
        quantity: i32,
        source_id: Uuid,
        reference: Option<&str>,
    ) -> Result<(), FulfillmentError> {
        let now = self.now;
        let (pos, created) = self.find_or_create_row(destination, product_id);
        let row = &mut self.warehouses[destination].rows[pos];

        if created {
            self.changes.record(InventoryMovement::new(
                row.id,
                MovementType::Inbound,
                0,
                now,
                reference,
                "Inventory record created",
            ));
        }

        row.qty_on_hand = add_quantity(row.qty_on_hand, quantity, product_id)?;
        row.qty_reserved = add_quantity(row.qty_reserved, quantity, product_id)?;
        row.updated_at = now;

        self.changes.stage_row(row, created);
        self.changes.record(InventoryMovement::new(
            row.id,
            MovementType::Inbound,
            quantity,
            now,
            reference,
            format!("Transfer from warehouse {source_id}"),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::fulfillment::WarehouseStock;
    use crate::models::Inventory;

    fn row(product_id: Uuid, warehouse_id: Uuid, on_hand: i32, reserved: i32) -> Inventory {
        let mut row = Inventory::empty(product_id, warehouse_id, Utc::now());
        row.qty_on_hand = on_hand;
        row.qty_reserved = reserved;
        row
    }

    #[test]
    fn test_reserve_increments_reserved_only() {
        let product = Uuid::new_v4();
        let wh = Uuid::new_v4();
        let stock = WarehouseStock::with_rows(wh, vec![row(product, wh, 10, 2)]);
        let mut book = StockBook::new(vec![stock], Utc::now());

        book.reserve(wh, product, 8).unwrap();

        let stock = book.warehouse(wh).unwrap();
        assert_eq!(stock.reserved(product), 10);
        assert_eq!(stock.on_hand(product), 10);
        assert!(book.changes().movements().is_empty());
    }

    #[test]
    fn test_reserve_beyond_available_fails() {
        let product = Uuid::new_v4();
        let wh = Uuid::new_v4();
        let stock = WarehouseStock::with_rows(wh, vec![row(product, wh, 10, 5)]);
        let mut book = StockBook::new(vec![stock], Utc::now());

        let err = book.reserve(wh, product, 6).unwrap_err();
        assert_eq!(
            err,
            FulfillmentError::InsufficientInventory {
                product_id: product,
                requested: 6,
                available: 5
            }
        );
        assert!(book.changes().is_empty());
    }

    #[test]
    fn test_reserve_missing_row_fails() {
        let wh = Uuid::new_v4();
        let mut book = StockBook::new(vec![WarehouseStock::new(wh)], Utc::now());
        assert!(matches!(
            book.reserve(wh, Uuid::new_v4(), 1),
            Err(FulfillmentError::InsufficientInventory { available: 0, .. })
        ));
    }

    #[test]
    fn test_transfer_partial_from_single_source() {
        let product = Uuid::new_v4();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let book_rows = vec![
            WarehouseStock::with_rows(w1, vec![row(product, w1, 5, 5)]),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 40, 10)]),
        ];
        let mut book = StockBook::new(book_rows, Utc::now());

        let remaining = book.transfer(w1, product, 50, Some("SO-9")).unwrap();

        assert_eq!(remaining, 20);
        assert_eq!(book.warehouse(w2).unwrap().on_hand(product), 10);
        assert_eq!(book.warehouse(w2).unwrap().reserved(product), 10);
        assert_eq!(book.warehouse(w1).unwrap().on_hand(product), 35);
        assert_eq!(book.warehouse(w1).unwrap().reserved(product), 35);
    }

    #[test]
    fn test_transfer_creates_destination_row_with_marker() {
        let product = Uuid::new_v4();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let stocks = vec![
            WarehouseStock::new(w1),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 12, 0)]),
        ];
        let mut book = StockBook::new(stocks, Utc::now());

        assert_eq!(book.transfer(w1, product, 12, None).unwrap(), 0);

        let changes = book.changes();
        assert_eq!(changes.inserted_rows().count(), 1);
        let inbound: Vec<i32> = changes
            .movements()
            .iter()
            .filter(|m| m.movement_type == MovementType::Inbound)
            .map(|m| m.quantity)
            .collect();
        assert_eq!(inbound, vec![0, 12]);
    }

    #[test]
    fn test_transfer_skips_fully_reserved_sources() {
        let product = Uuid::new_v4();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let stocks = vec![
            WarehouseStock::new(w1),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 8, 8)]),
        ];
        let mut book = StockBook::new(stocks, Utc::now());

        assert_eq!(book.transfer(w1, product, 3, None).unwrap(), 3);
        assert!(book.changes().is_empty());
        assert!(book.warehouse(w1).unwrap().rows.is_empty());
    }

    #[test]
    fn test_reserve_available_takes_what_is_there() {
        let product = Uuid::new_v4();
        let wh = Uuid::new_v4();
        let stock = WarehouseStock::with_rows(
            wh,
            vec![row(product, wh, 4, 1), row(product, wh, 6, 0)],
        );
        let mut book = StockBook::new(vec![stock], Utc::now());

        assert_eq!(book.reserve_available(wh, product, 20).unwrap(), 9);
        assert_eq!(book.warehouse(wh).unwrap().available(product), 0);
        assert_eq!(book.reserve_available(wh, product, 5).unwrap(), 0);
        assert!(book.changes().movements().is_empty());
    }

    #[test]
    fn test_reserve_available_stops_at_quantity() {
        let product = Uuid::new_v4();
        let wh = Uuid::new_v4();
        let stock = WarehouseStock::with_rows(wh, vec![row(product, wh, 30, 0)]);
        let mut book = StockBook::new(vec![stock], Utc::now());

        assert_eq!(book.reserve_available(wh, product, 12).unwrap(), 12);
        assert_eq!(book.warehouse(wh).unwrap().reserved(product), 12);
    }

    #[test]
    fn test_transfer_into_full_row_overflows() {
        let product = Uuid::new_v4();
        let w1 = Uuid::new_v4();
        let w2 = Uuid::new_v4();
        let stocks = vec![
            WarehouseStock::with_rows(w1, vec![row(product, w1, i32::MAX - 5, 0)]),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 10, 0)]),
        ];
        let mut book = StockBook::new(stocks, Utc::now());

        assert_eq!(
            book.transfer(w1, product, 10, None),
            Err(FulfillmentError::QuantityOverflow { product_id: product })
        );
    }
}
