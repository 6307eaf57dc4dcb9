//! In-memory stock aggregates and the change-set they produce

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::FulfillmentError;
use crate::models::{Inventory, InventoryMovement};

/// One warehouse with its inventory rows loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseStock {
    pub warehouse_id: Uuid,
    pub rows: Vec<Inventory>,
}

impl WarehouseStock {
    pub fn new(warehouse_id: Uuid) -> Self {
        Self {
            warehouse_id,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(warehouse_id: Uuid, rows: Vec<Inventory>) -> Self {
        Self { warehouse_id, rows }
    }

    pub fn rows_for(&self, product_id: Uuid) -> impl Iterator<Item = &Inventory> {
        self.rows.iter().filter(move |r| r.product_id == product_id)
    }

    pub fn on_hand(&self, product_id: Uuid) -> i32 {
        self.rows_for(product_id).map(|r| r.qty_on_hand).sum()
    }

    pub fn reserved(&self, product_id: Uuid) -> i32 {
        self.rows_for(product_id).map(|r| r.qty_reserved).sum()
    }

    pub fn available(&self, product_id: Uuid) -> i32 {
        self.rows_for(product_id).map(Inventory::available).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedRow {
    row: Inventory,
    inserted: bool,
}

/// Row upserts and movement inserts to persist in one transaction
///
/// Rows are kept ordered by `(warehouse_id, inventory_id)`, the order in which
/// the store applies them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockChanges {
    rows: BTreeMap<(Uuid, Uuid), StagedRow>,
    movements: Vec<InventoryMovement>,
}

impl StockChanges {
    pub(crate) fn stage_row(&mut self, row: &Inventory, inserted: bool) {
        self.rows
            .entry((row.warehouse_id, row.id))
            .and_modify(|staged| staged.row = row.clone())
            .or_insert_with(|| StagedRow {
                row: row.clone(),
                inserted,
            });
    }

    pub(crate) fn record(&mut self, movement: InventoryMovement) {
        self.movements.push(movement);
    }

    /// Rows created during this operation, in their final state
    pub fn inserted_rows(&self) -> impl Iterator<Item = &Inventory> {
        self.rows.values().filter(|s| s.inserted).map(|s| &s.row)
    }

    /// Pre-existing rows whose quantities changed
    pub fn updated_rows(&self) -> impl Iterator<Item = &Inventory> {
        self.rows.values().filter(|s| !s.inserted).map(|s| &s.row)
    }

    /// Every staged row with its inserted flag, in `(warehouse_id, inventory_id)` order
    pub fn staged_rows(&self) -> impl Iterator<Item = (&Inventory, bool)> {
        self.rows.values().map(|s| (&s.row, s.inserted))
    }

    /// Movements in the order they happened
    pub fn movements(&self) -> &[InventoryMovement] {
        &self.movements
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.movements.is_empty()
    }
}

/// Working set of warehouse stock for one fulfillment operation
///
/// Operations mutate the loaded rows in memory and stage every change in a
/// [`StockChanges`]; nothing is persisted here.
#[derive(Debug, Clone)]
pub struct StockBook {
    pub(crate) warehouses: Vec<WarehouseStock>,
    pub(crate) changes: StockChanges,
    pub(crate) now: DateTime<Utc>,
}

impl StockBook {
    /// Warehouses are visited in ascending id order during transfers
    pub fn new(mut warehouses: Vec<WarehouseStock>, now: DateTime<Utc>) -> Self {
        warehouses.sort_by_key(|w| w.warehouse_id);
        Self {
            warehouses,
            changes: StockChanges::default(),
            now,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn warehouse(&self, warehouse_id: Uuid) -> Option<&WarehouseStock> {
        self.warehouses
            .iter()
            .find(|w| w.warehouse_id == warehouse_id)
    }

    pub fn warehouses(&self) -> &[WarehouseStock] {
        &self.warehouses
    }

    pub fn changes(&self) -> &StockChanges {
        &self.changes
    }

    pub fn into_changes(self) -> StockChanges {
        self.changes
    }

    /// On-hand quantity of a product summed over every warehouse
    pub fn total_on_hand(&self, product_id: Uuid) -> i64 {
        self.warehouses
            .iter()
            .map(|w| i64::from(w.on_hand(product_id)))
            .sum()
    }

    pub(crate) fn index_of(&self, warehouse_id: Uuid) -> Result<usize, FulfillmentError> {
        self.warehouses
            .iter()
            .position(|w| w.warehouse_id == warehouse_id)
            .ok_or_else(|| FulfillmentError::not_found("Warehouse", warehouse_id))
    }

    /// Index of the product's first row in the warehouse, creating an empty row when missing
    pub(crate) fn find_or_create_row(&mut self, index: usize, product_id: Uuid) -> (usize, bool) {
        let stock = &mut self.warehouses[index];
        if let Some(pos) = stock.rows.iter().position(|r| r.product_id == product_id) {
            return (pos, false);
        }
        stock
            .rows
            .push(Inventory::empty(product_id, stock.warehouse_id, self.now));
        (stock.rows.len() - 1, true)
    }
}

/// `current + quantity`, or `QuantityOverflow` when the counter would wrap
pub(crate) fn add_quantity(
    current: i32,
    quantity: i32,
    product_id: Uuid,
) -> Result<i32, FulfillmentError> {
    current
        .checked_add(quantity)
        .ok_or(FulfillmentError::QuantityOverflow { product_id })
}

pub(crate) fn check_quantity(quantity: i32) -> Result<(), FulfillmentError> {
    if quantity < 0 {
        return Err(FulfillmentError::InvalidQuantity(quantity));
    }
    Ok(())
}
