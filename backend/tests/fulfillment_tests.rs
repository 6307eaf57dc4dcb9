//! Fulfillment scenario tests
//!
//! Walks sales and purchase orders through the stock core the way the
//! services do: build a book from the rows a transaction would lock, run the
//! operation, then check the staged change-set.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use shared::{
    cancel_order, receive_purchase_order, reserve_order, ship_order, FulfillmentError, Inventory,
    MovementType, PurchaseOrder, PurchaseOrderLine, PurchaseOrderStatus, ReservationOutcome,
    SalesOrder, SalesOrderLine, SalesOrderStatus, StockBook, WarehouseStock,
};
use uuid::Uuid;

fn row(product_id: Uuid, warehouse_id: Uuid, on_hand: i32, reserved: i32) -> Inventory {
    let mut row = Inventory::empty(product_id, warehouse_id, Utc::now());
    row.qty_on_hand = on_hand;
    row.qty_reserved = reserved;
    row
}

fn sales_order(
    warehouse_id: Uuid,
    status: SalesOrderStatus,
    lines: &[(Uuid, i32, bool)],
) -> SalesOrder {
    let id = Uuid::new_v4();
    let now = Utc::now();
    SalesOrder {
        id,
        client_id: Uuid::new_v4(),
        warehouse_id,
        status,
        lines: lines
            .iter()
            .map(|(product_id, quantity, backorder)| SalesOrderLine {
                id: Uuid::new_v4(),
                sales_order_id: id,
                product_id: *product_id,
                quantity: *quantity,
                unit_price: Decimal::new(1250, 2),
                backorder: *backorder,
            })
            .collect(),
        shipment: None,
        created_at: now,
        reserved_at: None,
        shipped_at: None,
        delivered_at: None,
        canceled_at: None,
        updated_at: now,
    }
}

fn purchase_order(warehouse_id: Uuid, status: PurchaseOrderStatus, lines: &[(Uuid, i32)]) -> PurchaseOrder {
    let id = Uuid::new_v4();
    let now = Utc::now();
    PurchaseOrder {
        id,
        supplier_id: Uuid::new_v4(),
        warehouse_id,
        status,
        source_sales_order_id: None,
        expected_delivery: Some(now + Duration::days(7)),
        actual_delivery: None,
        lines: lines
            .iter()
            .map(|(product_id, quantity)| PurchaseOrderLine {
                id: Uuid::new_v4(),
                purchase_order_id: id,
                product_id: *product_id,
                quantity: *quantity,
                unit_price: Decimal::new(900, 2),
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Reservation
// ============================================================================

#[test]
fn test_reserve_regular_line_from_home_warehouse() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 20, 5)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 10, false)]);

    let outcome = reserve_order(&order, book, Duration::days(7)).unwrap();

    match outcome {
        ReservationOutcome::Reserved {
            changes,
            cleared_backorders,
        } => {
            assert!(cleared_backorders.is_empty());
            assert!(changes.movements().is_empty());
            let updated: Vec<&Inventory> = changes.updated_rows().collect();
            assert_eq!(updated.len(), 1);
            assert_eq!(updated[0].qty_on_hand, 20);
            assert_eq!(updated[0].qty_reserved, 15);
        }
        other => panic!("expected a reservation, got {other:?}"),
    }
}

#[test]
fn test_reserve_fails_when_home_stock_vanished() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 6, 4)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 3, false)]);

    let err = reserve_order(&order, book, Duration::days(7)).unwrap_err();
    assert_eq!(
        err,
        FulfillmentError::InsufficientInventory {
            product_id: product,
            requested: 3,
            available: 2
        }
    );
}

#[test]
fn test_backorder_line_is_covered_by_transfer() {
    let home = Uuid::new_v4();
    let other = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![
            WarehouseStock::new(home),
            WarehouseStock::with_rows(other, vec![row(product, other, 30, 0)]),
        ],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 12, true)]);
    let line_id = order.lines[0].id;

    let outcome = reserve_order(&order, book, Duration::days(7)).unwrap();

    let ReservationOutcome::Reserved {
        changes,
        cleared_backorders,
    } = outcome
    else {
        panic!("expected a reservation");
    };
    assert_eq!(cleared_backorders, vec![line_id]);

    let inserted: Vec<&Inventory> = changes.inserted_rows().collect();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].warehouse_id, home);
    assert_eq!(inserted[0].qty_on_hand, 12);
    assert_eq!(inserted[0].qty_reserved, 12);

    let source: Vec<&Inventory> = changes.updated_rows().collect();
    assert_eq!(source.len(), 1);
    assert_eq!(source[0].qty_on_hand, 18);

    let reference = order.reference();
    assert!(changes
        .movements()
        .iter()
        .all(|m| m.reference_document.as_deref() == Some(reference.as_str())));
}

#[test]
fn test_partial_transfer_yields_replenishment_draft() {
    let home = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let product = Uuid::new_v4();
    let now = Utc::now();
    let book = StockBook::new(
        vec![
            WarehouseStock::new(home),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 40, 10)]),
        ],
        now,
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 50, true)]);

    let outcome = reserve_order(&order, book, Duration::days(7)).unwrap();

    let ReservationOutcome::ReplenishmentRequired(draft) = outcome else {
        panic!("expected a replenishment draft");
    };
    assert_eq!(draft.warehouse_id, home);
    assert_eq!(draft.status, PurchaseOrderStatus::Created);
    assert_eq!(draft.source_sales_order_id, order.id);
    assert_eq!(draft.expected_delivery, now + Duration::days(7));
    assert_eq!(draft.lines.len(), 1);
    assert_eq!(draft.lines[0].product_id, product);
    // W2 could lend 30, but that transfer is rolled back with the rest
    assert_eq!(draft.lines[0].quantity, 50);
    assert_eq!(draft.lines[0].unit_price, order.lines[0].unit_price);
}

#[test]
fn test_draft_excludes_home_availability() {
    let home = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![
            WarehouseStock::with_rows(home, vec![row(product, home, 8, 3)]),
            WarehouseStock::with_rows(w2, vec![row(product, w2, 40, 10)]),
        ],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 50, true)]);

    let ReservationOutcome::ReplenishmentRequired(draft) =
        reserve_order(&order, book, Duration::days(7)).unwrap()
    else {
        panic!("expected a replenishment draft");
    };
    assert_eq!(draft.lines[0].quantity, 45);
}

#[test]
fn test_backorder_line_takes_home_stock_before_transfer() {
    let home = Uuid::new_v4();
    let other = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![
            WarehouseStock::with_rows(home, vec![row(product, home, 5, 0)]),
            WarehouseStock::with_rows(other, vec![row(product, other, 30, 0)]),
        ],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 12, true)]);

    let ReservationOutcome::Reserved { changes, .. } =
        reserve_order(&order, book, Duration::days(7)).unwrap()
    else {
        panic!("expected a reservation");
    };

    let rows: Vec<&Inventory> = changes.updated_rows().collect();
    let home_row = rows.iter().find(|r| r.warehouse_id == home).unwrap();
    let other_row = rows.iter().find(|r| r.warehouse_id == other).unwrap();
    assert_eq!(home_row.qty_on_hand, 12);
    assert_eq!(home_row.qty_reserved, 12);
    assert_eq!(other_row.qty_on_hand, 23);
}

#[test]
fn test_regular_lines_reserve_before_backorder_lines() {
    let home = Uuid::new_v4();
    let other = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![
            WarehouseStock::with_rows(home, vec![row(product, home, 10, 0)]),
            WarehouseStock::with_rows(other, vec![row(product, other, 4, 0)]),
        ],
        Utc::now(),
    );
    let order = sales_order(
        home,
        SalesOrderStatus::Created,
        &[(product, 4, true), (product, 10, false)],
    );

    let outcome = reserve_order(&order, book, Duration::days(7)).unwrap();

    match outcome {
        ReservationOutcome::Reserved {
            cleared_backorders, ..
        } => assert_eq!(cleared_backorders, vec![order.lines[0].id]),
        other => panic!("expected a reservation, got {other:?}"),
    }
}

#[test]
fn test_received_replenishment_lets_backorder_reserve() {
    let home = Uuid::new_v4();
    let w2 = Uuid::new_v4();
    let product = Uuid::new_v4();
    let lender = row(product, w2, 40, 10);
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 50, true)]);

    let first = StockBook::new(
        vec![
            WarehouseStock::new(home),
            WarehouseStock::with_rows(w2, vec![lender.clone()]),
        ],
        Utc::now(),
    );
    let ReservationOutcome::ReplenishmentRequired(draft) =
        reserve_order(&order, first, Duration::days(7)).unwrap()
    else {
        panic!("expected a replenishment draft");
    };

    // The admin places the draft and it is received at the home warehouse
    let draft_lines: Vec<(Uuid, i32)> = draft
        .lines
        .iter()
        .map(|l| (l.product_id, l.quantity))
        .collect();
    let mut replenishment = purchase_order(home, PurchaseOrderStatus::Approved, &draft_lines);
    replenishment.source_sales_order_id = Some(draft.source_sales_order_id);
    let receipt = receive_purchase_order(
        &replenishment,
        StockBook::new(vec![WarehouseStock::new(home)], Utc::now()),
    )
    .unwrap();
    let received: Vec<Inventory> = receipt.changes.inserted_rows().cloned().collect();

    let second = StockBook::new(
        vec![
            WarehouseStock::with_rows(home, received),
            WarehouseStock::with_rows(w2, vec![lender]),
        ],
        Utc::now(),
    );
    let ReservationOutcome::Reserved {
        changes,
        cleared_backorders,
    } = reserve_order(&order, second, Duration::days(7)).unwrap()
    else {
        panic!("expected the order to reserve after replenishment");
    };

    assert_eq!(cleared_backorders, vec![order.lines[0].id]);
    assert!(changes.movements().is_empty());
    let home_row: Vec<&Inventory> = changes.updated_rows().collect();
    assert_eq!(home_row.len(), 1);
    assert_eq!(home_row[0].warehouse_id, home);
    assert_eq!(home_row[0].qty_on_hand, 50);
    assert_eq!(home_row[0].qty_reserved, 50);
}

#[test]
fn test_receipt_overflowing_stock_is_rejected() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 2_000_000_000, 0)])],
        Utc::now(),
    );
    let order = purchase_order(home, PurchaseOrderStatus::Approved, &[(product, 200_000_000)]);

    assert_eq!(
        receive_purchase_order(&order, book).unwrap_err(),
        FulfillmentError::QuantityOverflow { product_id: product }
    );
}

#[test]
fn test_reserve_rejects_non_created_order() {
    let home = Uuid::new_v4();
    let book = StockBook::new(vec![WarehouseStock::new(home)], Utc::now());
    let order = sales_order(home, SalesOrderStatus::Reserved, &[]);

    assert!(matches!(
        reserve_order(&order, book, Duration::days(7)),
        Err(FulfillmentError::InvalidState(_))
    ));
}

// ============================================================================
// Shipping and cancellation
// ============================================================================

#[test]
fn test_ship_consumes_reserved_stock() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 20, 8)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Reserved, &[(product, 8, false)]);

    let changes = ship_order(&order, book).unwrap();

    let updated: Vec<&Inventory> = changes.updated_rows().collect();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].qty_on_hand, 12);
    assert_eq!(updated[0].qty_reserved, 0);

    let movements = changes.movements();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Outbound);
    assert_eq!(movements[0].quantity, 8);
}

#[test]
fn test_ship_walks_multiple_rows() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(
            home,
            vec![row(product, home, 100, 100), row(product, home, 50, 20)],
        )],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Reserved, &[(product, 120, false)]);

    let changes = ship_order(&order, book).unwrap();

    let quantities: Vec<i32> = changes.movements().iter().map(|m| m.quantity).collect();
    assert_eq!(quantities, vec![100, 20]);
}

#[test]
fn test_ship_without_reservation_fails() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 20, 0)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Reserved, &[(product, 5, false)]);

    assert!(matches!(
        ship_order(&order, book),
        Err(FulfillmentError::InvalidState(_))
    ));
}

#[test]
fn test_cancel_reserved_order_releases_stock() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 10, 7)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Reserved, &[(product, 7, false)]);

    let changes = cancel_order(&order, book).unwrap();

    let updated: Vec<&Inventory> = changes.updated_rows().collect();
    assert_eq!(updated[0].qty_reserved, 0);
    assert_eq!(updated[0].qty_on_hand, 10);
    assert!(changes.movements().is_empty());
}

#[test]
fn test_cancel_created_order_touches_nothing() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![row(product, home, 10, 7)])],
        Utc::now(),
    );
    let order = sales_order(home, SalesOrderStatus::Created, &[(product, 7, false)]);

    assert!(cancel_order(&order, book).unwrap().is_empty());
}

#[test]
fn test_cancel_shipped_order_fails() {
    let home = Uuid::new_v4();
    let book = StockBook::new(vec![WarehouseStock::new(home)], Utc::now());
    let order = sales_order(home, SalesOrderStatus::Shipped, &[]);

    assert!(matches!(
        cancel_order(&order, book),
        Err(FulfillmentError::InvalidState(_))
    ));
}

// ============================================================================
// Purchase order receipt
// ============================================================================

#[test]
fn test_receipt_creates_missing_row() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let book = StockBook::new(vec![WarehouseStock::new(home)], Utc::now());
    let order = purchase_order(home, PurchaseOrderStatus::Approved, &[(product, 25)]);

    let receipt = receive_purchase_order(&order, book).unwrap();

    let inserted: Vec<&Inventory> = receipt.changes.inserted_rows().collect();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].qty_on_hand, 25);
    assert_eq!(inserted[0].qty_reserved, 0);
    assert_eq!(receipt.bought_prices, vec![(product, Decimal::new(900, 2))]);

    let movement = &receipt.changes.movements()[0];
    assert_eq!(movement.movement_type, MovementType::Inbound);
    assert_eq!(movement.quantity, 25);
    assert_eq!(movement.reference_document.as_deref(), Some(order.reference().as_str()));
}

#[test]
fn test_receipt_adds_to_existing_row() {
    let home = Uuid::new_v4();
    let product = Uuid::new_v4();
    let existing = row(product, home, 10, 4);
    let existing_id = existing.id;
    let book = StockBook::new(
        vec![WarehouseStock::with_rows(home, vec![existing])],
        Utc::now(),
    );
    let order = purchase_order(home, PurchaseOrderStatus::Created, &[(product, 5)]);

    let receipt = receive_purchase_order(&order, book).unwrap();

    assert_eq!(receipt.changes.inserted_rows().count(), 0);
    let updated: Vec<&Inventory> = receipt.changes.updated_rows().collect();
    assert_eq!(updated[0].id, existing_id);
    assert_eq!(updated[0].qty_on_hand, 15);
    assert_eq!(updated[0].qty_reserved, 4);
}

#[test]
fn test_second_receipt_is_rejected() {
    let home = Uuid::new_v4();
    let book = StockBook::new(vec![WarehouseStock::new(home)], Utc::now());
    let order = purchase_order(home, PurchaseOrderStatus::Received, &[(Uuid::new_v4(), 5)]);

    assert!(matches!(
        receive_purchase_order(&order, book),
        Err(FulfillmentError::InvalidState(_))
    ));
}
