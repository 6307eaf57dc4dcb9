//! Inventory persistence: locked stock loading, change-set application and ledger reads

use chrono::{DateTime, Utc};
use shared::{Inventory, InventoryMovement, Pagination, StockBook, StockChanges, WarehouseStock};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Which warehouses a stock book covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookScope {
    /// Only the warehouse the operation targets
    Home,
    /// The target plus every active warehouse, as transfer sources
    Network,
}

#[derive(Debug, FromRow)]
pub(crate) struct InventoryRow {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    qty_on_hand: i32,
    qty_reserved: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for Inventory {
    fn from(row: InventoryRow) -> Self {
        Inventory {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            qty_on_hand: row.qty_on_hand,
            qty_reserved: row.qty_reserved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    inventory_id: Uuid,
    movement_type: String,
    quantity: i32,
    occurred_at: DateTime<Utc>,
    reference_document: Option<String>,
    description: Option<String>,
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(InventoryMovement {
            id: row.id,
            inventory_id: row.inventory_id,
            movement_type: row.movement_type.parse()?,
            quantity: row.quantity,
            occurred_at: row.occurred_at,
            reference_document: row.reference_document,
            description: row.description,
        })
    }
}

// ============================================================================
// Transactional stock access
// ============================================================================

/// Load and lock the inventory rows of `product_ids` into a stock book.
///
/// Rows are locked in `(warehouse_id, id)` order in a single statement, so two
/// transactions touching overlapping warehouses always acquire locks in the
/// same sequence.
pub(crate) async fn load_book(
    conn: &mut PgConnection,
    home_warehouse_id: Uuid,
    product_ids: &[Uuid],
    scope: BookScope,
    now: DateTime<Utc>,
) -> AppResult<StockBook> {
    let network = scope == BookScope::Network;

    let warehouse_ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id FROM warehouses
        WHERE id = $1 OR ($2 AND active)
        ORDER BY id
        "#,
    )
    .bind(home_warehouse_id)
    .bind(network)
    .fetch_all(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, InventoryRow>(
        r#"
        SELECT id, product_id, warehouse_id, qty_on_hand, qty_reserved, created_at, updated_at
        FROM inventories
        WHERE product_id = ANY($1) AND warehouse_id = ANY($2)
        ORDER BY warehouse_id, id
        FOR UPDATE
        "#,
    )
    .bind(product_ids)
    .bind(&warehouse_ids)
    .fetch_all(&mut *conn)
    .await?;

    let book = assemble_book(
        home_warehouse_id,
        warehouse_ids,
        rows.into_iter().map(Inventory::from).collect(),
        now,
    )?;

    tracing::debug!(
        warehouses = book.warehouses().len(),
        products = product_ids.len(),
        "stock book loaded"
    );
    Ok(book)
}

/// Group locked rows under their warehouses; the home warehouse must be among them
fn assemble_book(
    home_warehouse_id: Uuid,
    warehouse_ids: Vec<Uuid>,
    rows: Vec<Inventory>,
    now: DateTime<Utc>,
) -> AppResult<StockBook> {
    if !warehouse_ids.contains(&home_warehouse_id) {
        return Err(AppError::not_found("Warehouse", home_warehouse_id));
    }

    let mut stocks: Vec<WarehouseStock> =
        warehouse_ids.into_iter().map(WarehouseStock::new).collect();
    for row in rows {
        if let Some(stock) = stocks.iter_mut().find(|s| s.warehouse_id == row.warehouse_id) {
            stock.rows.push(row);
        }
    }
    Ok(StockBook::new(stocks, now))
}

/// Unlocked view of one warehouse's stock for the given products
pub(crate) async fn warehouse_stock(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    product_ids: &[Uuid],
) -> AppResult<WarehouseStock> {
    let rows = sqlx::query_as::<_, InventoryRow>(
        r#"
        SELECT id, product_id, warehouse_id, qty_on_hand, qty_reserved, created_at, updated_at
        FROM inventories
        WHERE warehouse_id = $1 AND product_id = ANY($2)
        ORDER BY id
        "#,
    )
    .bind(warehouse_id)
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(WarehouseStock::with_rows(
        warehouse_id,
        rows.into_iter().map(Inventory::from).collect(),
    ))
}

/// Persist a change-set: row inserts and updates, then ledger movements
pub(crate) async fn apply_changes(conn: &mut PgConnection, changes: &StockChanges) -> AppResult<()> {
    for (row, inserted) in changes.staged_rows() {
        if inserted {
            sqlx::query(
                r#"
                INSERT INTO inventories (
                    id, product_id, warehouse_id, qty_on_hand, qty_reserved, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(row.id)
            .bind(row.product_id)
            .bind(row.warehouse_id)
            .bind(row.qty_on_hand)
            .bind(row.qty_reserved)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| match AppError::from_unique(e, "inventory") {
                AppError::DuplicateEntry(_) => AppError::conflict(
                    "inventory",
                    "Inventory for this product was created concurrently, retry the request",
                ),
                other => other,
            })?;
        } else {
            sqlx::query(
                r#"
                UPDATE inventories
                SET qty_on_hand = $2, qty_reserved = $3, updated_at = $4
                WHERE id = $1
                "#,
            )
            .bind(row.id)
            .bind(row.qty_on_hand)
            .bind(row.qty_reserved)
            .bind(row.updated_at)
            .execute(&mut *conn)
            .await?;
        }
    }

    for movement in changes.movements() {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, inventory_id, movement_type, quantity, occurred_at, reference_document, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(movement.id)
        .bind(movement.inventory_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.occurred_at)
        .bind(&movement.reference_document)
        .bind(&movement.description)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// ============================================================================
// Read-only ledger views
// ============================================================================

/// Inventory service for stock and movement reads
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Inventory rows held by a warehouse
    pub async fn list_for_warehouse(&self, warehouse_id: Uuid) -> AppResult<Vec<Inventory>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::not_found("Warehouse", warehouse_id));
        }

        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT id, product_id, warehouse_id, qty_on_hand, qty_reserved, created_at, updated_at
            FROM inventories
            WHERE warehouse_id = $1
            ORDER BY product_id
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Inventory::from).collect())
    }

    /// Movements of one inventory row, newest first
    pub async fn list_movements(
        &self,
        inventory_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<InventoryMovement>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventories WHERE id = $1)",
        )
        .bind(inventory_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::not_found("Inventory", inventory_id));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, inventory_id, movement_type, quantity, occurred_at, reference_document, description
            FROM inventory_movements
            WHERE inventory_id = $1
            ORDER BY occurred_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(inventory_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryMovement::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stocked(product_id: Uuid, warehouse_id: Uuid, on_hand: i32) -> Inventory {
        let mut row = Inventory::empty(product_id, warehouse_id, Utc::now());
        row.qty_on_hand = on_hand;
        row
    }

    #[test]
    fn test_book_groups_rows_in_warehouse_order() {
        let product = Uuid::new_v4();
        let mut ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let home = ids[2];
        let rows = vec![stocked(product, ids[1], 4), stocked(product, home, 9)];
        ids.reverse();

        let book = assemble_book(home, ids.clone(), rows, Utc::now()).unwrap();

        ids.sort();
        let order: Vec<Uuid> = book.warehouses().iter().map(|w| w.warehouse_id).collect();
        assert_eq!(order, ids);
        assert_eq!(book.warehouse(home).unwrap().on_hand(product), 9);
        assert!(book.changes().is_empty());
    }

    #[test]
    fn test_book_requires_home_warehouse() {
        let home = Uuid::new_v4();
        let result = assemble_book(home, vec![Uuid::new_v4()], Vec::new(), Utc::now());
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_book_drops_rows_of_unlisted_warehouses() {
        let home = Uuid::new_v4();
        let stray = stocked(Uuid::new_v4(), Uuid::new_v4(), 3);

        let book = assemble_book(home, vec![home], vec![stray], Utc::now()).unwrap();

        assert_eq!(book.warehouses().len(), 1);
        assert!(book.warehouses()[0].rows.is_empty());
    }
}
