//! Purchase order service: placement and the status state machine, including receipt

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    receive_purchase_order, validate_unit_price, Caller, Pagination, PurchaseOrder,
    PurchaseOrderLine, PurchaseOrderStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::inventory::{apply_changes, load_book, BookScope};
use super::product::require_products;
use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
    lead_time: Duration,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderInput {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    /// Defaults to now plus the replenishment lead time
    pub expected_delivery: Option<DateTime<Utc>>,
    /// Set when placing the draft returned by a sales order reservation
    pub source_sales_order_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineInput {
    pub product_id: Uuid,
    #[validate(range(
        min = 1,
        max = 1000000,
        message = "Quantity must be between 1 and 1000000"
    ))]
    pub quantity: i32,
    #[validate(custom = "validate_unit_price")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderStatusInput {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    supplier_id: Uuid,
    warehouse_id: Uuid,
    status: String,
    source_sales_order_id: Option<Uuid>,
    expected_delivery: Option<DateTime<Utc>>,
    actual_delivery: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct PurchaseOrderLineRow {
    id: Uuid,
    purchase_order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl From<PurchaseOrderLineRow> for PurchaseOrderLine {
    fn from(row: PurchaseOrderLineRow) -> Self {
        PurchaseOrderLine {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

const ORDER_COLUMNS: &str = "id, supplier_id, warehouse_id, status, source_sales_order_id, \
     expected_delivery, actual_delivery, created_at, updated_at";

async fn with_lines(
    conn: &mut PgConnection,
    rows: Vec<PurchaseOrderRow>,
) -> AppResult<Vec<PurchaseOrder>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let lines = sqlx::query_as::<_, PurchaseOrderLineRow>(
        r#"
        SELECT id, purchase_order_id, product_id, quantity, unit_price
        FROM purchase_order_lines
        WHERE purchase_order_id = ANY($1)
        ORDER BY purchase_order_id, line_no
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    let lines: Vec<PurchaseOrderLine> = lines.into_iter().map(PurchaseOrderLine::from).collect();

    rows.into_iter()
        .map(|row| -> AppResult<PurchaseOrder> {
            Ok(PurchaseOrder {
                id: row.id,
                supplier_id: row.supplier_id,
                warehouse_id: row.warehouse_id,
                status: row.status.parse()?,
                source_sales_order_id: row.source_sales_order_id,
                expected_delivery: row.expected_delivery,
                actual_delivery: row.actual_delivery,
                lines: lines
                    .iter()
                    .filter(|l| l.purchase_order_id == row.id)
                    .cloned()
                    .collect(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        })
        .collect()
}

async fn load_order(conn: &mut PgConnection, id: Uuid, lock: bool) -> AppResult<PurchaseOrder> {
    let row = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1 {}",
        if lock { "FOR UPDATE" } else { "" }
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("PurchaseOrder", id))?;

    with_lines(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("PurchaseOrder", id))
}

impl PurchaseOrderService {
    pub fn new(db: PgPool, lead_time: Duration) -> Self {
        Self { db, lead_time }
    }

    /// Place a purchase order in CREATED status
    pub async fn create(&self, caller: Caller, input: PurchaseOrderInput) -> AppResult<PurchaseOrder> {
        input.validate()?;
        for line in &input.lines {
            line.validate()?;
        }

        let mut tx = self.db.begin().await?;

        let supplier_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(input.supplier_id)
        .fetch_one(&mut *tx)
        .await?;
        if !supplier_exists {
            return Err(AppError::not_found("Supplier", input.supplier_id));
        }

        let warehouse_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(input.warehouse_id)
        .fetch_one(&mut *tx)
        .await?;
        if !warehouse_exists {
            return Err(AppError::not_found("Warehouse", input.warehouse_id));
        }

        if let Some(source_id) = input.source_sales_order_id {
            let source_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM sales_orders WHERE id = $1)",
            )
            .bind(source_id)
            .fetch_one(&mut *tx)
            .await?;
            if !source_exists {
                return Err(AppError::not_found("SalesOrder", source_id));
            }
        }

        let mut product_ids: Vec<Uuid> = input.lines.iter().map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        require_products(&mut tx, &product_ids, false).await?;

        let id = Uuid::new_v4();
        let expected_delivery = input
            .expected_delivery
            .unwrap_or_else(|| Utc::now() + self.lead_time);

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, supplier_id, warehouse_id, status, source_sales_order_id, expected_delivery
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(input.supplier_id)
        .bind(input.warehouse_id)
        .bind(PurchaseOrderStatus::Created.as_str())
        .bind(input.source_sales_order_id)
        .bind(expected_delivery)
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in input.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_lines (id, purchase_order_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(line_no as i32)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, lines = order.lines.len(), "purchase order created");
        audit::emit(AuditEvent::PurchaseOrderCreated {
            order_id: id,
            actor: caller.user_id,
            supplier_id: input.supplier_id,
            source_sales_order_id: input.source_sales_order_id,
        });
        Ok(order)
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<Vec<PurchaseOrder>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&mut *conn)
        .await?;

        with_lines(&mut conn, rows).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        let mut conn = self.db.acquire().await?;
        load_order(&mut conn, id, false).await
    }

    /// Move a purchase order to `status`.
    ///
    /// RECEIVED books every line into the destination warehouse and updates
    /// each product's bought price, all in the same transaction.
    pub async fn update_status(
        &self,
        caller: Caller,
        id: Uuid,
        status: PurchaseOrderStatus,
    ) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        order.ensure_status_change(status)?;
        let previous = order.status;
        let now = Utc::now();

        if status == PurchaseOrderStatus::Received {
            let mut product_ids: Vec<Uuid> = order.lines.iter().map(|l| l.product_id).collect();
            product_ids.sort();
            product_ids.dedup();

            let book = load_book(&mut tx, order.warehouse_id, &product_ids, BookScope::Home, now).await?;
            let receipt = receive_purchase_order(&order, book)?;
            apply_changes(&mut tx, &receipt.changes).await?;

            for (product_id, price) in &receipt.bought_prices {
                sqlx::query("UPDATE products SET bought_price = $2, updated_at = $3 WHERE id = $1")
                    .bind(product_id)
                    .bind(price)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query("UPDATE purchase_orders SET actual_delivery = $2 WHERE id = $1")
                .bind(id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

            tracing::info!(
                order_id = %id,
                source_sales_order_id = ?order.source_sales_order_id,
                movements = receipt.changes.movements().len(),
                "purchase order received"
            );
        }

        sqlx::query("UPDATE purchase_orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        audit::emit(AuditEvent::PurchaseOrderStatusChanged {
            order_id: id,
            actor: caller.user_id,
            from: previous,
            to: status,
        });
        Ok(order)
    }
}
