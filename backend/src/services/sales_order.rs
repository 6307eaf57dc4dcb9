//! Sales order service: creation, reservation, shipping, delivery and cancellation
//!
//! Every mutating operation runs in one transaction: the order row is locked,
//! the stock it touches is loaded into a `StockBook` with row locks, the
//! fulfillment core computes the changes and they are written back before
//! commit. Any error drops the transaction.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    backorder_flags, cancel_order, generate_tracking_number, reserve_order, ship_order,
    validate_unit_price, Caller, Pagination, PurchaseOrderDraft, ReservationOutcome, SalesOrder,
    SalesOrderLine, SalesOrderStatus, Shipment, ShipmentStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::carrier::{lock_carrier, save_counter};
use super::inventory::{apply_changes, load_book, warehouse_stock, BookScope};
use super::product::require_products;
use super::user::require_client;
use super::warehouse::require_active_warehouse;
use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};

/// Sales order service
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
    lead_time: Duration,
}

/// Input for creating or updating a sales order
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderInput {
    /// Required for admins; clients always order for themselves
    pub client_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<SalesOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderLineInput {
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

impl SalesOrderInput {
    fn validate_all(&self) -> AppResult<()> {
        self.validate()?;
        for line in &self.lines {
            line.validate()?;
        }
        Ok(())
    }

    fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipInput {
    pub carrier_id: Uuid,
}

/// Result of a reservation request
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReserveResponse {
    Reserved {
        order: SalesOrder,
    },
    ReplenishmentRequired {
        #[serde(rename = "purchaseOrder")]
        purchase_order: PurchaseOrderDraft,
    },
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct SalesOrderRow {
    id: Uuid,
    client_id: Uuid,
    warehouse_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    reserved_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SalesOrderLineRow {
    id: Uuid,
    sales_order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    backorder: bool,
}

impl From<SalesOrderLineRow> for SalesOrderLine {
    fn from(row: SalesOrderLineRow) -> Self {
        SalesOrderLine {
            id: row.id,
            sales_order_id: row.sales_order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            backorder: row.backorder,
        }
    }
}

#[derive(Debug, FromRow)]
struct ShipmentRow {
    id: Uuid,
    sales_order_id: Uuid,
    carrier_id: Uuid,
    tracking_number: String,
    status: String,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = AppError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Shipment {
            id: row.id,
            sales_order_id: row.sales_order_id,
            carrier_id: row.carrier_id,
            tracking_number: row.tracking_number,
            status: row.status.parse()?,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, client_id, warehouse_id, status, created_at, reserved_at, \
     shipped_at, delivered_at, canceled_at, updated_at";

const LINE_COLUMNS: &str = "id, sales_order_id, product_id, quantity, unit_price, backorder";

const SHIPMENT_COLUMNS: &str =
    "id, sales_order_id, carrier_id, tracking_number, status, shipped_at, delivered_at, created_at";

/// Assemble orders from their rows, lines and shipments
fn assemble(
    rows: Vec<SalesOrderRow>,
    lines: Vec<SalesOrderLineRow>,
    shipments: Vec<ShipmentRow>,
) -> AppResult<Vec<SalesOrder>> {
    let mut shipments = shipments
        .into_iter()
        .map(Shipment::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    let mut lines: Vec<SalesOrderLine> = lines.into_iter().map(SalesOrderLine::from).collect();

    rows.into_iter()
        .map(|row| -> AppResult<SalesOrder> {
            let (own, rest): (Vec<_>, Vec<_>) =
                lines.drain(..).partition(|l| l.sales_order_id == row.id);
            lines = rest;
            let shipment = shipments
                .iter()
                .position(|s| s.sales_order_id == row.id)
                .map(|pos| shipments.swap_remove(pos));

            Ok(SalesOrder {
                id: row.id,
                client_id: row.client_id,
                warehouse_id: row.warehouse_id,
                status: row.status.parse()?,
                lines: own,
                shipment,
                created_at: row.created_at,
                reserved_at: row.reserved_at,
                shipped_at: row.shipped_at,
                delivered_at: row.delivered_at,
                canceled_at: row.canceled_at,
                updated_at: row.updated_at,
            })
        })
        .collect()
}

async fn fetch_details(
    conn: &mut PgConnection,
    rows: Vec<SalesOrderRow>,
) -> AppResult<Vec<SalesOrder>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let lines = sqlx::query_as::<_, SalesOrderLineRow>(&format!(
        "SELECT {LINE_COLUMNS} FROM sales_order_lines WHERE sales_order_id = ANY($1) ORDER BY sales_order_id, line_no"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let shipments = sqlx::query_as::<_, ShipmentRow>(&format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE sales_order_id = ANY($1)"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    assemble(rows, lines, shipments)
}

/// Load one order with lines and shipment, optionally locking the order row
async fn load_order(conn: &mut PgConnection, id: Uuid, lock: bool) -> AppResult<SalesOrder> {
    let row = sqlx::query_as::<_, SalesOrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM sales_orders WHERE id = $1 {}",
        if lock { "FOR UPDATE" } else { "" }
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("SalesOrder", id))?;

    fetch_details(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("SalesOrder", id))
}

/// Clients only see their own orders; anything else reads as missing
fn ensure_visible(caller: Caller, order: &SalesOrder) -> AppResult<()> {
    if caller.is_client() && order.client_id != caller.user_id {
        return Err(AppError::not_found("SalesOrder", order.id));
    }
    Ok(())
}

/// Backorder lines may transfer, so they need every warehouse's stock
fn reservation_scope(order: &SalesOrder) -> BookScope {
    if order.lines.iter().any(|l| l.backorder) {
        BookScope::Network
    } else {
        BookScope::Home
    }
}

fn order_product_ids(order: &SalesOrder) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = order.lines.iter().map(|l| l.product_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

async fn insert_lines(
    conn: &mut PgConnection,
    order_id: Uuid,
    lines: &[SalesOrderLineInput],
    backorders: &[bool],
) -> AppResult<()> {
    for (line_no, (line, backorder)) in lines.iter().zip(backorders).enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sales_order_lines (id, sales_order_id, line_no, product_id, quantity, unit_price, backorder)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(line_no as i32)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(*backorder)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Validate references and compute backorder flags from the home warehouse
async fn prepare_lines(conn: &mut PgConnection, input: &SalesOrderInput) -> AppResult<Vec<bool>> {
    require_active_warehouse(conn, input.warehouse_id).await?;
    let product_ids = input.product_ids();
    require_products(conn, &product_ids, true).await?;

    let home = warehouse_stock(conn, input.warehouse_id, &product_ids).await?;
    let demands: Vec<(Uuid, i32)> = input
        .lines
        .iter()
        .map(|l| (l.product_id, l.quantity))
        .collect();
    Ok(backorder_flags(&home, &demands))
}

async fn update_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: SalesOrderStatus,
    timestamp_column: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(&format!(
        "UPDATE sales_orders SET status = $2, {timestamp_column} = $3, updated_at = $3 WHERE id = $1"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl SalesOrderService {
    pub fn new(db: PgPool, lead_time: Duration) -> Self {
        Self { db, lead_time }
    }

    /// Create a sales order in CREATED status; no stock is touched
    pub async fn create(&self, caller: Caller, input: SalesOrderInput) -> AppResult<SalesOrder> {
        input.validate_all()?;

        let client_id = if caller.is_client() {
            caller.user_id
        } else {
            input
                .client_id
                .ok_or_else(|| AppError::validation("clientId", "clientId is required"))?
        };

        let mut tx = self.db.begin().await?;
        require_client(&mut tx, client_id).await?;
        let backorders = prepare_lines(&mut tx, &input).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO sales_orders (id, client_id, warehouse_id, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(client_id)
        .bind(input.warehouse_id)
        .bind(SalesOrderStatus::Created.as_str())
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, id, &input.lines, &backorders).await?;
        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        let backorder_lines = backorders.iter().filter(|b| **b).count();
        let total_amount = order.total_amount();
        tracing::info!(order_id = %id, backorder_lines, %total_amount, "sales order created");
        audit::emit(AuditEvent::SalesOrderCreated {
            order_id: id,
            client_id,
            actor: caller.user_id,
            backorder_lines,
            total_amount,
        });
        Ok(order)
    }

    /// List orders; clients only see their own
    pub async fn list(&self, caller: Caller, pagination: Pagination) -> AppResult<Vec<SalesOrder>> {
        let mut conn = self.db.acquire().await?;
        let client_filter = caller.is_client().then_some(caller.user_id);

        let rows = sqlx::query_as::<_, SalesOrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM sales_orders
            WHERE $1::UUID IS NULL OR client_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(client_filter)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&mut *conn)
        .await?;

        fetch_details(&mut conn, rows).await
    }

    pub async fn get(&self, caller: Caller, id: Uuid) -> AppResult<SalesOrder> {
        let mut conn = self.db.acquire().await?;
        let order = load_order(&mut conn, id, false).await?;
        ensure_visible(caller, &order)?;
        Ok(order)
    }

    /// Replace warehouse and lines of an order that is not reserved or shipped
    pub async fn update(
        &self,
        caller: Caller,
        id: Uuid,
        input: SalesOrderInput,
    ) -> AppResult<SalesOrder> {
        input.validate_all()?;

        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        ensure_visible(caller, &order)?;
        order.ensure_updatable()?;

        let backorders = prepare_lines(&mut tx, &input).await?;

        sqlx::query("UPDATE sales_orders SET warehouse_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(input.warehouse_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales_order_lines WHERE sales_order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut tx, id, &input.lines, &backorders).await?;

        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, "sales order updated");
        Ok(order)
    }

    /// Reserve stock for a CREATED order.
    ///
    /// When backorder lines cannot be covered from home stock and transfers, nothing is
    /// persisted and a draft purchase order for the shortfall is returned.
    pub async fn reserve(&self, caller: Caller, id: Uuid) -> AppResult<ReserveResponse> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        order.ensure_reservable()?;

        let now = Utc::now();
        let book = load_book(
            &mut tx,
            order.warehouse_id,
            &order_product_ids(&order),
            reservation_scope(&order),
            now,
        )
        .await?;

        let outcome = reserve_order(&order, book, self.lead_time)?;
        let summary = outcome.summary(&order);

        match outcome {
            ReservationOutcome::Reserved {
                changes,
                cleared_backorders,
            } => {
                apply_changes(&mut tx, &changes).await?;

                if !cleared_backorders.is_empty() {
                    sqlx::query("UPDATE sales_order_lines SET backorder = FALSE WHERE id = ANY($1)")
                        .bind(&cleared_backorders)
                        .execute(&mut *tx)
                        .await?;
                }
                update_status(&mut tx, id, SalesOrderStatus::Reserved, "reserved_at", now).await?;

                let order = load_order(&mut tx, id, false).await?;
                tx.commit().await?;

                tracing::info!(
                    order_id = %id,
                    movements = changes.movements().len(),
                    "sales order reserved"
                );
                audit::emit(AuditEvent::SalesOrderReserved {
                    order_id: id,
                    actor: caller.user_id,
                    summary,
                });
                Ok(ReserveResponse::Reserved { order })
            }
            ReservationOutcome::ReplenishmentRequired(draft) => {
                tx.rollback().await?;

                tracing::info!(
                    order_id = %id,
                    units_short = summary.units_short,
                    "reservation needs replenishment"
                );
                audit::emit(AuditEvent::ReplenishmentRequested {
                    order_id: id,
                    actor: caller.user_id,
                    draft_id: draft.id,
                    summary,
                });
                Ok(ReserveResponse::ReplenishmentRequired {
                    purchase_order: draft,
                })
            }
        }
    }

    /// Ship a RESERVED order with a carrier.
    ///
    /// Reserved stock leaves the home warehouse as OUTBOUND movements and the
    /// carrier's daily counter is booked.
    pub async fn ship(&self, caller: Caller, id: Uuid, input: ShipInput) -> AppResult<SalesOrder> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        order.ensure_shippable()?;

        let now = Utc::now();
        let mut carrier = lock_carrier(&mut tx, input.carrier_id).await?;
        carrier.book_shipment(now.date_naive())?;

        let book = load_book(
            &mut tx,
            order.warehouse_id,
            &order_product_ids(&order),
            BookScope::Home,
            now,
        )
        .await?;
        let changes = ship_order(&order, book)?;
        apply_changes(&mut tx, &changes).await?;
        save_counter(&mut tx, &carrier).await?;

        let shipment_id = Uuid::new_v4();
        let tracking_number = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO shipments (id, sales_order_id, carrier_id, tracking_number, status, shipped_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (sales_order_id) DO UPDATE
            SET carrier_id = EXCLUDED.carrier_id,
                status = EXCLUDED.status,
                shipped_at = EXCLUDED.shipped_at
            RETURNING tracking_number
            "#,
        )
        .bind(shipment_id)
        .bind(id)
        .bind(carrier.id)
        .bind(generate_tracking_number(shipment_id))
        .bind(ShipmentStatus::Shipped.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        update_status(&mut tx, id, SalesOrderStatus::Shipped, "shipped_at", now).await?;
        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, carrier = %carrier.code, "sales order shipped");
        audit::emit(AuditEvent::SalesOrderShipped {
            order_id: id,
            actor: caller.user_id,
            carrier_id: carrier.id,
            tracking_number,
        });
        Ok(order)
    }

    /// Mark a SHIPPED order and its shipment delivered
    pub async fn deliver(&self, caller: Caller, id: Uuid) -> AppResult<SalesOrder> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        order.ensure_deliverable()?;

        let now = Utc::now();
        update_status(&mut tx, id, SalesOrderStatus::Delivered, "delivered_at", now).await?;
        sqlx::query("UPDATE shipments SET status = $2, delivered_at = $3 WHERE sales_order_id = $1")
            .bind(id)
            .bind(ShipmentStatus::Delivered.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        audit::emit(AuditEvent::SalesOrderDelivered {
            order_id: id,
            actor: caller.user_id,
        });
        Ok(order)
    }

    /// Cancel a CREATED or RESERVED order, releasing its reservations
    pub async fn cancel(&self, caller: Caller, id: Uuid) -> AppResult<SalesOrder> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, id, true).await?;
        ensure_visible(caller, &order)?;
        order.ensure_cancelable()?;

        let now = Utc::now();
        let was_reserved = order.status == SalesOrderStatus::Reserved;
        if was_reserved {
            let book = load_book(
                &mut tx,
                order.warehouse_id,
                &order_product_ids(&order),
                BookScope::Home,
                now,
            )
            .await?;
            let changes = cancel_order(&order, book)?;
            apply_changes(&mut tx, &changes).await?;
        }

        update_status(&mut tx, id, SalesOrderStatus::Canceled, "canceled_at", now).await?;
        let order = load_order(&mut tx, id, false).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, was_reserved, "sales order canceled");
        audit::emit(AuditEvent::SalesOrderCanceled {
            order_id: id,
            actor: caller.user_id,
            released_reservations: was_reserved,
        });
        Ok(order)
    }
}
