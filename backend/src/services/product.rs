//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{generate_sku, validate_sku, Caller, Pagination, Product, ProductStatus, ProductUsage};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::audit::{self, AuditEvent};
use crate::error::{AppError, AppResult};

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    /// Generated when absent
    #[validate(custom = "validate_sku")]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductStatusInput {
    pub status: ProductStatus,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    category: Option<String>,
    active: bool,
    bought_price: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            category: row.category,
            active: row.active,
            bought_price: row.bought_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UsageRow {
    open_sales_orders: i64,
    qty_on_hand: i64,
}

const PRODUCT_COLUMNS: &str =
    "id, sku, name, category, active, bought_price, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product, generating its SKU when none is given
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;

        let id = Uuid::new_v4();
        let sku = input.sku.unwrap_or_else(|| generate_sku(id));

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (id, sku, name, category)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&sku)
        .bind(&input.name)
        .bind(&input.category)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique(e, "sku"))?;

        tracing::info!(sku = %sku, "product created");
        Ok(row.into())
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product", id))
    }

    pub async fn get_by_sku(&self, sku: &str) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"
        ))
        .bind(sku)
        .fetch_optional(&self.db)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product", sku))
    }

    pub async fn update(&self, id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;

        sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                category = COALESCE($3, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.category)
        .fetch_optional(&self.db)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product", id))
    }

    /// Activate or deactivate a product by SKU.
    ///
    /// Deactivation is refused while open sales orders reference the product
    /// or any warehouse still holds it.
    pub async fn set_status(
        &self,
        caller: Caller,
        sku: &str,
        status: ProductStatus,
    ) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1 FOR UPDATE"
        ))
        .bind(sku)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Product", sku))?;

        if !status.is_active() {
            let usage = sqlx::query_as::<_, UsageRow>(
                r#"
                SELECT
                    (SELECT COUNT(DISTINCT so.id)
                     FROM sales_order_lines l
                     JOIN sales_orders so ON so.id = l.sales_order_id
                     WHERE l.product_id = $1 AND so.status IN ('CREATED', 'RESERVED')) AS open_sales_orders,
                    (SELECT COALESCE(SUM(qty_on_hand), 0)::BIGINT
                     FROM inventories
                     WHERE product_id = $1) AS qty_on_hand
                "#,
            )
            .bind(product.id)
            .fetch_one(&mut *tx)
            .await?;

            let usage = ProductUsage {
                open_sales_orders: usage.open_sales_orders,
                qty_on_hand: usage.qty_on_hand,
            };
            if let Some(reason) = usage.deactivation_blocker() {
                return Err(AppError::conflict("product", reason));
            }
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(status.is_active())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        audit::emit(AuditEvent::ProductStatusChanged {
            sku: row.sku.clone(),
            actor: caller.user_id,
            active: row.active,
        });
        Ok(row.into())
    }

    /// Delete a product no inventory or order line references
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM inventories WHERE product_id = $1)
                OR EXISTS(SELECT 1 FROM sales_order_lines WHERE product_id = $1)
                OR EXISTS(SELECT 1 FROM purchase_order_lines WHERE product_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if referenced {
            return Err(AppError::conflict(
                "product",
                "Product is referenced by inventory or orders",
            ));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Product", id));
        }
        Ok(())
    }
}

/// Ensure every product exists and, when `active_only` is set, is active
pub(crate) async fn require_products(
    conn: &mut sqlx::PgConnection,
    product_ids: &[Uuid],
    active_only: bool,
) -> AppResult<()> {
    let rows = sqlx::query_as::<_, (Uuid, bool)>(
        "SELECT id, active FROM products WHERE id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    for id in product_ids {
        match rows.iter().find(|(row_id, _)| row_id == id) {
            None => return Err(AppError::not_found("Product", id)),
            Some((_, false)) if active_only => {
                return Err(AppError::validation(
                    "productId",
                    format!("Product {id} is inactive"),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}
