//! Postgres adapters over the `products`, `cart_items` and `checkout_handoffs` tables.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::cart::{CartLineItem, CartRepository};
use crate::domain::catalog::{CatalogError, CatalogSource, ProductPrices, ProductSnapshot, VariantCatalog};
use crate::domain::options::{CartOptionsUpdate, SelectedOption};
use crate::domain::summary::{handoff_key, CartSummary, CheckoutHandoff};
use crate::domain::value_objects::{CartLineId, Money, ProductId, SessionId};
use crate::sync::CartRecordApi;
use crate::StoreError;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price: Option<Decimal>,
    discounted_price: Option<Decimal>,
    lowest_price: Option<Decimal>,
    is_discounted: bool,
    catalog: Json<VariantCatalog>,
}

impl From<ProductRow> for ProductSnapshot {
    fn from(row: ProductRow) -> Self {
        ProductSnapshot {
            id: ProductId::new(row.id),
            name: row.name,
            prices: ProductPrices {
                price: row.price.map(Money::new),
                discounted_price: row.discounted_price.map(Money::new),
                lowest_price: row.lowest_price.map(Money::new),
                is_discounted: row.is_discounted,
            },
            catalog: row.catalog.0,
        }
    }
}

#[derive(Clone)]
pub struct PgCatalogSource {
    db: PgPool,
}

impl PgCatalogSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogSource for PgCatalogSource {
    async fn fetch_product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, discounted_price, lowest_price, is_discounted, catalog FROM products WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(|e| CatalogError::Source(e.to_string()))?
        .map(ProductSnapshot::from)
        .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

/// A cart line joined with its product, when the product still exists.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: String,
    product_id: String,
    quantity: i32,
    selected_options: Json<Vec<SelectedOption>>,
    options_update: Option<Json<CartOptionsUpdate>>,
    unit_price: Option<Decimal>,
    line_total: Option<Decimal>,
    product_name: Option<String>,
    price: Option<Decimal>,
    discounted_price: Option<Decimal>,
    lowest_price: Option<Decimal>,
    is_discounted: Option<bool>,
    catalog: Option<Json<VariantCatalog>>,
}

impl From<CartItemRow> for CartLineItem {
    fn from(row: CartItemRow) -> Self {
        let product_id = ProductId::new(row.product_id);
        let product = row.catalog.map(|catalog| ProductSnapshot {
            id: product_id.clone(),
            name: row.product_name.unwrap_or_default(),
            prices: ProductPrices {
                price: row.price.map(Money::new),
                discounted_price: row.discounted_price.map(Money::new),
                lowest_price: row.lowest_price.map(Money::new),
                is_discounted: row.is_discounted.unwrap_or(false),
            },
            catalog: catalog.0,
        });
        CartLineItem {
            id: CartLineId::new(row.id),
            product_id,
            quantity: u32::try_from(row.quantity).unwrap_or(0),
            selected_options: row.selected_options.0,
            unit_price: row.unit_price.map(Money::new),
            line_total: row.line_total.map(Money::new),
            product,
            options_update: row.options_update.map(|u| u.0),
        }
    }
}

const CART_ITEM_SELECT: &str = "SELECT c.id, c.product_id, c.quantity, c.selected_options, c.options_update, \
     c.unit_price, c.line_total, p.name AS product_name, p.price, p.discounted_price, p.lowest_price, \
     p.is_discounted, p.catalog \
     FROM cart_items c LEFT JOIN products p ON p.id = c.product_id";

#[derive(Clone)]
pub struct PgCartRepository {
    db: PgPool,
}

impl PgCartRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn quantity_column(quantity: u32) -> Result<i32, StoreError> {
    match i32::try_from(quantity) {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(StoreError::InvalidQuantity(quantity)),
    }
}

#[async_trait]
impl CartRecordApi for PgCartRepository {
    /// Stores the options and clears the stale backend prices; a positive
    /// quantity in the payload replaces the line quantity.
    async fn update_options(&self, line: &CartLineId, update: &CartOptionsUpdate) -> Result<(), StoreError> {
        let quantity = update.quantity.filter(|q| *q > 0).map(quantity_column).transpose()?;
        let result = sqlx::query(
            "UPDATE cart_items SET selected_options = $2, options_update = $3, quantity = COALESCE($4, quantity), \
             unit_price = NULL, line_total = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(line.as_str())
        .bind(Json(&update.selected_options))
        .bind(Json(update))
        .bind(quantity)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::LineNotFound(line.clone()));
        }
        Ok(())
    }

    async fn update_quantity(&self, line: &CartLineId, quantity: u32) -> Result<(), StoreError> {
        let quantity = quantity_column(quantity)?;
        let result = sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(line.as_str())
            .bind(quantity)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::LineNotFound(line.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn lines(&self, session: &SessionId) -> Result<Vec<CartLineItem>, StoreError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "{CART_ITEM_SELECT} WHERE c.session_id = $1 ORDER BY c.created_at, c.id"
        ))
        .bind(session.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(CartLineItem::from).collect())
    }

    async fn line(&self, id: &CartLineId) -> Result<CartLineItem, StoreError> {
        sqlx::query_as::<_, CartItemRow>(&format!("{CART_ITEM_SELECT} WHERE c.id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.db)
            .await?
            .map(CartLineItem::from)
            .ok_or_else(|| StoreError::LineNotFound(id.clone()))
    }

    async fn insert_line(&self, session: &SessionId, line: CartLineItem) -> Result<CartLineId, StoreError> {
        let quantity = quantity_column(line.quantity)?;
        let id = if line.id.as_str().is_empty() { CartLineId::new(Uuid::now_v7().to_string()) } else { line.id.clone() };
        sqlx::query(
            "INSERT INTO cart_items (id, session_id, product_id, quantity, selected_options, options_update, \
             unit_price, line_total, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())",
        )
        .bind(id.as_str())
        .bind(session.as_str())
        .bind(line.product_id.as_str())
        .bind(quantity)
        .bind(Json(&line.selected_options))
        .bind(line.options_update.as_ref().map(Json))
        .bind(line.unit_price.map(|m| m.amount()))
        .bind(line.line_total.map(|m| m.amount()))
        .execute(&self.db)
        .await?;
        tracing::debug!(line_id = %id, session = %session, "cart line inserted");
        Ok(id)
    }
}

#[derive(Clone)]
pub struct PgCheckoutHandoff {
    db: PgPool,
}

impl PgCheckoutHandoff {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckoutHandoff for PgCheckoutHandoff {
    async fn hand_off(&self, session: &SessionId, summary: &CartSummary) -> Result<String, StoreError> {
        let key = handoff_key(session);
        sqlx::query(
            "INSERT INTO checkout_handoffs (key, session_id, summary, created_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (key) DO UPDATE SET summary = EXCLUDED.summary, created_at = NOW()",
        )
        .bind(&key)
        .bind(session.as_str())
        .bind(Json(summary))
        .execute(&self.db)
        .await?;
        Ok(key)
    }

    async fn fetch(&self, session: &SessionId) -> Result<CartSummary, StoreError> {
        let row: Option<(Json<CartSummary>,)> = sqlx::query_as("SELECT summary FROM checkout_handoffs WHERE key = $1")
            .bind(handoff_key(session))
            .fetch_optional(&self.db)
            .await?;
        row.map(|(summary,)| summary.0).ok_or_else(|| StoreError::HandoffNotFound(session.clone()))
    }
}
