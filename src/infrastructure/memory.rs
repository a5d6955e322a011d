//! In-memory adapters.
//!
//! Intended for tests/dev. Locks are never held across an await point.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::aggregates::cart::{Cart, CartError, CartLineItem, CartRepository};
use crate::domain::catalog::{CatalogError, CatalogSource, ProductSnapshot};
use crate::domain::options::CartOptionsUpdate;
use crate::domain::summary::{handoff_key, CartSummary, CheckoutHandoff};
use crate::domain::value_objects::{CartLineId, ProductId, SessionId};
use crate::sync::CartRecordApi;
use crate::StoreError;

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, ProductSnapshot>>,
}

impl InMemoryCatalog {
    pub fn with_products(products: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { products: RwLock::new(products) }
    }

    pub fn insert(&self, product: ProductSnapshot) -> Result<(), CatalogError> {
        let mut products = self.products.write().map_err(|_| CatalogError::Source("lock poisoned".to_string()))?;
        products.insert(product.id.clone(), product);
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn fetch_product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError> {
        let products = self.products.read().map_err(|_| CatalogError::Source("lock poisoned".to_string()))?;
        products.get(id).cloned().ok_or_else(|| CatalogError::NotFound(id.clone()))
    }
}

#[derive(Debug, Default)]
struct CartTables {
    carts: HashMap<SessionId, Cart>,
    /// line id -> owning session
    index: HashMap<CartLineId, SessionId>,
}

impl CartTables {
    fn cart_of(&mut self, line: &CartLineId) -> Result<&mut Cart, StoreError> {
        let session = self.index.get(line).ok_or_else(|| StoreError::LineNotFound(line.clone()))?;
        self.carts.get_mut(session).ok_or_else(|| StoreError::LineNotFound(line.clone()))
    }
}

fn cart_error(line: &CartLineId, quantity: u32, e: CartError) -> StoreError {
    match e {
        CartError::LineNotFound => StoreError::LineNotFound(line.clone()),
        CartError::InvalidQuantity => StoreError::InvalidQuantity(quantity),
    }
}

/// Session-keyed carts.
#[derive(Debug, Default)]
pub struct InMemoryCartRepository {
    tables: RwLock<CartTables>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRecordApi for InMemoryCartRepository {
    async fn update_options(&self, line: &CartLineId, update: &CartOptionsUpdate) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables
            .cart_of(line)?
            .apply_options_update(line, update)
            .map_err(|e| cart_error(line, update.quantity.unwrap_or_default(), e))
    }

    async fn update_quantity(&self, line: &CartLineId, quantity: u32) -> Result<(), StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables.cart_of(line)?.set_quantity(line, quantity).map_err(|e| cart_error(line, quantity, e))
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn lines(&self, session: &SessionId) -> Result<Vec<CartLineItem>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.carts.get(session).map(|c| c.lines().to_vec()).unwrap_or_default())
    }

    async fn line(&self, id: &CartLineId) -> Result<CartLineItem, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        tables
            .index
            .get(id)
            .and_then(|session| tables.carts.get(session))
            .and_then(|cart| cart.line(id))
            .cloned()
            .ok_or_else(|| StoreError::LineNotFound(id.clone()))
    }

    async fn insert_line(&self, session: &SessionId, line: CartLineItem) -> Result<CartLineId, StoreError> {
        if line.quantity == 0 {
            return Err(StoreError::InvalidQuantity(0));
        }
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let id = tables.carts.entry(session.clone()).or_insert_with(|| Cart::new(session.clone())).add_line(line);
        tables.index.insert(id.clone(), session.clone());
        Ok(id)
    }
}

/// Checkout summaries, stored serialized under their session key.
#[derive(Debug, Default)]
pub struct InMemoryCheckoutHandoff {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCheckoutHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutHandoff for InMemoryCheckoutHandoff {
    async fn hand_off(&self, session: &SessionId, summary: &CartSummary) -> Result<String, StoreError> {
        let key = handoff_key(session);
        let payload = serde_json::to_string(summary)?;
        self.entries.write().map_err(|_| poisoned())?.insert(key.clone(), payload);
        Ok(key)
    }

    async fn fetch(&self, session: &SessionId) -> Result<CartSummary, StoreError> {
        let payload = {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            entries.get(&handoff_key(session)).cloned()
        };
        let payload = payload.ok_or_else(|| StoreError::HandoffNotFound(session.clone()))?;
        Ok(serde_json::from_str(&payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::SelectedOption;
    use crate::domain::summary::summarize;
    use crate::domain::value_objects::Money;

    fn product(id: &str) -> ProductSnapshot {
        serde_json::from_value(serde_json::json!({ "id": id, "name": "Mug", "prices": { "price": 12.5 } })).unwrap()
    }

    #[tokio::test]
    async fn test_catalog_lookup() {
        let catalog = InMemoryCatalog::with_products([product("mug")]);
        assert_eq!(catalog.fetch_product(&"mug".into()).await.unwrap().name, "Mug");
        assert_eq!(
            catalog.fetch_product(&"cap".into()).await.unwrap_err(),
            CatalogError::NotFound("cap".into())
        );
        catalog.insert(product("cap")).unwrap();
        assert!(catalog.fetch_product(&"cap".into()).await.is_ok());
    }

    #[tokio::test]
    async fn test_cart_record_updates() {
        let repo = InMemoryCartRepository::new();
        let session = SessionId::from("sess-1");
        let id = repo.insert_line(&session, CartLineItem::new(CartLineId::new(""), "mug".into(), 1)).await.unwrap();

        let update = CartOptionsUpdate {
            selected_options: vec![SelectedOption::new("Color", "Red", Money::from(5))],
            ..Default::default()
        };
        repo.update_options(&id, &update).await.unwrap();
        repo.update_quantity(&id, 3).await.unwrap();

        let line = repo.line(&id).await.unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.options_update, Some(update));
        assert_eq!(repo.lines(&session).await.unwrap().len(), 1);
        assert!(repo.lines(&"other".into()).await.unwrap().is_empty());

        assert!(matches!(repo.update_quantity(&id, 0).await, Err(StoreError::InvalidQuantity(0))));
        let missing = CartLineId::from("nope");
        assert!(matches!(repo.update_quantity(&missing, 2).await, Err(StoreError::LineNotFound(_))));
    }

    #[tokio::test]
    async fn test_handoff_round_trip() {
        let handoff = InMemoryCheckoutHandoff::new();
        let session = SessionId::from("sess-9");
        assert!(matches!(handoff.fetch(&session).await, Err(StoreError::HandoffNotFound(_))));

        let line = CartLineItem::new("l1".into(), "mug".into(), 2).with_product(product("mug"));
        let summary = summarize(&[line]);
        let key = handoff.hand_off(&session, &summary).await.unwrap();
        assert_eq!(key, "checkout:sess-9");

        let stored = handoff.fetch(&session).await.unwrap();
        assert_eq!(stored.subtotal, Money::from(25));
        assert_eq!(stored.item_count, 2);
    }
}
