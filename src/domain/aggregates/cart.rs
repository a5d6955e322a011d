//! Cart Aggregate

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::ProductSnapshot;
use crate::domain::options::{CartOptionsUpdate, SelectedOption};
use crate::domain::value_objects::{CartLineId, Money, ProductId, SessionId};
use crate::sync::CartRecordApi;
use crate::StoreError;

/// One configured line as the cart record stores it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    /// Last unit price the backend computed, used when local pricing comes out zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_total: Option<Money>,
    /// Embedded product, when the cart API returns it with the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_update: Option<CartOptionsUpdate>,
}

impl CartLineItem {
    pub fn new(id: CartLineId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            id, product_id, quantity, selected_options: vec![], unit_price: None, line_total: None,
            product: None, options_update: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectedOption>) -> Self { self.selected_options = options; self }
    pub fn with_product(mut self, product: ProductSnapshot) -> Self { self.product = Some(product); self }
}

#[derive(Clone, Debug)]
pub struct Cart {
    session_id: SessionId,
    lines: Vec<CartLineItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id, lines: vec![], created_at: Utc::now(), updated_at: Utc::now() }
    }

    pub fn session_id(&self) -> &SessionId { &self.session_id }
    pub fn lines(&self) -> &[CartLineItem] { &self.lines }
    pub fn line(&self, id: &CartLineId) -> Option<&CartLineItem> { self.lines.iter().find(|l| &l.id == id) }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Adds a line, generating an id when the caller passes an empty one.
    pub fn add_line(&mut self, mut line: CartLineItem) -> CartLineId {
        if line.id.as_str().is_empty() {
            line.id = CartLineId::new(Uuid::now_v7().to_string());
        }
        let id = line.id.clone();
        self.lines.push(line);
        self.touch();
        id
    }

    /// Stores the new options; backend-computed prices are stale afterwards.
    pub fn apply_options_update(&mut self, id: &CartLineId, update: &CartOptionsUpdate) -> Result<(), CartError> {
        let line = self.line_mut(id)?;
        line.selected_options = update.selected_options.clone();
        if let Some(quantity) = update.quantity.filter(|q| *q > 0) {
            line.quantity = quantity;
        }
        line.options_update = Some(update.clone());
        line.unit_price = None;
        line.line_total = None;
        self.touch();
        Ok(())
    }

    pub fn set_quantity(&mut self, id: &CartLineId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        self.line_mut(id)?.quantity = quantity;
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, id: &CartLineId) -> Result<(), CartError> {
        let before = self.lines.len();
        self.lines.retain(|l| &l.id != id);
        if self.lines.len() == before { return Err(CartError::LineNotFound); }
        self.touch();
        Ok(())
    }

    fn line_mut(&mut self, id: &CartLineId) -> Result<&mut CartLineItem, CartError> {
        self.lines.iter_mut().find(|l| &l.id == id).ok_or(CartError::LineNotFound)
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq)] pub enum CartError { LineNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::LineNotFound => write!(f, "Line not found"), Self::InvalidQuantity => write!(f, "Invalid quantity") }
    }
}

/// Server-side cart storage: the update calls plus reads.
#[async_trait]
pub trait CartRepository: CartRecordApi {
    async fn lines(&self, session: &SessionId) -> Result<Vec<CartLineItem>, StoreError>;
    async fn line(&self, id: &CartLineId) -> Result<CartLineItem, StoreError>;
    async fn insert_line(&self, session: &SessionId, line: CartLineItem) -> Result<CartLineId, StoreError>;
}
