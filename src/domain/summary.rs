//! Cart-wide pricing summary and the checkout handoff.
//!
//! Checkout displays exactly the summary it is handed; coupons, shipping and
//! tax are layered on by the checkout step, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::CartLineItem;
use crate::domain::catalog::{ProductPrices, VariantCatalog};
use crate::domain::options::{self, FieldLabels, SelectedOption};
use crate::domain::pricing::{self, LineFacts, PricingResult};
use crate::domain::value_objects::{CartLineId, Money, ProductId, SessionId};
use crate::StoreError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSummary {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    pub selected_options: Vec<SelectedOption>,
    pub pricing: PricingResult,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub subtotal: Money,
    pub item_count: u64,
    pub lines: Vec<LineSummary>,
    pub generated_at: DateTime<Utc>,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

pub fn summarize(lines: &[CartLineItem]) -> CartSummary {
    summarize_with_labels(lines, &FieldLabels::default())
}

/// Prices every line from its saved options. Lines without an embedded
/// product price against an empty catalog and fall back to backend values.
pub fn summarize_with_labels(lines: &[CartLineItem], labels: &FieldLabels) -> CartSummary {
    let empty_catalog = VariantCatalog::default();
    let no_prices = ProductPrices::default();

    let lines: Vec<LineSummary> = lines
        .iter()
        .map(|line| {
            let (catalog, prices, name) = match &line.product {
                Some(product) => (&product.catalog, &product.prices, product.name.clone()),
                None => (&empty_catalog, &no_prices, String::new()),
            };
            let tier = options::hydrate(catalog, &line.selected_options, labels).size_tier;
            let facts = LineFacts {
                quantity: line.quantity,
                persisted_unit_price: line.unit_price,
                persisted_line_total: line.line_total,
            };
            LineSummary {
                line_id: line.id.clone(),
                product_id: line.product_id.clone(),
                product_name: name,
                selected_options: line.selected_options.clone(),
                pricing: pricing::price_options(catalog, &line.selected_options, tier.as_ref(), prices, facts, labels),
            }
        })
        .collect();

    CartSummary {
        subtotal: lines.iter().map(|l| l.pricing.line_total).sum(),
        item_count: lines.iter().map(|l| u64::from(l.pricing.effective_quantity)).sum(),
        lines,
        generated_at: Utc::now(),
    }
}

/// Session-scoped key the checkout step reads the summary from.
pub fn handoff_key(session: &SessionId) -> String {
    format!("checkout:{}", session)
}

#[async_trait]
pub trait CheckoutHandoff: Send + Sync {
    /// Stores the summary under the session's key and returns the key.
    async fn hand_off(&self, session: &SessionId, summary: &CartSummary) -> Result<String, StoreError>;
    async fn fetch(&self, session: &SessionId) -> Result<CartSummary, StoreError>;
}
