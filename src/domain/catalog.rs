//! Variant catalog and its loader.
//!
//! A [`VariantCatalog`] is built once per product view and never mutated. The
//! [`CatalogLoader`] either reuses a product snapshot the caller already holds
//! (for instance the product embedded in a cart line) or fetches it from a
//! [`CatalogSource`]. A failed load is an error; there is no partial catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::selection::Selection;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeTier {
    pub id: String,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Money>,
}

impl SizeTier {
    /// Declared total when positive, else `quantity * unit_price`.
    pub fn total(&self) -> Money {
        self.total_price
            .and_then(Money::positive)
            .unwrap_or_else(|| self.unit_price.times(self.quantity))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tiers: Vec<SizeTier>,
}

impl SizeOption {
    pub fn has_tiers(&self) -> bool { !self.tiers.is_empty() }
    pub fn tier(&self, id: &str) -> Option<&SizeTier> { self.tiers.iter().find(|t| t.id == id) }
}

/// A named value with a per-unit add-on; used for colors and materials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub additional_price: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionItem {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub additional_price: Money,
    #[serde(default)]
    pub is_required: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintingMethod {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub base_price: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    #[default]
    Print,
    #[serde(alias = "embroider")]
    Embroidery,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintLocation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub additional_price: Money,
}

/// One catalog-declared option group.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionGroup {
    name: String,
    required: bool,
    items: Vec<OptionItem>,
}

impl OptionGroup {
    pub fn name(&self) -> &str { &self.name }
    /// A group is required when any of its items is.
    pub fn is_required(&self) -> bool { self.required }
    pub fn items(&self) -> &[OptionItem] { &self.items }
    pub fn item(&self, value: &str) -> Option<&OptionItem> { self.items.iter().find(|i| i.value == value) }
}

/// Validated mapping from group name to its items, built once at load time.
/// Groups iterate in name order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<OptionItem>>", into = "BTreeMap<String, Vec<OptionItem>>")]
pub struct OptionGroups {
    groups: Vec<OptionGroup>,
}

impl OptionGroups {
    pub fn build(raw: BTreeMap<String, Vec<OptionItem>>) -> Result<Self, CatalogError> {
        let mut groups = Vec::with_capacity(raw.len());
        for (name, items) in raw {
            if name.trim().is_empty() {
                return Err(CatalogError::Invalid("option group with blank name".into()));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = items.iter().find(|i| !seen.insert(i.value.as_str())) {
                return Err(CatalogError::Invalid(format!("duplicate value '{}' in option group '{}'", dup.value, name)));
            }
            let required = items.iter().any(|i| i.is_required);
            groups.push(OptionGroup { name, required, items });
        }
        Ok(Self { groups })
    }

    pub fn get(&self, name: &str) -> Option<&OptionGroup> { self.groups.iter().find(|g| g.name == name) }
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }
    pub fn iter(&self) -> impl Iterator<Item = &OptionGroup> { self.groups.iter() }
    pub fn len(&self) -> usize { self.groups.len() }
    pub fn is_empty(&self) -> bool { self.groups.is_empty() }
}

impl TryFrom<BTreeMap<String, Vec<OptionItem>>> for OptionGroups {
    type Error = CatalogError;
    fn try_from(raw: BTreeMap<String, Vec<OptionItem>>) -> Result<Self, Self::Error> { Self::build(raw) }
}

impl From<OptionGroups> for BTreeMap<String, Vec<OptionItem>> {
    fn from(groups: OptionGroups) -> Self {
        groups.groups.into_iter().map(|g| (g.name, g.items)).collect()
    }
}

/// Every configurable attribute of one product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantCatalog {
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
    #[serde(default)]
    pub colors: Vec<PricedOption>,
    #[serde(default)]
    pub materials: Vec<PricedOption>,
    #[serde(default)]
    pub option_groups: OptionGroups,
    #[serde(default)]
    pub printing_methods: Vec<PrintingMethod>,
    #[serde(default)]
    pub print_locations: Vec<PrintLocation>,
}

impl VariantCatalog {
    pub fn size(&self, name: &str) -> Option<&SizeOption> { self.sizes.iter().find(|s| s.name == name) }
    pub fn color(&self, name: &str) -> Option<&PricedOption> { self.colors.iter().find(|c| c.name == name) }
    pub fn material(&self, name: &str) -> Option<&PricedOption> { self.materials.iter().find(|m| m.name == name) }
    pub fn printing_method(&self, name: &str) -> Option<&PrintingMethod> {
        self.printing_methods.iter().find(|p| p.name == name)
    }
    pub fn print_location(&self, name: &str) -> Option<&PrintLocation> {
        self.print_locations.iter().find(|l| l.name == name)
    }
}

/// Price fields of a product, as delivered by the catalog source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrices {
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub discounted_price: Option<Money>,
    #[serde(default)]
    pub lowest_price: Option<Money>,
    #[serde(default)]
    pub is_discounted: bool,
}

/// A product as handed around by the storefront: identity, prices and catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prices: ProductPrices,
    #[serde(default)]
    pub catalog: VariantCatalog,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("Catalog source failed: {0}")]
    Source(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Snapshot is for product {got}, expected {expected}")]
    Mismatch { expected: ProductId, got: ProductId },
}

/// Product-by-id lookup.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_product(&self, id: &ProductId) -> Result<ProductSnapshot, CatalogError>;
}

/// Result of a successful load: the immutable product plus the initial
/// selection with every option group set to the sentinel.
#[derive(Clone, Debug)]
pub struct LoadedCatalog {
    pub product: Arc<ProductSnapshot>,
    pub initial_selection: Selection,
}

impl LoadedCatalog {
    pub fn new(product: ProductSnapshot) -> Self {
        let initial_selection = Selection::empty(&product.catalog);
        Self { product: Arc::new(product), initial_selection }
    }

    pub fn catalog(&self) -> &VariantCatalog { &self.product.catalog }
}

pub struct CatalogLoader {
    source: Arc<dyn CatalogSource>,
}

impl CatalogLoader {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self { Self { source } }

    pub async fn load(&self, id: &ProductId, snapshot: Option<ProductSnapshot>) -> Result<LoadedCatalog, CatalogError> {
        let product = match snapshot {
            Some(snapshot) if &snapshot.id != id => {
                return Err(CatalogError::Mismatch { expected: id.clone(), got: snapshot.id });
            }
            Some(snapshot) => {
                tracing::debug!(product_id = %id, "using product snapshot");
                snapshot
            }
            None => {
                tracing::debug!(product_id = %id, "fetching catalog");
                self.source.fetch_product(id).await.map_err(|e| {
                    tracing::warn!(product_id = %id, error = %e, "catalog load failed");
                    e
                })?
            }
        };
        Ok(LoadedCatalog::new(product))
    }
}
