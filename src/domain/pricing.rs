//! Line pricing.
//!
//! Pure functions of catalog, selection and product prices. Amounts stay at
//! full precision; callers round when they format.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::selection::{Selection, TierChoice};
use crate::domain::catalog::{ProductPrices, VariantCatalog};
use crate::domain::options::{self, FieldLabels, SelectedOption};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub unit_price: Money,
    pub line_total: Money,
    pub effective_quantity: u32,
    /// Per-unit sum of all option add-ons.
    pub extras: Money,
    pub has_discount: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_unit: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_unit: Option<Money>,
}

/// What the line itself contributes: stored quantity and the backend's last
/// computed prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineFacts {
    pub quantity: u32,
    pub persisted_unit_price: Option<Money>,
    pub persisted_line_total: Option<Money>,
}

impl LineFacts {
    pub fn quantity(quantity: u32) -> Self {
        Self { quantity, persisted_unit_price: None, persisted_line_total: None }
    }
}

impl Default for LineFacts {
    fn default() -> Self { Self::quantity(1) }
}

/// Discounted price (when flagged), then list price, then lowest price; first positive wins.
pub fn base_unit_price(prices: &ProductPrices) -> Money {
    let discounted = prices.discounted_price.filter(|_| prices.is_discounted);
    [discounted, prices.price, prices.lowest_price]
        .into_iter()
        .flatten()
        .find(Money::is_positive)
        .unwrap_or(Money::ZERO)
}

/// Sums per-unit add-ons. Options without an explicit price are matched
/// against the catalog by exact name.
pub fn extras(catalog: &VariantCatalog, options: &[SelectedOption], labels: &FieldLabels) -> Money {
    options
        .iter()
        .map(|option| option.additional_price.unwrap_or_else(|| rematch(catalog, option, labels)))
        .sum()
}

fn rematch(catalog: &VariantCatalog, option: &SelectedOption, labels: &FieldLabels) -> Money {
    let name = option.name.as_str();
    let value = option.value.as_str();
    let found = if name == labels.color {
        catalog.color(value).map(|c| c.additional_price)
    } else if name == labels.material {
        catalog.material(value).map(|m| m.additional_price)
    } else if name == labels.printing_method {
        catalog.printing_method(value).map(|p| p.base_price)
    } else if name == labels.print_location {
        catalog.print_location(value).map(|l| l.additional_price)
    } else {
        catalog.option_groups.get(name).and_then(|g| g.item(value)).map(|i| i.additional_price)
    };
    found.unwrap_or(Money::ZERO)
}

pub fn price(catalog: &VariantCatalog, selection: &Selection, prices: &ProductPrices, facts: LineFacts) -> PricingResult {
    price_with_labels(catalog, selection, prices, facts, &FieldLabels::default())
}

pub fn price_with_labels(
    catalog: &VariantCatalog,
    selection: &Selection,
    prices: &ProductPrices,
    facts: LineFacts,
    labels: &FieldLabels,
) -> PricingResult {
    let options = options::project(catalog, selection, labels);
    price_options(catalog, &options, selection.size_tier.as_ref(), prices, facts, labels)
}

/// Prices a line from its option list, which may come straight from a saved
/// cart record.
pub fn price_options(
    catalog: &VariantCatalog,
    options: &[SelectedOption],
    tier: Option<&TierChoice>,
    prices: &ProductPrices,
    facts: LineFacts,
    labels: &FieldLabels,
) -> PricingResult {
    let base_unit = base_unit_price(prices);
    let effective_quantity = tier.map(|t| t.quantity).filter(|q| *q > 0).unwrap_or(facts.quantity.max(1));
    let extras = extras(catalog, options, labels);

    let base_total = tier
        .and_then(|t| t.total.positive())
        .unwrap_or_else(|| base_unit.times(effective_quantity));
    let mut line_total = base_total + extras.times(effective_quantity);
    let mut unit_price = line_total.per_unit(effective_quantity);

    if unit_price.is_zero() {
        unit_price = facts.persisted_unit_price.unwrap_or(Money::ZERO);
    }
    if line_total.is_zero() {
        line_total = facts.persisted_line_total.unwrap_or(Money::ZERO);
    }

    let (has_discount, original_unit, discounted_unit) = match (prices.is_discounted, prices.price, prices.discounted_price) {
        (true, Some(list), Some(discounted)) if discounted.is_positive() && list > discounted => {
            (true, Some(list + extras), Some(discounted + extras))
        }
        _ => (false, None, None),
    };

    PricingResult { unit_price, line_total, effective_quantity, extras, has_discount, original_unit, discounted_unit }
}
