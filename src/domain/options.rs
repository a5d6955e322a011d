//! `selectedOptions` projection and hydration.
//!
//! The cart record stores a flat, ordered `[{name, value, additionalPrice}]`
//! list. Core fields use fixed labels; everything else is keyed by the option
//! group name. Two synthetic entries carry the tier quantity and total so a
//! reload can rebuild the tier without guessing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::aggregates::selection::{Selection, TierChoice};
use crate::domain::catalog::{LocationKind, VariantCatalog};
use crate::domain::value_objects::{Choice, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
    /// Missing on records written by older clients; pricing then re-matches
    /// the value against the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_price: Option<Money>,
}

impl SelectedOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>, additional_price: Money) -> Self {
        Self { name: name.into(), value: value.into(), additional_price: Some(additional_price) }
    }

    pub fn raw(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), additional_price: None }
    }
}

/// Fixed labels for the core fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLabels {
    pub size: String,
    pub color: String,
    pub material: String,
    pub printing_method: String,
    pub print_location: String,
    pub tier_quantity: String,
    pub tier_total: String,
    pub size_tier: String,
}

impl Default for FieldLabels {
    fn default() -> Self {
        Self {
            size: "Size".into(),
            color: "Color".into(),
            material: "Material".into(),
            printing_method: "Printing Method".into(),
            print_location: "Print Location".into(),
            tier_quantity: "Tier Quantity".into(),
            tier_total: "Tier Total".into(),
            size_tier: "Size Tier".into(),
        }
    }
}

/// Payload of the cart record's update-options call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOptionsUpdate {
    pub selected_options: Vec<SelectedOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printing_method_id: Option<String>,
    #[serde(default)]
    pub print_location_ids: Vec<String>,
    #[serde(default)]
    pub embroider_location_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl CartOptionsUpdate {
    /// Stable serialization used to skip identical writes.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Projects a selection onto the ordered backend list.
pub fn project(catalog: &VariantCatalog, selection: &Selection, labels: &FieldLabels) -> Vec<SelectedOption> {
    let mut out = Vec::new();

    if let Some(size) = selection.size.value() {
        out.push(SelectedOption::new(&labels.size, size, Money::ZERO));
        if let Some(tier) = &selection.size_tier {
            out.push(SelectedOption::new(&labels.tier_quantity, tier.quantity.to_string(), Money::ZERO));
            out.push(SelectedOption::new(&labels.tier_total, tier.total.amount().normalize().to_string(), Money::ZERO));
        }
    }
    if let Some(color) = selection.color.value() {
        let price = catalog.color(color).map(|c| c.additional_price).unwrap_or_default();
        out.push(SelectedOption::new(&labels.color, color, price));
    }
    if let Some(material) = selection.material.value() {
        let price = catalog.material(material).map(|m| m.additional_price).unwrap_or_default();
        out.push(SelectedOption::new(&labels.material, material, price));
    }
    for (group, choice) in &selection.option_groups {
        if let Some(value) = choice.value() {
            let price = catalog
                .option_groups
                .get(group)
                .and_then(|g| g.item(value))
                .map(|i| i.additional_price)
                .unwrap_or_default();
            out.push(SelectedOption::new(group, value, price));
        }
    }
    if let Some(method) = selection.printing_method.value() {
        let price = catalog.printing_method(method).map(|p| p.base_price).unwrap_or_default();
        out.push(SelectedOption::new(&labels.printing_method, method, price));
    }
    for location in &selection.print_locations {
        let price = catalog.print_location(location).map(|l| l.additional_price).unwrap_or_default();
        out.push(SelectedOption::new(&labels.print_location, location, price));
    }
    out
}

/// Builds the full update-options payload for a selection.
pub fn build_update(catalog: &VariantCatalog, selection: &Selection, labels: &FieldLabels) -> CartOptionsUpdate {
    let id_of = |found: Option<&String>| found.cloned();
    let mut update = CartOptionsUpdate {
        selected_options: project(catalog, selection, labels),
        size_id: id_of(selection.size.value().and_then(|n| catalog.size(n)).map(|s| &s.id)),
        color_id: id_of(selection.color.value().and_then(|n| catalog.color(n)).map(|c| &c.id)),
        material_id: id_of(selection.material.value().and_then(|n| catalog.material(n)).map(|m| &m.id)),
        printing_method_id: id_of(selection.printing_method.value().and_then(|n| catalog.printing_method(n)).map(|p| &p.id)),
        quantity: selection.size_tier.as_ref().map(|t| t.quantity),
        ..CartOptionsUpdate::default()
    };
    for location in selection.print_locations.iter().filter_map(|n| catalog.print_location(n)) {
        match location.kind {
            LocationKind::Print => update.print_location_ids.push(location.id.clone()),
            LocationKind::Embroidery => update.embroider_location_ids.push(location.id.clone()),
        }
    }
    update
}

/// Rebuilds a selection from a saved list. Values the catalog does not know
/// are dropped so the result only references catalog entries.
pub fn hydrate(catalog: &VariantCatalog, saved: &[SelectedOption], labels: &FieldLabels) -> Selection {
    let mut selection = Selection::empty(catalog);
    let mut tier_quantity: Option<u32> = None;
    let mut tier_total: Option<Money> = None;

    for option in saved {
        let name = option.name.as_str();
        let value = option.value.as_str();
        if name == labels.size {
            selection.size = known(catalog.size(value).is_some(), name, value);
        } else if name == labels.color {
            selection.color = known(catalog.color(value).is_some(), name, value);
        } else if name == labels.material {
            selection.material = known(catalog.material(value).is_some(), name, value);
        } else if name == labels.printing_method {
            selection.printing_method = known(catalog.printing_method(value).is_some(), name, value);
        } else if name == labels.print_location {
            if known(catalog.print_location(value).is_some(), name, value).is_selected() {
                selection.print_locations.insert(value.to_string());
            }
        } else if name == labels.tier_quantity {
            tier_quantity = value.trim().parse().ok();
        } else if name == labels.tier_total {
            tier_total = Decimal::from_str(value.trim()).ok().map(Money::new);
        } else if let Some(group) = catalog.option_groups.get(name) {
            selection.option_groups.insert(name.to_string(), known(group.item(value).is_some(), name, value));
        } else {
            tracing::debug!(name, value, "ignoring saved option with no matching field");
        }
    }

    selection.size_tier = tier_quantity
        .filter(|q| *q > 0)
        .and_then(|quantity| rebuild_tier(catalog, &selection.size, quantity, tier_total));
    selection
}

fn rebuild_tier(catalog: &VariantCatalog, size: &Choice, quantity: u32, saved_total: Option<Money>) -> Option<TierChoice> {
    let size = catalog.size(size.value()?)?;
    let saved_total = saved_total.and_then(Money::positive);
    match size.tiers.iter().find(|t| t.quantity == quantity) {
        Some(tier) => {
            let mut choice = TierChoice::from_tier(tier);
            if let Some(total) = saved_total {
                choice.total = total;
            }
            Some(choice)
        }
        None => {
            let total = saved_total?;
            Some(TierChoice { id: None, quantity, unit_price: total.per_unit(quantity), total })
        }
    }
}

fn known(found: bool, name: &str, value: &str) -> Choice {
    if found {
        Choice::chosen(value)
    } else {
        tracing::warn!(name, value, "saved value not in catalog, leaving unselected");
        Choice::Unselected
    }
}
