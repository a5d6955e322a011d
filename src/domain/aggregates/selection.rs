//! Selection Aggregate
//!
//! A [`Selection`] is an immutable value; the [`SelectionStore`] swaps it out
//! wholesale on every user mutation so validation and pricing always see one
//! consistent state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::aggregates::cart::CartLineItem;
use crate::domain::catalog::{LoadedCatalog, ProductSnapshot, SizeTier, VariantCatalog};
use crate::domain::options::{self, FieldLabels};
use crate::domain::value_objects::{CartLineId, Choice, Money};

/// The tier chosen for the selected size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChoice {
    /// Absent when the tier was rebuilt from saved values the catalog no longer has.
    pub id: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl TierChoice {
    pub fn from_tier(tier: &SizeTier) -> Self {
        Self { id: Some(tier.id.clone()), quantity: tier.quantity, unit_price: tier.unit_price, total: tier.total() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub size: Choice,
    #[serde(default)]
    pub color: Choice,
    #[serde(default)]
    pub material: Choice,
    #[serde(default)]
    pub option_groups: BTreeMap<String, Choice>,
    #[serde(default)]
    pub printing_method: Choice,
    #[serde(default)]
    pub print_locations: BTreeSet<String>,
    #[serde(default)]
    pub size_tier: Option<TierChoice>,
}

impl Selection {
    /// All fields unselected, one sentinel entry per declared option group.
    pub fn empty(catalog: &VariantCatalog) -> Self {
        Self {
            option_groups: catalog.option_groups.iter().map(|g| (g.name().to_string(), Choice::Unselected)).collect(),
            ..Self::default()
        }
    }

    pub fn group(&self, name: &str) -> &Choice {
        self.option_groups.get(name).unwrap_or(&Choice::Unselected)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorePhase {
    #[default]
    Uninitialized,
    Hydrating,
    Ready,
    Mutated,
    Persisting,
    Error,
}

/// Field handle for [`SelectionStore::clear`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionField {
    Size,
    Tier,
    Color,
    Material,
    OptionGroup(String),
    PrintingMethod,
    PrintLocations,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Selection cannot change while {0:?}")]
    NotMutable(StorePhase),

    #[error("No catalog loaded")]
    NoCatalog,

    #[error("Unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Unknown option group: {0}")]
    UnknownGroup(String),

    #[error("Size {size} has no tier {tier}")]
    UnknownTier { size: String, tier: String },

    #[error("A tier needs a selected size")]
    TierWithoutSize,
}

/// Holds the in-progress choices for one configurable line.
#[derive(Clone, Debug)]
pub struct SelectionStore {
    line_id: Option<CartLineId>,
    labels: FieldLabels,
    product: Option<Arc<ProductSnapshot>>,
    selection: Selection,
    phase: StorePhase,
    revision: u64,
    unsaved: bool,
    quantity: u32,
}

impl SelectionStore {
    pub fn new(line_id: Option<CartLineId>) -> Self {
        Self {
            line_id,
            labels: FieldLabels::default(),
            product: None,
            selection: Selection::default(),
            phase: StorePhase::Uninitialized,
            revision: 0,
            unsaved: false,
            quantity: 1,
        }
    }

    pub fn with_labels(mut self, labels: FieldLabels) -> Self { self.labels = labels; self }

    pub fn line_id(&self) -> Option<&CartLineId> { self.line_id.as_ref() }
    pub fn labels(&self) -> &FieldLabels { &self.labels }
    pub fn product(&self) -> Option<&Arc<ProductSnapshot>> { self.product.as_ref() }
    pub fn catalog(&self) -> Option<&VariantCatalog> { self.product.as_deref().map(|p| &p.catalog) }
    pub fn selection(&self) -> &Selection { &self.selection }
    pub fn phase(&self) -> StorePhase { self.phase }
    pub fn revision(&self) -> u64 { self.revision }
    pub fn has_unsaved_changes(&self) -> bool { self.unsaved }
    /// Stored line quantity; the tier quantity overrides it for pricing.
    pub fn quantity(&self) -> u32 { self.quantity }

    /// Takes a freshly loaded catalog, rehydrating from `saved` when the line
    /// already exists in the cart.
    pub fn attach(&mut self, loaded: LoadedCatalog, saved: Option<&CartLineItem>) -> Result<(), SelectionError> {
        match saved {
            Some(line) => {
                self.begin_hydration(loaded, line);
                self.complete_hydration()
            }
            None => {
                self.product = Some(loaded.product);
                self.selection = loaded.initial_selection;
                self.phase = StorePhase::Ready;
                Ok(())
            }
        }
    }

    pub fn begin_hydration(&mut self, loaded: LoadedCatalog, saved: &CartLineItem) {
        self.phase = StorePhase::Hydrating;
        self.selection = options::hydrate(loaded.catalog(), &saved.selected_options, &self.labels);
        self.quantity = saved.quantity.max(1);
        self.product = Some(loaded.product);
        self.unsaved = false;
    }

    pub fn complete_hydration(&mut self) -> Result<(), SelectionError> {
        if self.phase != StorePhase::Hydrating {
            return Err(SelectionError::NotMutable(self.phase));
        }
        self.phase = StorePhase::Ready;
        Ok(())
    }

    pub fn select_size(&mut self, name: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        product.catalog.size(name).ok_or_else(|| unknown("size", name))?;
        self.replace(Selection { size: Choice::chosen(name), size_tier: None, ..self.selection.clone() });
        Ok(())
    }

    pub fn select_tier(&mut self, tier_id: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        let size_name = self.selection.size.value().ok_or(SelectionError::TierWithoutSize)?;
        let size = product.catalog.size(size_name).ok_or_else(|| unknown("size", size_name))?;
        let tier = size
            .tier(tier_id)
            .ok_or_else(|| SelectionError::UnknownTier { size: size.name.clone(), tier: tier_id.to_string() })?;
        self.replace(Selection { size_tier: Some(TierChoice::from_tier(tier)), ..self.selection.clone() });
        Ok(())
    }

    pub fn select_color(&mut self, name: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        product.catalog.color(name).ok_or_else(|| unknown("color", name))?;
        self.replace(Selection { color: Choice::chosen(name), ..self.selection.clone() });
        Ok(())
    }

    pub fn select_material(&mut self, name: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        product.catalog.material(name).ok_or_else(|| unknown("material", name))?;
        self.replace(Selection { material: Choice::chosen(name), ..self.selection.clone() });
        Ok(())
    }

    pub fn select_option(&mut self, group: &str, value: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        let declared = product.catalog.option_groups.get(group).ok_or_else(|| SelectionError::UnknownGroup(group.to_string()))?;
        declared.item(value).ok_or_else(|| unknown("option", value))?;
        let mut option_groups = self.selection.option_groups.clone();
        option_groups.insert(group.to_string(), Choice::chosen(value));
        self.replace(Selection { option_groups, ..self.selection.clone() });
        Ok(())
    }

    pub fn select_printing_method(&mut self, name: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        product.catalog.printing_method(name).ok_or_else(|| unknown("printing method", name))?;
        self.replace(Selection { printing_method: Choice::chosen(name), ..self.selection.clone() });
        Ok(())
    }

    /// Adds the location if absent, removes it otherwise.
    pub fn toggle_print_location(&mut self, name: &str) -> Result<(), SelectionError> {
        let product = self.mutable_product()?;
        product.catalog.print_location(name).ok_or_else(|| unknown("print location", name))?;
        let mut print_locations = self.selection.print_locations.clone();
        if !print_locations.remove(name) {
            print_locations.insert(name.to_string());
        }
        self.replace(Selection { print_locations, ..self.selection.clone() });
        Ok(())
    }

    pub fn clear(&mut self, field: SelectionField) -> Result<(), SelectionError> {
        self.mutable_product()?;
        let current = self.selection.clone();
        let next = match field {
            SelectionField::Size => Selection { size: Choice::Unselected, size_tier: None, ..current },
            SelectionField::Tier => Selection { size_tier: None, ..current },
            SelectionField::Color => Selection { color: Choice::Unselected, ..current },
            SelectionField::Material => Selection { material: Choice::Unselected, ..current },
            SelectionField::OptionGroup(group) => {
                if !current.option_groups.contains_key(&group) {
                    return Err(SelectionError::UnknownGroup(group));
                }
                let mut option_groups = current.option_groups.clone();
                option_groups.insert(group, Choice::Unselected);
                Selection { option_groups, ..current }
            }
            SelectionField::PrintingMethod => Selection { printing_method: Choice::Unselected, ..current },
            SelectionField::PrintLocations => Selection { print_locations: BTreeSet::new(), ..current },
        };
        self.replace(next);
        Ok(())
    }

    pub fn mark_persisting(&mut self, revision: u64) {
        if revision == self.revision && matches!(self.phase, StorePhase::Mutated | StorePhase::Error) {
            self.phase = StorePhase::Persisting;
        }
    }

    /// Clears the unsaved flag unless the user changed something after `revision`.
    pub fn mark_persisted(&mut self, revision: u64) {
        if revision == self.revision && matches!(self.phase, StorePhase::Mutated | StorePhase::Persisting | StorePhase::Error) {
            self.phase = StorePhase::Ready;
            self.unsaved = false;
        }
    }

    pub fn mark_persist_failed(&mut self, revision: u64) {
        if revision == self.revision && matches!(self.phase, StorePhase::Mutated | StorePhase::Persisting) {
            self.phase = StorePhase::Error;
        }
    }

    fn mutable_product(&self) -> Result<Arc<ProductSnapshot>, SelectionError> {
        match self.phase {
            StorePhase::Uninitialized | StorePhase::Hydrating => Err(SelectionError::NotMutable(self.phase)),
            _ => self.product.clone().ok_or(SelectionError::NoCatalog),
        }
    }

    fn replace(&mut self, next: Selection) {
        self.selection = next;
        self.phase = StorePhase::Mutated;
        self.revision += 1;
        self.unsaved = true;
    }
}

fn unknown(field: &'static str, value: &str) -> SelectionError {
    SelectionError::UnknownValue { field, value: value.to_string() }
}
