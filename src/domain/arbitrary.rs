//! Generated catalogs and selections for property tests.
//!
//! Names are short lowercase words, so they never collide with the fixed
//! field labels or the unselected sentinel.

use proptest::collection::{btree_map, btree_set, vec};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::BTreeMap;

use crate::domain::aggregates::selection::{Selection, TierChoice};
use crate::domain::catalog::{
    LocationKind, OptionGroups, OptionItem, PricedOption, PrintLocation, PrintingMethod, SizeOption, SizeTier,
    VariantCatalog,
};
use crate::domain::value_objects::{Choice, Money};

const NAME: &str = "[a-z]{1,6}";

fn sizes() -> impl Strategy<Value = Vec<SizeOption>> {
    btree_map(NAME, btree_set(1u32..500, 0..3), 0..4).prop_map(|sizes| {
        sizes
            .into_iter()
            .enumerate()
            .map(|(i, (name, quantities))| SizeOption {
                id: format!("s{i}"),
                name,
                tiers: quantities
                    .into_iter()
                    .enumerate()
                    .map(|(j, quantity)| SizeTier {
                        id: format!("s{i}-t{j}"),
                        quantity,
                        unit_price: Money::cents(100 + 25 * j as i64),
                        total_price: None,
                    })
                    .collect(),
            })
            .collect()
    })
}

fn priced(prefix: &'static str) -> impl Strategy<Value = Vec<PricedOption>> {
    btree_set(NAME, 0..4).prop_map(move |names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| PricedOption { id: format!("{prefix}{i}"), name, additional_price: Money::cents(50 * i as i64) })
            .collect()
    })
}

/// The flag marks the group's first item as required.
fn option_groups() -> impl Strategy<Value = OptionGroups> {
    btree_map(NAME, (btree_set(NAME, 1..4), any::<bool>()), 0..3).prop_map(|raw| {
        let raw: BTreeMap<String, Vec<OptionItem>> = raw
            .into_iter()
            .map(|(name, (values, required))| {
                let items = values
                    .into_iter()
                    .enumerate()
                    .map(|(j, value)| OptionItem {
                        id: format!("{name}-{j}"),
                        value,
                        additional_price: Money::cents(10 * j as i64),
                        is_required: required && j == 0,
                    })
                    .collect();
                (name, items)
            })
            .collect();
        OptionGroups::build(raw).expect("generated groups are valid")
    })
}

fn printing_methods() -> impl Strategy<Value = Vec<PrintingMethod>> {
    btree_set(NAME, 0..3).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| PrintingMethod { id: format!("p{i}"), name, base_price: Money::cents(300 + 100 * i as i64) })
            .collect()
    })
}

/// The flag picks embroidery over print.
fn print_locations() -> impl Strategy<Value = Vec<PrintLocation>> {
    btree_map(NAME, any::<bool>(), 0..4).prop_map(|locations| {
        locations
            .into_iter()
            .enumerate()
            .map(|(i, (name, embroidered))| PrintLocation {
                id: format!("l{i}"),
                name,
                kind: if embroidered { LocationKind::Embroidery } else { LocationKind::Print },
                additional_price: Money::cents(200 * i as i64),
            })
            .collect()
    })
}

pub fn catalog() -> impl Strategy<Value = VariantCatalog> {
    (sizes(), priced("c"), priced("m"), option_groups(), printing_methods(), print_locations()).prop_map(
        |(sizes, colors, materials, option_groups, printing_methods, print_locations)| VariantCatalog {
            sizes,
            colors,
            materials,
            option_groups,
            printing_methods,
            print_locations,
        },
    )
}

fn pick<T>(items: &[T], index: Option<Index>) -> Option<&T> {
    match index {
        Some(index) if !items.is_empty() => Some(index.get(items)),
        _ => None,
    }
}

/// A catalog with a selection drawn only from its own entries; any field may
/// be left unselected.
pub fn configured() -> impl Strategy<Value = (VariantCatalog, Selection)> {
    catalog()
        .prop_flat_map(|catalog| {
            let groups = catalog.option_groups.len();
            let locations = catalog.print_locations.len();
            (
                Just(catalog),
                any::<[Option<Index>; 5]>(),
                vec(any::<Option<Index>>(), groups),
                vec(any::<bool>(), locations),
            )
        })
        .prop_map(|(catalog, [size, tier, color, material, method], groups, locations)| {
            let mut selection = Selection::empty(&catalog);
            if let Some(size) = pick(&catalog.sizes, size) {
                selection.size = Choice::chosen(&size.name);
                selection.size_tier = pick(&size.tiers, tier).map(TierChoice::from_tier);
            }
            if let Some(color) = pick(&catalog.colors, color) {
                selection.color = Choice::chosen(&color.name);
            }
            if let Some(material) = pick(&catalog.materials, material) {
                selection.material = Choice::chosen(&material.name);
            }
            if let Some(method) = pick(&catalog.printing_methods, method) {
                selection.printing_method = Choice::chosen(&method.name);
            }
            for (group, index) in catalog.option_groups.iter().zip(groups) {
                if let Some(item) = pick(group.items(), index) {
                    selection.option_groups.insert(group.name().to_string(), Choice::chosen(&item.value));
                }
            }
            for (location, chosen) in catalog.print_locations.iter().zip(locations) {
                if chosen {
                    selection.print_locations.insert(location.name.clone());
                }
            }
            (catalog, selection)
        })
}
