//! Missing-choice detection.
//!
//! Validation never fails: it returns the labels of every unmet required
//! field, in a fixed priority order, each at most once.

use crate::domain::aggregates::selection::Selection;
use crate::domain::catalog::VariantCatalog;
use crate::domain::options::FieldLabels;

pub fn validate(catalog: &VariantCatalog, selection: &Selection) -> Vec<String> {
    validate_with_labels(catalog, selection, &FieldLabels::default())
}

pub fn validate_with_labels(catalog: &VariantCatalog, selection: &Selection, labels: &FieldLabels) -> Vec<String> {
    let mut missing = Vec::new();

    if !catalog.sizes.is_empty() && !selection.size.is_selected() {
        missing.push(labels.size.clone());
    }
    if !catalog.colors.is_empty() && !selection.color.is_selected() {
        missing.push(labels.color.clone());
    }
    if !catalog.materials.is_empty() && !selection.material.is_selected() {
        missing.push(labels.material.clone());
    }
    for group in catalog.option_groups.iter().filter(|g| g.is_required()) {
        if !selection.group(group.name()).is_selected() {
            missing.push(group.name().to_string());
        }
    }
    if !catalog.printing_methods.is_empty() && !selection.printing_method.is_selected() {
        missing.push(labels.printing_method.clone());
    }
    if !catalog.print_locations.is_empty() && selection.print_locations.is_empty() {
        missing.push(labels.print_location.clone());
    }
    let tiered_size = selection.size.value().and_then(|name| catalog.size(name)).is_some_and(|s| s.has_tiers());
    if tiered_size && selection.size_tier.is_none() {
        missing.push(labels.size_tier.clone());
    }

    missing
}

pub fn is_complete(catalog: &VariantCatalog, selection: &Selection) -> bool {
    validate(catalog, selection).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::selection::TierChoice;
    use crate::domain::arbitrary;
    use crate::domain::value_objects::Choice;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn catalog() -> VariantCatalog {
        serde_json::from_value(serde_json::json!({
            "sizes": [{ "id": "s-m", "name": "M", "tiers": [{ "id": "t50", "quantity": 50, "unitPrice": 2.0 }] }, { "id": "s-l", "name": "L" }],
            "colors": [{ "id": "c-red", "name": "Red" }],
            "materials": [{ "id": "m-cot", "name": "Cotton" }],
            "optionGroups": {
                "Sleeves": [{ "id": "g1", "value": "Long", "isRequired": true }],
                "Gift wrap": [{ "id": "g2", "value": "Yes" }]
            },
            "printingMethods": [{ "id": "p1", "name": "DTF" }],
            "printLocations": [{ "id": "l1", "name": "Front" }]
        }))
        .unwrap()
    }

    #[test]
    fn test_required_group_without_choice() {
        let catalog: VariantCatalog = serde_json::from_value(serde_json::json!({
            "optionGroups": { "الخامة": [{ "id": "g1", "value": "قطن", "isRequired": true }] }
        }))
        .unwrap();
        assert_eq!(validate(&catalog, &Selection::empty(&catalog)), vec!["الخامة".to_string()]);
    }

    #[test]
    fn test_missing_fields_in_priority_order() {
        let catalog = catalog();
        let mut selection = Selection::empty(&catalog);
        assert_eq!(
            validate(&catalog, &selection),
            ["Size", "Color", "Material", "Sleeves", "Printing Method", "Print Location"]
        );

        selection.size = Choice::chosen("M");
        assert_eq!(validate(&catalog, &selection).last().map(String::as_str), Some("Size Tier"));
    }

    #[test]
    fn test_complete_selection_validates() {
        let catalog = catalog();
        let mut selection = Selection::empty(&catalog);
        selection.size = Choice::chosen("M");
        selection.size_tier = Some(TierChoice::from_tier(&catalog.sizes[0].tiers[0]));
        selection.color = Choice::chosen("Red");
        selection.material = Choice::chosen("Cotton");
        selection.option_groups.insert("Sleeves".into(), Choice::chosen("Long"));
        selection.printing_method = Choice::chosen("DTF");
        selection.print_locations.insert("Front".into());
        assert!(is_complete(&catalog, &selection));

        selection.size = Choice::chosen("L");
        selection.size_tier = None;
        assert!(is_complete(&catalog, &selection));
    }

    #[test]
    fn test_empty_catalog_requires_nothing() {
        let catalog = VariantCatalog::default();
        assert!(validate(&catalog, &Selection::default()).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn prop_valid_iff_every_required_field_chosen((catalog, selection) in arbitrary::configured()) {
            let tiered = selection.size.value().and_then(|n| catalog.size(n)).is_some_and(|s| s.has_tiers());
            let complete = (catalog.sizes.is_empty() || selection.size.is_selected())
                && (catalog.colors.is_empty() || selection.color.is_selected())
                && (catalog.materials.is_empty() || selection.material.is_selected())
                && catalog.option_groups.iter().filter(|g| g.is_required()).all(|g| selection.group(g.name()).is_selected())
                && (catalog.printing_methods.is_empty() || selection.printing_method.is_selected())
                && (catalog.print_locations.is_empty() || !selection.print_locations.is_empty())
                && (!tiered || selection.size_tier.is_some());

            let missing = validate(&catalog, &selection);
            prop_assert_eq!(missing.is_empty(), complete);
            let distinct: BTreeSet<&String> = missing.iter().collect();
            prop_assert_eq!(distinct.len(), missing.len());
        }
    }
}
