//! Domain layer: catalog, selection, validation, pricing and cart summary.
pub mod aggregates;
#[cfg(test)]
pub(crate) mod arbitrary;
pub mod catalog;
pub mod events;
pub mod options;
pub mod pricing;
pub mod summary;
pub mod validation;
pub mod value_objects;
