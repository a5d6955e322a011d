//! Aggregates module
pub mod selection;
pub mod cart;

pub use selection::{Selection, SelectionError, SelectionField, SelectionStore, StorePhase, TierChoice};
pub use cart::{Cart, CartError, CartLineItem, CartRepository};
