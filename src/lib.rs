//! Variant Configurator
//!
//! Turns a product's configurable catalog and a shopper's in-progress choices
//! into a price, a list of missing required choices, and a debounced,
//! race-safe write-back to the cart record.
//!
//! ## Components
//! - Catalog loading (snapshot reuse or fetch by product id)
//! - Selection store with hydration from saved cart lines
//! - Validation of required choices
//! - Line pricing with tier, add-on and discount handling
//! - Persistence synchronizer (debounce, hydration guard, de-duplication)
//! - Cart summary and checkout handoff

pub mod config;
pub mod domain;
pub mod editor;
pub mod http;
pub mod infrastructure;
pub mod sync;

use thiserror::Error;

pub use domain::aggregates::{CartLineItem, Selection, SelectionError, SelectionStore, StorePhase, TierChoice};
pub use domain::catalog::{CatalogError, CatalogLoader, CatalogSource, ProductSnapshot, VariantCatalog};
pub use domain::options::{CartOptionsUpdate, FieldLabels, SelectedOption};
pub use domain::pricing::{LineFacts, PricingResult};
pub use domain::summary::CartSummary;
pub use domain::value_objects::{CartLineId, Choice, Money, ProductId, SessionId};
pub use editor::LineEditor;
pub use sync::{CartRecordApi, PersistenceSynchronizer, SyncConfig, SyncStatus};

// =============================================================================
// Error Types
// =============================================================================

/// Failures of cart and checkout storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cart line not found: {0}")]
    LineNotFound(CartLineId),

    #[error("No checkout handoff for session {0}")]
    HandoffNotFound(SessionId),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfiguratorError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ConfiguratorError>;
