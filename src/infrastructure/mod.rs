//! Storage and messaging adapters.
pub mod memory;
pub mod nats;
pub mod postgres;

pub use memory::{InMemoryCartRepository, InMemoryCatalog, InMemoryCheckoutHandoff};
pub use nats::EventPublisher;
pub use postgres::{PgCartRepository, PgCatalogSource, PgCheckoutHandoff};
