//! Domain events
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CartLineId, Money, SessionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfiguratorEvent {
    LineOptionsSaved { line_id: CartLineId, option_count: usize },
    LineQuantityChanged { line_id: CartLineId, quantity: u32 },
    CheckoutHandedOff { session_id: SessionId, key: String, subtotal: Money },
}

impl ConfiguratorEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::LineOptionsSaved { .. } => "configurator.cart.options_saved",
            Self::LineQuantityChanged { .. } => "configurator.cart.quantity_changed",
            Self::CheckoutHandedOff { .. } => "configurator.checkout.handed_off",
        }
    }
}
