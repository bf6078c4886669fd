//! Shopping cart: per-user lines held in a key/value store.

mod service;
mod store;

pub use service::{CartProductView, CartService, CartView};
pub use store::{CartStore, InMemoryCartStore, cart_key};

use common::ProductId;
use serde::{Deserialize, Serialize};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

/// One product entry in a user's cart.
///
/// Identity is `(user, product_id)`; the quantity is always between 1 and
/// [`MAX_LINE_QUANTITY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(rename = "productSelected")]
    pub selected: bool,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(product_id: ProductId, quantity: u32, selected: bool) -> Self {
        Self {
            product_id,
            quantity,
            selected,
        }
    }
}

/// Partial update of a cart line; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartLineUpdate {
    pub quantity: Option<u32>,
    pub selected: Option<bool>,
}

impl CartLineUpdate {
    /// Applies the update to a line in place.
    pub fn apply_to(&self, line: &mut CartLine) {
        if let Some(quantity) = self.quantity {
            line.quantity = quantity;
        }
        if let Some(selected) = self.selected {
            line.selected = selected;
        }
    }
}
