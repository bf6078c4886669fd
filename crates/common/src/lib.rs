//! Shared identifier types for the storefront crates.

pub mod types;

pub use types::{OrderNo, ProductId, ShippingId, UserId};
