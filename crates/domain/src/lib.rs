//! Domain layer for the storefront core.
//!
//! This crate provides:
//! - The business error taxonomy with stable codes
//! - Storage ports for carts, products, addresses and orders, each with an
//!   in-memory implementation
//! - The cart service and its derived cart view
//! - The order aggregate, its status state machine and the order read model

pub mod address;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod value_objects;

pub use address::{AddressBook, InMemoryAddressBook, Shipping};
pub use cart::{
    CartLine, CartLineUpdate, CartProductView, CartService, CartStore, CartView,
    InMemoryCartStore, MAX_LINE_QUANTITY,
};
pub use catalog::{Catalog, CatalogExt, InMemoryCatalog, Product, SaleStatus};
pub use error::{BusinessError, DomainError, Result, StoreError};
pub use order::{
    InMemoryOrderRepository, Order, OrderEvent, OrderLine, OrderLineView, OrderRecord,
    OrderRepository, OrderService, OrderStatus, OrderView, PaymentType,
};
pub use value_objects::{Money, Page};
