//! Orders: aggregate, status state machine, storage port and read model.

mod aggregate;
mod events;
mod repository;
mod service;
mod status;
mod view;

pub use aggregate::{Order, OrderLine, OrderRecord, PaymentType};
pub use events::OrderEvent;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
pub use status::OrderStatus;
pub use view::{OrderLineView, OrderView};
