//! Order aggregate and its line snapshots.

use chrono::{DateTime, Utc};
use common::{OrderNo, ProductId, ShippingId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderEvent, OrderStatus};
use crate::catalog::Product;
use crate::error::BusinessError;
use crate::value_objects::Money;

/// How an order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[default]
    PayOnline,
}

impl PaymentType {
    /// Returns the persisted payment type code.
    pub fn code(&self) -> i16 {
        match self {
            PaymentType::PayOnline => 1,
        }
    }

    /// Parses a persisted payment type code.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(PaymentType::PayOnline),
            _ => None,
        }
    }
}

/// A purchased product captured at order-creation time.
///
/// Later catalog changes never alter an existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_no: OrderNo,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    pub create_time: DateTime<Utc>,
}

impl OrderLine {
    /// Snapshots a product's current name, image and price.
    pub fn snapshot(
        order_no: OrderNo,
        user_id: UserId,
        product: &Product,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_no,
            user_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_image: product.main_image.clone(),
            unit_price: product.price,
            quantity,
            line_total: product.price.multiply(quantity),
            create_time: now,
        }
    }
}

/// Order aggregate root.
///
/// Everything except `status` and the transition timestamps is fixed at
/// creation; those change only through [`Order::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_no: OrderNo,
    user_id: UserId,
    shipping_id: ShippingId,
    payment: Money,
    payment_type: PaymentType,
    postage: Money,
    status: OrderStatus,
    payment_time: Option<DateTime<Utc>>,
    send_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    close_time: Option<DateTime<Utc>>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

/// Raw order fields, used by storage adapters to rebuild an [`Order`].
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_no: OrderNo,
    pub user_id: UserId,
    pub shipping_id: ShippingId,
    pub payment: Money,
    pub payment_type: PaymentType,
    pub postage: Money,
    pub status: OrderStatus,
    pub payment_time: Option<DateTime<Utc>>,
    pub send_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Self {
            order_no: r.order_no,
            user_id: r.user_id,
            shipping_id: r.shipping_id,
            payment: r.payment,
            payment_type: r.payment_type,
            postage: r.postage,
            status: r.status,
            payment_time: r.payment_time,
            send_time: r.send_time,
            end_time: r.end_time,
            close_time: r.close_time,
            create_time: r.create_time,
            update_time: r.update_time,
        }
    }
}

// Query methods
impl Order {
    pub fn order_no(&self) -> OrderNo {
        self.order_no
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn shipping_id(&self) -> ShippingId {
        self.shipping_id
    }

    /// Returns the sum of all line totals.
    pub fn payment(&self) -> Money {
        self.payment
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    pub fn postage(&self) -> Money {
        self.postage
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_time(&self) -> Option<DateTime<Utc>> {
        self.payment_time
    }

    pub fn send_time(&self) -> Option<DateTime<Utc>> {
        self.send_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn close_time(&self) -> Option<DateTime<Utc>> {
        self.close_time
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    /// Returns true if `user_id` owns this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

// Command methods
impl Order {
    /// Builds a new unpaid order from its line snapshots.
    ///
    /// Fails if there are no lines; the payment is the sum of line totals.
    pub fn place(
        order_no: OrderNo,
        user_id: UserId,
        shipping_id: ShippingId,
        lines: &[OrderLine],
        now: DateTime<Utc>,
    ) -> Result<Self, BusinessError> {
        if lines.is_empty() {
            return Err(BusinessError::CartSelectedIsEmpty);
        }

        Ok(Self {
            order_no,
            user_id,
            shipping_id,
            payment: lines.iter().map(|l| l.line_total).sum(),
            payment_type: PaymentType::PayOnline,
            postage: Money::zero(),
            status: OrderStatus::NoPay,
            payment_time: None,
            send_time: None,
            end_time: None,
            close_time: None,
            create_time: now,
            update_time: now,
        })
    }

    /// Cancels an unpaid order.
    pub fn cancel(&self, at: DateTime<Utc>) -> Result<OrderEvent, BusinessError> {
        if !self.status.can_cancel() {
            return Err(BusinessError::OrderStatusError);
        }
        Ok(OrderEvent::Canceled { close_time: at })
    }

    /// Marks an unpaid order as paid.
    pub fn mark_paid(&self, at: DateTime<Utc>) -> Result<OrderEvent, BusinessError> {
        if !self.status.can_mark_paid() {
            return Err(BusinessError::OrderStatusError);
        }
        Ok(OrderEvent::Paid { payment_time: at })
    }

    /// Applies a transition returned by a command method.
    pub fn apply(&mut self, event: OrderEvent) {
        match event {
            OrderEvent::Canceled { close_time } => self.close_time = Some(close_time),
            OrderEvent::Paid { payment_time } => self.payment_time = Some(payment_time),
        }
        self.status = event.target_status();
        self.update_time = event.occurred_at();
    }
}
