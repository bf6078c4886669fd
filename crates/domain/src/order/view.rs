//! Read-side shapes returned by order listings and detail lookups.

use chrono::{DateTime, Utc};
use common::{OrderNo, ProductId, ShippingId};
use serde::Serialize;

use super::{Order, OrderLine, OrderStatus, PaymentType};
use crate::address::Shipping;
use crate::value_objects::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub product_image: String,
    pub current_unit_price: Money,
    pub quantity: u32,
    pub total_price: Money,
    pub create_time: DateTime<Utc>,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name,
            product_image: line.product_image,
            current_unit_price: line.unit_price,
            quantity: line.quantity,
            total_price: line.line_total,
            create_time: line.create_time,
        }
    }
}

/// An order with its lines and, when still resolvable, its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_no: OrderNo,
    pub payment: Money,
    pub payment_type: i16,
    pub payment_type_desc: PaymentType,
    pub postage: Money,
    pub status: i16,
    pub status_desc: &'static str,
    pub payment_time: Option<DateTime<Utc>>,
    pub send_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
    #[serde(rename = "orderItemVoList")]
    pub lines: Vec<OrderLineView>,
    pub shipping_id: ShippingId,
    pub receiver_name: Option<String>,
    #[serde(rename = "shippingVo")]
    pub shipping: Option<Shipping>,
}

impl OrderView {
    /// Builds a view from an order, its lines and its address.
    pub fn new(order: &Order, lines: Vec<OrderLine>, shipping: Option<Shipping>) -> Self {
        let status: OrderStatus = order.status();
        Self {
            order_no: order.order_no(),
            payment: order.payment(),
            payment_type: order.payment_type().code(),
            payment_type_desc: order.payment_type(),
            postage: order.postage(),
            status: status.code(),
            status_desc: status.as_str(),
            payment_time: order.payment_time(),
            send_time: order.send_time(),
            end_time: order.end_time(),
            close_time: order.close_time(),
            create_time: order.create_time(),
            lines: lines.into_iter().map(OrderLineView::from).collect(),
            shipping_id: order.shipping_id(),
            receiver_name: shipping.as_ref().map(|s| s.receiver_name.clone()),
            shipping,
        }
    }
}
