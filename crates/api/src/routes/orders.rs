//! Order endpoints: checkout, read model and cancellation.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::{OrderNo, ShippingId};
use domain::{OrderView, Page};
use serde::Deserialize;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session::CurrentUser;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_id: ShippingId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page_num: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

// -- Handlers --

/// POST /orders: checks out the selected cart lines.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<ApiResponse<OrderView>, ApiError> {
    let Json(req) = body?;
    let placed = state.checkout.checkout(user, req.shipping_id).await?;
    Ok(ApiResponse::ok(placed.into_view()))
}

/// GET /orders?pageNum&pageSize
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<ApiResponse<Page<OrderView>>, ApiError> {
    let Query(page) = query?;
    let orders = state
        .orders
        .list(user, page.page_num, page.page_size)
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// GET /orders/{orderNo}
#[tracing::instrument(skip(state))]
pub async fn detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    order_no: Result<Path<OrderNo>, PathRejection>,
) -> Result<ApiResponse<OrderView>, ApiError> {
    let Path(order_no) = order_no?;
    Ok(ApiResponse::ok(state.orders.detail(user, order_no).await?))
}

/// PUT /orders/{orderNo}: cancels an unpaid order.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    order_no: Result<Path<OrderNo>, PathRejection>,
) -> Result<ApiResponse<()>, ApiError> {
    let Path(order_no) = order_no?;
    state.orders.cancel(user, order_no).await?;
    Ok(ApiResponse::message("order canceled"))
}
