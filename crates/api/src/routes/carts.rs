//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use common::ProductId;
use domain::{CartLineUpdate, CartView};
use serde::Deserialize;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session::CurrentUser;
use crate::state::AppState;

type CartResult = Result<ApiResponse<CartView>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAddRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default = "yes")]
    pub selected: bool,
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct CartUpdateRequest {
    pub quantity: Option<u32>,
    pub selected: Option<bool>,
}

/// GET /carts
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> CartResult {
    Ok(ApiResponse::ok(state.carts.list(user).await?))
}

/// POST /carts: adds a product, merging with an existing line.
#[tracing::instrument(skip(state, body))]
pub async fn add(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<CartAddRequest>, JsonRejection>,
) -> CartResult {
    let Json(req) = body?;
    let view = state
        .carts
        .add(user, req.product_id, req.quantity, req.selected)
        .await?;
    Ok(ApiResponse::ok(view))
}

/// PUT /carts/{productId}: changes quantity and/or selection.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    product_id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<CartUpdateRequest>, JsonRejection>,
) -> CartResult {
    let Path(product_id) = product_id?;
    let Json(req) = body?;
    let update = CartLineUpdate {
        quantity: req.quantity,
        selected: req.selected,
    };
    Ok(ApiResponse::ok(
        state.carts.update(user, product_id, update).await?,
    ))
}

/// DELETE /carts/{productId}
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    product_id: Result<Path<ProductId>, PathRejection>,
) -> CartResult {
    let Path(product_id) = product_id?;
    Ok(ApiResponse::ok(state.carts.delete(user, product_id).await?))
}

/// PUT /carts/selectAll
pub async fn select_all(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> CartResult {
    Ok(ApiResponse::ok(state.carts.select_all(user, true).await?))
}

/// PUT /carts/unSelectAll
pub async fn unselect_all(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> CartResult {
    Ok(ApiResponse::ok(state.carts.select_all(user, false).await?))
}

/// GET /carts/products/sum: total quantity across every line.
pub async fn sum(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<u64>, ApiError> {
    Ok(ApiResponse::ok(state.carts.sum(user).await?))
}
