//! Cart and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{OrderDetails, PaymentGateway};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::auth::Identity;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub variant_value: String,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub settlement: String,
    pub total_cents: i64,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    pub gender: String,
    pub variant_value: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub final_price_cents: i64,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let items = details
            .items
            .into_iter()
            .map(|item| OrderItemResponse {
                id: item.id.to_string(),
                product_id: item.product_id.to_string(),
                name: item.name,
                description: item.description,
                product_type: item.product_type,
                gender: item.gender,
                variant_value: item.variant_value,
                unit_price_cents: item.unit_price.cents(),
                quantity: item.quantity,
                final_price_cents: item.final_price.cents(),
            })
            .collect();

        Self {
            id: details.order.id.to_string(),
            user_id: details.order.user_id.to_string(),
            status: details.order.status.to_string(),
            settlement: details.order.settlement.to_string(),
            total_cents: details.order.total.cents(),
            created_at: details.order.created_at.to_rfc3339(),
            items,
        }
    }
}

// -- Handlers --

/// POST /orders/pending/add-item — add a variant to the caller's cart.
#[tracing::instrument(skip(state, identity, req))]
pub async fn add_item<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::validation("quantity must be at least 1"));
    }
    if req.variant_value.trim().is_empty() {
        return Err(ApiError::validation("variant_value must not be empty"));
    }

    let details = state
        .cart
        .add_item(
            identity.0.user_id,
            ProductId::from_uuid(req.product_id),
            req.variant_value.trim(),
            req.quantity,
        )
        .await?;

    Ok(Json(details.into()))
}

/// POST /orders — check the caller's pending order out.
#[tracing::instrument(skip(state, identity))]
pub async fn checkout<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let details = state.cart.checkout(identity.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// GET /orders/me — list the caller's orders, newest first.
#[tracing::instrument(skip(state, identity))]
pub async fn mine<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.cart.orders_for_user(identity.0.user_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — load one order; owners only.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let details = state
        .cart
        .order_for(identity.0, OrderId::from_uuid(id))
        .await?;
    Ok(Json(details.into()))
}

/// DELETE /orders/{id}/cancel — owner cancellation.
#[tracing::instrument(skip(state, identity))]
pub async fn cancel<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let details = state
        .cart
        .cancel_order(identity.0, OrderId::from_uuid(id))
        .await?;
    Ok(Json(details.into()))
}
