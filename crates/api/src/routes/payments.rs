//! Payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{Confirmation, PaymentGateway};
use common::{OrderId, PaymentId};
use domain::Payment;
use serde::Serialize;
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::auth::Identity;
use crate::error::ApiError;

// -- Response types --

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            order_id: payment.order_id.to_string(),
            amount_cents: payment.amount.cents(),
            status: payment.status.to_string(),
            created_at: payment.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct ConfirmationResponse {
    pub payment: PaymentResponse,
    pub order_id: String,
    pub order_status: String,
    pub settlement: String,
}

impl From<Confirmation> for ConfirmationResponse {
    fn from(confirmation: Confirmation) -> Self {
        Self {
            order_id: confirmation.order.id.to_string(),
            order_status: confirmation.order.status.to_string(),
            settlement: confirmation.order.settlement.to_string(),
            payment: confirmation.payment.into(),
        }
    }
}

// -- Handlers --

/// POST /payments/{order_id} — open a payment for an order (owner only).
#[tracing::instrument(skip(state, identity))]
pub async fn create<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = state
        .payments
        .create_payment(identity.0, OrderId::from_uuid(order_id))
        .await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// POST /payments/confirm/{payment_id} — run the simulated gateway
/// confirmation.
#[tracing::instrument(skip(state, _identity))]
pub async fn confirm<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    _identity: Identity,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let confirmation = state
        .payments
        .confirm_payment(PaymentId::from_uuid(payment_id))
        .await?;
    Ok(Json(confirmation.into()))
}

/// POST /payments/retry/{payment_id} — owner retry of a failed payment.
#[tracing::instrument(skip(state, identity))]
pub async fn retry<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let confirmation = state
        .payments
        .retry_payment(identity.0, PaymentId::from_uuid(payment_id))
        .await?;
    Ok(Json(confirmation.into()))
}

/// POST /admin/payments/refund/{payment_id} — admin-only refund.
#[tracing::instrument(skip(state, identity))]
pub async fn refund<S: Store, G: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    identity: Identity,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    let confirmation = state
        .payments
        .refund_payment(identity.0, PaymentId::from_uuid(payment_id))
        .await?;
    Ok(Json(confirmation.into()))
}
