//! Workflow error taxonomy.

use domain::{OrderError, PaymentError};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the cart and payment workflows.
///
/// Every variant maps to a stable machine-readable code and an HTTP status
/// at the API boundary; none of them leaves partial state behind, because
/// the failing unit of work is rolled back wholesale.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("user not found")]
    UserNotFound,

    /// The product or variant does not exist, is inactive, or is deleted.
    #[error("product is unavailable")]
    ProductUnavailable,

    /// The variant holds fewer units than requested.
    #[error("insufficient stock for the requested quantity")]
    InsufficientStock,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("order not found")]
    OrderNotFound,

    #[error("payment not found")]
    PaymentNotFound,

    /// The caller is not the order's owner (or lacks the admin role for
    /// admin-only operations).
    #[error("access denied")]
    AccessDenied,

    #[error("order is already paid")]
    OrderAlreadyPaid,

    /// Confirmation attempted on a payment that is no longer pending.
    #[error("payment has already been processed")]
    PaymentAlreadyProcessed,

    /// Retry attempted on a payment that has not failed.
    #[error("only failed payments can be retried")]
    PaymentNotRetryable,

    /// Refund attempted on a payment that never succeeded.
    #[error("only paid payments can be refunded")]
    OnlyPaidCanBeRefunded,

    /// Owner cancellation attempted on a completed or already-cancelled
    /// order.
    #[error("order can no longer be cancelled")]
    CancellationNotAllowed,

    /// The order is in the wrong status for the requested transition.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Persistence failure; the unit of work was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PaymentError> for CheckoutError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::AlreadyProcessed { .. } => CheckoutError::PaymentAlreadyProcessed,
            PaymentError::NotRetryable { .. } => CheckoutError::PaymentNotRetryable,
            PaymentError::NotRefundable { .. } => CheckoutError::OnlyPaidCanBeRefunded,
        }
    }
}
