//! Payment attempts and their state machine.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UnknownEnumValue;

/// Status of a payment attempt.
///
/// `Pending` → `Successful` | `Failed`; a failed attempt may be reset to
/// `Pending` by a retry; `Refunded` is reachable only from `Successful`.
/// `Cancelled` is stored for schema parity but no transition produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Successful,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    /// True while a confirmation outcome may still be applied.
    pub fn is_confirmable(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    /// True when the attempt may be reset for another try.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentStatus::Failed)
    }

    /// True when the captured money can be returned.
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Successful)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Successful => "successful",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "successful" => Ok(PaymentStatus::Successful),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(UnknownEnumValue::new("payment status", other)),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by the payment state machine.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Confirmation attempted on a non-pending payment.
    #[error("payment has already been processed (status: {current})")]
    AlreadyProcessed { current: PaymentStatus },

    /// Retry attempted on a payment that has not failed.
    #[error("only failed payments can be retried (status: {current})")]
    NotRetryable { current: PaymentStatus },

    /// Refund attempted on a payment that never succeeded.
    #[error("only successful payments can be refunded (status: {current})")]
    NotRefundable { current: PaymentStatus },
}

/// One payment attempt against an order.
///
/// `amount` snapshots the order total at creation and never changes, even
/// if the order is later mutated (it cannot be, once processing starts, but
/// the snapshot removes the dependency entirely).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Opens a new pending attempt for the given order total.
    pub fn open(order_id: OrderId, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a successful gateway outcome.
    pub fn mark_successful(&mut self) -> Result<(), PaymentError> {
        self.confirmable()?;
        self.status = PaymentStatus::Successful;
        self.touch();
        Ok(())
    }

    /// Applies a declined gateway outcome.
    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        self.confirmable()?;
        self.status = PaymentStatus::Failed;
        self.touch();
        Ok(())
    }

    /// Resets a failed attempt so it can be confirmed again.
    pub fn reset_for_retry(&mut self) -> Result<(), PaymentError> {
        if !self.status.is_retryable() {
            return Err(PaymentError::NotRetryable {
                current: self.status,
            });
        }
        self.status = PaymentStatus::Pending;
        self.touch();
        Ok(())
    }

    /// Returns captured money (admin action).
    pub fn refund(&mut self) -> Result<(), PaymentError> {
        if !self.status.is_refundable() {
            return Err(PaymentError::NotRefundable {
                current: self.status,
            });
        }
        self.status = PaymentStatus::Refunded;
        self.touch();
        Ok(())
    }

    fn confirmable(&self) -> Result<(), PaymentError> {
        if !self.status.is_confirmable() {
            return Err(PaymentError::AlreadyProcessed {
                current: self.status,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
