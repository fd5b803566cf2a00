//! Order aggregate.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderItem, OrderStatus, Settlement};

/// A customer order, from pending cart to terminal state.
///
/// Transition methods validate legality against the current status, mutate
/// the in-memory row image, and leave persistence to the caller. Stock
/// movements never happen here — the coordinators pair each transition with
/// the matching ledger operation inside one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub settlement: Settlement,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Opens a fresh pending order (the cart) for a user.
    pub fn open_pending(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            settlement: Settlement::Unpaid,
            total: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Recomputes the order total from its current line items.
    pub fn recompute_total(&mut self, items: &[OrderItem]) {
        self.total = items.iter().map(|item| item.final_price).sum();
        self.touch();
    }

    /// Checkout: `Pending` → `Processing`. Stock stays as reserved at
    /// add-item time.
    pub fn begin_checkout(&mut self) -> Result<(), OrderError> {
        if !self.status.can_checkout() {
            return Err(self.illegal("check out"));
        }
        self.status = OrderStatus::Processing;
        self.touch();
        Ok(())
    }

    /// Payment success: `Processing` → `Completed`, settlement `Paid`.
    pub fn settle(&mut self) -> Result<(), OrderError> {
        if !self.status.awaits_payment() {
            return Err(self.illegal("settle"));
        }
        self.status = OrderStatus::Completed;
        self.settlement = Settlement::Paid;
        self.touch();
        Ok(())
    }

    /// Payment failure: `Processing` → `Cancelled`, settlement stays
    /// `Unpaid`. The caller must release the reserved stock alongside.
    pub fn reject_payment(&mut self) -> Result<(), OrderError> {
        if !self.status.awaits_payment() {
            return Err(self.illegal("reject payment for"));
        }
        self.status = OrderStatus::Cancelled;
        self.settlement = Settlement::Unpaid;
        self.touch();
        Ok(())
    }

    /// Payment retry: `Cancelled` → `Processing`. The caller must
    /// re-reserve the stock that the failure path released.
    pub fn reopen(&mut self) -> Result<(), OrderError> {
        if !self.status.can_reopen() {
            return Err(self.illegal("reopen"));
        }
        self.status = OrderStatus::Processing;
        self.settlement = Settlement::Unpaid;
        self.touch();
        Ok(())
    }

    /// Admin refund: `Completed` → `Cancelled`, settlement back to
    /// `Unpaid`. The caller must release the stock alongside.
    pub fn refund(&mut self) -> Result<(), OrderError> {
        if !self.status.can_refund() {
            return Err(self.illegal("refund"));
        }
        self.status = OrderStatus::Cancelled;
        self.settlement = Settlement::Unpaid;
        self.touch();
        Ok(())
    }

    /// Owner cancellation: `Pending`/`Processing` → `Cancelled`. Rejected
    /// once completed or already cancelled, which also guarantees the
    /// paired stock release cannot run twice.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(self.illegal("cancel"));
        }
        self.status = OrderStatus::Cancelled;
        self.settlement = Settlement::Unpaid;
        self.touch();
        Ok(())
    }

    fn illegal(&self, action: &'static str) -> OrderError {
        OrderError::InvalidTransition {
            current: self.status,
            action,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
