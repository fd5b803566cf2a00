//! Order status machines.

use serde::{Deserialize, Serialize};

use crate::UnknownEnumValue;

/// Lifecycle status of an order.
///
/// ```text
/// Pending ──checkout──► Processing ──payment ok──► Completed ──refund──┐
///    │                      │  ▲                                       │
///    │                      │  └────retry────┐                         │
///    └──────cancel──────────┴──payment fail──┴──► Cancelled ◄──────────┘
/// ```
///
/// `Shipped` exists as a stored value for the fulfilment pipeline but no
/// transition here produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The cart: items may still be added, at most one per user.
    #[default]
    Pending,

    /// Checked out, a payment attempt is underway.
    Processing,

    /// Handed to fulfilment (unused by the payment workflow).
    Shipped,

    /// Payment succeeded (terminal).
    Completed,

    /// Payment failed, refunded, or cancelled by the owner (terminal).
    Cancelled,
}

impl OrderStatus {
    /// True while line items may be added to the order.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// True when the order can move to `Processing` via checkout.
    pub fn can_checkout(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// True when a payment outcome may settle or reject the order.
    pub fn awaits_payment(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    /// True when a failed payment may reopen the order for another attempt.
    pub fn can_reopen(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// True when an admin refund may void the order.
    pub fn can_refund(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// True when the owner may still cancel outright.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// True for states with no outgoing transitions (retry excepted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownEnumValue::new("order status", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the order's money has been captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    /// No successful payment is attached.
    #[default]
    Unpaid,

    /// A payment settled; refunding reverts to `Unpaid`.
    Paid,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::Unpaid => "unpaid",
            Settlement::Paid => "paid",
        }
    }
}

impl std::str::FromStr for Settlement {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Settlement::Unpaid),
            "paid" => Ok(Settlement::Paid),
            other => Err(UnknownEnumValue::new("settlement", other)),
        }
    }
}

impl std::fmt::Display for Settlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
