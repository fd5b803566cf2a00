//! Domain layer for the storefront backend.
//!
//! Everything here is pure in-memory state: aggregates validate a transition,
//! apply it, and hand the new row image back to the caller for persistence.
//! No module in this crate touches the database.

pub mod catalog;
pub mod identity;
pub mod order;
pub mod payment;

pub use catalog::{Product, ProductVariant};
pub use identity::{Actor, Role, User};
pub use order::{Order, OrderError, OrderItem, OrderStatus, Settlement};
pub use payment::{Payment, PaymentError, PaymentStatus};

use thiserror::Error;

/// Raised when a persisted enum column holds a value the domain does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownEnumValue {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The offending stored value.
    pub value: String,
}

impl UnknownEnumValue {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
