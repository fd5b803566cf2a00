//! Order aggregate and related types.

mod aggregate;
mod item;
mod state;

pub use aggregate::Order;
pub use item::OrderItem;
pub use state::{OrderStatus, Settlement};

use thiserror::Error;

/// Errors raised by the order state machine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested transition is not legal from the current status.
    #[error("cannot {action} an order in {current} status")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },
}
