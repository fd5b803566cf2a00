//! Shared types used across the storefront workspace.

mod types;

pub use types::{ItemId, Money, OrderId, PaymentId, ProductId, UserId, VariantId};
