//! Order, payment, and inventory coordination for the storefront backend.
//!
//! Each operation here is one atomic unit of work: load the aggregates,
//! validate the transition with the pure domain state machines, pair every
//! stock debit with its eventual credit, persist, commit. A failure at any
//! step rolls the whole unit back — including stock movements.

pub mod cart;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod payments;

pub use cart::{CartService, OrderDetails};
pub use error::CheckoutError;
pub use gateway::{FixedGateway, Outcome, PaymentGateway, SimulatedGateway};
pub use payments::{Confirmation, PaymentCoordinator};
