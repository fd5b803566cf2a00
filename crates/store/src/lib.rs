//! Transactional persistence for the storefront backend.
//!
//! The [`Store`] trait hands out a [`UnitOfWork`] per operation: every
//! repository call inside one unit of work sees and produces a consistent
//! snapshot, `commit` makes it durable, and dropping the unit of work
//! without committing rolls everything back. Two implementations share the
//! trait: [`PgStore`] (sqlx/Postgres) for production and
//! [`MemStore`] (in-memory, staged commit) for unit tests.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::StoreError;
pub use memory::{MemStore, MemUnitOfWork};
pub use postgres::{PgStore, PgUnitOfWork};
pub use store::{Store, UnitOfWork};
