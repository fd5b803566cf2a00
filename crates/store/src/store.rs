//! Storage traits: the transaction boundary of the core workflows.

use async_trait::async_trait;
use common::{OrderId, PaymentId, ProductId, UserId, VariantId};
use domain::{Order, OrderItem, Payment, PaymentStatus, Product, ProductVariant, User};

use crate::error::Result;

/// Factory for units of work.
///
/// Coordinators are generic over this trait, so the same workflow code runs
/// against Postgres in production and the in-memory twin in tests.
#[async_trait]
pub trait Store: Send + Sync + Clone + 'static {
    type Uow: UnitOfWork;

    /// Opens a new unit of work (a database transaction or its in-memory
    /// equivalent).
    async fn begin(&self) -> Result<Self::Uow>;
}

/// One atomic unit of work.
///
/// All reads and writes between `begin` and `commit` form a single atomic
/// unit: committing publishes every write, dropping the value without
/// committing discards them all. Soft-deleted rows are invisible to every
/// query here.
#[async_trait]
pub trait UnitOfWork: Send {
    // -- users --

    async fn find_user(&mut self, id: UserId) -> Result<Option<User>>;

    async fn insert_user(&mut self, user: &User) -> Result<()>;

    // -- catalog --

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    async fn insert_product(&mut self, product: &Product) -> Result<()>;

    /// Finds the live (non-deleted) variant for a product/value pair.
    async fn find_variant(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<ProductVariant>>;

    async fn insert_variant(&mut self, variant: &ProductVariant) -> Result<()>;

    /// Rewrites a variant's price (catalog concern; used by tests to prove
    /// that line items keep their snapshot price).
    async fn set_variant_price(&mut self, id: VariantId, price_cents: i64) -> Result<()>;

    /// Atomically debits stock: succeeds (true) only when the live row still
    /// holds at least `quantity` units. The check and the decrement are one
    /// statement, so concurrent debits cannot both pass on the same units.
    async fn debit_stock(&mut self, id: VariantId, quantity: u32) -> Result<bool>;

    /// Unconditionally credits stock back to the live variant row. Returns
    /// false when no such row exists. Must be invoked exactly once per
    /// debit being undone; idempotency is the caller's job.
    async fn credit_stock(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
        quantity: u32,
    ) -> Result<bool>;

    // -- orders --

    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Persists the order's current status, settlement, total, and
    /// `updated_at`.
    async fn update_order(&mut self, order: &Order) -> Result<()>;

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// The user's cart: their single live order in `pending` status.
    async fn find_pending_order(&mut self, user_id: UserId) -> Result<Option<Order>>;

    /// All live orders of a user, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>>;

    // -- order items --

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Persists the item's quantity and final price.
    async fn update_item(&mut self, item: &OrderItem) -> Result<()>;

    async fn find_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<OrderItem>>;

    async fn items_for_order(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    // -- payments --

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>>;

    /// Conditionally moves a payment from `expected` to `next` status.
    /// Returns false when the row is no longer in `expected` — the losing
    /// side of a race must abort its unit of work.
    async fn transition_payment(
        &mut self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<bool>;

    /// Publishes every write of this unit of work.
    async fn commit(self) -> Result<()>;
}
