//! In-memory store for unit tests.
//!
//! Provides the same interface as the PostgreSQL implementation. A unit of
//! work stages its writes against a private copy of the state and publishes
//! the whole copy on commit, so an aborted unit of work leaves nothing
//! behind — the rollback semantics the workflows rely on hold here too.
//!
//! Commits are serialized through one lock; interleaved-transaction races
//! (two units of work committing divergent copies) are out of scope for
//! this twin and covered by the Postgres integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{OrderId, PaymentId, ProductId, UserId, VariantId};
use domain::{
    Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product, ProductVariant, User,
};

use crate::error::{Result, StoreError};
use crate::store::{Store, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemState {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    variants: Vec<ProductVariant>,
    orders: HashMap<OrderId, Order>,
    items: Vec<OrderItem>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory store implementation for testing.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock of a variant, for test assertions.
    pub fn stock_of(&self, product_id: ProductId, variant_value: &str) -> Option<i32> {
        self.state
            .lock()
            .unwrap()
            .variants
            .iter()
            .find(|v| v.product_id == product_id && v.variant_value == variant_value)
            .map(|v| v.stock)
    }

    /// Number of persisted payment rows, for test assertions.
    pub fn payment_count(&self) -> usize {
        self.state.lock().unwrap().payments.len()
    }
}

#[async_trait]
impl Store for MemStore {
    type Uow = MemUnitOfWork;

    async fn begin(&self) -> Result<MemUnitOfWork> {
        let staged = self.state.lock().unwrap().clone();
        Ok(MemUnitOfWork {
            shared: self.state.clone(),
            staged,
        })
    }
}

/// A staged copy of the store state; published wholesale on commit.
#[derive(Debug)]
pub struct MemUnitOfWork {
    shared: Arc<Mutex<MemState>>,
    staged: MemState,
}

#[async_trait]
impl UnitOfWork for MemUnitOfWork {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        self.staged.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.staged.products.get(&id).cloned())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<()> {
        self.staged.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_variant(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<ProductVariant>> {
        Ok(self
            .staged
            .variants
            .iter()
            .find(|v| v.product_id == product_id && v.variant_value == variant_value)
            .cloned())
    }

    async fn insert_variant(&mut self, variant: &ProductVariant) -> Result<()> {
        self.staged.variants.push(variant.clone());
        Ok(())
    }

    async fn set_variant_price(&mut self, id: VariantId, price_cents: i64) -> Result<()> {
        if let Some(v) = self.staged.variants.iter_mut().find(|v| v.id == id) {
            v.price = common::Money::from_cents(price_cents);
        }
        Ok(())
    }

    async fn debit_stock(&mut self, id: VariantId, quantity: u32) -> Result<bool> {
        let Some(v) = self.staged.variants.iter_mut().find(|v| v.id == id) else {
            return Ok(false);
        };
        if v.stock < quantity as i32 {
            return Ok(false);
        }
        v.stock -= quantity as i32;
        Ok(true)
    }

    async fn credit_stock(
        &mut self,
        product_id: ProductId,
        variant_value: &str,
        quantity: u32,
    ) -> Result<bool> {
        let Some(v) = self
            .staged
            .variants
            .iter_mut()
            .find(|v| v.product_id == product_id && v.variant_value == variant_value)
        else {
            return Ok(false);
        };
        v.stock += quantity as i32;
        Ok(true)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if order.status == OrderStatus::Pending
            && self
                .staged
                .orders
                .values()
                .any(|o| o.user_id == order.user_id && o.status == OrderStatus::Pending)
        {
            return Err(StoreError::Conflict("orders_one_pending_per_user"));
        }
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn find_pending_order(&mut self, user_id: UserId) -> Result<Option<Order>> {
        Ok(self
            .staged
            .orders
            .values()
            .find(|o| o.user_id == user_id && o.status == OrderStatus::Pending)
            .cloned())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .staged
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn insert_item(&mut self, item: &OrderItem) -> Result<()> {
        if self.staged.items.iter().any(|i| {
            i.order_id == item.order_id
                && i.product_id == item.product_id
                && i.variant_value == item.variant_value
        }) {
            return Err(StoreError::Conflict("order_items_order_product_variant"));
        }
        self.staged.items.push(item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItem) -> Result<()> {
        if let Some(existing) = self.staged.items.iter_mut().find(|i| i.id == item.id) {
            *existing = item.clone();
        }
        Ok(())
    }

    async fn find_item(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        variant_value: &str,
    ) -> Result<Option<OrderItem>> {
        Ok(self
            .staged
            .items
            .iter()
            .find(|i| {
                i.order_id == order_id
                    && i.product_id == product_id
                    && i.variant_value == variant_value
            })
            .cloned())
    }

    async fn items_for_order(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .staged
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        self.staged.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.staged.payments.get(&id).cloned())
    }

    async fn transition_payment(
        &mut self,
        id: PaymentId,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<bool> {
        match self.staged.payments.get_mut(&id) {
            Some(p) if p.status == expected => {
                p.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self) -> Result<()> {
        *self.shared.lock().unwrap() = self.staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::Role;

    fn variant(product_id: ProductId, stock: i32) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(),
            product_id,
            variant_value: "M".to_string(),
            price: Money::from_cents(5000),
            stock,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_units_of_work() {
        let store = MemStore::new();
        let user = User {
            id: UserId::new(),
            email: "shopper@example.com".to_string(),
            role: Role::Customer,
        };

        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&user).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.find_user(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = MemStore::new();
        let product_id = ProductId::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_variant(&variant(product_id, 10)).await.unwrap();
        uow.commit().await.unwrap();

        // Debit without committing.
        {
            let mut uow = store.begin().await.unwrap();
            assert!(uow.debit_stock_by(product_id, 4).await);
        }

        assert_eq!(store.stock_of(product_id, "M"), Some(10));
    }

    #[tokio::test]
    async fn debit_stock_is_conditional() {
        let store = MemStore::new();
        let product_id = ProductId::new();
        let v = variant(product_id, 5);

        let mut uow = store.begin().await.unwrap();
        uow.insert_variant(&v).await.unwrap();
        assert!(uow.debit_stock(v.id, 5).await.unwrap());
        assert!(!uow.debit_stock(v.id, 1).await.unwrap());
        uow.commit().await.unwrap();

        assert_eq!(store.stock_of(product_id, "M"), Some(0));
    }

    #[tokio::test]
    async fn second_pending_order_for_same_user_conflicts() {
        let store = MemStore::new();
        let user_id = UserId::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_order(&Order::open_pending(user_id)).await.unwrap();
        let result = uow.insert_order(&Order::open_pending(user_id)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn transition_payment_requires_expected_status() {
        let store = MemStore::new();
        let payment = Payment::open(OrderId::new(), Money::from_cents(100));

        let mut uow = store.begin().await.unwrap();
        uow.insert_payment(&payment).await.unwrap();

        assert!(uow
            .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Successful)
            .await
            .unwrap());
        assert!(!uow
            .transition_payment(payment.id, PaymentStatus::Pending, PaymentStatus::Failed)
            .await
            .unwrap());
    }

    impl MemUnitOfWork {
        /// Debits the first variant of a product, test helper.
        async fn debit_stock_by(&mut self, product_id: ProductId, quantity: u32) -> bool {
            let id = self
                .staged
                .variants
                .iter()
                .find(|v| v.product_id == product_id)
                .map(|v| v.id)
                .unwrap();
            self.debit_stock(id, quantity).await.unwrap()
        }
    }
}
