//! Cart / pending-order workflows.

use common::{OrderId, ProductId, UserId};
use domain::{Actor, Order, OrderItem};
use store::{Store, UnitOfWork};

use crate::error::CheckoutError;
use crate::inventory;

/// An order together with its line items.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Cart and order workflows, generic over the storage backend.
///
/// Each user owns at most one pending order (the cart); items accumulate
/// into it and stock is reserved the moment an item is added, not at
/// checkout.
#[derive(Debug, Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `quantity` units of a variant to the caller's pending order,
    /// creating the order if none exists.
    ///
    /// The whole sequence — stock reservation, order find-or-create, line
    /// merge-or-insert, total recompute — is one unit of work; any failure
    /// rolls back everything including the stock debit.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_value: &str,
        quantity: u32,
    ) -> Result<OrderDetails, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::InvalidQuantity);
        }

        let mut uow = self.store.begin().await?;

        uow.find_user(user_id)
            .await?
            .ok_or(CheckoutError::UserNotFound)?;

        let product = uow
            .find_product(product_id)
            .await?
            .filter(|p| p.is_purchasable())
            .ok_or(CheckoutError::ProductUnavailable)?;

        let variant = inventory::reserve(&mut uow, product_id, variant_value, quantity).await?;

        let mut order = match uow.find_pending_order(user_id).await? {
            Some(order) => order,
            None => {
                let order = Order::open_pending(user_id);
                uow.insert_order(&order).await?;
                order
            }
        };

        // Repeat adds merge into the existing line; the unit price stays
        // locked at what it was when the line first entered the cart.
        match uow.find_item(order.id, product_id, variant_value).await? {
            Some(mut item) => {
                item.add_quantity(quantity);
                uow.update_item(&item).await?;
            }
            None => {
                let item = OrderItem::snapshot(order.id, &product, &variant, quantity);
                uow.insert_item(&item).await?;
            }
        }

        let items = uow.items_for_order(order.id).await?;
        order.recompute_total(&items);
        uow.update_order(&order).await?;

        uow.commit().await?;

        metrics::counter!("cart_items_added_total").increment(1);
        tracing::info!(%order.id, %user_id, quantity, "item added to pending order");

        Ok(OrderDetails { order, items })
    }

    /// Checks the pending order out: `pending` → `processing`. Stock was
    /// already reserved when the items were added, so nothing moves here.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<OrderDetails, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .find_pending_order(user_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        order.begin_checkout()?;
        uow.update_order(&order).await?;
        let items = uow.items_for_order(order.id).await?;

        uow.commit().await?;

        metrics::counter!("orders_checked_out_total").increment(1);
        tracing::info!(%order.id, %user_id, "order checked out");

        Ok(OrderDetails { order, items })
    }

    /// Loads one order with its items; owners only.
    #[tracing::instrument(skip(self))]
    pub async fn order_for(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<OrderDetails, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let order = uow
            .find_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if !order.is_owned_by(actor.user_id) {
            return Err(CheckoutError::AccessDenied);
        }

        let items = uow.items_for_order(order.id).await?;
        uow.commit().await?;

        Ok(OrderDetails { order, items })
    }

    /// All of a user's orders, newest first, each with its items.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderDetails>, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let orders = uow.orders_for_user(user_id).await?;
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = uow.items_for_order(order.id).await?;
            details.push(OrderDetails { order, items });
        }

        uow.commit().await?;
        Ok(details)
    }

    /// Owner cancellation. Only pending and processing orders qualify, so
    /// the paired stock release can never run twice for one order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<OrderDetails, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .find_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if !order.is_owned_by(actor.user_id) {
            return Err(CheckoutError::AccessDenied);
        }

        order
            .cancel()
            .map_err(|_| CheckoutError::CancellationNotAllowed)?;

        let items = uow.items_for_order(order.id).await?;
        for item in &items {
            inventory::release(&mut uow, item.product_id, &item.variant_value, item.quantity)
                .await?;
        }

        uow.update_order(&order).await?;
        uow.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order.id, "order cancelled by owner");

        Ok(OrderDetails { order, items })
    }
}
