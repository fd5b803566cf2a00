//! Payment coordination workflows.

use std::time::Instant;

use common::{OrderId, PaymentId};
use domain::{Actor, Order, Payment, PaymentStatus, Settlement};
use store::{Store, UnitOfWork};

use crate::error::CheckoutError;
use crate::gateway::{Outcome, PaymentGateway};
use crate::inventory;

/// The result of a payment transition: the payment and its order, as
/// persisted.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub payment: Payment,
    pub order: Order,
}

/// Drives payment creation, confirmation, retry, and refund.
///
/// Every operation mutates the payment and its order — and, on the failure
/// and refund paths, the inventory — inside one unit of work. The payment
/// status transition is persisted conditionally, so two racing calls for
/// the same payment collapse to one winner; the loser's unit of work is
/// dropped and rolls back.
#[derive(Debug, Clone)]
pub struct PaymentCoordinator<S: Store, G: PaymentGateway> {
    store: S,
    gateway: G,
}

impl<S: Store, G: PaymentGateway> PaymentCoordinator<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Opens a pending payment for an order, snapshotting the order total
    /// as the amount.
    ///
    /// A still-pending order is checked out implicitly — creating a payment
    /// is as clear a checkout signal as the dedicated endpoint.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn create_payment(
        &self,
        actor: Actor,
        order_id: OrderId,
    ) -> Result<Payment, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let mut order = uow
            .find_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if !order.is_owned_by(actor.user_id) {
            return Err(CheckoutError::AccessDenied);
        }

        if order.settlement == Settlement::Paid {
            return Err(CheckoutError::OrderAlreadyPaid);
        }

        if order.status.can_checkout() {
            order.begin_checkout()?;
            uow.update_order(&order).await?;
        }

        let payment = Payment::open(order.id, order.total);
        uow.insert_payment(&payment).await?;
        uow.commit().await?;

        metrics::counter!("payments_created_total").increment(1);
        tracing::info!(%payment.id, %order.id, amount = %payment.amount, "payment created");

        Ok(payment)
    }

    /// Confirms a pending payment with the gateway's verdict.
    ///
    /// Approval settles the order; decline cancels it and returns every
    /// reserved unit to stock. Both outcomes are atomic with the payment
    /// status flip.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Confirmation, CheckoutError> {
        let started = Instant::now();
        let mut uow = self.store.begin().await?;

        let mut payment = uow
            .find_payment(payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;

        if !payment.status.is_confirmable() {
            return Err(CheckoutError::PaymentAlreadyProcessed);
        }

        let mut order = uow
            .find_order(payment.order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        let outcome = self.gateway.authorize(&payment).await;
        match outcome {
            Outcome::Approved => {
                payment.mark_successful()?;
                order.settle()?;
            }
            Outcome::Declined => {
                payment.mark_failed()?;
                order.reject_payment()?;

                let items = uow.items_for_order(order.id).await?;
                for item in &items {
                    inventory::release(
                        &mut uow,
                        item.product_id,
                        &item.variant_value,
                        item.quantity,
                    )
                    .await?;
                }
            }
        }

        // Conditional flip: a concurrent confirmation that won the race
        // leaves this one with zero rows, and dropping the unit of work
        // takes the stock release back with it.
        if !uow
            .transition_payment(payment.id, PaymentStatus::Pending, payment.status)
            .await?
        {
            return Err(CheckoutError::PaymentAlreadyProcessed);
        }

        uow.update_order(&order).await?;
        uow.commit().await?;

        match outcome {
            Outcome::Approved => metrics::counter!("payments_confirmed_total").increment(1),
            Outcome::Declined => metrics::counter!("payments_declined_total").increment(1),
        }
        metrics::histogram!("payment_confirmation_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(%payment.id, %order.id, ?outcome, "payment confirmation applied");

        Ok(Confirmation { payment, order })
    }

    /// Resets a failed payment for another attempt.
    ///
    /// The failure path released the order's stock, so the retry claims it
    /// back before reopening — without this the order could complete
    /// without any stock ever being debited for the winning attempt.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn retry_payment(
        &self,
        actor: Actor,
        payment_id: PaymentId,
    ) -> Result<Confirmation, CheckoutError> {
        let mut uow = self.store.begin().await?;

        let mut payment = uow
            .find_payment(payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;

        let mut order = uow
            .find_order(payment.order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        if !order.is_owned_by(actor.user_id) {
            return Err(CheckoutError::AccessDenied);
        }

        payment.reset_for_retry()?;
        order.reopen()?;

        let items = uow.items_for_order(order.id).await?;
        for item in &items {
            inventory::reserve(&mut uow, item.product_id, &item.variant_value, item.quantity)
                .await?;
        }

        if !uow
            .transition_payment(payment.id, PaymentStatus::Failed, PaymentStatus::Pending)
            .await?
        {
            return Err(CheckoutError::PaymentNotRetryable);
        }

        uow.update_order(&order).await?;
        uow.commit().await?;

        metrics::counter!("payment_retries_total").increment(1);
        tracing::info!(%payment.id, %order.id, "failed payment reset for retry");

        Ok(Confirmation { payment, order })
    }

    /// Refunds a successful payment (admin only): the payment becomes
    /// `refunded`, the order is voided, and every unit goes back to stock.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn refund_payment(
        &self,
        actor: Actor,
        payment_id: PaymentId,
    ) -> Result<Confirmation, CheckoutError> {
        if !actor.is_admin() {
            return Err(CheckoutError::AccessDenied);
        }

        let mut uow = self.store.begin().await?;

        let mut payment = uow
            .find_payment(payment_id)
            .await?
            .ok_or(CheckoutError::PaymentNotFound)?;

        let mut order = uow
            .find_order(payment.order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;

        payment.refund()?;
        order.refund()?;

        let items = uow.items_for_order(order.id).await?;
        for item in &items {
            inventory::release(&mut uow, item.product_id, &item.variant_value, item.quantity)
                .await?;
        }

        if !uow
            .transition_payment(payment.id, PaymentStatus::Successful, PaymentStatus::Refunded)
            .await?
        {
            return Err(CheckoutError::OnlyPaidCanBeRefunded);
        }

        uow.update_order(&order).await?;
        uow.commit().await?;

        metrics::counter!("payments_refunded_total").increment(1);
        tracing::info!(%payment.id, %order.id, "payment refunded");

        Ok(Confirmation { payment, order })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::{Fixture, fixture, fixture_with};
    use crate::gateway::FixedGateway;
    use common::UserId;
    use domain::{OrderStatus, Role, User};
    use store::MemStore;

    fn coordinator(fx: &Fixture, gateway: FixedGateway) -> PaymentCoordinator<MemStore, FixedGateway> {
        PaymentCoordinator::new(fx.store.clone(), gateway)
    }

    /// Adds two units and checks the cart out; returns the order id.
    async fn checked_out_order(fx: &Fixture) -> OrderId {
        fx.cart
            .add_item(fx.user.id, fx.product.id, "M", 2)
            .await
            .unwrap();
        fx.cart.checkout(fx.user.id).await.unwrap().order.id
    }

    async fn stored_payment(fx: &Fixture, id: PaymentId) -> Payment {
        let mut uow = fx.store.begin().await.unwrap();
        uow.find_payment(id).await.unwrap().unwrap()
    }

    async fn stored_order(fx: &Fixture, id: OrderId) -> Order {
        let mut uow = fx.store.begin().await.unwrap();
        uow.find_order(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn create_payment_snapshots_the_order_total() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount.cents(), 10000);
        assert_eq!(payment.order_id, order_id);
    }

    #[tokio::test]
    async fn create_payment_checks_out_a_still_pending_order() {
        let fx = fixture().await;
        let details = fx
            .cart
            .add_item(fx.user.id, fx.product.id, "M", 1)
            .await
            .unwrap();
        let coordinator = coordinator(&fx, FixedGateway::approving());

        coordinator
            .create_payment(Actor::customer(fx.user.id), details.order.id)
            .await
            .unwrap();

        let order = stored_order(&fx, details.order.id).await;
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn create_payment_rejects_unknown_order() {
        let fx = fixture().await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let result = coordinator
            .create_payment(Actor::customer(fx.user.id), OrderId::new())
            .await;
        assert!(matches!(result, Err(CheckoutError::OrderNotFound)));
    }

    #[tokio::test]
    async fn create_payment_rejects_non_owner() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let result = coordinator
            .create_payment(Actor::customer(UserId::new()), order_id)
            .await;
        assert!(matches!(result, Err(CheckoutError::AccessDenied)));
    }

    #[tokio::test]
    async fn create_payment_rejects_paid_order() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());
        let actor = Actor::customer(fx.user.id);

        let payment = coordinator.create_payment(actor, order_id).await.unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();

        let result = coordinator.create_payment(actor, order_id).await;
        assert!(matches!(result, Err(CheckoutError::OrderAlreadyPaid)));
    }

    #[tokio::test]
    async fn approved_confirmation_settles_the_order() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();
        let confirmation = coordinator.confirm_payment(payment.id).await.unwrap();

        assert_eq!(confirmation.payment.status, PaymentStatus::Successful);
        assert_eq!(confirmation.order.status, OrderStatus::Completed);
        assert_eq!(confirmation.order.settlement, Settlement::Paid);
        // Stock stays debited on success.
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(8));
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_and_restocks() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::declining());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();
        let confirmation = coordinator.confirm_payment(payment.id).await.unwrap();

        assert_eq!(confirmation.payment.status, PaymentStatus::Failed);
        assert_eq!(confirmation.order.status, OrderStatus::Cancelled);
        assert_eq!(confirmation.order.settlement, Settlement::Unpaid);
        // Every reserved unit went back.
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(10));
    }

    #[tokio::test]
    async fn confirm_rejects_unknown_payment() {
        let fx = fixture().await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let result = coordinator.confirm_payment(PaymentId::new()).await;
        assert!(matches!(result, Err(CheckoutError::PaymentNotFound)));
    }

    #[tokio::test]
    async fn confirm_rejects_already_processed_payment() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();

        let result = coordinator.confirm_payment(payment.id).await;
        assert!(matches!(result, Err(CheckoutError::PaymentAlreadyProcessed)));
    }

    #[tokio::test]
    async fn retry_rereserves_stock_and_reopens_the_order() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let decline = coordinator(&fx, FixedGateway::declining());
        let approve = coordinator(&fx, FixedGateway::approving());
        let actor = Actor::customer(fx.user.id);

        let payment = decline.create_payment(actor, order_id).await.unwrap();
        decline.confirm_payment(payment.id).await.unwrap();
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(10));

        let retried = approve.retry_payment(actor, payment.id).await.unwrap();
        assert_eq!(retried.payment.status, PaymentStatus::Pending);
        assert_eq!(retried.order.status, OrderStatus::Processing);
        // The retry claimed the stock back.
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(8));

        let confirmation = approve.confirm_payment(payment.id).await.unwrap();
        assert_eq!(confirmation.payment.status, PaymentStatus::Successful);
        assert_eq!(confirmation.order.status, OrderStatus::Completed);
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(8));
    }

    #[tokio::test]
    async fn retry_rejects_successful_payment() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());
        let actor = Actor::customer(fx.user.id);

        let payment = coordinator.create_payment(actor, order_id).await.unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();

        let result = coordinator.retry_payment(actor, payment.id).await;
        assert!(matches!(result, Err(CheckoutError::PaymentNotRetryable)));
    }

    #[tokio::test]
    async fn retry_rejects_non_owner() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::declining());
        let actor = Actor::customer(fx.user.id);

        let payment = coordinator.create_payment(actor, order_id).await.unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();

        let result = coordinator
            .retry_payment(Actor::customer(UserId::new()), payment.id)
            .await;
        assert!(matches!(result, Err(CheckoutError::AccessDenied)));
    }

    #[tokio::test]
    async fn retry_fails_cleanly_when_the_stock_is_gone() {
        let fx = fixture_with(2, 5000).await;
        let order_id = checked_out_order(&fx).await; // takes both units
        let coordinator = coordinator(&fx, FixedGateway::declining());
        let actor = Actor::customer(fx.user.id);

        let payment = coordinator.create_payment(actor, order_id).await.unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(2));

        // Another shopper takes the stock before the retry.
        let rival = User {
            id: UserId::new(),
            email: "rival@example.com".to_string(),
            role: Role::Customer,
        };
        let mut uow = fx.store.begin().await.unwrap();
        uow.insert_user(&rival).await.unwrap();
        uow.commit().await.unwrap();
        fx.cart
            .add_item(rival.id, fx.product.id, "M", 2)
            .await
            .unwrap();

        let result = coordinator.retry_payment(actor, payment.id).await;
        assert!(matches!(result, Err(CheckoutError::InsufficientStock)));

        // Nothing was half-applied: the payment is still failed and the
        // order still cancelled.
        assert_eq!(
            stored_payment(&fx, payment.id).await.status,
            PaymentStatus::Failed
        );
        assert_eq!(
            stored_order(&fx, order_id).await.status,
            OrderStatus::Cancelled
        );
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(0));
    }

    #[tokio::test]
    async fn refund_requires_the_admin_role() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());
        let actor = Actor::customer(fx.user.id);

        let payment = coordinator.create_payment(actor, order_id).await.unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();

        // Even the owner cannot refund without the admin role.
        let result = coordinator.refund_payment(actor, payment.id).await;
        assert!(matches!(result, Err(CheckoutError::AccessDenied)));
    }

    #[tokio::test]
    async fn refund_voids_the_order_and_restocks() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();
        coordinator.confirm_payment(payment.id).await.unwrap();
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(8));

        let refund = coordinator
            .refund_payment(Actor::admin(UserId::new()), payment.id)
            .await
            .unwrap();

        assert_eq!(refund.payment.status, PaymentStatus::Refunded);
        assert_eq!(refund.order.status, OrderStatus::Cancelled);
        assert_eq!(refund.order.settlement, Settlement::Unpaid);
        assert_eq!(fx.store.stock_of(fx.product.id, "M"), Some(10));
    }

    #[tokio::test]
    async fn refund_rejects_a_payment_that_never_succeeded() {
        let fx = fixture().await;
        let order_id = checked_out_order(&fx).await;
        let coordinator = coordinator(&fx, FixedGateway::approving());
        let admin = Actor::admin(UserId::new());

        let payment = coordinator
            .create_payment(Actor::customer(fx.user.id), order_id)
            .await
            .unwrap();

        let result = coordinator.refund_payment(admin, payment.id).await;
        assert!(matches!(result, Err(CheckoutError::OnlyPaidCanBeRefunded)));
    }

    #[tokio::test]
    async fn refund_rejects_unknown_payment() {
        let fx = fixture().await;
        let coordinator = coordinator(&fx, FixedGateway::approving());

        let result = coordinator
            .refund_payment(Actor::admin(UserId::new()), PaymentId::new())
            .await;
        assert!(matches!(result, Err(CheckoutError::PaymentNotFound)));
    }
}
