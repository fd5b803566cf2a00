//! End-to-end workflow tests over the in-memory store.
//!
//! These drive the full cart → checkout → payment → confirm/retry/refund
//! sequences through the public services and assert the cross-cutting
//! properties: stock conservation, single pending order, total integrity.

use checkout::{CartService, CheckoutError, FixedGateway, PaymentCoordinator};
use common::{Money, ProductId, UserId, VariantId};
use domain::{Actor, OrderStatus, PaymentStatus, Product, ProductVariant, Role, Settlement, User};
use store::{MemStore, Store, UnitOfWork};

struct World {
    store: MemStore,
    cart: CartService<MemStore>,
    user: User,
    shirt: Product,
    cap: Product,
}

impl World {
    fn approve(&self) -> PaymentCoordinator<MemStore, FixedGateway> {
        PaymentCoordinator::new(self.store.clone(), FixedGateway::approving())
    }

    fn decline(&self) -> PaymentCoordinator<MemStore, FixedGateway> {
        PaymentCoordinator::new(self.store.clone(), FixedGateway::declining())
    }

    fn actor(&self) -> Actor {
        Actor::customer(self.user.id)
    }
}

async fn world() -> World {
    let store = MemStore::new();
    let user = User {
        id: UserId::new(),
        email: "shopper@example.com".to_string(),
        role: Role::Customer,
    };
    let shirt = Product {
        id: ProductId::new(),
        name: "Linen shirt".to_string(),
        description: None,
        product_type: "shirt".to_string(),
        gender: "men".to_string(),
        is_active: true,
    };
    let cap = Product {
        id: ProductId::new(),
        name: "Wool cap".to_string(),
        description: None,
        product_type: "cap".to_string(),
        gender: "unisex".to_string(),
        is_active: true,
    };

    let mut uow = store.begin().await.unwrap();
    uow.insert_user(&user).await.unwrap();
    uow.insert_product(&shirt).await.unwrap();
    uow.insert_product(&cap).await.unwrap();
    for (product, value, stock, price) in [
        (&shirt, "M", 10, 5000),
        (&shirt, "L", 4, 5500),
        (&cap, "one-size", 6, 2000),
    ] {
        uow.insert_variant(&ProductVariant {
            id: VariantId::new(),
            product_id: product.id,
            variant_value: value.to_string(),
            price: Money::from_cents(price),
            stock,
            is_active: true,
        })
        .await
        .unwrap();
    }
    uow.commit().await.unwrap();

    World {
        cart: CartService::new(store.clone()),
        store,
        user,
        shirt,
        cap,
    }
}

#[tokio::test]
async fn mixed_cart_totals_and_reserves_across_variants() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 2).await.unwrap();
    w.cart.add_item(w.user.id, w.shirt.id, "L", 1).await.unwrap();
    let details = w
        .cart
        .add_item(w.user.id, w.cap.id, "one-size", 3)
        .await
        .unwrap();

    assert_eq!(details.items.len(), 3);
    // 2 * 50.00 + 1 * 55.00 + 3 * 20.00
    assert_eq!(details.order.total.cents(), 21500);
    assert_eq!(
        details.order.total,
        details.items.iter().map(|i| i.final_price).sum()
    );

    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(8));
    assert_eq!(w.store.stock_of(w.shirt.id, "L"), Some(3));
    assert_eq!(w.store.stock_of(w.cap.id, "one-size"), Some(3));
}

#[tokio::test]
async fn declined_payment_returns_every_reserved_unit() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 2).await.unwrap();
    w.cart.add_item(w.user.id, w.shirt.id, "L", 4).await.unwrap();
    w.cart
        .add_item(w.user.id, w.cap.id, "one-size", 1)
        .await
        .unwrap();
    let order = w.cart.checkout(w.user.id).await.unwrap().order;

    let decline = w.decline();
    let payment = decline.create_payment(w.actor(), order.id).await.unwrap();
    let confirmation = decline.confirm_payment(payment.id).await.unwrap();

    assert_eq!(confirmation.payment.status, PaymentStatus::Failed);
    assert_eq!(confirmation.order.status, OrderStatus::Cancelled);

    // Conservation: released exactly what was reserved, per variant.
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(10));
    assert_eq!(w.store.stock_of(w.shirt.id, "L"), Some(4));
    assert_eq!(w.store.stock_of(w.cap.id, "one-size"), Some(6));
}

#[tokio::test]
async fn refund_after_success_restores_the_initial_stock() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 3).await.unwrap();
    let order = w.cart.checkout(w.user.id).await.unwrap().order;

    let approve = w.approve();
    let payment = approve.create_payment(w.actor(), order.id).await.unwrap();
    approve.confirm_payment(payment.id).await.unwrap();
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(7));

    let refund = approve
        .refund_payment(Actor::admin(UserId::new()), payment.id)
        .await
        .unwrap();

    assert_eq!(refund.payment.status, PaymentStatus::Refunded);
    assert_eq!(refund.order.settlement, Settlement::Unpaid);
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(10));
}

#[tokio::test]
async fn fail_retry_succeed_ends_with_stock_debited_once() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 2).await.unwrap();
    let order = w.cart.checkout(w.user.id).await.unwrap().order;

    let decline = w.decline();
    let approve = w.approve();

    let payment = decline.create_payment(w.actor(), order.id).await.unwrap();
    decline.confirm_payment(payment.id).await.unwrap();
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(10));

    approve.retry_payment(w.actor(), payment.id).await.unwrap();
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(8));

    let confirmation = approve.confirm_payment(payment.id).await.unwrap();
    assert_eq!(confirmation.order.status, OrderStatus::Completed);
    assert_eq!(confirmation.order.settlement, Settlement::Paid);
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(8));
}

#[tokio::test]
async fn at_most_one_pending_order_per_user() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 1).await.unwrap();
    w.cart
        .add_item(w.user.id, w.cap.id, "one-size", 1)
        .await
        .unwrap();

    let orders = w.cart.orders_for_user(w.user.id).await.unwrap();
    assert_eq!(orders.len(), 1);

    // Checkout closes the cart; the next add opens a second order, but
    // never a second *pending* one.
    w.cart.checkout(w.user.id).await.unwrap();
    w.cart.add_item(w.user.id, w.shirt.id, "M", 1).await.unwrap();

    let orders = w.cart.orders_for_user(w.user.id).await.unwrap();
    assert_eq!(orders.len(), 2);
    let pending: Vec<_> = orders
        .iter()
        .filter(|d| d.order.status == OrderStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn confirmation_after_owner_cancel_cannot_double_release() {
    let w = world().await;

    w.cart.add_item(w.user.id, w.shirt.id, "M", 2).await.unwrap();
    let order = w.cart.checkout(w.user.id).await.unwrap().order;

    let decline = w.decline();
    let payment = decline.create_payment(w.actor(), order.id).await.unwrap();

    // Owner cancels while the payment is still pending: stock comes back.
    w.cart.cancel_order(w.actor(), order.id).await.unwrap();
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(10));

    // The confirmation can no longer act on the cancelled order, and in
    // particular cannot release the stock a second time.
    let result = decline.confirm_payment(payment.id).await;
    assert!(matches!(result, Err(CheckoutError::Order(_))));
    assert_eq!(w.store.stock_of(w.shirt.id, "M"), Some(10));
}

#[tokio::test]
async fn stock_is_never_oversold_at_the_boundary() {
    let w = world().await;

    // Take exactly the remaining four, then one more must fail.
    w.cart.add_item(w.user.id, w.shirt.id, "L", 4).await.unwrap();
    let result = w.cart.add_item(w.user.id, w.shirt.id, "L", 1).await;

    assert!(matches!(result, Err(CheckoutError::InsufficientStock)));
    assert_eq!(w.store.stock_of(w.shirt.id, "L"), Some(0));

    // The failed add did not corrupt the cart: the order still holds the
    // four units and its total matches.
    let orders = w.cart.orders_for_user(w.user.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[0].items[0].quantity, 4);
    assert_eq!(orders[0].order.total.cents(), 22000);
}
