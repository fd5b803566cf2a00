//! Order line items.

use common::{ItemId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductVariant};

/// A line item: snapshot of the product at the moment it entered the cart,
/// plus a mutable quantity.
///
/// The snapshot fields (`name`, `description`, `product_type`, `gender`,
/// `unit_price`) are copied at add time and never re-read from the catalog,
/// so later catalog edits cannot rewrite order history. One row exists per
/// `(order, product, variant_value)`; adding the same variant again grows
/// the quantity instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: ItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    pub gender: String,
    pub variant_value: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub final_price: Money,
}

impl OrderItem {
    /// Snapshots a product/variant pair into a new line item.
    pub fn snapshot(
        order_id: OrderId,
        product: &Product,
        variant: &ProductVariant,
        quantity: u32,
    ) -> Self {
        Self {
            id: ItemId::new(),
            order_id,
            product_id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            product_type: product.product_type.clone(),
            gender: product.gender.clone(),
            variant_value: variant.variant_value.clone(),
            unit_price: variant.price,
            quantity,
            final_price: variant.price.times(quantity),
        }
    }

    /// Grows the quantity, repricing the line from the unit price stored at
    /// add time. A catalog price change between adds does not affect the
    /// line: the price is locked when the item first enters the cart.
    pub fn add_quantity(&mut self, additional: u32) {
        self.quantity += additional;
        self.final_price = self.unit_price.times(self.quantity);
    }

    /// Test-only constructor with placeholder snapshot fields.
    #[cfg(test)]
    pub(crate) fn snapshot_for_tests(
        order_id: OrderId,
        product_id: ProductId,
        variant_value: &str,
    ) -> Self {
        Self {
            id: ItemId::new(),
            order_id,
            product_id,
            name: "Test product".to_string(),
            description: None,
            product_type: "shirt".to_string(),
            gender: "unisex".to_string(),
            variant_value: variant_value.to_string(),
            unit_price: Money::from_cents(1000),
            quantity: 1,
            final_price: Money::from_cents(1000),
        }
    }
}
