//! Catalog read models.
//!
//! Products and variants are owned by the catalog subsystem; the order
//! workflow only reads them (and debits/credits variant stock through the
//! inventory ledger). Soft-deleted rows never reach these structs — the
//! store filters them out at query time.

use common::{Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// A catalog product as the order workflow sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    pub gender: String,
    pub is_active: bool,
}

impl Product {
    /// True when the product may be placed into a cart.
    pub fn is_purchasable(&self) -> bool {
        self.is_active
    }
}

/// A purchasable unit: product plus variant value (size, colour, ...).
///
/// `stock` never goes below zero; all mutation goes through the inventory
/// ledger's conditional debit and unconditional credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub variant_value: String,
    pub price: Money,
    pub stock: i32,
    pub is_active: bool,
}

impl ProductVariant {
    /// True when the requested quantity could be satisfied right now.
    ///
    /// Advisory only — the authoritative check is the conditional debit in
    /// the store, which re-verifies under the transaction.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= 0 && self.stock as u32 >= quantity
    }
}
