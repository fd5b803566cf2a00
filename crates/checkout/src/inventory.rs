//! Inventory ledger: the only path allowed to move variant stock.
//!
//! Both operations run inside the caller's unit of work, so a reservation
//! whose enclosing transaction aborts is rolled back with it. Every
//! successful `reserve` must eventually be matched by exactly one `release`
//! on the failure, refund, or cancellation path of the same order items.

use common::ProductId;
use domain::ProductVariant;
use store::UnitOfWork;

use crate::error::CheckoutError;

/// Reserves `quantity` units of a variant by debiting its stock.
///
/// Fails with [`CheckoutError::ProductUnavailable`] when no live, active
/// variant matches, and with [`CheckoutError::InsufficientStock`] when the
/// conditional debit finds fewer units than requested. The check and the
/// decrement are one atomic statement in the store, so concurrent
/// reservations cannot both take the last units.
pub async fn reserve<U: UnitOfWork>(
    uow: &mut U,
    product_id: ProductId,
    variant_value: &str,
    quantity: u32,
) -> Result<ProductVariant, CheckoutError> {
    let mut variant = uow
        .find_variant(product_id, variant_value)
        .await?
        .filter(|v| v.is_active)
        .ok_or(CheckoutError::ProductUnavailable)?;

    if !uow.debit_stock(variant.id, quantity).await? {
        return Err(CheckoutError::InsufficientStock);
    }

    variant.stock -= quantity as i32;
    Ok(variant)
}

/// Returns `quantity` units to a variant's stock, unconditionally.
///
/// Idempotency is the caller's responsibility. A missing variant row (for
/// example soft-deleted by the catalog after the sale) is logged and
/// otherwise ignored — the release must never fail the surrounding
/// workflow.
pub async fn release<U: UnitOfWork>(
    uow: &mut U,
    product_id: ProductId,
    variant_value: &str,
    quantity: u32,
) -> Result<(), CheckoutError> {
    let credited = uow.credit_stock(product_id, variant_value, quantity).await?;
    if !credited {
        tracing::warn!(
            %product_id,
            variant_value,
            quantity,
            "stock release found no live variant row"
        );
    }
    Ok(())
}
