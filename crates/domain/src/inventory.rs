//! Inventory ledger: stock reservation and restoration.

use common::{Money, ProductId};
use store::StoreTransaction;

use crate::error::{DomainError, Result};

/// Stock taken from a product, with the catalog values captured at the time.
///
/// The line item built from a reservation must use this price, not a later
/// read of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// `unit_price * quantity`, known to fit.
    pub subtotal: Money,
}

/// Mutates product stock inside an open store transaction.
///
/// Every mutation locks the product row for the rest of the transaction and
/// recomputes the availability status together with the stock count.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Takes `quantity` units of a product.
    ///
    /// Fails with `NotFound` for an unknown product, `InsufficientStock`
    /// when the quantity exceeds the current stock and `Validation` when the
    /// line price does not fit in a `Money`. Nothing is written on failure.
    pub async fn reserve_stock(
        &self,
        tx: &mut dyn StoreTransaction,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Reservation> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity", "must be at least 1"));
        }

        let mut product = tx
            .product_for_update(product_id)
            .await?
            .ok_or_else(|| DomainError::product_not_found(product_id))?;

        if quantity > product.stock {
            metrics::counter!("inventory_reservations_rejected_total").increment(1);
            return Err(DomainError::InsufficientStock {
                product_id,
                product_name: product.name,
                requested: quantity,
                available: product.stock,
            });
        }

        let subtotal = product.price.checked_times(quantity).ok_or_else(|| {
            DomainError::validation(
                "quantity",
                format!("line price for product {product_id} is out of range"),
            )
        })?;

        product.stock -= quantity;
        product.refresh_status();
        tx.save_product(&product).await?;

        metrics::counter!("inventory_reservations_total").increment(1);
        tracing::debug!(
            %product_id,
            quantity,
            remaining = product.stock,
            status = %product.status.as_str(),
            "stock reserved"
        );

        Ok(Reservation {
            product_id,
            product_name: product.name,
            unit_price: product.price,
            quantity,
            subtotal,
        })
    }

    /// Puts `quantity` units back on a product.
    ///
    /// Not idempotent: call it once per cancelled line item.
    pub async fn restore_stock(
        &self,
        tx: &mut dyn StoreTransaction,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let mut product = tx
            .product_for_update(product_id)
            .await?
            .ok_or_else(|| DomainError::product_not_found(product_id))?;

        product.stock = product
            .stock
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity", "stock would overflow"))?;
        product.refresh_status();
        tx.save_product(&product).await?;

        metrics::counter!("inventory_restorations_total").increment(1);
        tracing::debug!(%product_id, quantity, stock = product.stock, "stock restored");

        Ok(())
    }
}
