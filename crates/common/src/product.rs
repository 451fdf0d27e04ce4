//! Catalog product, reduced to the fields inventory cares about.

use serde::{Deserialize, Serialize};

use crate::{Money, ParseStatusError, ProductId};

/// Availability state of a product.
///
/// Always derived from the stock count: `OutOfStock` iff stock is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Active,
    OutOfStock,
}

impl ProductStatus {
    /// Returns the status implied by a stock count.
    pub fn for_stock(stock: u32) -> Self {
        if stock == 0 {
            ProductStatus::OutOfStock
        } else {
            ProductStatus::Active
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "ACTIVE",
            ProductStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ProductStatus::Active),
            "OUT_OF_STOCK" => Ok(ProductStatus::OutOfStock),
            other => Err(ParseStatusError {
                kind: "product",
                value: other.to_string(),
            }),
        }
    }
}

/// A product as seen by the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current unit price.
    pub price: Money,
    pub stock: u32,
    pub status: ProductStatus,
}

impl Product {
    /// Creates a product with a fresh id and a status consistent with `stock`.
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock,
            status: ProductStatus::for_stock(stock),
        }
    }

    /// Recomputes `status` from `stock`. Call after every stock mutation.
    pub fn refresh_status(&mut self) {
        self.status = ProductStatus::for_stock(self.stock);
    }

    /// Returns true if the status agrees with the stock count.
    pub fn status_is_consistent(&self) -> bool {
        self.status == ProductStatus::for_stock(self.stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_derives_status_from_stock() {
        assert_eq!(
            Product::new("Widget", Money::from_cents(100), 3).status,
            ProductStatus::Active
        );
        assert_eq!(
            Product::new("Widget", Money::from_cents(100), 0).status,
            ProductStatus::OutOfStock
        );
    }

    #[test]
    fn refresh_status_tracks_stock() {
        let mut product = Product::new("Widget", Money::from_cents(100), 1);
        product.stock = 0;
        assert!(!product.status_is_consistent());
        product.refresh_status();
        assert_eq!(product.status, ProductStatus::OutOfStock);

        product.stock = 4;
        product.refresh_status();
        assert_eq!(product.status, ProductStatus::Active);
    }

    #[test]
    fn status_parses_from_wire_name() {
        assert_eq!(
            "OUT_OF_STOCK".parse::<ProductStatus>().unwrap(),
            ProductStatus::OutOfStock
        );
        assert!("INACTIVE".parse::<ProductStatus>().is_err());
    }
}
