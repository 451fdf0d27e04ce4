use async_trait::async_trait;
use common::{Order, OrderId, Product, ProductId};

use crate::{DailySales, OrderFilter, OrderQuery, Page, ProductSales, Result};

/// Core trait for store implementations.
///
/// Reads on the trait itself see committed data only. Mutations go through a
/// transaction obtained from [`Store::begin`]. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    ///
    /// Implementations must serialize transactions that touch the same
    /// product or order row, so two reservations against one product can
    /// never both observe the same stock count.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Retrieves a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Counts every product in the catalog.
    async fn count_products(&self) -> Result<u64>;

    /// Retrieves an order with its line items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves orders matching a query, with their line items.
    async fn query_orders(&self, query: OrderQuery) -> Result<Page<Order>>;

    /// Counts orders matching a filter.
    async fn count_orders(&self, filter: OrderFilter) -> Result<u64>;

    /// Sums units and revenue per product over the line items of matching
    /// orders, highest quantity first, ties by product id.
    async fn product_sales(&self, filter: OrderFilter, limit: usize) -> Result<Vec<ProductSales>>;

    /// Sums the totals of matching orders per UTC day of creation, oldest
    /// day first. Days without a matching order are omitted.
    async fn daily_revenue(&self, filter: OrderFilter) -> Result<Vec<DailySales>>;
}

/// An open unit of work.
///
/// Dropping a transaction without calling [`StoreTransaction::commit`]
/// discards every change made through it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a product and locks it until the transaction ends.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product.
    async fn save_product(&mut self, product: &Product) -> Result<()>;

    /// Reads an order with its items and locks it until the transaction ends.
    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Inserts a new order together with its line items.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Persists the status and update timestamp of an existing order.
    async fn update_order_status(&mut self, order: &Order) -> Result<()>;

    /// Makes every change visible atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every change.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Inserts or replaces products in one transaction.
    async fn put_products(&self, products: &[Product]) -> Result<()> {
        let mut tx = self.begin().await?;
        for product in products {
            tx.save_product(product).await?;
        }
        tx.commit().await
    }

    /// Inserts a fully-formed order in its own transaction.
    ///
    /// Does not touch stock; meant for imports and fixtures.
    async fn put_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.begin().await?;
        tx.insert_order(order).await?;
        tx.commit().await
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
