use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Money, Order, OrderId, Product, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    DailySales, OrderFilter, OrderQuery, OrderSort, Page, ProductSales, Result, SortDirection,
    SortField, StoreError,
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct InMemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

impl InMemoryState {
    fn matching_orders(&self, filter: &OrderFilter) -> Vec<&Order> {
        self.orders
            .values()
            .filter(|order| filter.matches(order))
            .collect()
    }
}

/// In-memory store implementation for testing and single-process use.
///
/// A transaction holds the store-wide lock from `begin` until it commits or
/// is dropped, so transactions are fully serialized. Do not call the read
/// methods of the same store from inside an open transaction: they wait for
/// the same lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

fn compare_orders(a: &Order, b: &Order, sort: OrderSort) -> Ordering {
    let by_field = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::TotalPrice => a.total_price.cmp(&b.total_price),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
    .then_with(|| a.id.cmp(&b.id));

    match sort.direction {
        SortDirection::Asc => by_field,
        SortDirection::Desc => by_field.reverse(),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.state.lock().await.products.len() as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn query_orders(&self, query: OrderQuery) -> Result<Page<Order>> {
        let state = self.state.lock().await;
        let mut orders = state.matching_orders(&query.filter);
        orders.sort_by(|a, b| compare_orders(a, b, query.sort));

        let page = match query.page {
            Some(request) => {
                let total = orders.len() as u64;
                let content = orders
                    .into_iter()
                    .skip(request.offset())
                    .take(request.size)
                    .cloned()
                    .collect();
                Page::new(content, request, total)
            }
            None => Page::unpaged(orders.into_iter().cloned().collect()),
        };
        Ok(page)
    }

    async fn count_orders(&self, filter: OrderFilter) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.matching_orders(&filter).len() as u64)
    }

    async fn product_sales(&self, filter: OrderFilter, limit: usize) -> Result<Vec<ProductSales>> {
        let state = self.state.lock().await;
        let mut orders = state.matching_orders(&filter);
        // Oldest first so the latest recorded name wins.
        orders.sort_by_key(|order| order.created_at);

        let mut sales: HashMap<ProductId, ProductSales> = HashMap::new();
        for item in orders.iter().flat_map(|order| order.items.iter()) {
            let entry = sales
                .entry(item.product_id)
                .or_insert_with(|| ProductSales {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity_sold: 0,
                    revenue: Money::zero(),
                });
            entry.product_name.clone_from(&item.product_name);
            entry.quantity_sold += u64::from(item.quantity);
            entry.revenue += item.subtotal;
        }

        let mut sales: Vec<_> = sales.into_values().collect();
        sales.sort_by(|a, b| {
            b.quantity_sold
                .cmp(&a.quantity_sold)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        sales.truncate(limit);
        Ok(sales)
    }

    async fn daily_revenue(&self, filter: OrderFilter) -> Result<Vec<DailySales>> {
        let state = self.state.lock().await;
        let mut by_day: BTreeMap<NaiveDate, Money> = BTreeMap::new();
        for order in state.matching_orders(&filter) {
            *by_day.entry(order.created_at.date_naive()).or_default() += order.total_price;
        }
        Ok(by_day
            .into_iter()
            .map(|(date, revenue)| DailySales { date, revenue })
            .collect())
    }
}

/// Transaction over a private copy of the store state.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<InMemoryState>,
    working: InMemoryState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        let stored = self
            .working
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "Order",
                id: order.id.to_string(),
            })?;
        stored.status = order.status;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        metrics::counter!("store_transactions_total", "outcome" => "commit").increment(1);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        metrics::counter!("store_transactions_total", "outcome" => "rollback").increment(1);
        Ok(())
    }
}
