//! Order lifecycle engine.

use std::time::Instant;

use chrono::{DateTime, SubsecRound, Utc};
use common::{
    Money, Order, OrderId, OrderLineItem, OrderOwner, OrderStatus, ProductId, ShippingInfo,
    UserIdentity,
};
use store::{OrderFilter, OrderQuery, OrderSort, Page, PageRequest, Store, StoreTransaction};

use crate::error::{DomainError, Result};
use crate::inventory::InventoryLedger;
use crate::notification::NotificationDispatcher;

use super::cart::{CartLine, validate_cart, validate_shipping};
use super::policy::{Checkout, EntryStatusPolicy};

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Commits on success; rolls back and returns the first error otherwise.
async fn finish<T>(tx: Box<dyn StoreTransaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(%rollback_error, "transaction rollback failed");
            }
            Err(error)
        }
    }
}

/// Indices of `products` sorted by product id, stable for repeats.
fn lock_order(products: impl Iterator<Item = ProductId>) -> Vec<usize> {
    let mut indices: Vec<(ProductId, usize)> =
        products.enumerate().map(|(index, id)| (id, index)).collect();
    indices.sort();
    indices.into_iter().map(|(_, index)| index).collect()
}

fn require_admin(requester: &UserIdentity, action: &str) -> Result<()> {
    if requester.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "user {} may not {action}",
            requester.username
        )))
    }
}

fn require_owner_or_admin(order: &Order, requester: &UserIdentity) -> Result<()> {
    if requester.is_admin() || order.is_owned_by(requester.id) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "user {} does not own order {}",
            requester.username, order.id
        )))
    }
}

/// Service for placing, transitioning and reading orders.
///
/// Checkout and cancellation each run in one store transaction, so stock and
/// orders never disagree: either every reservation or restoration and the
/// order change commit together, or none of them do.
pub struct OrderService<S: Store> {
    store: S,
    ledger: InventoryLedger,
    notifier: NotificationDispatcher,
    policy: EntryStatusPolicy,
}

impl<S: Store> OrderService<S> {
    /// Creates a service with the default entry policy and a logging notifier.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
            notifier: NotificationDispatcher::default(),
            policy: EntryStatusPolicy::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_policy(mut self, policy: EntryStatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> EntryStatusPolicy {
        self.policy
    }

    /// Places an order for an authenticated user.
    ///
    /// On success the confirmation is scheduled on the notification gateway;
    /// its outcome never affects the returned order.
    #[tracing::instrument(skip(self, requester, cart, shipping), fields(user = %requester.username))]
    pub async fn create_order(
        &self,
        requester: &UserIdentity,
        cart: &[CartLine],
        shipping: ShippingInfo,
    ) -> Result<Order> {
        let owner = OrderOwner {
            user_id: requester.id,
            username: requester.username.clone(),
        };
        let order = self
            .checkout(Checkout::Authenticated, Some(owner), cart, shipping)
            .await?;

        self.notifier.dispatch(order.clone());
        Ok(order)
    }

    /// Places an order without an account. No confirmation is sent.
    #[tracing::instrument(skip(self, cart, shipping))]
    pub async fn create_guest_order(
        &self,
        cart: &[CartLine],
        shipping: ShippingInfo,
    ) -> Result<Order> {
        self.checkout(Checkout::Guest, None, cart, shipping).await
    }

    async fn checkout(
        &self,
        checkout: Checkout,
        owner: Option<OrderOwner>,
        cart: &[CartLine],
        shipping: ShippingInfo,
    ) -> Result<Order> {
        let started = Instant::now();
        validate_cart(cart)?;
        let shipping = validate_shipping(shipping)?;
        let status = self.policy.entry_status(checkout);

        let mut tx = self.store.begin().await?;
        let result = self
            .place(tx.as_mut(), owner, status, cart, shipping)
            .await;
        let order = finish(tx, result).await?;

        metrics::counter!("orders_created_total", "checkout" => checkout.as_str()).increment(1);
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id,
            checkout = checkout.as_str(),
            status = %order.status,
            total = %order.total_price,
            items = order.item_count(),
            "order created"
        );

        Ok(order)
    }

    async fn place(
        &self,
        tx: &mut dyn StoreTransaction,
        owner: Option<OrderOwner>,
        status: OrderStatus,
        cart: &[CartLine],
        shipping: ShippingInfo,
    ) -> Result<Order> {
        // Product rows are locked in id order so that two carts naming the
        // same products in different orders cannot deadlock.
        let mut reservations = vec![None; cart.len()];
        for index in lock_order(cart.iter().map(|line| line.product_id)) {
            let line = &cart[index];
            let reservation = self
                .ledger
                .reserve_stock(&mut *tx, line.product_id, line.quantity)
                .await?;
            reservations[index] = Some(reservation);
        }

        let items: Vec<OrderLineItem> = reservations
            .into_iter()
            .flatten()
            .map(|reservation| {
                OrderLineItem::new(
                    reservation.product_id,
                    reservation.product_name,
                    reservation.unit_price,
                    reservation.quantity,
                )
            })
            .collect();
        if Money::checked_sum(items.iter().map(|item| &item.subtotal)).is_none() {
            return Err(DomainError::validation("items", "order total is out of range"));
        }

        let order = Order::new(owner, status, shipping, items, now());
        tx.insert_order(&order).await?;
        Ok(order)
    }

    /// Sets an order's status. Any status is accepted and stock is not touched.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::apply_status(tx.as_mut(), order_id, status).await;
        let (order, previous) = finish(tx, result).await?;

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(%order_id, from = %previous, to = %status, "order status updated");
        Ok(order)
    }

    async fn apply_status(
        tx: &mut dyn StoreTransaction,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(Order, OrderStatus)> {
        let mut order = tx
            .order_for_update(order_id)
            .await?
            .ok_or_else(|| DomainError::order_not_found(order_id))?;
        let previous = order.status;
        order.set_status(status, now());
        tx.update_order_status(&order).await?;
        Ok((order, previous))
    }

    /// Cancels a pending order and puts every line's stock back.
    ///
    /// Only the owner or an administrator may cancel, and only while the
    /// order is `PENDING`.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn cancel_order(&self, order_id: OrderId, requester: &UserIdentity) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = self.cancel(tx.as_mut(), order_id, requester).await;
        let order = finish(tx, result).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, items = order.item_count(), "order cancelled");
        Ok(order)
    }

    async fn cancel(
        &self,
        tx: &mut dyn StoreTransaction,
        order_id: OrderId,
        requester: &UserIdentity,
    ) -> Result<Order> {
        let mut order = tx
            .order_for_update(order_id)
            .await?
            .ok_or_else(|| DomainError::order_not_found(order_id))?;
        require_owner_or_admin(&order, requester)?;

        if !order.status.can_cancel() {
            return Err(DomainError::InvalidState {
                order_id,
                status: order.status,
                action: "cancel",
            });
        }

        order.set_status(OrderStatus::Cancelled, now());
        tx.update_order_status(&order).await?;

        for index in lock_order(order.items.iter().map(|item| item.product_id)) {
            let item = &order.items[index];
            self.ledger
                .restore_stock(&mut *tx, item.product_id, item.quantity)
                .await?;
        }
        Ok(order)
    }

    /// Reads an order visible to the requester.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn get_order(&self, order_id: OrderId, requester: &UserIdentity) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::order_not_found(order_id))?;
        require_owner_or_admin(&order, requester)?;
        Ok(order)
    }

    /// The requester's own orders, newest first.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn list_orders_for_user(
        &self,
        requester: &UserIdentity,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        let query = OrderQuery::new(OrderFilter::new().owner(requester.id)).page(page);
        Ok(self.store.query_orders(query).await?)
    }

    /// Every order, sorted as requested. Administrators only.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn list_orders(
        &self,
        requester: &UserIdentity,
        page: PageRequest,
        sort: OrderSort,
    ) -> Result<Page<Order>> {
        require_admin(requester, "list all orders")?;
        let query = OrderQuery::default().sort(sort).page(page);
        Ok(self.store.query_orders(query).await?)
    }

    /// Orders in one status, newest first. Administrators only.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn list_orders_by_status(
        &self,
        requester: &UserIdentity,
        status: OrderStatus,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        require_admin(requester, "list orders by status")?;
        let query = OrderQuery::new(OrderFilter::new().status(status)).page(page);
        Ok(self.store.query_orders(query).await?)
    }

    /// Orders whose owner username, recipient name, recipient phone or id
    /// contains `keyword`, ignoring case. Administrators only.
    #[tracing::instrument(skip(self, requester), fields(user = %requester.username))]
    pub async fn search_orders(
        &self,
        requester: &UserIdentity,
        keyword: &str,
        page: PageRequest,
    ) -> Result<Page<Order>> {
        require_admin(requester, "search orders")?;
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DomainError::validation("keyword", "must not be blank"));
        }
        let query = OrderQuery::new(OrderFilter::new().keyword(keyword)).page(page);
        Ok(self.store.query_orders(query).await?)
    }
}
