//! Order aggregate data: the order, its line items and its status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{LineItemId, Money, OrderId, ParseStatusError, ProductId, UserId};

/// Owner name rendered for orders placed without an account.
pub const GUEST_DISPLAY_NAME: &str = "Guest";

/// Payment method recorded when the checkout does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "COD";

/// The status of an order in its lifecycle.
///
/// ```text
/// Pending ──► Shipping ──► Completed
///    │           │
///    └───────────┴──► Cancelled
/// ```
///
/// Only `Pending` orders may be cancelled by a customer; administrators can
/// force any status through a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipping,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Statuses whose orders count towards revenue.
    pub const REVENUE: [OrderStatus; 2] = [OrderStatus::Completed, OrderStatus::Shipping];

    /// Returns true if the order can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "order",
                value: s.to_string(),
            })
    }
}

/// Reference to the account that placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOwner {
    pub user_id: UserId,
    /// Username at the time of checkout, kept for display and search.
    pub username: String,
}

/// Delivery and payment details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub shipping_address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_string()
}

impl ShippingInfo {
    /// Creates shipping info paid cash-on-delivery with no notes.
    pub fn new(
        recipient_name: impl Into<String>,
        recipient_phone: impl Into<String>,
        shipping_address: impl Into<String>,
    ) -> Self {
        Self {
            recipient_name: recipient_name.into(),
            recipient_phone: recipient_phone.into(),
            shipping_address: shipping_address.into(),
            notes: None,
            payment_method: default_payment_method(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = method.into();
        self
    }
}

/// A line of an order.
///
/// Name and unit price are snapshots taken when stock was reserved; later
/// catalog changes never reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    /// Always `unit_price * quantity`.
    pub subtotal: Money,
}

impl OrderLineItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            id: LineItemId::new(),
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
            subtotal: unit_price.times(quantity),
        }
    }

    /// Returns true if the stored subtotal matches price times quantity.
    pub fn subtotal_is_consistent(&self) -> bool {
        self.subtotal == self.unit_price.times(self.quantity)
    }
}

/// An order together with the line items it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// `None` for guest checkouts.
    pub owner: Option<OrderOwner>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a new order; the total is derived from the items.
    pub fn new(
        owner: Option<OrderOwner>,
        status: OrderStatus,
        shipping: ShippingInfo,
        items: Vec<OrderLineItem>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_price = items.iter().map(|item| item.subtotal).sum();
        Self {
            id: OrderId::new(),
            owner,
            total_price,
            status,
            shipping,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.owner.is_none()
    }

    /// Returns true if the order belongs to the given user.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|owner| owner.user_id == user_id)
    }

    /// Owner name for display, or [`GUEST_DISPLAY_NAME`] for guest orders.
    pub fn owner_display(&self) -> &str {
        self.owner
            .as_ref()
            .map_or(GUEST_DISPLAY_NAME, |owner| owner.username.as_str())
    }

    /// Changes the status and refreshes the update timestamp.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the total and every subtotal agree with the items.
    pub fn totals_are_consistent(&self) -> bool {
        self.items.iter().all(OrderLineItem::subtotal_is_consistent)
            && self.total_price == self.items.iter().map(|item| item.subtotal).sum()
    }
}
