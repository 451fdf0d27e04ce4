use common::OrderStatus;
use serde::{Deserialize, Serialize};

/// Checkout path an order was created through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkout {
    Authenticated,
    Guest,
}

impl Checkout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Checkout::Authenticated => "authenticated",
            Checkout::Guest => "guest",
        }
    }
}

/// Initial status given to new orders, per checkout path.
///
/// Authenticated checkouts enter `COMPLETED` and guest checkouts enter
/// `PENDING` unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatusPolicy {
    pub authenticated: OrderStatus,
    pub guest: OrderStatus,
}

impl EntryStatusPolicy {
    pub fn new(authenticated: OrderStatus, guest: OrderStatus) -> Self {
        Self {
            authenticated,
            guest,
        }
    }

    pub fn entry_status(&self, checkout: Checkout) -> OrderStatus {
        match checkout {
            Checkout::Authenticated => self.authenticated,
            Checkout::Guest => self.guest,
        }
    }
}

impl Default for EntryStatusPolicy {
    fn default() -> Self {
        Self::new(OrderStatus::Completed, OrderStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = EntryStatusPolicy::default();
        assert_eq!(
            policy.entry_status(Checkout::Authenticated),
            OrderStatus::Completed
        );
        assert_eq!(policy.entry_status(Checkout::Guest), OrderStatus::Pending);
    }

    #[test]
    fn configured_policy() {
        let policy = EntryStatusPolicy::new(OrderStatus::Pending, OrderStatus::Pending);
        assert_eq!(
            policy.entry_status(Checkout::Authenticated),
            OrderStatus::Pending
        );
    }
}
