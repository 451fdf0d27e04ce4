//! Domain layer for the order-processing core.
//!
//! This crate provides:
//! - The inventory ledger, which reserves and restores product stock
//! - The order lifecycle engine (`OrderService`) for checkout, status
//!   updates, cancellation and order listings
//! - The notification gateway seam and its fire-and-forget dispatcher
//! - The user directory seam used to resolve requesters

pub mod directory;
pub mod error;
pub mod inventory;
pub mod notification;
pub mod order;

pub use directory::{DirectoryError, InMemoryUserDirectory, UserDirectory};
pub use error::{DomainError, Result};
pub use inventory::{InventoryLedger, Reservation};
pub use notification::{
    DEFAULT_NOTIFICATION_TIMEOUT, InMemoryNotificationGateway, LoggingNotificationGateway,
    NotificationDispatcher, NotificationError, NotificationGateway,
};
pub use order::{CartLine, Checkout, EntryStatusPolicy, OrderService};
