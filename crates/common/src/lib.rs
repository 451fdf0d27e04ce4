//! Shared identifiers and data model for the order-processing core.
//!
//! Everything in here is plain data: the store persists these types and the
//! domain layer enforces the rules around them.

pub mod money;
pub mod order;
pub mod product;
pub mod types;
pub mod user;

pub use money::Money;
pub use order::{
    DEFAULT_PAYMENT_METHOD, GUEST_DISPLAY_NAME, Order, OrderLineItem, OrderOwner, OrderStatus,
    ShippingInfo,
};
pub use product::{Product, ProductStatus};
pub use types::{LineItemId, OrderId, ParseStatusError, ProductId, UserId};
pub use user::{UserIdentity, UserRole};
