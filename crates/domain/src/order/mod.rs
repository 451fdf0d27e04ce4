//! Order lifecycle: checkout, status transitions and cancellation.

mod cart;
mod policy;
mod service;

pub use cart::{
    CartLine, MAX_ADDRESS_LEN, MAX_NOTES_LEN, MAX_PAYMENT_METHOD_LEN, MAX_RECIPIENT_NAME_LEN,
};
pub use policy::{Checkout, EntryStatusPolicy};
pub use service::OrderService;
