//! Transactional persistence for products, orders and their line items.
//!
//! The [`Store`] trait is the read side plus a [`Store::begin`] entry point;
//! every mutation happens through a [`StoreTransaction`] which either commits
//! as a whole or leaves no trace.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{
    DailySales, OrderFilter, OrderQuery, OrderSort, Page, PageRequest, ProductSales, SortDirection,
    SortField,
};
pub use store::{Store, StoreExt, StoreTransaction};
