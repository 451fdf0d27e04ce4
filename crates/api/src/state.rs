//! Shared application state.

use std::sync::Arc;

use domain::{OrderService, UserDirectory};
use statistics::StatisticsAggregator;
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub statistics: StatisticsAggregator<S>,
    pub directory: Arc<dyn UserDirectory>,
}
