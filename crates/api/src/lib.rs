//! HTTP API for the order-processing core.
//!
//! Exposes checkout, order lifecycle and sales statistics over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use common::UserIdentity;
use domain::{
    InMemoryUserDirectory, LoggingNotificationGateway, NotificationDispatcher, OrderService,
    UserDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use statistics::StatisticsAggregator;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/guest", post(routes::orders::create_guest::<S>))
        .route("/orders/my-orders", get(routes::orders::my_orders::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/orders/admin", get(routes::orders::list_all::<S>))
        .route("/orders/admin/search", get(routes::orders::search::<S>))
        .route(
            "/orders/admin/status/{status}",
            get(routes::orders::list_by_status::<S>),
        )
        .route(
            "/orders/admin/{id}/status",
            put(routes::orders::update_status::<S>),
        )
        .route(
            "/statistics/dashboard",
            get(routes::statistics::dashboard::<S>),
        )
        .route(
            "/statistics/date-range",
            get(routes::statistics::date_range::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the order service and statistics aggregator over one store.
pub fn create_state<S: Store + Clone + 'static>(
    store: S,
    directory: Arc<dyn UserDirectory>,
    config: &Config,
) -> Arc<AppState<S>> {
    let notifier = NotificationDispatcher::new(
        Arc::new(LoggingNotificationGateway),
        config.notification_timeout,
    );
    let orders = OrderService::new(store.clone())
        .with_policy(config.entry_status)
        .with_notifier(notifier);
    let statistics = StatisticsAggregator::new(store, directory.clone())
        .with_top_products(config.stats_top_products);

    Arc::new(AppState {
        orders,
        statistics,
        directory,
    })
}

/// Creates state with default configuration and an in-memory user directory
/// holding the configured administrator.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
) -> (Arc<AppState<S>>, InMemoryUserDirectory) {
    let config = Config::default();
    let directory = seed_directory(&config);
    let state = create_state(store, Arc::new(directory.clone()), &config);
    (state, directory)
}

/// Builds an in-memory directory with the administrator and any configured customers.
pub fn seed_directory(config: &Config) -> InMemoryUserDirectory {
    let directory = InMemoryUserDirectory::new();
    directory.insert(UserIdentity::admin(config.admin_username.clone()));
    for username in &config.customer_usernames {
        directory.insert(UserIdentity::customer(username.clone()));
    }
    directory
}
