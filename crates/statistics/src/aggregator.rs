//! Statistics aggregator: stateless queries over committed orders.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{Money, OrderStatus, UserRole};
use domain::UserDirectory;
use store::{OrderFilter, Store};

use crate::Result;
use crate::report::{DailyRevenue, StatisticsReport, StatusCounts, TopSellingProduct};
use crate::window::StatisticsWindow;

/// Number of top sellers included in a report unless configured otherwise.
pub const DEFAULT_TOP_PRODUCTS: usize = 10;

/// Builds sales reports from the order store and the user directory.
///
/// Holds no state of its own; every report reads committed data.
pub struct StatisticsAggregator<S: Store> {
    store: S,
    directory: Arc<dyn UserDirectory>,
    top_products: usize,
}

impl<S: Store> StatisticsAggregator<S> {
    pub fn new(store: S, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            store,
            directory,
            top_products: DEFAULT_TOP_PRODUCTS,
        }
    }

    pub fn with_top_products(mut self, top_products: usize) -> Self {
        self.top_products = top_products;
        self
    }

    pub fn top_products(&self) -> usize {
        self.top_products
    }

    /// Month-to-date report with all-time order counts.
    pub async fn dashboard(&self) -> Result<StatisticsReport> {
        self.dashboard_at(Utc::now()).await
    }

    /// Month-to-date report as of `now`.
    #[tracing::instrument(skip(self))]
    pub async fn dashboard_at(&self, now: DateTime<Utc>) -> Result<StatisticsReport> {
        let started = Instant::now();
        let window = StatisticsWindow::month_to_date(now);

        let status_counts = self.status_counts(OrderFilter::new()).await?;
        let report = self
            .build(window, status_counts.total(), status_counts)
            .await?;

        record("dashboard", started);
        Ok(report)
    }

    /// Report for an explicit window; order counts cover the window only.
    ///
    /// Both bounds are required and inclusive. The window is checked before
    /// any store access.
    #[tracing::instrument(skip(self))]
    pub async fn for_date_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<StatisticsReport> {
        let window = StatisticsWindow::from_bounds(start, end)?;
        let started = Instant::now();

        let status_counts = self.status_counts(window.filter()).await?;
        let report = self
            .build(window, status_counts.total(), status_counts)
            .await?;

        record("date_range", started);
        Ok(report)
    }

    async fn build(
        &self,
        window: StatisticsWindow,
        total_orders: u64,
        status_counts: StatusCounts,
    ) -> Result<StatisticsReport> {
        let (total_revenue, revenue_by_date) = self.revenue(window).await?;
        let top_selling_products = self
            .store
            .product_sales(
                OrderFilter::new().statuses(OrderStatus::REVENUE),
                self.top_products,
            )
            .await?
            .into_iter()
            .map(TopSellingProduct::from)
            .collect();

        let total_customers = self.directory.count_by_role(UserRole::Customer).await?;
        let total_products = self.store.count_products().await?;

        tracing::debug!(
            start = %window.start,
            end = %window.end,
            %total_revenue,
            total_orders,
            "statistics computed"
        );

        Ok(StatisticsReport {
            window,
            total_revenue,
            total_orders,
            total_customers,
            total_products,
            status_counts,
            top_selling_products,
            revenue_by_date,
        })
    }

    async fn status_counts(&self, filter: OrderFilter) -> Result<StatusCounts> {
        let mut counts = StatusCounts::default();
        for status in OrderStatus::ALL {
            let count = self
                .store
                .count_orders(OrderFilter {
                    statuses: Some(vec![status]),
                    ..filter.clone()
                })
                .await?;
            counts.set(status, count);
        }
        Ok(counts)
    }

    /// Total and per-day revenue of revenue orders created in the window.
    async fn revenue(&self, window: StatisticsWindow) -> Result<(Money, Vec<DailyRevenue>)> {
        let filter = window.filter().statuses(OrderStatus::REVENUE);
        let daily: Vec<DailyRevenue> = self
            .store
            .daily_revenue(filter)
            .await?
            .into_iter()
            .map(DailyRevenue::from)
            .collect();

        let total = daily.iter().map(|day| day.revenue).sum();
        Ok((total, daily))
    }
}

fn record(kind: &'static str, started: Instant) {
    metrics::counter!("statistics_reports_total", "kind" => kind).increment(1);
    metrics::histogram!("statistics_report_duration_seconds", "kind" => kind)
        .record(started.elapsed().as_secs_f64());
}
