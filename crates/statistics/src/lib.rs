//! Read-only sales statistics.
//!
//! Every report is computed on demand from committed orders:
//! - [`StatisticsAggregator`] builds dashboard and date-range reports
//! - [`StatisticsWindow`] bounds the period a report covers
//! - [`StatisticsReport`] is the serializable result

pub mod aggregator;
pub mod error;
pub mod report;
pub mod window;

pub use aggregator::{DEFAULT_TOP_PRODUCTS, StatisticsAggregator};
pub use error::{Result, StatisticsError};
pub use report::{DailyRevenue, StatisticsReport, StatusCounts, TopSellingProduct};
pub use window::StatisticsWindow;
