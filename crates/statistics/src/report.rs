//! Report types returned by the statistics aggregator.

use chrono::NaiveDate;
use common::{Money, OrderStatus, ProductId};
use serde::{Serialize, Serializer};
use store::{DailySales, ProductSales};

use crate::window::StatisticsWindow;

/// Display format for report days.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Number of orders in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending_orders: u64,
    pub shipping_orders: u64,
    pub completed_orders: u64,
    pub cancelled_orders: u64,
}

impl StatusCounts {
    pub fn get(&self, status: OrderStatus) -> u64 {
        match status {
            OrderStatus::Pending => self.pending_orders,
            OrderStatus::Shipping => self.shipping_orders,
            OrderStatus::Completed => self.completed_orders,
            OrderStatus::Cancelled => self.cancelled_orders,
        }
    }

    pub fn set(&mut self, status: OrderStatus, count: u64) {
        let slot = match status {
            OrderStatus::Pending => &mut self.pending_orders,
            OrderStatus::Shipping => &mut self.shipping_orders,
            OrderStatus::Completed => &mut self.completed_orders,
            OrderStatus::Cancelled => &mut self.cancelled_orders,
        };
        *slot = count;
    }

    pub fn total(&self) -> u64 {
        OrderStatus::ALL.iter().map(|status| self.get(*status)).sum()
    }
}

/// Units sold and revenue for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSellingProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub total_quantity_sold: u64,
    pub total_revenue: Money,
}

impl From<ProductSales> for TopSellingProduct {
    fn from(sales: ProductSales) -> Self {
        Self {
            product_id: sales.product_id,
            product_name: sales.product_name,
            total_quantity_sold: sales.quantity_sold,
            total_revenue: sales.revenue,
        }
    }
}

fn serialize_day<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}

/// Revenue of one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    #[serde(serialize_with = "serialize_day")]
    pub date: NaiveDate,
    pub revenue: Money,
}

impl From<DailySales> for DailyRevenue {
    fn from(sales: DailySales) -> Self {
        Self {
            date: sales.date,
            revenue: sales.revenue,
        }
    }
}

impl DailyRevenue {
    /// The day rendered as `dd/MM/yyyy`.
    pub fn label(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Sales summary for a window.
///
/// Revenue and daily revenue only count `COMPLETED` and `SHIPPING` orders
/// created inside the window. Top sellers cover all time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsReport {
    pub window: StatisticsWindow,
    pub total_revenue: Money,
    pub total_orders: u64,
    pub total_customers: u64,
    pub total_products: u64,
    #[serde(flatten)]
    pub status_counts: StatusCounts,
    pub top_selling_products: Vec<TopSellingProduct>,
    /// Ascending by date.
    pub revenue_by_date: Vec<DailyRevenue>,
}
