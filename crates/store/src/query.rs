use chrono::{DateTime, NaiveDate, Utc};
use common::{Money, Order, OrderStatus, ProductId, UserId};

/// Zero-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub const DEFAULT_SIZE: usize = 10;
    pub const MAX_SIZE: usize = 100;
    /// Highest page index served; keeps the row offset well inside `i64`.
    pub const MAX_PAGE: usize = 10_000_000;

    /// Creates a page request, clamping `size` into `1..=MAX_SIZE` and `page`
    /// to at most `MAX_PAGE`.
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page: page.min(Self::MAX_PAGE),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// Column an order listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    TotalPrice,
    Status,
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortField::UpdatedAt),
            "totalPrice" | "total_price" => Ok(SortField::TotalPrice),
            "status" => Ok(SortField::Status),
            other => Err(format!("unsupported sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(format!("unsupported sort direction: {s}"))
        }
    }
}

/// Sort order for order listings. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl OrderSort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn newest_first() -> Self {
        Self::default()
    }
}

/// Criteria selecting a set of orders.
///
/// All set criteria must match. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Orders placed by this user.
    pub owner: Option<UserId>,

    /// Orders in any of these statuses.
    pub statuses: Option<Vec<OrderStatus>>,

    /// Orders created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,

    /// Orders created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,

    /// Case-insensitive match on owner username, recipient name, recipient
    /// phone or order id.
    pub keyword: Option<String>,
}

impl OrderFilter {
    /// Creates a filter matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_to = Some(to);
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Evaluates the filter against an order in memory.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(owner) = self.owner
            && !order.is_owned_by(owner)
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&order.status)
        {
            return false;
        }
        if let Some(from) = self.created_from
            && order.created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && order.created_at > to
        {
            return false;
        }
        if let Some(ref keyword) = self.keyword {
            let needle = keyword.to_lowercase();
            let owner_match = order
                .owner
                .as_ref()
                .is_some_and(|owner| owner.username.to_lowercase().contains(&needle));
            if !(owner_match
                || order.shipping.recipient_name.to_lowercase().contains(&needle)
                || order.shipping.recipient_phone.contains(&needle)
                || order.id.to_string().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// A filtered, sorted and optionally paginated order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub filter: OrderFilter,
    pub sort: OrderSort,
    /// `None` returns every matching order.
    pub page: Option<PageRequest>,
}

impl OrderQuery {
    pub fn new(filter: OrderFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn sort(mut self, sort: OrderSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    /// Builds a page from its content and the total number of matches.
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = request.size as u64;
        let total_pages = total_elements.div_ceil(size);
        let page = request.page as u64;
        Self {
            content,
            page_number: request.page,
            page_size: request.size,
            total_elements,
            total_pages,
            first: page == 0,
            last: page.saturating_add(1) >= total_pages,
        }
    }

    /// Wraps a complete result set as a single page.
    pub fn unpaged(content: Vec<T>) -> Self {
        let total = content.len();
        Self {
            page_number: 0,
            page_size: total,
            total_elements: total as u64,
            total_pages: 1,
            first: true,
            last: true,
            content,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

/// Units sold and revenue for one product, summed over matching orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    /// Name as recorded on the most recent matching line item.
    pub product_name: String,
    pub quantity_sold: u64,
    pub revenue: Money,
}

/// Summed order totals for one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: Money,
}
