use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{
    LineItemId, Money, Order, OrderId, OrderLineItem, OrderOwner, OrderStatus, Product, ProductId,
    ProductStatus, ShippingInfo, UserId,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::{
    DailySales, OrderFilter, OrderQuery, Page, ProductSales, Result, SortDirection, SortField,
    StoreError,
    store::{Store, StoreTransaction},
};

const ORDER_COLUMNS: &str = "id, owner_id, owner_username, total_price_cents, status, \
     payment_method, shipping_address, recipient_name, recipient_phone, notes, created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Row locks (`SELECT ... FOR UPDATE`) on products and orders serialize
/// concurrent transactions across every process sharing the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to the given database URL.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_u32(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative {field}: {value}")))
}

fn to_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{field} out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    let status: String = row.try_get("status")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        status: status
            .parse::<ProductStatus>()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
    })
}

fn row_to_line_item(row: &PgRow) -> Result<OrderLineItem> {
    Ok(OrderLineItem {
        id: LineItemId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
    })
}

fn row_to_order(row: &PgRow, items: Vec<OrderLineItem>) -> Result<Order> {
    let owner_id: Option<Uuid> = row.try_get("owner_id")?;
    let owner_username: Option<String> = row.try_get("owner_username")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        owner: owner_id.map(|id| OrderOwner {
            user_id: UserId::from_uuid(id),
            username: owner_username.unwrap_or_default(),
        }),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?,
        shipping: ShippingInfo {
            recipient_name: row.try_get("recipient_name")?,
            recipient_phone: row.try_get("recipient_phone")?,
            shipping_address: row.try_get("shipping_address")?,
            notes: row.try_get("notes")?,
            payment_method: row.try_get("payment_method")?,
        },
        items,
        created_at,
        updated_at,
    })
}

/// Loads the line items of the given orders, keyed by order id, in position order.
async fn load_items<'e, E>(executor: E, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<OrderLineItem>>>
where
    E: Executor<'e, Database = Postgres>,
{
    if order_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT id, order_id, product_id, product_name, unit_price_cents, quantity, subtotal_cents
        FROM order_line_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, position ASC
        "#,
    )
    .bind(order_ids)
    .fetch_all(executor)
    .await?;

    let mut items: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
    for row in &rows {
        let order_id: Uuid = row.try_get("order_id")?;
        items.entry(order_id).or_default().push(row_to_line_item(row)?);
    }
    Ok(items)
}

fn attach_items(rows: &[PgRow], mut items: HashMap<Uuid, Vec<OrderLineItem>>) -> Result<Vec<Order>> {
    rows.iter()
        .map(|row| {
            let id: Uuid = row.try_get("id")?;
            row_to_order(row, items.remove(&id).unwrap_or_default())
        })
        .collect()
}

/// Appends the `AND ...` conditions of a filter. `prefix` qualifies the
/// orders table when it is joined (e.g. `"o."`).
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter, prefix: &str) {
    if let Some(owner) = filter.owner {
        builder
            .push(format!(" AND {prefix}owner_id = "))
            .push_bind(owner.as_uuid());
    }
    if let Some(ref statuses) = filter.statuses {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        builder
            .push(format!(" AND {prefix}status = ANY("))
            .push_bind(names)
            .push(")");
    }
    if let Some(from) = filter.created_from {
        builder
            .push(format!(" AND {prefix}created_at >= "))
            .push_bind(from);
    }
    if let Some(to) = filter.created_to {
        builder
            .push(format!(" AND {prefix}created_at <= "))
            .push_bind(to);
    }
    if let Some(ref keyword) = filter.keyword {
        let pattern = like_pattern(keyword);
        builder.push(" AND (");
        for (i, column) in ["owner_username", "recipient_name", "recipient_phone", "id::text"]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(format!("{prefix}{column} ILIKE "))
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

/// A `LIKE` pattern matching `keyword` anywhere, with wildcards in the
/// keyword itself taken literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::TotalPrice => "total_price_cents",
        SortField::Status => "status",
    }
}

fn sort_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT id, name, price_cents, stock, status FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut items = load_items(&self.pool, vec![id.as_uuid()]).await?;
        row_to_order(&row, items.remove(&id.as_uuid()).unwrap_or_default()).map(Some)
    }

    #[tracing::instrument(skip(self))]
    async fn query_orders(&self, query: OrderQuery) -> Result<Page<Order>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"
        ));
        push_filter(&mut builder, &query.filter, "");

        let direction = sort_keyword(query.sort.direction);
        builder.push(format!(
            " ORDER BY {} {direction}, id {direction}",
            sort_column(query.sort.field)
        ));

        if let Some(page) = query.page {
            builder
                .push(" LIMIT ")
                .push_bind(page.size as i64)
                .push(" OFFSET ")
                .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let items = load_items(&self.pool, ids).await?;
        let orders = attach_items(&rows, items)?;

        match query.page {
            Some(page) => {
                let total = self.count_orders(query.filter).await?;
                Ok(Page::new(orders, page, total))
            }
            None => Ok(Page::unpaged(orders)),
        }
    }

    async fn count_orders(&self, filter: OrderFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders WHERE 1=1");
        push_filter(&mut builder, &filter, "");

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn product_sales(&self, filter: OrderFilter, limit: usize) -> Result<Vec<ProductSales>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT li.product_id,
                   (ARRAY_AGG(li.product_name ORDER BY o.created_at DESC))[1] AS product_name,
                   SUM(li.quantity)::BIGINT AS quantity_sold,
                   SUM(li.subtotal_cents)::BIGINT AS revenue_cents
            FROM order_line_items li
            JOIN orders o ON o.id = li.order_id
            WHERE 1=1
            "#,
        );
        push_filter(&mut builder, &filter, "o.");
        builder
            .push(" GROUP BY li.product_id ORDER BY quantity_sold DESC, li.product_id ASC LIMIT ")
            .push_bind(limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let quantity_sold: i64 = row.try_get("quantity_sold")?;
                Ok(ProductSales {
                    product_id: ProductId::from_uuid(row.try_get("product_id")?),
                    product_name: row.try_get("product_name")?,
                    quantity_sold: quantity_sold as u64,
                    revenue: Money::from_cents(row.try_get("revenue_cents")?),
                })
            })
            .collect()
    }

    async fn daily_revenue(&self, filter: OrderFilter) -> Result<Vec<DailySales>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   SUM(total_price_cents)::BIGINT AS revenue_cents
            FROM orders
            WHERE 1=1
            "#,
        );
        push_filter(&mut builder, &filter, "");
        builder.push(" GROUP BY day ORDER BY day ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let date: NaiveDate = row.try_get("day")?;
                Ok(DailySales {
                    date,
                    revenue: Money::from_cents(row.try_get("revenue_cents")?),
                })
            })
            .collect()
    }
}

/// Transaction wrapper; dropping it without commit rolls back.
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, status FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save_product(&mut self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                status = EXCLUDED.status
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(to_i32(product.stock, "stock")?)
        .bind(product.status.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
        else {
            return Ok(None);
        };

        let mut items = load_items(&mut *self.tx, vec![id.as_uuid()]).await?;
        row_to_order(&row, items.remove(&id.as_uuid()).unwrap_or_default()).map(Some)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, owner_username, total_price_cents, status,
                                payment_method, shipping_address, recipient_name, recipient_phone,
                                notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.owner.as_ref().map(|owner| owner.user_id.as_uuid()))
        .bind(order.owner.as_ref().map(|owner| owner.username.clone()))
        .bind(order.total_price.cents())
        .bind(order.status.as_str())
        .bind(&order.shipping.payment_method)
        .bind(&order.shipping.shipping_address)
        .bind(&order.shipping.recipient_name)
        .bind(&order.shipping.recipient_phone)
        .bind(&order.shipping.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, order_id, position, product_id, product_name,
                                              unit_price_cents, quantity, subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(item.unit_price.cents())
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.subtotal.cents())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.updated_at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Order",
                id: order.id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        metrics::counter!("store_transactions_total", "outcome" => "commit").increment(1);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        metrics::counter!("store_transactions_total", "outcome" => "rollback").increment(1);
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}
