//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    Money, Order, OrderLineItem, OrderOwner, OrderStatus, Product, ProductStatus, ShippingInfo,
    UserId,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    OrderFilter, OrderQuery, OrderSort, PageRequest, PostgresStore, SortDirection, SortField,
    Store, StoreError, StoreExt,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_line_items, orders, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn shipping() -> ShippingInfo {
    ShippingInfo::new("Jane Doe", "0912345678", "1 Main St").with_notes("Leave at the door")
}

fn owner(username: &str) -> OrderOwner {
    OrderOwner {
        user_id: UserId::new(),
        username: username.to_string(),
    }
}

fn order_for(
    owner: Option<OrderOwner>,
    status: OrderStatus,
    product: &Product,
    quantity: u32,
    age_minutes: i64,
) -> Order {
    Order::new(
        owner,
        status,
        shipping(),
        vec![OrderLineItem::new(
            product.id,
            product.name.clone(),
            product.price,
            quantity,
        )],
        Utc::now() - Duration::minutes(age_minutes),
    )
}

#[tokio::test]
#[serial]
async fn save_and_load_product() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1999), 3);

    store.put_products(&[product.clone()]).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Widget");
    assert_eq!(loaded.price, Money::from_cents(1999));
    assert_eq!(loaded.stock, 3);
    assert_eq!(loaded.status, ProductStatus::Active);
    assert_eq!(store.count_products().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn save_product_upserts_stock_and_status() {
    let store = get_test_store().await;
    let mut product = Product::new("Widget", Money::from_cents(500), 1);
    store.put_products(&[product.clone()]).await.unwrap();

    product.stock = 0;
    product.refresh_status();
    store.put_products(&[product.clone()]).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 0);
    assert_eq!(loaded.status, ProductStatus::OutOfStock);
    assert_eq!(store.count_products().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn insert_and_load_order_with_items() {
    let store = get_test_store().await;
    let a = Product::new("Keyboard", Money::from_cents(4500), 10);
    let b = Product::new("Mouse", Money::from_cents(1500), 10);
    store.put_products(&[a.clone(), b.clone()]).await.unwrap();

    let order = Order::new(
        Some(owner("alice")),
        OrderStatus::Completed,
        shipping(),
        vec![
            OrderLineItem::new(a.id, a.name.clone(), a.price, 1),
            OrderLineItem::new(b.id, b.name.clone(), b.price, 2),
        ],
        Utc::now(),
    );
    store.put_order(&order).await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.total_price, Money::from_cents(7500));
    assert_eq!(loaded.status, OrderStatus::Completed);
    assert_eq!(loaded.owner_display(), "alice");
    assert_eq!(loaded.shipping.notes.as_deref(), Some("Leave at the door"));
    assert_eq!(loaded.shipping.payment_method, "COD");
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_name, "Keyboard");
    assert_eq!(loaded.items[1].quantity, 2);
    assert_eq!(loaded.items[1].subtotal, Money::from_cents(3000));
    assert!(loaded.totals_are_consistent());
}

#[tokio::test]
#[serial]
async fn guest_order_has_no_owner() {
    let store = get_test_store().await;
    let product = Product::new("Lamp", Money::from_cents(2000), 5);
    store.put_products(&[product.clone()]).await.unwrap();

    let order = order_for(None, OrderStatus::Pending, &product, 1, 0);
    store.put_order(&order).await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert!(loaded.is_guest());
    assert_eq!(loaded.owner_display(), "Guest");
}

#[tokio::test]
#[serial]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 5);
    store.put_products(&[product.clone()]).await.unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.product_for_update(product.id).await.unwrap().unwrap();
        locked.stock = 0;
        locked.refresh_status();
        tx.save_product(&locked).await.unwrap();
        tx.insert_order(&order_for(None, OrderStatus::Pending, &product, 5, 0))
            .await
            .unwrap();
    }

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 5);
    assert_eq!(store.count_orders(OrderFilter::new()).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn update_order_status_persists() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 5);
    store.put_products(&[product.clone()]).await.unwrap();
    let order = order_for(None, OrderStatus::Pending, &product, 1, 0);
    store.put_order(&order).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let mut locked = tx.order_for_update(order.id).await.unwrap().unwrap();
    assert_eq!(locked.items.len(), 1);
    locked.set_status(OrderStatus::Shipping, Utc::now());
    tx.update_order_status(&locked).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Shipping);
    assert!(loaded.updated_at >= loaded.created_at);
}

#[tokio::test]
#[serial]
async fn update_status_of_unknown_order_fails() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 5);
    let order = order_for(None, OrderStatus::Pending, &product, 1, 0);

    let mut tx = store.begin().await.unwrap();
    let result = tx.update_order_status(&order).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn query_orders_filters_sorts_and_pages() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 100);
    store.put_products(&[product.clone()]).await.unwrap();

    let alice = owner("alice");
    for (age, status) in [
        (30, OrderStatus::Pending),
        (20, OrderStatus::Completed),
        (10, OrderStatus::Pending),
    ] {
        store
            .put_order(&order_for(Some(alice.clone()), status, &product, 1, age))
            .await
            .unwrap();
    }
    store
        .put_order(&order_for(
            Some(owner("bob")),
            OrderStatus::Pending,
            &product,
            3,
            5,
        ))
        .await
        .unwrap();

    let page = store
        .query_orders(
            OrderQuery::new(OrderFilter::new().owner(alice.user_id)).page(PageRequest::new(0, 2)),
        )
        .await
        .unwrap();
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
    assert!(page.content[0].created_at > page.content[1].created_at);
    assert_eq!(page.content[0].items.len(), 1);

    let pending = store
        .count_orders(OrderFilter::new().status(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending, 3);

    let by_price = store
        .query_orders(
            OrderQuery::default().sort(OrderSort::new(SortField::TotalPrice, SortDirection::Desc)),
        )
        .await
        .unwrap();
    assert_eq!(by_price.content.len(), 4);
    assert_eq!(by_price.content[0].owner_display(), "bob");

    let searched = store
        .query_orders(OrderQuery::new(OrderFilter::new().keyword("BOB")))
        .await
        .unwrap();
    assert_eq!(searched.content.len(), 1);

    let window = store
        .count_orders(OrderFilter::new().created_between(
            Utc::now() - Duration::minutes(25),
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(window, 3);
}

#[tokio::test]
#[serial]
async fn product_sales_ranks_by_quantity() {
    let store = get_test_store().await;
    let a = Product::new("A", Money::from_cents(100), 100);
    let b = Product::new("B", Money::from_cents(200), 100);
    store.put_products(&[a.clone(), b.clone()]).await.unwrap();

    store
        .put_order(&order_for(None, OrderStatus::Completed, &a, 2, 3))
        .await
        .unwrap();
    store
        .put_order(&order_for(None, OrderStatus::Shipping, &b, 5, 2))
        .await
        .unwrap();
    store
        .put_order(&order_for(None, OrderStatus::Cancelled, &a, 40, 1))
        .await
        .unwrap();

    let sales = store
        .product_sales(OrderFilter::new().statuses(OrderStatus::REVENUE), 10)
        .await
        .unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].product_id, b.id);
    assert_eq!(sales[0].quantity_sold, 5);
    assert_eq!(sales[0].revenue, Money::from_cents(1000));
    assert_eq!(sales[1].product_id, a.id);
    assert_eq!(sales[1].quantity_sold, 2);

    let top = store
        .product_sales(OrderFilter::new().statuses(OrderStatus::REVENUE), 1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
}

#[tokio::test]
#[serial]
async fn keyword_wildcards_match_literally() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 100);
    store.put_products(&[product.clone()]).await.unwrap();

    for name in ["100% Cotton Ltd", "Jane_Doe", "Jane Doe"] {
        let order = Order::new(
            None,
            OrderStatus::Pending,
            ShippingInfo::new(name, "0912345678", "1 Main St"),
            vec![OrderLineItem::new(product.id, "Widget", product.price, 1)],
            Utc::now(),
        );
        store.put_order(&order).await.unwrap();
    }

    let count = |keyword: &str| {
        let store = store.clone();
        let filter = OrderFilter::new().keyword(keyword);
        async move { store.count_orders(filter).await.unwrap() }
    };
    assert_eq!(count("%").await, 1);
    assert_eq!(count("_").await, 1);
    assert_eq!(count("jane_").await, 1);
    assert_eq!(count("\\").await, 0);
    assert_eq!(count("jane").await, 2);
}

#[tokio::test]
#[serial]
async fn page_far_past_the_end_is_empty() {
    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(1000), 100);
    store.put_products(&[product.clone()]).await.unwrap();
    store
        .put_order(&order_for(None, OrderStatus::Pending, &product, 1, 0))
        .await
        .unwrap();

    let page = store
        .query_orders(OrderQuery::default().page(PageRequest::new(usize::MAX, 100)))
        .await
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 1);
    assert!(page.last);
}

#[tokio::test]
#[serial]
async fn daily_revenue_groups_by_utc_day() {
    use chrono::TimeZone;

    let store = get_test_store().await;
    let product = Product::new("Widget", Money::from_cents(250), 100);
    store.put_products(&[product.clone()]).await.unwrap();

    let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 5, d, h, 30, 0).unwrap();
    for (status, quantity, created_at) in [
        (OrderStatus::Completed, 1, day(2, 0)),
        (OrderStatus::Shipping, 2, day(2, 23)),
        (OrderStatus::Completed, 4, day(9, 12)),
        (OrderStatus::Cancelled, 40, day(9, 13)),
    ] {
        let order = Order::new(
            None,
            status,
            shipping(),
            vec![OrderLineItem::new(product.id, "Widget", product.price, quantity)],
            created_at,
        );
        store.put_order(&order).await.unwrap();
    }

    let days = store
        .daily_revenue(OrderFilter::new().statuses(OrderStatus::REVENUE))
        .await
        .unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, day(2, 0).date_naive());
    assert_eq!(days[0].revenue, Money::from_cents(750));
    assert_eq!(days[1].date, day(9, 0).date_naive());
    assert_eq!(days[1].revenue, Money::from_cents(1000));
}
