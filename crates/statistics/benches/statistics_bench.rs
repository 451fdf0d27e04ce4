use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{Money, Order, OrderLineItem, OrderStatus, Product, ShippingInfo};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::InMemoryUserDirectory;
use statistics::StatisticsAggregator;
use store::{InMemoryStore, StoreExt};

fn seeded_store(rt: &tokio::runtime::Runtime, order_count: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    let products: Vec<_> = (0..20)
        .map(|i| Product::new(format!("Product {i}"), Money::from_cents(500 + i * 10), 1000))
        .collect();

    rt.block_on(async {
        store.put_products(&products).await.unwrap();
        for i in 0..order_count {
            let product = &products[i % products.len()];
            let status = OrderStatus::ALL[i % OrderStatus::ALL.len()];
            let order = Order::new(
                None,
                status,
                ShippingInfo::new("Bench User", "0912345678", "1 Bench St"),
                vec![OrderLineItem::new(
                    product.id,
                    product.name.clone(),
                    product.price,
                    (i % 5) as u32 + 1,
                )],
                Utc::now() - Duration::hours(i as i64 % 72),
            );
            store.put_order(&order).await.unwrap();
        }
    });
    store
}

fn bench_dashboard(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("statistics/dashboard");

    for order_count in [100, 1_000] {
        let store = seeded_store(&rt, order_count);
        let stats = StatisticsAggregator::new(store, Arc::new(InMemoryUserDirectory::new()));

        group.bench_with_input(
            BenchmarkId::from_parameter(order_count),
            &order_count,
            |b, _| {
                b.iter(|| rt.block_on(async { stats.dashboard().await.unwrap() }));
            },
        );
    }
    group.finish();
}

fn bench_date_range(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = seeded_store(&rt, 1_000);
    let stats = StatisticsAggregator::new(store, Arc::new(InMemoryUserDirectory::new()));
    let end = Utc::now();
    let start = end - Duration::days(2);

    c.bench_function("statistics/date_range_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                stats
                    .for_date_range(Some(start), Some(end))
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(benches, bench_dashboard, bench_date_range);
criterion_main!(benches);
