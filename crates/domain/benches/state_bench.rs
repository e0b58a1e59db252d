//! Benchmarks for the hot pure paths: edge-table checks and order totals.

use common::{CustomerId, Money};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::{Order, OrderCharges, OrderItem, OrderStatus};

fn bench_edge_table(c: &mut Criterion) {
    c.bench_function("order_status_edge_sweep", |b| {
        b.iter(|| {
            let mut legal = 0u32;
            for from in OrderStatus::ALL {
                for to in OrderStatus::ALL {
                    if black_box(from).can_transition_to(black_box(to)) {
                        legal += 1;
                    }
                }
            }
            black_box(legal)
        })
    });
}

fn bench_order_totals(c: &mut Criterion) {
    let items: Vec<OrderItem> = (0..20u32)
        .map(|i| {
            OrderItem::new(
                format!("SKU-{i:03}"),
                format!("Product {i}"),
                format!("SKU-{i:03}"),
                (i % 5) + 1,
                Money::from_cents(100 * (i as i64 + 1)),
            )
            .unwrap()
        })
        .collect();

    c.bench_function("order_new_20_items", |b| {
        b.iter(|| {
            Order::new(
                CustomerId::new(),
                None,
                black_box(items.clone()),
                OrderCharges::default(),
                "EUR",
                None,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_edge_table, bench_order_totals);
criterion_main!(benches);
