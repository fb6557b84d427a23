//! Benchmarks for order book operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mbo_book::orderbook::{BookEvent, OrderBook, Side};
use mbo_book::parser::{parse_record, Schema};
use rust_decimal::Decimal;

const HEADER: &str = "ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,price,size,channel_id,order_id,flags,ts_in_delta,sequence,symbol";

/// Book with `levels` price levels per side and `per_level` orders each
fn create_book(levels: i64, per_level: u64) -> OrderBook {
    let mut book = OrderBook::new("CLX5");
    let mut order_id = 0u64;
    for i in 0..levels {
        for _ in 0..per_level {
            order_id += 1;
            book.apply(&BookEvent::Add {
                order_id,
                side: Side::Buy,
                price: Decimal::new(6_500 - i, 2),
                size: Decimal::from(10),
                ts: 0,
            });
            order_id += 1;
            book.apply(&BookEvent::Add {
                order_id,
                side: Side::Sell,
                price: Decimal::new(6_501 + i, 2),
                size: Decimal::from(10),
                ts: 0,
            });
        }
    }
    book
}

fn benchmark_add_cancel(c: &mut Criterion) {
    let mut book = create_book(100, 10);
    let add = BookEvent::Add {
        order_id: 1_000_000,
        side: Side::Buy,
        price: Decimal::new(6_450, 2),
        size: Decimal::from(5),
        ts: 1,
    };
    let cancel = BookEvent::Cancel {
        order_id: 1_000_000,
        ts: 2,
    };

    c.bench_function("add_cancel_1000_orders", |b| {
        b.iter(|| {
            book.apply(black_box(&add));
            book.apply(black_box(&cancel));
        })
    });
}

fn benchmark_modify(c: &mut Criterion) {
    let mut book = create_book(100, 10);
    let up = BookEvent::Modify {
        order_id: 1,
        price: Decimal::new(6_490, 2),
        size: Decimal::from(7),
        ts: 1,
    };
    let back = BookEvent::Modify {
        order_id: 1,
        price: Decimal::new(6_500, 2),
        size: Decimal::from(10),
        ts: 2,
    };

    c.bench_function("modify_price_move", |b| {
        b.iter(|| {
            book.apply(black_box(&up));
            book.apply(black_box(&back));
        })
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let book = create_book(100, 10);

    c.bench_function("snapshot_top_10", |b| {
        b.iter(|| {
            black_box(book.depth_snapshot(black_box(10)));
        })
    });

    c.bench_function("snapshot_json_top_10", |b| {
        b.iter(|| {
            let snapshot = book.depth_snapshot(10);
            black_box(serde_json::to_string(&snapshot).ok());
        })
    });
}

fn benchmark_parse(c: &mut Criterion) {
    let schema = Schema::from_header(HEADER);
    let line = "2025-09-23 13:30:00.000000000+00:00,2025-09-23 13:30:00.500000000+00:00,160,1,42,A,B,65.23,12,0,817,130,165000,1001,CLX5";

    c.bench_function("parse_add_record", |b| {
        b.iter(|| {
            black_box(parse_record(&schema, black_box(line)));
        })
    });
}

criterion_group!(
    benches,
    benchmark_add_cancel,
    benchmark_modify,
    benchmark_snapshot,
    benchmark_parse
);
criterion_main!(benches);
