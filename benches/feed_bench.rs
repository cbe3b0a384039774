//! Feed Core Benchmarks - Decode and Projection Hot Paths
//!
//! Benchmarks the work done on every poll (payload decoding) and on
//! every view wake-up (staleness observation and projection).
//!
//! Run with: cargo bench --bench feed_bench

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::time::Instant;

use microterm_feeds::domain::entry::{FeedEntry, FeedState};
use microterm_feeds::domain::feed::{FeedKey, PollSchedule};
use microterm_feeds::domain::payloads::{FeedPayload, FeedValue};
use microterm_feeds::usecases::FeedView;

fn news_body(n: usize) -> Vec<u8> {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"id":{i},"title":"Story {i}","summary":"Lorem ipsum dolor sit amet","url":"https://news.example/{i}","source":"Wire","published_at":"2024-05-01T12:00:00Z","sentiment":"Bearish"}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(",")).into_bytes()
}

fn market_body(n: usize) -> Vec<u8> {
    let items: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"symbol":"SYM{i}","price":{}.25,"change_24h":-0.5}}"#, 100 + i))
        .collect();
    format!("[{}]", items.join(",")).into_bytes()
}

/// Benchmark decoding a full news page.
fn bench_decode_news(c: &mut Criterion) {
    let key: FeedKey = "news:8".parse().unwrap_or_else(|e| panic!("{e}"));
    let body = news_body(8);

    c.bench_function("decode_news_8", |b| {
        b.iter(|| {
            let _value = FeedValue::decode(black_box(&key), black_box(&body));
        });
    });
}

/// Benchmark decoding an oversized ticker response (truncated to limit).
fn bench_decode_market_truncated(c: &mut Criterion) {
    let key: FeedKey = "market:10".parse().unwrap_or_else(|e| panic!("{e}"));
    let body = market_body(100);

    c.bench_function("decode_market_100_to_10", |b| {
        b.iter(|| {
            let _value = FeedValue::decode(black_box(&key), black_box(&body));
        });
    });
}

/// Benchmark observing an entry and projecting it for a view.
fn bench_observe_and_project(c: &mut Criterion) {
    let key: FeedKey = "news:8".parse().unwrap_or_else(|e| panic!("{e}"));
    let value = FeedValue::decode(&key, &news_body(8)).unwrap_or_else(|e| panic!("{e}"));

    let mut entry = FeedEntry::new(key, &PollSchedule::from_millis(30_000, 5_000));
    let now = Instant::now();
    entry.value = Some(std::sync::Arc::new(value));
    entry.fetched_at = Some(now);
    entry.state = FeedState::Fresh;
    entry.commits = 1;
    let later = now + Duration::from_secs(90);

    c.bench_function("entry_observe", |b| {
        b.iter(|| {
            let _entry = black_box(&entry).observe(black_box(later));
        });
    });

    c.bench_function("view_project", |b| {
        b.iter(|| {
            let _view = FeedView::from_entry(black_box(&entry), black_box(later));
        });
    });
}

criterion_group!(
    benches,
    bench_decode_news,
    bench_decode_market_truncated,
    bench_observe_and_project,
);
criterion_main!(benches);
