//! Benchmarks for the trendwatch aggregator
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use trendwatch::tokenizer::{SimpleTokenizer, Tokenizer};
use trendwatch::window::{
    build_aggregator, ShardedAggregator, TermAggregator, TrendAggregator, WindowConfig,
};

const WORDS: &[&str] = &[
    "rust", "tokio", "axum", "serde", "tracing", "window", "bucket", "trend", "heap", "query",
    "shard", "merge", "token", "cache", "stream", "metric", "latency", "throughput", "vector",
    "string",
];

fn create_messages(count: usize) -> Vec<(String, i64)> {
    (0..count)
        .map(|i| {
            let text = (0..8)
                .map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ");
            (text, i as i64 * 10)
        })
        .collect()
}

fn tokenizer() -> Arc<dyn Tokenizer> {
    Arc::new(SimpleTokenizer::new())
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for size in [1_000, 10_000] {
        let messages = create_messages(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("single_lock_{}", size), |b| {
            b.iter(|| {
                let aggregator =
                    TermAggregator::new(tokenizer(), WindowConfig::new(60, 1)).unwrap();
                for (text, ts) in &messages {
                    aggregator.ingest(black_box(text), *ts);
                }
            })
        });

        group.bench_function(format!("sharded_4_{}", size), |b| {
            b.iter(|| {
                let aggregator =
                    ShardedAggregator::new(tokenizer(), WindowConfig::new(60, 1), 4).unwrap();
                for (text, ts) in &messages {
                    aggregator.ingest(black_box(text), *ts);
                }
            })
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let messages = create_messages(10_000);

    for shards in [1, 4] {
        let aggregator = build_aggregator(tokenizer(), WindowConfig::new(300, 1), shards).unwrap();
        aggregator.ingest_batch(&messages);

        for k in [1, 10, 100] {
            group.bench_function(format!("top_{}_shards_{}", k, shards), |b| {
                b.iter(|| aggregator.query_top_k(black_box(k)))
            });
        }
    }

    group.finish();
}

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = SimpleTokenizer::new();
    let text = "The quick brown fox jumps over the lazy dog while trendwatch counts 趋势 terms";

    c.bench_function("tokenize", |b| b.iter(|| tokenizer.tokenize(black_box(text))));
}

criterion_group!(benches, bench_ingest, bench_query, bench_tokenize);
criterion_main!(benches);
