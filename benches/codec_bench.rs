// ABOUTME: Criterion benchmarks for the conversation codec and in-memory hot paths
// ABOUTME: Measures normalize/decode/encode throughput and rate-limit check latency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for conversation encoding and rate limiting.
//!
//! Codec benchmarks run over conversations of increasing length; the rate
//! limiter benchmark runs against the in-memory backend.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chat_store::codec;
use chat_store::config::{BackendConfig, RateLimitConfig};
use chat_store::connection::ConnectionManager;
use chat_store::models::{Conversation, Message};
use chat_store::rate_limiting::RateLimiter;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Runtime;

const MESSAGE_COUNTS: [usize; 3] = [2, 20, 200];

fn conversation_with(count: usize) -> Conversation {
    let messages = (0..count)
        .map(|i| {
            if i % 2 == 0 {
                Message::user(format!("Question number {i}: how does this work?"))
            } else {
                Message::assistant(format!("Answer number {i}: it works like this, mostly."))
            }
        })
        .collect();

    Conversation {
        id: format!("bench-{count}"),
        title: "Benchmark conversation".to_owned(),
        messages,
        created_at: "2024-01-01T00:00:00.000000Z".to_owned(),
        updated_at: "2024-01-01T00:00:00.000000Z".to_owned(),
    }
}

fn raw_with(count: usize) -> Value {
    let messages: Vec<Value> = (0..count)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "bot" };
            json!({"role": role, "content": format!("m{i}")})
        })
        .collect();
    json!({
        "id": "bench",
        "title": "Benchmark conversation",
        "messages": messages,
        "created_at": "2024-01-01T00:00:00",
        "updated_at": "2024-01-01T00:00:00"
    })
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_normalize");
    for count in MESSAGE_COUNTS {
        let raw = raw_with(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &raw, |b, raw| {
            b.iter(|| codec::normalize(black_box(raw)).unwrap());
        });
    }
    group.finish();
}

fn bench_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode_decode");
    for count in MESSAGE_COUNTS {
        let conversation = conversation_with(count);
        let encoded = codec::encode(&conversation).unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", count), &conversation, |b, c| {
            b.iter(|| codec::encode(black_box(c)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decode", count), &encoded, |b, e| {
            b.iter(|| codec::decode(black_box(e.as_bytes())).unwrap());
        });
    }
    group.finish();
}

fn bench_rate_limit_check(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let limiter = runtime.block_on(async {
        let connections = ConnectionManager::open(BackendConfig::new("memory://bench"))
            .await
            .unwrap();
        RateLimiter::new(
            Arc::new(connections),
            RateLimitConfig {
                requests_per_window: u32::MAX,
                ..RateLimitConfig::default()
            },
        )
    });

    c.bench_function("rate_limit_check_allowed", |b| {
        b.to_async(&runtime)
            .iter(|| async { black_box(limiter.check("198.51.100.1").await) });
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_encode_decode,
    bench_rate_limit_check
);
criterion_main!(benches);
