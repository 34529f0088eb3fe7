//! Messaging Benchmarks
//!
//! Measures baseline performance of the runtime:
//! - Enqueue cost of `send` on an idle system
//! - End-to-end throughput draining a large mailbox
//! - Actor spawn/teardown cost
//! - Ping-pong latency between two pinned actors

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use criterion::{criterion_group, criterion_main, Criterion};

// Layer 3: Internal module imports
use spindle_rt::{ActorOptions, ActorRef, ActorSystem, SystemConfig};

fn fixed_system(workers: usize) -> ActorSystem {
    let config = SystemConfig::builder()
        .with_worker_count(workers)
        .build()
        .unwrap();
    ActorSystem::new(config).unwrap()
}

/// Benchmark: cost of enqueuing a message.
fn send_enqueue(c: &mut Criterion) {
    let system = fixed_system(2);
    let actor = system.spawn_actor(ActorOptions::default());
    let sink = Arc::new(AtomicU64::new(0));
    c.bench_function("send_enqueue", |b| {
        b.iter(|| {
            let sink = Arc::clone(&sink);
            actor.send(move || {
                sink.fetch_add(1, Ordering::Relaxed);
            });
        });
    });
    system.run(true);
    black_box(sink.load(Ordering::Relaxed));
}

/// Benchmark: drain 10k messages spread over 8 actors.
fn drain_throughput(c: &mut Criterion) {
    let system = fixed_system(4);
    let actors: Vec<_> = (0..8)
        .map(|_| system.spawn_actor(ActorOptions::default()))
        .collect();
    let sink = Arc::new(AtomicU64::new(0));
    c.bench_function("drain_10k_messages", |b| {
        b.iter(|| {
            for actor in &actors {
                for _ in 0..1_250 {
                    let sink = Arc::clone(&sink);
                    actor.send(move || {
                        sink.fetch_add(1, Ordering::Relaxed);
                    });
                }
            }
            system.run(true);
        });
    });
}

/// Benchmark: actor spawn and teardown.
fn actor_spawn(c: &mut Criterion) {
    let system = fixed_system(2);
    c.bench_function("actor_spawn_drop", |b| {
        b.iter(|| {
            let actor = system.spawn_actor(ActorOptions::default());
            black_box(&actor);
        });
    });
}

/// Benchmark: a 100-message volley between two pinned actors.
fn ping_pong(c: &mut Criterion) {
    fn volley(from: ActorRef, to: ActorRef, remaining: u32) {
        if remaining == 0 {
            return;
        }
        let reply_from = to.clone();
        to.send(move || {
            volley(reply_from, from, remaining - 1);
        });
    }

    let system = fixed_system(2);
    let first = system.spawn_actor(ActorOptions::pinned());
    let second = system.spawn_actor(ActorOptions::pinned());
    c.bench_function("ping_pong_100", |b| {
        b.iter(|| {
            volley(first.handle(), second.handle(), 100);
            system.run(true);
        });
    });
}

criterion_group!(
    benches,
    send_enqueue,
    drain_throughput,
    actor_spawn,
    ping_pong
);
criterion_main!(benches);
