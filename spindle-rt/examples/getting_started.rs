//! Getting started: spawn actors, send messages, wait for idle.
//!
//! Run with: `cargo run --example getting_started`

#![allow(clippy::unwrap_used)]

use spindle_rt::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // One worker per hardware thread, no load balancer.
    let system = ActorSystem::new(SystemConfig::default()).unwrap();

    // Sixteen independent accumulators; the pool runs them in parallel while
    // each one sees its own messages strictly in order.
    let grand_total = Arc::new(AtomicU64::new(0));
    let actors: Vec<Actor> = (0..16)
        .map(|_| system.spawn_actor(ActorOptions::default()))
        .collect();
    for (index, actor) in actors.iter().enumerate() {
        for step in 0..1_000u64 {
            let grand_total = Arc::clone(&grand_total);
            actor.send(move || {
                grand_total.fetch_add(step + index as u64, Ordering::Relaxed);
            });
        }
    }

    // A delayed message through the shared timer.
    let first = &actors[0];
    let ding = Arc::clone(&grand_total);
    system.add_timer(std::time::Duration::from_millis(50), &first.handle(), move || {
        println!("timer fired with running total {}", ding.load(Ordering::Relaxed));
    });

    // Block until every message (and the timer) has drained.
    system.run(true);
    println!("grand total: {}", grand_total.load(Ordering::Relaxed));

    for stats in system.worker_stats() {
        println!(
            "worker {:02}: requested={} processed={}",
            stats.worker, stats.requested, stats.processed
        );
    }
}
