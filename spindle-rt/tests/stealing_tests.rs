//! Integration tests for work stealing under contention.

#![allow(clippy::unwrap_used, clippy::panic)]

use spindle_rt::{ActorOptions, ActorSystem, SystemConfig};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_hot_actor_contention_spreads_light_work() {
    let config = SystemConfig::builder().with_worker_count(4).build().unwrap();
    let system = ActorSystem::new(config).unwrap();

    let hot = system.spawn_actor(ActorOptions::default());
    let total = Arc::new(AtomicUsize::new(0));
    for _ in 0..20_000 {
        let total = Arc::clone(&total);
        hot.send(move || {
            total.fetch_add(1, Ordering::Relaxed);
        });
    }

    let light_threads = Arc::new(Mutex::new(HashSet::new()));
    let mut lights = Vec::new();
    for _ in 0..7 {
        let light = system.spawn_actor(ActorOptions::default());
        let total = Arc::clone(&total);
        let light_threads = Arc::clone(&light_threads);
        light.send(move || {
            total.fetch_add(1, Ordering::Relaxed);
            light_threads.lock().unwrap().insert(thread::current().id());
        });
        lights.push(light);
    }

    system.run(true);
    assert_eq!(total.load(Ordering::Relaxed), 20_007);
    // The light actors did not all funnel through one worker.
    assert!(light_threads.lock().unwrap().len() >= 2);
}

#[test]
fn test_counters_stay_consistent_across_migration() {
    let config = SystemConfig::builder().with_worker_count(4).build().unwrap();
    let system = ActorSystem::new(config).unwrap();

    let mut actors = Vec::new();
    for _ in 0..8 {
        actors.push(system.spawn_actor(ActorOptions::default()));
    }
    let total = Arc::new(AtomicUsize::new(0));
    for actor in &actors {
        for _ in 0..500 {
            let total = Arc::clone(&total);
            actor.send(move || {
                total.fetch_add(1, Ordering::Relaxed);
            });
        }
    }

    system.run(true);
    assert_eq!(total.load(Ordering::Relaxed), 4_000);
    let stats = system.worker_stats();
    for worker in &stats {
        assert_eq!(worker.requested, worker.processed);
    }
    let requested: u64 = stats.iter().map(|worker| worker.requested).sum();
    assert_eq!(requested, 4_000);
}

#[test]
fn test_pinned_actor_keeps_its_worker() {
    let config = SystemConfig::builder().with_worker_count(4).build().unwrap();
    let system = ActorSystem::new(config).unwrap();

    let pinned = system.spawn_actor(ActorOptions::pinned());
    let home = pinned.worker_index();
    let threads = Arc::new(Mutex::new(HashSet::new()));
    for _ in 0..2_000 {
        let threads = Arc::clone(&threads);
        pinned.send(move || {
            threads.lock().unwrap().insert(thread::current().id());
        });
    }
    // Saturate the other workers so stealing has every reason to trigger.
    let mut noise = Vec::new();
    for _ in 0..6 {
        let actor = system.spawn_actor(ActorOptions::default());
        for _ in 0..1_000 {
            actor.send(|| std::hint::black_box(()));
        }
        noise.push(actor);
    }

    system.run(true);
    assert_eq!(pinned.worker_index(), home);
    assert_eq!(threads.lock().unwrap().len(), 1);
}
