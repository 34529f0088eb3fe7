//! Integration tests for idle detection and shutdown.

#![allow(clippy::unwrap_used, clippy::panic)]

use spindle_rt::{ActorOptions, ActorSystem, SystemConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn small_system(workers: usize) -> ActorSystem {
    let config = SystemConfig::builder()
        .with_worker_count(workers)
        .build()
        .unwrap();
    ActorSystem::new(config).unwrap()
}

#[test]
fn test_clean_shutdown_processes_everything() {
    let system = small_system(4);
    let mut actors = Vec::new();
    for _ in 0..16 {
        actors.push(system.spawn_actor(ActorOptions::default()));
    }
    let total = Arc::new(AtomicUsize::new(0));
    for actor in &actors {
        for _ in 0..625 {
            let total = Arc::clone(&total);
            actor.send(move || {
                total.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
    system.run(true);
    assert_eq!(total.load(Ordering::Relaxed), 10_000);
    for worker in system.worker_stats() {
        assert_eq!(worker.requested, worker.processed);
    }
    for actor in &actors {
        assert!(actor.is_idle());
    }
}

#[test]
fn test_quit_without_waiting_returns_promptly() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());
    for _ in 0..50 {
        actor.send(|| thread::sleep(Duration::from_millis(20)));
    }
    let started = Instant::now();
    thread::scope(|scope| {
        scope.spawn(|| {
            thread::sleep(Duration::from_millis(50));
            system.quit(false);
        });
        system.run(true);
    });
    // A full drain would take around a second; quit released us early.
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_quit_waiting_for_unfinished_drains_first() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());
    let total = Arc::new(AtomicUsize::new(0));
    for _ in 0..200 {
        let total = Arc::clone(&total);
        actor.send(move || {
            total.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(1));
        });
    }
    thread::scope(|scope| {
        scope.spawn(|| {
            system.quit(true);
        });
        system.run(false);
    });
    assert_eq!(total.load(Ordering::Relaxed), 200);
}

#[test]
fn test_dropping_actor_waits_out_executing_message() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());
    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let started_inner = Arc::clone(&started);
    let finished_inner = Arc::clone(&finished);
    actor.send(move || {
        started_inner.fetch_add(1, Ordering::Relaxed);
        thread::sleep(Duration::from_millis(80));
        finished_inner.fetch_add(1, Ordering::Relaxed);
    });
    while started.load(Ordering::Relaxed) == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    drop(actor);
    // Deregistration waited for the message in flight to complete.
    assert_eq!(finished.load(Ordering::Relaxed), 1);
    system.run(true);
}
