//! Integration tests for the load balancer: rebalancing and pool growth.

#![allow(clippy::unwrap_used, clippy::panic)]

use spindle_rt::{ActorOptions, ActorSystem, SystemConfig, SystemError, POOL_CAP_FACTOR};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_pool_grows_under_starvation_and_respects_cap() {
    let cap = POOL_CAP_FACTOR * num_cpus::get();
    if cap <= 2 {
        // Growth is impossible when the starting pool already meets the cap.
        return;
    }
    let config = SystemConfig::builder()
        .with_worker_count(2)
        .with_load_balancer(Duration::from_millis(15))
        .build()
        .unwrap();
    let system = ActorSystem::new(config).unwrap();
    assert_eq!(system.worker_count(), 2);

    // Two actors per worker, each grinding long messages: every worker is
    // busy with a non-empty deque and stalled counters, which is exactly
    // the starvation signature the balancer looks for.
    let mut actors = Vec::new();
    for _ in 0..4 {
        actors.push(system.spawn_actor(ActorOptions::default()));
    }
    for actor in &actors {
        for _ in 0..4 {
            actor.send(|| thread::sleep(Duration::from_millis(60)));
        }
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while system.worker_count() <= 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(system.worker_count() > 2, "pool never grew past 2 workers");

    system.run(true);
    assert!(system.worker_count() <= cap.max(2));
}

#[test]
fn test_enabling_balancer_twice_is_rejected() {
    let config = SystemConfig::builder()
        .with_worker_count(2)
        .with_load_balancer(Duration::from_millis(50))
        .build()
        .unwrap();
    let system = ActorSystem::new(config).unwrap();
    let result = system.set_load_balancer(true, Duration::from_millis(50));
    assert!(matches!(result, Err(SystemError::BalancerAlreadyRunning)));
    system
        .set_load_balancer(false, Duration::from_millis(50))
        .unwrap();
    // Once stopped it may be enabled again.
    system
        .set_load_balancer(true, Duration::from_millis(50))
        .unwrap();
}

#[test]
fn test_balancer_disabled_pool_stays_fixed() {
    let config = SystemConfig::builder().with_worker_count(2).build().unwrap();
    let system = ActorSystem::new(config).unwrap();
    let mut actors = Vec::new();
    for _ in 0..4 {
        actors.push(system.spawn_actor(ActorOptions::default()));
    }
    for actor in &actors {
        for _ in 0..3 {
            actor.send(|| thread::sleep(Duration::from_millis(30)));
        }
    }
    system.run(true);
    assert_eq!(system.worker_count(), 2);
}
