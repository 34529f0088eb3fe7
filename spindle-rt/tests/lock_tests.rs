//! Integration tests for the manual synchronization model.

#![allow(clippy::unwrap_used, clippy::panic)]

use spindle_rt::{ActorOptions, ActorSystem, SystemConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn small_system(workers: usize) -> ActorSystem {
    let config = SystemConfig::builder()
        .with_worker_count(workers)
        .build()
        .unwrap();
    ActorSystem::new(config).unwrap()
}

#[test]
fn test_manual_lock_delays_message() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());

    let guard = actor.lock();
    let executed = Arc::new(AtomicBool::new(false));
    let ran_on = Arc::new(Mutex::new(None));
    let executed_inner = Arc::clone(&executed);
    let ran_on_inner = Arc::clone(&ran_on);
    actor.send(move || {
        executed_inner.store(true, Ordering::Release);
        *ran_on_inner.lock().unwrap() = Some(thread::current().id());
    });

    // The message must not start while the lock is held.
    thread::sleep(Duration::from_millis(100));
    assert!(!executed.load(Ordering::Acquire));

    drop(guard);
    system.run(true);
    assert!(executed.load(Ordering::Acquire));
    // After unlock the message ran on the owning worker's thread, not here.
    assert_ne!(ran_on.lock().unwrap().unwrap(), thread::current().id());
}

#[test]
fn test_lock_unlock_round_trip_restores_state() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());
    assert!(!actor.is_locked());
    {
        let _guard = actor.lock();
        assert!(actor.is_locked());
    }
    assert!(!actor.is_locked());
    assert!(actor.is_idle());
}

#[test]
fn test_lock_waits_out_executing_message() {
    let system = small_system(2);
    let actor = system.spawn_actor(ActorOptions::default());

    let in_message = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));
    let in_message_inner = Arc::clone(&in_message);
    let release_inner = Arc::clone(&release);
    actor.send(move || {
        in_message_inner.store(true, Ordering::Release);
        while !release_inner.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));
        }
    });
    while !in_message.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(1));
    }

    let locked = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            let guard = actor.lock();
            locked.store(true, Ordering::Release);
            drop(guard);
        });
        thread::sleep(Duration::from_millis(100));
        assert!(!locked.load(Ordering::Acquire));
        release.store(true, Ordering::Release);
    });
    assert!(locked.load(Ordering::Acquire));
    system.run(true);
}
