//! External looper: drive actor messages from a host-owned thread.
//!
//! A platform event loop (GUI toolkit, render loop) usually owns resources
//! that must only be touched from its own thread. The looper makes that
//! thread an actor worker: anyone posts, only the owner executes.
//!
//! Run with: `cargo run --example external_looper`

#![allow(clippy::unwrap_used)]

use spindle_rt::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    let system = ActorSystem::new(SystemConfig::default()).unwrap();

    // This thread plays the role of the platform event loop.
    let looper = system.create_looper();
    let surface = looper.spawn_actor();

    // Background work posts updates to the "GUI" actor from pool threads.
    let worker_side = system.spawn_actor(ActorOptions::default());
    let done = Arc::new(AtomicBool::new(false));
    for frame in 0..5u32 {
        let surface = surface.handle();
        let done = Arc::clone(&done);
        worker_side.send(move || {
            // Pretend to render, then hand the result to the owner thread.
            thread::sleep(Duration::from_millis(10));
            surface.send(move || {
                println!("presented frame {frame} on the looper thread");
            });
            if frame == 4 {
                done.store(true, Ordering::Release);
            }
        });
    }

    // The event loop: poll, drain pending actor work, repeat.
    while !done.load(Ordering::Acquire) {
        looper.drain();
        thread::sleep(Duration::from_millis(5));
    }
    looper.drain();

    system.run(true);
}
