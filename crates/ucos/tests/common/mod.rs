#![allow(dead_code)]

use std::time::Duration;

/// Polls `done` for up to five seconds.
pub fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..5_000 {
        if done() {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached in time");
}

/// Advances the clock by `n` ticks.
pub fn ticks(os: &ucos::Os, n: u32) {
    for _ in 0..n {
        os.time_tick();
    }
}
