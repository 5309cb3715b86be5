use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::context;
use crate::error::HostError;
use crate::kernel::Kernel;
use crate::timer::{TimerCallback, TimerContext, TimerControl, TimerMode};

fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    (hits, Arc::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
    }))
}

#[test]
fn one_shot_fires_once() {
    let kernel = Kernel::builder().build();
    let (hits, cb) = counter();
    let t = kernel
        .timer_create("t", 3, TimerMode::OneShot, TimerContext::Soft, cb)
        .expect("create");
    kernel.timer_start(t).expect("start");
    for _ in 0..10 {
        kernel.tick_increase();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.timer_is_active(t), Ok(false));
}

#[test]
fn periodic_rearms_before_the_callback() {
    let kernel = Kernel::builder().build();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let t_slot = Arc::new(Mutex::new(None));
    let (k, s, slot) = (Arc::downgrade(&kernel), Arc::clone(&seen), Arc::clone(&t_slot));
    let cb: TimerCallback = Arc::new(move || {
        let (Some(kernel), Some(id)) = (k.upgrade(), *slot.lock().expect("slot")) else {
            return;
        };
        let next = kernel.timer_timeout_tick(id).expect("timer");
        s.lock().expect("seen").push((kernel.tick_get(), next));
    });
    let t = kernel
        .timer_create("p", 4, TimerMode::Periodic, TimerContext::Soft, cb)
        .expect("create");
    *t_slot.lock().expect("slot") = Some(t);
    kernel.timer_start(t).expect("start");
    for _ in 0..12 {
        kernel.tick_increase();
    }
    assert_eq!(
        *seen.lock().expect("seen"),
        vec![(4, Some(8)), (8, Some(12)), (12, Some(16))]
    );
}

#[test]
fn hard_timers_run_in_interrupt_context() {
    let kernel = Kernel::builder().build();
    let in_isr = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&in_isr);
    let cb: TimerCallback = Arc::new(move || {
        flag.store(usize::from(context::in_interrupt()), Ordering::SeqCst);
    });
    let t = kernel
        .timer_create("h", 1, TimerMode::OneShot, TimerContext::Hard, cb)
        .expect("create");
    kernel.timer_start(t).expect("start");
    kernel.tick_increase();
    assert_eq!(in_isr.load(Ordering::SeqCst), 1);
    assert!(!context::in_interrupt());
}

#[test]
fn control_and_stop() {
    let kernel = Kernel::builder().build();
    let (hits, cb) = counter();
    let t = kernel
        .timer_create("c", 0, TimerMode::OneShot, TimerContext::Soft, cb)
        .expect("create");
    assert_eq!(kernel.timer_start(t), Err(HostError::InvalidArgument));
    kernel.timer_control(t, TimerControl::SetTime(2)).expect("control");
    kernel.timer_control(t, TimerControl::SetPeriodic).expect("control");
    kernel.timer_start(t).expect("start");
    assert_eq!(kernel.timer_timeout_tick(t), Ok(Some(2)));
    kernel.tick_increase();
    assert_eq!(kernel.timer_stop(t), Ok(true));
    assert_eq!(kernel.timer_stop(t), Ok(false));
    for _ in 0..5 {
        kernel.tick_increase();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    kernel.timer_delete(t).expect("delete");
    assert_eq!(kernel.timer_start(t), Err(HostError::NoObject));
}

#[test]
fn replaced_callback_runs_from_the_next_expiry() {
    let kernel = Kernel::builder().build();
    let (old_hits, old_cb) = counter();
    let (new_hits, new_cb) = counter();
    let t = kernel
        .timer_create("r", 2, TimerMode::Periodic, TimerContext::Soft, old_cb)
        .expect("create");
    kernel.timer_start(t).expect("start");
    kernel.tick_increase();
    kernel.tick_increase();
    kernel.timer_set_callback(t, new_cb).expect("set callback");
    for _ in 0..4 {
        kernel.tick_increase();
    }
    assert_eq!(old_hits.load(Ordering::SeqCst), 1);
    assert_eq!(new_hits.load(Ordering::SeqCst), 2);
    kernel.timer_delete(t).expect("delete");
    assert_eq!(kernel.timer_set_callback(t, counter().1), Err(HostError::NoObject));
}
