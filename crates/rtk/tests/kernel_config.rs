//! Tests for KernelConfig builder and trace hook wiring.

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use rtk::kernel::{Kernel, KernelConfig};
use rtk::trace::{TraceHook, TRACE_OBJECT_CREATE, TRACE_OBJECT_DELETE, TRACE_TIMER_EXPIRE};
use rtk::{ThreadPriority, TimerContext, TimerMode};

static RECORDS: Lazy<Mutex<Vec<u8>>> = Lazy::new(|| Mutex::new(Vec::new()));

#[test]
fn kernel_config_builder() {
    let config = KernelConfig::builder()
        .name("TestKernel")
        .tick_rate_hz(100)
        .lowest_priority(ThreadPriority(63))
        .build();

    assert_eq!(config.name, "TestKernel");
    assert_eq!(config.tick_rate_hz, 100);
    assert_eq!(config.lowest_priority, ThreadPriority(63));
}

#[test]
fn kernel_config_default() {
    let config = KernelConfig::default();

    assert_eq!(config.name, "rtk");
    assert_eq!(config.tick_rate_hz, 1000);
    assert_eq!(config.lowest_priority, ThreadPriority(31));
}

#[test]
fn kernel_with_custom_config() {
    let config = KernelConfig::builder().name("CustomKernel").build();
    let kernel = Kernel::with_config(config).build();

    assert_eq!(kernel.config().name, "CustomKernel");
    assert_eq!(kernel.tick_get(), 0);
}

#[test]
fn trace_hook_sees_lifecycle_records() {
    let hook: TraceHook = Arc::new(|record, _payload, _ts| {
        RECORDS.lock().expect("records").push(record);
        Ok(())
    });
    let kernel = Kernel::builder().with_trace_hook(hook).build();

    let sem = kernel.sem_create("traced", 0).expect("create");
    kernel.sem_delete(sem).expect("delete");
    let timer = kernel
        .timer_create("traced", 1, TimerMode::OneShot, TimerContext::Soft, Arc::new(|| ()))
        .expect("timer");
    kernel.timer_start(timer).expect("start");
    kernel.tick_increase();

    let records = RECORDS.lock().expect("records").clone();
    assert!(records.contains(&TRACE_OBJECT_CREATE));
    assert!(records.contains(&TRACE_OBJECT_DELETE));
    assert!(records.contains(&TRACE_TIMER_EXPIRE));
}

#[test]
fn ticker_advances_the_clock() {
    let kernel = Kernel::with_config(KernelConfig::builder().tick_rate_hz(1000).build()).build();
    kernel.start_ticker().expect("ticker");
    kernel.start_ticker().expect("second start is a no-op");
    while kernel.tick_get() < 3 {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    kernel.stop_ticker();
    let stopped_at = kernel.tick_get();
    std::thread::sleep(std::time::Duration::from_millis(10));
    assert_eq!(kernel.tick_get(), stopped_at);
}
