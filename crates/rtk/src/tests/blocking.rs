use std::sync::Arc;

use super::wait_for_waiters;
use crate::error::HostError;
use crate::ipc::EventOption;
use crate::kernel::{Kernel, Timeout};
use crate::thread::{self, ThreadConfig, ThreadPriority, ThreadState};
use crate::context::InterruptGuard;

#[test]
fn release_hands_the_unit_to_the_waiter() {
    let kernel = Kernel::builder().build();
    let sem = kernel.sem_create("s", 0).expect("create");
    let k = Arc::clone(&kernel);
    let waiter = std::thread::spawn(move || k.sem_take(sem, Timeout::Forever));
    wait_for_waiters(&kernel, sem, 1);
    kernel.sem_release(sem).expect("release");
    assert_eq!(waiter.join().expect("join"), Ok(()));
    assert_eq!(kernel.sem_value(sem).expect("value"), 0);
}

#[test]
fn waiters_are_served_by_priority() {
    let kernel = Kernel::builder().build();
    let q = kernel.mq_create("q", 4).expect("create");
    let mut handles = Vec::new();
    for (i, prio) in [(0usize, 20u8), (1, 5), (2, 12)] {
        let k = Arc::clone(&kernel);
        let config = ThreadConfig::new(format!("w{i}"), ThreadPriority(prio));
        handles.push(
            kernel
                .spawn(config, move || k.mq_recv(q, Timeout::Forever))
                .expect("spawn"),
        );
        wait_for_waiters(&kernel, q, i + 1);
    }
    assert_eq!(
        kernel.critical().waiter_priorities(q).expect("prios"),
        vec![ThreadPriority(5), ThreadPriority(12), ThreadPriority(20)]
    );
    for msg in [100, 200, 300] {
        kernel.mq_send(q, msg).expect("send");
    }
    let got: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join").expect("recv"))
        .collect();
    // spawn order was priorities 20, 5, 12
    assert_eq!(got, vec![300, 100, 200]);
}

#[test]
fn tick_expires_a_bounded_wait() {
    let kernel = Kernel::builder().build();
    let sem = kernel.sem_create("s", 0).expect("create");
    let k = Arc::clone(&kernel);
    let waiter = std::thread::spawn(move || k.sem_take(sem, Timeout::Ticks(3)));
    wait_for_waiters(&kernel, sem, 1);
    kernel.tick_increase();
    kernel.tick_increase();
    assert_eq!(kernel.critical().waiter_count(sem), Ok(1));
    kernel.tick_increase();
    assert_eq!(waiter.join().expect("join"), Err(HostError::Timeout));
    assert_eq!(kernel.critical().waiter_count(sem), Ok(0));
}

#[test]
fn delete_interrupts_every_waiter() {
    let kernel = Kernel::builder().build();
    let ev = kernel.event_create("e", 0).expect("create");
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let k = Arc::clone(&kernel);
            std::thread::spawn(move || k.event_recv(ev, 1, EventOption::OR, Timeout::Forever))
        })
        .collect();
    wait_for_waiters(&kernel, ev, 3);
    assert_eq!(kernel.event_delete(ev), Ok(3));
    for h in handles {
        assert_eq!(h.join().expect("join"), Err(HostError::Interrupted));
    }
    assert_eq!(kernel.event_value(ev), Err(HostError::NoObject));
}

#[test]
fn consuming_waiter_hides_bits_from_the_next() {
    let kernel = Kernel::builder().build();
    let ev = kernel.event_create("e", 0).expect("create");
    let opt = EventOption::OR | EventOption::CLEAR;
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let k = Arc::clone(&kernel);
            let h = std::thread::spawn(move || k.event_recv(ev, 0b1, opt, Timeout::Forever));
            wait_for_waiters(&kernel, ev, i + 1);
            h
        })
        .collect();
    assert_eq!(kernel.event_send(ev, 0b1), Ok(0));
    assert_eq!(kernel.critical().waiter_count(ev), Ok(1));
    kernel.event_send(ev, 0b1).expect("send");
    for h in handles {
        assert_eq!(h.join().expect("join"), Ok(0b1));
    }
}

#[test]
fn broadcast_reaches_exactly_the_current_waiters() {
    let kernel = Kernel::builder().build();
    let q = kernel.mq_create("q", 1).expect("create");
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let k = Arc::clone(&kernel);
            let h = std::thread::spawn(move || k.mq_recv(q, Timeout::Forever));
            wait_for_waiters(&kernel, q, i + 1);
            h
        })
        .collect();
    assert_eq!(kernel.mq_send_all(q, 0xbeef), Ok(3));
    for h in handles {
        assert_eq!(h.join().expect("join"), Ok(0xbeef));
    }
    assert_eq!(kernel.mq_recv(q, Timeout::NoWait), Err(HostError::Timeout));
}

#[test]
fn blocking_from_interrupt_context_is_refused() {
    let kernel = Kernel::builder().build();
    let sem = kernel.sem_create("s", 0).expect("create");
    let _isr = InterruptGuard::enter();
    assert_eq!(kernel.sem_take(sem, Timeout::Forever), Err(HostError::InInterrupt));
}

#[test]
fn resume_of_a_ready_thread_is_a_no_op() {
    let kernel = Kernel::builder().build();
    let me = thread::current().id;
    let mut cs = kernel.critical();
    cs.current_descriptor_mut();
    assert_eq!(cs.thread(me).map(|r| r.state()), Some(ThreadState::Ready));
    assert!(!cs.resume(me, Ok(())));
}

#[test]
fn delay_returns_after_the_ticks() {
    let kernel = Kernel::builder().build();
    let k = Arc::clone(&kernel);
    let sleeper = std::thread::spawn(move || {
        let before = k.tick_get();
        k.delay(2).map(|()| k.tick_get() - before)
    });
    for _ in 0..1_000 {
        kernel.tick_increase();
        if sleeper.is_finished() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    let waited = sleeper.join().expect("join").expect("delay");
    assert!(waited >= 2);
}

#[test]
fn finished_threads_leave_no_record_behind() {
    let kernel = Kernel::builder().build();
    let sem = kernel.sem_create("s", 0).expect("create");
    let before = kernel.critical().state().threads.len();
    let mut handles = Vec::new();
    for i in 0..4u8 {
        let k = Arc::clone(&kernel);
        let config = ThreadConfig::new(format!("t{i}"), ThreadPriority(10 + i));
        handles.push(
            kernel
                .spawn(config, move || {
                    k.sem_take(sem, Timeout::Forever).map(|()| thread::current().id)
                })
                .expect("spawn"),
        );
    }
    wait_for_waiters(&kernel, sem, 4);
    assert_eq!(kernel.critical().state().threads.len(), before + 4);
    for _ in 0..4 {
        kernel.sem_release(sem).expect("release");
    }
    for handle in handles {
        let id = handle.join().expect("join").expect("take");
        assert!(kernel.critical().thread(id).is_none());
    }
    assert_eq!(kernel.critical().state().threads.len(), before);
}

#[test]
fn spawn_rejects_priorities_below_the_lowest() {
    let kernel = Kernel::builder().build();
    let config = ThreadConfig::new("late", ThreadPriority(200));
    assert!(matches!(kernel.spawn(config, || ()), Err(HostError::InvalidArgument)));
}

#[test]
fn sched_lock_nests() {
    let kernel = Kernel::builder().build();
    {
        let _outer = kernel.sched_lock_guard();
        kernel.sched_lock();
        assert_eq!(kernel.sched_lock_nesting(), 2);
        kernel.sched_unlock();
    }
    assert!(!kernel.is_sched_locked());
    kernel.sched_unlock();
    assert_eq!(kernel.sched_lock_nesting(), 0);
}
