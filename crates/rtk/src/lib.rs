//! # rtk
//!
//! A small model of a priority-based real-time host kernel, running on `std`
//! threads. It provides what a compatibility layer needs from a host:
//!
//! - [`thread`]  – thread identity, control blocks and wait descriptors.
//! - [`context`] – interrupt nesting bookkeeping.
//! - [`wait`]    – priority-ordered wait queues.
//! - [`kernel`]  – the critical section, tick clock and blocking core.
//! - [`ipc`]     – semaphore, mutex, message queue and event set objects.
//! - [`timer`]   – one-shot and periodic timers driven by the tick.
//!
//! The kernel does not schedule: threads run concurrently and the kernel only
//! decides who is suspended, who is resumed, and with which outcome.

pub mod context;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod sync;
pub mod thread;
pub mod timer;
pub mod trace;
pub mod wait;

pub use context::{in_interrupt, interrupt_enter, interrupt_leave, interrupt_nesting, InterruptGuard};
pub use error::{HostError, HostResult};
pub use ipc::{EventOption, MqInfo, MutexInfo, ObjectClass, ObjectId};
pub use kernel::{
    CriticalSection, Kernel, KernelBuilder, KernelConfig, KernelConfigBuilder, SchedLockGuard, Tick,
    Timeout,
};
pub use thread::{
    PendStatus, ThreadConfig, ThreadId, ThreadInfo, ThreadPriority, ThreadRecord, ThreadState,
    WaitDescriptor,
};
pub use timer::{TimerCallback, TimerContext, TimerControl, TimerId, TimerMode};
pub use trace::{TraceError, TraceHook, TraceResult};

#[cfg(test)]
mod tests;
