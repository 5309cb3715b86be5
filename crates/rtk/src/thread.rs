//! Thread identity and per-thread control blocks.
//!
//! Threads are ordinary `std` threads. Each carries its identity in a
//! thread-local slot: threads started through [`crate::Kernel::spawn`] get the
//! name and priority from their [`ThreadConfig`], any other thread is adopted
//! with [`DEFAULT_PRIORITY`] the first time it asks for [`current`].
//!
//! The wait bookkeeping for a thread lives in a [`ThreadRecord`] owned by the
//! kernel state, so it is only ever touched under the kernel critical section.

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::HostResult;
use crate::ipc::{EventOption, ObjectId};
use crate::kernel::{Tick, Timeout};
use crate::sync::{Arc, Condvar};

/// Priority given to threads that were not started by the kernel.
pub const DEFAULT_PRIORITY: ThreadPriority = ThreadPriority(16);

const MIN_STACK_SIZE: usize = 64 * 1024;

static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static CURRENT: RefCell<Option<ThreadInfo>> = const { RefCell::new(None) };
}

/// Thread identifier, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

impl ThreadId {
    fn next() -> Self {
        Self(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Thread priority. Numerically lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadPriority(pub u8);

impl fmt::Display for ThreadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for a kernel-managed thread.
#[derive(Debug, Clone)]
pub struct ThreadConfig {
    pub name: String,
    pub priority: ThreadPriority,
    /// Stack size in bytes. Raised to a floor that is safe for `std` threads.
    pub stack_size: usize,
}

impl ThreadConfig {
    pub fn new(name: impl Into<String>, priority: ThreadPriority) -> Self {
        Self {
            name: name.into(),
            priority,
            stack_size: MIN_STACK_SIZE,
        }
    }

    /// Sets the stack size for the thread.
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub(crate) fn effective_stack_size(&self) -> usize {
        self.stack_size.max(MIN_STACK_SIZE)
    }
}

/// Identity of a thread as seen by the kernel.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: Arc<str>,
    pub priority: ThreadPriority,
}

impl ThreadInfo {
    pub(crate) fn from_config(config: &ThreadConfig) -> Self {
        Self {
            id: ThreadId::next(),
            name: Arc::from(config.name.as_str()),
            priority: config.priority,
        }
    }
}

/// Returns the identity of the calling thread, adopting it if needed.
pub fn current() -> ThreadInfo {
    CURRENT.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(|| {
                let name = std::thread::current()
                    .name()
                    .unwrap_or("anonymous")
                    .to_owned();
                ThreadInfo::from_config(&ThreadConfig::new(name, DEFAULT_PRIORITY))
            })
            .clone()
    })
}

pub(crate) fn install(info: ThreadInfo) {
    CURRENT.with(|slot| *slot.borrow_mut() = Some(info));
}

/// Run state of a thread inside one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    /// Suspended on an object's wait queue, or on a plain delay when `None`.
    Suspended(Option<ObjectId>),
}

/// Outcome the adapter layer records for a pend, independent of the host
/// return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendStatus {
    #[default]
    Ok,
    Timeout,
    Abort,
}

impl PendStatus {
    /// Resolves the final outcome of a pend from the host return value and
    /// the status recorded while the thread was suspended.
    pub fn resolve<T>(self, host: &HostResult<T>) -> PendStatus {
        match (host, self) {
            (Ok(_), _) => PendStatus::Ok,
            (Err(_), PendStatus::Abort) => PendStatus::Abort,
            (Err(_), _) => PendStatus::Timeout,
        }
    }
}

/// What a thread is waiting on, as seen by the adapter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitDescriptor {
    pub object: Option<ObjectId>,
    pub timeout: Option<Timeout>,
    pub status: PendStatus,
}

impl WaitDescriptor {
    /// Marks the start of a pend on `object`.
    pub fn begin(&mut self, object: ObjectId, timeout: Timeout) {
        self.object = Some(object);
        self.timeout = Some(timeout);
        self.status = PendStatus::Ok;
    }

    /// Resolves the pend outcome and clears the descriptor.
    pub fn finish<T>(&mut self, host: &HostResult<T>) -> PendStatus {
        let status = self.status.resolve(host);
        *self = WaitDescriptor::default();
        status
    }
}

/// Data handed to a thread by the operation that woke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Payload {
    #[default]
    None,
    Message(usize),
    Events(u32),
}

/// Event-set wait condition parked with a suspended thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EventRequest {
    pub bits: u32,
    pub option: EventOption,
}

/// Kernel-side control block for one thread.
pub struct ThreadRecord {
    pub(crate) info: ThreadInfo,
    pub(crate) state: ThreadState,
    pub(crate) wake: Option<HostResult<()>>,
    pub(crate) deadline: Option<Tick>,
    pub(crate) payload: Payload,
    pub(crate) request: Option<EventRequest>,
    pub(crate) signal: Arc<Condvar>,
    pub(crate) descriptor: WaitDescriptor,
    pub(crate) flags_rdy: u32,
}

impl ThreadRecord {
    pub(crate) fn new(info: ThreadInfo) -> Self {
        Self {
            info,
            state: ThreadState::Ready,
            wake: None,
            deadline: None,
            payload: Payload::None,
            request: None,
            signal: Arc::new(Condvar::new()),
            descriptor: WaitDescriptor::default(),
            flags_rdy: 0,
        }
    }

    pub fn info(&self) -> &ThreadInfo {
        &self.info
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn descriptor(&self) -> &WaitDescriptor {
        &self.descriptor
    }

    /// Event bits that last made this thread ready.
    pub fn flags_rdy(&self) -> u32 {
        self.flags_rdy
    }
}
