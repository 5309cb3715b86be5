//! Event control blocks shared by semaphores, mutexes, queues and mailboxes.
//!
//! The legacy API passes one untyped event pointer to every call. Here the
//! handle wraps a closed set of kinds and each call checks the kind by
//! matching on it; a deleted handle reads back as an unused block.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use rtk::{HostError, HostResult, ObjectClass, ObjectId, PendStatus, Timeout};

use crate::abort::{abort_waiters, AbortScope};
use crate::error::{OsError, OsResult};
use crate::os::Os;

/// Delete only if no task is pending.
pub const OS_DEL_NO_PEND: u8 = 0;
/// Delete and ready every pending task.
pub const OS_DEL_ALWAYS: u8 = 1;

/// Abort the highest-priority waiter only.
pub const OS_PEND_OPT_NONE: u8 = 0;
/// Abort every waiter.
pub const OS_PEND_OPT_BROADCAST: u8 = 1;

/// Legacy event block type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Unused = 0,
    Mbox = 1,
    Q = 2,
    Sem = 3,
    Mutex = 4,
    Flag = 5,
}

impl EventType {
    pub(crate) fn host_class(self) -> Option<ObjectClass> {
        match self {
            EventType::Sem => Some(ObjectClass::Semaphore),
            EventType::Mutex => Some(ObjectClass::Mutex),
            EventType::Q | EventType::Mbox => Some(ObjectClass::MessageQueue),
            EventType::Flag => Some(ObjectClass::Event),
            EventType::Unused => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventKind {
    Semaphore,
    Mutex { ceiling: Option<u8> },
    Queue,
    Mailbox,
}

struct EventBlock {
    kind: EventKind,
    host: ObjectId,
    name: Mutex<String>,
    live: AtomicBool,
}

/// Handle to a semaphore, mutex, queue or mailbox.
#[derive(Clone)]
pub struct OsEvent(Arc<EventBlock>);

impl OsEvent {
    pub(crate) fn new(kind: EventKind, host: ObjectId) -> Self {
        Self(Arc::new(EventBlock {
            kind,
            host,
            name: Mutex::new(String::from("?")),
            live: AtomicBool::new(true),
        }))
    }

    pub fn event_type(&self) -> EventType {
        if !self.0.live.load(Ordering::Acquire) {
            return EventType::Unused;
        }
        match self.0.kind {
            EventKind::Semaphore => EventType::Sem,
            EventKind::Mutex { .. } => EventType::Mutex,
            EventKind::Queue => EventType::Q,
            EventKind::Mailbox => EventType::Mbox,
        }
    }

    pub(crate) fn kind(&self) -> EventKind {
        self.0.kind
    }

    /// Host object behind the handle if it is a live block of `expected`.
    pub(crate) fn host_for(&self, expected: EventType) -> OsResult<ObjectId> {
        if self.event_type() == expected {
            Ok(self.0.host)
        } else {
            Err(OsError::EventType)
        }
    }

    fn retire(&self) {
        self.0.live.store(false, Ordering::Release);
    }

    /// Whether both handles name the same event block.
    pub fn ptr_eq(&self, other: &OsEvent) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsEvent")
            .field("type", &self.event_type())
            .field("host", &self.0.host)
            .finish()
    }
}

/// Legacy timeouts count ticks, with zero meaning forever.
pub(crate) fn host_timeout(ticks: u32) -> Timeout {
    match ticks {
        0 => Timeout::Forever,
        n => Timeout::Ticks(n),
    }
}

impl Os {
    /// Runs a blocking host call as a legacy pend on `host`.
    ///
    /// The wait descriptor is armed before the host call and read back under
    /// the critical section right after it returns, so an abort is told apart
    /// from a timeout even when both were pending.
    pub(crate) fn pend_on<T>(
        &self,
        host: ObjectId,
        timeout: u32,
        wait: impl FnOnce(Timeout) -> HostResult<T>,
    ) -> OsResult<T> {
        self.check_pend_context()?;
        let timeout = host_timeout(timeout);
        self.kernel()
            .critical()
            .current_descriptor_mut()
            .begin(host, timeout);
        let result = wait(timeout);
        let status = self.kernel().critical().current_descriptor_mut().finish(&result);
        match (result, status) {
            (Ok(value), _) => Ok(value),
            (Err(HostError::Timeout | HostError::Interrupted), PendStatus::Abort) => {
                Err(OsError::PendAbort)
            }
            (Err(HostError::Timeout), _) => Err(OsError::Timeout),
            (Err(err), _) => Err(OsError::from_host(err)),
        }
    }

    /// Shared body of the `*Del` calls for event blocks.
    pub(crate) fn delete_event(&self, ev: &OsEvent, expected: EventType, opt: u8) -> OsResult<()> {
        let host = ev.host_for(expected)?;
        if rtk::in_interrupt() {
            return Err(OsError::DelIsr);
        }
        let class = expected.host_class().ok_or(OsError::EventType)?;
        let aborted = {
            let mut cs = self.kernel().critical();
            let pending = cs.waiter_count(host)?;
            let aborted = match opt {
                OS_DEL_NO_PEND if pending > 0 => return Err(OsError::TaskWaiting),
                OS_DEL_NO_PEND => 0,
                OS_DEL_ALWAYS => abort_waiters(&mut cs, host, AbortScope::All)?,
                _ => return Err(OsError::InvalidOpt),
            };
            cs.delete_object(host, class)?;
            ev.retire();
            aborted
        };
        if let EventKind::Mutex { ceiling: Some(prio) } = ev.kind() {
            self.release_prio(prio);
        }
        debug!("deleted {:?} event, {} waiter(s) aborted", expected, aborted);
        Ok(())
    }

    /// Assigns a name to an event block (`OSEventNameSet`).
    pub fn event_name_set(&self, ev: &OsEvent, name: &str) -> OsResult<()> {
        if ev.event_type() == EventType::Unused {
            return Err(OsError::EventType);
        }
        if rtk::in_interrupt() {
            return Err(OsError::NameSetIsr);
        }
        *ev.0.name.lock() = name.to_owned();
        Ok(())
    }

    /// Name of an event block, `"?"` until one is set (`OSEventNameGet`).
    pub fn event_name_get(&self, ev: &OsEvent) -> OsResult<String> {
        if ev.event_type() == EventType::Unused {
            return Err(OsError::EventType);
        }
        if rtk::in_interrupt() {
            return Err(OsError::NameGetIsr);
        }
        Ok(ev.0.name.lock().clone())
    }
}
