//! Counting semaphores (`OSSem*`).

use log::trace;
use rtk::HostError;

use crate::error::{OsError, OsResult};
use crate::event::{EventKind, EventType, OsEvent};
use crate::os::Os;

/// Snapshot returned by [`Os::sem_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemData {
    pub count: u16,
    /// Priorities of the pending tasks, most urgent first.
    pub waiting: Vec<u8>,
}

impl Os {
    /// Creates a semaphore holding `count` units.
    pub fn sem_create(&self, count: u16) -> OsResult<OsEvent> {
        if rtk::in_interrupt() {
            return Err(OsError::CreateIsr);
        }
        let host = self.kernel().sem_create("sem", count)?;
        Ok(OsEvent::new(EventKind::Semaphore, host))
    }

    /// Takes a unit without blocking. Returns the count seen before the
    /// decrement, zero when nothing was available.
    pub fn sem_accept(&self, ev: &OsEvent) -> OsResult<u16> {
        let host = ev.host_for(EventType::Sem)?;
        let mut cs = self.kernel().critical();
        let count = cs.sem_value(host)?;
        if count > 0 {
            cs.sem_try_take(host)?;
        }
        Ok(count)
    }

    /// Waits up to `timeout` ticks for a unit; zero waits forever.
    pub fn sem_pend(&self, ev: &OsEvent, timeout: u32) -> OsResult<()> {
        let host = ev.host_for(EventType::Sem)?;
        trace!("sem pend on {:?}, timeout {}", host, timeout);
        self.pend_on(host, timeout, |t| self.kernel().sem_take(host, t))
    }

    /// Releases a unit, readying the most urgent waiter if there is one.
    pub fn sem_post(&self, ev: &OsEvent) -> OsResult<()> {
        let host = ev.host_for(EventType::Sem)?;
        self.kernel().sem_release(host).map_err(|err| match err {
            HostError::Full => OsError::SemOvf,
            other => OsError::from(other),
        })
    }

    /// Aborts the head waiter, or every waiter with
    /// [`crate::event::OS_PEND_OPT_BROADCAST`]. Returns how many were readied.
    pub fn sem_pend_abort(&self, ev: &OsEvent, opt: u8) -> OsResult<u8> {
        self.pend_abort(ev, EventType::Sem, opt)
    }

    pub fn sem_del(&self, ev: &OsEvent, opt: u8) -> OsResult<()> {
        self.delete_event(ev, EventType::Sem, opt)
    }

    /// Overwrites the count. Refused while tasks are pending on an empty
    /// semaphore.
    pub fn sem_set(&self, ev: &OsEvent, count: u16) -> OsResult<()> {
        let host = ev.host_for(EventType::Sem)?;
        let mut cs = self.kernel().critical();
        if cs.sem_value(host)? == 0 && cs.waiter_count(host)? > 0 {
            return Err(OsError::TaskWaiting);
        }
        cs.sem_set_value(host, count)?;
        Ok(())
    }

    pub fn sem_query(&self, ev: &OsEvent) -> OsResult<SemData> {
        let host = ev.host_for(EventType::Sem)?;
        let mut cs = self.kernel().critical();
        Ok(SemData {
            count: cs.sem_value(host)?,
            waiting: cs.waiter_priorities(host)?.into_iter().map(|p| p.0).collect(),
        })
    }
}
