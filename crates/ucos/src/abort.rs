//! Forced wake-up of pending tasks.
//!
//! An aborted waiter is tagged [`PendStatus::Abort`] in its wait descriptor
//! before it is resumed, which is how its pend call reports
//! [`OsError::PendAbort`] instead of a timeout or success. The walk over the
//! waiters happens in one critical section and is linear in their number.

use log::debug;
use rtk::{CriticalSection, HostError, HostResult, ObjectId, PendStatus};

use crate::error::{OsError, OsResult};
use crate::event::{EventType, OsEvent, OS_PEND_OPT_BROADCAST, OS_PEND_OPT_NONE};
use crate::os::Os;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortScope {
    /// The waiter at the head of the queue.
    Head,
    All,
}

impl AbortScope {
    pub fn from_opt(opt: u8) -> OsResult<Self> {
        match opt {
            OS_PEND_OPT_NONE => Ok(AbortScope::Head),
            OS_PEND_OPT_BROADCAST => Ok(AbortScope::All),
            _ => Err(OsError::InvalidOpt),
        }
    }
}

/// Aborts the waiters of `host` selected by `scope`. Returns how many were
/// woken; an empty queue yields zero.
pub fn abort_waiters(
    cs: &mut CriticalSection<'_>,
    host: ObjectId,
    scope: AbortScope,
) -> HostResult<usize> {
    let mut targets = cs.waiters(host)?;
    if scope == AbortScope::Head {
        targets.truncate(1);
    }
    for &tid in &targets {
        if let Some(desc) = cs.descriptor_mut(tid) {
            desc.status = PendStatus::Abort;
        }
        cs.resume(tid, Err(HostError::Interrupted));
    }
    Ok(targets.len())
}

impl Os {
    /// Shared body of the `*PendAbort` calls. Returns the number of tasks
    /// readied, saturated to the legacy 8-bit count.
    pub(crate) fn pend_abort(&self, ev: &OsEvent, expected: EventType, opt: u8) -> OsResult<u8> {
        let host = ev.host_for(expected)?;
        let scope = AbortScope::from_opt(opt)?;
        let woken = abort_waiters(&mut self.kernel().critical(), host, scope)?;
        if woken > 0 {
            debug!("aborted {} waiter(s) on {:?} ({:?})", woken, expected, scope);
        }
        Ok(u8::try_from(woken).unwrap_or(u8::MAX))
    }
}
