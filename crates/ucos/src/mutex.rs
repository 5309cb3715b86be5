//! Mutual-exclusion semaphores (`OSMutex*`).
//!
//! Ownership is enforced here and handed to the most urgent waiter on
//! release. The ceiling priority is validated and reserved in the priority
//! table but the ceiling protocol itself is not applied: the host mutex has
//! no priority-ceiling support, so the owner keeps its own priority.

use log::{trace, warn};
use rtk::HostError;

use crate::error::{OsError, OsResult};
use crate::event::{EventKind, EventType, OsEvent};
use crate::os::{Os, PrioSlot};

/// Ceiling value that disables the ceiling priority.
pub const OS_PRIO_MUTEX_CEIL_DIS: u8 = 0xFF;

/// Snapshot returned by [`Os::mutex_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexData {
    /// Whether the mutex is free.
    pub available: bool,
    pub owner_prio: Option<u8>,
    pub ceiling: Option<u8>,
    /// Priorities of the pending tasks, most urgent first.
    pub waiting: Vec<u8>,
}

impl Os {
    /// Creates a mutex with ceiling priority `prio`, or without a ceiling when
    /// `prio` is [`OS_PRIO_MUTEX_CEIL_DIS`].
    pub fn mutex_create(&self, prio: u8) -> OsResult<OsEvent> {
        if rtk::in_interrupt() {
            return Err(OsError::CreateIsr);
        }
        let ceiling = (prio != OS_PRIO_MUTEX_CEIL_DIS).then_some(prio);
        if let Some(prio) = ceiling {
            if prio >= self.config().lowest_prio {
                return Err(OsError::PrioInvalid);
            }
            self.claim_prio(prio, PrioSlot::Reserved)?;
            warn!("mutex ceiling {} reserved but not enforced by the host", prio);
        }
        match self.kernel().mutex_create("mutex") {
            Ok(host) => Ok(OsEvent::new(EventKind::Mutex { ceiling }, host)),
            Err(err) => {
                if let Some(prio) = ceiling {
                    self.release_prio(prio);
                }
                Err(err.into())
            }
        }
    }

    /// Creates a mutex without a ceiling priority.
    pub fn mutex_create_ex(&self) -> OsResult<OsEvent> {
        self.mutex_create(OS_PRIO_MUTEX_CEIL_DIS)
    }

    /// Acquires the mutex if it is free. Returns whether it was acquired.
    pub fn mutex_accept(&self, ev: &OsEvent) -> OsResult<bool> {
        let host = ev.host_for(EventType::Mutex)?;
        if rtk::in_interrupt() {
            return Err(OsError::PendIsr);
        }
        Ok(self.kernel().critical().mutex_try_take(host)?)
    }

    /// Waits up to `timeout` ticks for ownership; zero waits forever.
    pub fn mutex_pend(&self, ev: &OsEvent, timeout: u32) -> OsResult<()> {
        let host = ev.host_for(EventType::Mutex)?;
        trace!("mutex pend on {:?}, timeout {}", host, timeout);
        self.pend_on(host, timeout, |t| self.kernel().mutex_take(host, t))
    }

    /// Releases the mutex. Only the owner may release it.
    pub fn mutex_post(&self, ev: &OsEvent) -> OsResult<()> {
        let host = ev.host_for(EventType::Mutex)?;
        if rtk::in_interrupt() {
            return Err(OsError::PostIsr);
        }
        self.kernel().mutex_release(host).map_err(|err| match err {
            HostError::NotOwner => OsError::NotMutexOwner,
            other => OsError::from(other),
        })
    }

    pub fn mutex_del(&self, ev: &OsEvent, opt: u8) -> OsResult<()> {
        self.delete_event(ev, EventType::Mutex, opt)
    }

    pub fn mutex_query(&self, ev: &OsEvent) -> OsResult<MutexData> {
        let host = ev.host_for(EventType::Mutex)?;
        if rtk::in_interrupt() {
            return Err(OsError::QueryIsr);
        }
        let ceiling = match ev.kind() {
            EventKind::Mutex { ceiling } => ceiling,
            _ => None,
        };
        let mut cs = self.kernel().critical();
        let info = cs.mutex_info(host)?;
        Ok(MutexData {
            available: info.owner.is_none(),
            owner_prio: info.owner_priority.map(|p| p.0),
            ceiling,
            waiting: cs.waiter_priorities(host)?.into_iter().map(|p| p.0).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsConfig;

    #[test]
    fn ceiling_reserves_its_priority() -> Result<(), OsError> {
        let os = Os::new(OsConfig::default());
        let m = os.mutex_create(4)?;
        assert_eq!(os.prio_slot(4), Some(PrioSlot::Reserved));
        assert_eq!(os.mutex_create(4).err(), Some(OsError::PrioExist));
        assert_eq!(os.task_create(4, "t", || ()).err(), Some(OsError::PrioExist));
        os.mutex_del(&m, crate::event::OS_DEL_NO_PEND)?;
        assert_eq!(os.prio_slot(4), None);
        Ok(())
    }

    #[test]
    fn ceiling_must_be_above_the_lowest_priority() {
        let os = Os::new(OsConfig::default());
        let lowest = os.config().lowest_prio;
        assert_eq!(os.mutex_create(lowest).err(), Some(OsError::PrioInvalid));
    }

    #[test]
    fn accept_and_query() -> Result<(), OsError> {
        let os = Os::new(OsConfig::default());
        let m = os.mutex_create_ex()?;
        assert!(os.mutex_accept(&m)?);
        let data = os.mutex_query(&m)?;
        assert!(!data.available);
        assert_eq!(data.owner_prio, Some(rtk::thread::DEFAULT_PRIORITY.0));
        assert_eq!(data.ceiling, None);
        os.mutex_post(&m)?;
        assert!(os.mutex_query(&m)?.available);
        Ok(())
    }
}
