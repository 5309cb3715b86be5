//! Event flag groups (`OSFlag*`).
//!
//! A group is a host event set. Wait types map onto [`EventOption`]:
//! `SET_*`/`CLR_*` choose whether set or cleared bits match, `*_ALL`/`*_ANY`
//! choose AND or OR, and [`OS_FLAG_CONSUME`] consumes the matched bits as
//! part of the same critical section that satisfies the wait. A successful
//! accept or pend returns only the bits that matched.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;
use rtk::{EventOption, ObjectClass, ObjectId};

use crate::abort::{abort_waiters, AbortScope};
use crate::error::{OsError, OsResult};
use crate::event::{OS_DEL_ALWAYS, OS_DEL_NO_PEND};
use crate::os::Os;

pub type OsFlags = u32;

pub const OS_FLAG_WAIT_CLR_ALL: u8 = 0;
pub const OS_FLAG_WAIT_CLR_ANY: u8 = 1;
pub const OS_FLAG_WAIT_SET_ALL: u8 = 2;
pub const OS_FLAG_WAIT_SET_ANY: u8 = 3;
/// Consume the matched bits on success.
pub const OS_FLAG_CONSUME: u8 = 0x80;

/// [`Os::flag_post`]: clear the given bits.
pub const OS_FLAG_CLR: u8 = 0;
/// [`Os::flag_post`]: set the given bits.
pub const OS_FLAG_SET: u8 = 1;

struct FlagBlock {
    host: ObjectId,
    name: Mutex<String>,
    live: AtomicBool,
}

/// Handle to an event flag group.
#[derive(Clone)]
pub struct FlagGroup(Arc<FlagBlock>);

impl FlagGroup {
    fn host(&self) -> OsResult<ObjectId> {
        if self.0.live.load(Ordering::Acquire) {
            Ok(self.0.host)
        } else {
            Err(OsError::EventType)
        }
    }

    pub fn ptr_eq(&self, other: &FlagGroup) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FlagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagGroup")
            .field("host", &self.0.host)
            .field("live", &self.0.live.load(Ordering::Relaxed))
            .finish()
    }
}

impl Os {
    fn flag_option(&self, wait_type: u8) -> OsResult<EventOption> {
        let consume = wait_type & OS_FLAG_CONSUME != 0;
        let mut option = match wait_type & !OS_FLAG_CONSUME {
            OS_FLAG_WAIT_SET_ALL => EventOption::AND,
            OS_FLAG_WAIT_SET_ANY => EventOption::OR,
            OS_FLAG_WAIT_CLR_ALL if self.config().flag_wait_clear => {
                EventOption::AND | EventOption::ON_CLEAR
            }
            OS_FLAG_WAIT_CLR_ANY if self.config().flag_wait_clear => {
                EventOption::OR | EventOption::ON_CLEAR
            }
            _ => return Err(OsError::FlagWaitType),
        };
        if consume {
            option |= EventOption::CLEAR;
        }
        Ok(option)
    }

    /// Creates a group holding `flags`.
    pub fn flag_create(&self, flags: OsFlags) -> OsResult<FlagGroup> {
        if rtk::in_interrupt() {
            return Err(OsError::CreateIsr);
        }
        let host = self.kernel().event_create("flag", flags)?;
        Ok(FlagGroup(Arc::new(FlagBlock {
            host,
            name: Mutex::new(String::from("?")),
            live: AtomicBool::new(true),
        })))
    }

    /// Checks the wait condition once. Fails with
    /// [`OsError::FlagNotRdy`] instead of blocking.
    pub fn flag_accept(&self, grp: &FlagGroup, flags: OsFlags, wait_type: u8) -> OsResult<OsFlags> {
        let host = grp.host()?;
        let option = self.flag_option(wait_type)?;
        self.kernel()
            .critical()
            .event_try_recv(host, flags, option)?
            .ok_or(OsError::FlagNotRdy)
    }

    /// Waits up to `timeout` ticks for the condition; zero waits forever.
    pub fn flag_pend(
        &self,
        grp: &FlagGroup,
        flags: OsFlags,
        wait_type: u8,
        timeout: u32,
    ) -> OsResult<OsFlags> {
        let host = grp.host()?;
        let option = self.flag_option(wait_type)?;
        if flags == 0 {
            return Err(OsError::InvalidOpt);
        }
        trace!("flag pend on {:?} for {:#x} ({:?})", host, flags, option);
        self.pend_on(host, timeout, |t| {
            self.kernel().event_recv(host, flags, option, t)
        })
    }

    /// Flags that made the calling task ready on its last flag wait.
    pub fn flag_pend_get_flags_rdy(&self) -> OsFlags {
        self.kernel().critical().current_flags_rdy()
    }

    /// Sets or clears `flags` and readies every task whose condition now
    /// holds. Returns the group value after any consumption.
    pub fn flag_post(&self, grp: &FlagGroup, flags: OsFlags, opt: u8) -> OsResult<OsFlags> {
        let host = grp.host()?;
        let value = match opt {
            OS_FLAG_SET => self.kernel().event_send(host, flags)?,
            OS_FLAG_CLR => self.kernel().event_clear(host, flags)?,
            _ => return Err(OsError::FlagInvalidOpt),
        };
        trace!("flag post {:#x} (opt {}) on {:?}, now {:#x}", flags, opt, host, value);
        Ok(value)
    }

    pub fn flag_del(&self, grp: &FlagGroup, opt: u8) -> OsResult<()> {
        let host = grp.host()?;
        if rtk::in_interrupt() {
            return Err(OsError::DelIsr);
        }
        let mut cs = self.kernel().critical();
        let pending = cs.waiter_count(host)?;
        let aborted = match opt {
            OS_DEL_NO_PEND if pending > 0 => return Err(OsError::TaskWaiting),
            OS_DEL_NO_PEND => 0,
            OS_DEL_ALWAYS => abort_waiters(&mut cs, host, AbortScope::All)?,
            _ => return Err(OsError::InvalidOpt),
        };
        cs.delete_object(host, ObjectClass::Event)?;
        grp.0.live.store(false, Ordering::Release);
        drop(cs);
        debug!("deleted flag group {:?}, {} waiter(s) aborted", host, aborted);
        Ok(())
    }

    /// Current value of the group.
    pub fn flag_query(&self, grp: &FlagGroup) -> OsResult<OsFlags> {
        let host = grp.host()?;
        Ok(self.kernel().event_value(host)?)
    }

    /// Priorities of the tasks pending on the group, most urgent first.
    pub fn flag_waiting(&self, grp: &FlagGroup) -> OsResult<Vec<u8>> {
        let host = grp.host()?;
        let cs = self.kernel().critical();
        Ok(cs.waiter_priorities(host)?.into_iter().map(|p| p.0).collect())
    }

    pub fn flag_name_set(&self, grp: &FlagGroup, name: &str) -> OsResult<()> {
        grp.host()?;
        if rtk::in_interrupt() {
            return Err(OsError::NameSetIsr);
        }
        *grp.0.name.lock() = name.to_owned();
        Ok(())
    }

    pub fn flag_name_get(&self, grp: &FlagGroup) -> OsResult<String> {
        grp.host()?;
        if rtk::in_interrupt() {
            return Err(OsError::NameGetIsr);
        }
        Ok(grp.0.name.lock().clone())
    }
}
