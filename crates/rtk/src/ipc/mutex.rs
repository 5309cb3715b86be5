//! Recursive mutex with ownership.

use super::{IpcBody, ObjectClass, ObjectId};
use crate::error::{HostError, HostResult};
use crate::kernel::{CriticalSection, Kernel, Timeout};
use crate::thread::{self, Payload, ThreadId, ThreadPriority};

pub(crate) struct MutexCore {
    owner: Option<(ThreadId, ThreadPriority)>,
    hold: u16,
}

/// Snapshot of a mutex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexInfo {
    pub owner: Option<ThreadId>,
    pub owner_priority: Option<ThreadPriority>,
    /// Recursive hold count of the owner.
    pub hold: u16,
    pub waiters: usize,
}

impl Kernel {
    pub fn mutex_create(&self, name: &str) -> HostResult<ObjectId> {
        Ok(self.critical().create_object(
            name,
            IpcBody::Mutex(MutexCore {
                owner: None,
                hold: 0,
            }),
        ))
    }

    /// Acquires the mutex. When suspended, the caller owns the mutex on a
    /// successful return because the releaser hands ownership over.
    pub fn mutex_take(&self, id: ObjectId, timeout: Timeout) -> HostResult<()> {
        let mut cs = self.critical();
        if cs.mutex_try_take(id)? {
            return Ok(());
        }
        cs.suspend(Some(id), timeout)
    }

    pub fn mutex_release(&self, id: ObjectId) -> HostResult<()> {
        self.critical().mutex_release(id)
    }

    pub fn mutex_info(&self, id: ObjectId) -> HostResult<MutexInfo> {
        self.critical().mutex_info(id)
    }

    pub fn mutex_delete(&self, id: ObjectId) -> HostResult<usize> {
        self.critical().delete_object(id, ObjectClass::Mutex)
    }
}

impl CriticalSection<'_> {
    fn mutex_core(&mut self, id: ObjectId) -> HostResult<&mut MutexCore> {
        match &mut self.object_mut(id)?.body {
            IpcBody::Mutex(mutex) => Ok(mutex),
            _ => Err(HostError::WrongClass),
        }
    }

    /// Acquires the mutex if it is free or already held by the caller.
    pub fn mutex_try_take(&mut self, id: ObjectId) -> HostResult<bool> {
        let me = thread::current();
        let mutex = self.mutex_core(id)?;
        match mutex.owner {
            None => {
                mutex.owner = Some((me.id, me.priority));
                mutex.hold = 1;
                Ok(true)
            }
            Some((owner, _)) if owner == me.id => {
                mutex.hold = mutex.hold.checked_add(1).ok_or(HostError::Full)?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    /// Releases one hold. On the last release ownership passes to the head
    /// waiter.
    pub fn mutex_release(&mut self, id: ObjectId) -> HostResult<()> {
        let me = thread::current().id;
        let mutex = self.mutex_core(id)?;
        match mutex.owner {
            Some((owner, _)) if owner == me => {}
            _ => return Err(HostError::NotOwner),
        }
        mutex.hold -= 1;
        if mutex.hold > 0 {
            return Ok(());
        }
        mutex.owner = None;

        let Some(next) = self.object(id)?.queue.head() else {
            return Ok(());
        };
        let priority = self
            .thread(next)
            .map(|r| r.info().priority)
            .unwrap_or(thread::DEFAULT_PRIORITY);
        let mutex = self.mutex_core(id)?;
        mutex.owner = Some((next, priority));
        mutex.hold = 1;
        self.hand_off(next, Payload::None);
        Ok(())
    }

    pub fn mutex_info(&mut self, id: ObjectId) -> HostResult<MutexInfo> {
        let waiters = self.waiter_count(id)?;
        let mutex = self.mutex_core(id)?;
        Ok(MutexInfo {
            owner: mutex.owner.map(|(id, _)| id),
            owner_priority: mutex.owner.map(|(_, p)| p),
            hold: mutex.hold,
            waiters,
        })
    }
}
