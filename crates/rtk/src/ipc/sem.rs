//! Counting semaphore.

use super::{IpcBody, ObjectClass, ObjectId};
use crate::error::{HostError, HostResult};
use crate::kernel::{CriticalSection, Kernel, Timeout};
use crate::thread::Payload;

pub(crate) struct SemCore {
    value: u16,
}

impl Kernel {
    pub fn sem_create(&self, name: &str, value: u16) -> HostResult<ObjectId> {
        Ok(self
            .critical()
            .create_object(name, IpcBody::Semaphore(SemCore { value })))
    }

    /// Takes one unit, suspending the caller up to `timeout` if none is left.
    pub fn sem_take(&self, id: ObjectId, timeout: Timeout) -> HostResult<()> {
        let mut cs = self.critical();
        if cs.sem_try_take(id)? {
            return Ok(());
        }
        cs.suspend(Some(id), timeout)
    }

    pub fn sem_release(&self, id: ObjectId) -> HostResult<()> {
        self.critical().sem_release(id)
    }

    pub fn sem_value(&self, id: ObjectId) -> HostResult<u16> {
        self.critical().sem_value(id)
    }

    pub fn sem_delete(&self, id: ObjectId) -> HostResult<usize> {
        self.critical().delete_object(id, ObjectClass::Semaphore)
    }
}

impl CriticalSection<'_> {
    fn sem_core(&mut self, id: ObjectId) -> HostResult<&mut SemCore> {
        match &mut self.object_mut(id)?.body {
            IpcBody::Semaphore(sem) => Ok(sem),
            _ => Err(HostError::WrongClass),
        }
    }

    /// Takes one unit if available without blocking.
    pub fn sem_try_take(&mut self, id: ObjectId) -> HostResult<bool> {
        let sem = self.sem_core(id)?;
        if sem.value > 0 {
            sem.value -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Releases one unit. The head waiter, if any, receives it directly.
    pub fn sem_release(&mut self, id: ObjectId) -> HostResult<()> {
        self.sem_core(id)?;
        if let Some(waiter) = self.object(id)?.queue.head() {
            self.hand_off(waiter, Payload::None);
            return Ok(());
        }
        let sem = self.sem_core(id)?;
        sem.value = sem.value.checked_add(1).ok_or(HostError::Full)?;
        Ok(())
    }

    pub fn sem_value(&mut self, id: ObjectId) -> HostResult<u16> {
        Ok(self.sem_core(id)?.value)
    }

    /// Overwrites the count. Units go to current waiters first.
    pub fn sem_set_value(&mut self, id: ObjectId, value: u16) -> HostResult<()> {
        self.sem_core(id)?;
        let mut value = value;
        while value > 0 {
            let Some(waiter) = self.object(id)?.queue.head() else {
                break;
            };
            self.hand_off(waiter, Payload::None);
            value -= 1;
        }
        self.sem_core(id)?.value = value;
        Ok(())
    }
}
