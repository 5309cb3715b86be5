//! Host IPC objects.
//!
//! Every object carries a priority-ordered [`WaitQueue`] and a class-specific
//! body. Operations that can complete a waiter hand the resource or payload
//! straight to the woken thread, so a resumed waiter never has to race for it.

pub mod event;
pub mod mq;
pub mod mutex;
pub mod sem;

use log::debug;

use crate::error::{HostError, HostResult};
use crate::kernel::CriticalSection;
use crate::thread::{ThreadId, ThreadPriority};
use crate::trace::{TRACE_OBJECT_CREATE, TRACE_OBJECT_DELETE};
use crate::wait::WaitQueue;

pub use event::EventOption;
pub use mq::MqInfo;
pub use mutex::MutexInfo;

/// Identifier of a host IPC object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Semaphore,
    Mutex,
    MessageQueue,
    Event,
}

pub(crate) enum IpcBody {
    Semaphore(sem::SemCore),
    Mutex(mutex::MutexCore),
    MessageQueue(mq::MqCore),
    Event(event::EventCore),
}

impl IpcBody {
    fn class(&self) -> ObjectClass {
        match self {
            IpcBody::Semaphore(_) => ObjectClass::Semaphore,
            IpcBody::Mutex(_) => ObjectClass::Mutex,
            IpcBody::MessageQueue(_) => ObjectClass::MessageQueue,
            IpcBody::Event(_) => ObjectClass::Event,
        }
    }
}

pub(crate) struct IpcObject {
    pub(crate) name: String,
    pub(crate) queue: WaitQueue,
    pub(crate) body: IpcBody,
}

impl CriticalSection<'_> {
    pub(crate) fn create_object(&mut self, name: &str, body: IpcBody) -> ObjectId {
        let class = body.class();
        let st = self.state_mut();
        let id = ObjectId(st.next_object);
        st.next_object += 1;
        st.objects.insert(
            id,
            IpcObject {
                name: name.to_owned(),
                queue: WaitQueue::new(),
                body,
            },
        );
        debug!("created {:?} '{}' as {:?}", class, name, id);
        self.note(TRACE_OBJECT_CREATE, id.0.to_le_bytes().to_vec());
        id
    }

    pub(crate) fn object(&self, id: ObjectId) -> HostResult<&IpcObject> {
        self.objects().get(&id).ok_or(HostError::NoObject)
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> HostResult<&mut IpcObject> {
        self.state_mut()
            .objects
            .get_mut(&id)
            .ok_or(HostError::NoObject)
    }

    fn objects(&self) -> &std::collections::BTreeMap<ObjectId, IpcObject> {
        &self.state().objects
    }

    pub fn class_of(&self, id: ObjectId) -> HostResult<ObjectClass> {
        Ok(self.object(id)?.body.class())
    }

    pub fn object_name(&self, id: ObjectId) -> HostResult<&str> {
        Ok(self.object(id)?.name.as_str())
    }

    pub fn waiter_count(&self, id: ObjectId) -> HostResult<usize> {
        Ok(self.object(id)?.queue.len())
    }

    /// Waiters of `id` in service order.
    pub fn waiters(&self, id: ObjectId) -> HostResult<Vec<ThreadId>> {
        Ok(self.object(id)?.queue.snapshot())
    }

    pub fn waiter_priorities(&self, id: ObjectId) -> HostResult<Vec<ThreadPriority>> {
        Ok(self.object(id)?.queue.priorities())
    }

    /// Deletes an object of the given class. Remaining waiters are resumed
    /// with [`HostError::Interrupted`]; returns how many there were.
    pub fn delete_object(&mut self, id: ObjectId, class: ObjectClass) -> HostResult<usize> {
        if self.class_of(id)? != class {
            return Err(HostError::WrongClass);
        }
        let waiters = self.waiters(id)?;
        for &tid in &waiters {
            self.resume(tid, Err(HostError::Interrupted));
        }
        self.state_mut().objects.remove(&id);
        debug!("deleted {:?} {:?}, {} waiter(s) released", class, id, waiters.len());
        self.note(TRACE_OBJECT_DELETE, id.0.to_le_bytes().to_vec());
        Ok(waiters.len())
    }
}
