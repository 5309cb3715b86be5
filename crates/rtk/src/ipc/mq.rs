//! Bounded message queue of pointer-sized envelopes.

use std::collections::VecDeque;

use log::debug;

use super::{IpcBody, ObjectClass, ObjectId};
use crate::error::{HostError, HostResult};
use crate::kernel::{CriticalSection, Kernel, Timeout};
use crate::thread::Payload;

pub(crate) struct MqCore {
    capacity: usize,
    messages: VecDeque<usize>,
}

/// Snapshot of a message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqInfo {
    pub entries: usize,
    pub capacity: usize,
    /// Envelope that the next receive would return.
    pub head: Option<usize>,
    pub waiters: usize,
}

impl Kernel {
    pub fn mq_create(&self, name: &str, capacity: usize) -> HostResult<ObjectId> {
        if capacity == 0 {
            return Err(HostError::InvalidArgument);
        }
        Ok(self.critical().create_object(
            name,
            IpcBody::MessageQueue(MqCore {
                capacity,
                messages: VecDeque::with_capacity(capacity),
            }),
        ))
    }

    pub fn mq_send(&self, id: ObjectId, msg: usize) -> HostResult<()> {
        self.critical().mq_send(id, msg)
    }

    pub fn mq_urgent(&self, id: ObjectId, msg: usize) -> HostResult<()> {
        self.critical().mq_urgent(id, msg)
    }

    pub fn mq_send_all(&self, id: ObjectId, msg: usize) -> HostResult<usize> {
        self.critical().mq_send_all(id, msg)
    }

    /// Receives the oldest envelope, suspending up to `timeout` while empty.
    pub fn mq_recv(&self, id: ObjectId, timeout: Timeout) -> HostResult<usize> {
        let mut cs = self.critical();
        if let Some(msg) = cs.mq_try_recv(id)? {
            return Ok(msg);
        }
        cs.suspend(Some(id), timeout)?;
        match cs.take_payload() {
            Payload::Message(msg) => Ok(msg),
            _ => Err(HostError::Empty),
        }
    }

    pub fn mq_flush(&self, id: ObjectId) -> HostResult<usize> {
        self.critical().mq_flush(id)
    }

    pub fn mq_info(&self, id: ObjectId) -> HostResult<MqInfo> {
        self.critical().mq_info(id)
    }

    pub fn mq_delete(&self, id: ObjectId) -> HostResult<usize> {
        self.critical().delete_object(id, ObjectClass::MessageQueue)
    }
}

impl CriticalSection<'_> {
    fn mq_core(&mut self, id: ObjectId) -> HostResult<&mut MqCore> {
        match &mut self.object_mut(id)?.body {
            IpcBody::MessageQueue(mq) => Ok(mq),
            _ => Err(HostError::WrongClass),
        }
    }

    fn mq_deliver(&mut self, id: ObjectId, msg: usize, urgent: bool) -> HostResult<()> {
        self.mq_core(id)?;
        if let Some(waiter) = self.object(id)?.queue.head() {
            self.hand_off(waiter, Payload::Message(msg));
            return Ok(());
        }
        let mq = self.mq_core(id)?;
        if mq.messages.len() >= mq.capacity {
            return Err(HostError::Full);
        }
        if urgent {
            mq.messages.push_front(msg);
        } else {
            mq.messages.push_back(msg);
        }
        Ok(())
    }

    /// Appends `msg`, or hands it to the head waiter.
    pub fn mq_send(&mut self, id: ObjectId, msg: usize) -> HostResult<()> {
        self.mq_deliver(id, msg, false)
    }

    /// Inserts `msg` at the front, or hands it to the head waiter.
    pub fn mq_urgent(&mut self, id: ObjectId, msg: usize) -> HostResult<()> {
        self.mq_deliver(id, msg, true)
    }

    /// Hands one copy of `msg` to every thread currently waiting and resumes
    /// them all. Returns the number of copies delivered; zero when nobody was
    /// waiting, in which case nothing is queued.
    pub fn mq_send_all(&mut self, id: ObjectId, msg: usize) -> HostResult<usize> {
        self.mq_core(id)?;
        let waiters = self.waiters(id)?;
        for &waiter in &waiters {
            self.hand_off(waiter, Payload::Message(msg));
        }
        if !waiters.is_empty() {
            debug!("broadcast {:#x} to {} waiter(s) on {:?}", msg, waiters.len(), id);
        }
        Ok(waiters.len())
    }

    pub fn mq_try_recv(&mut self, id: ObjectId) -> HostResult<Option<usize>> {
        Ok(self.mq_core(id)?.messages.pop_front())
    }

    /// Discards every queued envelope, returning how many there were.
    pub fn mq_flush(&mut self, id: ObjectId) -> HostResult<usize> {
        let mq = self.mq_core(id)?;
        let dropped = mq.messages.len();
        mq.messages.clear();
        Ok(dropped)
    }

    pub fn mq_info(&mut self, id: ObjectId) -> HostResult<MqInfo> {
        let waiters = self.waiter_count(id)?;
        let mq = self.mq_core(id)?;
        Ok(MqInfo {
            entries: mq.messages.len(),
            capacity: mq.capacity,
            head: mq.messages.front().copied(),
            waiters,
        })
    }
}
