//! 32-bit event set.

use bitflags::bitflags;

use super::{IpcBody, ObjectClass, ObjectId};
use crate::error::{HostError, HostResult};
use crate::kernel::{CriticalSection, Kernel, Timeout};
use crate::thread::{EventRequest, Payload};

bitflags! {
    /// Receive condition for [`Kernel::event_recv`].
    ///
    /// Exactly one of `AND` and `OR` must be given. `ON_CLEAR` matches bits
    /// that are clear instead of set; `CLEAR` consumes the matched bits, which
    /// for an `ON_CLEAR` wait means setting them again.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventOption: u8 {
        const AND = 0x01;
        const OR = 0x02;
        const CLEAR = 0x04;
        const ON_CLEAR = 0x08;
    }
}

impl EventOption {
    fn validate(self, bits: u32) -> HostResult<()> {
        let and = self.contains(EventOption::AND);
        let or = self.contains(EventOption::OR);
        if bits == 0 || and == or {
            return Err(HostError::InvalidArgument);
        }
        Ok(())
    }

    /// Bits of `bits` that satisfy the condition against `set`, if the
    /// condition holds.
    fn evaluate(self, set: u32, bits: u32) -> Option<u32> {
        let matched = if self.contains(EventOption::ON_CLEAR) {
            !set & bits
        } else {
            set & bits
        };
        let satisfied = if self.contains(EventOption::AND) {
            matched == bits
        } else {
            matched != 0
        };
        satisfied.then_some(matched)
    }

    fn consume(self, set: &mut u32, matched: u32) {
        if !self.contains(EventOption::CLEAR) {
            return;
        }
        if self.contains(EventOption::ON_CLEAR) {
            *set |= matched;
        } else {
            *set &= !matched;
        }
    }
}

pub(crate) struct EventCore {
    set: u32,
}

impl Kernel {
    pub fn event_create(&self, name: &str, initial: u32) -> HostResult<ObjectId> {
        Ok(self
            .critical()
            .create_object(name, IpcBody::Event(EventCore { set: initial })))
    }

    pub fn event_send(&self, id: ObjectId, bits: u32) -> HostResult<u32> {
        self.critical().event_send(id, bits)
    }

    pub fn event_clear(&self, id: ObjectId, bits: u32) -> HostResult<u32> {
        self.critical().event_clear(id, bits)
    }

    /// Waits until `bits` satisfy `option`. Returns the bits that matched.
    pub fn event_recv(
        &self,
        id: ObjectId,
        bits: u32,
        option: EventOption,
        timeout: Timeout,
    ) -> HostResult<u32> {
        let mut cs = self.critical();
        if let Some(matched) = cs.event_try_recv(id, bits, option)? {
            return Ok(matched);
        }
        cs.current_record().request = Some(EventRequest { bits, option });
        let outcome = cs.suspend(Some(id), timeout);
        cs.current_record().request = None;
        outcome?;
        match cs.take_payload() {
            Payload::Events(matched) => Ok(matched),
            _ => Err(HostError::Empty),
        }
    }

    pub fn event_value(&self, id: ObjectId) -> HostResult<u32> {
        self.critical().event_value(id)
    }

    pub fn event_delete(&self, id: ObjectId) -> HostResult<usize> {
        self.critical().delete_object(id, ObjectClass::Event)
    }
}

impl CriticalSection<'_> {
    fn event_core(&mut self, id: ObjectId) -> HostResult<&mut EventCore> {
        match &mut self.object_mut(id)?.body {
            IpcBody::Event(event) => Ok(event),
            _ => Err(HostError::WrongClass),
        }
    }

    /// Sets `bits` and releases every waiter the new value satisfies.
    /// Returns the value after all consumption.
    pub fn event_send(&mut self, id: ObjectId, bits: u32) -> HostResult<u32> {
        self.event_core(id)?.set |= bits;
        self.event_rescan(id)
    }

    /// Clears `bits` and releases every waiter the new value satisfies.
    pub fn event_clear(&mut self, id: ObjectId, bits: u32) -> HostResult<u32> {
        self.event_core(id)?.set &= !bits;
        self.event_rescan(id)
    }

    /// Checks the condition once without blocking. On a match the bits are
    /// consumed as requested and recorded as the caller's ready flags.
    pub fn event_try_recv(
        &mut self,
        id: ObjectId,
        bits: u32,
        option: EventOption,
    ) -> HostResult<Option<u32>> {
        option.validate(bits)?;
        let event = self.event_core(id)?;
        let Some(matched) = option.evaluate(event.set, bits) else {
            return Ok(None);
        };
        option.consume(&mut event.set, matched);
        self.current_record().flags_rdy = matched;
        Ok(Some(matched))
    }

    pub fn event_value(&mut self, id: ObjectId) -> HostResult<u32> {
        Ok(self.event_core(id)?.set)
    }

    /// Walks the waiters in service order. Consumption by one waiter is
    /// applied before the next one is evaluated.
    fn event_rescan(&mut self, id: ObjectId) -> HostResult<u32> {
        let st = self.state_mut();
        let obj = st.objects.get_mut(&id).ok_or(HostError::NoObject)?;
        let IpcBody::Event(event) = &mut obj.body else {
            return Err(HostError::WrongClass);
        };
        let mut released = Vec::new();
        for tid in obj.queue.snapshot() {
            let Some(request) = st.threads.get(&tid).and_then(|r| r.request) else {
                continue;
            };
            if let Some(matched) = request.option.evaluate(event.set, request.bits) {
                request.option.consume(&mut event.set, matched);
                released.push((tid, matched));
            }
        }
        let value = event.set;
        for (tid, matched) in released {
            self.hand_off(tid, Payload::Events(matched));
        }
        Ok(value)
    }
}
