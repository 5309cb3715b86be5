//! Mailboxes (`OSMbox*`): single-slot queues.
//!
//! A mailbox is a host queue of capacity one. Unlike a queue, a NULL message
//! cannot be posted, so an empty mailbox reads back as [`Msg::NULL`].

use log::trace;

use crate::error::{OsError, OsResult};
use crate::event::{EventKind, EventType, OsEvent};
use crate::os::Os;
use crate::queue::{full_as, Msg};

/// Snapshot returned by [`Os::mbox_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MboxData {
    /// Message in the mailbox, NULL when empty.
    pub msg: Msg,
    pub waiting: Vec<u8>,
}

impl Os {
    /// Creates a mailbox, holding `msg` unless it is NULL.
    pub fn mbox_create(&self, msg: Msg) -> OsResult<OsEvent> {
        if rtk::in_interrupt() {
            return Err(OsError::CreateIsr);
        }
        let host = self.kernel().mq_create("mbox", 1)?;
        if !msg.is_null() {
            self.kernel().mq_send(host, msg.0)?;
        }
        Ok(OsEvent::new(EventKind::Mailbox, host))
    }

    /// Takes the message without blocking, NULL when the mailbox is empty.
    pub fn mbox_accept(&self, ev: &OsEvent) -> OsResult<Msg> {
        let host = ev.host_for(EventType::Mbox)?;
        let msg = self.kernel().critical().mq_try_recv(host)?;
        Ok(msg.map(Msg).unwrap_or(Msg::NULL))
    }

    /// Waits up to `timeout` ticks for a message; zero waits forever.
    pub fn mbox_pend(&self, ev: &OsEvent, timeout: u32) -> OsResult<Msg> {
        let host = ev.host_for(EventType::Mbox)?;
        trace!("mbox pend on {:?}, timeout {}", host, timeout);
        self.pend_on(host, timeout, |t| self.kernel().mq_recv(host, t))
            .map(Msg)
    }

    pub fn mbox_post(&self, ev: &OsEvent, msg: Msg) -> OsResult<()> {
        let host = ev.host_for(EventType::Mbox)?;
        if msg.is_null() {
            return Err(OsError::PostNullPtr);
        }
        self.kernel()
            .mq_send(host, msg.0)
            .map_err(full_as(OsError::MboxFull))
    }

    /// Posts with [`crate::queue::PostOpt`] bits; a broadcast reaches every
    /// task pending at the time of the call.
    pub fn mbox_post_opt(&self, ev: &OsEvent, msg: Msg, opt: u8) -> OsResult<()> {
        let host = ev.host_for(EventType::Mbox)?;
        if msg.is_null() {
            return Err(OsError::PostNullPtr);
        }
        self.post_with_opt(host, msg, opt, OsError::MboxFull)
    }

    pub fn mbox_pend_abort(&self, ev: &OsEvent, opt: u8) -> OsResult<u8> {
        self.pend_abort(ev, EventType::Mbox, opt)
    }

    pub fn mbox_del(&self, ev: &OsEvent, opt: u8) -> OsResult<()> {
        self.delete_event(ev, EventType::Mbox, opt)
    }

    pub fn mbox_query(&self, ev: &OsEvent) -> OsResult<MboxData> {
        let host = ev.host_for(EventType::Mbox)?;
        let data = self.query_mq(host)?;
        Ok(MboxData {
            msg: data.msg,
            waiting: data.waiting,
        })
    }
}
