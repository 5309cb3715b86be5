//! Message queues (`OSQ*`).
//!
//! Messages are opaque pointer-sized values copied in and out of the host
//! queue; they are never dereferenced. A NULL message is a valid payload, so
//! "no message" is reported through [`OsError::QEmpty`] rather than through
//! the message value.

use bitflags::bitflags;
use log::{debug, trace};
use rtk::HostError;

use crate::error::{OsError, OsResult};
use crate::event::{EventKind, EventType, OsEvent};
use crate::os::Os;

/// Opaque message pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Msg(pub usize);

impl Msg {
    pub const NULL: Msg = Msg(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for Msg {
    fn from(value: usize) -> Self {
        Msg(value)
    }
}

bitflags! {
    /// Options for [`Os::q_post_opt`] and [`Os::mbox_post_opt`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PostOpt: u8 {
        /// Deliver to every pending task.
        const BROADCAST = 0x01;
        /// Insert at the front (LIFO).
        const FRONT = 0x02;
        /// Accepted for compatibility; the host decides when to reschedule.
        const NO_SCHED = 0x04;
    }
}

pub const OS_POST_OPT_NONE: u8 = 0x00;
pub const OS_POST_OPT_BROADCAST: u8 = PostOpt::BROADCAST.bits();
pub const OS_POST_OPT_FRONT: u8 = PostOpt::FRONT.bits();
pub const OS_POST_OPT_NO_SCHED: u8 = PostOpt::NO_SCHED.bits();

/// Snapshot returned by [`Os::q_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QData {
    /// Next message a pend would return, NULL when empty.
    pub msg: Msg,
    pub entries: u16,
    pub size: u16,
    /// Priorities of the pending tasks, most urgent first.
    pub waiting: Vec<u8>,
}

impl Os {
    /// Creates a queue holding up to `size` messages.
    pub fn q_create(&self, size: u16) -> OsResult<OsEvent> {
        if rtk::in_interrupt() {
            return Err(OsError::CreateIsr);
        }
        if size == 0 {
            return Err(OsError::InvalidOpt);
        }
        let host = self.kernel().mq_create("queue", usize::from(size))?;
        Ok(OsEvent::new(EventKind::Queue, host))
    }

    /// Removes the oldest message without blocking.
    pub fn q_accept(&self, ev: &OsEvent) -> OsResult<Msg> {
        let host = ev.host_for(EventType::Q)?;
        self.kernel()
            .critical()
            .mq_try_recv(host)?
            .map(Msg)
            .ok_or(OsError::QEmpty)
    }

    /// Waits up to `timeout` ticks for a message; zero waits forever.
    pub fn q_pend(&self, ev: &OsEvent, timeout: u32) -> OsResult<Msg> {
        let host = ev.host_for(EventType::Q)?;
        trace!("queue pend on {:?}, timeout {}", host, timeout);
        self.pend_on(host, timeout, |t| self.kernel().mq_recv(host, t))
            .map(Msg)
    }

    /// Appends `msg` (FIFO).
    pub fn q_post(&self, ev: &OsEvent, msg: Msg) -> OsResult<()> {
        let host = ev.host_for(EventType::Q)?;
        self.kernel().mq_send(host, msg.0).map_err(full_as(OsError::QFull))
    }

    /// Inserts `msg` at the front (LIFO).
    pub fn q_post_front(&self, ev: &OsEvent, msg: Msg) -> OsResult<()> {
        let host = ev.host_for(EventType::Q)?;
        self.kernel().mq_urgent(host, msg.0).map_err(full_as(OsError::QFull))
    }

    /// Posts with [`PostOpt`] bits.
    pub fn q_post_opt(&self, ev: &OsEvent, msg: Msg, opt: u8) -> OsResult<()> {
        let host = ev.host_for(EventType::Q)?;
        self.post_with_opt(host, msg, opt, OsError::QFull)
    }

    /// Discards every queued message.
    pub fn q_flush(&self, ev: &OsEvent) -> OsResult<()> {
        let host = ev.host_for(EventType::Q)?;
        let dropped = self.kernel().mq_flush(host)?;
        debug!("flushed {} message(s) from {:?}", dropped, host);
        Ok(())
    }

    pub fn q_pend_abort(&self, ev: &OsEvent, opt: u8) -> OsResult<u8> {
        self.pend_abort(ev, EventType::Q, opt)
    }

    pub fn q_del(&self, ev: &OsEvent, opt: u8) -> OsResult<()> {
        self.delete_event(ev, EventType::Q, opt)
    }

    pub fn q_query(&self, ev: &OsEvent) -> OsResult<QData> {
        let host = ev.host_for(EventType::Q)?;
        self.query_mq(host)
    }
}

impl Os {
    /// Posting with options, shared by queues and mailboxes.
    ///
    /// A broadcast snapshots the pending tasks and hands each its own copy of
    /// `msg` within one critical section; tasks that start pending afterwards
    /// are not included. With nobody pending the message is queued once.
    pub(crate) fn post_with_opt(
        &self,
        host: rtk::ObjectId,
        msg: Msg,
        opt: u8,
        full: OsError,
    ) -> OsResult<()> {
        let opt = PostOpt::from_bits(opt).ok_or(OsError::InvalidOpt)?;
        let mut cs = self.kernel().critical();
        if opt.contains(PostOpt::BROADCAST) && cs.waiter_count(host)? > 0 {
            let copies = cs.mq_send_all(host, msg.0)?;
            trace!("broadcast {:?} to {} task(s)", msg, copies);
            return Ok(());
        }
        let result = if opt.contains(PostOpt::FRONT) {
            cs.mq_urgent(host, msg.0)
        } else {
            cs.mq_send(host, msg.0)
        };
        result.map_err(full_as(full))
    }

    pub(crate) fn query_mq(&self, host: rtk::ObjectId) -> OsResult<QData> {
        let mut cs = self.kernel().critical();
        let info = cs.mq_info(host)?;
        Ok(QData {
            msg: info.head.map(Msg).unwrap_or(Msg::NULL),
            entries: u16::try_from(info.entries).unwrap_or(u16::MAX),
            size: u16::try_from(info.capacity).unwrap_or(u16::MAX),
            waiting: cs.waiter_priorities(host)?.into_iter().map(|p| p.0).collect(),
        })
    }
}

/// Maps a host capacity failure to `full`, everything else generically.
pub(crate) fn full_as(full: OsError) -> impl Fn(HostError) -> OsError {
    move |err| match err {
        HostError::Full => full,
        other => OsError::from(other),
    }
}
