//! Trace hook plumbing for kernel records.

use thiserror::Error;

use crate::sync::Arc;

/// Record: IPC object created.
pub const TRACE_OBJECT_CREATE: u8 = 1;
/// Record: IPC object deleted.
pub const TRACE_OBJECT_DELETE: u8 = 2;
/// Record: suspended thread released because its timeout elapsed.
pub const TRACE_THREAD_TIMEOUT: u8 = 3;
/// Record: host timer expired.
pub const TRACE_TIMER_EXPIRE: u8 = 4;
/// Record: scheduler lock nesting changed.
pub const TRACE_SCHED_LOCK: u8 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace backend rejected record {0}")]
    Rejected(u8),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type TraceResult = Result<(), TraceError>;

/// Callback receiving `(record_id, payload, with_timestamp)`.
pub type TraceHook = Arc<dyn Fn(u8, &[u8], bool) -> TraceResult + Send + Sync>;
