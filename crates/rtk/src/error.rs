//! Host kernel error codes.

use thiserror::Error;

/// Failure reported by a host kernel call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    #[error("wait timed out")]
    Timeout,
    /// The waiter was forcibly resumed, either by an abort or because the
    /// object it waited on was deleted.
    #[error("wait interrupted")]
    Interrupted,
    #[error("object is full")]
    Full,
    #[error("object is empty")]
    Empty,
    #[error("no such object")]
    NoObject,
    #[error("object class mismatch")]
    WrongClass,
    #[error("caller does not own the mutex")]
    NotOwner,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("blocking call from interrupt context")]
    InInterrupt,
    #[error("failed to spawn thread")]
    Spawn,
}

pub type HostResult<T> = Result<T, HostError>;
