//! Legacy error taxonomy.
//!
//! Every variant maps to the numeric code the legacy API reports through its
//! error output parameter; [`OS_ERR_NONE`] is reported on success.

use rtk::HostError;
use thiserror::Error;

pub const OS_ERR_NONE: u8 = 0;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OsError {
    #[error("handle does not refer to an object of the expected type")]
    EventType = 1,
    #[error("pend called from an interrupt handler")]
    PendIsr = 2,
    #[error("attempt to post a NULL message to a mailbox")]
    PostNullPtr = 3,
    #[error("event handle is NULL")]
    PeventNull = 4,
    #[error("post called from an interrupt handler")]
    PostIsr = 5,
    #[error("query called from an interrupt handler")]
    QueryIsr = 6,
    #[error("invalid option")]
    InvalidOpt = 7,
    #[error("data output is NULL")]
    PdataNull = 9,
    #[error("timed out")]
    Timeout = 10,
    #[error("name output is NULL")]
    PnameNull = 12,
    #[error("pend called with the scheduler locked")]
    PendLocked = 13,
    #[error("pend aborted")]
    PendAbort = 14,
    #[error("delete called from an interrupt handler")]
    DelIsr = 15,
    #[error("create called from an interrupt handler")]
    CreateIsr = 16,
    #[error("name get called from an interrupt handler")]
    NameGetIsr = 17,
    #[error("name set called from an interrupt handler")]
    NameSetIsr = 18,
    #[error("mailbox is full")]
    MboxFull = 20,
    #[error("queue is full")]
    QFull = 30,
    #[error("queue is empty")]
    QEmpty = 31,
    #[error("priority already in use")]
    PrioExist = 40,
    #[error("priority out of range")]
    PrioInvalid = 42,
    #[error("semaphore count overflow")]
    SemOvf = 51,
    #[error("task create called from an interrupt handler")]
    TaskCreateIsr = 60,
    #[error("tasks are waiting on the object")]
    TaskWaiting = 73,
    #[error("caller does not own the mutex")]
    NotMutexOwner = 100,
    #[error("flag group handle is NULL")]
    FlagInvalidPgrp = 110,
    #[error("invalid flag wait type")]
    FlagWaitType = 111,
    #[error("requested flags are not ready")]
    FlagNotRdy = 112,
    #[error("invalid flag post option")]
    FlagInvalidOpt = 113,
    #[error("no flag group left")]
    FlagGrpDepleted = 114,
    #[error("invalid timer delay")]
    TmrInvalidDly = 130,
    #[error("invalid timer period")]
    TmrInvalidPeriod = 131,
    #[error("invalid timer option")]
    TmrInvalidOpt = 132,
    #[error("no timer available")]
    TmrNonAvail = 134,
    #[error("timer is not active")]
    TmrInactive = 135,
    #[error("timer output is NULL")]
    TmrInvalidDest = 136,
    #[error("object is not a timer")]
    TmrInvalidType = 137,
    #[error("timer handle is NULL")]
    TmrInvalid = 138,
    #[error("timer call from an interrupt handler")]
    TmrIsr = 139,
    #[error("timer is in an invalid state")]
    TmrInvalidState = 141,
    #[error("timer is already stopped")]
    TmrStopped = 142,
    #[error("timer has no callback")]
    TmrNoCallback = 143,
}

pub type OsResult<T> = Result<T, OsError>;

const ALL: &[OsError] = &[
    OsError::EventType,
    OsError::PendIsr,
    OsError::PostNullPtr,
    OsError::PeventNull,
    OsError::PostIsr,
    OsError::QueryIsr,
    OsError::InvalidOpt,
    OsError::PdataNull,
    OsError::Timeout,
    OsError::PnameNull,
    OsError::PendLocked,
    OsError::PendAbort,
    OsError::DelIsr,
    OsError::CreateIsr,
    OsError::NameGetIsr,
    OsError::NameSetIsr,
    OsError::MboxFull,
    OsError::QFull,
    OsError::QEmpty,
    OsError::PrioExist,
    OsError::PrioInvalid,
    OsError::SemOvf,
    OsError::TaskCreateIsr,
    OsError::TaskWaiting,
    OsError::NotMutexOwner,
    OsError::FlagInvalidPgrp,
    OsError::FlagWaitType,
    OsError::FlagNotRdy,
    OsError::FlagInvalidOpt,
    OsError::FlagGrpDepleted,
    OsError::TmrInvalidDly,
    OsError::TmrInvalidPeriod,
    OsError::TmrInvalidOpt,
    OsError::TmrNonAvail,
    OsError::TmrInactive,
    OsError::TmrInvalidDest,
    OsError::TmrInvalidType,
    OsError::TmrInvalid,
    OsError::TmrIsr,
    OsError::TmrInvalidState,
    OsError::TmrStopped,
    OsError::TmrNoCallback,
];

impl OsError {
    /// Legacy numeric code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Error for a legacy code. `None` for [`OS_ERR_NONE`] and unknown codes.
    pub fn from_code(code: u8) -> Option<Self> {
        ALL.iter().copied().find(|err| err.code() == code)
    }

    /// Generic translation of a host failure on an object the caller named.
    pub(crate) fn from_host(err: HostError) -> Self {
        match err {
            HostError::Timeout => OsError::Timeout,
            HostError::Interrupted => OsError::PendAbort,
            HostError::Full => OsError::QFull,
            HostError::Empty => OsError::QEmpty,
            HostError::NoObject | HostError::WrongClass => OsError::EventType,
            HostError::NotOwner => OsError::NotMutexOwner,
            HostError::InInterrupt => OsError::PendIsr,
            HostError::InvalidArgument | HostError::Spawn => OsError::InvalidOpt,
        }
    }
}

impl From<HostError> for OsError {
    fn from(err: HostError) -> Self {
        OsError::from_host(err)
    }
}

/// Writes the outcome of `result` to a legacy error slot.
pub fn error_code<T>(result: &OsResult<T>) -> u8 {
    match result {
        Ok(_) => OS_ERR_NONE,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_bit_exact() {
        assert_eq!(OsError::Timeout.code(), 10);
        assert_eq!(OsError::PendAbort.code(), 14);
        assert_eq!(OsError::QFull.code(), 30);
        assert_eq!(OsError::TaskWaiting.code(), 73);
        assert_eq!(OsError::NotMutexOwner.code(), 100);
        assert_eq!(OsError::TmrNoCallback.code(), 143);
    }

    #[test]
    fn codes_round_trip_and_are_unique() {
        for pair in ALL.windows(2) {
            assert!(pair[0].code() < pair[1].code(), "{:?} out of order", pair[1]);
        }
        for &err in ALL {
            assert_eq!(OsError::from_code(err.code()), Some(err));
        }
        assert_eq!(OsError::from_code(OS_ERR_NONE), None);
        assert_eq!(OsError::from_code(8), None);
        assert_eq!(OsError::from_code(u8::MAX), None);
    }

    #[test]
    fn host_errors_translate() {
        assert_eq!(OsError::from(HostError::WrongClass), OsError::EventType);
        assert_eq!(OsError::from(HostError::NotOwner), OsError::NotMutexOwner);
        assert_eq!(error_code::<()>(&Ok(())), OS_ERR_NONE);
        assert_eq!(error_code::<()>(&Err(OsError::SemOvf)), 51);
    }
}
