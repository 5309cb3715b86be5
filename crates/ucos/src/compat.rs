//! Legacy call shapes.
//!
//! Each function mirrors one `OS*` call: handles are `Option`s where `None`
//! stands for a NULL pointer, errors go to a `&mut u8` slot (or the return
//! value for calls that return a code), and the primary return carries the
//! value, falling back to `0`, NULL, `false` or `None` on failure.
//!
//! With [`OsConfig::arg_check`] off, NULL handles are still refused but
//! reported as a type error instead of the dedicated NULL code.
//!
//! [`OsConfig::arg_check`]: crate::config::OsConfig::arg_check

use crate::error::{error_code, OsError, OsResult, OS_ERR_NONE};
use crate::event::OsEvent;
use crate::flag::{FlagGroup, OsFlags};
use crate::mbox::MboxData;
use crate::mutex::MutexData;
use crate::os::Os;
use crate::queue::{Msg, QData};
use crate::sem::SemData;
use crate::tmr::{OsTmr, TmrCallback, TmrState};

fn report<T>(result: OsResult<T>, perr: &mut u8) -> Option<T> {
    *perr = error_code(&result);
    result.ok()
}

fn code<T>(result: OsResult<T>) -> u8 {
    error_code(&result)
}

fn null(os: &Os, err: OsError) -> OsError {
    if os.config().arg_check {
        err
    } else {
        OsError::EventType
    }
}

fn event<'a>(os: &Os, pevent: Option<&'a OsEvent>) -> OsResult<&'a OsEvent> {
    pevent.ok_or_else(|| null(os, OsError::PeventNull))
}

fn group<'a>(os: &Os, pgrp: Option<&'a FlagGroup>) -> OsResult<&'a FlagGroup> {
    pgrp.ok_or_else(|| null(os, OsError::FlagInvalidPgrp))
}

fn timer<'a>(os: &Os, ptmr: Option<&'a OsTmr>) -> OsResult<&'a OsTmr> {
    ptmr.ok_or_else(|| null(os, OsError::TmrInvalid))
}

fn fill<T>(os: &Os, out: Option<&mut T>, value: OsResult<T>) -> u8 {
    let Some(out) = out else {
        return null(os, OsError::PdataNull).code();
    };
    match value {
        Ok(value) => {
            *out = value;
            OS_ERR_NONE
        }
        Err(err) => err.code(),
    }
}

/// `*Del` returns NULL on success and the handle back on failure.
fn deleted<T: Clone>(handle: Option<&T>, result: OsResult<()>, perr: &mut u8) -> Option<T> {
    match report(result, perr) {
        Some(()) => None,
        None => handle.cloned(),
    }
}

// Events

pub fn os_event_name_set(os: &Os, pevent: Option<&OsEvent>, name: Option<&str>, perr: &mut u8) {
    let result = event(os, pevent).and_then(|ev| {
        let name = name.ok_or(OsError::PnameNull)?;
        os.event_name_set(ev, name)
    });
    *perr = error_code(&result);
}

pub fn os_event_name_get(os: &Os, pevent: Option<&OsEvent>, perr: &mut u8) -> Option<String> {
    report(event(os, pevent).and_then(|ev| os.event_name_get(ev)), perr)
}

// Semaphores

pub fn os_sem_create(os: &Os, cnt: u16) -> Option<OsEvent> {
    os.sem_create(cnt).ok()
}

pub fn os_sem_accept(os: &Os, pevent: Option<&OsEvent>) -> u16 {
    event(os, pevent)
        .and_then(|ev| os.sem_accept(ev))
        .unwrap_or(0)
}

pub fn os_sem_pend(os: &Os, pevent: Option<&OsEvent>, timeout: u32, perr: &mut u8) {
    *perr = code(event(os, pevent).and_then(|ev| os.sem_pend(ev, timeout)));
}

pub fn os_sem_post(os: &Os, pevent: Option<&OsEvent>) -> u8 {
    code(event(os, pevent).and_then(|ev| os.sem_post(ev)))
}

pub fn os_sem_pend_abort(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> u8 {
    report(event(os, pevent).and_then(|ev| os.sem_pend_abort(ev, opt)), perr).unwrap_or(0)
}

pub fn os_sem_del(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> Option<OsEvent> {
    deleted(pevent, event(os, pevent).and_then(|ev| os.sem_del(ev, opt)), perr)
}

pub fn os_sem_set(os: &Os, pevent: Option<&OsEvent>, cnt: u16, perr: &mut u8) {
    *perr = code(event(os, pevent).and_then(|ev| os.sem_set(ev, cnt)));
}

pub fn os_sem_query(os: &Os, pevent: Option<&OsEvent>, p_sem_data: Option<&mut SemData>) -> u8 {
    match event(os, pevent) {
        Ok(ev) => fill(os, p_sem_data, os.sem_query(ev)),
        Err(err) => err.code(),
    }
}

// Mutexes

pub fn os_mutex_create(os: &Os, prio: u8, perr: &mut u8) -> Option<OsEvent> {
    report(os.mutex_create(prio), perr)
}

pub fn os_mutex_accept(os: &Os, pevent: Option<&OsEvent>, perr: &mut u8) -> bool {
    report(event(os, pevent).and_then(|ev| os.mutex_accept(ev)), perr).unwrap_or(false)
}

pub fn os_mutex_pend(os: &Os, pevent: Option<&OsEvent>, timeout: u32, perr: &mut u8) {
    *perr = code(event(os, pevent).and_then(|ev| os.mutex_pend(ev, timeout)));
}

pub fn os_mutex_post(os: &Os, pevent: Option<&OsEvent>) -> u8 {
    code(event(os, pevent).and_then(|ev| os.mutex_post(ev)))
}

pub fn os_mutex_del(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> Option<OsEvent> {
    deleted(pevent, event(os, pevent).and_then(|ev| os.mutex_del(ev, opt)), perr)
}

pub fn os_mutex_query(os: &Os, pevent: Option<&OsEvent>, p_mutex_data: Option<&mut MutexData>) -> u8 {
    match event(os, pevent) {
        Ok(ev) => fill(os, p_mutex_data, os.mutex_query(ev)),
        Err(err) => err.code(),
    }
}

// Queues

pub fn os_q_create(os: &Os, size: u16) -> Option<OsEvent> {
    os.q_create(size).ok()
}

pub fn os_q_accept(os: &Os, pevent: Option<&OsEvent>, perr: &mut u8) -> Msg {
    report(event(os, pevent).and_then(|ev| os.q_accept(ev)), perr).unwrap_or(Msg::NULL)
}

pub fn os_q_pend(os: &Os, pevent: Option<&OsEvent>, timeout: u32, perr: &mut u8) -> Msg {
    report(event(os, pevent).and_then(|ev| os.q_pend(ev, timeout)), perr).unwrap_or(Msg::NULL)
}

pub fn os_q_post(os: &Os, pevent: Option<&OsEvent>, msg: Msg) -> u8 {
    code(event(os, pevent).and_then(|ev| os.q_post(ev, msg)))
}

pub fn os_q_post_front(os: &Os, pevent: Option<&OsEvent>, msg: Msg) -> u8 {
    code(event(os, pevent).and_then(|ev| os.q_post_front(ev, msg)))
}

pub fn os_q_post_opt(os: &Os, pevent: Option<&OsEvent>, msg: Msg, opt: u8) -> u8 {
    code(event(os, pevent).and_then(|ev| os.q_post_opt(ev, msg, opt)))
}

pub fn os_q_flush(os: &Os, pevent: Option<&OsEvent>) -> u8 {
    code(event(os, pevent).and_then(|ev| os.q_flush(ev)))
}

pub fn os_q_pend_abort(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> u8 {
    report(event(os, pevent).and_then(|ev| os.q_pend_abort(ev, opt)), perr).unwrap_or(0)
}

pub fn os_q_del(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> Option<OsEvent> {
    deleted(pevent, event(os, pevent).and_then(|ev| os.q_del(ev, opt)), perr)
}

pub fn os_q_query(os: &Os, pevent: Option<&OsEvent>, p_q_data: Option<&mut QData>) -> u8 {
    match event(os, pevent) {
        Ok(ev) => fill(os, p_q_data, os.q_query(ev)),
        Err(err) => err.code(),
    }
}

// Mailboxes

pub fn os_mbox_create(os: &Os, pmsg: Msg) -> Option<OsEvent> {
    os.mbox_create(pmsg).ok()
}

pub fn os_mbox_accept(os: &Os, pevent: Option<&OsEvent>) -> Msg {
    event(os, pevent)
        .and_then(|ev| os.mbox_accept(ev))
        .unwrap_or(Msg::NULL)
}

pub fn os_mbox_pend(os: &Os, pevent: Option<&OsEvent>, timeout: u32, perr: &mut u8) -> Msg {
    report(event(os, pevent).and_then(|ev| os.mbox_pend(ev, timeout)), perr).unwrap_or(Msg::NULL)
}

pub fn os_mbox_post(os: &Os, pevent: Option<&OsEvent>, pmsg: Msg) -> u8 {
    code(event(os, pevent).and_then(|ev| os.mbox_post(ev, pmsg)))
}

pub fn os_mbox_post_opt(os: &Os, pevent: Option<&OsEvent>, pmsg: Msg, opt: u8) -> u8 {
    code(event(os, pevent).and_then(|ev| os.mbox_post_opt(ev, pmsg, opt)))
}

pub fn os_mbox_pend_abort(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> u8 {
    report(event(os, pevent).and_then(|ev| os.mbox_pend_abort(ev, opt)), perr).unwrap_or(0)
}

pub fn os_mbox_del(os: &Os, pevent: Option<&OsEvent>, opt: u8, perr: &mut u8) -> Option<OsEvent> {
    deleted(pevent, event(os, pevent).and_then(|ev| os.mbox_del(ev, opt)), perr)
}

pub fn os_mbox_query(os: &Os, pevent: Option<&OsEvent>, p_mbox_data: Option<&mut MboxData>) -> u8 {
    match event(os, pevent) {
        Ok(ev) => fill(os, p_mbox_data, os.mbox_query(ev)),
        Err(err) => err.code(),
    }
}

// Event flags

pub fn os_flag_create(os: &Os, flags: OsFlags, perr: &mut u8) -> Option<FlagGroup> {
    report(os.flag_create(flags), perr)
}

pub fn os_flag_accept(os: &Os, pgrp: Option<&FlagGroup>, flags: OsFlags, wait_type: u8, perr: &mut u8) -> OsFlags {
    report(group(os, pgrp).and_then(|g| os.flag_accept(g, flags, wait_type)), perr).unwrap_or(0)
}

pub fn os_flag_pend(
    os: &Os,
    pgrp: Option<&FlagGroup>,
    flags: OsFlags,
    wait_type: u8,
    timeout: u32,
    perr: &mut u8,
) -> OsFlags {
    report(
        group(os, pgrp).and_then(|g| os.flag_pend(g, flags, wait_type, timeout)),
        perr,
    )
    .unwrap_or(0)
}

pub fn os_flag_pend_get_flags_rdy(os: &Os) -> OsFlags {
    os.flag_pend_get_flags_rdy()
}

pub fn os_flag_post(os: &Os, pgrp: Option<&FlagGroup>, flags: OsFlags, opt: u8, perr: &mut u8) -> OsFlags {
    report(group(os, pgrp).and_then(|g| os.flag_post(g, flags, opt)), perr).unwrap_or(0)
}

pub fn os_flag_del(os: &Os, pgrp: Option<&FlagGroup>, opt: u8, perr: &mut u8) -> Option<FlagGroup> {
    deleted(pgrp, group(os, pgrp).and_then(|g| os.flag_del(g, opt)), perr)
}

pub fn os_flag_query(os: &Os, pgrp: Option<&FlagGroup>, perr: &mut u8) -> OsFlags {
    report(group(os, pgrp).and_then(|g| os.flag_query(g)), perr).unwrap_or(0)
}

pub fn os_flag_name_set(os: &Os, pgrp: Option<&FlagGroup>, name: Option<&str>, perr: &mut u8) {
    let result = group(os, pgrp).and_then(|g| {
        let name = name.ok_or(OsError::PnameNull)?;
        os.flag_name_set(g, name)
    });
    *perr = error_code(&result);
}

pub fn os_flag_name_get(os: &Os, pgrp: Option<&FlagGroup>, perr: &mut u8) -> Option<String> {
    report(group(os, pgrp).and_then(|g| os.flag_name_get(g)), perr)
}

// Timers

#[allow(clippy::too_many_arguments)]
pub fn os_tmr_create(
    os: &Os,
    dly: u32,
    period: u32,
    opt: u8,
    callback: Option<TmrCallback>,
    callback_arg: usize,
    name: &str,
    perr: &mut u8,
) -> Option<OsTmr> {
    report(os.tmr_create(dly, period, opt, callback, callback_arg, name), perr)
}

pub fn os_tmr_start(os: &Os, ptmr: Option<&OsTmr>, perr: &mut u8) -> bool {
    report(timer(os, ptmr).and_then(|t| os.tmr_start(t)), perr).is_some()
}

/// Returns `true` whenever the timer ends up stopped, including the
/// already-stopped and missing-callback cases, which still report an error.
pub fn os_tmr_stop(os: &Os, ptmr: Option<&OsTmr>, opt: u8, callback_arg: usize, perr: &mut u8) -> bool {
    let result = timer(os, ptmr).and_then(|t| os.tmr_stop(t, opt, callback_arg));
    *perr = error_code(&result);
    matches!(
        result,
        Ok(()) | Err(OsError::TmrStopped) | Err(OsError::TmrNoCallback)
    )
}

pub fn os_tmr_del(os: &Os, ptmr: Option<&OsTmr>, perr: &mut u8) -> bool {
    report(timer(os, ptmr).and_then(|t| os.tmr_del(t)), perr).is_some()
}

pub fn os_tmr_remain_get(os: &Os, ptmr: Option<&OsTmr>, perr: &mut u8) -> u32 {
    report(timer(os, ptmr).and_then(|t| os.tmr_remain_get(t)), perr).unwrap_or(0)
}

pub fn os_tmr_state_get(os: &Os, ptmr: Option<&OsTmr>, perr: &mut u8) -> u8 {
    report(timer(os, ptmr).and_then(|t| os.tmr_state_get(t)), perr).unwrap_or(TmrState::Unused) as u8
}

pub fn os_tmr_name_get(os: &Os, ptmr: Option<&OsTmr>, perr: &mut u8) -> Option<String> {
    report(timer(os, ptmr).and_then(|t| os.tmr_name_get(t)), perr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OsConfig;

    #[test]
    fn null_handles_report_their_codes() {
        let os = Os::new(OsConfig::default());
        let mut err = OS_ERR_NONE;
        os_sem_pend(&os, None, 1, &mut err);
        assert_eq!(err, OsError::PeventNull.code());
        assert_eq!(os_flag_query(&os, None, &mut err), 0);
        assert_eq!(err, OsError::FlagInvalidPgrp.code());
        assert!(!os_tmr_start(&os, None, &mut err));
        assert_eq!(err, OsError::TmrInvalid.code());
    }

    #[test]
    fn arg_check_off_still_refuses_null() {
        let os = Os::new(OsConfig::builder().arg_check(false).build());
        assert_eq!(os_sem_post(&os, None), OsError::EventType.code());
    }

    #[test]
    fn query_needs_an_output() {
        let os = Os::new(OsConfig::default());
        let sem = os_sem_create(&os, 1);
        assert_eq!(os_sem_query(&os, sem.as_ref(), None), OsError::PdataNull.code());
        let mut data = SemData { count: 0, waiting: Vec::new() };
        assert_eq!(os_sem_query(&os, sem.as_ref(), Some(&mut data)), OS_ERR_NONE);
        assert_eq!(data.count, 1);
    }

    #[test]
    fn del_returns_null_on_success_only() {
        let os = Os::new(OsConfig::default());
        let q = os_q_create(&os, 2);
        let mut err = OS_ERR_NONE;
        assert!(os_q_del(&os, q.as_ref(), 9, &mut err).is_some());
        assert_eq!(err, OsError::InvalidOpt.code());
        assert!(os_q_del(&os, q.as_ref(), 0, &mut err).is_none());
        assert_eq!(err, OS_ERR_NONE);
    }
}
