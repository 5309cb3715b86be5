//! The legacy call shapes report through their error slots.

mod common;

use std::sync::mpsc;

use common::{ticks, wait_until};
use ucos::compat::*;
use ucos::{Msg, Os, OsConfig, OsError, QData, OS_ERR_NONE, OS_FLAG_SET, OS_FLAG_WAIT_SET_ALL};

#[test]
fn timeout_is_reported_as_code_ten() {
    let os = Os::new(OsConfig::default());
    let sem = os_sem_create(&os, 0);
    let (tx, rx) = mpsc::channel();
    let task = {
        let (os2, sem) = (os.clone(), sem.clone());
        os.task_create(4, "waiter", move || {
            let mut err = OS_ERR_NONE;
            os_sem_pend(&os2, sem.as_ref(), 2, &mut err);
            let _ = tx.send(err);
        })
    };
    let Some(sem) = sem else {
        panic!("create failed");
    };
    wait_until(|| os.sem_query(&sem).map(|d| d.waiting.len()) == Ok(1));
    ticks(&os, 2);
    assert_eq!(rx.recv().ok(), Some(10));
    if let Ok(task) = task {
        task.join().ok();
    }
}

#[test]
fn queue_round_trip_through_legacy_calls() {
    let os = Os::new(OsConfig::default());
    let q = os_q_create(&os, 1);
    assert_eq!(os_q_post(&os, q.as_ref(), Msg(5)), OS_ERR_NONE);
    assert_eq!(os_q_post(&os, q.as_ref(), Msg(6)), OsError::QFull.code());

    let mut data = QData { msg: Msg::NULL, entries: 0, size: 0, waiting: Vec::new() };
    assert_eq!(os_q_query(&os, q.as_ref(), Some(&mut data)), OS_ERR_NONE);
    assert_eq!((data.msg, data.entries, data.size), (Msg(5), 1, 1));

    let mut err = OS_ERR_NONE;
    assert_eq!(os_q_accept(&os, q.as_ref(), &mut err), Msg(5));
    assert_eq!(err, OS_ERR_NONE);
    assert_eq!(os_q_accept(&os, q.as_ref(), &mut err), Msg::NULL);
    assert_eq!(err, OsError::QEmpty.code());
}

#[test]
fn flag_calls_return_values_and_codes() {
    let os = Os::new(OsConfig::default());
    let mut err = OS_ERR_NONE;
    let grp = os_flag_create(&os, 0b01, &mut err);
    assert_eq!(err, OS_ERR_NONE);
    assert_eq!(os_flag_accept(&os, grp.as_ref(), 0b11, OS_FLAG_WAIT_SET_ALL, &mut err), 0);
    assert_eq!(err, OsError::FlagNotRdy.code());
    assert_eq!(os_flag_post(&os, grp.as_ref(), 0b10, OS_FLAG_SET, &mut err), 0b11);
    assert_eq!(os_flag_accept(&os, grp.as_ref(), 0b11, OS_FLAG_WAIT_SET_ALL, &mut err), 0b11);
    assert_eq!(err, OS_ERR_NONE);
    os_flag_name_set(&os, grp.as_ref(), None, &mut err);
    assert_eq!(err, OsError::PnameNull.code());
}

#[test]
fn mailbox_null_post_and_mutex_owner_codes() {
    let os = Os::new(OsConfig::default());
    let mbox = os_mbox_create(&os, Msg::NULL);
    assert_eq!(os_mbox_post(&os, mbox.as_ref(), Msg::NULL), OsError::PostNullPtr.code());
    assert_eq!(os_mbox_accept(&os, mbox.as_ref()), Msg::NULL);

    let mut err = OS_ERR_NONE;
    let m = os_mutex_create(&os, 1, &mut err);
    assert_eq!(err, OS_ERR_NONE);
    let _ = os_mutex_create(&os, 1, &mut err);
    assert_eq!(err, OsError::PrioExist.code());
    assert_eq!(os_mutex_post(&os, m.as_ref()), OsError::NotMutexOwner.code());
}

#[test]
fn stopping_a_stopped_timer_still_reports_stopped() {
    let os = Os::new(OsConfig::default());
    let mut err = OS_ERR_NONE;
    let tmr = os_tmr_create(&os, 1, 0, ucos::OS_TMR_OPT_ONE_SHOT, None, 0, "t", &mut err);
    assert_eq!(err, OS_ERR_NONE);
    assert!(os_tmr_stop(&os, tmr.as_ref(), ucos::OS_TMR_OPT_NONE, 0, &mut err));
    assert_eq!(err, OsError::TmrStopped.code());
    assert_eq!(os_tmr_state_get(&os, tmr.as_ref(), &mut err), 1);
    assert!(os_tmr_del(&os, tmr.as_ref(), &mut err));
    assert!(!os_tmr_del(&os, tmr.as_ref(), &mut err));
    assert_eq!(err, OsError::TmrInactive.code());
}
