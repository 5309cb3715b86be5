//! Queue and mailbox delivery, including broadcast and abort.

mod common;

use std::sync::mpsc;

use common::wait_until;
use ucos::{
    Msg, Os, OsConfig, OsError, OsEvent, OS_PEND_OPT_BROADCAST, OS_PEND_OPT_NONE,
    OS_POST_OPT_BROADCAST, OS_POST_OPT_FRONT,
};

fn pending(os: &Os, q: &OsEvent) -> usize {
    os.q_query(q).map(|d| d.waiting.len()).unwrap_or(0)
}

fn spawn_receivers(
    os: &std::sync::Arc<Os>,
    q: &OsEvent,
    prios: &[u8],
) -> Result<(mpsc::Receiver<(u8, Result<Msg, OsError>)>, Vec<std::thread::JoinHandle<()>>), OsError> {
    let (tx, rx) = mpsc::channel();
    let mut tasks = Vec::new();
    for (n, &prio) in prios.iter().enumerate() {
        let (os2, q2, tx) = (os.clone(), q.clone(), tx.clone());
        tasks.push(os.task_create(prio, "rx", move || {
            let _ = tx.send((prio, os2.q_pend(&q2, 0)));
        })?);
        wait_until(|| pending(os, q) == n + 1);
    }
    Ok((rx, tasks))
}

#[test]
fn post_beyond_capacity_reports_full_and_keeps_state() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let q = os.q_create(3)?;
    for n in 1..=3 {
        os.q_post(&q, Msg(n))?;
    }
    assert_eq!(os.q_post(&q, Msg(4)), Err(OsError::QFull));
    assert_eq!(os.q_post_front(&q, Msg(5)), Err(OsError::QFull));
    let data = os.q_query(&q)?;
    assert_eq!((data.entries, data.msg), (3, Msg(1)));
    for n in 1..=3 {
        assert_eq!(os.q_accept(&q)?, Msg(n));
    }
    Ok(())
}

#[test]
fn broadcast_gives_every_waiter_a_copy() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let q = os.q_create(1)?;
    let (rx, tasks) = spawn_receivers(&os, &q, &[4, 5, 6])?;
    os.q_post_opt(&q, Msg(0xBEEF), OS_POST_OPT_BROADCAST)?;
    let mut got: Vec<_> = rx.iter().take(3).collect();
    got.sort_by_key(|(prio, _)| *prio);
    assert_eq!(
        got,
        vec![(4, Ok(Msg(0xBEEF))), (5, Ok(Msg(0xBEEF))), (6, Ok(Msg(0xBEEF)))]
    );
    for task in tasks {
        task.join().ok();
    }
    assert_eq!(os.q_accept(&q), Err(OsError::QEmpty));
    Ok(())
}

#[test]
fn plain_post_reaches_only_the_most_urgent_waiter() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let q = os.q_create(2)?;
    let (rx, tasks) = spawn_receivers(&os, &q, &[9, 3])?;
    os.q_post(&q, Msg(1))?;
    assert_eq!(rx.recv().ok(), Some((3, Ok(Msg(1)))));
    assert_eq!(os.q_query(&q)?.waiting, vec![9]);
    os.q_post_opt(&q, Msg(2), OS_POST_OPT_FRONT)?;
    assert_eq!(rx.recv().ok(), Some((9, Ok(Msg(2)))));
    for task in tasks {
        task.join().ok();
    }
    Ok(())
}

#[test]
fn pend_abort_broadcast_wakes_every_waiter() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let q = os.q_create(2)?;
    let (rx, tasks) = spawn_receivers(&os, &q, &[4, 5, 6])?;
    assert_eq!(os.q_pend_abort(&q, OS_PEND_OPT_BROADCAST)?, 3);
    let got: Vec<_> = rx.iter().take(3).map(|(_, r)| r).collect();
    assert_eq!(got, vec![Err(OsError::PendAbort); 3]);
    for task in tasks {
        task.join().ok();
    }
    assert_eq!(os.q_pend_abort(&q, OS_PEND_OPT_BROADCAST)?, 0);
    Ok(())
}

#[test]
fn pend_abort_without_broadcast_takes_the_head() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let q = os.q_create(2)?;
    let (rx, tasks) = spawn_receivers(&os, &q, &[8, 2])?;
    assert_eq!(os.q_pend_abort(&q, OS_PEND_OPT_NONE)?, 1);
    assert_eq!(rx.recv().ok(), Some((2, Err(OsError::PendAbort))));
    os.q_post(&q, Msg(7))?;
    assert_eq!(rx.recv().ok(), Some((8, Ok(Msg(7)))));
    for task in tasks {
        task.join().ok();
    }
    Ok(())
}

#[test]
fn mailbox_post_wakes_a_pending_task() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let mbox = os.mbox_create(Msg::NULL)?;
    let (tx, rx) = mpsc::channel();
    let task = {
        let (os2, mbox) = (os.clone(), mbox.clone());
        os.task_create(4, "rx", move || {
            let _ = tx.send(os2.mbox_pend(&mbox, 0));
        })?
    };
    wait_until(|| os.mbox_query(&mbox).map(|d| d.waiting.len()) == Ok(1));
    os.mbox_post(&mbox, Msg(0x10))?;
    assert_eq!(rx.recv().ok(), Some(Ok(Msg(0x10))));
    task.join().ok();
    assert_eq!(os.mbox_query(&mbox)?.msg, Msg::NULL);
    Ok(())
}

#[test]
fn mailbox_broadcast_reaches_every_waiter_and_leaves_it_empty() -> Result<(), OsError> {
    let os = Os::new(OsConfig::default());
    let mbox = os.mbox_create(Msg::NULL)?;
    let (tx, rx) = mpsc::channel();
    let mut tasks = Vec::new();
    for (n, prio) in [7u8, 3, 11].into_iter().enumerate() {
        let (os2, mbox2, tx) = (os.clone(), mbox.clone(), tx.clone());
        tasks.push(os.task_create(prio, "rx", move || {
            let _ = tx.send((prio, os2.mbox_pend(&mbox2, 0)));
        })?);
        wait_until(|| os.mbox_query(&mbox).map(|d| d.waiting.len()) == Ok(n + 1));
    }
    os.mbox_post_opt(&mbox, Msg(0x55), OS_POST_OPT_BROADCAST)?;
    let mut got: Vec<_> = rx.iter().take(3).collect();
    got.sort_by_key(|(prio, _)| *prio);
    assert_eq!(got, vec![(3, Ok(Msg(0x55))), (7, Ok(Msg(0x55))), (11, Ok(Msg(0x55)))]);
    for task in tasks {
        task.join().ok();
    }
    assert_eq!(os.mbox_accept(&mbox)?, Msg::NULL);
    Ok(())
}
