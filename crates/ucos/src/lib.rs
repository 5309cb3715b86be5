//! # ucos
//!
//! The uC/OS-II synchronization API on top of the [`rtk`] host kernel.
//!
//! - [`sem`], [`mutex`], [`queue`], [`mbox`] – event-block primitives.
//! - [`flag`]  – event flag groups with AND/OR and consume semantics.
//! - [`tmr`]   – software timers with a separate initial delay.
//! - [`abort`] – forced wake-up of pending tasks, shared by all of the above.
//! - [`compat`] – the same operations with legacy call shapes and numeric
//!   error codes.
//!
//! Every operation is a method on [`Os`] returning an [`OsResult`]; the
//! numeric code of an error is available through [`OsError::code`].
//!
//! ```no_run
//! use ucos::{Os, OsConfig};
//!
//! let os = Os::new(OsConfig::default());
//! let sem = os.sem_create(0).unwrap();
//! os.sem_post(&sem).unwrap();
//! os.sem_pend(&sem, 10).unwrap();
//! ```

pub mod abort;
pub mod compat;
pub mod config;
pub mod error;
pub mod event;
pub mod flag;
pub mod mbox;
pub mod mutex;
pub mod os;
pub mod queue;
pub mod sem;
pub mod tmr;

pub use abort::AbortScope;
pub use config::{OsConfig, OsConfigBuilder};
pub use error::{error_code, OsError, OsResult, OS_ERR_NONE};
pub use event::{EventType, OsEvent, OS_DEL_ALWAYS, OS_DEL_NO_PEND, OS_PEND_OPT_BROADCAST, OS_PEND_OPT_NONE};
pub use flag::{
    FlagGroup, OsFlags, OS_FLAG_CLR, OS_FLAG_CONSUME, OS_FLAG_SET, OS_FLAG_WAIT_CLR_ALL,
    OS_FLAG_WAIT_CLR_ANY, OS_FLAG_WAIT_SET_ALL, OS_FLAG_WAIT_SET_ANY,
};
pub use mbox::MboxData;
pub use mutex::{MutexData, OS_PRIO_MUTEX_CEIL_DIS};
pub use os::{Os, PrioSlot};
pub use queue::{
    Msg, PostOpt, QData, OS_POST_OPT_BROADCAST, OS_POST_OPT_FRONT, OS_POST_OPT_NONE,
    OS_POST_OPT_NO_SCHED,
};
pub use sem::SemData;
pub use tmr::{
    OsTmr, TmrCallback, TmrState, OS_TMR_OPT_CALLBACK, OS_TMR_OPT_CALLBACK_ARG, OS_TMR_OPT_NONE,
    OS_TMR_OPT_ONE_SHOT, OS_TMR_OPT_PERIODIC,
};
