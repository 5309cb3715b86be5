//! Software timers (`OSTmr*`).
//!
//! Each timer owns one host timer. Delays and periods are given in timer
//! ticks and converted to host ticks by [`OsConfig::tmr_tick_ratio`].
//!
//! A periodic timer with a nonzero initial delay runs its first cycle as a
//! host one-shot. When that fires, the expiry transition switches the host
//! timer to periodic at the steady-state period and restarts it, then runs
//! the user callback. A one-shot timer moves to [`TmrState::Completed`]
//! before its callback runs.
//!
//! Every start or stop bumps the timer's generation and the host callback
//! carries the generation it was installed for, so an expiry the tick
//! collected before a restart is dropped.
//!
//! [`OsConfig::tmr_tick_ratio`]: crate::config::OsConfig::tmr_tick_ratio

use core::fmt;
use std::sync::{Arc, Weak};

use log::{debug, trace, warn};
use parking_lot::Mutex;
use rtk::{Kernel, TimerCallback, TimerContext, TimerControl, TimerId, TimerMode};

use crate::error::{OsError, OsResult};
use crate::os::Os;

pub const OS_TMR_OPT_NONE: u8 = 0;
pub const OS_TMR_OPT_ONE_SHOT: u8 = 1;
pub const OS_TMR_OPT_PERIODIC: u8 = 2;
/// [`Os::tmr_stop`]: run the callback with the timer's own argument.
pub const OS_TMR_OPT_CALLBACK: u8 = 3;
/// [`Os::tmr_stop`]: run the callback with the argument passed to stop.
pub const OS_TMR_OPT_CALLBACK_ARG: u8 = 4;

/// User callback, given the timer and its argument.
pub type TmrCallback = Arc<dyn Fn(&OsTmr, usize) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TmrState {
    Unused = 0,
    Stopped = 1,
    Completed = 2,
    Running = 3,
}

struct TmrInner {
    state: TmrState,
    dly: u32,
    period: u32,
    mode: TimerMode,
    /// The initial delay of a periodic timer has not elapsed yet.
    dly_pending: bool,
    generation: u64,
    callback: Option<TmrCallback>,
    arg: usize,
    name: String,
    host: Option<TimerId>,
}

struct TmrBlock {
    kernel: Weak<Kernel>,
    ratio: u32,
    inner: Mutex<TmrInner>,
}

/// Handle to a software timer.
#[derive(Clone)]
pub struct OsTmr(Arc<TmrBlock>);

impl OsTmr {
    pub fn ptr_eq(&self, other: &OsTmr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn host_ticks(&self, ticks: u32) -> u32 {
        ticks.saturating_mul(self.0.ratio)
    }

    /// Host callback bound to one generation of this timer.
    fn host_callback(&self, generation: u64) -> TimerCallback {
        let weak = Arc::downgrade(&self.0);
        Arc::new(move || {
            if let Some(block) = weak.upgrade() {
                OsTmr(block).expire(generation);
            }
        })
    }

    /// Programs the host timer for the first cycle after a start.
    fn arm(&self, kernel: &Kernel, inner: &mut TmrInner, host: TimerId) -> OsResult<()> {
        let (mode, ticks) = match inner.mode {
            TimerMode::Periodic if inner.dly > 0 => (TimerControl::SetOneShot, inner.dly),
            TimerMode::Periodic => (TimerControl::SetPeriodic, inner.period),
            TimerMode::OneShot => (TimerControl::SetOneShot, inner.dly),
        };
        inner.generation = inner.generation.wrapping_add(1);
        kernel.timer_set_callback(host, self.host_callback(inner.generation))?;
        kernel.timer_control(host, mode)?;
        kernel.timer_control(host, TimerControl::SetTime(self.host_ticks(ticks)))?;
        kernel.timer_start(host)?;
        inner.dly_pending = inner.mode == TimerMode::Periodic && inner.dly > 0;
        inner.state = TmrState::Running;
        Ok(())
    }

    /// Expiry transition run by the host timer.
    fn expire(&self, generation: u64) {
        if rtk::in_interrupt() {
            warn!("timer callback dispatched from interrupt context, skipped");
            return;
        }
        let Some(kernel) = self.0.kernel.upgrade() else {
            return;
        };
        let (callback, arg) = {
            let mut inner = self.0.inner.lock();
            let Some(host) = inner.host else {
                return;
            };
            if inner.state != TmrState::Running {
                return;
            }
            if inner.generation != generation {
                trace!("timer '{}' dropped a stale expiry", inner.name);
                return;
            }
            match inner.mode {
                TimerMode::Periodic if inner.dly_pending => {
                    let period = self.host_ticks(inner.period);
                    let rearmed = kernel
                        .timer_control(host, TimerControl::SetPeriodic)
                        .and_then(|()| kernel.timer_control(host, TimerControl::SetTime(period)))
                        .and_then(|()| kernel.timer_start(host));
                    if let Err(err) = rearmed {
                        warn!("timer '{}' failed to re-arm: {}", inner.name, err);
                        inner.state = TmrState::Stopped;
                    } else {
                        debug!("timer '{}' re-armed with period {}", inner.name, inner.period);
                    }
                    inner.dly_pending = false;
                }
                TimerMode::Periodic => {}
                TimerMode::OneShot => inner.state = TmrState::Completed,
            }
            (inner.callback.clone(), inner.arg)
        };
        if let Some(callback) = callback {
            callback(self, arg);
        }
    }
}

impl fmt::Debug for OsTmr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.inner.lock();
        f.debug_struct("OsTmr")
            .field("name", &inner.name)
            .field("state", &inner.state)
            .field("dly", &inner.dly)
            .field("period", &inner.period)
            .finish()
    }
}

impl Os {
    /// Creates a stopped timer.
    ///
    /// `opt` is [`OS_TMR_OPT_ONE_SHOT`], which needs a nonzero `dly`, or
    /// [`OS_TMR_OPT_PERIODIC`], which needs a nonzero `period`.
    pub fn tmr_create(
        &self,
        dly: u32,
        period: u32,
        opt: u8,
        callback: Option<TmrCallback>,
        arg: usize,
        name: &str,
    ) -> OsResult<OsTmr> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        let mode = match opt {
            OS_TMR_OPT_ONE_SHOT if dly == 0 => return Err(OsError::TmrInvalidDly),
            OS_TMR_OPT_ONE_SHOT => TimerMode::OneShot,
            OS_TMR_OPT_PERIODIC if period == 0 => return Err(OsError::TmrInvalidPeriod),
            OS_TMR_OPT_PERIODIC => TimerMode::Periodic,
            _ => return Err(OsError::TmrInvalidOpt),
        };
        let tmr = OsTmr(Arc::new(TmrBlock {
            kernel: Arc::downgrade(self.kernel()),
            ratio: self.config().tmr_tick_ratio(),
            inner: Mutex::new(TmrInner {
                state: TmrState::Stopped,
                dly,
                period,
                mode,
                dly_pending: false,
                generation: 0,
                callback,
                arg,
                name: name.to_owned(),
                host: None,
            }),
        }));
        let init = tmr.host_ticks(if dly > 0 { dly } else { period });
        let host = self.kernel().timer_create(
            name,
            init,
            mode,
            TimerContext::Soft,
            tmr.host_callback(0),
        )?;
        tmr.0.inner.lock().host = Some(host);
        Ok(tmr)
    }

    /// Starts the timer from its initial delay, restarting it if running.
    pub fn tmr_start(&self, tmr: &OsTmr) -> OsResult<()> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        let mut inner = tmr.0.inner.lock();
        let host = inner.host.ok_or(OsError::TmrInactive)?;
        tmr.arm(self.kernel(), &mut inner, host)?;
        trace!("timer '{}' started", inner.name);
        Ok(())
    }

    /// Stops a running timer.
    ///
    /// With [`OS_TMR_OPT_CALLBACK`] or [`OS_TMR_OPT_CALLBACK_ARG`] the
    /// callback runs once, right after the stop, with the timer's own
    /// argument or `callback_arg` respectively.
    pub fn tmr_stop(&self, tmr: &OsTmr, opt: u8, callback_arg: usize) -> OsResult<()> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        if !matches!(
            opt,
            OS_TMR_OPT_NONE | OS_TMR_OPT_CALLBACK | OS_TMR_OPT_CALLBACK_ARG
        ) {
            return Err(OsError::TmrInvalidOpt);
        }
        let (callback, arg) = {
            let mut inner = tmr.0.inner.lock();
            let host = inner.host.ok_or(OsError::TmrInactive)?;
            if inner.state != TmrState::Running {
                return Err(OsError::TmrStopped);
            }
            self.kernel().timer_stop(host)?;
            inner.state = TmrState::Stopped;
            inner.dly_pending = false;
            inner.generation = inner.generation.wrapping_add(1);
            let arg = if opt == OS_TMR_OPT_CALLBACK_ARG {
                callback_arg
            } else {
                inner.arg
            };
            (inner.callback.clone(), arg)
        };
        if opt == OS_TMR_OPT_NONE {
            return Ok(());
        }
        let callback = callback.ok_or(OsError::TmrNoCallback)?;
        callback(tmr, arg);
        Ok(())
    }

    /// Deletes the timer; the handle reads back as [`TmrState::Unused`].
    pub fn tmr_del(&self, tmr: &OsTmr) -> OsResult<()> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        let mut inner = tmr.0.inner.lock();
        let host = inner.host.take().ok_or(OsError::TmrInactive)?;
        self.kernel().timer_delete(host)?;
        inner.state = TmrState::Unused;
        inner.callback = None;
        debug!("deleted timer '{}'", inner.name);
        Ok(())
    }

    /// Timer ticks until the next expiry, rounded up.
    pub fn tmr_remain_get(&self, tmr: &OsTmr) -> OsResult<u32> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        let inner = tmr.0.inner.lock();
        let host = inner.host.ok_or(OsError::TmrInactive)?;
        let remain = match inner.state {
            TmrState::Running => {
                let now = self.kernel().tick_get();
                let left = self
                    .kernel()
                    .timer_timeout_tick(host)?
                    .map_or(0, |due| due.saturating_sub(now));
                let ratio = u64::from(tmr.0.ratio);
                u32::try_from(left.div_ceil(ratio)).unwrap_or(u32::MAX)
            }
            TmrState::Stopped => match inner.mode {
                TimerMode::Periodic if inner.dly == 0 => inner.period,
                _ => inner.dly,
            },
            TmrState::Completed | TmrState::Unused => 0,
        };
        Ok(remain)
    }

    pub fn tmr_state_get(&self, tmr: &OsTmr) -> OsResult<TmrState> {
        if rtk::in_interrupt() {
            return Err(OsError::TmrIsr);
        }
        Ok(tmr.0.inner.lock().state)
    }

    pub fn tmr_name_get(&self, tmr: &OsTmr) -> OsResult<String> {
        if rtk::in_interrupt() {
            return Err(OsError::NameGetIsr);
        }
        let inner = tmr.0.inner.lock();
        if inner.state == TmrState::Unused {
            return Err(OsError::TmrInactive);
        }
        Ok(inner.name.clone())
    }
}
