//! Host timers.
//!
//! A timer fires from [`Kernel::tick_increase`] once its timeout tick is
//! reached. Periodic timers are re-armed at `now + init` and one-shot timers
//! deactivated before the callback runs, so a callback that inspects its own
//! timer sees the post-expiry state.

use log::debug;

use crate::error::{HostError, HostResult};
use crate::kernel::{Kernel, Tick};
use crate::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    OneShot,
    Periodic,
}

/// Execution context of the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerContext {
    /// Runs as ordinary task code on the ticking thread.
    Soft,
    /// Runs inside an interrupt guard on the ticking thread.
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerControl {
    SetTime(u32),
    SetOneShot,
    SetPeriodic,
}

pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct TimerCore {
    pub(crate) name: String,
    pub(crate) init: u32,
    pub(crate) mode: TimerMode,
    pub(crate) context: TimerContext,
    pub(crate) active: bool,
    pub(crate) timeout_tick: Tick,
    pub(crate) callback: TimerCallback,
}

impl Kernel {
    pub fn timer_create(
        &self,
        name: &str,
        init: u32,
        mode: TimerMode,
        context: TimerContext,
        callback: TimerCallback,
    ) -> HostResult<TimerId> {
        let mut cs = self.critical();
        let st = cs.state_mut();
        let id = TimerId(st.next_timer);
        st.next_timer += 1;
        st.timers.insert(
            id,
            TimerCore {
                name: name.to_owned(),
                init,
                mode,
                context,
                active: false,
                timeout_tick: 0,
                callback,
            },
        );
        debug!("created {:?} timer '{}' ({} ticks) as {:?}", mode, name, init, id);
        Ok(id)
    }

    /// Arms the timer at `now + init`, restarting it if already active.
    pub fn timer_start(&self, id: TimerId) -> HostResult<()> {
        let mut cs = self.critical();
        let now = cs.tick();
        let timer = cs
            .state_mut()
            .timers
            .get_mut(&id)
            .ok_or(HostError::NoObject)?;
        if timer.init == 0 {
            return Err(HostError::InvalidArgument);
        }
        timer.timeout_tick = now + Tick::from(timer.init);
        timer.active = true;
        Ok(())
    }

    /// Disarms the timer. Returns whether it was active.
    pub fn timer_stop(&self, id: TimerId) -> HostResult<bool> {
        let mut cs = self.critical();
        let timer = cs
            .state_mut()
            .timers
            .get_mut(&id)
            .ok_or(HostError::NoObject)?;
        Ok(core::mem::replace(&mut timer.active, false))
    }

    /// Changes the period or mode. Takes effect at the next start.
    pub fn timer_control(&self, id: TimerId, control: TimerControl) -> HostResult<()> {
        let mut cs = self.critical();
        let timer = cs
            .state_mut()
            .timers
            .get_mut(&id)
            .ok_or(HostError::NoObject)?;
        match control {
            TimerControl::SetTime(ticks) => timer.init = ticks,
            TimerControl::SetOneShot => timer.mode = TimerMode::OneShot,
            TimerControl::SetPeriodic => timer.mode = TimerMode::Periodic,
        }
        Ok(())
    }

    /// Replaces the expiry callback. An expiry already collected by a tick
    /// still runs the callback it was collected with.
    pub fn timer_set_callback(&self, id: TimerId, callback: TimerCallback) -> HostResult<()> {
        let mut cs = self.critical();
        let timer = cs
            .state_mut()
            .timers
            .get_mut(&id)
            .ok_or(HostError::NoObject)?;
        timer.callback = callback;
        Ok(())
    }

    /// Absolute tick of the next expiry, `None` while inactive.
    pub fn timer_timeout_tick(&self, id: TimerId) -> HostResult<Option<Tick>> {
        let cs = self.critical();
        let timer = cs.state().timers.get(&id).ok_or(HostError::NoObject)?;
        Ok(timer.active.then_some(timer.timeout_tick))
    }

    pub fn timer_is_active(&self, id: TimerId) -> HostResult<bool> {
        Ok(self.timer_timeout_tick(id)?.is_some())
    }

    pub fn timer_delete(&self, id: TimerId) -> HostResult<()> {
        let mut cs = self.critical();
        let timer = cs
            .state_mut()
            .timers
            .remove(&id)
            .ok_or(HostError::NoObject)?;
        debug!("deleted timer '{}' ({:?})", timer.name, id);
        Ok(())
    }
}
