//! Kernel context, priority table and the task boundary.
//!
//! Task management, interrupt nesting and the tick are thin pass-throughs to
//! the host kernel. The one piece of local state is the priority table: the
//! legacy API identifies tasks by priority, so every priority can be claimed
//! once, either by a task or by a mutex ceiling.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, warn};
use parking_lot::Mutex;
use rtk::{Kernel, ThreadConfig, ThreadPriority};

use crate::config::OsConfig;
use crate::error::{OsError, OsResult};

/// Owner of a priority slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrioSlot {
    Task { name: String },
    /// Held by a mutex as its ceiling priority.
    Reserved,
}

/// A running instance of the compatibility layer (`OSInit`).
pub struct Os {
    kernel: Arc<Kernel>,
    config: OsConfig,
    prio_table: Mutex<BTreeMap<u8, PrioSlot>>,
}

impl Os {
    /// Creates a host kernel from `config` and the layer on top of it.
    pub fn new(config: OsConfig) -> Arc<Self> {
        let kernel = Kernel::with_config(config.kernel_config()).build();
        Self::with_kernel(kernel, config)
    }

    /// Layers the compatibility API over an existing host kernel.
    pub fn with_kernel(kernel: Arc<Kernel>, config: OsConfig) -> Arc<Self> {
        debug!("{}: initialized, lowest priority {}", config.name, config.lowest_prio);
        Arc::new(Self {
            kernel,
            config,
            prio_table: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn config(&self) -> &OsConfig {
        &self.config
    }

    /// Starts the host tick (`OSStart`).
    pub fn start(&self) -> OsResult<()> {
        self.kernel.start_ticker().map_err(OsError::from)
    }

    /// Stops the host tick.
    pub fn stop(&self) {
        self.kernel.stop_ticker();
    }

    /// Creates a task at `prio` running `task` (`OSTaskCreate`). The
    /// priority is released when `task` returns.
    pub fn task_create<F>(self: &Arc<Self>, prio: u8, name: &str, task: F) -> OsResult<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        if rtk::in_interrupt() {
            return Err(OsError::TaskCreateIsr);
        }
        self.claim_prio(prio, PrioSlot::Task { name: name.to_owned() })?;
        let os = Arc::clone(self);
        let spawned = self.kernel.spawn(ThreadConfig::new(name, ThreadPriority(prio)), move || {
            task();
            os.release_prio(prio);
        });
        spawned.map_err(|err| {
            warn!("{}: task '{}' at priority {} failed to start: {}", self.config.name, name, prio, err);
            self.release_prio(prio);
            OsError::from(err)
        })
    }

    /// Owner of a priority, if claimed.
    pub fn prio_slot(&self, prio: u8) -> Option<PrioSlot> {
        self.prio_table.lock().get(&prio).cloned()
    }

    pub(crate) fn claim_prio(&self, prio: u8, slot: PrioSlot) -> OsResult<()> {
        if prio > self.config.lowest_prio {
            return Err(OsError::PrioInvalid);
        }
        let mut table = self.prio_table.lock();
        if table.contains_key(&prio) {
            return Err(OsError::PrioExist);
        }
        table.insert(prio, slot);
        Ok(())
    }

    pub(crate) fn release_prio(&self, prio: u8) {
        self.prio_table.lock().remove(&prio);
    }

    pub fn int_enter(&self) {
        rtk::interrupt_enter();
    }

    pub fn int_exit(&self) {
        rtk::interrupt_leave();
    }

    pub fn int_nesting(&self) -> u8 {
        rtk::interrupt_nesting()
    }

    pub fn sched_lock(&self) {
        self.kernel.sched_lock();
    }

    pub fn sched_unlock(&self) {
        self.kernel.sched_unlock();
    }

    pub fn lock_nesting(&self) -> u8 {
        self.kernel.sched_lock_nesting()
    }

    /// Current tick, truncated to the legacy 32-bit counter.
    pub fn time_get(&self) -> u32 {
        self.kernel.tick_get() as u32
    }

    /// Delays the calling task. Ignored from interrupt context.
    pub fn time_dly(&self, ticks: u32) {
        if rtk::in_interrupt() {
            return;
        }
        let _ = self.kernel.delay(ticks);
    }

    /// Advances the clock by one tick (`OSTimeTick`).
    pub fn time_tick(&self) {
        self.kernel.tick_increase();
    }

    /// Rejects blocking from interrupt context or with the scheduler locked.
    pub(crate) fn check_pend_context(&self) -> OsResult<()> {
        if rtk::in_interrupt() {
            return Err(OsError::PendIsr);
        }
        if self.kernel.is_sched_locked() {
            return Err(OsError::PendLocked);
        }
        Ok(())
    }
}
