//! Kernel state, critical section, tick clock and the blocking core.

use core::mem::ManuallyDrop;
use core::ops::DerefMut;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::collections::BTreeMap;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, trace};

use crate::context::{self, InterruptGuard};
use crate::error::{HostError, HostResult};
use crate::ipc::{IpcObject, ObjectId};
use crate::sync::{Arc, Mutex, MutexGuard, Weak};
use crate::thread::{
    self, Payload, ThreadConfig, ThreadId, ThreadInfo, ThreadPriority, ThreadRecord, ThreadState,
    WaitDescriptor,
};
use crate::timer::{TimerCallback, TimerContext, TimerCore, TimerId, TimerMode};
use crate::trace::{TraceHook, TRACE_SCHED_LOCK, TRACE_THREAD_TIMEOUT, TRACE_TIMER_EXPIRE};

/// Monotonic tick count.
pub type Tick = u64;

/// How long a blocking call may suspend the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    NoWait,
    Forever,
    Ticks(u32),
}

impl Timeout {
    /// `None` when the call must not block at all, otherwise the optional
    /// absolute deadline.
    fn deadline(self, now: Tick) -> Option<Option<Tick>> {
        match self {
            Timeout::NoWait | Timeout::Ticks(0) => None,
            Timeout::Forever => Some(None),
            Timeout::Ticks(n) => Some(Some(now + Tick::from(n))),
        }
    }
}

/// Configuration for the host kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub name: &'static str,
    /// Rate of the background ticker started by [`Kernel::start_ticker`].
    pub tick_rate_hz: u32,
    /// Least urgent priority a spawned thread may use.
    pub lowest_priority: ThreadPriority,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "rtk",
            tick_rate_hz: 1000,
            lowest_priority: ThreadPriority(31),
        }
    }
}

impl KernelConfig {
    /// Creates a new kernel configuration builder.
    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::default()
    }
}

/// Builder for ergonomic kernel configuration construction.
#[derive(Debug, Clone, Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    /// Sets the kernel name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets the tick rate in Hz.
    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Sets the least urgent thread priority.
    pub fn lowest_priority(mut self, priority: ThreadPriority) -> Self {
        self.config.lowest_priority = priority;
        self
    }

    /// Builds the kernel configuration.
    pub fn build(self) -> KernelConfig {
        self.config
    }
}

pub struct KernelBuilder {
    config: KernelConfig,
    trace: Option<TraceHook>,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self { config, trace: None }
    }

    pub fn with_trace_hook(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    pub fn build(self) -> Arc<Kernel> {
        Arc::new(Kernel::new(self.config, self.trace))
    }
}

pub(crate) struct KernelState {
    pub(crate) tick: Tick,
    pub(crate) objects: BTreeMap<ObjectId, IpcObject>,
    pub(crate) threads: BTreeMap<ThreadId, ThreadRecord>,
    pub(crate) timers: BTreeMap<TimerId, TimerCore>,
    pub(crate) next_object: u32,
    pub(crate) next_timer: u32,
}

struct Ticker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Host kernel instance.
///
/// All object state sits behind a single lock taken through
/// [`Kernel::critical`]; blocking calls park the caller on its own condition
/// variable until another thread, the tick, or a delete resumes it.
pub struct Kernel {
    config: KernelConfig,
    state: Mutex<KernelState>,
    sched_lock: AtomicU8,
    trace: Option<TraceHook>,
    ticker: Mutex<Option<Ticker>>,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    /// Returns the kernel configuration.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn trace_hook(&self) -> Option<TraceHook> {
        self.trace.clone()
    }

    /// Enters the kernel critical section.
    pub fn critical(&self) -> CriticalSection<'_> {
        CriticalSection {
            kernel: self,
            state: ManuallyDrop::new(self.state.lock()),
            notes: Vec::new(),
        }
    }

    pub fn tick_get(&self) -> Tick {
        self.state.lock().tick
    }

    /// Starts a `std` thread whose body runs as a kernel thread with the
    /// configured name and priority. The thread's record is dropped when the
    /// body returns or unwinds.
    pub fn spawn<F, T>(self: &Arc<Self>, config: ThreadConfig, f: F) -> HostResult<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if config.priority > self.config.lowest_priority {
            return Err(HostError::InvalidArgument);
        }
        let info = ThreadInfo::from_config(&config);
        debug!(
            "{}: spawning thread '{}' ({:?}) at priority {}",
            self.config.name, info.name, info.id, info.priority
        );
        let exit = ThreadExit {
            kernel: Arc::downgrade(self),
            id: info.id,
        };
        std::thread::Builder::new()
            .name(config.name.clone())
            .stack_size(config.effective_stack_size())
            .spawn(move || {
                let _exit = exit;
                thread::install(info);
                f()
            })
            .map_err(|_| HostError::Spawn)
    }

    /// Suspends the caller for `ticks` ticks. Zero returns immediately.
    pub fn delay(&self, ticks: u32) -> HostResult<()> {
        if ticks == 0 {
            std::thread::yield_now();
            return Ok(());
        }
        match self.critical().suspend(None, Timeout::Ticks(ticks)) {
            Ok(()) | Err(HostError::Timeout) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Advances the clock by one tick.
    ///
    /// Expired waits are resumed with [`HostError::Timeout`]. Due timers are
    /// re-armed (periodic) or deactivated (one-shot) before any callback runs;
    /// callbacks run after the critical section is released.
    pub fn tick_increase(&self) {
        let mut fired: Vec<(TimerContext, TimerCallback)> = Vec::new();
        {
            let mut cs = self.critical();
            let now = {
                let st = cs.state_mut();
                st.tick += 1;
                st.tick
            };

            let expired: Vec<ThreadId> = cs
                .state
                .threads
                .iter()
                .filter(|(_, r)| {
                    matches!(r.state, ThreadState::Suspended(_))
                        && r.deadline.is_some_and(|d| d <= now)
                })
                .map(|(id, _)| *id)
                .collect();
            for id in expired {
                if cs.resume(id, Err(HostError::Timeout)) {
                    cs.note(TRACE_THREAD_TIMEOUT, id.0.to_le_bytes().to_vec());
                }
            }

            let mut expired_timers = Vec::new();
            for (id, timer) in cs.state_mut().timers.iter_mut() {
                if !timer.active || timer.timeout_tick > now {
                    continue;
                }
                match timer.mode {
                    TimerMode::Periodic => timer.timeout_tick = now + Tick::from(timer.init),
                    TimerMode::OneShot => timer.active = false,
                }
                trace!("timer '{}' expired at tick {}", timer.name, now);
                fired.push((timer.context, Arc::clone(&timer.callback)));
                expired_timers.push(*id);
            }
            for id in expired_timers {
                cs.note(TRACE_TIMER_EXPIRE, id.0.to_le_bytes().to_vec());
            }
        }

        for (ctx, callback) in fired {
            match ctx {
                TimerContext::Hard => {
                    let _isr = InterruptGuard::enter();
                    callback();
                }
                TimerContext::Soft => callback(),
            }
        }
    }

    /// Starts a background thread calling [`Kernel::tick_increase`] at the
    /// configured rate. A second call is a no-op.
    pub fn start_ticker(self: &Arc<Self>) -> HostResult<()> {
        let mut slot = self.ticker.lock();
        if slot.is_some() {
            return Ok(());
        }
        let period = Duration::from_micros(1_000_000 / u64::from(self.config.tick_rate_hz.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let kernel = Arc::downgrade(self);
        let handle = std::thread::Builder::new()
            .name(format!("{}-tick", self.config.name))
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    std::thread::sleep(period);
                    match kernel.upgrade() {
                        Some(kernel) => kernel.tick_increase(),
                        None => break,
                    }
                }
            })
            .map_err(|_| HostError::Spawn)?;
        debug!("{}: ticker started with period {:?}", self.config.name, period);
        *slot = Some(Ticker { stop, handle });
        Ok(())
    }

    /// Stops the background ticker and waits for it to exit.
    pub fn stop_ticker(&self) {
        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            ticker.stop.store(true, Ordering::Release);
            let _ = ticker.handle.join();
            debug!("{}: ticker stopped", self.config.name);
        }
    }
}

impl Kernel {
    fn new(config: KernelConfig, trace: Option<TraceHook>) -> Self {
        Self {
            config,
            state: Mutex::new(KernelState {
                tick: 0,
                objects: BTreeMap::new(),
                threads: BTreeMap::new(),
                timers: BTreeMap::new(),
                next_object: 1,
                next_timer: 1,
            }),
            sched_lock: AtomicU8::new(0),
            trace,
            ticker: Mutex::new(None),
        }
    }

    fn emit(&self, record_type: u8, payload: &[u8]) {
        if let Some(trace) = &self.trace {
            let _ = trace(record_type, payload, true);
        }
    }
}

impl Kernel {
    /// Increments the scheduler lock nesting. Saturates at 255.
    pub fn sched_lock(&self) {
        let prev = self
            .sched_lock
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .unwrap_or(u8::MAX);
        self.emit(TRACE_SCHED_LOCK, &[prev, prev.saturating_add(1)]);
    }

    /// Decrements the scheduler lock nesting if it is non-zero.
    pub fn sched_unlock(&self) {
        if let Ok(prev) =
            self.sched_lock
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            self.emit(TRACE_SCHED_LOCK, &[prev, prev - 1]);
        }
    }

    pub fn sched_lock_nesting(&self) -> u8 {
        self.sched_lock.load(Ordering::Acquire)
    }

    pub fn is_sched_locked(&self) -> bool {
        self.sched_lock_nesting() > 0
    }

    /// Locks the scheduler until the guard is dropped.
    pub fn sched_lock_guard(&self) -> SchedLockGuard<'_> {
        self.sched_lock();
        SchedLockGuard { kernel: self }
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.stop.store(true, Ordering::Release);
        }
    }
}

/// Forgets a spawned thread's record once its body is done.
struct ThreadExit {
    kernel: Weak<Kernel>,
    id: ThreadId,
}

impl Drop for ThreadExit {
    fn drop(&mut self) {
        if let Some(kernel) = self.kernel.upgrade() {
            if kernel.critical().state_mut().threads.remove(&self.id).is_some() {
                trace!("{}: released record of {:?}", kernel.config.name, self.id);
            }
        }
    }
}

/// RAII scheduler lock.
pub struct SchedLockGuard<'a> {
    kernel: &'a Kernel,
}

impl Drop for SchedLockGuard<'_> {
    fn drop(&mut self) {
        self.kernel.sched_unlock();
    }
}

/// Exclusive access to the kernel state.
///
/// Trace records noted while the section is held are emitted after the lock
/// is released, so trace hooks may call back into the kernel.
pub struct CriticalSection<'a> {
    kernel: &'a Kernel,
    state: ManuallyDrop<MutexGuard<'a, KernelState>>,
    notes: Vec<(u8, Vec<u8>)>,
}

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        // SAFETY: `state` is never touched again after this point.
        unsafe { ManuallyDrop::drop(&mut self.state) };
        for (record, payload) in self.notes.drain(..) {
            self.kernel.emit(record, &payload);
        }
    }
}

impl<'a> CriticalSection<'a> {
    pub fn kernel(&self) -> &'a Kernel {
        self.kernel
    }

    pub fn tick(&self) -> Tick {
        self.state.tick
    }

    pub(crate) fn state(&self) -> &KernelState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut KernelState {
        &mut self.state
    }

    pub(crate) fn note(&mut self, record: u8, payload: Vec<u8>) {
        self.notes.push((record, payload));
    }

    pub fn thread(&self, id: ThreadId) -> Option<&ThreadRecord> {
        self.state.threads.get(&id)
    }

    pub(crate) fn current_record(&mut self) -> &mut ThreadRecord {
        let info = thread::current();
        self.state_mut()
            .threads
            .entry(info.id)
            .or_insert_with(|| ThreadRecord::new(info))
    }

    pub fn descriptor(&self, id: ThreadId) -> Option<&WaitDescriptor> {
        self.state.threads.get(&id).map(|r| &r.descriptor)
    }

    pub fn descriptor_mut(&mut self, id: ThreadId) -> Option<&mut WaitDescriptor> {
        self.state_mut().threads.get_mut(&id).map(|r| &mut r.descriptor)
    }

    /// Wait descriptor of the calling thread.
    pub fn current_descriptor_mut(&mut self) -> &mut WaitDescriptor {
        &mut self.current_record().descriptor
    }

    /// Event bits that last made the calling thread ready.
    pub fn current_flags_rdy(&mut self) -> u32 {
        self.current_record().flags_rdy
    }

    pub(crate) fn take_payload(&mut self) -> Payload {
        core::mem::take(&mut self.current_record().payload)
    }

    /// Resumes a suspended thread with `outcome`, detaching it from whatever
    /// wait queue it sits on. Returns `false` if the thread was not suspended.
    pub fn resume(&mut self, id: ThreadId, outcome: HostResult<()>) -> bool {
        let st = self.state_mut();
        let Some(record) = st.threads.get_mut(&id) else {
            return false;
        };
        let ThreadState::Suspended(object) = record.state else {
            return false;
        };
        if let Some(obj) = object.and_then(|o| st.objects.get_mut(&o)) {
            obj.queue.remove(id);
        }
        record.state = ThreadState::Ready;
        record.deadline = None;
        record.wake = Some(outcome);
        record.signal.notify_one();
        true
    }

    /// Delivers `payload` to a suspended thread and resumes it successfully.
    pub(crate) fn hand_off(&mut self, id: ThreadId, payload: Payload) -> bool {
        if let Some(record) = self.state_mut().threads.get_mut(&id) {
            record.payload = payload;
            if let Payload::Events(bits) = payload {
                record.flags_rdy = bits;
            }
        }
        self.resume(id, Ok(()))
    }

    /// Suspends the calling thread, optionally on `object`'s wait queue, until
    /// it is resumed or `timeout` elapses. The critical section is released
    /// while the thread is parked and held again on return.
    pub(crate) fn suspend(&mut self, object: Option<ObjectId>, timeout: Timeout) -> HostResult<()> {
        if context::in_interrupt() {
            return Err(HostError::InInterrupt);
        }
        let Some(deadline) = timeout.deadline(self.state.tick) else {
            return Err(HostError::Timeout);
        };
        let info = thread::current();
        let st = self.state_mut();
        if let Some(obj) = object {
            st.objects
                .get_mut(&obj)
                .ok_or(HostError::NoObject)?
                .queue
                .enqueue(info.id, info.priority);
        }
        let record = st
            .threads
            .entry(info.id)
            .or_insert_with(|| ThreadRecord::new(info.clone()));
        record.state = ThreadState::Suspended(object);
        record.wake = None;
        record.deadline = deadline;
        record.payload = Payload::None;
        let signal = Arc::clone(&record.signal);
        trace!("thread {:?} suspended on {:?} ({:?})", info.id, object, timeout);

        loop {
            signal.wait(self.state.deref_mut());
            let wake = self
                .state
                .threads
                .get_mut(&info.id)
                .and_then(|r| r.wake.take());
            if let Some(outcome) = wake {
                return outcome;
            }
        }
    }
}
