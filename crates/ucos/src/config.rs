//! Compile-time switches of the legacy kernel, as a runtime configuration.

use rtk::{KernelConfig, ThreadPriority};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsConfig {
    pub name: &'static str,
    /// Validate NULL handles and option values (`OS_ARG_CHK_EN`).
    pub arg_check: bool,
    /// Allow flag waits on cleared bits (`OS_FLAG_WAIT_CLR_EN`).
    pub flag_wait_clear: bool,
    /// Least urgent task priority (`OS_LOWEST_PRIO`).
    pub lowest_prio: u8,
    /// Host tick rate (`OS_TICKS_PER_SEC`).
    pub tick_rate_hz: u32,
    /// Timer tick rate (`OS_TMR_CFG_TICKS_PER_SEC`).
    pub tmr_ticks_per_sec: u32,
}

impl Default for OsConfig {
    fn default() -> Self {
        Self {
            name: "uCOS-II",
            arg_check: true,
            flag_wait_clear: true,
            lowest_prio: 31,
            tick_rate_hz: 1000,
            tmr_ticks_per_sec: 10,
        }
    }
}

impl OsConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> OsConfigBuilder {
        OsConfigBuilder::default()
    }

    /// Host ticks per timer tick, never less than one.
    pub fn tmr_tick_ratio(&self) -> u32 {
        (self.tick_rate_hz / self.tmr_ticks_per_sec.max(1)).max(1)
    }

    pub(crate) fn kernel_config(&self) -> KernelConfig {
        KernelConfig::builder()
            .name(self.name)
            .tick_rate_hz(self.tick_rate_hz)
            .lowest_priority(ThreadPriority(self.lowest_prio))
            .build()
    }
}

/// Builder for [`OsConfig`].
#[derive(Debug, Clone, Default)]
pub struct OsConfigBuilder {
    config: OsConfig,
}

impl OsConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn arg_check(mut self, enabled: bool) -> Self {
        self.config.arg_check = enabled;
        self
    }

    pub fn flag_wait_clear(mut self, enabled: bool) -> Self {
        self.config.flag_wait_clear = enabled;
        self
    }

    pub fn lowest_prio(mut self, prio: u8) -> Self {
        self.config.lowest_prio = prio;
        self
    }

    pub fn tick_rate_hz(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    pub fn tmr_ticks_per_sec(mut self, hz: u32) -> Self {
        self.config.tmr_ticks_per_sec = hz;
        self
    }

    pub fn build(self) -> OsConfig {
        self.config
    }
}
