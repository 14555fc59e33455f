use std::time::Duration;

use crate::context::QuirkMode;

pub const DEFAULT_CPU_HZ: u32 = 500;
pub const DEFAULT_TIMER_HZ: u32 = crate::timer::TIMER_DEC_PER_SECOND;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub cpu_hz: u32,
    pub timer_hz: u32,
    pub quirks: QuirkMode,
    /// Stop fetching after this many executed instructions.
    pub max_cycles: Option<u64>,
    /// Rate of the optional debug sampling tick.
    pub sampling_hz: Option<u32>,
}

impl EmulatorConfig {
    pub fn cpu_period(&self) -> Duration {
        period(self.cpu_hz)
    }

    pub fn timer_period(&self) -> Duration {
        period(self.timer_hz)
    }

    pub fn sampling_period(&self) -> Option<Duration> {
        self.sampling_hz.map(period)
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            cpu_hz: DEFAULT_CPU_HZ,
            timer_hz: DEFAULT_TIMER_HZ,
            quirks: QuirkMode::default(),
            max_cycles: None,
            sampling_hz: None,
        }
    }
}

// 0 Hz is treated as 1 Hz
fn period(hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(hz.max(1)))
}
