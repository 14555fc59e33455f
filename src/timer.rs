/// Rate at which the delay and sound timers count down.
pub const TIMER_DEC_PER_SECOND: u32 = 60;

/// Eight-bit countdown. Pacing belongs to the scheduler; this only knows how
/// to take one step toward zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    pub count: u8,
}

impl Timer {
    pub fn set(&mut self, value: u8) {
        self.count = value;
    }

    pub fn get(&self) -> u8 {
        self.count
    }

    pub fn is_active(&self) -> bool {
        self.count != 0
    }

    /// Decrements, flooring at zero. Returns whether the timer is still
    /// running afterwards.
    pub fn tick(&mut self) -> bool {
        self.count = self.count.saturating_sub(1);
        self.is_active()
    }
}
