use rand::rngs::StdRng;
use rand::SeedableRng;

/// Selects between the two common readings of the ambiguous instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuirkMode {
    /// SHR/SHL shift Vx in place, OR/AND/XOR leave VF alone, and block
    /// load/store leave I where it was.
    #[default]
    Modern,
    /// COSMAC VIP behaviour: SHR/SHL shift Vy into Vx, OR/AND/XOR clear VF,
    /// and block load/store leave I pointing past the last register.
    Compatible,
}

impl QuirkMode {
    pub fn toggled(self) -> Self {
        match self {
            QuirkMode::Modern => QuirkMode::Compatible,
            QuirkMode::Compatible => QuirkMode::Modern,
        }
    }
}

/// Debug cycle cap. While paused, the CPU may only run up to `max_cycle`,
/// which `step` nudges forward one instruction at a time. Unpaused, the cap
/// is `ceiling`: unlimited unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLimiter {
    pub max_cycle: u64,
    pub paused: bool,
    ceiling: u64,
}

impl StepLimiter {
    pub fn new() -> Self {
        Self::capped(u64::MAX)
    }

    /// Never runs more than `ceiling` instructions between resets.
    pub fn capped(ceiling: u64) -> Self {
        Self {
            max_cycle: ceiling,
            paused: false,
            ceiling,
        }
    }

    pub fn flip(&mut self, cycles: u64) {
        self.paused = !self.paused;
        self.max_cycle = if self.paused { cycles } else { self.ceiling };
    }

    pub fn step(&mut self) {
        if self.paused {
            self.max_cycle = self.max_cycle.saturating_add(1);
        }
    }

    pub fn reset(&mut self) {
        self.max_cycle = if self.paused { 0 } else { self.ceiling };
    }

    pub fn allows(&self, cycles: u64) -> bool {
        cycles < self.max_cycle
    }
}

impl Default for StepLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// State threaded through every instruction that is not part of the
/// machine itself.
#[derive(Debug)]
pub struct ExecutionContext {
    pub quirks: QuirkMode,
    pub limiter: StepLimiter,
    pub rng: StdRng,
}

impl ExecutionContext {
    pub fn new(quirks: QuirkMode, limiter: StepLimiter) -> Self {
        Self {
            quirks,
            limiter,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic RND, for tests and replays.
    pub fn with_seed(quirks: QuirkMode, seed: u64) -> Self {
        Self {
            quirks,
            limiter: StepLimiter::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(QuirkMode::default(), StepLimiter::default())
    }
}
