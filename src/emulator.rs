use std::io;
use std::sync::{Arc, Mutex};

use crate::config::EmulatorConfig;
use crate::context::{ExecutionContext, QuirkMode, StepLimiter};
use crate::cpu::{Cpu, CpuDebugView};
use crate::display::Snapshot;
use crate::keyboard::Key;
use crate::scheduler::{lock, Machine, RunLoop};
use crate::sound::{Beep, NoBeep};

/// Host-facing handle: owns the machine and the run loop that drives it.
pub struct Emulator {
    machine: Arc<Mutex<Machine>>,
    run_loop: RunLoop,
}

impl Emulator {
    pub fn new(config: EmulatorConfig) -> Self {
        Self::with_beep(config, Box::new(NoBeep))
    }

    pub fn with_beep(config: EmulatorConfig, beep: Box<dyn Beep>) -> Self {
        let limiter = config
            .max_cycles
            .map_or_else(StepLimiter::new, StepLimiter::capped);
        let context = ExecutionContext::new(config.quirks, limiter);
        Self::with_machine(config, Machine::new(Cpu::with_beep(beep), context))
    }

    /// Uses a prepared machine, e.g. one with a seeded context.
    pub fn with_machine(config: EmulatorConfig, machine: Machine) -> Self {
        Self {
            machine: Arc::new(Mutex::new(machine)),
            run_loop: RunLoop::new(&config),
        }
    }

    /// Replaces the program and marks the machine running.
    pub fn load_rom(&self, rom: &[u8]) {
        log::info!("loading {} byte ROM", rom.len());
        lock(&self.machine).load_rom(rom);
    }

    /// Restarts the staged program from scratch.
    pub fn reset(&self) {
        log::info!("reset");
        lock(&self.machine).reset();
    }

    pub fn start(&mut self) -> io::Result<()> {
        self.run_loop.start(Arc::clone(&self.machine))
    }

    pub fn stop(&mut self) {
        self.run_loop.stop();
    }

    pub fn is_started(&self) -> bool {
        self.run_loop.is_started()
    }

    /// Stops the run loop and releases the audio collaborator.
    pub fn cleanup(&mut self) {
        self.stop();
        lock(&self.machine).cpu.cleanup();
    }

    pub fn on_key_down(&self, key: Key) {
        lock(&self.machine).keypad.on_down(key);
    }

    pub fn on_key_up(&self, key: Key) {
        lock(&self.machine).keypad.on_up(key);
    }

    pub fn display_snapshot(&self) -> Snapshot {
        lock(&self.machine).display.snapshot()
    }

    /// The frame as 0RGB pixels, but only if it changed since the last call.
    pub fn take_frame(&self, on: u32, off: u32) -> Option<Vec<u32>> {
        let mut machine = lock(&self.machine);
        machine
            .display
            .take_dirty()
            .then(|| machine.display.to_argb(on, off))
    }

    pub fn cpu_debug_view(&self) -> CpuDebugView {
        lock(&self.machine).cpu.debug_view()
    }

    /// Pauses or resumes execution at the current cycle.
    pub fn toggle_pause(&self) {
        let mut machine = lock(&self.machine);
        let cycles = machine.cpu.cycles;
        machine.context.limiter.flip(cycles);
        log::info!(
            "{} at cycle {}",
            if machine.context.limiter.paused {
                "paused"
            } else {
                "resumed"
            },
            cycles
        );
    }

    /// While paused, lets exactly one more instruction through.
    pub fn step(&self) {
        lock(&self.machine).context.limiter.step();
    }

    pub fn quirks(&self) -> QuirkMode {
        lock(&self.machine).context.quirks
    }

    pub fn set_quirks(&self, quirks: QuirkMode) {
        lock(&self.machine).context.quirks = quirks;
    }

    /// Registers the debug sampling hook; takes effect on the next `start`.
    pub fn set_sampler(&mut self, sampler: impl FnMut(&Machine) + Send + 'static) {
        self.run_loop.set_sampler(sampler);
    }

    /// Runs `f` with the machine locked.
    pub fn with_machine_mut<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        f(&mut lock(&self.machine))
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}
