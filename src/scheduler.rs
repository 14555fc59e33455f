use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender};

use crate::config::EmulatorConfig;
use crate::context::ExecutionContext;
use crate::cpu::Cpu;
use crate::decode::Instruction;
use crate::display::FrameBuffer;
use crate::error::EmulationFault;
use crate::keyboard::Keypad;
use crate::memory::Memory;

/// Everything a tick touches. The run loop holds it behind one mutex so CPU
/// and timer ticks never overlap.
#[derive(Debug)]
pub struct Machine {
    pub cpu: Cpu,
    pub memory: Memory,
    pub display: FrameBuffer,
    pub keypad: Keypad,
    pub context: ExecutionContext,
}

impl Machine {
    pub fn new(cpu: Cpu, context: ExecutionContext) -> Self {
        Self {
            cpu,
            memory: Memory::new(),
            display: FrameBuffer::new(),
            keypad: Keypad::new(),
            context,
        }
    }

    /// Back to power-on state with the staged ROM replayed. Runs again only
    /// if there is a ROM to run.
    pub fn reset(&mut self) {
        self.clear();
        self.memory.reset();
        self.cpu.running = self.memory.has_staged_rom();
    }

    pub fn load_rom(&mut self, rom: &[u8]) {
        self.clear();
        self.memory.load_rom(rom);
        self.cpu.running = true;
    }

    fn clear(&mut self) {
        self.cpu.reset();
        self.display.clear_buffer();
        self.keypad.reset();
        self.context.limiter.reset();
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(Cpu::new(), ExecutionContext::default())
    }
}

/// One CPU slot. While a key wait is pending the slot only polls for it.
/// Otherwise, when running and under the cycle cap, fetch, advance the
/// PC, execute. A fault halts the machine.
pub fn cpu_tick(machine: &mut Machine) {
    let Machine {
        cpu,
        memory,
        display,
        keypad,
        context,
    } = machine;

    if keypad.future_input.is_pending() {
        if let Some(key) = keypad.check_input(&mut cpu.registers) {
            log::debug!("key wait resolved by {:?}", key);
        } else {
            log::trace!("waiting for key release");
        }
        return;
    }
    if !cpu.running || !context.limiter.allows(cpu.cycles) {
        return;
    }
    if let Err(fault) = fetch_execute(cpu, memory, display, keypad, context) {
        cpu.halt(fault);
    }
}

fn fetch_execute(
    cpu: &mut Cpu,
    memory: &mut Memory,
    display: &mut FrameBuffer,
    keypad: &mut Keypad,
    context: &mut ExecutionContext,
) -> Result<(), EmulationFault> {
    let pc = cpu.pc.addr();
    let word = memory.read_instruction(pc)?;
    let instruction =
        Instruction::decode_raw(word).ok_or(EmulationFault::InvalidInstruction { word, pc })?;
    log::debug!("[{:#06X}] {}", word, instruction);

    cpu.instruction = Some(instruction);
    cpu.advance_program();
    instruction.execute(cpu, memory, display, keypad, context)?;
    cpu.cycles += 1;
    keypad.clear_previous();
    Ok(())
}

/// One 60 Hz slot.
pub fn timer_tick(machine: &mut Machine) {
    machine.cpu.update_timers();
}

pub(crate) fn lock(machine: &Mutex<Machine>) -> MutexGuard<'_, Machine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debug hook run at the sampling rate with the machine locked.
pub type Sampler = Box<dyn FnMut(&Machine) + Send>;

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<Option<Sampler>>,
}

/// Drives CPU, timer and sampling ticks from a single worker thread.
pub struct RunLoop {
    cpu_period: Duration,
    timer_period: Duration,
    sampling_period: Option<Duration>,
    sampler: Option<Sampler>,
    worker: Option<Worker>,
}

impl RunLoop {
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            cpu_period: config.cpu_period(),
            timer_period: config.timer_period(),
            sampling_period: config.sampling_period(),
            sampler: None,
            worker: None,
        }
    }

    /// Takes effect on the next `start`.
    pub fn set_sampler(&mut self, sampler: impl FnMut(&Machine) + Send + 'static) {
        self.sampler = Some(Box::new(sampler));
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_some()
    }

    pub fn start(&mut self, machine: Arc<Mutex<Machine>>) -> io::Result<()> {
        if self.worker.is_some() {
            log::warn!("run loop already started");
            return Ok(());
        }

        let (stop, stopped) = bounded::<()>(0);
        let cpu_period = self.cpu_period;
        let timer_period = self.timer_period;
        let sampling_period = self.sampling_period;
        let sampler = self.sampler.take();

        let handle = thread::Builder::new()
            .name("chip8-run-loop".into())
            .spawn(move || {
                run(
                    machine,
                    stopped,
                    cpu_period,
                    timer_period,
                    sampling_period,
                    sampler,
                )
            })?;

        log::info!(
            "run loop started: cpu every {:?}, timers every {:?}",
            cpu_period,
            timer_period
        );
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Cancels all ticks and waits for the worker to finish. A no-op when
    /// not started.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        drop(worker.stop);
        match worker.handle.join() {
            Ok(sampler) => self.sampler = sampler,
            Err(_) => log::error!("run loop thread panicked"),
        }
        log::info!("run loop stopped");
    }
}

impl Drop for RunLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    machine: Arc<Mutex<Machine>>,
    stopped: Receiver<()>,
    cpu_period: Duration,
    timer_period: Duration,
    sampling_period: Option<Duration>,
    mut sampler: Option<Sampler>,
) -> Option<Sampler> {
    let cpu = tick(cpu_period);
    let timers = tick(timer_period);
    let sampling = match (sampling_period, sampler.is_some()) {
        (Some(period), true) => tick(period),
        _ => never::<Instant>(),
    };

    loop {
        select! {
            recv(stopped) -> _ => break,
            recv(cpu) -> _ => cpu_tick(&mut lock(&machine)),
            recv(timers) -> _ => timer_tick(&mut lock(&machine)),
            recv(sampling) -> _ => {
                if let Some(sample) = sampler.as_mut() {
                    sample(&lock(&machine));
                }
            }
        }
    }
    sampler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StepLimiter;
    use crate::keyboard::Key;
    use crate::memory::ROM_START;
    use crate::registers::Register;
    use crate::sound::ToneGate;

    fn machine_with(program: &[u8]) -> Machine {
        let mut machine = Machine::default();
        for (i, byte) in program.iter().enumerate() {
            machine
                .memory
                .write_byte(ROM_START as usize + i, *byte)
                .unwrap();
        }
        machine
    }

    fn all_cells(machine: &Machine, on: bool) -> bool {
        machine.display.snapshot().iter().flatten().all(|&cell| cell == on)
    }

    #[test]
    fn test_cycle_when_running() {
        let mut machine = machine_with(&[0x00, 0xE0]);
        machine.display.fill();
        machine.keypad.on_down(Key::KB);
        machine.keypad.on_up(Key::KB);
        assert_eq!(machine.cpu.cycles, 0);
        assert_eq!(machine.keypad.key_released(), Some(Key::KB));

        machine.cpu.running = true;
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 1);
        assert_eq!(machine.cpu.pc.addr(), ROM_START + 2);
        assert!(all_cells(&machine, false));
        assert_eq!(machine.keypad.key_released(), None);
    }

    #[test]
    fn test_no_cycle_while_waiting_for_input() {
        let mut machine = machine_with(&[0x00, 0xE0]);
        machine.display.fill();
        machine.cpu.running = true;
        machine.keypad.future_input.on_next_key_ready(|_, _| {});

        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 0);
        assert_eq!(machine.cpu.pc.addr(), ROM_START);
        assert!(all_cells(&machine, true));

        machine.keypad.on_down(Key::KB);
        machine.keypad.on_up(Key::KB);
        // first tick resolves the wait, second one executes
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 0);
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 1);
        assert_eq!(machine.cpu.pc.addr(), ROM_START + 2);
        assert!(all_cells(&machine, false));
        assert_eq!(machine.keypad.key_released(), None);
    }

    #[test]
    fn test_no_cycle_when_not_running() {
        let mut machine = machine_with(&[0x00, 0xE0]);
        machine.display.fill();

        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 0);
        assert_eq!(machine.cpu.pc.addr(), ROM_START);
        assert!(all_cells(&machine, true));
    }

    #[test]
    fn test_wait_for_key_blocks_until_release() {
        // LD V5, K ; LD V6, 0x01
        let mut machine = machine_with(&[0xF5, 0x0A, 0x66, 0x01]);
        machine.cpu.running = true;

        cpu_tick(&mut machine);
        assert!(machine.keypad.future_input.is_pending());
        for _ in 0..5 {
            cpu_tick(&mut machine);
        }
        assert_eq!(machine.cpu.cycles, 1);
        assert_eq!(machine.cpu.registers.get(Register::V5), 0);

        machine.keypad.on_down(Key::KD);
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::V5), 0);
        machine.keypad.on_up(Key::KD);
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::V5), 0xD);

        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::V6), 1);
        assert_eq!(machine.cpu.cycles, 2);
    }

    #[test]
    fn test_beep_until_sound_timer_expires() {
        let gate = ToneGate::new();
        let cpu = Cpu::with_beep(Box::new(gate.clone()));
        let mut machine = Machine::new(cpu, ExecutionContext::default());
        for (i, byte) in [0x6A, 0x0A, 0xFA, 0x18].into_iter().enumerate() {
            machine.memory.write_byte(ROM_START as usize + i, byte).unwrap();
        }
        assert!(!gate.is_on());

        machine.cpu.running = true;
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::VA), 10);
        assert_eq!(machine.cpu.sound_timer.get(), 0);

        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.sound_timer.get(), 10);

        for n in 0..10 {
            timer_tick(&mut machine);
            assert_eq!(machine.cpu.sound_timer.get(), 10 - n - 1);
            assert!(gate.is_on());
        }

        timer_tick(&mut machine);
        assert!(!gate.is_on());
    }

    #[test]
    fn test_fault_halts() {
        // RET with nothing to return to
        let mut machine = machine_with(&[0x00, 0xEE, 0x60, 0x01]);
        machine.cpu.running = true;
        cpu_tick(&mut machine);
        assert!(!machine.cpu.running);
        assert_eq!(
            machine.cpu.fault,
            Some(EmulationFault::StackUnderflow { pc: ROM_START })
        );

        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::V0), 0);
    }

    #[test]
    fn test_invalid_word_faults() {
        let mut machine = machine_with(&[0x51, 0x21]);
        machine.cpu.running = true;
        cpu_tick(&mut machine);
        assert_eq!(
            machine.cpu.fault,
            Some(EmulationFault::InvalidInstruction {
                word: 0x5121,
                pc: ROM_START
            })
        );
        assert_eq!(machine.cpu.cycles, 0);
    }

    #[test]
    fn test_cycle_cap() {
        // JP 0x200
        let mut machine = machine_with(&[0x12, 0x00]);
        machine.context.limiter = StepLimiter::capped(3);
        machine.cpu.running = true;
        for _ in 0..10 {
            cpu_tick(&mut machine);
        }
        assert_eq!(machine.cpu.cycles, 3);

        machine.context.limiter.flip(machine.cpu.cycles);
        machine.context.limiter.step();
        cpu_tick(&mut machine);
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.cycles, 4);
    }

    #[test]
    fn test_load_rom_and_reset() {
        let mut machine = Machine::default();
        machine.reset();
        assert!(!machine.cpu.running);

        machine.load_rom(&[0x6A, 0x0A]);
        assert!(machine.cpu.running);
        cpu_tick(&mut machine);
        assert_eq!(machine.cpu.registers.get(Register::VA), 0x0A);
        machine.memory.write_byte(ROM_START as usize, 0xFF).unwrap();

        machine.cpu.running = false;
        machine.reset();
        assert!(machine.cpu.running);
        assert_eq!(machine.cpu.registers.get(Register::VA), 0);
        assert_eq!(machine.cpu.pc.addr(), ROM_START);
        assert_eq!(machine.memory.read_instruction(ROM_START).unwrap(), 0x6A0A);
    }

    #[test]
    fn test_reset_after_empty_rom_keeps_running() {
        let mut machine = Machine::default();
        machine.load_rom(&[]);
        assert!(machine.cpu.running);

        machine.reset();
        assert!(machine.cpu.running);
        assert!(machine.memory.has_staged_rom());
    }

    #[test]
    fn test_timers_count_down_while_waiting_for_key() {
        // LD V1, K
        let mut machine = machine_with(&[0xF1, 0x0A]);
        machine.cpu.running = true;
        cpu_tick(&mut machine);
        assert!(machine.keypad.future_input.is_pending());

        machine.cpu.delay_timer.set(5);
        machine.cpu.sound_timer.set(3);
        cpu_tick(&mut machine);
        timer_tick(&mut machine);
        cpu_tick(&mut machine);
        timer_tick(&mut machine);

        assert!(machine.keypad.future_input.is_pending());
        assert_eq!(machine.cpu.delay_timer.get(), 3);
        assert_eq!(machine.cpu.sound_timer.get(), 1);
        assert_eq!(machine.cpu.cycles, 1);
    }
}
