use std::fmt;

use crate::decode::Instruction;
use crate::error::EmulationFault;
use crate::memory::TypeAddr;
use crate::registers::{IndexRegister, ProgramCounter, Register, Registers};
use crate::sound::{Beep, NoBeep};
use crate::timer::Timer;

pub const STACK_SIZE: usize = 16;

/// Return addresses for CALL/RET, at most 16 deep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    addresses: Vec<TypeAddr>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            addresses: Vec::with_capacity(STACK_SIZE),
        }
    }

    /// `pc` is the address of the CALL itself, for the fault report.
    pub fn push(&mut self, addr: TypeAddr, pc: TypeAddr) -> Result<(), EmulationFault> {
        if self.addresses.len() == STACK_SIZE {
            return Err(EmulationFault::StackOverflow { pc });
        }
        self.addresses.push(addr);
        Ok(())
    }

    pub fn pop(&mut self, pc: TypeAddr) -> Result<TypeAddr, EmulationFault> {
        self.addresses
            .pop()
            .ok_or(EmulationFault::StackUnderflow { pc })
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Bottom of the stack first.
    pub fn as_slice(&self) -> &[TypeAddr] {
        &self.addresses
    }
}

pub struct Cpu {
    pub registers: Registers,
    pub pc: ProgramCounter,
    pub index: IndexRegister,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
    pub stack: Stack,
    pub running: bool,
    pub cycles: u64,
    /// Last instruction fetched, for diagnostics.
    pub instruction: Option<Instruction>,
    /// Set when the running program faults; cleared by `reset`.
    pub fault: Option<EmulationFault>,
    beep: Box<dyn Beep>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_beep(Box::new(NoBeep))
    }

    pub fn with_beep(beep: Box<dyn Beep>) -> Self {
        Self {
            registers: Registers::new(),
            pc: ProgramCounter::default(),
            index: IndexRegister::default(),
            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
            stack: Stack::new(),
            running: false,
            cycles: 0,
            instruction: None,
            fault: None,
            beep,
        }
    }

    pub fn advance_program(&mut self) {
        self.pc.increment();
    }

    /// One 60 Hz tick. The tone stays on for the tick that takes the sound
    /// timer to zero and goes off on the next one.
    pub fn update_timers(&mut self) {
        self.delay_timer.tick();
        if self.sound_timer.is_active() {
            self.sound_timer.tick();
            self.beep.start();
        } else {
            self.beep.stop();
        }
        log::trace!(
            "timers: DT={} ST={}",
            self.delay_timer.get(),
            self.sound_timer.get()
        );
    }

    /// Records `fault` and halts.
    pub fn halt(&mut self, fault: EmulationFault) {
        log::error!("halting after {} cycles: {}", self.cycles, fault);
        self.fault = Some(fault);
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.registers.reset();
        self.pc = ProgramCounter::default();
        self.index = IndexRegister::default();
        self.delay_timer.set(0);
        self.sound_timer.set(0);
        self.running = false;
        self.cycles = 0;
        self.instruction = None;
        self.fault = None;
        self.beep.stop();
    }

    pub fn cleanup(&mut self) {
        self.beep.cleanup();
    }

    pub fn debug_view(&self) -> CpuDebugView {
        CpuDebugView {
            pc: self.pc.addr(),
            i: self.index.addr(),
            dt: self.delay_timer.get(),
            st: self.sound_timer.get(),
            stack: self.stack.as_slice().to_vec(),
            registers: self.registers.to_array(),
            cycle_count: self.cycles,
            running: self.running,
            instruction: self.instruction,
            fault: self.fault,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("registers", &self.registers)
            .field("pc", &self.pc)
            .field("index", &self.index)
            .field("delay_timer", &self.delay_timer)
            .field("sound_timer", &self.sound_timer)
            .field("stack", &self.stack)
            .field("running", &self.running)
            .field("cycles", &self.cycles)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

/// Owned copy of the CPU state for hosts and debuggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDebugView {
    pub pc: TypeAddr,
    pub i: TypeAddr,
    pub dt: u8,
    pub st: u8,
    pub stack: Vec<TypeAddr>,
    pub registers: [u8; 16],
    /// Instructions executed since the last reset.
    pub cycle_count: u64,
    pub running: bool,
    pub instruction: Option<Instruction>,
    pub fault: Option<EmulationFault>,
}

impl fmt::Display for CpuDebugView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "PC {:#06X}  I {:#06X}  DT {:#04X}  ST {:#04X}  cycles {}{}",
            self.pc,
            self.i,
            self.dt,
            self.st,
            self.cycle_count,
            if self.running { "" } else { "  (stopped)" }
        )?;
        for row in Register::ALL.chunks(4) {
            for reg in row {
                write!(f, "{}  {:#04X}    ", reg, self.registers[reg.index()])?;
            }
            writeln!(f)?;
        }
        write!(f, "stack [")?;
        for (n, addr) in self.stack.iter().enumerate() {
            if n > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:#06X}", addr)?;
        }
        writeln!(f, "]")?;
        if let Some(instruction) = &self.instruction {
            writeln!(f, "last  {}", instruction)?;
        }
        if let Some(fault) = &self.fault {
            writeln!(f, "fault {}", fault)?;
        }
        Ok(())
    }
}
