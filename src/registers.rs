use std::fmt;

use crate::memory::{TypeAddr, ROM_START};

/// The sixteen general purpose registers. VF doubles as the flag register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}

impl Register {
    pub const ALL: [Register; 16] = [
        Register::V0,
        Register::V1,
        Register::V2,
        Register::V3,
        Register::V4,
        Register::V5,
        Register::V6,
        Register::V7,
        Register::V8,
        Register::V9,
        Register::VA,
        Register::VB,
        Register::VC,
        Register::VD,
        Register::VE,
        Register::VF,
    ];

    /// Register named by the low nibble of `nibble`.
    pub fn from_nibble(nibble: u8) -> Self {
        Self::ALL[(nibble & 0xF) as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// `self` through `last` in ascending order, both ends included. Empty
    /// when `last` comes before `self`.
    pub fn through(self, last: Register) -> impl Iterator<Item = Register> {
        (self.index()..=last.index()).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "V{:X}", self.index())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    registers: [u8; 16],
}

impl Registers {
    pub fn new() -> Self {
        Self { registers: [0; 16] }
    }

    pub fn set(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    pub fn get(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn reset(&mut self) {
        self.registers = [0; 16];
    }

    pub fn to_array(&self) -> [u8; 16] {
        self.registers
    }
}

// Special registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter(pub TypeAddr);

impl ProgramCounter {
    /// Width of one instruction in bytes.
    pub const STEP: TypeAddr = 2;

    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(Self::STEP);
    }

    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }

    pub fn addr(&self) -> TypeAddr {
        self.0
    }
}

impl Default for ProgramCounter {
    fn default() -> Self {
        ProgramCounter(ROM_START)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexRegister(pub TypeAddr);

impl IndexRegister {
    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }

    pub fn addr(&self) -> TypeAddr {
        self.0
    }

    /// `I + offset` as a memory index, without wrapping, so a read past the
    /// top of memory is caught by the bounds check.
    pub fn offset(&self, offset: usize) -> usize {
        self.0 as usize + offset
    }
}
