use std::fmt;

use crate::memory::TypeAddr;
use crate::registers::Register;

pub struct RawInstruction {
    code: u16,
}

impl RawInstruction {
    pub fn new(code: u16) -> Self {
        RawInstruction { code }
    }

    // n is the starting nibble (1-based), m is how many nibbles to take
    pub fn nth_m_digits(&self, n: u8, m: u8) -> u16 {
        let shift_places = (4 - m - (n - 1)) * 4;
        let mut mask = 0;
        for _ in 0..m {
            mask = (mask << 4) | 0b1111;
        }
        (self.code & (mask << shift_places)) >> shift_places
    }

    /// `nnn`
    pub fn address(&self) -> TypeAddr {
        self.nth_m_digits(2, 3)
    }

    /// `x`
    pub fn vx(&self) -> Register {
        Register::from_nibble(self.nth_m_digits(2, 1) as u8)
    }

    /// `y`
    pub fn vy(&self) -> Register {
        Register::from_nibble(self.nth_m_digits(3, 1) as u8)
    }

    /// `n`
    pub fn nibble(&self) -> u8 {
        self.nth_m_digits(4, 1) as u8
    }

    /// `kk`
    pub fn byte(&self) -> u8 {
        self.nth_m_digits(3, 2) as u8
    }
}

/// The 35 instruction kinds, each with the `(pattern, mask)` pair that
/// recognises it: `word & mask == pattern`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    CLS,
    RET,
    SYS,
    JP,
    CALL,
    SE_VX_BYTE,
    SNE_VX_BYTE,
    SE_VX_VY,
    LD_VX_BYTE,
    ADD_VX_BYTE,
    LD_VX_VY,
    OR_VX_VY,
    AND_VX_VY,
    XOR_VX_VY,
    ADD_VX_VY,
    SUB_VX_VY,
    SHR_VX,
    SUBN_VX_VY,
    SHL_VX,
    SNE_VX_VY,
    LD_I,
    JP_V0,
    RND_VX,
    DRW_VX_VY,
    SKP_VX,
    SKNP_VX,
    LD_VX_DT,
    LD_VX_K,
    LD_DT_VX,
    LD_ST_VX,
    ADD_I_VX,
    LD_F_VX,
    LD_B_VX,
    LD_I_VX,
    LD_VX_I,
}

// (kind, pattern, mask)
pub const OPCODE_TABLE: [(OpCode, u16, u16); 35] = [
    (OpCode::CLS, 0x00E0, 0xFFFF),
    (OpCode::RET, 0x00EE, 0xFFFF),
    (OpCode::SYS, 0x0000, 0xF000),
    (OpCode::JP, 0x1000, 0xF000),
    (OpCode::CALL, 0x2000, 0xF000),
    (OpCode::SE_VX_BYTE, 0x3000, 0xF000),
    (OpCode::SNE_VX_BYTE, 0x4000, 0xF000),
    (OpCode::SE_VX_VY, 0x5000, 0xF00F),
    (OpCode::LD_VX_BYTE, 0x6000, 0xF000),
    (OpCode::ADD_VX_BYTE, 0x7000, 0xF000),
    (OpCode::LD_VX_VY, 0x8000, 0xF00F),
    (OpCode::OR_VX_VY, 0x8001, 0xF00F),
    (OpCode::AND_VX_VY, 0x8002, 0xF00F),
    (OpCode::XOR_VX_VY, 0x8003, 0xF00F),
    (OpCode::ADD_VX_VY, 0x8004, 0xF00F),
    (OpCode::SUB_VX_VY, 0x8005, 0xF00F),
    (OpCode::SHR_VX, 0x8006, 0xF00F),
    (OpCode::SUBN_VX_VY, 0x8007, 0xF00F),
    (OpCode::SHL_VX, 0x800E, 0xF00F),
    (OpCode::SNE_VX_VY, 0x9000, 0xF00F),
    (OpCode::LD_I, 0xA000, 0xF000),
    (OpCode::JP_V0, 0xB000, 0xF000),
    (OpCode::RND_VX, 0xC000, 0xF000),
    (OpCode::DRW_VX_VY, 0xD000, 0xF000),
    (OpCode::SKP_VX, 0xE09E, 0xF0FF),
    (OpCode::SKNP_VX, 0xE0A1, 0xF0FF),
    (OpCode::LD_VX_DT, 0xF007, 0xF0FF),
    (OpCode::LD_VX_K, 0xF00A, 0xF0FF),
    (OpCode::LD_DT_VX, 0xF015, 0xF0FF),
    (OpCode::LD_ST_VX, 0xF018, 0xF0FF),
    (OpCode::ADD_I_VX, 0xF01E, 0xF0FF),
    (OpCode::LD_F_VX, 0xF029, 0xF0FF),
    (OpCode::LD_B_VX, 0xF033, 0xF0FF),
    (OpCode::LD_I_VX, 0xF055, 0xF0FF),
    (OpCode::LD_VX_I, 0xF065, 0xF0FF),
];

impl OpCode {
    /// Classifies `word`. CLS and RET are exact matches and take priority
    /// over the SYS catch-all for the rest of `0x0nnn`. `None` for words
    /// that are not CHIP-8 instructions at all (e.g. `0x5xy1`).
    pub fn decode(word: u16) -> Option<OpCode> {
        OPCODE_TABLE
            .iter()
            .find(|(_, pattern, mask)| word & mask == *pattern)
            .map(|(opcode, _, _)| *opcode)
    }

    pub fn pattern(self) -> u16 {
        OPCODE_TABLE[self as usize].1
    }

    pub fn mask(self) -> u16 {
        OPCODE_TABLE[self as usize].2
    }
}

/// A decoded instruction with its operand fields pulled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // 00E0
    ClearScreen,
    // 00EE
    PopSubroutine,
    // 0NNN
    System(TypeAddr),
    // 1NNN
    Jump(TypeAddr),
    // 2NNN
    PushSubroutine(TypeAddr),
    // 3XKK
    SkipEqualConstant(Register, u8),
    // 4XKK
    SkipNotEqualConstant(Register, u8),
    // 5XY0
    SkipEqualRegister(Register, Register),
    // 6XKK
    SetRegister(Register, u8),
    // 7XKK
    AddToRegister(Register, u8),
    // 8XY0
    CopyRegister(Register, Register),
    // 8XY1
    Or(Register, Register),
    // 8XY2
    And(Register, Register),
    // 8XY3
    XOr(Register, Register),
    // 8XY4
    Add(Register, Register),
    // 8XY5
    SubtractForward(Register, Register),
    // 8XY6
    RightShift(Register, Register),
    // 8XY7
    SubtractBackward(Register, Register),
    // 8XYE
    LeftShift(Register, Register),
    // 9XY0
    SkipNotEqualRegister(Register, Register),
    // ANNN
    SetIndexRegister(TypeAddr),
    // BNNN
    JumpWithOffset(TypeAddr),
    // CXKK
    Random(Register, u8),
    // DXYN
    Display(Register, Register, u8),
    // EX9E
    SkipIfPressed(Register),
    // EXA1
    SkipIfNotPressed(Register),
    // FX07
    CopyDelayToRegister(Register),
    // FX0A
    GetKey(Register),
    // FX15
    CopyRegisterToDelay(Register),
    // FX18
    CopyRegisterToSound(Register),
    // FX1E
    AddToIndex(Register),
    // FX29
    PointChar(Register),
    // FX33
    ToDecimal(Register),
    // FX55
    StoreRegisterToMemory(Register),
    // FX65
    LoadRegisterFromMemory(Register),
}

impl Instruction {
    pub fn decode_raw(ins: u16) -> Option<Self> {
        let raw = RawInstruction::new(ins);
        let instruction = match OpCode::decode(ins)? {
            OpCode::CLS => Self::ClearScreen,
            OpCode::RET => Self::PopSubroutine,
            OpCode::SYS => Self::System(raw.address()),
            OpCode::JP => Self::Jump(raw.address()),
            OpCode::CALL => Self::PushSubroutine(raw.address()),
            OpCode::SE_VX_BYTE => Self::SkipEqualConstant(raw.vx(), raw.byte()),
            OpCode::SNE_VX_BYTE => Self::SkipNotEqualConstant(raw.vx(), raw.byte()),
            OpCode::SE_VX_VY => Self::SkipEqualRegister(raw.vx(), raw.vy()),
            OpCode::LD_VX_BYTE => Self::SetRegister(raw.vx(), raw.byte()),
            OpCode::ADD_VX_BYTE => Self::AddToRegister(raw.vx(), raw.byte()),
            OpCode::LD_VX_VY => Self::CopyRegister(raw.vx(), raw.vy()),
            OpCode::OR_VX_VY => Self::Or(raw.vx(), raw.vy()),
            OpCode::AND_VX_VY => Self::And(raw.vx(), raw.vy()),
            OpCode::XOR_VX_VY => Self::XOr(raw.vx(), raw.vy()),
            OpCode::ADD_VX_VY => Self::Add(raw.vx(), raw.vy()),
            OpCode::SUB_VX_VY => Self::SubtractForward(raw.vx(), raw.vy()),
            OpCode::SHR_VX => Self::RightShift(raw.vx(), raw.vy()),
            OpCode::SUBN_VX_VY => Self::SubtractBackward(raw.vx(), raw.vy()),
            OpCode::SHL_VX => Self::LeftShift(raw.vx(), raw.vy()),
            OpCode::SNE_VX_VY => Self::SkipNotEqualRegister(raw.vx(), raw.vy()),
            OpCode::LD_I => Self::SetIndexRegister(raw.address()),
            OpCode::JP_V0 => Self::JumpWithOffset(raw.address()),
            OpCode::RND_VX => Self::Random(raw.vx(), raw.byte()),
            OpCode::DRW_VX_VY => Self::Display(raw.vx(), raw.vy(), raw.nibble()),
            OpCode::SKP_VX => Self::SkipIfPressed(raw.vx()),
            OpCode::SKNP_VX => Self::SkipIfNotPressed(raw.vx()),
            OpCode::LD_VX_DT => Self::CopyDelayToRegister(raw.vx()),
            OpCode::LD_VX_K => Self::GetKey(raw.vx()),
            OpCode::LD_DT_VX => Self::CopyRegisterToDelay(raw.vx()),
            OpCode::LD_ST_VX => Self::CopyRegisterToSound(raw.vx()),
            OpCode::ADD_I_VX => Self::AddToIndex(raw.vx()),
            OpCode::LD_F_VX => Self::PointChar(raw.vx()),
            OpCode::LD_B_VX => Self::ToDecimal(raw.vx()),
            OpCode::LD_I_VX => Self::StoreRegisterToMemory(raw.vx()),
            OpCode::LD_VX_I => Self::LoadRegisterFromMemory(raw.vx()),
        };
        Some(instruction)
    }
}

/// Assembly-style rendering, used in execution traces.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ClearScreen => write!(f, "CLS"),
            Self::PopSubroutine => write!(f, "RET"),
            Self::System(addr) => write!(f, "SYS {:#05X}", addr),
            Self::Jump(addr) => write!(f, "JP {:#05X}", addr),
            Self::PushSubroutine(addr) => write!(f, "CALL {:#05X}", addr),
            Self::SkipEqualConstant(x, kk) => write!(f, "SE {}, {:#04X}", x, kk),
            Self::SkipNotEqualConstant(x, kk) => write!(f, "SNE {}, {:#04X}", x, kk),
            Self::SkipEqualRegister(x, y) => write!(f, "SE {}, {}", x, y),
            Self::SetRegister(x, kk) => write!(f, "LD {}, {:#04X}", x, kk),
            Self::AddToRegister(x, kk) => write!(f, "ADD {}, {:#04X}", x, kk),
            Self::CopyRegister(x, y) => write!(f, "LD {}, {}", x, y),
            Self::Or(x, y) => write!(f, "OR {}, {}", x, y),
            Self::And(x, y) => write!(f, "AND {}, {}", x, y),
            Self::XOr(x, y) => write!(f, "XOR {}, {}", x, y),
            Self::Add(x, y) => write!(f, "ADD {}, {}", x, y),
            Self::SubtractForward(x, y) => write!(f, "SUB {}, {}", x, y),
            Self::RightShift(x, _) => write!(f, "SHR {}", x),
            Self::SubtractBackward(x, y) => write!(f, "SUBN {}, {}", x, y),
            Self::LeftShift(x, _) => write!(f, "SHL {}", x),
            Self::SkipNotEqualRegister(x, y) => write!(f, "SNE {}, {}", x, y),
            Self::SetIndexRegister(addr) => write!(f, "LD I, {:#05X}", addr),
            Self::JumpWithOffset(addr) => write!(f, "JP V0, {:#05X}", addr),
            Self::Random(x, kk) => write!(f, "RND {}, {:#04X}", x, kk),
            Self::Display(x, y, n) => write!(f, "DRW {}, {}, {:#03X}", x, y, n),
            Self::SkipIfPressed(x) => write!(f, "SKP {}", x),
            Self::SkipIfNotPressed(x) => write!(f, "SKNP {}", x),
            Self::CopyDelayToRegister(x) => write!(f, "LD {}, DT", x),
            Self::GetKey(x) => write!(f, "LD {}, K", x),
            Self::CopyRegisterToDelay(x) => write!(f, "LD DT, {}", x),
            Self::CopyRegisterToSound(x) => write!(f, "LD ST, {}", x),
            Self::AddToIndex(x) => write!(f, "ADD I, {}", x),
            Self::PointChar(x) => write!(f, "LD F, {}", x),
            Self::ToDecimal(x) => write!(f, "LD B, {}", x),
            Self::StoreRegisterToMemory(x) => write!(f, "LD [I], {}", x),
            Self::LoadRegisterFromMemory(x) => write!(f, "LD {}, [I]", x),
        }
    }
}
