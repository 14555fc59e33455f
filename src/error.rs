use crate::memory::TypeAddr;

/// Faults raised by a running program. These are bugs in the ROM, not in the
/// interpreter: the machine halts and keeps the fault for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmulationFault {
    #[error("call stack overflow at {pc:#06X}: more than 16 nested calls")]
    StackOverflow { pc: TypeAddr },

    #[error("call stack underflow at {pc:#06X}: return with an empty call stack")]
    StackUnderflow { pc: TypeAddr },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("invalid instruction {word:#06X} at {pc:#06X}")]
    InvalidInstruction { word: u16, pc: TypeAddr },
}
