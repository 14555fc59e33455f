use std::ops::RangeInclusive;

use crate::error::EmulationFault;

pub type TypeAddr = u16; // in reality u12
type FontBytes = [u8; FONT_BLOCK_SIZE];

// Address space:
//  0x000-0x1FF: reserved for the interpreter
//  0x050-0x09F: built-in hex glyphs 0-F
//  0x200-0xFFF: ROM
pub const RESERVED_START: TypeAddr = 0x000;
pub const RESERVED_END: TypeAddr = 0x1FF;
pub const FONT_START: TypeAddr = 0x050;
pub const FONT_END: TypeAddr = 0x09F;
pub const ROM_START: TypeAddr = 0x200;
pub const ROM_END: TypeAddr = 0xFFF;

pub const FONT_BLOCK: RangeInclusive<TypeAddr> = FONT_START..=FONT_END;
pub const ROM_BLOCK: RangeInclusive<TypeAddr> = ROM_START..=ROM_END;

pub const FONT_BLOCK_SIZE: usize = 80;
pub const ROM_BLOCK_SIZE: usize = 3584;
pub const TOTAL_SIZE: usize = 4096;

/// Bytes per hex glyph.
pub const GLYPH_SIZE: TypeAddr = 5;

pub const DEFAULT_FONT: FontBytes = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat 4K byte store. The last loaded ROM is kept apart from the live image
/// so `reset` can replay it after the program has scribbled over memory.
#[derive(Debug)]
pub struct Memory {
    bytes: Box<[u8; TOTAL_SIZE]>,
    staged_rom: Option<Vec<u8>>,
}

impl Memory {
    pub fn new() -> Self {
        let mut memory = Self {
            bytes: Box::new([0; TOTAL_SIZE]),
            staged_rom: None,
        };
        memory.reset();
        memory
    }

    /// Zeroes the whole address space, reinstalls the font and replays the
    /// staged ROM, if any.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        let font_start = FONT_START as usize;
        self.bytes[font_start..font_start + FONT_BLOCK_SIZE].copy_from_slice(&DEFAULT_FONT);
        self.copy_staged_rom();
    }

    /// Stages `rom` and copies it to 0x200. Anything past 3584 bytes is
    /// dropped; the rest of the ROM block stays zero.
    pub fn load_rom(&mut self, rom: &[u8]) {
        let len = rom.len().min(ROM_BLOCK_SIZE);
        if len < rom.len() {
            log::warn!(
                "ROM is {} bytes, truncating to {} bytes",
                rom.len(),
                ROM_BLOCK_SIZE
            );
        }
        self.staged_rom = Some(rom[..len].to_vec());
        self.reset();
    }

    pub fn staged_rom(&self) -> &[u8] {
        self.staged_rom.as_deref().unwrap_or_default()
    }

    /// True once any ROM has been loaded, including an empty one.
    pub fn has_staged_rom(&self) -> bool {
        self.staged_rom.is_some()
    }

    fn copy_staged_rom(&mut self) {
        if let Some(rom) = &self.staged_rom {
            let start = ROM_START as usize;
            self.bytes[start..start + rom.len()].copy_from_slice(rom);
        }
    }

    pub fn read_byte(&self, addr: usize) -> Result<u8, EmulationFault> {
        self.bytes
            .get(addr)
            .copied()
            .ok_or(EmulationFault::MemoryOutOfBounds { address: addr })
    }

    pub fn write_byte(&mut self, addr: usize, val: u8) -> Result<(), EmulationFault> {
        let byte = self
            .bytes
            .get_mut(addr)
            .ok_or(EmulationFault::MemoryOutOfBounds { address: addr })?;
        *byte = val;
        Ok(())
    }

    /// Big-endian fetch of the instruction word at `addr`.
    pub fn read_instruction(&self, addr: TypeAddr) -> Result<u16, EmulationFault> {
        let addr = addr as usize;
        let (l, r) = (self.read_byte(addr)?, self.read_byte(addr + 1)?);
        Ok(((l as u16) << 8) | r as u16)
    }

    pub fn slice(&self, range: RangeInclusive<TypeAddr>) -> Result<&[u8], EmulationFault> {
        let (start, end) = (*range.start() as usize, *range.end() as usize);
        self.bytes
            .get(start..=end)
            .ok_or(EmulationFault::MemoryOutOfBounds { address: end })
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
