//! A CHIP-8 interpreter: 4K memory, sixteen byte registers, a 64x32 XOR
//! framebuffer, a sixteen-key pad and the two 60 Hz timers, driven by a
//! background run loop.
//!
//! ```no_run
//! use chip8_vm::{Emulator, EmulatorConfig};
//!
//! let mut emu = Emulator::new(EmulatorConfig::default());
//! emu.load_rom(&std::fs::read("pong.ch8").unwrap());
//! emu.start().unwrap();
//! // ... feed keys, render `emu.display_snapshot()` ...
//! emu.cleanup();
//! ```

pub mod config;
pub mod context;
pub mod cpu;
pub mod decode;
pub mod display;
pub mod emulator;
pub mod error;
mod execute;
pub mod keyboard;
pub mod memory;
pub mod registers;
pub mod scheduler;
pub mod sound;
pub mod timer;

pub use config::EmulatorConfig;
pub use context::QuirkMode;
pub use cpu::CpuDebugView;
pub use emulator::Emulator;
pub use error::EmulationFault;
pub use keyboard::{classic_keymap, Key};
