use rand::Rng;

use crate::context::{ExecutionContext, QuirkMode};
use crate::cpu::Cpu;
use crate::decode::Instruction;
use crate::display::FrameBuffer;
use crate::error::EmulationFault;
use crate::keyboard::{Key, Keypad};
use crate::memory::{Memory, TypeAddr, FONT_START, GLYPH_SIZE};
use crate::registers::{ProgramCounter, Register};

impl Instruction {
    /// Runs one instruction. The program counter has already been moved past
    /// it, so jumps and skips work relative to the next instruction.
    pub fn execute(
        self,
        cpu: &mut Cpu,
        mem: &mut Memory,
        fb: &mut FrameBuffer,
        keypad: &mut Keypad,
        ctx: &mut ExecutionContext,
    ) -> Result<(), EmulationFault> {
        // address of this instruction, for fault reports
        let origin = cpu.pc.addr().wrapping_sub(ProgramCounter::STEP);
        let regs = &mut cpu.registers;

        match self {
            Instruction::ClearScreen => fb.clear_buffer(),
            Instruction::PopSubroutine => {
                let addr = cpu.stack.pop(origin)?;
                cpu.pc.set_addr(addr);
            }
            Instruction::System(_) => {}
            Instruction::Jump(addr) => cpu.pc.set_addr(addr),
            Instruction::PushSubroutine(addr) => {
                cpu.stack.push(cpu.pc.addr(), origin)?;
                cpu.pc.set_addr(addr);
            }
            Instruction::SkipEqualConstant(vx, kk) => {
                if regs.get(vx) == kk {
                    cpu.pc.increment();
                }
            }
            Instruction::SkipNotEqualConstant(vx, kk) => {
                if regs.get(vx) != kk {
                    cpu.pc.increment();
                }
            }
            Instruction::SkipEqualRegister(vx, vy) => {
                if regs.get(vx) == regs.get(vy) {
                    cpu.pc.increment();
                }
            }
            Instruction::SkipNotEqualRegister(vx, vy) => {
                if regs.get(vx) != regs.get(vy) {
                    cpu.pc.increment();
                }
            }
            Instruction::SetRegister(vx, kk) => regs.set(vx, kk),
            Instruction::AddToRegister(vx, kk) => regs.set(vx, regs.get(vx).wrapping_add(kk)),
            Instruction::CopyRegister(vx, vy) => regs.set(vx, regs.get(vy)),
            Instruction::Or(vx, vy) => {
                regs.set(vx, regs.get(vx) | regs.get(vy));
                if ctx.quirks == QuirkMode::Compatible {
                    regs.set(Register::VF, 0);
                }
            }
            Instruction::And(vx, vy) => {
                regs.set(vx, regs.get(vx) & regs.get(vy));
                if ctx.quirks == QuirkMode::Compatible {
                    regs.set(Register::VF, 0);
                }
            }
            Instruction::XOr(vx, vy) => {
                regs.set(vx, regs.get(vx) ^ regs.get(vy));
                if ctx.quirks == QuirkMode::Compatible {
                    regs.set(Register::VF, 0);
                }
            }
            Instruction::Add(vx, vy) => {
                let (sum, carry) = regs.get(vx).overflowing_add(regs.get(vy));
                regs.set(vx, sum);
                regs.set(Register::VF, carry as u8);
            }
            Instruction::SubtractForward(vx, vy) => {
                let (x, y) = (regs.get(vx), regs.get(vy));
                regs.set(vx, x.wrapping_sub(y));
                regs.set(Register::VF, (x > y) as u8);
            }
            Instruction::SubtractBackward(vx, vy) => {
                let (x, y) = (regs.get(vx), regs.get(vy));
                regs.set(vx, y.wrapping_sub(x));
                regs.set(Register::VF, (y > x) as u8);
            }
            Instruction::RightShift(vx, vy) => {
                let source = match ctx.quirks {
                    QuirkMode::Modern => regs.get(vx),
                    QuirkMode::Compatible => regs.get(vy),
                };
                regs.set(vx, source >> 1);
                regs.set(Register::VF, source & 1);
            }
            Instruction::LeftShift(vx, vy) => {
                let source = match ctx.quirks {
                    QuirkMode::Modern => regs.get(vx),
                    QuirkMode::Compatible => regs.get(vy),
                };
                regs.set(vx, source << 1);
                regs.set(Register::VF, (source >> 7) & 1);
            }
            Instruction::SetIndexRegister(addr) => cpu.index.set_addr(addr),
            Instruction::JumpWithOffset(addr) => {
                cpu.pc
                    .set_addr(addr.wrapping_add(regs.get(Register::V0) as TypeAddr));
            }
            Instruction::Random(vx, kk) => regs.set(vx, ctx.rng.gen::<u8>() & kk),
            Instruction::Display(vx, vy, height) => {
                let sprite = (0..height as usize)
                    .map(|row| mem.read_byte(cpu.index.offset(row)))
                    .collect::<Result<Vec<u8>, _>>()?;
                let collision = fb.paint(regs.get(vx), regs.get(vy), &sprite);
                regs.set(Register::VF, collision as u8);
            }
            Instruction::SkipIfPressed(vx) => {
                if keypad.is_down(Key::from_value(regs.get(vx))) {
                    cpu.pc.increment();
                }
            }
            Instruction::SkipIfNotPressed(vx) => {
                if !keypad.is_down(Key::from_value(regs.get(vx))) {
                    cpu.pc.increment();
                }
            }
            Instruction::CopyDelayToRegister(vx) => regs.set(vx, cpu.delay_timer.get()),
            Instruction::GetKey(vx) => keypad
                .future_input
                .on_next_key_ready(move |key, regs| regs.set(vx, key.value())),
            Instruction::CopyRegisterToDelay(vx) => cpu.delay_timer.set(regs.get(vx)),
            Instruction::CopyRegisterToSound(vx) => cpu.sound_timer.set(regs.get(vx)),
            Instruction::AddToIndex(vx) => {
                let addr = cpu.index.addr().wrapping_add(regs.get(vx) as TypeAddr);
                cpu.index.set_addr(addr);
            }
            Instruction::PointChar(vx) => {
                cpu.index
                    .set_addr(FONT_START + GLYPH_SIZE * regs.get(vx) as TypeAddr);
            }
            Instruction::ToDecimal(vx) => {
                let value = regs.get(vx);
                let digits = [value / 100, (value / 10) % 10, value % 10];
                for (i, digit) in digits.into_iter().enumerate() {
                    mem.write_byte(cpu.index.offset(i), digit)?;
                }
            }
            Instruction::StoreRegisterToMemory(vx) => {
                for reg in Register::V0.through(vx) {
                    mem.write_byte(cpu.index.offset(reg.index()), regs.get(reg))?;
                }
                if ctx.quirks == QuirkMode::Compatible {
                    advance_index_past(cpu, vx);
                }
            }
            Instruction::LoadRegisterFromMemory(vx) => {
                for reg in Register::V0.through(vx) {
                    regs.set(reg, mem.read_byte(cpu.index.offset(reg.index()))?);
                }
                if ctx.quirks == QuirkMode::Compatible {
                    advance_index_past(cpu, vx);
                }
            }
        }
        Ok(())
    }
}

fn advance_index_past(cpu: &mut Cpu, last: Register) {
    let addr = cpu
        .index
        .addr()
        .wrapping_add(last.index() as TypeAddr + 1);
    cpu.index.set_addr(addr);
}
