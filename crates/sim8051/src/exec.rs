//! Instruction fetch, decode and execute.
//!
//! Opcodes that differ only in the register they name are grouped: `R0`-`R7`
//! forms occupy eight consecutive opcodes with the register in the low three
//! bits, `@R0`/`@R1` forms occupy two with the pointer in the low bit. The
//! arithmetic and logic families share one operand layout in their low
//! nibble, resolved by [`System::fetch_source`].

use tracing::{Level, trace};

use crate::alu;
use crate::disasm;
use crate::error::Fault;
use crate::sfr::*;
use crate::system::System;

/// One machine cycle in oscillator clocks.
const CYCLE: u64 = 12;

/// Outcome of a single [`System::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Oscillator cycles consumed by the instruction.
    pub cycles: u64,
    /// The first fault raised while executing the instruction. The
    /// instruction still ran to completion using the fallback values.
    pub fault: Option<Fault>,
}

impl System {
    /// Execute exactly one instruction.
    pub fn step(&mut self) -> Step {
        let pc = self.cpu.pc;
        if tracing::enabled!(Level::TRACE) {
            let decoded = disasm::decode(self, pc);
            trace!(
                "{pc:04X}: {:<9} {}  A={:02X} B={:02X} PSW={:02X} SP={:02X} DPTR={:04X}",
                decoded.hex(),
                decoded.text,
                self.cpu.a,
                self.cpu.b,
                self.cpu.psw,
                self.cpu.sp,
                self.cpu.dptr,
            );
        }

        self.begin_step(pc);
        let opcode = self.fetch();
        let cycles = self.execute(opcode, pc);
        self.cpu.cycles += cycles;
        Step {
            cycles,
            fault: self.end_step(),
        }
    }

    fn fetch(&mut self) -> u8 {
        let value = self.read_code(self.cpu.pc);
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        value
    }

    fn fetch16(&mut self) -> u16 {
        let hi = self.fetch();
        let lo = self.fetch();
        (hi as u16) << 8 | lo as u16
    }

    /// Source operand of the `A,<src>` families, by the opcode's low nibble:
    /// `#imm` (4), `direct` (5), `@Ri` (6, 7) or `Rn` (8-F).
    fn fetch_source(&mut self, opcode: u8) -> u8 {
        match opcode & 0x0F {
            0x04 => self.fetch(),
            0x05 => {
                let addr = self.fetch();
                self.read_data(addr)
            }
            0x06 | 0x07 => {
                let addr = self.pointer(opcode & 0x01);
                self.read_iram(addr)
            }
            _ => self.reg(opcode & 0x07),
        }
    }

    /// Relative branch; the offset is applied to the PC after the whole
    /// instruction has been fetched.
    fn branch(&mut self, taken: bool, rel: u8) {
        if taken {
            self.cpu.pc = self.cpu.pc.wrapping_add(rel as i8 as u16);
        }
    }

    /// AJMP/ACALL target: the top five bits of the (already advanced) PC,
    /// the opcode's top three bits as address bits 8-10, and the operand byte.
    pub(crate) fn page_target(pc: u16, opcode: u8, lo: u8) -> u16 {
        (pc & 0xF800) | ((opcode & 0xE0) as u16) << 3 | lo as u16
    }

    fn set_arith_flags(&mut self, cy: bool, ov: bool, ac: bool) {
        self.cpu.psw_set(PSW_CY, cy);
        self.cpu.psw_set(PSW_OV, ov);
        self.cpu.psw_set(PSW_AC, ac);
    }

    fn compare_jump(&mut self, lhs: u8, rhs: u8) {
        let rel = self.fetch();
        self.cpu.carry_set(lhs < rhs);
        self.branch(lhs != rhs, rel);
    }

    fn execute(&mut self, opcode: u8, pc: u16) -> u64 {
        match opcode {
            // AJMP addr11
            op if op & 0x1F == 0x01 => {
                let lo = self.fetch();
                self.cpu.pc = Self::page_target(self.cpu.pc, op, lo);
                2 * CYCLE
            }
            // ACALL addr11
            op if op & 0x1F == 0x11 => {
                let lo = self.fetch();
                let ret = self.cpu.pc;
                self.push_stack16(ret);
                self.cpu.pc = Self::page_target(ret, op, lo);
                2 * CYCLE
            }

            // NOP
            0x00 => CYCLE,
            // LJMP addr16
            0x02 => {
                self.cpu.pc = self.fetch16();
                2 * CYCLE
            }
            // LCALL addr16
            0x12 => {
                let target = self.fetch16();
                let ret = self.cpu.pc;
                self.push_stack16(ret);
                self.cpu.pc = target;
                2 * CYCLE
            }
            // RET
            0x22 => {
                self.cpu.pc = self.pop_stack16();
                2 * CYCLE
            }
            // SJMP rel
            0x80 => {
                let rel = self.fetch();
                self.branch(true, rel);
                2 * CYCLE
            }

            // JBC/JB/JNB bit,rel
            0x10 | 0x20 | 0x30 => {
                let bit = self.fetch();
                let rel = self.fetch();
                let set = self.read_bit(bit);
                let taken = if opcode == 0x30 { !set } else { set };
                if opcode == 0x10 && set {
                    self.write_bit(bit, false);
                }
                self.branch(taken, rel);
                2 * CYCLE
            }
            // JC/JNC/JZ/JNZ rel
            0x40 | 0x50 | 0x60 | 0x70 => {
                let rel = self.fetch();
                let taken = match opcode {
                    0x40 => self.cpu.carry(),
                    0x50 => !self.cpu.carry(),
                    0x60 => self.cpu.a == 0,
                    _ => self.cpu.a != 0,
                };
                self.branch(taken, rel);
                2 * CYCLE
            }
            // DJNZ direct,rel
            0xD5 => {
                let addr = self.fetch();
                let rel = self.fetch();
                let value = self.read_data(addr).wrapping_sub(1);
                self.write_data(addr, value);
                self.branch(value != 0, rel);
                2 * CYCLE
            }
            // DJNZ Rn,rel
            0xD8..=0xDF => {
                let rel = self.fetch();
                let index = opcode & 0x07;
                let value = self.reg(index).wrapping_sub(1);
                self.reg_set(index, value);
                self.branch(value != 0, rel);
                2 * CYCLE
            }
            // CJNE A,#imm,rel
            0xB4 => {
                let imm = self.fetch();
                self.compare_jump(self.cpu.a, imm);
                2 * CYCLE
            }
            // CJNE A,direct,rel
            0xB5 => {
                let addr = self.fetch();
                let value = self.read_data(addr);
                self.compare_jump(self.cpu.a, value);
                2 * CYCLE
            }
            // CJNE @Ri,#imm,rel
            0xB6 | 0xB7 => {
                let imm = self.fetch();
                let addr = self.pointer(opcode & 0x01);
                let value = self.read_iram(addr);
                self.compare_jump(value, imm);
                2 * CYCLE
            }
            // CJNE Rn,#imm,rel
            0xB8..=0xBF => {
                let imm = self.fetch();
                let value = self.reg(opcode & 0x07);
                self.compare_jump(value, imm);
                2 * CYCLE
            }

            // MOV A,#imm
            0x74 => {
                let value = self.fetch();
                self.cpu.a_set(value);
                CYCLE
            }
            // MOV A,direct / MOV A,@Ri / MOV A,Rn
            0xE5..=0xEF => {
                let value = self.fetch_source(opcode);
                self.cpu.a_set(value);
                CYCLE
            }
            // MOV @Ri,A
            0xF6 | 0xF7 => {
                let addr = self.pointer(opcode & 0x01);
                self.write_iram(addr, self.cpu.a);
                CYCLE
            }
            // MOV Rn,A
            0xF8..=0xFF => {
                self.reg_set(opcode & 0x07, self.cpu.a);
                CYCLE
            }
            // MOV direct,direct (source byte first)
            0x85 => {
                let src = self.fetch();
                let dst = self.fetch();
                let value = self.read_data(src);
                self.write_data(dst, value);
                2 * CYCLE
            }
            // PUSH direct
            0xC0 => {
                let addr = self.fetch();
                let value = self.read_data(addr);
                self.push_stack(value);
                2 * CYCLE
            }
            // POP direct
            0xD0 => {
                let addr = self.fetch();
                let value = self.read_iram(self.cpu.sp);
                self.write_data(addr, value);
                self.cpu.sp = self.cpu.sp.wrapping_sub(1);
                2 * CYCLE
            }

            // ADD A,<src>
            0x24..=0x2F => {
                let value = self.fetch_source(opcode);
                let (a, cy, ov, ac) = alu::add(self.cpu.a, value);
                self.set_arith_flags(cy, ov, ac);
                self.cpu.a_set(a);
                CYCLE
            }
            // SUBB A,<src>
            0x94..=0x9F => {
                let value = self.fetch_source(opcode);
                let (a, cy, ov, ac) = alu::subb(self.cpu.a, value, self.cpu.carry());
                self.set_arith_flags(cy, ov, ac);
                self.cpu.a_set(a);
                CYCLE
            }
            // ORL A,<src>
            0x44..=0x4F => {
                let value = self.fetch_source(opcode);
                self.cpu.a_set(self.cpu.a | value);
                CYCLE
            }
            // ANL A,<src>
            0x54..=0x5F => {
                let value = self.fetch_source(opcode);
                self.cpu.a_set(self.cpu.a & value);
                CYCLE
            }
            // XRL A,<src>
            0x64..=0x6F => {
                let value = self.fetch_source(opcode);
                self.cpu.a_set(self.cpu.a ^ value);
                CYCLE
            }
            // MUL AB
            0xA4 => {
                let (a, b, cy, ov) = alu::mul(self.cpu.a, self.cpu.b);
                self.cpu.b_set(b);
                self.cpu.psw_set(PSW_CY, cy);
                self.cpu.psw_set(PSW_OV, ov);
                self.cpu.a_set(a);
                4 * CYCLE
            }
            // DIV AB
            0x84 => {
                let (a, b, cy, ov) = alu::div(self.cpu.a, self.cpu.b);
                self.cpu.psw_set(PSW_CY, cy);
                self.cpu.psw_set(PSW_OV, ov);
                if !ov {
                    self.cpu.b_set(b);
                    self.cpu.a_set(a);
                }
                4 * CYCLE
            }

            // INC A / INC @Ri / INC Rn
            0x04 => {
                self.cpu.a_set(self.cpu.a.wrapping_add(1));
                CYCLE
            }
            0x06 | 0x07 => {
                let addr = self.pointer(opcode & 0x01);
                self.write_iram(addr, self.read_iram(addr).wrapping_add(1));
                CYCLE
            }
            0x08..=0x0F => {
                let index = opcode & 0x07;
                let value = self.reg(index).wrapping_add(1);
                self.reg_set(index, value);
                CYCLE
            }
            // DEC A / DEC @Ri / DEC Rn
            0x14 => {
                self.cpu.a_set(self.cpu.a.wrapping_sub(1));
                CYCLE
            }
            0x16 | 0x17 => {
                let addr = self.pointer(opcode & 0x01);
                self.write_iram(addr, self.read_iram(addr).wrapping_sub(1));
                CYCLE
            }
            0x18..=0x1F => {
                let index = opcode & 0x07;
                let value = self.reg(index).wrapping_sub(1);
                self.reg_set(index, value);
                CYCLE
            }

            // RR/RRC/RL/RLC A, SWAP A
            0x03 => {
                self.cpu.a_set(alu::rr(self.cpu.a));
                CYCLE
            }
            0x13 => {
                let (a, c) = alu::rrc(self.cpu.a, self.cpu.carry());
                self.cpu.carry_set(c);
                self.cpu.a_set(a);
                CYCLE
            }
            0x23 => {
                self.cpu.a_set(alu::rl(self.cpu.a));
                CYCLE
            }
            0x33 => {
                let (a, c) = alu::rlc(self.cpu.a, self.cpu.carry());
                self.cpu.carry_set(c);
                self.cpu.a_set(a);
                CYCLE
            }
            0xC4 => {
                self.cpu.a_set(alu::swap_nibbles(self.cpu.a));
                CYCLE
            }

            // CLR C / SETB C / CPL C
            0xC3 => {
                self.cpu.carry_set(false);
                CYCLE
            }
            0xD3 => {
                self.cpu.carry_set(true);
                CYCLE
            }
            0xB3 => {
                self.cpu.carry_set(!self.cpu.carry());
                CYCLE
            }
            // CLR bit / SETB bit / CPL bit
            0xC2 | 0xD2 => {
                let bit = self.fetch();
                self.write_bit(bit, opcode == 0xD2);
                CYCLE
            }
            0xB2 => {
                let bit = self.fetch();
                let value = self.read_bit(bit);
                self.write_bit(bit, !value);
                CYCLE
            }
            // MOV C,bit
            0xA2 => {
                let bit = self.fetch();
                let value = self.read_bit(bit);
                self.cpu.carry_set(value);
                CYCLE
            }
            // MOV bit,C
            0x92 => {
                let bit = self.fetch();
                self.write_bit(bit, self.cpu.carry());
                2 * CYCLE
            }
            // ANL C,bit / ANL C,/bit
            0x82 | 0xB0 => {
                let bit = self.fetch();
                let value = self.read_bit(bit) ^ (opcode == 0xB0);
                self.cpu.carry_set(self.cpu.carry() & value);
                2 * CYCLE
            }
            // ORL C,bit / ORL C,/bit
            0x72 | 0xA0 => {
                let bit = self.fetch();
                let value = self.read_bit(bit) ^ (opcode == 0xA0);
                self.cpu.carry_set(self.cpu.carry() | value);
                2 * CYCLE
            }

            // MOV DPTR,#imm16
            0x90 => {
                let value = self.fetch16();
                self.cpu.dptr_set(value);
                2 * CYCLE
            }
            // INC DPTR
            0xA3 => {
                self.cpu.dptr_set(self.cpu.dptr.wrapping_add(1));
                2 * CYCLE
            }
            // MOVC A,@A+DPTR
            0x93 => {
                let addr = self.cpu.dptr.wrapping_add(self.cpu.a as u16);
                let value = self.read_code(addr);
                self.cpu.a_set(value);
                2 * CYCLE
            }
            // MOVC A,@A+PC
            0x83 => {
                let addr = self.cpu.pc.wrapping_add(self.cpu.a as u16);
                let value = self.read_code(addr);
                self.cpu.a_set(value);
                2 * CYCLE
            }

            // MOVX A,@DPTR
            0xE0 => {
                let value = self.read_xram(self.cpu.dptr);
                self.cpu.a_set(value);
                2 * CYCLE
            }
            // MOVX @DPTR,A
            0xF0 => {
                self.write_xram(self.cpu.dptr, self.cpu.a);
                2 * CYCLE
            }
            // MOVX A,@Ri
            0xE2 | 0xE3 => {
                let addr = self.paged_xram_address(opcode & 0x01);
                let value = self.read_xram(addr);
                self.cpu.a_set(value);
                2 * CYCLE
            }
            // MOVX @Ri,A
            0xF2 | 0xF3 => {
                let addr = self.paged_xram_address(opcode & 0x01);
                self.write_xram(addr, self.cpu.a);
                2 * CYCLE
            }

            _ => {
                self.report(Fault::UnknownOpcode { opcode, addr: pc });
                CYCLE
            }
        }
    }

    /// `MOVX @Ri`: the pointer register supplies the low byte, P2 the page.
    fn paged_xram_address(&mut self, pointer: u8) -> u16 {
        let lo = self.pointer(pointer);
        (self.sfr.p2 as u16) << 8 | lo as u16
    }
}
