use tracing::warn;

use crate::cpu::Cpu;
use crate::error::Fault;
use crate::memory::{CodeMemory, MemoryMapper, Xram};
use crate::peripheral::{Peripherals, ticks_for_cycles};
use crate::sfr::*;

/// Size of the internal data RAM backing store. Direct addressing only
/// reaches 0x00-0x7F as RAM, but `@Ri` and the stack may use the full byte.
const IRAM_SIZE: usize = 0x100;

/// Start of the bit-addressable RAM bytes (bit addresses 0x00-0x7F).
const BIT_RAM_BASE: u8 = 0x20;

/// The whole simulated machine: CPU registers, peripherals, and every memory
/// space. One value is owned by the driver and passed to every operation.
pub struct System {
    pub cpu: Cpu,
    pub sfr: Peripherals,
    iram: [u8; IRAM_SIZE],
    xram: Xram,
    code: CodeMemory,
    fault: Option<Fault>,
    /// Address of the instruction being executed, while inside a step.
    executing: Option<u16>,
}

impl System {
    /// A system in its power-on state.
    pub fn new() -> Self {
        let mut system = Self {
            cpu: Cpu::default(),
            sfr: Peripherals::default(),
            iram: [0; IRAM_SIZE],
            xram: Xram::new(),
            code: CodeMemory::new(),
            fault: None,
            executing: None,
        };
        system.reset();
        system
    }

    /// Zero every register and memory space, then apply power-on defaults:
    /// PC=0, SP=0x07, ports 0xFF, external access enabled.
    pub fn reset(&mut self) {
        self.iram.fill(0);
        self.xram.clear();
        self.code.clear();
        self.fault = None;
        self.executing = None;
        self.cpu = Cpu::new();
        self.sfr = Peripherals::new();
        self.code.set_ea(true);
    }

    /// Advance the peripherals by the cycles consumed since the last call.
    pub fn advance_peripherals(&mut self, elapsed_cycles: u64) {
        self.sfr.advance_timers(ticks_for_cycles(elapsed_cycles));
    }

    /// Record a fault for the current step and log it.
    pub(crate) fn report(&mut self, fault: Fault) {
        match self.executing {
            Some(pc) => {
                let pc = format!("{pc:04X}");
                warn!(%fault, pc = %pc, "fault");
            }
            None => warn!(%fault, "fault"),
        }
        self.fault.get_or_insert(fault);
    }

    /// Open a step for the instruction at `pc`. Faults left over from bus
    /// accesses made outside a step are dropped.
    pub(crate) fn begin_step(&mut self, pc: u16) {
        self.executing = Some(pc);
        self.fault = None;
    }

    /// Close the current step, returning its first fault.
    pub(crate) fn end_step(&mut self) -> Option<Fault> {
        self.executing = None;
        self.fault.take()
    }

    #[cfg(test)]
    pub(crate) fn take_fault(&mut self) -> Option<Fault> {
        self.fault.take()
    }

    // Code memory

    pub fn external_access(&self) -> bool {
        self.code.ea()
    }

    /// Set the EA pin: `true` serves low code addresses from the internal
    /// bank, `false` forces every fetch to the external bank.
    pub fn set_external_access(&mut self, ea: bool) {
        self.code.set_ea(ea);
    }

    pub fn read_code(&self, addr: u16) -> u8 {
        self.code.read(addr)
    }

    /// Place bytes into code memory starting at `addr`, each routed to the
    /// internal or external bank by address magnitude.
    pub fn load_code(&mut self, addr: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.code.load(addr.wrapping_add(i as u16), byte);
        }
    }

    pub fn write_code_internal(&mut self, addr: u16, value: u8) {
        self.code.write_internal(addr, value);
    }

    pub fn write_code_external(&mut self, addr: u16, value: u8) {
        self.code.write_external(addr, value);
    }

    // Internal data memory

    /// Read a directly-addressed byte: RAM below 0x80, SFRs above.
    pub fn try_read_data(&self, addr: u8) -> Result<u8, Fault> {
        if addr < SFR_BASE {
            return Ok(self.iram[addr as usize]);
        }
        match addr {
            SFR_A => Ok(self.cpu.a),
            SFR_B => Ok(self.cpu.b),
            SFR_SP => Ok(self.cpu.sp),
            SFR_PSW => Ok(self.cpu.psw),
            SFR_DPL => Ok(self.cpu.dpl()),
            SFR_DPH => Ok(self.cpu.dph()),
            _ => self
                .sfr
                .read(addr)
                .ok_or(Fault::UnknownSfrRead { addr }),
        }
    }

    /// Write a directly-addressed byte: RAM below 0x80, SFRs above.
    pub fn try_write_data(&mut self, addr: u8, value: u8) -> Result<(), Fault> {
        if addr < SFR_BASE {
            self.iram[addr as usize] = value;
            return Ok(());
        }
        match addr {
            SFR_A => self.cpu.a_set(value),
            SFR_B => self.cpu.b_set(value),
            SFR_SP => self.cpu.sp = value,
            SFR_PSW => self.cpu.psw = value,
            SFR_DPL => self.cpu.dpl_set(value),
            SFR_DPH => self.cpu.dph_set(value),
            _ => {
                if !self.sfr.write(addr, value) {
                    return Err(Fault::UnknownSfrWrite { addr, value });
                }
            }
        }
        Ok(())
    }

    /// Like [`System::try_read_data`], but an unknown SFR reads as zero.
    pub fn read_data(&mut self, addr: u8) -> u8 {
        match self.try_read_data(addr) {
            Ok(value) => value,
            Err(fault) => {
                self.report(fault);
                0
            }
        }
    }

    /// Like [`System::try_write_data`], but a write to an unknown SFR is
    /// dropped.
    pub fn write_data(&mut self, addr: u8, value: u8) {
        if let Err(fault) = self.try_write_data(addr, value) {
            self.report(fault);
        }
    }

    /// Raw internal RAM, as reached by `@Ri` and the stack. Never touches SFRs.
    pub fn read_iram(&self, addr: u8) -> u8 {
        self.iram[addr as usize]
    }

    pub fn write_iram(&mut self, addr: u8, value: u8) {
        self.iram[addr as usize] = value;
    }

    // External data memory

    pub fn read_xram(&self, addr: u16) -> u8 {
        self.xram.read(addr)
    }

    pub fn write_xram(&mut self, addr: u16, value: u8) {
        self.xram.write(addr, value);
    }

    // Bit access

    /// Byte address and bit mask for a bit address. Bits 0x00-0x7F live in
    /// RAM bytes 0x20-0x2F, bits 0x80-0xFF in the SFR whose address is the
    /// bit address with the low three bits cleared.
    pub fn bit_location(bit_addr: u8) -> (u8, u8) {
        let mask = 1 << (bit_addr & 0x07);
        if bit_addr < 0x80 {
            (BIT_RAM_BASE + (bit_addr >> 3), mask)
        } else {
            (bit_addr & 0xF8, mask)
        }
    }

    pub fn read_bit(&mut self, bit_addr: u8) -> bool {
        let (addr, mask) = Self::bit_location(bit_addr);
        self.read_data(addr) & mask != 0
    }

    /// Read-modify-write of the owning byte through the data bus, so SFR side
    /// effects (such as accumulator parity) apply.
    pub fn write_bit(&mut self, bit_addr: u8, value: bool) {
        let (addr, mask) = Self::bit_location(bit_addr);
        let byte = self.read_data(addr);
        let byte = if value { byte | mask } else { byte & !mask };
        self.write_data(addr, byte);
    }

    // Register banks

    /// Physical address of register `R<index>` in the active bank.
    pub fn register_address(&self, index: u8) -> Result<u8, Fault> {
        if index > 7 {
            return Err(Fault::InvalidRegister { index });
        }
        Ok(self.cpu.bank() * 8 + index)
    }

    /// The address held in pointer register `R0` or `R1` (`@Ri`).
    pub fn indirect_address(&self, pointer: u8) -> Result<u8, Fault> {
        if pointer > 1 {
            return Err(Fault::InvalidPointer { index: pointer });
        }
        let addr = self.register_address(pointer)?;
        Ok(self.iram[addr as usize])
    }

    /// Resolve a register, reporting an invalid index and falling back to
    /// address 0.
    pub(crate) fn reg_addr(&mut self, index: u8) -> u8 {
        self.register_address(index).unwrap_or_else(|fault| {
            self.report(fault);
            0
        })
    }

    /// Resolve `@Ri`, reporting an invalid pointer and falling back to
    /// address 0.
    pub(crate) fn pointer(&mut self, index: u8) -> u8 {
        self.indirect_address(index).unwrap_or_else(|fault| {
            self.report(fault);
            0
        })
    }

    pub fn r(&self, index: u8) -> u8 {
        match self.register_address(index) {
            Ok(addr) => self.iram[addr as usize],
            Err(_) => 0,
        }
    }

    pub(crate) fn reg(&mut self, index: u8) -> u8 {
        let addr = self.reg_addr(index);
        self.iram[addr as usize]
    }

    pub(crate) fn reg_set(&mut self, index: u8, value: u8) {
        let addr = self.reg_addr(index);
        self.iram[addr as usize] = value;
    }

    // Stack

    pub(crate) fn push_stack(&mut self, value: u8) {
        self.cpu.sp = self.cpu.sp.wrapping_add(1);
        self.iram[self.cpu.sp as usize] = value;
    }

    pub(crate) fn pop_stack(&mut self) -> u8 {
        let value = self.iram[self.cpu.sp as usize];
        self.cpu.sp = self.cpu.sp.wrapping_sub(1);
        value
    }

    /// Push a return address: low byte first, then high.
    pub(crate) fn push_stack16(&mut self, value: u16) {
        self.push_stack(value as u8);
        self.push_stack((value >> 8) as u8);
    }

    pub(crate) fn pop_stack16(&mut self) -> u16 {
        let hi = self.pop_stack();
        let lo = self.pop_stack();
        (hi as u16) << 8 | lo as u16
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}
