use crate::alu::parity;
use crate::sfr::*;

/// The CPU register file.
///
/// Memory-mapped views of these registers (ACC, B, PSW, SP, DPL, DPH) are
/// resolved by [`crate::System`]; this type only owns the values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cpu {
    pub pc: u16,
    pub a: u8,
    pub b: u8,
    pub psw: u8,
    pub sp: u8,
    pub dptr: u16,
    /// Monotonic machine clock in oscillator cycles. Only reset clears it.
    pub cycles: u64,
}

impl Cpu {
    /// Power-on register state: everything zero except SP.
    pub fn new() -> Self {
        Self {
            sp: 0x07,
            ..Default::default()
        }
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    /// Set the accumulator and recompute the parity flag.
    pub fn a_set(&mut self, value: u8) {
        self.a = value;
        self.psw_set(PSW_P, parity(value));
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    pub fn b_set(&mut self, value: u8) {
        self.b = value;
    }

    pub fn dptr(&self) -> u16 {
        self.dptr
    }

    pub fn dptr_set(&mut self, value: u16) {
        self.dptr = value;
    }

    pub fn dpl(&self) -> u8 {
        self.dptr as u8
    }

    pub fn dph(&self) -> u8 {
        (self.dptr >> 8) as u8
    }

    pub fn dpl_set(&mut self, value: u8) {
        self.dptr = (self.dptr & 0xFF00) | value as u16;
    }

    pub fn dph_set(&mut self, value: u8) {
        self.dptr = (self.dptr & 0x00FF) | (value as u16) << 8;
    }

    /// Test a PSW flag by mask (`PSW_CY`, `PSW_OV`, ...).
    pub fn psw(&self, flag: u8) -> bool {
        self.psw & flag != 0
    }

    pub fn psw_set(&mut self, flag: u8, value: bool) {
        if value {
            self.psw |= flag;
        } else {
            self.psw &= !flag;
        }
    }

    pub fn carry(&self) -> bool {
        self.psw(PSW_CY)
    }

    pub fn carry_set(&mut self, value: bool) {
        self.psw_set(PSW_CY, value);
    }

    /// Active register bank, 0-3, selected by RS1:RS0.
    pub fn bank(&self) -> u8 {
        (self.psw >> 3) & 0x03
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_set_tracks_parity() {
        let mut cpu = Cpu::new();
        for value in 0..=255u8 {
            cpu.a_set(value);
            assert_eq!(cpu.psw(PSW_P), value.count_ones() % 2 == 1, "A={value:02X}");
        }
    }

    #[test]
    fn bank_matches_summed_bank_bits() {
        let mut cpu = Cpu::new();
        for psw in 0..=255u8 {
            cpu.psw = psw;
            let summed = ((psw & PSW_RS1) + (psw & PSW_RS0)) >> 3;
            assert_eq!(cpu.bank(), summed, "PSW={psw:02X}");
        }
    }

    #[test]
    fn dptr_halves() {
        let mut cpu = Cpu::new();
        cpu.dptr_set(0x1234);
        assert_eq!((cpu.dph(), cpu.dpl()), (0x12, 0x34));
        cpu.dpl_set(0xCD);
        cpu.dph_set(0xAB);
        assert_eq!(cpu.dptr(), 0xABCD);
    }
}
