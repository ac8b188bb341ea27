use crate::sfr::*;

/// Oscillator cycles per timer tick (one machine cycle).
pub const CYCLES_PER_TICK: u64 = 12;

/// Timer ticks for a span of elapsed cycles. Every advance counts at least
/// one tick, even when fewer than [`CYCLES_PER_TICK`] cycles elapsed.
pub fn ticks_for_cycles(elapsed: u64) -> u64 {
    (elapsed / CYCLES_PER_TICK).max(1)
}

/// Peripheral special-function registers: the two timers, ports, and the
/// serial/interrupt/power registers (stored, but without behaviour).
///
/// TCON:
///
/// `[TF1, TR1, TF0, TR0, IE1, IT1, IE0, IT0]`
///
/// TMOD:
///
/// `[GATE1, C/T1, T1M1, T1M0, GATE0, C/T0, T0M1, T0M0]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peripherals {
    pub tcon: u8,
    pub tmod: u8,
    pub tl0: u8,
    pub th0: u8,
    pub tl1: u8,
    pub th1: u8,
    pub scon: u8,
    pub sbuf: u8,
    pub p0: u8,
    pub p1: u8,
    pub p2: u8,
    pub p3: u8,
    pub ie: u8,
    pub ip: u8,
    pub pcon: u8,
}

impl Peripherals {
    /// Power-on state: ports float high, everything else zero.
    pub fn new() -> Self {
        Self {
            p0: 0xFF,
            p1: 0xFF,
            p2: 0xFF,
            p3: 0xFF,
            ..Default::default()
        }
    }

    fn register_mut(&mut self, addr: u8) -> Option<&mut u8> {
        Some(match addr {
            SFR_TCON => &mut self.tcon,
            SFR_TMOD => &mut self.tmod,
            SFR_TL0 => &mut self.tl0,
            SFR_TH0 => &mut self.th0,
            SFR_TL1 => &mut self.tl1,
            SFR_TH1 => &mut self.th1,
            SFR_SCON => &mut self.scon,
            SFR_SBUF => &mut self.sbuf,
            SFR_P0 => &mut self.p0,
            SFR_P1 => &mut self.p1,
            SFR_P2 => &mut self.p2,
            SFR_P3 => &mut self.p3,
            SFR_IE => &mut self.ie,
            SFR_IP => &mut self.ip,
            SFR_PCON => &mut self.pcon,
            _ => return None,
        })
    }

    /// Read a peripheral register, or `None` if `addr` is not one.
    pub fn read(&self, addr: u8) -> Option<u8> {
        Some(match addr {
            SFR_TCON => self.tcon,
            SFR_TMOD => self.tmod,
            SFR_TL0 => self.tl0,
            SFR_TH0 => self.th0,
            SFR_TL1 => self.tl1,
            SFR_TH1 => self.th1,
            SFR_SCON => self.scon,
            SFR_SBUF => self.sbuf,
            SFR_P0 => self.p0,
            SFR_P1 => self.p1,
            SFR_P2 => self.p2,
            SFR_P3 => self.p3,
            SFR_IE => self.ie,
            SFR_IP => self.ip,
            SFR_PCON => self.pcon,
            _ => return None,
        })
    }

    /// Write a peripheral register. Returns `false` if `addr` is not one.
    pub fn write(&mut self, addr: u8, value: u8) -> bool {
        match self.register_mut(addr) {
            Some(reg) => {
                *reg = value;
                true
            }
            None => false,
        }
    }

    fn timer0_running(&self) -> bool {
        self.tcon & TCON_TR0 != 0 && (self.tmod & TMOD_GATE0 == 0 || self.p3 & P3_INT0 != 0)
    }

    fn timer1_running(&self) -> bool {
        self.tcon & TCON_TR1 != 0 && (self.tmod & TMOD_GATE1 == 0 || self.p3 & P3_INT1 != 0)
    }

    /// Advance both timers by `ticks` machine cycles.
    pub fn advance_timers(&mut self, ticks: u64) {
        let t0_mode = self.tmod & TMOD_M0_MASK;
        let t1_mode = (self.tmod & TMOD_M1_MASK) >> 4;

        if t0_mode == 3 {
            // Split mode: TL0 runs on TR0/TF0, TH0 takes over TR1/TF1 and
            // timer 1 stops.
            if self.timer0_running() {
                let (tl0, overflow) = count8(self.tl0, ticks);
                self.tl0 = tl0;
                if overflow {
                    self.tcon |= TCON_TF0;
                }
            }
            if self.tcon & TCON_TR1 != 0 {
                let (th0, overflow) = count8(self.th0, ticks);
                self.th0 = th0;
                if overflow {
                    self.tcon |= TCON_TF1;
                }
            }
            return;
        }

        if self.timer0_running() {
            let (th0, tl0, overflow) = count(t0_mode, self.th0, self.tl0, ticks);
            self.th0 = th0;
            self.tl0 = tl0;
            if overflow {
                self.tcon |= TCON_TF0;
            }
        }

        if self.timer1_running() {
            let (th1, tl1, overflow) = count(t1_mode, self.th1, self.tl1, ticks);
            self.th1 = th1;
            self.tl1 = tl1;
            if overflow {
                self.tcon |= TCON_TF1;
            }
        }
    }
}

/// Free-running 8-bit count. Returns `(count, overflowed)`.
fn count8(value: u8, ticks: u64) -> (u8, bool) {
    let count = value as u64 + ticks;
    (count as u8, count > 0xFF)
}

/// Count one timer in modes 0-2. Returns `(TH, TL, overflowed)`. Mode 3
/// holds the count.
fn count(mode: u8, th: u8, tl: u8, ticks: u64) -> (u8, u8, bool) {
    match mode {
        0 => {
            let count = ((th as u64) << 5 | (tl & 0x1F) as u64) + ticks;
            let wrapped = count & 0x1FFF;
            ((wrapped >> 5) as u8, (wrapped & 0x1F) as u8, count > 0x1FFF)
        }
        1 => {
            let count = ((th as u64) << 8 | tl as u64) + ticks;
            ((count >> 8) as u8, count as u8, count > 0xFFFF)
        }
        2 => {
            let count = tl as u64 + ticks;
            if count > 0xFF {
                let period = 0x100 - th as u64;
                let surplus = (count - 0x100) % period;
                (th, (th as u64 + surplus) as u8, true)
            } else {
                (th, count as u8, false)
            }
        }
        _ => (th, tl, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_round_down_with_floor_of_one() {
        assert_eq!(ticks_for_cycles(0), 1);
        assert_eq!(ticks_for_cycles(11), 1);
        assert_eq!(ticks_for_cycles(12), 1);
        assert_eq!(ticks_for_cycles(24), 2);
        assert_eq!(ticks_for_cycles(48), 4);
    }

    #[test]
    fn mode1_overflow_wraps_to_zero() {
        let mut p = Peripherals::new();
        p.tmod = 0x01;
        p.tcon = TCON_TR0;
        p.th0 = 0xFF;
        p.tl0 = 0xFE;
        p.advance_timers(2);
        assert_eq!((p.th0, p.tl0), (0x00, 0x00));
        assert_ne!(p.tcon & TCON_TF0, 0);
    }

    #[test]
    fn mode1_carries_into_high_byte() {
        let mut p = Peripherals::new();
        p.tmod = 0x10;
        p.tcon = TCON_TR1;
        p.th1 = 0x12;
        p.tl1 = 0xFF;
        p.advance_timers(1);
        assert_eq!((p.th1, p.tl1), (0x13, 0x00));
        assert_eq!(p.tcon & TCON_TF1, 0);
    }

    #[test]
    fn mode0_is_thirteen_bits() {
        let mut p = Peripherals::new();
        p.tmod = 0x00;
        p.tcon = TCON_TR0;
        p.th0 = 0xFF;
        p.tl0 = 0x1E;
        p.advance_timers(1);
        assert_eq!((p.th0, p.tl0), (0xFF, 0x1F));
        assert_eq!(p.tcon & TCON_TF0, 0);
        p.advance_timers(1);
        assert_eq!((p.th0, p.tl0), (0x00, 0x00));
        assert_ne!(p.tcon & TCON_TF0, 0);
    }

    #[test]
    fn mode2_reloads_from_high_byte() {
        let mut p = Peripherals::new();
        p.tmod = 0x20;
        p.tcon = TCON_TR1;
        p.th1 = 0xF0;
        p.tl1 = 0xFE;
        p.advance_timers(4);
        // 0xFF, reload to 0xF0, 0xF1, 0xF2
        assert_eq!((p.th1, p.tl1), (0xF0, 0xF2));
        assert_ne!(p.tcon & TCON_TF1, 0);
    }

    #[test]
    fn mode2_reloads_on_every_overflow() {
        let mut p = Peripherals::new();
        p.tmod = 0x02;
        p.tcon = TCON_TR0;
        p.th0 = 0xFE;
        p.tl0 = 0xFF;
        // 0xFE, 0xFF, 0xFE, 0xFF: two reloads in one advance
        p.advance_timers(4);
        assert_eq!((p.th0, p.tl0), (0xFE, 0xFF));
        assert_ne!(p.tcon & TCON_TF0, 0);

        // reload value 0 gives a full 256-tick period
        p.th0 = 0x00;
        p.tl0 = 0x00;
        p.tcon = TCON_TR0;
        p.advance_timers(600);
        assert_eq!((p.th0, p.tl0), (0x00, 0x58));
        assert_ne!(p.tcon & TCON_TF0, 0);
    }

    #[test]
    fn timer1_mode3_holds_count() {
        let mut p = Peripherals::new();
        p.tmod = 0x30;
        p.tcon = TCON_TR1;
        p.th1 = 0x34;
        p.tl1 = 0xFF;
        p.advance_timers(10);
        assert_eq!((p.th1, p.tl1), (0x34, 0xFF));
        assert_eq!(p.tcon & TCON_TF1, 0);
    }

    #[test]
    fn mode3_splits_timer0() {
        let mut p = Peripherals::new();
        p.tmod = 0x03 | 0x10;
        p.tcon = TCON_TR0 | TCON_TR1;
        p.tl0 = 0xFF;
        p.th0 = 0x10;
        p.tl1 = 0x55;
        p.advance_timers(1);
        assert_eq!(p.tl0, 0x00);
        assert_eq!(p.th0, 0x11);
        assert_eq!(p.tcon & (TCON_TF0 | TCON_TF1), TCON_TF0);
        // timer 1 is stopped while timer 0 is split
        assert_eq!(p.tl1, 0x55);
    }

    #[test]
    fn stopped_timer_holds() {
        let mut p = Peripherals::new();
        p.tmod = 0x11;
        p.tl0 = 0x10;
        p.tl1 = 0x20;
        p.advance_timers(5);
        assert_eq!((p.tl0, p.tl1), (0x10, 0x20));
    }

    #[test]
    fn gate_requires_int_pin() {
        let mut p = Peripherals::new();
        p.tmod = TMOD_GATE0 | 0x01;
        p.tcon = TCON_TR0;
        p.p3 = !P3_INT0;
        p.advance_timers(3);
        assert_eq!(p.tl0, 0);
        p.p3 = 0xFF;
        p.advance_timers(3);
        assert_eq!(p.tl0, 3);
    }

    #[test]
    fn unknown_register_is_rejected() {
        let mut p = Peripherals::new();
        assert_eq!(p.read(0xC8), None);
        assert!(!p.write(0xC8, 1));
        assert!(p.write(SFR_TH1, 7));
        assert_eq!(p.read(SFR_TH1), Some(7));
    }
}
