//! SFR (special-function register) addresses and bit masks for the 8051.

/// Direct addresses from here up select SFRs; below it, internal RAM.
pub const SFR_BASE: u8 = 0x80;
/// P0 latch. Reads back whatever was last written.
pub const SFR_P0: u8 = 0x80;
/// SP: address of the last byte pushed. Reset value 0x07.
pub const SFR_SP: u8 = 0x81;
/// DPL, low half of DPTR.
pub const SFR_DPL: u8 = 0x82;
/// DPH, high half of DPTR.
pub const SFR_DPH: u8 = 0x83;
/// PCON. Stored only.
pub const SFR_PCON: u8 = 0x87;
/// TCON: TR0/TR1 start the timers, TF0/TF1 latch their overflows.
pub const SFR_TCON: u8 = 0x88;
/// TMOD: low nibble configures timer 0, high nibble timer 1.
pub const SFR_TMOD: u8 = 0x89;
pub const SFR_TL0: u8 = 0x8A;
pub const SFR_TL1: u8 = 0x8B;
pub const SFR_TH0: u8 = 0x8C;
pub const SFR_TH1: u8 = 0x8D;
pub const SFR_P1: u8 = 0x90;
/// SCON and SBUF are plain storage; there is no UART.
pub const SFR_SCON: u8 = 0x98;
pub const SFR_SBUF: u8 = 0x99;
/// P2. Also the page (high address byte) for `MOVX @Ri`.
pub const SFR_P2: u8 = 0xA0;
/// IE and IP are stored but no interrupt is ever taken.
pub const SFR_IE: u8 = 0xA8;
/// P3. Bits 2 and 3 are the INT0/INT1 pins seen by the timer gates.
pub const SFR_P3: u8 = 0xB0;
pub const SFR_IP: u8 = 0xB8;
/// PSW, held in the CPU register file rather than the peripherals.
pub const SFR_PSW: u8 = 0xD0;
/// ACC. Writing it updates PSW.P.
pub const SFR_A: u8 = 0xE0;
/// B, the second operand and result half of MUL/DIV.
pub const SFR_B: u8 = 0xF0;

pub const PSW_CY: u8 = 0x80;
/// Set by ADD/SUBB on a carry or borrow across bit 3.
pub const PSW_AC: u8 = 0x40;
pub const PSW_F0: u8 = 0x20;
/// RS1:RS0 pick which of the four register banks R0-R7 name.
pub const PSW_RS1: u8 = 0x10;
pub const PSW_RS0: u8 = 0x08;
/// Signed overflow from ADD/SUBB, product above 0xFF from MUL, or DIV by zero.
pub const PSW_OV: u8 = 0x04;
pub const PSW_RES: u8 = 0x02;
/// Odd parity of A.
pub const PSW_P: u8 = 0x01;

pub const TCON_TF1: u8 = 0x80;
pub const TCON_TR1: u8 = 0x40;
pub const TCON_TF0: u8 = 0x20;
pub const TCON_TR0: u8 = 0x10;
pub const TCON_IE1: u8 = 0x08;
pub const TCON_IT1: u8 = 0x04;
pub const TCON_IE0: u8 = 0x02;
pub const TCON_IT0: u8 = 0x01;

/// With GATE1 set, timer 1 needs both TR1 and P3.3 high to count.
pub const TMOD_GATE1: u8 = 0x80;
/// Ignored: there are no external count inputs.
pub const TMOD_CT1: u8 = 0x40;
pub const TMOD_M1_MASK: u8 = 0x30;
/// With GATE0 set, timer 0 needs both TR0 and P3.2 high to count.
pub const TMOD_GATE0: u8 = 0x08;
pub const TMOD_CT0: u8 = 0x04;
pub const TMOD_M0_MASK: u8 = 0x03;

pub const P3_INT0: u8 = 0x04;
pub const P3_INT1: u8 = 0x08;

/// Returns the conventional name of a special-function register, if `addr`
/// is one this simulator implements.
pub fn sfr_name(addr: u8) -> Option<&'static str> {
    Some(match addr {
        SFR_P0 => "P0",
        SFR_SP => "SP",
        SFR_DPL => "DPL",
        SFR_DPH => "DPH",
        SFR_PCON => "PCON",
        SFR_TCON => "TCON",
        SFR_TMOD => "TMOD",
        SFR_TL0 => "TL0",
        SFR_TL1 => "TL1",
        SFR_TH0 => "TH0",
        SFR_TH1 => "TH1",
        SFR_P1 => "P1",
        SFR_SCON => "SCON",
        SFR_SBUF => "SBUF",
        SFR_P2 => "P2",
        SFR_IE => "IE",
        SFR_P3 => "P3",
        SFR_IP => "IP",
        SFR_PSW => "PSW",
        SFR_A => "ACC",
        SFR_B => "B",
        _ => return None,
    })
}
