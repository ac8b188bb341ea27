//! Instruction decoding to assembler text, used for trace output.

use std::fmt;

use crate::sfr::sfr_name;
use crate::system::System;

/// A direct address operand: register-bank RAM, general RAM, or an SFR.
#[derive(Clone, Copy)]
enum Direct {
    Ram(u8),
    Sfr(u8),
}

impl From<u8> for Direct {
    fn from(value: u8) -> Self {
        if value < 0x80 {
            Self::Ram(value)
        } else {
            Self::Sfr(value)
        }
    }
}

impl fmt::Display for Direct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Ram(value @ 0x00..=0x1F) => write!(f, "R{}.BANK{}", value % 8, value / 8),
            Self::Ram(value) => write!(f, "{value:02X}h"),
            Self::Sfr(value) => match sfr_name(value) {
                Some(name) => f.write_str(name),
                None => write!(f, "{value:02X}h"),
            },
        }
    }
}

/// A bit address operand, shown as `byte.bit`.
#[derive(Clone, Copy)]
struct Bit(u8);

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (addr, _) = System::bit_location(self.0);
        write!(f, "{}.{}", Direct::from(addr), self.0 & 0x07)
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub bytes: Vec<u8>,
    pub text: String,
}

impl Decoded {
    /// The raw bytes as space-separated hex.
    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9} {}", self.hex(), self.text)
    }
}

/// Operand text for the low-nibble source layout shared by the
/// `A,<src>` families. `operand` is the byte following the opcode, if any.
fn source(opcode: u8, operand: u8) -> String {
    match opcode & 0x0F {
        0x04 => format!("#{operand:02X}h"),
        0x05 => Direct::from(operand).to_string(),
        0x06 | 0x07 => format!("@R{}", opcode & 0x01),
        _ => format!("R{}", opcode & 0x07),
    }
}

/// Instruction length for the `A,<src>` layout.
fn source_len(opcode: u8) -> usize {
    if matches!(opcode & 0x0F, 0x04 | 0x05) { 2 } else { 1 }
}

/// Decode the instruction at `pc` without executing it.
pub fn decode(system: &System, pc: u16) -> Decoded {
    let byte = |n: u16| system.read_code(pc.wrapping_add(n));
    let op = byte(0);
    let b1 = byte(1);
    let b2 = byte(2);
    // Branch targets are relative to the end of the instruction.
    let rel = |len: u16, offset: u8| pc.wrapping_add(len).wrapping_add(offset as i8 as u16);

    let (len, text): (usize, String) = match op {
        op if op & 0x1F == 0x01 => (
            2,
            format!("AJMP {:04X}h", System::page_target(pc.wrapping_add(2), op, b1)),
        ),
        op if op & 0x1F == 0x11 => (
            2,
            format!("ACALL {:04X}h", System::page_target(pc.wrapping_add(2), op, b1)),
        ),
        0x00 => (1, "NOP".into()),
        0x02 => (3, format!("LJMP {:04X}h", (b1 as u16) << 8 | b2 as u16)),
        0x12 => (3, format!("LCALL {:04X}h", (b1 as u16) << 8 | b2 as u16)),
        0x22 => (1, "RET".into()),
        0x80 => (2, format!("SJMP {:04X}h", rel(2, b1))),
        0x10 => (3, format!("JBC {},{:04X}h", Bit(b1), rel(3, b2))),
        0x20 => (3, format!("JB {},{:04X}h", Bit(b1), rel(3, b2))),
        0x30 => (3, format!("JNB {},{:04X}h", Bit(b1), rel(3, b2))),
        0x40 => (2, format!("JC {:04X}h", rel(2, b1))),
        0x50 => (2, format!("JNC {:04X}h", rel(2, b1))),
        0x60 => (2, format!("JZ {:04X}h", rel(2, b1))),
        0x70 => (2, format!("JNZ {:04X}h", rel(2, b1))),
        0xD5 => (3, format!("DJNZ {},{:04X}h", Direct::from(b1), rel(3, b2))),
        0xD8..=0xDF => (2, format!("DJNZ R{},{:04X}h", op & 0x07, rel(2, b1))),
        0xB4 => (3, format!("CJNE A,#{b1:02X}h,{:04X}h", rel(3, b2))),
        0xB5 => (3, format!("CJNE A,{},{:04X}h", Direct::from(b1), rel(3, b2))),
        0xB6 | 0xB7 => (3, format!("CJNE @R{},#{b1:02X}h,{:04X}h", op & 0x01, rel(3, b2))),
        0xB8..=0xBF => (3, format!("CJNE R{},#{b1:02X}h,{:04X}h", op & 0x07, rel(3, b2))),

        0x74 => (2, format!("MOV A,#{b1:02X}h")),
        0xE5..=0xEF => (source_len(op), format!("MOV A,{}", source(op, b1))),
        0xF6 | 0xF7 => (1, format!("MOV @R{},A", op & 0x01)),
        0xF8..=0xFF => (1, format!("MOV R{},A", op & 0x07)),
        0x85 => (3, format!("MOV {},{}", Direct::from(b2), Direct::from(b1))),
        0xC0 => (2, format!("PUSH {}", Direct::from(b1))),
        0xD0 => (2, format!("POP {}", Direct::from(b1))),

        0x24..=0x2F => (source_len(op), format!("ADD A,{}", source(op, b1))),
        0x94..=0x9F => (source_len(op), format!("SUBB A,{}", source(op, b1))),
        0x44..=0x4F => (source_len(op), format!("ORL A,{}", source(op, b1))),
        0x54..=0x5F => (source_len(op), format!("ANL A,{}", source(op, b1))),
        0x64..=0x6F => (source_len(op), format!("XRL A,{}", source(op, b1))),
        0xA4 => (1, "MUL AB".into()),
        0x84 => (1, "DIV AB".into()),

        0x04 => (1, "INC A".into()),
        0x06 | 0x07 => (1, format!("INC @R{}", op & 0x01)),
        0x08..=0x0F => (1, format!("INC R{}", op & 0x07)),
        0x14 => (1, "DEC A".into()),
        0x16 | 0x17 => (1, format!("DEC @R{}", op & 0x01)),
        0x18..=0x1F => (1, format!("DEC R{}", op & 0x07)),

        0x03 => (1, "RR A".into()),
        0x13 => (1, "RRC A".into()),
        0x23 => (1, "RL A".into()),
        0x33 => (1, "RLC A".into()),
        0xC4 => (1, "SWAP A".into()),

        0xC3 => (1, "CLR C".into()),
        0xD3 => (1, "SETB C".into()),
        0xB3 => (1, "CPL C".into()),
        0xC2 => (2, format!("CLR {}", Bit(b1))),
        0xD2 => (2, format!("SETB {}", Bit(b1))),
        0xB2 => (2, format!("CPL {}", Bit(b1))),
        0xA2 => (2, format!("MOV C,{}", Bit(b1))),
        0x92 => (2, format!("MOV {},C", Bit(b1))),
        0x82 => (2, format!("ANL C,{}", Bit(b1))),
        0xB0 => (2, format!("ANL C,/{}", Bit(b1))),
        0x72 => (2, format!("ORL C,{}", Bit(b1))),
        0xA0 => (2, format!("ORL C,/{}", Bit(b1))),

        0x90 => (3, format!("MOV DPTR,#{:04X}h", (b1 as u16) << 8 | b2 as u16)),
        0xA3 => (1, "INC DPTR".into()),
        0x93 => (1, "MOVC A,@A+DPTR".into()),
        0x83 => (1, "MOVC A,@A+PC".into()),
        0xE0 => (1, "MOVX A,@DPTR".into()),
        0xF0 => (1, "MOVX @DPTR,A".into()),
        0xE2 | 0xE3 => (1, format!("MOVX A,@R{}", op & 0x01)),
        0xF2 | 0xF3 => (1, format!("MOVX @R{},A", op & 0x01)),

        _ => (1, "???".into()),
    };

    let bytes = (0..len as u16).map(byte).collect();
    Decoded { bytes, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_bytes(at: u16, program: &[u8]) -> Decoded {
        let mut sys = System::new();
        sys.load_code(at, program);
        decode(&sys, at)
    }

    #[test]
    fn decodes_immediate_and_register_forms() {
        assert_eq!(decode_bytes(0, &[0x74, 0x03]).text, "MOV A,#03h");
        assert_eq!(decode_bytes(0, &[0x2B]).text, "ADD A,R3");
        assert_eq!(decode_bytes(0, &[0x97]).text, "SUBB A,@R1");
        assert_eq!(decode_bytes(0, &[0x55, 0xF0]).text, "ANL A,B");
        assert_eq!(decode_bytes(0, &[0x65, 0x30]).text, "XRL A,30h");
    }

    #[test]
    fn decodes_branch_targets() {
        let jnz = decode_bytes(0, &[0x74, 0x03, 0x14, 0x70, 0xFD]);
        assert_eq!(jnz.bytes, vec![0x74, 0x03]);
        assert_eq!(decode_bytes(3, &[0x70, 0xFD]).text, "JNZ 0002h");
        assert_eq!(decode_bytes(0x2001, &[0xA1, 0x10]).text, "AJMP 2510h");
        assert_eq!(decode_bytes(0, &[0x12, 0x12, 0x34]).text, "LCALL 1234h");
        assert_eq!(decode_bytes(0, &[0xB4, 0x10, 0x00]).text, "CJNE A,#10h,0003h");
    }

    #[test]
    fn decodes_bit_and_direct_operands() {
        assert_eq!(decode_bytes(0, &[0xD2, 0xE7]).text, "SETB ACC.7");
        assert_eq!(decode_bytes(0, &[0xC2, 0x09]).text, "CLR 21h.1");
        assert_eq!(decode_bytes(0, &[0x10, 0x8D, 0x00]).text, "JBC TCON.5,0003h");
        assert_eq!(decode_bytes(0, &[0x85, 0x08, 0x30]).text, "MOV 30h,R0.BANK1");
        assert_eq!(decode_bytes(0, &[0xC0, 0xC8]).text, "PUSH C8h");
    }

    #[test]
    fn unknown_opcode_is_one_byte() {
        let decoded = decode_bytes(0, &[0xA5, 0x00]);
        assert_eq!(decoded.text, "???");
        assert_eq!(decoded.hex(), "A5");
    }
}
