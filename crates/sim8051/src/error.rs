use thiserror::Error;

/// A recoverable fault raised while executing or accessing the bus.
///
/// Faults never stop the simulator: every fault path has a defined fallback
/// (reads return zero, writes are dropped, unknown opcodes act as a no-op).
/// The fault is logged and handed back to the driver through
/// [`crate::Step::fault`] so the driver can decide whether to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("read from unknown SFR address 0x{addr:02X}")]
    UnknownSfrRead { addr: u8 },
    #[error("write of 0x{value:02X} to unknown SFR address 0x{addr:02X}")]
    UnknownSfrWrite { addr: u8, value: u8 },
    #[error("unknown opcode 0x{opcode:02X} at 0x{addr:04X}")]
    UnknownOpcode { opcode: u8, addr: u16 },
    #[error("register index {index} is out of range (R0-R7)")]
    InvalidRegister { index: u8 },
    #[error("pointer register index {index} is out of range (@R0/@R1)")]
    InvalidPointer { index: u8 },
}

/// Failure to load an Intel HEX program image.
#[derive(Debug, Error)]
pub enum HexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: record does not start with ':'")]
    MissingColon { line: usize },
    #[error("line {line}: cannot parse record header")]
    BadHeader { line: usize },
    #[error("line {line}: malformed data or checksum field")]
    BadData { line: usize },
    #[error("line {line}: record is shorter than its byte count")]
    Truncated { line: usize },
    #[error("line {line}: checksum mismatch (expected 0x{expected:02X}, found 0x{found:02X})")]
    BadChecksum { line: usize, expected: u8, found: u8 },
}
