//! An instruction-accurate 8051 simulator core.
//!
//! The whole machine is one [`System`] value. A driver resets it, places a
//! program in code memory (directly or through [`hex::load_hex`]), then loops:
//!
//! ```
//! use sim8051::System;
//!
//! let mut system = System::new();
//! system.load_code(0, &[0x74, 0x03, 0x14, 0x70, 0xFD]);
//! for _ in 0..7 {
//!     let step = system.step();
//!     system.advance_peripherals(step.cycles);
//! }
//! assert_eq!(system.cpu.a, 0);
//! assert_eq!(system.cpu.pc, 5);
//! ```

mod alu;
mod cpu;
pub mod disasm;
mod error;
mod exec;
pub mod hex;
pub mod memory;
mod peripheral;
pub mod sfr;
mod system;

pub use alu::parity;
pub use cpu::Cpu;
pub use error::{Fault, HexError};
pub use exec::Step;
pub use peripheral::{CYCLES_PER_TICK, Peripherals, ticks_for_cycles};
pub use system::System;
