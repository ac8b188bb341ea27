use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use sim8051::sfr::*;
use sim8051::{System, hex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Intel HEX image to load
    #[arg(value_name = "HEX_FILE")]
    hex_file: PathBuf,

    /// Maximum number of instructions to execute
    #[arg(short, long)]
    max_instructions: Option<u64>,

    /// Log every instruction with the register file
    #[arg(short, long)]
    trace: bool,

    /// Fetch all code from the external bank (EA low)
    #[arg(long)]
    external_only: bool,

    /// Keep running when the program reaches `SJMP $`
    #[arg(long)]
    no_halt_on_loop: bool,
}

/// Whether the instruction just executed from `pc` was `SJMP $`, the
/// conventional end-of-program idle loop.
fn ran_self_loop(system: &System, pc: u16) -> bool {
    system.cpu.pc == pc
        && system.read_code(pc) == 0x80
        && system.read_code(pc.wrapping_add(1)) == 0xFE
}

fn log_registers(system: &System) {
    let cpu = &system.cpu;
    info!(
        "A={:02X} B={:02X} DPTR={:04X} SP={:02X} PSW={:02X} C={} OV={} AC={} P={}",
        cpu.a(),
        cpu.b(),
        cpu.dptr(),
        cpu.sp,
        cpu.psw,
        cpu.psw(PSW_CY) as u8,
        cpu.psw(PSW_OV) as u8,
        cpu.psw(PSW_AC) as u8,
        cpu.psw(PSW_P) as u8,
    );
    let regs = (0..8)
        .map(|i| format!("R{i}={:02X}", system.r(i)))
        .collect::<Vec<_>>()
        .join(" ");
    info!("bank {} {regs}", cpu.bank());
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.trace { "trace" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut system = System::new();
    if args.external_only {
        system.set_external_access(false);
    }
    let summary = hex::load_hex_file(&mut system, &args.hex_file)?;
    info!(
        "loaded {} bytes in {} records from {}",
        summary.bytes,
        summary.records,
        args.hex_file.display()
    );

    let mut instructions = 0u64;
    let mut faults = 0u64;
    loop {
        if args.max_instructions.is_some_and(|max| instructions >= max) {
            info!("instruction limit reached at 0x{:04X}", system.cpu.pc);
            break;
        }

        let pc = system.cpu.pc;
        let before = system.cpu.cycles;
        let step = system.step();
        // already logged by the core; execution continues
        if step.fault.is_some() {
            faults += 1;
        }
        system.advance_peripherals(system.cpu.cycles - before);
        instructions += 1;

        if !args.no_halt_on_loop && ran_self_loop(&system, pc) {
            info!("idle loop at 0x{pc:04X}");
            break;
        }
    }

    info!(
        "halted at 0x{:04X} after {instructions} instructions, {} cycles, {faults} faults",
        system.cpu.pc, system.cpu.cycles
    );
    log_registers(&system);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_loop_detected_after_it_runs() {
        // MOV A,#1 ; SJMP $
        let mut system = System::new();
        system.load_code(0, &[0x74, 0x01, 0x80, 0xFE]);

        system.step();
        assert!(!ran_self_loop(&system, 0x0000));

        let pc = system.cpu.pc;
        system.step();
        assert!(ran_self_loop(&system, pc));
        assert_eq!(system.cpu.pc, 0x0002);
    }

    #[test]
    fn short_jump_elsewhere_is_not_idle() {
        // SJMP +0 falls through to the next instruction
        let mut system = System::new();
        system.load_code(0, &[0x80, 0x00, 0x80, 0xFE]);
        system.step();
        assert!(!ran_self_loop(&system, 0x0000));
    }
}
