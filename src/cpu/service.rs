//! Runtime services: `call <name>` intrinsics and `ecall` system calls.

use std::time::Instant;

use super::decode::Service;
use super::regs::Reg;
use super::{Cpu, HaltReason};
use crate::host::{Host, parse_int_prefix};
use crate::mem::{MemError, Memory};

pub mod syscalls {
    pub const PRINT_INT: i32 = 1;
    pub const EXIT: i32 = 10;
    pub const PRINT_CHAR: i32 = 11;
    pub const EXIT_LINUX: i32 = 93;
}

/// Character codes wrap to 16 bits; surrogate halves print as U+FFFD.
fn char_text(code: i32) -> String {
    char::from_u32(code as u16 as u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string()
}

fn word_addr(base: i32, idx: i32) -> i64 {
    base as i64 + idx as i64 * 4
}

/// Runs a service intrinsic. Only memory accesses can fail.
pub fn call<H: Host + ?Sized>(
    svc: Service,
    cpu: &mut Cpu,
    mem: &mut Memory,
    host: &mut H,
    started: Instant,
) -> Result<(), MemError> {
    let a0 = cpu.regs.read(Reg::A0);
    match svc {
        Service::PutInt => host.output(&a0.to_string()),
        Service::PutCh => host.output(&char_text(a0)),
        Service::PutArray => {
            let ptr = cpu.regs.read(Reg::A1);
            let words = (0..a0.max(0))
                .map(|i| mem.read_i32(word_addr(ptr, i)).map(|w| w.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            host.output(&words.join(" "));
        }
        Service::GetInt => {
            let val = host
                .input("Input integer for getint:")
                .and_then(|line| parse_int_prefix(&line))
                .unwrap_or(0);
            cpu.regs.write(Reg::A0, val);
        }
        Service::GetCh => {
            let val = host
                .input("Input char for getch:")
                .and_then(|line| line.chars().next())
                .map_or(0, |c| c as i32);
            cpu.regs.write(Reg::A0, val);
        }
        Service::GetArray => {
            let input = host
                .input("Input integers for getarray (space separated):")
                .unwrap_or_default();
            let mut count = 0;
            for tok in input.split_whitespace() {
                let val = parse_int_prefix(tok).unwrap_or(0);
                mem.write_i32(word_addr(a0, count), val)?;
                count += 1;
            }
            cpu.regs.write(Reg::A0, count);
        }
        Service::StartTime | Service::StopTime => {
            let kind = if svc == Service::StartTime {
                "Start"
            } else {
                "Stop"
            };
            let ms = started.elapsed().as_secs_f64() * 1000.0;
            host.output(&format!("\n[Timer {kind}] Line: {a0} At: {ms:.2}ms\n"));
        }
    }
    Ok(())
}

/// Dispatches on the selector in `a7`. Returns a halt for the exit calls.
pub fn ecall<H: Host + ?Sized>(cpu: &mut Cpu, host: &mut H) -> Option<HaltReason> {
    let code = cpu.regs.read(Reg::A7);
    let a0 = cpu.regs.read(Reg::A0);
    match code {
        syscalls::PRINT_INT => host.output(&a0.to_string()),
        syscalls::PRINT_CHAR => host.output(&char_text(a0)),
        syscalls::EXIT | syscalls::EXIT_LINUX => {
            return Some(HaltReason::Exit {
                syscall: code,
                value: a0,
            });
        }
        _ => {
            tracing::warn!(code, "unknown syscall");
            host.output(&format!("\nWarning: Unknown syscall {code}"));
        }
    }
    None
}
