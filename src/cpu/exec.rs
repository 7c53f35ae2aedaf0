use std::time::Instant;

use super::decode::{Instr, Target};
use super::regs::Reg;
use super::trap::{Trap, WithPc};
use super::{Cpu, CpuStepResult, EXIT_SENTINEL, HaltReason, IntoCpuResult, Step, service};
use crate::host::Host;
use crate::mem::Memory;

fn effective_addr(base: i32, off: i32) -> i64 {
    base as i64 + off as i64
}

pub fn execute<H: Host + ?Sized>(
    cpu: &mut Cpu,
    mem: &mut Memory,
    instr: &Instr,
    host: &mut H,
    started: Instant,
) -> Result<Step, CpuStepResult> {
    let pc = cpu.pc;
    let at = pc as usize;
    let mut next = pc.wrapping_add(1);

    match instr {
        Instr::Addi { rd, rs1, imm } => cpu.regs.write(*rd, cpu.regs.read(*rs1).wrapping_add(*imm)),
        Instr::Add { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1).wrapping_add(cpu.regs.read(*rs2)))
        }
        Instr::Sub { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1).wrapping_sub(cpu.regs.read(*rs2)))
        }
        Instr::Mul { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1).wrapping_mul(cpu.regs.read(*rs2)))
        }
        Instr::Div { rd, rs1, rs2 } => {
            let divisor = cpu.regs.read(*rs2);
            let val = if divisor == 0 {
                -1
            } else {
                cpu.regs.read(*rs1).wrapping_div(divisor)
            };
            cpu.regs.write(*rd, val);
        }
        Instr::Rem { rd, rs1, rs2 } => {
            let divisor = cpu.regs.read(*rs2);
            let dividend = cpu.regs.read(*rs1);
            let val = if divisor == 0 {
                dividend
            } else {
                dividend.wrapping_rem(divisor)
            };
            cpu.regs.write(*rd, val);
        }
        Instr::Slt { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, (cpu.regs.read(*rs1) < cpu.regs.read(*rs2)) as i32)
        }
        Instr::Sgt { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, (cpu.regs.read(*rs1) > cpu.regs.read(*rs2)) as i32)
        }
        Instr::Snez { rd, rs1 } => cpu.regs.write(*rd, (cpu.regs.read(*rs1) != 0) as i32),
        Instr::Seqz { rd, rs1 } => cpu.regs.write(*rd, (cpu.regs.read(*rs1) == 0) as i32),
        Instr::And { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1) & cpu.regs.read(*rs2))
        }
        Instr::Or { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1) | cpu.regs.read(*rs2))
        }
        Instr::Xor { rd, rs1, rs2 } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1) ^ cpu.regs.read(*rs2))
        }
        // shift amount is taken mod 32
        Instr::Slli { rd, rs1, shamt } => {
            cpu.regs.write(*rd, cpu.regs.read(*rs1).wrapping_shl(*shamt as u32))
        }
        Instr::Lw { rd, base, off } => {
            let addr = effective_addr(cpu.regs.read(*base), *off);
            let word = mem.read_i32(addr).with_pc(at).into_cpu_result()?;
            cpu.regs.write(*rd, word);
        }
        Instr::Sw { src, base, off } => {
            let addr = effective_addr(cpu.regs.read(*base), *off);
            mem.write_i32(addr, cpu.regs.read(*src))
                .with_pc(at)
                .into_cpu_result()?;
        }
        Instr::J { target } => match target {
            Target::Addr(addr) => next = *addr,
            Target::Missing(name) => {
                return Err(CpuStepResult::Trapped(Trap::UndefinedLabel {
                    pc: at,
                    name: name.clone(),
                }));
            }
        },
        Instr::Branch {
            cond,
            rs1,
            rs2,
            target,
        } => {
            // an undefined label leaves the branch not taken
            if let Some(addr) = target {
                if cond.holds(cpu.regs.read(*rs1), cpu.regs.read(*rs2)) {
                    next = *addr;
                }
            }
        }
        Instr::Call { target } => match target {
            Target::Addr(addr) => {
                cpu.regs.write(Reg::RA, pc.wrapping_add(1));
                next = *addr;
            }
            Target::Missing(name) => {
                return Err(CpuStepResult::Trapped(Trap::UndefinedFunction {
                    pc: at,
                    name: name.clone(),
                }));
            }
        },
        Instr::Service(svc) => {
            service::call(*svc, cpu, mem, host, started)
                .with_pc(at)
                .into_cpu_result()?;
        }
        Instr::Ret => {
            let target = cpu.regs.read(Reg::RA);
            if target == EXIT_SENTINEL {
                let value = cpu.regs.read(Reg::A0);
                return Err(CpuStepResult::Halt(HaltReason::Return { value }));
            }
            next = target;
        }
        Instr::Ecall => {
            if let Some(halt) = service::ecall(cpu, host) {
                return Err(CpuStepResult::Halt(halt));
            }
        }
        Instr::Li { rd, imm } => cpu.regs.write(*rd, *imm),
        Instr::Mv { rd, rs1 } => cpu.regs.write(*rd, cpu.regs.read(*rs1)),
        Instr::La { rd, target } => match target {
            Target::Addr(addr) => cpu.regs.write(*rd, *addr),
            Target::Missing(name) => {
                return Err(CpuStepResult::Trapped(Trap::UndefinedSymbol {
                    pc: at,
                    name: name.clone(),
                }));
            }
        },
        Instr::Unknown { mnemonic } => {
            tracing::debug!(pc, mnemonic = %mnemonic, "ignoring unsupported instruction");
            cpu.pc = next;
            return Ok(Step::Ignored);
        }
        Instr::Malformed { reason } => {
            return Err(CpuStepResult::Trapped(Trap::Malformed {
                pc: at,
                reason: reason.clone(),
            }));
        }
    }

    cpu.pc = next;
    Ok(Step::Continue)
}
