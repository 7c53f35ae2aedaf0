use crate::asm::Program;
use crate::cpu::Cpu;
use crate::cpu::regs::Reg;

pub fn trace(cpu: &Cpu, program: &Program, step: u64) {
    let line = usize::try_from(cpu.pc)
        .ok()
        .and_then(|idx| program.lines.get(idx))
        .map_or("?", |l| l.text.as_str());
    tracing::trace!(
        target: "riscv_interp::trace",
        "[{:08}] pc={:<5} {:<28} ra={} sp=0x{:x} a0={} a1={}",
        step,
        cpu.pc,
        line,
        cpu.regs.read(Reg::RA),
        cpu.regs.read(Reg::SP),
        cpu.regs.read(Reg::A0),
        cpu.regs.read(Reg::A1)
    );
}
