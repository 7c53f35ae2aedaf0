pub mod decode;
pub mod exec;
pub mod regs;
pub mod service;
pub mod trap;

use std::fmt;
use std::time::Instant;

use crate::asm::{self, LoadError, Program};
use crate::config::MachineConfig;
use crate::host::Host;
use crate::mem::Memory;
use self::regs::{Reg, Regs};
use self::trap::Trap;

/// Link register value meaning "return to the host".
pub const EXIT_SENTINEL: i32 = -1;

/// Initial stack pointer sits this far below the top of memory.
pub const STACK_TOP_GAP: usize = 0x100;

/// Stack pointer for a fresh machine. Memory past the 31-bit address range
/// is unreachable from a register, so the stack starts below 2 GiB at most.
pub fn initial_sp(memory_bytes: usize) -> i32 {
    let top = memory_bytes.min(1 << 31);
    i32::try_from(top.saturating_sub(STACK_TOP_GAP)).unwrap_or(i32::MAX)
}

pub(crate) trait IntoCpuResult<T> {
    fn into_cpu_result(self) -> Result<T, CpuStepResult>;
}

impl<T> IntoCpuResult<T> for Result<T, Trap> {
    fn into_cpu_result(self) -> Result<T, CpuStepResult> {
        self.map_err(CpuStepResult::Trapped)
    }
}

#[derive(Default, Debug)]
pub struct Cpu {
    pub regs: Regs,
    /// Index into the program's instruction list.
    pub pc: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// `ret` found the exit sentinel in `ra`.
    Return { value: i32 },
    /// Exit system call.
    Exit { syscall: i32, value: i32 },
    /// The program counter left the instruction list.
    PcOutOfRange { pc: i32 },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Return { value } => write!(f, "returned {value}"),
            HaltReason::Exit { syscall, value } => write!(f, "exit syscall {syscall} with {value}"),
            HaltReason::PcOutOfRange { pc } => write!(f, "pc {pc} outside program"),
        }
    }
}

/// Terminal transitions of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuStepResult {
    Halt(HaltReason),
    Trapped(Trap),
}

/// Non-terminal outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The instruction was outside the modeled subset and skipped.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Returned(i32),
    Exited { syscall: i32, value: i32 },
    Timeout { steps: u64 },
    Fault { trap: Trap, line: String },
    NoEntry,
    PcOutOfRange { pc: i32 },
    LoadFailed(LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Instructions executed.
    pub steps: u64,
    /// How many of those were ignored mnemonics.
    pub ignored: u64,
}

impl RunReport {
    /// The guest's return value, present only for a normal return or exit.
    pub fn value(&self) -> Option<i32> {
        match self.outcome {
            RunOutcome::Returned(v) => Some(v),
            RunOutcome::Exited { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Register file, memory and loaded program of one interpreter instance.
/// Runs are strictly sequential: `load` resets everything before assembling.
pub struct Machine {
    pub cpu: Cpu,
    pub mem: Memory,
    pub program: Program,
    config: MachineConfig,
    started: Instant,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        let mut machine = Self {
            cpu: Cpu::default(),
            mem: Memory::new(0),
            program: Program::default(),
            config,
            started: Instant::now(),
        };
        machine.reset();
        machine
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Fresh registers, zeroed memory, empty program.
    pub fn reset(&mut self) {
        self.mem = Memory::new(self.config.memory_bytes);
        self.cpu = Cpu::default();
        self.cpu
            .regs
            .write(Reg::SP, initial_sp(self.config.memory_bytes));
        self.program = Program::default();
    }

    pub fn load(&mut self, source: &str) -> Result<(), LoadError> {
        self.reset();
        self.program = asm::assemble(source, &mut self.mem, self.config.data_base)?;
        Ok(())
    }

    /// Executes the instruction at the current pc.
    pub fn step<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<Step, CpuStepResult> {
        let pc = self.cpu.pc;
        let Some(line) = usize::try_from(pc)
            .ok()
            .and_then(|idx| self.program.lines.get(idx))
        else {
            return Err(CpuStepResult::Halt(HaltReason::PcOutOfRange { pc }));
        };
        exec::execute(&mut self.cpu, &mut self.mem, &line.instr, host, self.started)
    }

    /// Runs the loaded program from `main` until it returns, exits, faults or
    /// exhausts the step budget. Terminal diagnostics go through `host`.
    pub fn run<H: Host + ?Sized>(&mut self, host: &mut H) -> RunReport {
        let mut steps = 0;
        let mut ignored = 0;
        let finish = |outcome, steps, ignored| RunReport {
            outcome,
            steps,
            ignored,
        };

        let Some(entry) = self.program.entry() else {
            host.output("Error: 'main' label not found.");
            return finish(RunOutcome::NoEntry, 0, 0);
        };
        self.cpu.regs.write(Reg::RA, EXIT_SENTINEL);
        self.cpu.pc = entry;
        self.started = Instant::now();

        loop {
            if steps >= self.config.max_steps {
                tracing::warn!(steps, "step limit reached");
                host.output("\n[Error] Execution timeout (infinite loop?)");
                return finish(RunOutcome::Timeout { steps }, steps, ignored);
            }
            if self.config.trace {
                crate::debug::trace(&self.cpu, &self.program, steps);
            }

            match self.step(host) {
                Ok(Step::Continue) => steps += 1,
                Ok(Step::Ignored) => {
                    steps += 1;
                    ignored += 1;
                }
                Err(CpuStepResult::Halt(reason)) => {
                    tracing::debug!(%reason, steps, "cpu halted");
                    let outcome = match reason {
                        HaltReason::Return { value } => RunOutcome::Returned(value),
                        HaltReason::Exit { syscall, value } => {
                            RunOutcome::Exited { syscall, value }
                        }
                        HaltReason::PcOutOfRange { pc } => {
                            tracing::warn!(pc, "control left the program without returning");
                            return finish(RunOutcome::PcOutOfRange { pc }, steps, ignored);
                        }
                    };
                    return finish(outcome, steps + 1, ignored);
                }
                Err(CpuStepResult::Trapped(trap)) => {
                    let line = self
                        .program
                        .lines
                        .get(trap.pc())
                        .map_or_else(|| "?".to_string(), |l| l.text.clone());
                    tracing::debug!(%trap, %line, "run aborted");
                    host.output(&format!("\n[Runtime Error] {trap} at line: {line}"));
                    return finish(RunOutcome::Fault { trap, line }, steps, ignored);
                }
            }
        }
    }

    /// Resets, loads `source` and runs it. Load errors are reported through `host`.
    pub fn execute<H: Host + ?Sized>(&mut self, source: &str, host: &mut H) -> RunReport {
        if let Err(err) = self.load(source) {
            host.output(&format!("[Load Error] {err}"));
            return RunReport {
                outcome: RunOutcome::LoadFailed(err),
                steps: 0,
                ignored: 0,
            };
        }
        self.run(host)
    }
}
