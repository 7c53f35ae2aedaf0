//! Interpreter for the RISC-V 32-bit assembly subset emitted by a teaching
//! compiler: a two-pass loader that turns assembly text into a program image,
//! and an engine that runs it from `main` against a flat memory, routing
//! program I/O through an injected [`Host`].

pub mod asm;
pub mod config;
pub mod cpu;
pub mod debug;
pub mod host;
pub mod mem;

pub use asm::{LoadError, Program};
pub use config::MachineConfig;
pub use cpu::{Machine, RunOutcome, RunReport};
pub use host::{BufferHost, Host, StdioHost};

/// Loads and runs `source` on a fresh machine.
pub fn run_source<H: Host + ?Sized>(
    source: &str,
    config: MachineConfig,
    host: &mut H,
) -> RunReport {
    Machine::new(config).execute(source, host)
}
