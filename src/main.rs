use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use riscv_interp::{Machine, MachineConfig, RunOutcome, StdioHost};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Run RISC-V 32 assembly produced by the SysY teaching compiler")]
struct Args {
    /// Assembly source file, or `-` to read it from stdin
    file: String,

    /// RAM size in MiB, at most 2047 so every byte has a 32-bit address
    #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..=2047))]
    mem_mib: u32,

    /// Abort as a suspected infinite loop after N instructions
    #[arg(long, default_value_t = riscv_interp::config::DEFAULT_MAX_STEPS)]
    max_steps: u64,

    /// Enable instruction trace
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn init_logging(trace: bool) {
    let default = if trace {
        "warn,riscv_interp=trace"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.trace);

    let source = read_source(&args.file)?;
    let memory_bytes = usize::try_from(args.mem_mib)?
        .checked_mul(1024 * 1024)
        .ok_or("--mem-mib does not fit in the address space")?;
    let config = MachineConfig {
        memory_bytes,
        max_steps: args.max_steps,
        trace: args.trace,
        ..MachineConfig::default()
    };

    let mut machine = Machine::new(config);
    let mut host = StdioHost;
    let report = machine.execute(&source, &mut host);
    println!();

    match report.outcome {
        RunOutcome::Returned(value) | RunOutcome::Exited { value, .. } => {
            eprintln!("Program exited with {value} after {} steps", report.steps);
            if report.ignored > 0 {
                eprintln!("{} unsupported instruction(s) were skipped", report.ignored);
            }
            Ok(ExitCode::from(value as u8))
        }
        RunOutcome::PcOutOfRange { pc } => {
            eprintln!("Execution left the program at pc={pc} without returning");
            Ok(ExitCode::FAILURE)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}
