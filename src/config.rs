use crate::mem::DEFAULT_CAPACITY;

/// Executed-instruction ceiling; hitting it is reported as a suspected infinite loop.
pub const DEFAULT_MAX_STEPS: u64 = 5_000_000;

/// Data segment base, kept clear of low addresses.
pub const DEFAULT_DATA_BASE: i64 = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Guest RAM size in bytes.
    pub memory_bytes: usize,
    pub max_steps: u64,
    /// Address where `.data` contents start.
    pub data_base: i64,
    /// Emit a trace event for every executed instruction.
    pub trace: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_CAPACITY,
            max_steps: DEFAULT_MAX_STEPS,
            data_base: DEFAULT_DATA_BASE,
            trace: false,
        }
    }
}
