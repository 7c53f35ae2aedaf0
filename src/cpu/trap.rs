use crate::mem::MemError;
use thiserror::Error;

/// Unrecoverable fault raised while executing one instruction. `pc` is the
/// index of the faulting instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("{err}")]
    Mem { pc: usize, err: MemError },

    #[error("Label {name} not found")]
    UndefinedLabel { pc: usize, name: String },

    #[error("Function {name} not found")]
    UndefinedFunction { pc: usize, name: String },

    #[error("Symbol {name} not found")]
    UndefinedSymbol { pc: usize, name: String },

    #[error("Malformed instruction: {reason}")]
    Malformed { pc: usize, reason: String },
}

impl Trap {
    /// Returns the instruction index where the trap occurred
    pub fn pc(&self) -> usize {
        match self {
            Trap::Mem { pc, .. } => *pc,
            Trap::UndefinedLabel { pc, .. } => *pc,
            Trap::UndefinedFunction { pc, .. } => *pc,
            Trap::UndefinedSymbol { pc, .. } => *pc,
            Trap::Malformed { pc, .. } => *pc,
        }
    }
}

/// Trait for adding PC context to errors that can become Traps
pub trait WithPc<T> {
    fn with_pc(self, pc: usize) -> Result<T, Trap>;
}

impl<T> WithPc<T> for Result<T, MemError> {
    fn with_pc(self, pc: usize) -> Result<T, Trap> {
        self.map_err(|err| Trap::Mem { pc, err })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_traps_carry_the_segfault_text() {
        let trap = Err::<(), _>(MemError::Write(268_435_455)).with_pc(4).unwrap_err();
        assert_eq!(trap.pc(), 4);
        assert_eq!(trap.to_string(), "Segfault Write 268435455");
    }

    #[test]
    fn symbol_traps_name_the_symbol() {
        let trap = Trap::UndefinedFunction {
            pc: 0,
            name: "missingFunc".to_string(),
        };
        assert_eq!(trap.to_string(), "Function missingFunc not found");
    }
}
