use super::regs::Reg;
use crate::asm::LabelTable;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing operand {index} for `{mnemonic}`")]
    MissingOperand { mnemonic: String, index: usize },
    #[error("unknown register `{0}`")]
    BadRegister(String),
    #[error("invalid integer literal `{0}`")]
    BadImmediate(String),
    #[error("invalid memory operand `{0}`, expected offset(base)")]
    BadMemOperand(String),
}

/// A jump/call/`la` destination, resolved against the label table at load time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Addr(i32),
    Missing(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Cond {
    pub fn holds(self, a: i32, b: i32) -> bool {
        match self {
            Cond::Eq => a == b,
            Cond::Ne => a != b,
            Cond::Lt => a < b,
            Cond::Ge => a >= b,
            Cond::Gt => a > b,
            Cond::Le => a <= b,
        }
    }
}

/// Host services reachable through `call <name>`. They shadow guest labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    PutInt,
    PutCh,
    PutArray,
    GetInt,
    GetCh,
    GetArray,
    StartTime,
    StopTime,
}

impl Service {
    pub fn from_name(name: &str) -> Option<Service> {
        Some(match name {
            "putint" => Service::PutInt,
            "putch" => Service::PutCh,
            "putarray" => Service::PutArray,
            "getint" => Service::GetInt,
            "getch" => Service::GetCh,
            "getarray" => Service::GetArray,
            "starttime" => Service::StartTime,
            "stoptime" => Service::StopTime,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    // Arithmetic / logic
    Addi { rd: Reg, rs1: Reg, imm: i32 },
    Add { rd: Reg, rs1: Reg, rs2: Reg },
    Sub { rd: Reg, rs1: Reg, rs2: Reg },
    Mul { rd: Reg, rs1: Reg, rs2: Reg },
    Div { rd: Reg, rs1: Reg, rs2: Reg },
    Rem { rd: Reg, rs1: Reg, rs2: Reg },
    Slt { rd: Reg, rs1: Reg, rs2: Reg },
    Sgt { rd: Reg, rs1: Reg, rs2: Reg },
    Snez { rd: Reg, rs1: Reg },
    Seqz { rd: Reg, rs1: Reg },
    And { rd: Reg, rs1: Reg, rs2: Reg },
    Or { rd: Reg, rs1: Reg, rs2: Reg },
    Xor { rd: Reg, rs1: Reg, rs2: Reg },
    Slli { rd: Reg, rs1: Reg, shamt: i32 },
    // Memory
    Lw { rd: Reg, base: Reg, off: i32 },
    Sw { src: Reg, base: Reg, off: i32 },
    // Control flow
    J { target: Target },
    /// `None` target means the label was undefined; the branch is never taken.
    Branch { cond: Cond, rs1: Reg, rs2: Reg, target: Option<i32> },
    Call { target: Target },
    Service(Service),
    Ret,
    Ecall,
    // Pseudo
    Li { rd: Reg, imm: i32 },
    Mv { rd: Reg, rs1: Reg },
    La { rd: Reg, target: Target },
    /// Mnemonic outside the modeled subset, executed as a no-op.
    Unknown { mnemonic: String },
    /// Supported mnemonic with operands that did not parse; faults if executed.
    Malformed { reason: String },
}

/// Parses a complete integer literal: optional sign, decimal or `0x` hex.
/// Values are truncated to 32 bits.
pub fn parse_int(tok: &str) -> Option<i32> {
    parse_int_wide(tok).map(|v| v as i32)
}

/// Same literal syntax as [`parse_int`] without the 32-bit truncation.
pub fn parse_int_wide(tok: &str) -> Option<i64> {
    let (neg, body) = match tok.as_bytes().first()? {
        b'-' => (true, &tok[1..]),
        b'+' => (false, &tok[1..]),
        _ => (false, tok),
    };
    let mag = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) => {
            body.parse::<i64>().ok()?
        }
        None => return None,
    };
    Some(if neg { mag.wrapping_neg() } else { mag })
}

/// Splits an instruction line into mnemonic and operands. Commas separate
/// operands exactly like whitespace does.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

struct Operands<'a> {
    mnemonic: &'a str,
    toks: &'a [&'a str],
}

impl<'a> Operands<'a> {
    fn tok(&self, i: usize) -> Result<&'a str, DecodeError> {
        self.toks
            .get(i)
            .copied()
            .ok_or_else(|| DecodeError::MissingOperand {
                mnemonic: self.mnemonic.to_string(),
                index: i + 1,
            })
    }

    fn reg(&self, i: usize) -> Result<Reg, DecodeError> {
        let t = self.tok(i)?;
        Reg::parse(t).ok_or_else(|| DecodeError::BadRegister(t.to_string()))
    }

    fn imm(&self, i: usize) -> Result<i32, DecodeError> {
        let t = self.tok(i)?;
        parse_int(t).ok_or_else(|| DecodeError::BadImmediate(t.to_string()))
    }

    // offset(base), offset may be omitted
    fn mem(&self, i: usize) -> Result<(Reg, i32), DecodeError> {
        let t = self.tok(i)?;
        let bad = || DecodeError::BadMemOperand(t.to_string());
        let inner = t.strip_suffix(')').ok_or_else(bad)?;
        let (off, base) = inner.split_once('(').ok_or_else(bad)?;
        let off = if off.is_empty() {
            0
        } else {
            parse_int(off).ok_or_else(bad)?
        };
        let base = Reg::parse(base).ok_or_else(|| DecodeError::BadRegister(base.to_string()))?;
        Ok((base, off))
    }

    fn label(&self, i: usize, labels: &LabelTable) -> Result<Target, DecodeError> {
        let name = self.tok(i)?;
        Ok(match labels.get(name) {
            Some(&addr) => Target::Addr(addr),
            None => Target::Missing(name.to_string()),
        })
    }

    fn branch(
        &self,
        cond: Cond,
        against_zero: bool,
        labels: &LabelTable,
    ) -> Result<Instr, DecodeError> {
        let (rs2, label_at) = if against_zero {
            (Reg::ZERO, 1)
        } else {
            (self.reg(1)?, 2)
        };
        let target = match self.label(label_at, labels)? {
            Target::Addr(addr) => Some(addr),
            Target::Missing(_) => None,
        };
        Ok(Instr::Branch {
            cond,
            rs1: self.reg(0)?,
            rs2,
            target,
        })
    }
}

/// Decodes one text-segment line. Never fails: operand problems become
/// `Instr::Malformed` so they only matter if the line is executed.
pub fn decode(text: &str, labels: &LabelTable) -> Instr {
    let toks = tokenize(text);
    let Some((&mnemonic, rest)) = toks.split_first() else {
        return Instr::Unknown {
            mnemonic: String::new(),
        };
    };
    let ops = Operands {
        mnemonic,
        toks: rest,
    };
    decode_ops(&ops, labels).unwrap_or_else(|err| Instr::Malformed {
        reason: err.to_string(),
    })
}

fn decode_ops(ops: &Operands<'_>, labels: &LabelTable) -> Result<Instr, DecodeError> {
    macro_rules! r3 {
        ($v:ident) => {
            Instr::$v {
                rd: ops.reg(0)?,
                rs1: ops.reg(1)?,
                rs2: ops.reg(2)?,
            }
        };
    }

    let instr = match ops.mnemonic {
        "addi" => Instr::Addi {
            rd: ops.reg(0)?,
            rs1: ops.reg(1)?,
            imm: ops.imm(2)?,
        },
        "add" => r3!(Add),
        "sub" => r3!(Sub),
        "mul" => r3!(Mul),
        "div" => r3!(Div),
        "rem" => r3!(Rem),
        "slt" => r3!(Slt),
        "sgt" => r3!(Sgt),
        "and" => r3!(And),
        "or" => r3!(Or),
        "xor" => r3!(Xor),
        "snez" => Instr::Snez {
            rd: ops.reg(0)?,
            rs1: ops.reg(1)?,
        },
        "seqz" => Instr::Seqz {
            rd: ops.reg(0)?,
            rs1: ops.reg(1)?,
        },
        "slli" => Instr::Slli {
            rd: ops.reg(0)?,
            rs1: ops.reg(1)?,
            shamt: ops.imm(2)?,
        },
        "lw" => {
            let (base, off) = ops.mem(1)?;
            Instr::Lw {
                rd: ops.reg(0)?,
                base,
                off,
            }
        }
        "sw" => {
            let (base, off) = ops.mem(1)?;
            Instr::Sw {
                src: ops.reg(0)?,
                base,
                off,
            }
        }
        "j" => Instr::J {
            target: ops.label(0, labels)?,
        },
        "beqz" => ops.branch(Cond::Eq, true, labels)?,
        "bnez" => ops.branch(Cond::Ne, true, labels)?,
        "beq" => ops.branch(Cond::Eq, false, labels)?,
        "bne" => ops.branch(Cond::Ne, false, labels)?,
        "blt" => ops.branch(Cond::Lt, false, labels)?,
        "bge" => ops.branch(Cond::Ge, false, labels)?,
        "bgt" => ops.branch(Cond::Gt, false, labels)?,
        "ble" => ops.branch(Cond::Le, false, labels)?,
        "call" => {
            let name = ops.tok(0)?;
            match Service::from_name(name) {
                Some(svc) => Instr::Service(svc),
                None => Instr::Call {
                    target: ops.label(0, labels)?,
                },
            }
        }
        "ret" => Instr::Ret,
        "ecall" => Instr::Ecall,
        "li" => Instr::Li {
            rd: ops.reg(0)?,
            imm: ops.imm(1)?,
        },
        "mv" => Instr::Mv {
            rd: ops.reg(0)?,
            rs1: ops.reg(1)?,
        },
        "la" => Instr::La {
            rd: ops.reg(0)?,
            target: ops.label(1, labels)?,
        },
        other => Instr::Unknown {
            mnemonic: other.to_string(),
        },
    };
    Ok(instr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn labels() -> LabelTable {
        LabelTable::from([("loop".to_string(), 3), ("buf".to_string(), 0x10000)])
    }

    fn reg(name: &str) -> Reg {
        Reg::parse(name).unwrap()
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("-8", Some(-8))]
    #[case("+3", Some(3))]
    #[case("0x10", Some(16))]
    #[case("-0x10", Some(-16))]
    #[case("0xffffffff", Some(-1))]
    #[case("4294967296", Some(0))]
    #[case("12abc", None)]
    #[case("0x", None)]
    #[case("-", None)]
    #[case("", None)]
    fn integer_literals(#[case] tok: &str, #[case] want: Option<i32>) {
        assert_eq!(parse_int(tok), want);
    }

    #[rstest]
    #[case("4294967300", Some(4294967300))]
    #[case("-0x100000000", Some(-4294967296))]
    #[case("12abc", None)]
    fn wide_literals_keep_upper_bits(#[case] tok: &str, #[case] want: Option<i64>) {
        assert_eq!(parse_int_wide(tok), want);
    }

    #[test]
    fn commas_and_spaces_both_separate_operands() {
        assert_eq!(tokenize("add  a0,a1, a2"), vec!["add", "a0", "a1", "a2"]);
    }

    #[test]
    fn decodes_register_forms() {
        assert_eq!(
            decode("addi sp, sp, -16", &labels()),
            Instr::Addi {
                rd: Reg::SP,
                rs1: Reg::SP,
                imm: -16
            }
        );
        assert_eq!(
            decode("mul t0, fp, x5", &labels()),
            Instr::Mul {
                rd: reg("t0"),
                rs1: reg("s0"),
                rs2: reg("t0")
            }
        );
    }

    #[rstest]
    #[case("lw a0, 12(sp)", 12)]
    #[case("lw a0, -4(sp)", -4)]
    #[case("lw a0, (sp)", 0)]
    fn memory_operands(#[case] text: &str, #[case] off: i32) {
        assert_eq!(
            decode(text, &labels()),
            Instr::Lw {
                rd: Reg::A0,
                base: Reg::SP,
                off
            }
        );
    }

    #[test]
    fn store_keeps_source_and_base_apart() {
        assert_eq!(
            decode("sw a1, 8(a0)", &labels()),
            Instr::Sw {
                src: Reg::A1,
                base: Reg::A0,
                off: 8
            }
        );
    }

    #[test]
    fn zero_branches_compare_against_x0() {
        assert_eq!(
            decode("bnez t1, loop", &labels()),
            Instr::Branch {
                cond: Cond::Ne,
                rs1: reg("t1"),
                rs2: Reg::ZERO,
                target: Some(3)
            }
        );
    }

    #[test]
    fn branch_to_undefined_label_has_no_target() {
        assert_eq!(
            decode("blt a0, a1, nowhere", &labels()),
            Instr::Branch {
                cond: Cond::Lt,
                rs1: Reg::A0,
                rs2: Reg::A1,
                target: None
            }
        );
    }

    #[test]
    fn services_shadow_labels() {
        let mut labels = labels();
        labels.insert("putint".to_string(), 9);
        assert_eq!(
            decode("call putint", &labels),
            Instr::Service(Service::PutInt)
        );
        assert_eq!(
            decode("call helper", &labels),
            Instr::Call {
                target: Target::Missing("helper".to_string())
            }
        );
    }

    #[test]
    fn la_resolves_data_labels() {
        assert_eq!(
            decode("la a0, buf", &labels()),
            Instr::La {
                rd: Reg::A0,
                target: Target::Addr(0x10000)
            }
        );
    }

    #[test]
    fn unsupported_mnemonic_is_unknown() {
        assert_eq!(
            decode("fence", &labels()),
            Instr::Unknown {
                mnemonic: "fence".to_string()
            }
        );
    }

    #[rstest]
    #[case("addi a0, a1")]
    #[case("li a0, ten")]
    #[case("mv q0, a1")]
    #[case("lw a0, 4[sp]")]
    #[case("sw a0, 4(qq)")]
    fn bad_operands_are_malformed(#[case] text: &str) {
        assert!(matches!(
            decode(text, &labels()),
            Instr::Malformed { .. }
        ));
    }
}
