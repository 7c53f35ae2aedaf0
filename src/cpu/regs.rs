use std::fmt;

/// ABI names indexed by register number.
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// General purpose register index (0..=31).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reg(u8);

impl Reg {
    pub const ZERO: Reg = Reg(0);
    pub const RA: Reg = Reg(1);
    pub const SP: Reg = Reg(2);
    pub const A0: Reg = Reg(10);
    pub const A1: Reg = Reg(11);
    pub const A7: Reg = Reg(17);

    pub fn new(idx: u8) -> Option<Reg> {
        (idx < 32).then_some(Reg(idx))
    }

    /// Accepts `x0`..`x31`, the ABI aliases, and `fp` for `s0`.
    pub fn parse(name: &str) -> Option<Reg> {
        if name == "fp" {
            return Some(Reg(8));
        }
        if let Some(num) = name.strip_prefix('x') {
            // canonical spellings only: no sign, no leading zero
            let digits = !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit());
            if digits && (num == "0" || !num.starts_with('0')) {
                if let Ok(idx) = num.parse::<u8>() {
                    return Reg::new(idx);
                }
            }
        }
        ABI_NAMES
            .iter()
            .position(|&abi| abi == name)
            .map(|idx| Reg(idx as u8))
    }

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ABI_NAMES[self.idx()])
    }
}

/// 32 x 32-bit signed registers with x0 hardwired to zero.
#[derive(Default, Clone, Debug)]
pub struct Regs([i32; 32]);

impl Regs {
    pub fn read(&self, r: Reg) -> i32 {
        self.0[r.idx()]
    }

    pub fn write(&mut self, r: Reg, val: i32) {
        if r != Reg::ZERO {
            self.0[r.idx()] = val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("zero", 0)]
    #[case("x0", 0)]
    #[case("ra", 1)]
    #[case("sp", 2)]
    #[case("fp", 8)]
    #[case("s0", 8)]
    #[case("a0", 10)]
    #[case("a7", 17)]
    #[case("s11", 27)]
    #[case("t6", 31)]
    #[case("x31", 31)]
    fn parses_names_and_aliases(#[case] name: &str, #[case] idx: usize) {
        assert_eq!(Reg::parse(name).map(Reg::idx), Some(idx));
    }

    #[rstest]
    #[case("x32")]
    #[case("x")]
    #[case("x01")]
    #[case("x+10")]
    #[case("x+1")]
    #[case("x-0")]
    #[case("a8")]
    #[case("A0")]
    #[case("")]
    fn rejects_unknown_names(#[case] name: &str) {
        assert_eq!(Reg::parse(name), None);
    }

    #[test]
    fn zero_register_discards_writes() {
        let mut regs = Regs::default();
        regs.write(Reg::ZERO, 99);
        regs.write(Reg::A0, -5);
        assert_eq!(regs.read(Reg::ZERO), 0);
        assert_eq!(regs.read(Reg::A0), -5);
    }
}
