//! Host capability injected into a run: an output sink and an input source.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Host {
    /// Receives one unit of program output (or a diagnostic) as soon as it is produced.
    fn output(&mut self, text: &str);

    /// Solicits one line of input. `None` means no input is available.
    fn input(&mut self, prompt: &str) -> Option<String>;
}

/// Console host: output goes straight to stdout, input is read line by line from stdin.
#[derive(Debug, Default)]
pub struct StdioHost;

impl Host for StdioHost {
    fn output(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        // a closed stdout is not the guest's problem
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn input(&mut self, prompt: &str) -> Option<String> {
        tracing::debug!(prompt, "waiting for input");
        // stdout carries guest output only
        let mut err = io::stderr().lock();
        let _ = write!(err, "{prompt} ");
        let _ = err.flush();
        drop(err);
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Records every output fragment and replays queued input lines.
#[derive(Debug, Default)]
pub struct BufferHost {
    pub outputs: Vec<String>,
    pub inputs: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl BufferHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// All output fragments joined together.
    pub fn text(&self) -> String {
        self.outputs.concat()
    }
}

impl Host for BufferHost {
    fn output(&mut self, text: &str) {
        self.outputs.push(text.to_string());
    }

    fn input(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front()
    }
}

/// Lenient integer read used for interactive input: skips leading
/// whitespace, takes an optional sign and the longest run of digits (or a
/// `0x` hex run). Anything unparsable yields `None`.
pub fn parse_int_prefix(text: &str) -> Option<i32> {
    let s = text.trim_start();
    let (neg, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (digits, radix) = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => (hex, 16),
        _ => (body, 10),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate absurdly long inputs before truncating to 32 bits
    let mag = i64::from_str_radix(&digits[..end], radix).unwrap_or(i64::MAX);
    let v = if neg { mag.wrapping_neg() } else { mag };
    Some(v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("17", Some(17))]
    #[case("  -3\n", Some(-3))]
    #[case("12abc", Some(12))]
    #[case("0x1f", Some(31))]
    #[case("abc", None)]
    #[case("", None)]
    #[case("-", None)]
    fn prefix_parsing(#[case] text: &str, #[case] want: Option<i32>) {
        assert_eq!(parse_int_prefix(text), want);
    }

    #[test]
    fn buffer_host_replays_input_in_order() {
        let mut host = BufferHost::with_input(["1", "2"]);
        assert_eq!(host.input("a").as_deref(), Some("1"));
        assert_eq!(host.input("b").as_deref(), Some("2"));
        assert_eq!(host.input("c"), None);
        assert_eq!(host.prompts, vec!["a", "b", "c"]);
    }
}
