//! Two-pass loader for the textual assembly subset.
//!
//! Pass 1 walks the source once, tracking the current section, binding
//! labels (instruction index in `.text`, byte address in `.data`), laying
//! `.word`/`.zero` contents into memory and collecting the raw text lines.
//! Pass 2 decodes every collected line against the finished label table.

use std::collections::HashMap;

use thiserror::Error;

use crate::cpu::decode::{Instr, decode, parse_int, parse_int_wide};
use crate::mem::Memory;

/// Symbol name to instruction index (text labels) or byte address (data labels).
pub type LabelTable = HashMap<String, i32>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: invalid {directive} argument `{token}`")]
    BadLiteral {
        line: usize,
        directive: &'static str,
        token: String,
    },
    #[error("line {line}: {directive} data does not fit in memory (address {addr})")]
    DataOverflow {
        line: usize,
        directive: &'static str,
        addr: i64,
    },
}

/// One text-segment instruction, kept with its original text for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub index: usize,
    /// 1-based line number in the assembly source.
    pub line_no: usize,
    pub text: String,
    pub instr: Instr,
}

/// Immutable program image produced by [`assemble`]; the data segment lives
/// in the memory passed to it.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub lines: Vec<SourceLine>,
    pub labels: LabelTable,
}

impl Program {
    pub fn label(&self, name: &str) -> Option<i32> {
        self.labels.get(name).copied()
    }

    /// Instruction index of `main`.
    pub fn entry(&self) -> Option<i32> {
        self.label("main")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Text,
    Data,
}

// Directives emitted by compilers that carry no meaning here.
const IGNORED_DIRECTIVES: [&str; 6] = [".globl", ".align", ".file", ".attribute", ".type", ".size"];

fn align4(addr: i64) -> i64 {
    (addr + 3) & !3
}

/// Strips blank lines, full-line `#`/`;` comments and trailing `#` comments.
fn preprocess(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            return None;
        }
        let line = line.split('#').next().unwrap_or(line).trim();
        (!line.is_empty()).then_some((i + 1, line))
    })
}

struct Loader<'m> {
    mem: &'m mut Memory,
    section: Section,
    data_cursor: i64,
    labels: LabelTable,
    text: Vec<(usize, String)>,
}

impl Loader<'_> {
    fn bind(&mut self, name: &str) {
        let addr = match self.section {
            Section::Text => self.text.len() as i64,
            Section::Data => {
                self.data_cursor = align4(self.data_cursor);
                self.data_cursor
            }
        };
        if let Some(old) = self.labels.insert(name.to_string(), addr as i32) {
            tracing::debug!(label = name, old, new = addr, "label redefined, last definition wins");
        }
    }

    fn directive(&mut self, line_no: usize, line: &str) -> Result<(), LoadError> {
        let mut parts = line.split_whitespace();
        let dir = parts.next().unwrap_or(line);
        match (dir, self.section) {
            (".text", _) => self.section = Section::Text,
            (".data", _) => self.section = Section::Data,
            (".word", Section::Data) => {
                let args = &line[dir.len()..];
                for tok in args
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|t| !t.is_empty())
                {
                    let val = parse_int(tok).ok_or_else(|| LoadError::BadLiteral {
                        line: line_no,
                        directive: ".word",
                        token: tok.to_string(),
                    })?;
                    self.data_cursor = align4(self.data_cursor);
                    self.mem
                        .write_i32(self.data_cursor, val)
                        .map_err(|_| LoadError::DataOverflow {
                            line: line_no,
                            directive: ".word",
                            addr: self.data_cursor,
                        })?;
                    self.data_cursor += 4;
                }
            }
            (".zero", Section::Data) => {
                let tok = parts.next().unwrap_or("");
                let size = parse_int_wide(tok)
                    .filter(|&n| n >= 0)
                    .ok_or_else(|| LoadError::BadLiteral {
                        line: line_no,
                        directive: ".zero",
                        token: tok.to_string(),
                    })?;
                let end = self
                    .data_cursor
                    .checked_add(size)
                    .filter(|&end| end <= self.mem.capacity() as i64)
                    .ok_or(LoadError::DataOverflow {
                        line: line_no,
                        directive: ".zero",
                        addr: self.data_cursor,
                    })?;
                // memory is already zero-filled
                self.data_cursor = end;
            }
            _ if IGNORED_DIRECTIVES.contains(&dir) => {}
            _ => tracing::trace!(line = line_no, directive = dir, "directive ignored"),
        }
        Ok(())
    }

    fn line(&mut self, line_no: usize, mut line: &str) -> Result<(), LoadError> {
        if let Some(idx) = line.find(':') {
            self.bind(line[..idx].trim());
            line = line[idx + 1..].trim();
            if line.is_empty() {
                return Ok(());
            }
        }
        if line.starts_with('.') {
            return self.directive(line_no, line);
        }
        match self.section {
            Section::Text => self.text.push((line_no, line.to_string())),
            Section::Data => {
                tracing::trace!(line = line_no, text = line, "non-directive in .data dropped")
            }
        }
        Ok(())
    }
}

/// Assembles `text` into a [`Program`], writing the data segment into `mem`
/// starting at `data_base`.
pub fn assemble(text: &str, mem: &mut Memory, data_base: i64) -> Result<Program, LoadError> {
    let mut loader = Loader {
        mem,
        section: Section::Text,
        data_cursor: data_base,
        labels: LabelTable::new(),
        text: Vec::new(),
    };
    for (line_no, line) in preprocess(text) {
        loader.line(line_no, line)?;
    }

    let Loader {
        labels,
        text: raw,
        data_cursor,
        ..
    } = loader;
    let lines = raw
        .into_iter()
        .enumerate()
        .map(|(index, (line_no, text))| {
            let instr = decode(&text, &labels);
            SourceLine {
                index,
                line_no,
                text,
                instr,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        instructions = lines.len(),
        labels = labels.len(),
        data_bytes = data_cursor - data_base,
        "program loaded"
    );
    Ok(Program { lines, labels })
}
