use thiserror::Error;

/// Reference sizing for guest RAM.
pub const DEFAULT_CAPACITY: usize = 256 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("Segfault Read {0}")]
    Read(i64),
    #[error("Segfault Write {0}")]
    Write(i64),
}

/// Flat, zero-initialized, byte-addressable guest memory starting at address 0.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    // Valid word addresses are 0..=capacity-4.
    fn check_word(&self, addr: i64) -> Option<usize> {
        let off = usize::try_from(addr).ok()?;
        let end = off.checked_add(4)?;
        (end <= self.data.len()).then_some(off)
    }

    pub fn read_u32(&self, addr: i64) -> Result<u32, MemError> {
        let off = self.check_word(addr).ok_or(MemError::Read(addr))?;
        let b = &self.data[off..off + 4];
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn write_u32(&mut self, addr: i64, v: u32) -> Result<(), MemError> {
        let off = self.check_word(addr).ok_or(MemError::Write(addr))?;
        self.data[off..off + 4].copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    pub fn read_i32(&self, addr: i64) -> Result<i32, MemError> {
        self.read_u32(addr).map(|w| w as i32)
    }

    pub fn write_i32(&mut self, addr: i64, v: i32) -> Result<(), MemError> {
        self.write_u32(addr, v as u32)
    }
}
