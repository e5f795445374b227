use crate::error::ErrorKind;

/// Sequential reader over instruction bytes.
///
/// Only `read_u8` must be provided; wider reads are assembled from it in the
/// byte order named by the method.
pub trait ByteReader {
    fn read_u8(&mut self) -> Result<u8, ErrorKind>;

    fn read_u16_le(&mut self) -> Result<u16, ErrorKind> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_u16_be(&mut self) -> Result<u16, ErrorKind> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_u32_be(&mut self) -> Result<u32, ErrorKind> {
        let hi = self.read_u16_be()?;
        let lo = self.read_u16_be()?;
        Ok(((hi as u32) << 16) | lo as u32)
    }

    fn read_u32_le(&mut self) -> Result<u32, ErrorKind> {
        let lo = self.read_u16_le()?;
        let hi = self.read_u16_le()?;
        Ok(((hi as u32) << 16) | lo as u32)
    }
}

/// Memory a disassembler walks through, one instruction at a time.
pub trait DisMemory: ByteReader {
    /// Address of the next byte `read_u8` returns.
    fn address(&self) -> u32;
    fn has_next(&self) -> bool;
}

/// A byte buffer mapped at `base`.
#[derive(Debug, Clone)]
pub struct ArrayMemory {
    pub mem: Vec<u8>,
    pub base: u32,
    pos: usize,
}

impl ArrayMemory {
    pub fn new(base: u32, mem: impl Into<Vec<u8>>) -> Self {
        Self {
            mem: mem.into(),
            base,
            pos: 0,
        }
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Moves the read cursor to `addr`; out-of-range addresses leave it at the end.
    pub fn seek(&mut self, addr: u32) {
        let off = addr.wrapping_sub(self.base) as usize;
        self.pos = off.min(self.mem.len());
    }
}

impl ByteReader for ArrayMemory {
    fn read_u8(&mut self) -> Result<u8, ErrorKind> {
        let b = *self.mem.get(self.pos).ok_or(ErrorKind::NoMemory)?;
        self.pos += 1;
        Ok(b)
    }
}

impl DisMemory for ArrayMemory {
    fn address(&self) -> u32 {
        self.base.wrapping_add(self.pos as u32)
    }

    fn has_next(&self) -> bool {
        self.pos < self.mem.len()
    }
}

impl ByteReader for &[u8] {
    fn read_u8(&mut self) -> Result<u8, ErrorKind> {
        let (&b, rest) = self.split_first().ok_or(ErrorKind::NoMemory)?;
        *self = rest;
        Ok(b)
    }
}
