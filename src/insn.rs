use serde::{Deserialize, Serialize};

use crate::error::{AsmError, ErrorAt, ErrorKind};
use crate::memory::ByteReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    Little,
    Big,
}

/// One instruction (or directive line) being encoded or decoded.
///
/// Lives for exactly one `encode`/`decode` call. Bytes accumulate in stream
/// order; the error slot keeps the first failure.
#[derive(Debug, Clone, Default)]
pub struct Insn {
    address: u32,
    bytes: Vec<u8>,
    name: String,
    error: ErrorAt,
}

impl Insn {
    pub fn new(address: u32) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    /// Moves the instruction start; used by location-counter directives.
    pub fn set_address(&mut self, address: u32) {
        self.address = address;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Where the location counter continues after this instruction.
    pub fn next_address(&self) -> u32 {
        self.address.wrapping_add(self.bytes.len() as u32)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn error(&self) -> &ErrorAt {
        &self.error
    }

    pub fn error_mut(&mut self) -> &mut ErrorAt {
        &mut self.error
    }

    pub fn set_error(&mut self, at: usize, kind: ErrorKind) -> &mut Self {
        self.error.set_error(at, kind);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }

    pub fn check(&self) -> Result<(), AsmError> {
        self.error.check()
    }

    pub fn emit_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn emit_bytes(&mut self, v: &[u8]) {
        self.bytes.extend_from_slice(v);
    }

    pub fn emit_u16(&mut self, v: u16, order: ByteOrder) {
        self.emit_uint(v as u64, 2, order);
    }

    pub fn emit_u32(&mut self, v: u32, order: ByteOrder) {
        self.emit_uint(v as u64, 4, order);
    }

    pub fn emit_u64(&mut self, v: u64, order: ByteOrder) {
        self.emit_uint(v, 8, order);
    }

    /// Emits the low `width` bytes of `v`.
    pub fn emit_uint(&mut self, v: u64, width: usize, order: ByteOrder) {
        let le = v.to_le_bytes();
        match order {
            ByteOrder::Little => self.bytes.extend_from_slice(&le[..width]),
            ByteOrder::Big => self.bytes.extend(le[..width].iter().rev()),
        }
    }

    /// Reads one byte through `mem`, recording it; exhaustion is recorded as
    /// `NoMemory` at the current offset.
    pub fn read_u8<M: ByteReader + ?Sized>(&mut self, mem: &mut M) -> Result<u8, ErrorKind> {
        match mem.read_u8() {
            Ok(b) => {
                self.bytes.push(b);
                Ok(b)
            }
            Err(kind) => {
                let at = self.bytes.len();
                self.error.set_error(at, kind);
                Err(kind)
            }
        }
    }

    /// A [`ByteReader`] that records everything it reads into this instruction.
    pub fn reader<'a, M: ByteReader + ?Sized>(&'a mut self, mem: &'a mut M) -> InsnReader<'a, M> {
        InsnReader { insn: self, mem }
    }
}

pub struct InsnReader<'a, M: ByteReader + ?Sized> {
    insn: &'a mut Insn,
    mem: &'a mut M,
}

impl<M: ByteReader + ?Sized> InsnReader<'_, M> {
    /// Offset of the next byte from the instruction start.
    pub fn offset(&self) -> usize {
        self.insn.len()
    }
}

impl<M: ByteReader + ?Sized> ByteReader for InsnReader<'_, M> {
    fn read_u8(&mut self) -> Result<u8, ErrorKind> {
        self.insn.read_u8(self.mem)
    }
}
