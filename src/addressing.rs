//! Generic operand addressing.
//!
//! A generic operand is a 5-bit class code placed into an opcode field, an
//! optional index byte and optional extension bytes (displacements or an
//! immediate) that follow the opcode.
//!
//! | code        | mode                          |
//! |-------------|-------------------------------|
//! | 0x00..=0x07 | register                      |
//! | 0x08..=0x0F | register relative `d(Rn)`     |
//! | 0x10..=0x12 | memory relative `d2(d1(B))`   |
//! | 0x13        | reserved                      |
//! | 0x14        | immediate                     |
//! | 0x15        | absolute `@d`                 |
//! | 0x16        | external `EXT(d1)+d2`         |
//! | 0x17        | top of stack                  |
//! | 0x18..=0x1B | memory `d(FP/SP/SB/PC)`       |
//! | 0x1C..=0x1F | scaled index, byte..quad      |

use crate::displacement::{self, DispWidth};
use crate::error::{ErrorAt, ErrorKind};
use crate::memory::ByteReader;
use crate::numeric::{self, Literal};

pub const CLASS_REG_RELATIVE: u8 = 0x08;
pub const CLASS_MEM_RELATIVE: u8 = 0x10;
pub const CLASS_RESERVED: u8 = 0x13;
pub const CLASS_IMMEDIATE: u8 = 0x14;
pub const CLASS_ABSOLUTE: u8 = 0x15;
pub const CLASS_EXTERNAL: u8 = 0x16;
pub const CLASS_TOS: u8 = 0x17;
pub const CLASS_MEMORY: u8 = 0x18;
pub const CLASS_SCALED: u8 = 0x1C;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemBase {
    Fp = 0,
    Sp = 1,
    Sb = 2,
    Pc = 3,
}

impl MemBase {
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => MemBase::Fp,
            1 => MemBase::Sp,
            2 => MemBase::Sb,
            _ => MemBase::Pc,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MemBase::Fp => "FP",
            MemBase::Sp => "SP",
            MemBase::Sb => "SB",
            MemBase::Pc => "PC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Byte = 0,
    Word = 1,
    Double = 2,
    Quad = 3,
}

impl Scale {
    pub fn from_bits(v: u8) -> Self {
        match v & 3 {
            0 => Scale::Byte,
            1 => Scale::Word,
            2 => Scale::Double,
            _ => Scale::Quad,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Scale::Byte => 'B',
            Scale::Word => 'W',
            Scale::Double => 'D',
            Scale::Quad => 'Q',
        }
    }
}

/// A displacement and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disp {
    pub value: i64,
    /// The value is not final yet; it is encoded in the widest form.
    pub undefined: bool,
    pub at: usize,
}

impl Disp {
    pub fn new(value: i64, at: usize) -> Self {
        Self {
            value,
            undefined: false,
            at,
        }
    }

    /// Appends the displacement, recording range errors at `at`.
    pub fn encode(&self, out: &mut Vec<u8>, error: &mut ErrorAt) {
        let r = if self.undefined {
            displacement::encode_at_least(self.value, DispWidth::Four, out)
        } else {
            displacement::encode(self.value, out)
        };
        error.set_error_if(self.at, r);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Addressing {
    Register(u8),
    RegRelative { reg: u8, disp: Disp },
    /// `disp2(disp1(base))`; `disp1` is stored first.
    MemRelative { base: MemBase, disp1: Disp, disp2: Disp },
    Immediate { value: Literal, at: usize },
    Absolute(Disp),
    External { disp1: Disp, disp2: Disp },
    TopOfStack,
    Memory { base: MemBase, disp: Disp },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledIndex {
    pub reg: u8,
    pub scale: Scale,
    pub at: usize,
}

/// How an immediate is laid out; immediates are stored most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmFormat {
    Int(usize),
    F32,
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenOperand {
    pub mode: Addressing,
    pub index: Option<ScaledIndex>,
}

impl GenOperand {
    pub fn new(mode: Addressing) -> Self {
        Self { mode, index: None }
    }

    /// Class code of the addressing mode itself.
    pub fn class(&self) -> u8 {
        match self.mode {
            Addressing::Register(r) => r & 7,
            Addressing::RegRelative { reg, .. } => CLASS_REG_RELATIVE | (reg & 7),
            Addressing::MemRelative { base, .. } => CLASS_MEM_RELATIVE | base as u8,
            Addressing::Immediate { .. } => CLASS_IMMEDIATE,
            Addressing::Absolute(_) => CLASS_ABSOLUTE,
            Addressing::External { .. } => CLASS_EXTERNAL,
            Addressing::TopOfStack => CLASS_TOS,
            Addressing::Memory { base, .. } => CLASS_MEMORY | base as u8,
        }
    }

    /// Value for the opcode field: the scaled-index class when indexed.
    pub fn code(&self) -> u8 {
        match self.index {
            Some(idx) => CLASS_SCALED | idx.scale as u8,
            None => self.class(),
        }
    }

    pub fn index_byte(&self) -> Option<u8> {
        self.index.map(|idx| (self.class() << 3) | (idx.reg & 7))
    }

    /// Appends displacement or immediate bytes.
    pub fn encode_extension(&self, imm: ImmFormat, out: &mut Vec<u8>, error: &mut ErrorAt) {
        match &self.mode {
            Addressing::Register(_) | Addressing::TopOfStack => {}
            Addressing::RegRelative { disp, .. } | Addressing::Memory { disp, .. } | Addressing::Absolute(disp) => {
                disp.encode(out, error)
            }
            Addressing::MemRelative { disp1, disp2, .. } | Addressing::External { disp1, disp2 } => {
                disp1.encode(out, error);
                disp2.encode(out, error);
            }
            Addressing::Immediate { value, at } => encode_immediate(*value, *at, imm, out, error),
        }
    }
}

fn encode_immediate(value: Literal, at: usize, imm: ImmFormat, out: &mut Vec<u8>, error: &mut ErrorAt) {
    match imm {
        ImmFormat::Int(width) => {
            let v = match value {
                Literal::Int(v) => v,
                Literal::Unsigned(v) => v as i64,
                Literal::Float(_) => {
                    error.set_error(at, ErrorKind::IllegalOperandMode);
                    0
                }
            };
            let fits = match value {
                Literal::Unsigned(_) if width < 8 => Err(ErrorKind::OverflowRange),
                _ => numeric::check_int(v, width as u32 * 8),
            };
            error.set_error_if(at, fits);
            out.extend_from_slice(&v.to_be_bytes()[8 - width..]);
        }
        ImmFormat::F32 => {
            let v = value.as_f64();
            let single = v as f32;
            if v.is_finite() && single.is_infinite() {
                error.set_error(at, ErrorKind::OverflowRange);
            }
            out.extend_from_slice(&single.to_bits().to_be_bytes());
        }
        ImmFormat::F64 => out.extend_from_slice(&value.as_f64().to_bits().to_be_bytes()),
    }
}

/// Splits a field code into the real class and, for scaled-index codes, the
/// index read from the stream.
pub fn read_index<R: ByteReader + ?Sized>(code: u8, at: usize, r: &mut R) -> Result<(u8, Option<ScaledIndex>), ErrorKind> {
    if code < CLASS_SCALED {
        return Ok((code, None));
    }
    let b = r.read_u8()?;
    let class = b >> 3;
    if class >= CLASS_SCALED || class == CLASS_IMMEDIATE {
        return Err(ErrorKind::IllegalOperandMode);
    }
    let index = ScaledIndex {
        reg: b & 7,
        scale: Scale::from_bits(code),
        at,
    };
    Ok((class, Some(index)))
}

fn read_disp<R: ByteReader + ?Sized>(r: &mut R) -> Result<Disp, ErrorKind> {
    displacement::decode(r).map(|v| Disp::new(v as i64, 0))
}

/// Reads the extension bytes of class `class`.
pub fn read_extension<R: ByteReader + ?Sized>(class: u8, imm: ImmFormat, r: &mut R) -> Result<Addressing, ErrorKind> {
    Ok(match class {
        0x00..=0x07 => Addressing::Register(class),
        0x08..=0x0F => Addressing::RegRelative {
            reg: class & 7,
            disp: read_disp(r)?,
        },
        0x10..=0x12 => {
            let disp1 = read_disp(r)?;
            let disp2 = read_disp(r)?;
            Addressing::MemRelative {
                base: MemBase::from_bits(class),
                disp1,
                disp2,
            }
        }
        CLASS_IMMEDIATE => Addressing::Immediate {
            value: read_immediate(imm, r)?,
            at: 0,
        },
        CLASS_ABSOLUTE => Addressing::Absolute(read_disp(r)?),
        CLASS_EXTERNAL => {
            let disp1 = read_disp(r)?;
            let disp2 = read_disp(r)?;
            Addressing::External { disp1, disp2 }
        }
        CLASS_TOS => Addressing::TopOfStack,
        0x18..=0x1B => Addressing::Memory {
            base: MemBase::from_bits(class),
            disp: read_disp(r)?,
        },
        _ => return Err(ErrorKind::IllegalOperandMode),
    })
}

fn read_immediate<R: ByteReader + ?Sized>(imm: ImmFormat, r: &mut R) -> Result<Literal, ErrorKind> {
    Ok(match imm {
        ImmFormat::Int(width) => {
            let mut v = 0u64;
            for _ in 0..width {
                v = (v << 8) | r.read_u8()? as u64;
            }
            Literal::Int(v as i64)
        }
        ImmFormat::F32 => Literal::Float(f32::from_bits(r.read_u32_be()?) as f64),
        ImmFormat::F64 => {
            let hi = r.read_u32_be()? as u64;
            let lo = r.read_u32_be()? as u64;
            Literal::Float(f64::from_bits((hi << 32) | lo))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn disp(v: i64) -> Disp {
        Disp::new(v, 0)
    }

    #[test]
    fn class_codes() {
        assert_eq!(GenOperand::new(Addressing::Register(5)).code(), 0x05);
        let rr = GenOperand::new(Addressing::RegRelative { reg: 2, disp: disp(4) });
        assert_eq!(rr.code(), 0x0A);
        let mr = GenOperand::new(Addressing::MemRelative { base: MemBase::Sb, disp1: disp(4), disp2: disp(8) });
        assert_eq!(mr.code(), 0x12);
        assert_eq!(GenOperand::new(Addressing::TopOfStack).code(), 0x17);
        let pc = GenOperand::new(Addressing::Memory { base: MemBase::Pc, disp: disp(-2) });
        assert_eq!(pc.code(), 0x1B);
    }

    #[test]
    fn scaled_index_substitutes_class() {
        let mut op = GenOperand::new(Addressing::Memory { base: MemBase::Fp, disp: disp(4) });
        op.index = Some(ScaledIndex { reg: 3, scale: Scale::Double, at: 0 });
        assert_eq!(op.code(), 0x1E);
        assert_eq!(op.index_byte(), Some((0x18 << 3) | 3));
    }

    #[test]
    fn extension_bytes() {
        let mut err = ErrorAt::new();
        let mut out = Vec::new();
        let ext = GenOperand::new(Addressing::External { disp1: disp(2), disp2: disp(100) });
        ext.encode_extension(ImmFormat::Int(4), &mut out, &mut err);
        assert_eq!(out, vec![0x02, 0x80, 0x64]);

        out.clear();
        let imm = GenOperand::new(Addressing::Immediate { value: Literal::Int(0x1234), at: 3 });
        imm.encode_extension(ImmFormat::Int(2), &mut out, &mut err);
        assert_eq!(out, vec![0x12, 0x34]);
        assert!(err.is_ok());

        out.clear();
        imm.encode_extension(ImmFormat::Int(1), &mut out, &mut err);
        assert_eq!(out, vec![0x34]);
        assert_eq!(err.kind(), Some(ErrorKind::OverflowRange));
        assert_eq!(err.at(), Some(3));
    }

    #[test]
    fn float_immediate_is_big_endian() {
        let mut err = ErrorAt::new();
        let mut out = Vec::new();
        let imm = GenOperand::new(Addressing::Immediate { value: Literal::Float(1.0), at: 0 });
        imm.encode_extension(ImmFormat::F32, &mut out, &mut err);
        assert_eq!(out, vec![0x3F, 0x80, 0x00, 0x00]);
        let mut r = out.as_slice();
        assert_eq!(read_extension(CLASS_IMMEDIATE, ImmFormat::F32, &mut r), Ok(Addressing::Immediate { value: Literal::Float(1.0), at: 0 }));
        assert!(err.is_ok());
    }

    #[test]
    fn single_immediate_overflow_still_emits() {
        let mut err = ErrorAt::new();
        let mut out = Vec::new();
        let imm = GenOperand::new(Addressing::Immediate { value: Literal::Float(1e300), at: 5 });
        imm.encode_extension(ImmFormat::F32, &mut out, &mut err);
        assert_eq!(out, vec![0x7F, 0x80, 0x00, 0x00]);
        assert_eq!(err.kind(), Some(ErrorKind::OverflowRange));
        assert_eq!(err.at(), Some(5));

        let mut err = ErrorAt::new();
        out.clear();
        let inf = GenOperand::new(Addressing::Immediate { value: Literal::Float(f64::INFINITY), at: 5 });
        inf.encode_extension(ImmFormat::F32, &mut out, &mut err);
        assert!(err.is_ok());
    }

    #[test]
    fn wide_unsigned_immediate() {
        let mut err = ErrorAt::new();
        let mut out = Vec::new();
        let imm = GenOperand::new(Addressing::Immediate { value: Literal::Unsigned(u64::MAX), at: 2 });
        imm.encode_extension(ImmFormat::Int(4), &mut out, &mut err);
        assert_eq!(out, vec![0xFF; 4]);
        assert_eq!(err.kind(), Some(ErrorKind::OverflowRange));
    }

    #[test]
    fn decodes_index_then_extension() {
        let mut r: &[u8] = &[(0x0A << 3) | 6, 0x10];
        let (class, idx) = read_index(0x1D, 0, &mut r).unwrap();
        assert_eq!(class, 0x0A);
        assert_eq!(idx.map(|i| (i.reg, i.scale)), Some((6, Scale::Word)));
        assert_eq!(
            read_extension(class, ImmFormat::Int(1), &mut r),
            Ok(Addressing::RegRelative { reg: 2, disp: disp(16) })
        );
    }

    #[test]
    fn rejects_reserved_and_nested() {
        let mut r: &[u8] = &[];
        assert_eq!(read_extension(CLASS_RESERVED, ImmFormat::Int(1), &mut r), Err(ErrorKind::IllegalOperandMode));
        let mut r: &[u8] = &[0x1C << 3];
        assert_eq!(read_index(0x1C, 0, &mut r), Err(ErrorKind::IllegalOperandMode));
        let mut r: &[u8] = &[CLASS_IMMEDIATE << 3];
        assert_eq!(read_index(0x1F, 0, &mut r), Err(ErrorKind::IllegalOperandMode));
    }
}
