//! Operand shape descriptors packed into [`Entry::flags`](crate::table::Entry).
//!
//! Layout of the 32-bit word:
//!
//! | bits  | field                            |
//! |-------|----------------------------------|
//! | 0–3   | source addressing mode           |
//! | 4–7   | destination addressing mode      |
//! | 8–11  | first extra operand mode         |
//! | 12–15 | second extra operand mode        |
//! | 16–17 | source position                  |
//! | 18–19 | destination position             |
//! | 20–22 | source size                      |
//! | 23–25 | destination size                 |
//! | 26    | opcode width (0 byte, 1 word)    |
//!
//! Extra operands are always implied, i.e. they follow the generic operands.

use crate::addressing::ImmFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    None = 0,
    /// Any generic operand.
    GenRead = 1,
    /// Register or memory.
    GenWrite = 2,
    /// Memory only; the operand's address is used.
    GenAddr = 3,
    /// Register or memory holding a bit base or field base.
    GenRegAddr = 4,
    /// Shift or rotate count, always byte sized.
    GenCount = 5,
    GenFloat = 6,
    GenFloatWrite = 7,
    /// Branch target, encoded as a displacement from the instruction start.
    Rel = 8,
    Disp = 9,
    Quick = 10,
    RegListPush = 11,
    RegListPop = 12,
    BfOffset = 13,
    BfLength = 14,
}

impl AddrMode {
    const ALL: [AddrMode; 15] = [
        AddrMode::None,
        AddrMode::GenRead,
        AddrMode::GenWrite,
        AddrMode::GenAddr,
        AddrMode::GenRegAddr,
        AddrMode::GenCount,
        AddrMode::GenFloat,
        AddrMode::GenFloatWrite,
        AddrMode::Rel,
        AddrMode::Disp,
        AddrMode::Quick,
        AddrMode::RegListPush,
        AddrMode::RegListPop,
        AddrMode::BfOffset,
        AddrMode::BfLength,
    ];

    fn from_bits(v: u32) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    pub fn is_generic(self) -> bool {
        matches!(
            self,
            AddrMode::GenRead
                | AddrMode::GenWrite
                | AddrMode::GenAddr
                | AddrMode::GenRegAddr
                | AddrMode::GenCount
                | AddrMode::GenFloat
                | AddrMode::GenFloatWrite
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, AddrMode::GenFloat | AddrMode::GenFloatWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OprPos {
    Implied = 0,
    Gen1 = 1,
    Gen2 = 2,
    Short = 3,
}

impl OprPos {
    fn from_bits(v: u32) -> Self {
        match v & 3 {
            0 => OprPos::Implied,
            1 => OprPos::Gen1,
            2 => OprPos::Gen2,
            _ => OprPos::Short,
        }
    }

    /// Bit offset of the field inside the opcode word.
    pub fn shift(self) -> Option<u32> {
        match self {
            OprPos::Implied => None,
            OprPos::Gen1 => Some(11),
            OprPos::Gen2 => Some(6),
            OprPos::Short => Some(7),
        }
    }

    pub fn mask(self) -> u16 {
        match self {
            OprPos::Implied => 0,
            OprPos::Gen1 => 0xF800,
            OprPos::Gen2 => 0x07C0,
            OprPos::Short => 0x0780,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OprSize {
    Byte = 0,
    Word = 1,
    Double = 2,
    Quad = 3,
    Float = 4,
    Long = 5,
}

impl OprSize {
    fn from_bits(v: u32) -> Option<Self> {
        Some(match v {
            0 => OprSize::Byte,
            1 => OprSize::Word,
            2 => OprSize::Double,
            3 => OprSize::Quad,
            4 => OprSize::Float,
            5 => OprSize::Long,
            _ => return None,
        })
    }

    pub fn imm_format(self) -> ImmFormat {
        match self {
            OprSize::Byte => ImmFormat::Int(1),
            OprSize::Word => ImmFormat::Int(2),
            OprSize::Double => ImmFormat::Int(4),
            OprSize::Quad => ImmFormat::Int(8),
            OprSize::Float => ImmFormat::F32,
            OprSize::Long => ImmFormat::F64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpWidth {
    Byte = 0,
    Word = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub mode: AddrMode,
    pub pos: OprPos,
    pub size: OprSize,
}

/// Unpacked form of an entry's flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// Source, destination, then the two extra operands.
    pub slots: [Slot; 4],
    pub width: OpWidth,
}

pub const fn pack(
    src: AddrMode,
    src_pos: OprPos,
    src_size: OprSize,
    dst: AddrMode,
    dst_pos: OprPos,
    dst_size: OprSize,
    ex1: AddrMode,
    ex2: AddrMode,
    width: OpWidth,
) -> u32 {
    (src as u32)
        | (dst as u32) << 4
        | (ex1 as u32) << 8
        | (ex2 as u32) << 12
        | (src_pos as u32) << 16
        | (dst_pos as u32) << 18
        | (src_size as u32) << 20
        | (dst_size as u32) << 23
        | (width as u32) << 26
}

impl Flags {
    /// `None` when a field holds a value no mode or size uses.
    pub fn unpack(flags: u32) -> Option<Self> {
        let mode = |shift: u32| AddrMode::from_bits((flags >> shift) & 0xF);
        let implied = |mode| Slot {
            mode,
            pos: OprPos::Implied,
            size: OprSize::Byte,
        };
        let src = Slot {
            mode: mode(0)?,
            pos: OprPos::from_bits(flags >> 16),
            size: OprSize::from_bits((flags >> 20) & 7)?,
        };
        let dst = Slot {
            mode: mode(4)?,
            pos: OprPos::from_bits(flags >> 18),
            size: OprSize::from_bits((flags >> 23) & 7)?,
        };
        let width = if flags & (1 << 26) != 0 { OpWidth::Word } else { OpWidth::Byte };
        Some(Flags {
            slots: [src, dst, implied(mode(8)?), implied(mode(12)?)],
            width,
        })
    }

    /// Opcode bits filled in by operands.
    pub fn operand_mask(&self) -> u16 {
        self.slots.iter().fold(0, |m, s| m | s.pos.mask())
    }

    /// Slots that take an operand, in operand order.
    pub fn operands(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.mode != AddrMode::None)
    }
}
