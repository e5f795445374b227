//! National Semiconductor NS32000 series.
//!
//! Opcode words are little-endian; generic operand extensions (displacements
//! and immediates) are stored most significant byte first.

mod asm;
mod dis;
pub mod flags;
pub mod operand;
pub mod table;

use crate::addressing::CLASS_IMMEDIATE;
use crate::config::{AsmConfig, FpuType};
use crate::table::{CpuVariant, Entry, Matcher, Page};
use flags::{AddrMode, Flags, Slot};
use operand::{OprMode, Operand};

/// NS32032 with an optional NS32081 floating-point unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ns32k;

impl Ns32k {
    pub fn new() -> Self {
        Self
    }

    pub fn variant(config: &AsmConfig) -> &'static CpuVariant {
        match config.fpu {
            FpuType::None => &table::NS32032,
            FpuType::Ns32081 => &table::NS32032_FPU,
        }
    }
}

fn accepts(slot: &Slot, opr: &Operand) -> bool {
    use OprMode::*;
    let indexed = opr.gen.is_some_and(|g| g.index.is_some());
    if indexed && !slot.mode.is_generic() {
        return false;
    }
    let memory = opr.mode.is_memory();
    match slot.mode {
        AddrMode::GenRead | AddrMode::GenCount => memory || matches!(opr.mode, Reg | Imm | ImmQuick),
        AddrMode::GenWrite | AddrMode::GenRegAddr => memory || opr.mode == Reg,
        AddrMode::GenAddr => memory,
        AddrMode::GenFloat => memory || matches!(opr.mode, FReg | Imm | ImmQuick | ImmFloat),
        AddrMode::GenFloatWrite => memory || opr.mode == FReg,
        AddrMode::Rel | AddrMode::Disp | AddrMode::BfOffset | AddrMode::BfLength => {
            matches!(opr.mode, Imm | ImmQuick)
        }
        AddrMode::Quick => opr.mode == ImmQuick,
        AddrMode::RegListPush | AddrMode::RegListPop => opr.mode == RegList,
        AddrMode::None => false,
    }
}

impl Matcher for Ns32k {
    type Operands = [Operand];

    fn accept(&self, operands: &[Operand], _page: &Page, entry: &Entry) -> bool {
        let Some(flags) = Flags::unpack(entry.flags) else {
            return false;
        };
        let mut oprs = operands.iter();
        for slot in flags.operands() {
            match oprs.next() {
                Some(opr) if accepts(slot, opr) => {}
                _ => return false,
            }
        }
        oprs.next().is_none()
    }

    fn matches(&self, opcode: u16, _page: &Page, entry: &Entry) -> bool {
        let Some(flags) = Flags::unpack(entry.flags) else {
            return false;
        };
        if opcode & !flags.operand_mask() != entry.opcode {
            return false;
        }
        flags.slots.iter().all(|slot| match slot.pos.shift() {
            Some(shift) if slot.mode.is_generic() => {
                let code = ((opcode >> shift) & 0x1F) as u8;
                match slot.mode {
                    AddrMode::GenAddr => code > 7 && code != CLASS_IMMEDIATE,
                    AddrMode::GenWrite | AddrMode::GenRegAddr | AddrMode::GenFloatWrite => code != CLASS_IMMEDIATE,
                    _ => true,
                }
            }
            _ => true,
        })
    }
}
