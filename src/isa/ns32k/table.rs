//! NS32000 opcode pages.
//!
//! Opcode words are stored as read from the stream (first byte in the low
//! half). Within the no-prefix page the one-byte formats come first so that a
//! byte-wide match never needs the second byte.

use super::flags::{pack, AddrMode, OpWidth, OprPos, OprSize};
use crate::table::{CpuVariant, Entry, Page};

use AddrMode::{
    BfLength, BfOffset, Disp, GenAddr, GenCount, GenFloat, GenFloatWrite, GenRead, GenRegAddr, GenWrite, Quick, Rel,
    RegListPop, RegListPush,
};
use OprPos::{Gen1, Gen2, Implied, Short};
use OprSize::{Byte as B, Double as D, Float as F, Long as L, Word as W};

const NONE: AddrMode = AddrMode::None;

/// Formats 0 and 1: single opcode byte, operands implied.
const fn byte(opc: u8, name: &'static str, src: AddrMode, dst: AddrMode) -> Entry {
    Entry::new(opc as u16, pack(src, Implied, B, dst, Implied, B, NONE, NONE, OpWidth::Byte), name)
}

/// Format 2: quick value in the short field, generic operand in gen1.
const fn quick(opc: u16, name: &'static str, dst: AddrMode, size: OprSize, ex1: AddrMode) -> Entry {
    Entry::new(opc, pack(Quick, Short, size, dst, Gen1, size, ex1, NONE, OpWidth::Word), name)
}

/// Format 3: one generic operand in gen1.
const fn single(opc: u16, name: &'static str, src: AddrMode, size: OprSize) -> Entry {
    Entry::new(opc, pack(src, Gen1, size, NONE, Implied, B, NONE, NONE, OpWidth::Word), name)
}

/// Formats 4, 6, 7, 9 and 11: gen1 source, gen2 destination.
const fn double(opc: u16, name: &'static str, src: AddrMode, ssize: OprSize, dst: AddrMode, dsize: OprSize) -> Entry {
    Entry::new(opc, pack(src, Gen1, ssize, dst, Gen2, dsize, NONE, NONE, OpWidth::Word), name)
}

const fn binary(opc: u16, name: &'static str, src: AddrMode, dst: AddrMode, size: OprSize) -> Entry {
    double(opc, name, src, size, dst, size)
}

/// Generic operands followed by implied operands.
const fn extended(
    opc: u16,
    name: &'static str,
    src: AddrMode,
    dst: AddrMode,
    size: OprSize,
    ex1: AddrMode,
    ex2: AddrMode,
) -> Entry {
    Entry::new(opc, pack(src, Gen1, size, dst, Gen2, size, ex1, ex2, OpWidth::Word), name)
}

static BASE: &[Entry] = &[
    // format 0
    byte(0x0A, "BEQ", Rel, NONE),
    byte(0x1A, "BNE", Rel, NONE),
    byte(0x2A, "BCS", Rel, NONE),
    byte(0x3A, "BCC", Rel, NONE),
    byte(0x4A, "BHI", Rel, NONE),
    byte(0x5A, "BLS", Rel, NONE),
    byte(0x6A, "BGT", Rel, NONE),
    byte(0x7A, "BLE", Rel, NONE),
    byte(0x8A, "BFS", Rel, NONE),
    byte(0x9A, "BFC", Rel, NONE),
    byte(0xAA, "BLO", Rel, NONE),
    byte(0xBA, "BHS", Rel, NONE),
    byte(0xCA, "BLT", Rel, NONE),
    byte(0xDA, "BGE", Rel, NONE),
    byte(0xEA, "BR", Rel, NONE),
    // format 1
    byte(0x02, "BSR", Rel, NONE),
    byte(0x12, "RET", Disp, NONE),
    byte(0x22, "CXP", Disp, NONE),
    byte(0x32, "RXP", Disp, NONE),
    byte(0x42, "RETT", Disp, NONE),
    byte(0x52, "RETI", NONE, NONE),
    byte(0x62, "SAVE", RegListPush, NONE),
    byte(0x72, "RESTORE", RegListPop, NONE),
    byte(0x82, "ENTER", RegListPush, Disp),
    byte(0x92, "EXIT", RegListPop, NONE),
    byte(0xA2, "NOP", NONE, NONE),
    byte(0xB2, "WAIT", NONE, NONE),
    byte(0xC2, "DIA", NONE, NONE),
    byte(0xD2, "FLAG", NONE, NONE),
    byte(0xE2, "SVC", NONE, NONE),
    byte(0xF2, "BPT", NONE, NONE),
    // format 2
    quick(0x000C, "ADDQB", GenWrite, B, NONE),
    quick(0x000D, "ADDQW", GenWrite, W, NONE),
    quick(0x000F, "ADDQD", GenWrite, D, NONE),
    quick(0x001C, "CMPQB", GenRead, B, NONE),
    quick(0x001D, "CMPQW", GenRead, W, NONE),
    quick(0x001F, "CMPQD", GenRead, D, NONE),
    quick(0x004C, "ACBB", GenWrite, B, Rel),
    quick(0x004D, "ACBW", GenWrite, W, Rel),
    quick(0x004F, "ACBD", GenWrite, D, Rel),
    quick(0x005C, "MOVQB", GenWrite, B, NONE),
    quick(0x005D, "MOVQW", GenWrite, W, NONE),
    quick(0x005F, "MOVQD", GenWrite, D, NONE),
    // format 3
    single(0x007F, "CXPD", GenAddr, D),
    single(0x017C, "BICPSRB", GenRead, B),
    single(0x017D, "BICPSRW", GenRead, W),
    single(0x027F, "JUMP", GenAddr, D),
    single(0x037C, "BISPSRB", GenRead, B),
    single(0x037D, "BISPSRW", GenRead, W),
    single(0x057C, "ADJSPB", GenRead, B),
    single(0x057D, "ADJSPW", GenRead, W),
    single(0x057F, "ADJSPD", GenRead, D),
    single(0x067F, "JSR", GenAddr, D),
    single(0x077C, "CASEB", GenRead, B),
    single(0x077D, "CASEW", GenRead, W),
    single(0x077F, "CASED", GenRead, D),
    // format 4
    binary(0x0000, "ADDB", GenRead, GenWrite, B),
    binary(0x0001, "ADDW", GenRead, GenWrite, W),
    binary(0x0003, "ADDD", GenRead, GenWrite, D),
    binary(0x0004, "CMPB", GenRead, GenRead, B),
    binary(0x0005, "CMPW", GenRead, GenRead, W),
    binary(0x0007, "CMPD", GenRead, GenRead, D),
    binary(0x0008, "BICB", GenRead, GenWrite, B),
    binary(0x0009, "BICW", GenRead, GenWrite, W),
    binary(0x000B, "BICD", GenRead, GenWrite, D),
    binary(0x0010, "ADDCB", GenRead, GenWrite, B),
    binary(0x0011, "ADDCW", GenRead, GenWrite, W),
    binary(0x0013, "ADDCD", GenRead, GenWrite, D),
    binary(0x0014, "MOVB", GenRead, GenWrite, B),
    binary(0x0015, "MOVW", GenRead, GenWrite, W),
    binary(0x0017, "MOVD", GenRead, GenWrite, D),
    binary(0x0018, "ORB", GenRead, GenWrite, B),
    binary(0x0019, "ORW", GenRead, GenWrite, W),
    binary(0x001B, "ORD", GenRead, GenWrite, D),
    binary(0x0020, "SUBB", GenRead, GenWrite, B),
    binary(0x0021, "SUBW", GenRead, GenWrite, W),
    binary(0x0023, "SUBD", GenRead, GenWrite, D),
    binary(0x0027, "ADDR", GenAddr, GenWrite, D),
    binary(0x0028, "ANDB", GenRead, GenWrite, B),
    binary(0x0029, "ANDW", GenRead, GenWrite, W),
    binary(0x002B, "ANDD", GenRead, GenWrite, D),
    binary(0x0030, "SUBCB", GenRead, GenWrite, B),
    binary(0x0031, "SUBCW", GenRead, GenWrite, W),
    binary(0x0033, "SUBCD", GenRead, GenWrite, D),
    binary(0x0034, "TBITB", GenRead, GenRegAddr, B),
    binary(0x0035, "TBITW", GenRead, GenRegAddr, W),
    binary(0x0037, "TBITD", GenRead, GenRegAddr, D),
    binary(0x0038, "XORB", GenRead, GenWrite, B),
    binary(0x0039, "XORW", GenRead, GenWrite, W),
    binary(0x003B, "XORD", GenRead, GenWrite, D),
];

static FORMAT6: &[Entry] = &[
    double(0x0000, "ROTB", GenCount, B, GenWrite, B),
    double(0x0001, "ROTW", GenCount, B, GenWrite, W),
    double(0x0003, "ROTD", GenCount, B, GenWrite, D),
    double(0x0004, "ASHB", GenCount, B, GenWrite, B),
    double(0x0005, "ASHW", GenCount, B, GenWrite, W),
    double(0x0007, "ASHD", GenCount, B, GenWrite, D),
    binary(0x0008, "CBITB", GenRead, GenRegAddr, B),
    binary(0x0009, "CBITW", GenRead, GenRegAddr, W),
    binary(0x000B, "CBITD", GenRead, GenRegAddr, D),
    double(0x0014, "LSHB", GenCount, B, GenWrite, B),
    double(0x0015, "LSHW", GenCount, B, GenWrite, W),
    double(0x0017, "LSHD", GenCount, B, GenWrite, D),
    binary(0x0018, "SBITB", GenRead, GenRegAddr, B),
    binary(0x0019, "SBITW", GenRead, GenRegAddr, W),
    binary(0x001B, "SBITD", GenRead, GenRegAddr, D),
    binary(0x0020, "NEGB", GenRead, GenWrite, B),
    binary(0x0021, "NEGW", GenRead, GenWrite, W),
    binary(0x0023, "NEGD", GenRead, GenWrite, D),
    binary(0x0024, "NOTB", GenRead, GenWrite, B),
    binary(0x0025, "NOTW", GenRead, GenWrite, W),
    binary(0x0027, "NOTD", GenRead, GenWrite, D),
    binary(0x0030, "ABSB", GenRead, GenWrite, B),
    binary(0x0031, "ABSW", GenRead, GenWrite, W),
    binary(0x0033, "ABSD", GenRead, GenWrite, D),
    binary(0x0034, "COMB", GenRead, GenWrite, B),
    binary(0x0035, "COMW", GenRead, GenWrite, W),
    binary(0x0037, "COMD", GenRead, GenWrite, D),
    binary(0x0038, "IBITB", GenRead, GenRegAddr, B),
    binary(0x0039, "IBITW", GenRead, GenRegAddr, W),
    binary(0x003B, "IBITD", GenRead, GenRegAddr, D),
];

static FORMAT7: &[Entry] = &[
    extended(0x0008, "INSSB", GenRead, GenRegAddr, B, BfOffset, BfLength),
    extended(0x0009, "INSSW", GenRead, GenRegAddr, W, BfOffset, BfLength),
    extended(0x000B, "INSSD", GenRead, GenRegAddr, D, BfOffset, BfLength),
    extended(0x000C, "EXTSB", GenRegAddr, GenWrite, B, BfOffset, BfLength),
    extended(0x000D, "EXTSW", GenRegAddr, GenWrite, W, BfOffset, BfLength),
    extended(0x000F, "EXTSD", GenRegAddr, GenWrite, D, BfOffset, BfLength),
    double(0x0010, "MOVXBW", GenRead, B, GenWrite, W),
    double(0x0014, "MOVZBW", GenRead, B, GenWrite, W),
    double(0x0018, "MOVZBD", GenRead, B, GenWrite, D),
    double(0x0019, "MOVZWD", GenRead, W, GenWrite, D),
    double(0x001C, "MOVXBD", GenRead, B, GenWrite, D),
    double(0x001D, "MOVXWD", GenRead, W, GenWrite, D),
    binary(0x0020, "MULB", GenRead, GenWrite, B),
    binary(0x0021, "MULW", GenRead, GenWrite, W),
    binary(0x0023, "MULD", GenRead, GenWrite, D),
    binary(0x0024, "MEIB", GenRead, GenWrite, B),
    binary(0x0025, "MEIW", GenRead, GenWrite, W),
    binary(0x0027, "MEID", GenRead, GenWrite, D),
    binary(0x002C, "DEIB", GenRead, GenWrite, B),
    binary(0x002D, "DEIW", GenRead, GenWrite, W),
    binary(0x002F, "DEID", GenRead, GenWrite, D),
    binary(0x0030, "QUOB", GenRead, GenWrite, B),
    binary(0x0031, "QUOW", GenRead, GenWrite, W),
    binary(0x0033, "QUOD", GenRead, GenWrite, D),
    binary(0x0034, "REMB", GenRead, GenWrite, B),
    binary(0x0035, "REMW", GenRead, GenWrite, W),
    binary(0x0037, "REMD", GenRead, GenWrite, D),
    binary(0x0038, "MODB", GenRead, GenWrite, B),
    binary(0x0039, "MODW", GenRead, GenWrite, W),
    binary(0x003B, "MODD", GenRead, GenWrite, D),
    binary(0x003C, "DIVB", GenRead, GenWrite, B),
    binary(0x003D, "DIVW", GenRead, GenWrite, W),
    binary(0x003F, "DIVD", GenRead, GenWrite, D),
];

static FORMAT9: &[Entry] = &[
    double(0x0004, "MOVBF", GenRead, B, GenFloatWrite, F),
    double(0x0005, "MOVWF", GenRead, W, GenFloatWrite, F),
    double(0x0007, "MOVDF", GenRead, D, GenFloatWrite, F),
    double(0x0000, "MOVBL", GenRead, B, GenFloatWrite, L),
    double(0x0001, "MOVWL", GenRead, W, GenFloatWrite, L),
    double(0x0003, "MOVDL", GenRead, D, GenFloatWrite, L),
    single(0x000F, "LFSR", GenRead, D),
    double(0x0017, "MOVLF", GenFloat, L, GenFloatWrite, F),
    double(0x001B, "MOVFL", GenFloat, F, GenFloatWrite, L),
    double(0x0024, "ROUNDFB", GenFloat, F, GenWrite, B),
    double(0x0025, "ROUNDFW", GenFloat, F, GenWrite, W),
    double(0x0027, "ROUNDFD", GenFloat, F, GenWrite, D),
    double(0x0020, "ROUNDLB", GenFloat, L, GenWrite, B),
    double(0x0021, "ROUNDLW", GenFloat, L, GenWrite, W),
    double(0x0023, "ROUNDLD", GenFloat, L, GenWrite, D),
    double(0x002C, "TRUNCFB", GenFloat, F, GenWrite, B),
    double(0x002D, "TRUNCFW", GenFloat, F, GenWrite, W),
    double(0x002F, "TRUNCFD", GenFloat, F, GenWrite, D),
    double(0x0028, "TRUNCLB", GenFloat, L, GenWrite, B),
    double(0x0029, "TRUNCLW", GenFloat, L, GenWrite, W),
    double(0x002B, "TRUNCLD", GenFloat, L, GenWrite, D),
    Entry::new(
        0x0037,
        pack(GenWrite, Gen2, D, NONE, Implied, B, NONE, NONE, OpWidth::Word),
        "SFSR",
    ),
    double(0x003C, "FLOORFB", GenFloat, F, GenWrite, B),
    double(0x003D, "FLOORFW", GenFloat, F, GenWrite, W),
    double(0x003F, "FLOORFD", GenFloat, F, GenWrite, D),
    double(0x0038, "FLOORLB", GenFloat, L, GenWrite, B),
    double(0x0039, "FLOORLW", GenFloat, L, GenWrite, W),
    double(0x003B, "FLOORLD", GenFloat, L, GenWrite, D),
];

static FORMAT11: &[Entry] = &[
    binary(0x0001, "ADDF", GenFloat, GenFloatWrite, F),
    binary(0x0000, "ADDL", GenFloat, GenFloatWrite, L),
    binary(0x0005, "MOVF", GenFloat, GenFloatWrite, F),
    binary(0x0004, "MOVL", GenFloat, GenFloatWrite, L),
    binary(0x0009, "CMPF", GenFloat, GenFloat, F),
    binary(0x0008, "CMPL", GenFloat, GenFloat, L),
    binary(0x0011, "SUBF", GenFloat, GenFloatWrite, F),
    binary(0x0010, "SUBL", GenFloat, GenFloatWrite, L),
    binary(0x0015, "NEGF", GenFloat, GenFloatWrite, F),
    binary(0x0014, "NEGL", GenFloat, GenFloatWrite, L),
    binary(0x0021, "DIVF", GenFloat, GenFloatWrite, F),
    binary(0x0020, "DIVL", GenFloat, GenFloatWrite, L),
    binary(0x0031, "MULF", GenFloat, GenFloatWrite, F),
    binary(0x0030, "MULL", GenFloat, GenFloatWrite, L),
    binary(0x0035, "ABSF", GenFloat, GenFloatWrite, F),
    binary(0x0034, "ABSL", GenFloat, GenFloatWrite, L),
];

pub static PAGE_BASE: Page = Page::new(&[], BASE);
pub static PAGE_FORMAT6: Page = Page::new(&[0x4E], FORMAT6);
pub static PAGE_FORMAT7: Page = Page::new(&[0xCE], FORMAT7);
pub static PAGE_FORMAT9: Page = Page::new(&[0x3E], FORMAT9);
pub static PAGE_FORMAT11: Page = Page::new(&[0xBE], FORMAT11);

pub static NS32032: CpuVariant = CpuVariant {
    name: "NS32032",
    pages: &[&PAGE_BASE, &PAGE_FORMAT6, &PAGE_FORMAT7],
};

pub static NS32032_FPU: CpuVariant = CpuVariant {
    name: "NS32032+NS32081",
    pages: &[&PAGE_BASE, &PAGE_FORMAT6, &PAGE_FORMAT7, &PAGE_FORMAT9, &PAGE_FORMAT11],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::ns32k::flags::Flags;

    #[test]
    fn every_entry_unpacks() {
        for page in NS32032_FPU.pages {
            for e in page.entries {
                assert!(Flags::unpack(e.flags).is_some(), "{}", e.name);
            }
        }
    }

    #[test]
    fn fixed_bits_do_not_overlap_operand_fields() {
        for page in NS32032_FPU.pages {
            for e in page.entries {
                let f = Flags::unpack(e.flags).unwrap();
                assert_eq!(e.opcode & f.operand_mask(), 0, "{}", e.name);
            }
        }
    }

    #[test]
    fn byte_formats_precede_word_formats() {
        let first_word = BASE
            .iter()
            .position(|e| Flags::unpack(e.flags).unwrap().width == OpWidth::Word)
            .unwrap();
        assert!(BASE[first_word..]
            .iter()
            .all(|e| Flags::unpack(e.flags).unwrap().width == OpWidth::Word));
    }

    #[test]
    fn names_are_unique_per_variant() {
        let mut names: Vec<&str> = NS32032_FPU
            .pages
            .iter()
            .flat_map(|p| p.entries.iter().map(|e| e.name))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
