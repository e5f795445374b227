use std::fmt::Write as _;

use super::flags::{AddrMode, Flags, OpWidth, OprPos, Slot};
use super::Ns32k;
use crate::addressing::{self, Addressing, Disp, GenOperand};
use crate::bitfield::BitField;
use crate::config::AsmConfig;
use crate::disassembler::Disassembler;
use crate::displacement;
use crate::error::ErrorKind;
use crate::insn::Insn;
use crate::memory::{ByteReader, DisMemory};
use crate::numeric::Literal;
use crate::reglist::{self, ListOrder};
use crate::table::{Entry, Page};

/// A decoded operand, ready to render.
#[derive(Debug, Clone)]
enum Decoded {
    Gen { gen: GenOperand, float: bool, size: usize },
    Int(i64),
    Target(u32),
    List(Vec<u8>),
}

/// Reads the opcode bytes `entry` needs, beyond those already consumed.
fn opcode_for<M: ByteReader + ?Sized>(insn: &mut Insn, mem: &mut M, page: &Page, entry: &Entry) -> Result<u16, ErrorKind> {
    let start = page.prefix.len();
    let wide = Flags::unpack(entry.flags).map_or(true, |f| f.width == OpWidth::Word);
    let need = start + if wide { 2 } else { 1 };
    while insn.len() < need {
        insn.read_u8(mem)?;
    }
    let b = insn.bytes();
    Ok(if wide {
        u16::from_le_bytes([b[start], b[start + 1]])
    } else {
        b[start] as u16
    })
}

fn read_disp<M: ByteReader + ?Sized>(insn: &mut Insn, mem: &mut M) -> Option<i64> {
    let at = insn.len();
    let r = displacement::decode(&mut insn.reader(mem));
    insn.error_mut().set_error_if(at, r).map(i64::from)
}

impl Disassembler for Ns32k {
    fn decode_insn<M: DisMemory + ?Sized>(&self, mem: &mut M, insn: &mut Insn, out: &mut String, config: &AsmConfig) {
        let variant = Ns32k::variant(config);
        let Ok(first) = insn.read_u8(mem) else { return };
        let found = variant.search_by_opcode(
            |page, entry| opcode_for(insn, mem, page, entry),
            |page| page.prefix.first().map_or(true, |&p| p == first),
            self,
        );
        let found = match found {
            Ok(found) => found,
            Err(kind) => {
                insn.set_error(0, kind);
                return;
            }
        };
        let Some(flags) = Flags::unpack(found.entry.flags) else {
            insn.set_error(0, ErrorKind::InternalError);
            return;
        };
        let opcode = match opcode_for(insn, mem, found.page, found.entry) {
            Ok(opcode) => opcode,
            Err(_) => return,
        };
        insn.set_name(found.entry.name);
        out.push_str(found.entry.name);

        let slots: Vec<Slot> = flags.operands().copied().collect();
        let decoded = decode_operands(&slots, opcode, insn, mem);
        let mut sep = " ";
        for d in &decoded {
            out.push_str(sep);
            sep = ", ";
            render(out, d, insn.address(), config);
        }
        if !config.uppercase {
            *out = out.to_ascii_lowercase();
        }
    }
}

/// Decodes operands in stream order and returns them in operand order,
/// stopping at the first failure.
fn decode_operands<M: ByteReader + ?Sized>(slots: &[Slot], opcode: u16, insn: &mut Insn, mem: &mut M) -> Vec<Decoded> {
    let mut done: Vec<Option<Decoded>> = vec![None; slots.len()];
    for (i, slot) in slots.iter().enumerate() {
        if slot.pos == OprPos::Short {
            let v = ((opcode >> 7) & 0xF) as i64;
            done[i] = Some(Decoded::Int(if v > 7 { v - 16 } else { v }));
        }
    }
    let gen_slots: Vec<usize> = [OprPos::Gen1, OprPos::Gen2]
        .iter()
        .filter_map(|&pos| slots.iter().position(|s| s.pos == pos && s.mode.is_generic()))
        .collect();

    let mut classes = Vec::with_capacity(2);
    for &i in &gen_slots {
        let shift = slots[i].pos.shift().unwrap_or(0);
        let code = ((opcode >> shift) & 0x1F) as u8;
        let at = insn.len();
        let r = addressing::read_index(code, at, &mut insn.reader(mem));
        match insn.error_mut().set_error_if(at, r) {
            Some(class) => classes.push((i, class)),
            None => return Vec::new(),
        }
    }
    for (i, (class, index)) in classes {
        let slot = slots[i];
        let at = insn.len();
        let r = addressing::read_extension(class, slot.size.imm_format(), &mut insn.reader(mem));
        let Some(mode) = insn.error_mut().set_error_if(at, r) else {
            return collect(done);
        };
        let size = match slot.size.imm_format() {
            addressing::ImmFormat::Int(n) => n,
            _ => 0,
        };
        done[i] = Some(Decoded::Gen {
            gen: GenOperand { mode, index },
            float: slot.mode.is_float(),
            size,
        });
    }

    let alone = slots.len() == 1;
    let mut i = 0;
    while i < slots.len() {
        let slot = slots[i];
        if slot.pos == OprPos::Implied {
            match slot.mode {
                AddrMode::Rel => {
                    let Some(d) = read_disp(insn, mem) else { break };
                    done[i] = Some(Decoded::Target(insn.address().wrapping_add(d as u32)));
                }
                AddrMode::Disp => {
                    let Some(d) = read_disp(insn, mem) else { break };
                    done[i] = Some(Decoded::Int(d));
                }
                AddrMode::RegListPush | AddrMode::RegListPop => {
                    let order = if slot.mode == AddrMode::RegListPush { ListOrder::Push } else { ListOrder::Pop };
                    let at = insn.len();
                    let Ok(mask) = insn.read_u8(mem) else { break };
                    let regs = reglist::decode(mask, order, alone, at, insn.error_mut());
                    done[i] = Some(Decoded::List(regs));
                }
                AddrMode::BfOffset if i + 1 < slots.len() => {
                    let Ok(b) = insn.read_u8(mem) else { break };
                    let field = BitField::from_byte(b);
                    done[i] = Some(Decoded::Int(field.offset as i64));
                    done[i + 1] = Some(Decoded::Int(field.length as i64));
                    i += 1;
                }
                _ => {
                    insn.set_error(insn.len(), ErrorKind::InternalError);
                    break;
                }
            }
        }
        i += 1;
    }
    collect(done)
}

fn collect(done: Vec<Option<Decoded>>) -> Vec<Decoded> {
    done.into_iter().map_while(|d| d).collect()
}

fn render_disp(out: &mut String, disp: &Disp) {
    let _ = write!(out, "{}", disp.value);
}

fn render_hex(out: &mut String, v: i64) {
    if v < 0 {
        let _ = write!(out, "-0x{:X}", v.unsigned_abs());
    } else {
        let _ = write!(out, "0x{:X}", v);
    }
}

fn render_imm(out: &mut String, v: u64, size: usize) {
    let mask = if size >= 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
    let _ = write!(out, "0x{:X}", v & mask);
}

/// Non-finite values use the names the expression scanner knows.
fn render_float(out: &mut String, v: f64) {
    if v.is_nan() {
        out.push_str("NAN");
    } else if v.is_infinite() {
        out.push_str(if v < 0.0 { "-INF" } else { "INF" });
    } else {
        let _ = write!(out, "{v:?}");
    }
}

fn render_gen(out: &mut String, gen: &GenOperand, float: bool, size: usize) {
    match gen.mode {
        Addressing::Register(n) => {
            let _ = write!(out, "{}{}", if float { 'F' } else { 'R' }, n);
        }
        Addressing::RegRelative { reg, disp } => {
            render_disp(out, &disp);
            let _ = write!(out, "(R{reg})");
        }
        Addressing::MemRelative { base, disp1, disp2 } => {
            render_disp(out, &disp2);
            out.push('(');
            render_disp(out, &disp1);
            let _ = write!(out, "({}))", base.name());
        }
        Addressing::Immediate { value, .. } => match value {
            Literal::Int(v) => render_imm(out, v as u64, size),
            Literal::Unsigned(v) => render_imm(out, v, size),
            Literal::Float(v) => render_float(out, v),
        },
        Addressing::Absolute(disp) => {
            out.push('@');
            render_hex(out, disp.value);
        }
        Addressing::External { disp1, disp2 } => {
            out.push_str("EXT(");
            render_disp(out, &disp1);
            out.push(')');
            if disp2.value != 0 {
                let _ = write!(out, "{:+}", disp2.value);
            }
        }
        Addressing::TopOfStack => out.push_str("TOS"),
        Addressing::Memory { base, disp } => {
            render_disp(out, &disp);
            let _ = write!(out, "({})", base.name());
        }
    }
    if let Some(idx) = gen.index {
        let _ = write!(out, "[R{}:{}]", idx.reg, idx.scale.suffix());
    }
}

fn render(out: &mut String, d: &Decoded, address: u32, config: &AsmConfig) {
    match d {
        Decoded::Gen { gen, float, size } => render_gen(out, gen, *float, *size),
        Decoded::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Decoded::Target(target) => {
            if config.relative_targets {
                let _ = write!(out, "*{:+}", *target as i64 - address as i64);
            } else {
                let _ = write!(out, "0x{:X}", target);
            }
        }
        Decoded::List(regs) => {
            out.push('[');
            for (k, r) in regs.iter().enumerate() {
                if k > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "R{r}");
            }
            out.push(']');
        }
    }
}
