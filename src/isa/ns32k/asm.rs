use tracing::debug;

use super::flags::{AddrMode, Flags, OpWidth, OprPos, Slot};
use super::operand::Operand;
use super::{accepts, Ns32k};
use crate::addressing::{Disp, GenOperand};
use crate::assembler::Assembler;
use crate::bitfield;
use crate::config::AsmConfig;
use crate::error::ErrorKind;
use crate::insn::{ByteOrder, Insn};
use crate::reglist::{self, ListOrder};
use crate::table::{CpuVariant, Found};
use crate::value::{EvalContext, Scanner};

fn parse_operands(scan: &mut Scanner<'_>, ctx: &EvalContext<'_>) -> Result<Vec<Operand>, (ErrorKind, usize)> {
    let mut operands = Vec::new();
    if scan.at_end() {
        return Ok(operands);
    }
    loop {
        operands.push(Operand::parse(scan, ctx)?);
        if !scan.expect(',') {
            break;
        }
    }
    if !scan.at_end() {
        return Err((ErrorKind::GarbageAtEnd, scan.skip_spaces().pos()));
    }
    Ok(operands)
}

fn emit_disp(insn: &mut Insn, disp: Disp) {
    let mut buf = Vec::with_capacity(4);
    disp.encode(&mut buf, insn.error_mut());
    insn.emit_bytes(&buf);
}

fn value_disp(opr: &Operand, value: i64) -> Disp {
    Disp {
        value,
        undefined: opr.value.is_undefined(),
        at: opr.at,
    }
}

impl Assembler for Ns32k {
    fn data_order(&self) -> ByteOrder {
        ByteOrder::Little
    }

    fn encode_insn(
        &self,
        name: &str,
        name_at: usize,
        scan: &mut Scanner<'_>,
        ctx: &EvalContext<'_>,
        insn: &mut Insn,
        config: &AsmConfig,
    ) {
        let operands = match parse_operands(scan, ctx) {
            Ok(operands) => operands,
            Err((kind, at)) => {
                insn.set_error(at, kind);
                return;
            }
        };
        let variant = Ns32k::variant(config);
        let found = match variant.search_by_name(name, operands.as_slice(), self) {
            Ok(found) => found,
            Err(ErrorKind::OperandNotAllowed) => {
                let at = rejected_at(variant, name, &operands, scan.skip_spaces().pos());
                insn.set_error(at, ErrorKind::OperandNotAllowed);
                return;
            }
            Err(kind) => {
                insn.set_error(name_at, kind);
                return;
            }
        };
        let Some(flags) = Flags::unpack(found.entry.flags) else {
            insn.set_error(name_at, ErrorKind::InternalError);
            return;
        };
        debug!(name = found.entry.name, variant = variant.name, "encode");
        insn.set_name(found.entry.name);
        let pairs: Vec<(Slot, &Operand)> = flags.operands().copied().zip(operands.iter()).collect();
        emit(insn, found, &flags, &pairs);
    }
}

/// Offset of the first operand no entry named `name` accepts, taking the
/// entry that accepts the longest run; `end` when operands are missing.
fn rejected_at(variant: &CpuVariant, name: &str, operands: &[Operand], end: usize) -> usize {
    let accepted = variant
        .pages
        .iter()
        .flat_map(|page| page.by_name(name))
        .filter_map(|entry| Flags::unpack(entry.flags))
        .map(|flags| {
            flags
                .operands()
                .zip(operands)
                .take_while(|(slot, opr)| accepts(slot, opr))
                .count()
        })
        .max()
        .unwrap_or(0);
    operands.get(accepted).map_or(end, |opr| opr.at)
}

fn gen_at<'a>(pairs: &[(Slot, &'a Operand)], pos: OprPos) -> Option<(Slot, GenOperand)> {
    pairs
        .iter()
        .find(|(slot, _)| slot.pos == pos && slot.mode.is_generic())
        .and_then(|(slot, opr)| opr.gen.map(|g| (*slot, g)))
}

fn emit(insn: &mut Insn, found: Found, flags: &Flags, pairs: &[(Slot, &Operand)]) {
    let mut opcode = found.entry.opcode;
    for (slot, opr) in pairs {
        let Some(shift) = slot.pos.shift() else { continue };
        if slot.mode.is_generic() {
            let code = opr.gen.map_or(0, |g| g.code());
            opcode |= (code as u16) << shift;
        } else {
            let v = opr.value.as_i64();
            if !(-8..=7).contains(&v) {
                insn.set_error(opr.at, ErrorKind::OverflowRange);
            }
            opcode |= ((v & 0xF) as u16) << shift;
        }
    }

    insn.emit_bytes(found.page.prefix);
    match flags.width {
        OpWidth::Byte => insn.emit_u8(opcode as u8),
        OpWidth::Word => insn.emit_u16(opcode, ByteOrder::Little),
    }

    let gens = [gen_at(pairs, OprPos::Gen1), gen_at(pairs, OprPos::Gen2)];
    for (_, gen) in gens.iter().flatten() {
        if let Some(b) = gen.index_byte() {
            insn.emit_u8(b);
        }
    }
    for (slot, gen) in gens.iter().flatten() {
        let mut buf = Vec::new();
        gen.encode_extension(slot.size.imm_format(), &mut buf, insn.error_mut());
        insn.emit_bytes(&buf);
    }

    let alone = pairs.len() == 1;
    let mut implied = pairs.iter().filter(|(slot, _)| slot.pos == OprPos::Implied);
    while let Some((slot, opr)) = implied.next() {
        match slot.mode {
            AddrMode::Rel => {
                let disp = opr.value.as_i64() - insn.address() as i64;
                emit_disp(insn, value_disp(opr, disp));
            }
            AddrMode::Disp => emit_disp(insn, value_disp(opr, opr.value.as_i64())),
            AddrMode::RegListPush | AddrMode::RegListPop => {
                let order = if slot.mode == AddrMode::RegListPush { ListOrder::Push } else { ListOrder::Pop };
                let mask = reglist::encode(opr.list.iter().copied(), order, insn.error_mut());
                if mask == 0 && alone {
                    insn.set_error(opr.at, ErrorKind::OpcodeHasNoEffect);
                }
                insn.emit_u8(mask);
            }
            AddrMode::BfOffset => {
                let Some((_, len)) = implied.next() else {
                    insn.set_error(opr.at, ErrorKind::InternalError);
                    return;
                };
                let length = if len.value.is_undefined() { 1 } else { len.value.as_i64() };
                let byte = bitfield::encode(opr.value.as_i64(), opr.at, length, len.at, insn.error_mut());
                insn.emit_u8(byte);
            }
            _ => {
                insn.set_error(opr.at, ErrorKind::InternalError);
                return;
            }
        }
    }
}
