//! Directives every architecture shares: location control, configuration and
//! data definition.

use tracing::debug;

use crate::config::AsmConfig;
use crate::error::ErrorKind;
use crate::insn::{ByteOrder, Insn};
use crate::numeric::{self, Float80, Packed96};
use crate::value::{EvalContext, Scanner, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Org,
    Align,
    Cpu,
    Option,
    Byte,
    Word,
    Double,
    Quad,
    Float,
    Long,
    XFloat,
    Packed,
}

impl Directive {
    pub fn lookup(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Some(match upper.trim_start_matches('.') {
            "ORG" => Directive::Org,
            "ALIGN" => Directive::Align,
            "CPU" => Directive::Cpu,
            "OPTION" => Directive::Option,
            _ if !upper.starts_with('.') => return None,
            "BYTE" => Directive::Byte,
            "WORD" => Directive::Word,
            "DOUBLE" => Directive::Double,
            "QUAD" => Directive::Quad,
            "FLOAT" => Directive::Float,
            "LONG" => Directive::Long,
            "XFLOAT" => Directive::XFloat,
            "PACKED" => Directive::Packed,
            _ => return None,
        })
    }

    fn int_width(self) -> Option<usize> {
        match self {
            Directive::Byte => Some(1),
            Directive::Word => Some(2),
            Directive::Double => Some(4),
            Directive::Quad => Some(8),
            _ => None,
        }
    }
}

/// Reads a bare token up to a space, comma or comment.
fn token<'a>(scan: &mut Scanner<'a>) -> Option<&'a str> {
    scan.skip_spaces();
    let rest = scan.rest();
    let len = rest.find(|c: char| c.is_whitespace() || c == ',' || c == ';').unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    scan.advance(len);
    Some(&rest[..len])
}

fn int_value(scan: &mut Scanner<'_>, ctx: &EvalContext<'_>) -> Result<(i64, usize), (ErrorKind, usize)> {
    let at = scan.skip_spaces().pos();
    match scan.expr(ctx)? {
        Value::Undefined => Err((ErrorKind::UndefinedSymbol, at)),
        Value::Float(_) => Err((ErrorKind::IllegalConstant, at)),
        v => Ok((v.as_i64(), at)),
    }
}

/// Applies `dir` to the rest of the line.
pub fn apply(
    dir: Directive,
    scan: &mut Scanner<'_>,
    ctx: &EvalContext<'_>,
    insn: &mut Insn,
    config: &mut AsmConfig,
    order: ByteOrder,
) -> Result<(), (ErrorKind, usize)> {
    debug!(?dir, address = insn.address(), "directive");
    match dir {
        Directive::Org => {
            let (v, at) = int_value(scan, ctx)?;
            let addr = u32::try_from(v).map_err(|_| (ErrorKind::OverflowRange, at))?;
            insn.set_address(addr);
        }
        Directive::Align => {
            let (n, at) = int_value(scan, ctx)?;
            if n <= 0 || n & (n - 1) != 0 {
                return Err((ErrorKind::IllegalAlignment, at));
            }
            let n = n as u64;
            let aligned = (insn.address() as u64 + n - 1) & !(n - 1);
            let addr = u32::try_from(aligned).map_err(|_| (ErrorKind::OverflowRange, at))?;
            insn.set_address(addr);
        }
        Directive::Cpu => {
            let at = scan.skip_spaces().pos();
            let name = token(scan).ok_or((ErrorKind::MissingOperand, at))?;
            config.set_cpu(name).map_err(|e| (e, at))?;
        }
        Directive::Option => {
            let at = scan.skip_spaces().pos();
            let name = token(scan).ok_or((ErrorKind::MissingOperand, at))?;
            if !scan.expect(',') {
                return Err((ErrorKind::MissingOperand, scan.pos()));
            }
            let value_at = scan.skip_spaces().pos();
            let value = token(scan).ok_or((ErrorKind::MissingOperand, value_at))?;
            config.set_option(name, value).map_err(|e| {
                let at = if e == ErrorKind::UnknownOption { at } else { value_at };
                (e, at)
            })?;
        }
        _ => data(dir, scan, ctx, insn, order)?,
    }
    Ok(())
}

/// Emits a comma-separated list of values. Out-of-range values are still
/// emitted, truncated, so the length never depends on the values.
fn data(
    dir: Directive,
    scan: &mut Scanner<'_>,
    ctx: &EvalContext<'_>,
    insn: &mut Insn,
    order: ByteOrder,
) -> Result<(), (ErrorKind, usize)> {
    if scan.at_end() {
        return Err((ErrorKind::MissingOperand, scan.skip_spaces().pos()));
    }
    loop {
        let at = scan.skip_spaces().pos();
        if dir == Directive::Byte && scan.peek() == Some('"') {
            let text = scan.string()?;
            insn.emit_bytes(text.as_bytes());
        } else {
            let value = scan.expr(ctx)?;
            emit_value(dir, value, at, insn, order);
        }
        if !scan.expect(',') {
            return Ok(());
        }
    }
}

fn emit_value(dir: Directive, value: Value, at: usize, insn: &mut Insn, order: ByteOrder) {
    if let Some(width) = dir.int_width() {
        if value.is_float() {
            insn.set_error(at, ErrorKind::IllegalConstant);
        }
        let r = numeric::emit_int(insn, value.as_i64(), width, order);
        insn.error_mut().set_error_if(at, r);
        return;
    }
    let lit = value.as_literal();
    match dir {
        Directive::Float => {
            let v = lit.as_f64();
            let single = v as f32;
            if v.is_finite() && single.is_infinite() {
                insn.set_error(at, ErrorKind::OverflowRange);
            }
            insn.emit_u32(single.to_bits(), order);
        }
        Directive::Long => insn.emit_u64(lit.as_f64().to_bits(), order),
        Directive::XFloat => Float80::from_literal(lit).emit(insn, order),
        Directive::Packed => Packed96::from_literal(lit).emit(insn, order),
        _ => insn.set_error(at, ErrorKind::InternalError).emit_u8(0),
    }
}
