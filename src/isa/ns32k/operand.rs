//! Operand syntax.

use crate::addressing::{Addressing, Disp, GenOperand, MemBase, Scale, ScaledIndex};
use crate::error::ErrorKind;
use crate::value::{EvalContext, Scanner, Value};

/// Shape of a parsed operand, as seen by the acceptance predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OprMode {
    Reg,
    FReg,
    RelReg,
    MemRel,
    Abs,
    Ext,
    Tos,
    Mem,
    /// Integer immediate outside the quick range.
    Imm,
    /// Integer immediate in -8..=7, or not yet defined.
    ImmQuick,
    ImmFloat,
    RegList,
}

impl OprMode {
    pub fn is_memory(self) -> bool {
        matches!(
            self,
            OprMode::RelReg | OprMode::MemRel | OprMode::Abs | OprMode::Ext | OprMode::Tos | OprMode::Mem
        )
    }

    pub fn is_immediate(self) -> bool {
        matches!(self, OprMode::Imm | OprMode::ImmQuick | OprMode::ImmFloat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub mode: OprMode,
    pub at: usize,
    /// Generic form; present for everything but register lists.
    pub gen: Option<GenOperand>,
    /// Expression value of immediates.
    pub value: Value,
    /// Register-list members: register number, or `None` for a name that is
    /// not a general register, with its offset.
    pub list: Vec<(Option<u8>, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reg {
    Gen(u8),
    Float(u8),
    Base(MemBase),
    Tos,
}

fn register(scan: &mut Scanner<'_>) -> Option<Reg> {
    let save = scan.pos();
    let name = scan.symbol()?;
    let upper = name.to_ascii_uppercase();
    let reg = match upper.as_bytes() {
        [b'R', n @ b'0'..=b'7'] => Reg::Gen(n - b'0'),
        [b'F', n @ b'0'..=b'7'] => Reg::Float(n - b'0'),
        b"FP" => Reg::Base(MemBase::Fp),
        b"SP" => Reg::Base(MemBase::Sp),
        b"SB" => Reg::Base(MemBase::Sb),
        b"PC" => Reg::Base(MemBase::Pc),
        b"TOS" => Reg::Tos,
        _ => {
            scan.set_pos(save);
            return None;
        }
    };
    Some(reg)
}

fn disp(value: Value, at: usize) -> Result<Disp, (ErrorKind, usize)> {
    if value.is_float() {
        return Err((ErrorKind::IllegalConstant, at));
    }
    Ok(Disp {
        value: value.as_i64(),
        undefined: value.is_undefined(),
        at,
    })
}

fn close(scan: &mut Scanner<'_>) -> Result<(), (ErrorKind, usize)> {
    if scan.expect(')') {
        Ok(())
    } else {
        Err((ErrorKind::MissingClosingParen, scan.pos()))
    }
}

impl Operand {
    fn new(mode: OprMode, at: usize, gen: Addressing) -> Self {
        Self {
            mode,
            at,
            gen: Some(GenOperand::new(gen)),
            value: Value::Undefined,
            list: Vec::new(),
        }
    }

    /// Parses one operand, leaving the scanner just past it.
    pub fn parse(scan: &mut Scanner<'_>, ctx: &EvalContext<'_>) -> Result<Operand, (ErrorKind, usize)> {
        scan.skip_spaces();
        let at = scan.pos();
        if scan.expect('[') {
            return Self::parse_list(scan, at);
        }
        let mut opr = match register(scan) {
            Some(Reg::Gen(n)) => Self::new(OprMode::Reg, at, Addressing::Register(n)),
            Some(Reg::Float(n)) => Self::new(OprMode::FReg, at, Addressing::Register(n)),
            Some(Reg::Tos) => Self::new(OprMode::Tos, at, Addressing::TopOfStack),
            Some(Reg::Base(_)) => return Err((ErrorKind::RegisterNotAllowed, at)),
            None => Self::parse_expr_form(scan, ctx, at)?,
        };
        let save = scan.pos();
        if scan.expect('[') {
            if opr.mode.is_immediate() || opr.mode == OprMode::FReg {
                return Err((ErrorKind::IllegalOperandMode, save));
            }
            let index = Self::parse_index(scan, save)?;
            if let Some(gen) = opr.gen.as_mut() {
                gen.index = Some(index);
            }
        }
        Ok(opr)
    }

    fn parse_expr_form(scan: &mut Scanner<'_>, ctx: &EvalContext<'_>, at: usize) -> Result<Operand, (ErrorKind, usize)> {
        if scan.expect('@') {
            let vat = scan.skip_spaces().pos();
            let v = scan.expr(ctx)?;
            return Ok(Self::new(OprMode::Abs, at, Addressing::Absolute(disp(v, vat)?)));
        }
        if scan.expect_word("EXT") {
            if !scan.expect('(') {
                return Err((ErrorKind::UnknownOperand, at));
            }
            let at1 = scan.skip_spaces().pos();
            let disp1 = disp(scan.expr(ctx)?, at1)?;
            close(scan)?;
            let at2 = scan.skip_spaces().pos();
            let disp2 = match scan.peek() {
                Some('+' | '-') => disp(scan.expr(ctx)?, at2)?,
                _ => Disp::new(0, at2),
            };
            return Ok(Self::new(OprMode::Ext, at, Addressing::External { disp1, disp2 }));
        }

        // `(Rn)` and `(FP)` stand for a zero displacement
        let save = scan.pos();
        if scan.expect('(') {
            if let Some(reg) = register(scan) {
                if scan.expect(')') {
                    return Self::based(reg, Disp::new(0, at), at);
                }
            }
            scan.set_pos(save);
        }

        let v = scan.expr(ctx)?;
        let save = scan.pos();
        if !scan.expect('(') {
            return Ok(Self::immediate(v, at));
        }
        if let Some(reg) = register(scan) {
            close(scan)?;
            return Self::based(reg, disp(v, at)?, at);
        }
        // disp2(disp1(base))
        let at1 = scan.skip_spaces().pos();
        let inner = scan.expr(ctx)?;
        if !scan.expect('(') {
            scan.set_pos(save);
            return Err((ErrorKind::UnknownOperand, at1));
        }
        let base_at = scan.skip_spaces().pos();
        let base = match register(scan) {
            Some(Reg::Base(b)) if b != MemBase::Pc => b,
            _ => return Err((ErrorKind::RegisterNotAllowed, base_at)),
        };
        close(scan)?;
        close(scan)?;
        let mode = Addressing::MemRelative {
            base,
            disp1: disp(inner, at1)?,
            disp2: disp(v, at)?,
        };
        Ok(Self::new(OprMode::MemRel, at, mode))
    }

    fn based(reg: Reg, disp: Disp, at: usize) -> Result<Operand, (ErrorKind, usize)> {
        match reg {
            Reg::Gen(n) => Ok(Self::new(OprMode::RelReg, at, Addressing::RegRelative { reg: n, disp })),
            Reg::Base(base) => Ok(Self::new(OprMode::Mem, at, Addressing::Memory { base, disp })),
            _ => Err((ErrorKind::RegisterNotAllowed, at)),
        }
    }

    fn immediate(value: Value, at: usize) -> Operand {
        let mode = match value {
            Value::Float(_) => OprMode::ImmFloat,
            Value::Undefined => OprMode::ImmQuick,
            v if (-8..=7).contains(&v.as_i64()) => OprMode::ImmQuick,
            _ => OprMode::Imm,
        };
        let mut opr = Self::new(mode, at, Addressing::Immediate { value: value.as_literal(), at });
        opr.value = value;
        opr
    }

    fn parse_index(scan: &mut Scanner<'_>, at: usize) -> Result<ScaledIndex, (ErrorKind, usize)> {
        let reg_at = scan.skip_spaces().pos();
        let reg = match register(scan) {
            Some(Reg::Gen(n)) => n,
            Some(_) => return Err((ErrorKind::RegisterNotAllowed, reg_at)),
            None => return Err((ErrorKind::UnknownOperand, reg_at)),
        };
        if !scan.expect(':') {
            return Err((ErrorKind::UnknownOperand, scan.pos()));
        }
        let scale_at = scan.skip_spaces().pos();
        let scale = match scan.symbol().map(|s| s.to_ascii_uppercase()).as_deref() {
            Some("B") => Scale::Byte,
            Some("W") => Scale::Word,
            Some("D") => Scale::Double,
            Some("Q") => Scale::Quad,
            _ => return Err((ErrorKind::UnknownOperand, scale_at)),
        };
        if !scan.expect(']') {
            return Err((ErrorKind::MissingClosingBracket, scan.pos()));
        }
        Ok(ScaledIndex { reg, scale, at })
    }

    fn parse_list(scan: &mut Scanner<'_>, at: usize) -> Result<Operand, (ErrorKind, usize)> {
        let mut list = Vec::new();
        if !scan.expect(']') {
            loop {
                let reg_at = scan.skip_spaces().pos();
                match register(scan) {
                    Some(Reg::Gen(n)) => list.push((Some(n), reg_at)),
                    Some(_) => list.push((None, reg_at)),
                    None if scan.symbol().is_some() => list.push((None, reg_at)),
                    None => return Err((ErrorKind::UnknownOperand, reg_at)),
                }
                if scan.expect(',') {
                    continue;
                }
                if scan.expect(']') {
                    break;
                }
                return Err((ErrorKind::MissingClosingBracket, scan.pos()));
            }
        }
        Ok(Operand {
            mode: OprMode::RegList,
            at,
            gen: None,
            value: Value::Undefined,
            list,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Literal;
    use crate::value::NoSymbols;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Operand, (ErrorKind, usize)> {
        let ctx = EvalContext { symbols: &NoSymbols, location: 0x1000, radix: 10 };
        let mut scan = Scanner::new(text);
        let opr = Operand::parse(&mut scan, &ctx)?;
        assert!(scan.at_end(), "left over: {:?}", scan.rest());
        Ok(opr)
    }

    fn gen(text: &str) -> Addressing {
        parse(text).unwrap().gen.unwrap().mode
    }

    #[test]
    fn registers_and_stack() {
        assert_eq!(parse("r3").unwrap().mode, OprMode::Reg);
        assert_eq!(parse("F6").unwrap().mode, OprMode::FReg);
        assert_eq!(gen("TOS"), Addressing::TopOfStack);
        assert_eq!(parse("SP"), Err((ErrorKind::RegisterNotAllowed, 0)));
    }

    #[test]
    fn memory_forms() {
        assert_eq!(gen("8(R2)"), Addressing::RegRelative { reg: 2, disp: Disp::new(8, 0) });
        assert_eq!(gen("(R2)"), Addressing::RegRelative { reg: 2, disp: Disp::new(0, 0) });
        assert_eq!(gen("-4(FP)"), Addressing::Memory { base: MemBase::Fp, disp: Disp::new(-4, 0) });
        assert_eq!(
            gen("4(8(SB))"),
            Addressing::MemRelative { base: MemBase::Sb, disp1: Disp::new(8, 2), disp2: Disp::new(4, 0) }
        );
        assert_eq!(gen("@0x200"), Addressing::Absolute(Disp::new(0x200, 1)));
        assert_eq!(
            gen("EXT(3)+12"),
            Addressing::External { disp1: Disp::new(3, 4), disp2: Disp::new(12, 6) }
        );
    }

    #[test]
    fn immediates_classify_by_value() {
        assert_eq!(parse("7").unwrap().mode, OprMode::ImmQuick);
        assert_eq!(parse("-8").unwrap().mode, OprMode::ImmQuick);
        assert_eq!(parse("8").unwrap().mode, OprMode::Imm);
        assert_eq!(parse("later").unwrap().mode, OprMode::ImmQuick);
        assert_eq!(parse("2.5").unwrap().mode, OprMode::ImmFloat);
        assert_eq!(gen("1000"), Addressing::Immediate { value: Literal::Int(1000), at: 0 });
    }

    #[test]
    fn scaled_index_suffix() {
        let opr = parse("4(FP)[R1:W]").unwrap();
        let idx = opr.gen.unwrap().index.unwrap();
        assert_eq!((idx.reg, idx.scale), (1, Scale::Word));
        assert_eq!(parse("5[R1:B]"), Err((ErrorKind::IllegalOperandMode, 1)));
        assert_eq!(parse("R0[R1:X]"), Err((ErrorKind::UnknownOperand, 6)));
    }

    #[test]
    fn register_lists() {
        let opr = parse("[R0, R2,FP]").unwrap();
        assert_eq!(opr.mode, OprMode::RegList);
        assert_eq!(opr.list, vec![(Some(0), 1), (Some(2), 5), (None, 8)]);
        assert!(parse("[]").unwrap().list.is_empty());
        assert_eq!(parse("[R0, R1"), Err((ErrorKind::MissingClosingBracket, 7)));
        assert_eq!(parse("[R9, R1]").unwrap().list, vec![(None, 1), (Some(1), 5)]);
        assert_eq!(parse("[R1, 3]"), Err((ErrorKind::UnknownOperand, 5)));
    }

    #[test]
    fn unbalanced_parens() {
        assert_eq!(parse("4(R1"), Err((ErrorKind::MissingClosingParen, 4)));
        assert_eq!(parse("4(8(SP)"), Err((ErrorKind::MissingClosingParen, 7)));
        assert_eq!(parse("4(8(R1))"), Err((ErrorKind::RegisterNotAllowed, 4)));
    }
}
