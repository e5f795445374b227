//! Values, symbol lookup and a small expression scanner.

use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::numeric::{self, Literal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    /// Reference to a symbol that has no value yet; carries 0.
    Undefined,
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Signed(v) => v,
            Value::Unsigned(v) => v as i64,
            Value::Float(v) => v as i64,
            Value::Undefined => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Signed(v) => v as f64,
            Value::Unsigned(v) => v as f64,
            Value::Float(v) => v,
            Value::Undefined => 0.0,
        }
    }

    pub fn as_literal(&self) -> Literal {
        match *self {
            Value::Float(v) => Literal::Float(v),
            Value::Unsigned(v) if v > i64::MAX as u64 => Literal::Unsigned(v),
            other => Literal::Int(other.as_i64()),
        }
    }

    fn from_i64(v: i64) -> Self {
        if v < 0 {
            Value::Signed(v)
        } else {
            Value::Unsigned(v as u64)
        }
    }

    fn combine(self, rhs: Value, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Value {
        match (self, rhs) {
            (Value::Undefined, _) | (_, Value::Undefined) => Value::Undefined,
            (Value::Float(_), _) | (_, Value::Float(_)) => Value::Float(float_op(self.as_f64(), rhs.as_f64())),
            _ => Value::from_i64(int_op(self.as_i64(), rhs.as_i64())),
        }
    }
}

/// Read-only view of the caller's symbols for one call.
pub trait SymbolTable {
    fn lookup(&self, name: &str) -> Option<i64>;
}

/// Symbol table with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolTable for NoSymbols {
    fn lookup(&self, _name: &str) -> Option<i64> {
        None
    }
}

impl SymbolTable for HashMap<String, i64> {
    fn lookup(&self, name: &str) -> Option<i64> {
        self.get(name).copied()
    }
}

/// Cursor over one source line.
///
/// Positions are byte offsets into the line, which is what errors report.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

pub fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

pub fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn at(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn skip_spaces(&mut self) -> &mut Self {
        let n = self.rest().len() - self.rest().trim_start().len();
        self.pos += n;
        self
    }

    pub fn at_end(&self) -> bool {
        let rest = self.rest().trim_start();
        rest.is_empty() || rest.starts_with(';')
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    /// Consumes `c` after optional spaces.
    pub fn expect(&mut self, c: char) -> bool {
        self.skip_spaces();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consumes `word` case-insensitively when it is not followed by a symbol
    /// character.
    pub fn expect_word(&mut self, word: &str) -> bool {
        self.skip_spaces();
        let rest = self.rest();
        let Some(head) = rest.get(..word.len()) else { return false };
        if !head.eq_ignore_ascii_case(word) {
            return false;
        }
        if rest[word.len()..].chars().next().is_some_and(is_symbol_char) {
            return false;
        }
        self.pos += word.len();
        true
    }

    /// Reads a symbol name without consuming anything else.
    pub fn symbol(&mut self) -> Option<&'a str> {
        self.skip_spaces();
        let rest = self.rest();
        if !rest.chars().next().is_some_and(is_symbol_start) {
            return None;
        }
        let len = rest.find(|c: char| !is_symbol_char(c)).unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    /// Evaluates `term (('+' | '-') term)*`.
    pub fn expr(&mut self, ctx: &EvalContext<'_>) -> Result<Value, (ErrorKind, usize)> {
        let mut acc = self.term(ctx)?;
        loop {
            let save = self.pos;
            self.skip_spaces();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    let rhs = self.term(ctx)?;
                    acc = acc.combine(rhs, i64::wrapping_add, |a, b| a + b);
                }
                Some('-') => {
                    self.pos += 1;
                    let rhs = self.term(ctx)?;
                    acc = acc.combine(rhs, i64::wrapping_sub, |a, b| a - b);
                }
                _ => {
                    self.pos = save;
                    return Ok(acc);
                }
            }
        }
    }

    fn term(&mut self, ctx: &EvalContext<'_>) -> Result<Value, (ErrorKind, usize)> {
        self.skip_spaces();
        let at = self.pos;
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                let v = self.term(ctx)?;
                Ok(Value::Signed(0).combine(v, i64::wrapping_sub, |a, b| a - b))
            }
            Some('+') => {
                self.pos += 1;
                self.term(ctx)
            }
            Some('~') => {
                self.pos += 1;
                match self.term(ctx)? {
                    Value::Float(_) => Err((ErrorKind::NotAnExpression, at)),
                    Value::Undefined => Ok(Value::Undefined),
                    v => Ok(Value::from_i64(!v.as_i64())),
                }
            }
            Some('(') => {
                self.pos += 1;
                let v = self.expr(ctx)?;
                if !self.expect(')') {
                    return Err((ErrorKind::MissingClosingParen, self.pos));
                }
                Ok(v)
            }
            Some('*') => {
                self.pos += 1;
                Ok(Value::Unsigned(ctx.location as u64))
            }
            Some('\'') => self.char_literal(),
            Some(c) if c.is_ascii_digit() || c == '.' && self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()) => {
                let (lit, len) = numeric::scan_literal(self.rest(), ctx.radix).map_err(|e| (e, at))?;
                self.pos += len;
                Ok(match lit {
                    Literal::Int(v) => Value::Unsigned(v as u64),
                    Literal::Unsigned(v) => Value::Unsigned(v),
                    Literal::Float(v) => Value::Float(v),
                })
            }
            Some(c) if is_symbol_start(c) => {
                let name = self.symbol().unwrap_or_default();
                Ok(match ctx.symbols.lookup(name) {
                    Some(v) => Value::from_i64(v),
                    None => special_float(name).map_or(Value::Undefined, Value::Float),
                })
            }
            _ => Err((ErrorKind::NotAnExpression, at)),
        }
    }

    fn char_literal(&mut self) -> Result<Value, (ErrorKind, usize)> {
        let at = self.pos;
        let mut chars = self.rest()[1..].chars();
        let c = chars.next().ok_or((ErrorKind::MissingClosingQuote, at))?;
        if chars.next() != Some('\'') {
            return Err((ErrorKind::MissingClosingQuote, at));
        }
        self.pos += 2 + c.len_utf8();
        Ok(Value::Unsigned(c as u64))
    }

    /// Reads a `"..."` string; the scanner must sit on the opening quote.
    pub fn string(&mut self) -> Result<&'a str, (ErrorKind, usize)> {
        let at = self.pos;
        let body = &self.rest()[1..];
        let end = body.find('"').ok_or((ErrorKind::MissingClosingQuote, at))?;
        self.pos += end + 2;
        Ok(&body[..end])
    }
}

/// `INF` and `NAN` name non-finite floats unless a symbol shadows them.
fn special_float(name: &str) -> Option<f64> {
    if name.eq_ignore_ascii_case("INF") {
        Some(f64::INFINITY)
    } else if name.eq_ignore_ascii_case("NAN") {
        Some(f64::NAN)
    } else {
        None
    }
}

/// What an expression may refer to besides literals.
pub struct EvalContext<'a> {
    pub symbols: &'a dyn SymbolTable,
    pub location: u32,
    pub radix: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> Result<Value, (ErrorKind, usize)> {
        let mut syms = HashMap::new();
        syms.insert("label".to_string(), 0x40i64);
        let ctx = EvalContext { symbols: &syms, location: 0x100, radix: 10 };
        Scanner::new(text).expr(&ctx)
    }

    #[test]
    fn arithmetic_and_symbols() {
        assert_eq!(eval("1+2-4"), Ok(Value::Signed(-1)));
        assert_eq!(eval("label+0x10"), Ok(Value::Unsigned(0x50)));
        assert_eq!(eval("*-label"), Ok(Value::Unsigned(0xC0)));
        assert_eq!(eval("-(3+4)"), Ok(Value::Signed(-7)));
        assert_eq!(eval("'A'"), Ok(Value::Unsigned(65)));
        assert_eq!(eval("missing+1"), Ok(Value::Undefined));
        assert_eq!(eval("-1.5"), Ok(Value::Float(-1.5)));
    }

    #[test]
    fn non_finite_names() {
        assert_eq!(eval("inf"), Ok(Value::Float(f64::INFINITY)));
        assert_eq!(eval("-INF"), Ok(Value::Float(f64::NEG_INFINITY)));
        assert!(matches!(eval("NaN"), Ok(Value::Float(v)) if v.is_nan()));
        let mut syms = HashMap::new();
        syms.insert("nan".to_string(), 3i64);
        let ctx = EvalContext { symbols: &syms, location: 0, radix: 10 };
        assert_eq!(Scanner::new("nan").expr(&ctx), Ok(Value::Unsigned(3)));
    }

    #[test]
    fn wide_unsigned_keeps_its_sign() {
        let v = eval("0x8000000000000000").unwrap();
        assert_eq!(v, Value::Unsigned(1 << 63));
        assert_eq!(v.as_literal(), Literal::Unsigned(1 << 63));
        assert_eq!(v.as_f64(), 9.223372036854776e18);
        assert_eq!(Value::Unsigned(5).as_literal(), Literal::Int(5));
    }

    #[test]
    fn stops_before_register_suffix() {
        let syms = NoSymbols;
        let ctx = EvalContext { symbols: &syms, location: 0, radix: 10 };
        let mut s = Scanner::new("8(R2)");
        assert_eq!(s.expr(&ctx), Ok(Value::Unsigned(8)));
        assert_eq!(s.rest(), "(R2)");
    }

    #[test]
    fn reports_positions() {
        assert_eq!(eval("1+"), Err((ErrorKind::NotAnExpression, 2)));
        assert_eq!(eval("(1+2"), Err((ErrorKind::MissingClosingParen, 4)));
        assert_eq!(eval("'A"), Err((ErrorKind::MissingClosingQuote, 0)));
    }

    #[test]
    fn words_are_whole() {
        let mut s = Scanner::new("  TOSS");
        assert!(!s.expect_word("TOS"));
        assert!(s.expect_word("toss"));
        assert!(s.at_end());
    }
}
