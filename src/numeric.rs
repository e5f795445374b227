//! Integer range checks and floating-point wire formats.

use num_traits::Float;

use crate::error::ErrorKind;
use crate::insn::{ByteOrder, Insn};

/// A numeric literal as written in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i64),
    /// Integer above `i64::MAX`.
    Unsigned(u64),
    Float(f64),
}

impl Literal {
    pub fn as_f64(self) -> f64 {
        match self {
            Literal::Int(v) => v as f64,
            Literal::Unsigned(v) => v as f64,
            Literal::Float(v) => v,
        }
    }

    /// Sign and magnitude of an integer literal.
    pub fn magnitude(self) -> Option<(bool, u64)> {
        match self {
            Literal::Int(v) => Some((v < 0, v.unsigned_abs())),
            Literal::Unsigned(v) => Some((false, v)),
            Literal::Float(_) => None,
        }
    }
}

/// Accepts anything representable in `bits` as either a signed or an
/// unsigned quantity.
pub fn check_int(value: i64, bits: u32) -> Result<(), ErrorKind> {
    if bits >= 64 {
        return Ok(());
    }
    let min = -(1i128 << (bits - 1));
    let max = (1i128 << bits) - 1;
    if (min..=max).contains(&(value as i128)) {
        Ok(())
    } else {
        Err(ErrorKind::OverflowRange)
    }
}

/// Emits the low `width` bytes of `value` after range-checking it. The value
/// is written even when it does not fit.
pub fn emit_int(insn: &mut Insn, value: i64, width: usize, order: ByteOrder) -> Result<(), ErrorKind> {
    let checked = check_int(value, width as u32 * 8);
    insn.emit_uint(value as u64, width, order);
    checked
}

pub const EXT_BIAS: i32 = 16383;
pub const EXT_EXP_MAX: u16 = 0x7FFF;

/// 80-bit extended precision: sign, 15-bit biased exponent, 64-bit
/// significand with explicit integer bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Float80 {
    /// Sign bit and biased exponent.
    pub tag: u16,
    pub significand: u64,
}

impl Float80 {
    pub fn exponent(&self) -> u16 {
        self.tag & EXT_EXP_MAX
    }

    pub fn is_negative(&self) -> bool {
        self.tag & 0x8000 != 0
    }

    pub fn from_float<F: Float>(v: F) -> Self {
        let sign = if v.is_sign_negative() { 0x8000u16 } else { 0 };
        if v.is_nan() {
            return Self {
                tag: sign | EXT_EXP_MAX,
                significand: 0xC000_0000_0000_0000,
            };
        }
        if v.is_infinite() {
            return Self {
                tag: sign | EXT_EXP_MAX,
                significand: 0,
            };
        }
        if v.is_zero() {
            return Self { tag: sign, significand: 0 };
        }
        let (mantissa, exp, _) = v.integer_decode();
        let lz = mantissa.leading_zeros();
        let significand = mantissa << lz;
        // binary exponent of the leading one
        let log2 = exp as i32 + (63 - lz as i32);
        let biased = (log2 + EXT_BIAS).clamp(0, EXT_EXP_MAX as i32 - 1) as u16;
        Self {
            tag: sign | biased,
            significand,
        }
    }

    /// Integers convert exactly; the significand holds all 64 bits.
    pub fn from_literal(lit: Literal) -> Self {
        match lit.magnitude() {
            None => Self::from_float(lit.as_f64()),
            Some((_, 0)) => Self { tag: 0, significand: 0 },
            Some((negative, magnitude)) => {
                let sign = if negative { 0x8000u16 } else { 0 };
                let lz = magnitude.leading_zeros();
                Self {
                    tag: sign | (63 - lz as i32 + EXT_BIAS) as u16,
                    significand: magnitude << lz,
                }
            }
        }
    }

    pub fn to_f64(&self) -> f64 {
        let sign = if self.is_negative() { -1.0 } else { 1.0 };
        let exp = self.exponent();
        if exp == EXT_EXP_MAX {
            // integer bit ignored
            return if self.significand << 1 == 0 {
                sign * f64::INFINITY
            } else {
                f64::NAN
            };
        }
        if self.significand == 0 {
            return sign * 0.0;
        }
        let mut e = exp as i32 - EXT_BIAS - 63;
        let mut v = self.significand as f64;
        // two steps so subnormal results are not flushed early
        if e < -1000 {
            v *= 2f64.powi(-1000);
            e += 1000;
        }
        sign * v * 2f64.powi(e)
    }

    pub fn emit(&self, insn: &mut Insn, order: ByteOrder) {
        match order {
            ByteOrder::Little => {
                insn.emit_u64(self.significand, order);
                insn.emit_u16(self.tag, order);
            }
            ByteOrder::Big => {
                insn.emit_u16(self.tag, order);
                insn.emit_u64(self.significand, order);
            }
        }
    }
}

/// 96-bit packed decimal: word 0 holds the signs, a 3-digit decimal
/// exponent and the integer digit; words 1 and 2 hold 16 fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packed96(pub [u32; 3]);

const PACKED_MANT_SIGN: u32 = 1 << 31;
const PACKED_EXP_SIGN: u32 = 1 << 30;
const PACKED_SPECIAL: u32 = 0x7FFF_0000;
/// Integers below this take the exact digit path.
const PACKED_INT_LIMIT: u64 = 1_000_000_000_000_000_000;
const PACKED_DIGITS: usize = 17;

impl Packed96 {
    pub fn from_literal(lit: Literal) -> Self {
        match lit.magnitude() {
            Some((negative, magnitude)) if magnitude < PACKED_INT_LIMIT => Self::from_integer(negative, magnitude),
            _ => Self::from_f64(lit.as_f64()),
        }
    }

    fn from_integer(negative: bool, magnitude: u64) -> Self {
        let sign = if negative { PACKED_MANT_SIGN } else { 0 };
        if magnitude == 0 {
            return Self([sign, 0, 0]);
        }
        let text = magnitude.to_string();
        let mut digits: Vec<u8> = text.bytes().map(|b| b - b'0').collect();
        let mut exp = digits.len() as i32 - 1;
        if digits.len() > PACKED_DIGITS {
            let round_up = digits[PACKED_DIGITS] >= 5;
            digits.truncate(PACKED_DIGITS);
            if round_up && increment(&mut digits) {
                digits.insert(0, 1);
                digits.truncate(PACKED_DIGITS);
                exp += 1;
            }
        }
        Self::pack(sign, exp, &digits)
    }

    fn from_f64(v: f64) -> Self {
        let sign = if v.is_sign_negative() { PACKED_MANT_SIGN } else { 0 };
        if v.is_nan() {
            return Self([PACKED_SPECIAL, u32::MAX, u32::MAX]);
        }
        if v.is_infinite() {
            return Self([sign | PACKED_SPECIAL, 0, 0]);
        }
        if v == 0.0 {
            return Self([sign, 0, 0]);
        }
        // 17 significant digits: d.dddddddddddddddde<exp>
        let text = format!("{:.16e}", v.abs());
        let (mant, exp) = text.split_once('e').unwrap_or((&text, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let digits: Vec<u8> = mant
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        Self::pack(sign, exp, &digits)
    }

    fn pack(sign: u32, exp: i32, digits: &[u8]) -> Self {
        let mut w0 = sign;
        if exp < 0 {
            w0 |= PACKED_EXP_SIGN;
        }
        let e = exp.unsigned_abs().min(999);
        w0 |= (e / 100) << 24 | (e / 10 % 10) << 20 | (e % 10) << 16;
        w0 |= digits.first().copied().unwrap_or(0) as u32;
        let mut frac = [0u32; 2];
        for (i, &d) in digits.iter().skip(1).take(16).enumerate() {
            frac[i / 8] |= (d as u32) << (28 - 4 * (i % 8));
        }
        Self([w0, frac[0], frac[1]])
    }

    pub fn is_special(&self) -> bool {
        self.0[0] & PACKED_SPECIAL == PACKED_SPECIAL
    }

    pub fn to_f64(&self) -> Result<f64, ErrorKind> {
        let [w0, w1, w2] = self.0;
        let negative = w0 & PACKED_MANT_SIGN != 0;
        if self.is_special() {
            return Ok(if w1 == 0 && w2 == 0 {
                if negative { f64::NEG_INFINITY } else { f64::INFINITY }
            } else {
                f64::NAN
            });
        }
        let mut text = String::with_capacity(32);
        if negative {
            text.push('-');
        }
        text.push(bcd_digit(w0)?);
        text.push('.');
        for word in [w1, w2] {
            for shift in (0..8).rev() {
                text.push(bcd_digit(word >> (shift * 4))?);
            }
        }
        text.push('e');
        if w0 & PACKED_EXP_SIGN != 0 {
            text.push('-');
        }
        for shift in [24, 20, 16] {
            text.push(bcd_digit(w0 >> shift)?);
        }
        text.parse::<f64>().map_err(|_| ErrorKind::IllegalConstant)
    }

    pub fn emit(&self, insn: &mut Insn, order: ByteOrder) {
        match order {
            ByteOrder::Big => self.0.iter().for_each(|&w| insn.emit_u32(w, order)),
            ByteOrder::Little => self.0.iter().rev().for_each(|&w| insn.emit_u32(w, order)),
        }
    }
}

fn bcd_digit(nibble: u32) -> Result<char, ErrorKind> {
    let d = nibble & 0xF;
    if d > 9 {
        return Err(ErrorKind::IllegalConstant);
    }
    Ok((b'0' + d as u8) as char)
}

/// Adds one to a decimal digit string; true when it carries out of the top.
fn increment(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    true
}

/// Scans a numeric literal at the start of `text`.
///
/// The literal is an integer only when an integer parses and the next
/// character is not `.`, `e` or `E`; otherwise it is re-read as floating
/// point. Returns the literal and the number of bytes consumed.
pub fn scan_literal(text: &str, radix: u32) -> Result<(Literal, usize), ErrorKind> {
    if let Some((v, len)) = scan_integer(text, radix) {
        match text[len..].chars().next() {
            Some('.' | 'e' | 'E') => {}
            _ => return Ok((Literal::Int(v), len)),
        }
    }
    scan_float(text).map(|(v, len)| (Literal::Float(v), len))
}

/// `0x`/`0b`/`0o` prefixes override `radix`.
pub fn scan_integer(text: &str, radix: u32) -> Option<(i64, usize)> {
    let bytes = text.as_bytes();
    let (radix, start) = match bytes {
        [b'0', b'x' | b'X', c, ..] if c.is_ascii_hexdigit() => (16, 2),
        [b'0', b'b' | b'B', b'0' | b'1', ..] if radix != 16 => (2, 2),
        [b'0', b'o' | b'O', c, ..] if (b'0'..=b'7').contains(c) => (8, 2),
        _ => (radix, 0),
    };
    if !bytes.get(start).is_some_and(u8::is_ascii_digit) && start == 0 {
        return None;
    }
    let len = start
        + bytes[start..]
            .iter()
            .take_while(|b| (**b as char).is_digit(radix))
            .count();
    let digits = &text[start..len];
    let v = u64::from_str_radix(digits, radix).ok()?;
    Some((v as i64, len))
}

fn scan_float(text: &str) -> Result<(f64, usize), ErrorKind> {
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();
    let mut len = digits(0);
    if bytes.get(len) == Some(&b'.') {
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let n = digits(exp);
        if n == 0 {
            return Err(ErrorKind::NotAFloat);
        }
        len = exp + n;
    }
    text[..len]
        .parse::<f64>()
        .map(|v| (v, len))
        .map_err(|_| ErrorKind::NotAFloat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_range_accepts_signed_or_unsigned() {
        assert_eq!(check_int(255, 8), Ok(()));
        assert_eq!(check_int(-128, 8), Ok(()));
        assert_eq!(check_int(256, 8), Err(ErrorKind::OverflowRange));
        assert_eq!(check_int(-129, 8), Err(ErrorKind::OverflowRange));
        assert_eq!(check_int(70000, 16), Err(ErrorKind::OverflowRange));
        assert_eq!(check_int(i64::MIN, 64), Ok(()));
    }

    #[test]
    fn emit_int_writes_truncated_value_on_overflow() {
        let mut insn = Insn::new(0);
        assert_eq!(emit_int(&mut insn, 0x1_2345, 2, ByteOrder::Big), Err(ErrorKind::OverflowRange));
        assert_eq!(insn.bytes(), &[0x23, 0x45]);
    }

    #[test]
    fn extended_special_values() {
        let inf = Float80::from_float(f64::INFINITY);
        assert_eq!(inf.exponent(), 0x7FFF);
        assert_eq!(inf.significand, 0);
        let nan = Float80::from_float(f64::NAN);
        assert_eq!(nan.exponent(), 0x7FFF);
        assert_ne!(nan.significand & (1 << 63), 0);
        let ninf = Float80::from_float(f64::NEG_INFINITY);
        assert!(ninf.is_negative());
        assert_eq!(ninf.tag, 0xFFFF);
    }

    #[test]
    fn extended_normal_values() {
        let one = Float80::from_float(1.0f64);
        assert_eq!(one, Float80 { tag: 0x3FFF, significand: 0x8000_0000_0000_0000 });
        let neg = Float80::from_float(-2.5f64);
        assert_eq!(neg, Float80 { tag: 0xC000, significand: 0xA000_0000_0000_0000 });
        assert_eq!(Float80::from_float(0.1f32).to_f64(), 0.1f32 as f64);
        assert_eq!(Float80::from_float(f64::MIN_POSITIVE / 8.0).to_f64(), f64::MIN_POSITIVE / 8.0);
    }

    #[test]
    fn extended_integers_are_exact() {
        let big = Float80::from_literal(Literal::Int(i64::MAX));
        assert_eq!(big, Float80 { tag: 0x3FFF + 62, significand: (i64::MAX as u64) << 1 });
        assert_eq!(Float80::from_literal(Literal::Int(-1)), Float80::from_float(-1.0f64));
        assert_eq!(Float80::from_literal(Literal::Int(0)).significand, 0);
        let max = Float80::from_literal(Literal::Unsigned(u64::MAX));
        assert_eq!(max, Float80 { tag: 0x3FFF + 63, significand: u64::MAX });
        assert!(!Float80::from_literal(Literal::Unsigned(1 << 63)).is_negative());
    }

    #[test]
    fn extended_emits_ten_bytes() {
        let mut insn = Insn::new(0);
        Float80::from_float(1.0f64).emit(&mut insn, ByteOrder::Little);
        assert_eq!(insn.bytes(), &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xFF, 0x3F]);
    }

    #[test]
    fn packed_integer_path() {
        assert_eq!(Packed96::from_literal(Literal::Int(0)), Packed96([0, 0, 0]));
        assert_eq!(Packed96::from_literal(Literal::Int(1)), Packed96([0x0000_0001, 0, 0]));
        assert_eq!(
            Packed96::from_literal(Literal::Int(-1234)),
            Packed96([0x8003_0001, 0x2340_0000, 0])
        );
        // 18 digits: the 18th rounds the 17th
        let p = Packed96::from_literal(Literal::Int(123_456_789_012_345_678));
        assert_eq!(p, Packed96([0x0017_0001, 0x2345_6789, 0x0123_4568]));
        let p = Packed96::from_literal(Literal::Int(999_999_999_999_999_999));
        assert_eq!(p, Packed96([0x0018_0001, 0, 0]));
        let p = Packed96::from_literal(Literal::Unsigned(1 << 63));
        assert_eq!(p.0[0] & PACKED_MANT_SIGN, 0);
        assert_eq!(p.to_f64(), Ok(9.223372036854776e18));
    }

    #[test]
    fn packed_fraction_path() {
        let p = Packed96::from_literal(Literal::Float(0.5));
        assert_eq!(p, Packed96([0x4001_0005, 0, 0]));
        assert_eq!(p.to_f64(), Ok(0.5));
        let p = Packed96::from_literal(Literal::Float(-1.25e300));
        assert_eq!(p.to_f64(), Ok(-1.25e300));
        assert!(Packed96::from_literal(Literal::Float(f64::INFINITY)).is_special());
        assert!(Packed96::from_literal(Literal::Float(f64::NAN)).to_f64().unwrap().is_nan());
    }

    #[test]
    fn literal_disambiguation() {
        assert_eq!(scan_literal("42,", 10), Ok((Literal::Int(42), 2)));
        assert_eq!(scan_literal("42.", 10), Ok((Literal::Float(42.0), 3)));
        assert_eq!(scan_literal("1e3", 10), Ok((Literal::Float(1000.0), 3)));
        assert_eq!(scan_literal("2.5E-1)", 10), Ok((Literal::Float(0.25), 6)));
        assert_eq!(scan_literal("0x1E", 10), Ok((Literal::Int(0x1E), 4)));
        assert_eq!(scan_literal("1e", 10), Err(ErrorKind::NotAFloat));
        assert_eq!(scan_literal("10", 16), Ok((Literal::Int(16), 2)));
    }
}
