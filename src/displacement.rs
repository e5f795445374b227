//! Self-describing signed displacement.
//!
//! ```text
//! 0xxxxxxx                              7-bit signed, 1 byte
//! 10xxxxxx xxxxxxxx                     14-bit signed, 2 bytes
//! 11xxxxxx xxxxxxxx xxxxxxxx xxxxxxxx   30-bit signed, 4 bytes
//! ```
//! Bytes are stored most significant first. `E0 00 00 00` is reserved.

use crate::error::ErrorKind;
use crate::memory::ByteReader;

pub const MIN_1: i64 = -0x40;
pub const MAX_1: i64 = 0x3F;
pub const MIN_2: i64 = -0x2000;
pub const MAX_2: i64 = 0x1FFF;
/// `-0x2000_0000` would encode as the reserved pattern.
pub const MIN_4: i64 = -0x1FFF_FFFF;
pub const MAX_4: i64 = 0x1FFF_FFFF;

const RESERVED: u32 = 0xE000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispWidth {
    One = 1,
    Two = 2,
    Four = 4,
}

/// Smallest form that holds `value`, or `None` when no form does.
pub fn width_of(value: i64) -> Option<DispWidth> {
    if (MIN_1..=MAX_1).contains(&value) {
        Some(DispWidth::One)
    } else if (MIN_2..=MAX_2).contains(&value) {
        Some(DispWidth::Two)
    } else if (MIN_4..=MAX_4).contains(&value) {
        Some(DispWidth::Four)
    } else {
        None
    }
}

/// Appends the minimal encoding of `value` to `out`.
///
/// Out-of-range values are clamped and still written so the emitted length
/// stays predictable; the error is returned afterwards.
pub fn encode(value: i64, out: &mut Vec<u8>) -> Result<(), ErrorKind> {
    match width_of(value) {
        Some(w) => {
            put(value, w, out);
            Ok(())
        }
        None => {
            put(value.clamp(MIN_4, MAX_4), DispWidth::Four, out);
            Err(ErrorKind::OverflowRange)
        }
    }
}

/// Appends `value` in at least `min` bytes; used when the final value is not
/// yet known and the length must not change between passes.
pub fn encode_at_least(value: i64, min: DispWidth, out: &mut Vec<u8>) -> Result<(), ErrorKind> {
    match width_of(value) {
        Some(w) => {
            put(value, w.max_with(min), out);
            Ok(())
        }
        None => encode(value, out),
    }
}

impl DispWidth {
    fn max_with(self, other: DispWidth) -> DispWidth {
        if (other as u8) > (self as u8) { other } else { self }
    }
}

fn put(value: i64, width: DispWidth, out: &mut Vec<u8>) {
    let v = value as u32;
    match width {
        DispWidth::One => out.push((v & 0x7F) as u8),
        DispWidth::Two => {
            let w = 0x8000 | (v & 0x3FFF) as u16;
            out.extend_from_slice(&w.to_be_bytes());
        }
        DispWidth::Four => {
            let w = 0xC000_0000 | (v & 0x3FFF_FFFF);
            out.extend_from_slice(&w.to_be_bytes());
        }
    }
}

/// Reads one displacement.
pub fn decode<R: ByteReader + ?Sized>(r: &mut R) -> Result<i32, ErrorKind> {
    #[inline]
    fn sign_ext(v: u32, bits: u32) -> i32 {
        let s = 32 - bits;
        ((v << s) as i32) >> s
    }

    let b0 = r.read_u8()?;
    if b0 & 0x80 == 0 {
        return Ok(sign_ext(b0 as u32, 7));
    }
    if b0 & 0x40 == 0 {
        let b1 = r.read_u8()?;
        let v = (((b0 & 0x3F) as u32) << 8) | b1 as u32;
        return Ok(sign_ext(v, 14));
    }
    let b1 = r.read_u8()? as u32;
    let b2 = r.read_u8()? as u32;
    let b3 = r.read_u8()? as u32;
    let raw = ((b0 as u32) << 24) | (b1 << 16) | (b2 << 8) | b3;
    if raw == RESERVED {
        return Err(ErrorKind::IllegalConstant);
    }
    Ok(sign_ext(raw & 0x3FFF_FFFF, 30))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(v: i64) -> (Vec<u8>, Result<(), ErrorKind>) {
        let mut out = Vec::new();
        let r = encode(v, &mut out);
        (out, r)
    }

    #[test]
    fn picks_smallest_form_at_the_edges() {
        assert_eq!(enc(0).0, vec![0x00]);
        assert_eq!(enc(63).0, vec![0x3F]);
        assert_eq!(enc(-64).0, vec![0x40]);
        assert_eq!(enc(64).0, vec![0x80, 0x40]);
        assert_eq!(enc(-65).0, vec![0xBF, 0xBF]);
        assert_eq!(enc(-0x2000).0, vec![0xA0, 0x00]);
        assert_eq!(enc(0x1FFF).0, vec![0x9F, 0xFF]);
        assert_eq!(enc(0x2000).0, vec![0xC0, 0x00, 0x20, 0x00]);
        assert_eq!(enc(-0x2001).0, vec![0xFF, 0xFF, 0xDF, 0xFF]);
    }

    #[test]
    fn every_representable_value_survives() {
        let mut v = MIN_4;
        while v <= MAX_4 {
            let (bytes, r) = enc(v);
            assert_eq!(r, Ok(()), "{v}");
            assert_eq!(bytes.len(), width_of(v).map_or(0, |w| w as usize), "{v}");
            assert_eq!(decode(&mut bytes.as_slice()), Ok(v as i32), "{v}");
            v += 4099;
        }
        for v in [MIN_4, MAX_4, -1, 1] {
            assert_eq!(decode(&mut enc(v).0.as_slice()), Ok(v as i32));
        }
    }

    #[test]
    fn clamps_out_of_range() {
        let (bytes, r) = enc(0x2000_0000);
        assert_eq!(r, Err(ErrorKind::OverflowRange));
        assert_eq!(bytes, vec![0xDF, 0xFF, 0xFF, 0xFF]);
        let (bytes, r) = enc(-0x2000_0000);
        assert_eq!(r, Err(ErrorKind::OverflowRange));
        assert_eq!(bytes.len(), 4);
        assert_ne!(bytes, vec![0xE0, 0, 0, 0]);
    }

    #[test]
    fn forced_width_keeps_value() {
        let mut out = Vec::new();
        encode_at_least(5, DispWidth::Four, &mut out).unwrap();
        assert_eq!(out, vec![0xC0, 0x00, 0x00, 0x05]);
        assert_eq!(decode(&mut out.as_slice()), Ok(5));
    }

    #[test]
    fn decodes_reserved_pattern_as_illegal() {
        let mut bytes: &[u8] = &[0xE0, 0x00, 0x00, 0x00];
        assert_eq!(decode(&mut bytes), Err(ErrorKind::IllegalConstant));
    }

    #[test]
    fn decode_runs_out_of_bytes() {
        let mut bytes: &[u8] = &[0x80];
        assert_eq!(decode(&mut bytes), Err(ErrorKind::NoMemory));
    }
}
