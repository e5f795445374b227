//! Bit-field constant byte: `offset << 5 | (length - 1)`.

use crate::error::{ErrorAt, ErrorKind};

pub const MAX_OFFSET: i64 = 7;
pub const MAX_LENGTH: i64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: u8,
    pub length: u8,
}

impl BitField {
    pub fn to_byte(self) -> u8 {
        (self.offset << 5) | (self.length - 1)
    }

    pub fn from_byte(b: u8) -> Self {
        Self {
            offset: b >> 5,
            length: (b & 0x1F) + 1,
        }
    }
}

/// Packs `offset` and `length`, recording problems at their source offsets.
/// A byte is always produced; bad fields are replaced by the nearest legal value.
pub fn encode(offset: i64, offset_at: usize, length: i64, length_at: usize, error: &mut ErrorAt) -> u8 {
    let off = if (0..=MAX_OFFSET).contains(&offset) {
        offset
    } else {
        error.set_error(offset_at, ErrorKind::OverflowRange);
        offset & MAX_OFFSET
    };
    let len = if length <= 0 {
        error.set_error(length_at, ErrorKind::IllegalConstant);
        1
    } else if length > MAX_LENGTH {
        error.set_error(length_at, ErrorKind::OverflowRange);
        MAX_LENGTH
    } else {
        length
    };
    if off + len > MAX_LENGTH {
        error.set_error(length_at, ErrorKind::OverflowRange);
    }
    BitField {
        offset: off as u8,
        length: len as u8,
    }
    .to_byte()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_offset_and_length() {
        let mut err = ErrorAt::new();
        assert_eq!(encode(3, 0, 5, 2, &mut err), 0x64);
        assert!(err.is_ok());
        assert_eq!(BitField::from_byte(0x64), BitField { offset: 3, length: 5 });
        assert_eq!(encode(0, 0, 32, 2, &mut err), 0x1F);
        assert!(err.is_ok());
    }

    #[test]
    fn too_long_for_offset() {
        let mut err = ErrorAt::new();
        let b = encode(7, 10, 30, 13, &mut err);
        assert_eq!(err.kind(), Some(ErrorKind::OverflowRange));
        assert_eq!(err.at(), Some(13));
        assert_eq!(b, 0xFD);
    }

    #[test]
    fn non_positive_length_substitutes_one() {
        let mut err = ErrorAt::new();
        assert_eq!(encode(2, 0, 0, 4, &mut err), 0x40);
        assert_eq!(err.kind(), Some(ErrorKind::IllegalConstant));
        assert_eq!(err.at(), Some(4));
    }

    #[test]
    fn offset_out_of_range() {
        let mut err = ErrorAt::new();
        encode(8, 1, 1, 3, &mut err);
        assert_eq!(err.kind(), Some(ErrorKind::OverflowRange));
        assert_eq!(err.at(), Some(1));
    }
}
