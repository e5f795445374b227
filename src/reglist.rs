//! Register-list masks.
//!
//! The same register set maps onto the wire byte in one of two bit orders:
//! push order puts Rn at bit n, pop order puts Rn at bit 7-n.

use bitflags::bitflags;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorAt, ErrorKind};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegSet: u8 {
const R0 = 1 << 0;
const R1 = 1 << 1;
const R2 = 1 << 2;
const R3 = 1 << 3;
const R4 = 1 << 4;
const R5 = 1 << 5;
const R6 = 1 << 6;
const R7 = 1 << 7;
}
}

impl RegSet {
    pub fn register(n: u8) -> Self {
        Self::from_bits_retain(1 << (n & 7))
    }

    /// Register numbers, lowest first.
    pub fn registers(self) -> impl Iterator<Item = u8> {
        (0..8u8).filter(move |&n| self.contains(Self::register(n)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOrder {
    Push,
    Pop,
}

fn place<O: BitOrder>(set: RegSet) -> u8 {
    let mut mask = 0u8;
    let bits = mask.view_bits_mut::<O>();
    for n in set.registers() {
        bits.set(n as usize, true);
    }
    mask
}

fn gather<O: BitOrder>(mask: u8) -> RegSet {
    mask.view_bits::<O>()
        .iter_ones()
        .fold(RegSet::empty(), |set, n| set | RegSet::register(n as u8))
}

pub fn to_mask(set: RegSet, order: ListOrder) -> u8 {
    match order {
        ListOrder::Push => place::<Lsb0>(set),
        ListOrder::Pop => place::<Msb0>(set),
    }
}

pub fn from_mask(mask: u8, order: ListOrder) -> RegSet {
    match order {
        ListOrder::Push => gather::<Lsb0>(mask),
        ListOrder::Pop => gather::<Msb0>(mask),
    }
}

/// Builds the wire mask from listed registers.
///
/// Each item is a register number, or `None` for a name that cannot appear in
/// a list, paired with its source offset.
pub fn encode<I>(items: I, order: ListOrder, error: &mut ErrorAt) -> u8
where
    I: IntoIterator<Item = (Option<u8>, usize)>,
{
    let mut set = RegSet::empty();
    for (reg, at) in items {
        match reg {
            None => {
                error.set_error(at, ErrorKind::RegisterNotAllowed);
            }
            Some(n) => {
                let bit = RegSet::register(n);
                if set.contains(bit) {
                    error.set_error(at, ErrorKind::DuplicateRegister);
                }
                set |= bit;
            }
        }
    }
    to_mask(set, order)
}

/// Expands a wire mask. When `empty_is_no_op` is set, an empty mask is
/// flagged as an advisory at `at`.
pub fn decode(mask: u8, order: ListOrder, empty_is_no_op: bool, at: usize, error: &mut ErrorAt) -> Vec<u8> {
    if mask == 0 && empty_is_no_op {
        error.set_error(at, ErrorKind::OpcodeHasNoEffect);
    }
    from_mask(mask, order).registers().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_order_is_low_bit_first() {
        let mut err = ErrorAt::new();
        let mask = encode([(Some(0), 1), (Some(1), 4)], ListOrder::Push, &mut err);
        assert_eq!(mask, 0b0000_0011);
        assert!(err.is_ok());
        assert_eq!(decode(mask, ListOrder::Push, true, 0, &mut err), vec![0, 1]);
    }

    #[test]
    fn pop_order_is_reversed() {
        let mut err = ErrorAt::new();
        let mask = encode([(Some(0), 1), (Some(1), 4), (Some(7), 7)], ListOrder::Pop, &mut err);
        assert_eq!(mask, 0b1100_0001);
        assert_eq!(decode(mask, ListOrder::Pop, true, 0, &mut err), vec![0, 1, 7]);
    }

    #[test]
    fn duplicate_and_foreign_registers() {
        let mut err = ErrorAt::new();
        encode([(Some(2), 1), (Some(2), 4)], ListOrder::Push, &mut err);
        assert_eq!(err.kind(), Some(ErrorKind::DuplicateRegister));
        assert_eq!(err.at(), Some(4));

        let mut err = ErrorAt::new();
        let mask = encode([(None, 1), (Some(3), 5)], ListOrder::Push, &mut err);
        assert_eq!(err.kind(), Some(ErrorKind::RegisterNotAllowed));
        assert_eq!(mask, 0b0000_1000);
    }

    #[test]
    fn empty_mask_is_advisory() {
        let mut err = ErrorAt::new();
        assert!(decode(0, ListOrder::Push, true, 1, &mut err).is_empty());
        assert_eq!(err.kind(), Some(ErrorKind::OpcodeHasNoEffect));
        assert!(err.check().is_ok());

        let mut err = ErrorAt::new();
        decode(0, ListOrder::Push, false, 1, &mut err);
        assert!(err.is_ok());
    }
}
