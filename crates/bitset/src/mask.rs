//! crates/bitset/src/mask.rs
//! The [`FlagMask`] newtype and its ascending bit iterator.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Sub, SubAssign};

/// A set of flags packed into a `u32`, one bit per flag.
///
/// The empty mask carries no flags. To the logging engine it means
/// "unconditional": a message tagged with [`FlagMask::NONE`] is always
/// emitted.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct FlagMask(u32);

impl FlagMask {
    /// The empty mask.
    pub const NONE: Self = Self(0);

    /// Every representable flag.
    pub const ALL: Self = Self(u32::MAX);

    /// Wraps a raw mask value.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the mask with only bit `position` set.
    ///
    /// # Panics
    ///
    /// Panics when `position` is 32 or larger.
    #[must_use]
    pub const fn bit(position: u32) -> Self {
        assert!(position < u32::BITS, "flag bit position out of range");
        Self(1 << position)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Reports whether no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reports whether exactly one flag is set.
    #[must_use]
    pub const fn is_single_bit(self) -> bool {
        self.0.is_power_of_two()
    }

    /// Number of flags set.
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Bit position of a single-bit mask, or `None` for any other mask.
    #[must_use]
    pub const fn position(self) -> Option<u32> {
        if self.is_single_bit() {
            Some(self.0.trailing_zeros())
        } else {
            None
        }
    }

    /// Reports whether every flag of `subset` is set in `self`.
    #[must_use]
    pub const fn contains_all(self, subset: Self) -> bool {
        crate::contains_all(self.0, subset.0)
    }

    /// Reports whether at least one flag of `mask` is set in `self`.
    ///
    /// Returns `false` when `mask` is empty.
    #[must_use]
    pub const fn contains_any(self, mask: Self) -> bool {
        crate::contains_any(self.0, mask.0)
    }

    /// Flags set in either mask.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Flags set in both masks.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Flags set in `self` but not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterates over the single-bit flags of this mask in ascending order.
    #[must_use]
    pub const fn bits(self) -> Bits {
        Bits { remaining: self.0 }
    }

    /// Collects the single-bit flags of this mask in ascending order.
    #[must_use]
    pub fn decompose(self) -> Vec<Self> {
        self.bits().collect()
    }
}

impl From<u32> for FlagMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<FlagMask> for u32 {
    fn from(mask: FlagMask) -> Self {
        mask.0
    }
}

impl FromIterator<Self> for FlagMask {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::union)
    }
}

impl IntoIterator for FlagMask {
    type Item = Self;
    type IntoIter = Bits;

    fn into_iter(self) -> Self::IntoIter {
        self.bits()
    }
}

impl BitOr for FlagMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for FlagMask {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for FlagMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl BitAndAssign for FlagMask {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = self.intersection(rhs);
    }
}

impl Sub for FlagMask {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.difference(rhs)
    }
}

impl SubAssign for FlagMask {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.difference(rhs);
    }
}

impl fmt::Debug for FlagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlagMask({:#b})", self.0)
    }
}

impl fmt::Display for FlagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Binary for FlagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for FlagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Iterator over the single-bit flags of a [`FlagMask`], lowest bit first.
#[derive(Clone, Debug)]
pub struct Bits {
    remaining: u32,
}

impl Iterator for Bits {
    type Item = FlagMask;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let lowest = self.remaining & self.remaining.wrapping_neg();
        self.remaining &= self.remaining - 1;
        Some(FlagMask(lowest))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.remaining.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for Bits {}

impl FusedIterator for Bits {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_builds_single_flag() {
        assert_eq!(FlagMask::bit(0).get(), 1);
        assert_eq!(FlagMask::bit(31).get(), 1 << 31);
        assert!(FlagMask::bit(7).is_single_bit());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn bit_rejects_position_past_width() {
        let _ = FlagMask::bit(32);
    }

    #[test]
    fn empty_mask_is_not_single_bit() {
        assert!(FlagMask::NONE.is_empty());
        assert!(!FlagMask::NONE.is_single_bit());
        assert_eq!(FlagMask::NONE.position(), None);
    }

    #[test]
    fn position_of_single_bit() {
        assert_eq!(FlagMask::bit(5).position(), Some(5));
        assert_eq!(FlagMask::new(0b110).position(), None);
    }

    #[test]
    fn bits_iterator_is_exact_size() {
        let bits = FlagMask::new(0b1011).bits();
        assert_eq!(bits.len(), 3);
        let collected: Vec<u32> = bits.map(FlagMask::get).collect();
        assert_eq!(collected, vec![1, 2, 8]);
    }

    #[test]
    fn difference_reports_newly_set_bits() {
        let before = FlagMask::new(0b0011);
        let after = FlagMask::new(0b0110);
        assert_eq!(after - before, FlagMask::new(0b0100));
        assert_eq!(before - after, FlagMask::new(0b0001));
    }

    #[test]
    fn operators_match_named_methods() {
        let a = FlagMask::new(0b1100);
        let b = FlagMask::new(0b1010);
        assert_eq!(a | b, a.union(b));
        assert_eq!(a & b, a.intersection(b));

        let mut c = a;
        c |= b;
        c -= FlagMask::new(0b1000);
        assert_eq!(c, FlagMask::new(0b0110));
        c &= FlagMask::new(0b0010);
        assert_eq!(c, FlagMask::new(0b0010));
    }

    #[test]
    fn collects_from_single_bits() {
        let mask: FlagMask = [FlagMask::bit(0), FlagMask::bit(4)].into_iter().collect();
        assert_eq!(mask.get(), 0b1_0001);
    }

    #[test]
    fn formatting() {
        let mask = FlagMask::new(0b101);
        assert_eq!(mask.to_string(), "0x5");
        assert_eq!(format!("{mask:?}"), "FlagMask(0b101)");
        assert_eq!(format!("{mask:04b}"), "0101");
        assert_eq!(format!("{mask:x}"), "5");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_is_transparent() {
        let mask = FlagMask::new(6);
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, "6");
        let decoded: FlagMask = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, mask);
    }
}
