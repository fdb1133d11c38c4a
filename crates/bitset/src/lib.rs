#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/bitset/src/lib.rs
//!
//! # Overview
//!
//! `bitset` provides the flag algebra underneath flag-filtered logging. A log
//! call is tagged with a [`FlagMask`]: zero or more single-bit flags combined
//! into one `u32`. The engine only ever needs three questions answered about
//! such masks, and this crate answers them without any state:
//!
//! - which single bits does a mask carry ([`decompose`], [`FlagMask::bits`]),
//! - does a value carry every bit of another ([`contains_all`]),
//! - does a value carry at least one bit of another ([`contains_any`]).
//!
//! # Invariants
//!
//! - Decomposition yields bits in ascending bit-position order.
//! - [`contains_all`] with an empty subset is always `true`.
//! - [`contains_any`] with an empty mask is always `false`. A zero mask means
//!   "unconditional" to the logging engine, which special-cases it before ever
//!   asking this crate.
//!
//! # Examples
//!
//! ```
//! use bitset::{FlagMask, contains_any, decompose};
//!
//! assert_eq!(decompose(0b1010), vec![0b0010, 0b1000]);
//! assert!(contains_any(0b0110, 0b0011));
//! assert!(!contains_any(0b0110, 0));
//!
//! let network = FlagMask::bit(0);
//! let physics = FlagMask::bit(1);
//! let both = network | physics;
//! assert_eq!(both.bits().collect::<Vec<_>>(), vec![network, physics]);
//! ```

mod mask;

pub use mask::{Bits, FlagMask};

/// Number of distinct flags a [`FlagMask`] can hold.
pub const MAX_FLAGS: u32 = u32::BITS;

/// Separates `mask` into its individual set bits.
///
/// Every returned value has exactly one bit set. Bits are reported in
/// ascending bit-position order, covering positions `0..32`. A zero mask
/// yields an empty vector.
///
/// # Examples
///
/// ```
/// assert_eq!(bitset::decompose(0), Vec::<u32>::new());
/// assert_eq!(bitset::decompose(0b1011), vec![1, 2, 8]);
/// assert_eq!(bitset::decompose(u32::MAX).len(), 32);
/// ```
#[must_use]
pub fn decompose(mask: u32) -> Vec<u32> {
    FlagMask::new(mask).bits().map(FlagMask::get).collect()
}

/// Reports whether every bit of `subset` is also set in `value`.
///
/// This is the same predicate as `(value ^ subset) == value.wrapping_sub(subset)`:
/// subtracting `subset` from `value` only matches the XOR when no borrow
/// occurs, which happens exactly when `subset` is covered by `value`.
///
/// # Examples
///
/// ```
/// assert!(bitset::contains_all(0b111, 0b101));
/// assert!(bitset::contains_all(0b111, 0));
/// assert!(!bitset::contains_all(0b100, 0b110));
/// ```
#[must_use]
pub const fn contains_all(value: u32, subset: u32) -> bool {
    value & subset == subset
}

/// Reports whether at least one decomposed bit of `mask` is set in `value`.
///
/// An empty `mask` has no bits to test and therefore returns `false`.
///
/// # Examples
///
/// ```
/// assert!(bitset::contains_any(0b001, 0b011));
/// assert!(!bitset::contains_any(0b100, 0b011));
/// assert!(!bitset::contains_any(u32::MAX, 0));
/// ```
#[must_use]
pub const fn contains_any(value: u32, mask: u32) -> bool {
    value & mask != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_empty_mask_is_empty() {
        assert!(decompose(0).is_empty());
    }

    #[test]
    fn decompose_reports_ascending_bits() {
        assert_eq!(decompose(0b1001_0110), vec![0b10, 0b100, 0b1_0000, 0b1000_0000]);
    }

    #[test]
    fn decompose_covers_high_bit() {
        assert_eq!(decompose(1 << 31), vec![1 << 31]);
        assert_eq!(decompose(u32::MAX).last(), Some(&(1 << 31)));
    }

    #[test]
    fn contains_all_empty_subset_is_true() {
        assert!(contains_all(0, 0));
        assert!(contains_all(0b1010, 0));
    }

    #[test]
    fn contains_all_rejects_partial_overlap() {
        assert!(!contains_all(0b0011, 0b0110));
        assert!(contains_all(0b0111, 0b0110));
    }

    #[test]
    fn contains_any_zero_mask_is_false() {
        assert!(!contains_any(0, 0));
        assert!(!contains_any(u32::MAX, 0));
    }

    #[test]
    fn contains_any_single_overlap() {
        assert!(contains_any(0b0100, 0b0110));
        assert!(!contains_any(0b1000, 0b0110));
    }
}
