// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The contract every fixed-length wire value fulfills.

use thiserror::Error;

/// A value failed validation at construction time.
///
/// A value object is never partially constructed: any scalar outside
/// its legal range or any malformed slice is rejected here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ValueError {
    #[error("value {value:#x} out of range for {kind}")]
    OutOfRange { kind: &'static str, value: u128 },

    #[error("expected {expected} bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },
}

/// A fixed-length, wire-serializable scalar.
///
/// All values serialize to exactly [`Self::WIRE_LEN`] bytes, big-endian
/// where numeric. The raw representation is the value interpreted as a
/// big-endian unsigned integer; masking is bitwise AND over that
/// representation, and the total order is the unsigned numeric order.
pub trait WireValue: Copy + Eq + Ord {
    /// Serialized length in bytes.
    const WIRE_LEN: usize;

    /// Human name used in validation errors.
    const NAME: &'static str;

    /// The all-ones raw value for this type's width. As a mask this
    /// matches everything, i.e. the masked value is effectively exact.
    const FULL_RAW: u128 = u128::MAX >> (128 - 8 * Self::WIRE_LEN);

    /// Serialized length of this value, in bytes.
    fn wire_len(&self) -> usize {
        Self::WIRE_LEN
    }

    /// Return the big-endian numeric interpretation of the value.
    fn to_raw(self) -> u128;

    /// Build a value from its raw representation.
    ///
    /// The raw value must already have passed [`Self::check_raw`];
    /// bits beyond the wire width are truncated.
    fn from_raw(raw: u128) -> Self;

    /// Validate a raw value against this type's legal range.
    fn check_raw(raw: u128) -> Result<(), ValueError> {
        if raw > Self::FULL_RAW {
            return Err(ValueError::OutOfRange { kind: Self::NAME, value: raw });
        }
        Ok(())
    }

    /// Keep only the bits selected by `mask`.
    fn apply_mask(self, mask: Self) -> Self {
        Self::from_raw(self.to_raw() & mask.to_raw())
    }

    /// Deserialize from exactly [`Self::WIRE_LEN`] bytes, validating
    /// the result.
    fn read(src: &[u8]) -> Result<Self, ValueError> {
        if src.len() != Self::WIRE_LEN {
            return Err(ValueError::BadLength {
                expected: Self::WIRE_LEN,
                actual: src.len(),
            });
        }

        let mut raw = 0u128;
        for b in src {
            raw = (raw << 8) | u128::from(*b);
        }
        Self::check_raw(raw)?;
        Ok(Self::from_raw(raw))
    }

    /// Serialize into exactly [`Self::WIRE_LEN`] bytes.
    fn write(self, dst: &mut [u8]) {
        debug_assert_eq!(dst.len(), Self::WIRE_LEN);
        let raw = self.to_raw();
        for (i, b) in dst.iter_mut().enumerate() {
            *b = (raw >> (8 * (Self::WIRE_LEN - 1 - i))) as u8;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mac::MacAddr;

    #[test]
    fn full_raw_widths() {
        assert_eq!(<crate::vlan::VlanPcp as WireValue>::FULL_RAW, 0xFF);
        assert_eq!(<MacAddr as WireValue>::FULL_RAW, 0xFFFF_FFFF_FFFF);
        assert_eq!(<crate::ip::Ipv6Addr as WireValue>::FULL_RAW, u128::MAX);
    }

    #[test]
    fn read_rejects_bad_length() {
        assert_eq!(
            MacAddr::read(&[1, 2, 3]),
            Err(ValueError::BadLength { expected: 6, actual: 3 })
        );
    }
}
