// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! A value paired with a same-type mask.

use core::fmt;
use core::fmt::Display;
use oflow_api::WireValue;
use serde::Deserialize;
use serde::Serialize;

/// A masked match value.
///
/// Only the bits selected by `mask` are significant. The value is
/// normalized at construction: `value == value.apply_mask(mask)`
/// always holds, so two logically identical masked values compare
/// equal regardless of what junk the caller left in the don't-care
/// bits.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Masked<V> {
    value: V,
    mask: V,
}

impl<V: WireValue> Masked<V> {
    /// Build a masked value, AND-ing `value` with `mask`.
    ///
    /// This is the only way in; there is no raw constructor that
    /// could break the normalization invariant.
    pub fn of(value: V, mask: V) -> Self {
        Self { value: value.apply_mask(mask), mask }
    }

    pub fn value(&self) -> V {
        self.value
    }

    pub fn mask(&self) -> V {
        self.mask
    }

    /// Combined wire length of value and mask.
    ///
    /// Bookkeeping only; whether the two are adjacent on the wire is
    /// each encoding's business.
    pub fn wire_len(&self) -> usize {
        2 * V::WIRE_LEN
    }
}

impl<V: Display> Display for Masked<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.mask)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use oflow_api::Ipv4Addr;
    use oflow_api::MacAddr;

    #[test]
    fn construction_normalizes() {
        let ip: Ipv4Addr = "10.1.2.3".parse().unwrap();
        let mask: Ipv4Addr = "255.255.0.0".parse().unwrap();
        let m = Masked::of(ip, mask);
        assert_eq!(m.value(), "10.1.0.0".parse().unwrap());
        assert_eq!(m.mask(), mask);
        assert_eq!(m.wire_len(), 8);

        // Same selection, different don't-care junk: equal.
        let other: Ipv4Addr = "10.1.9.9".parse().unwrap();
        assert_eq!(m, Masked::of(other, mask));
    }

    #[test]
    fn full_mask_loses_nothing() {
        let mac: MacAddr = "A8:40:25:00:00:63".parse().unwrap();
        let m = Masked::of(mac, MacAddr::BROADCAST);
        assert_eq!(m.value(), mac);
        assert_eq!(m.mask(), MacAddr::BROADCAST);
    }

    #[test]
    fn order_is_value_then_mask() {
        let a = Masked::of(Ipv4Addr::from([10, 0, 0, 0]), Ipv4Addr::from([255, 0, 0, 0]));
        let b = Masked::of(Ipv4Addr::from([10, 0, 0, 0]), Ipv4Addr::from([255, 255, 0, 0]));
        let c = Masked::of(Ipv4Addr::from([11, 0, 0, 0]), Ipv4Addr::from([255, 0, 0, 0]));
        assert!(a < b);
        assert!(b < c);
    }
}
