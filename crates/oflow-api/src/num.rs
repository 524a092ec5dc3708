// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::WireValue;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// An opaque 64-bit wire value, used for table metadata and tunnel
/// ids.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct U64(u64);

impl U64 {
    pub const ZERO: Self = Self(0);
    pub const FULL_MASK: Self = Self(u64::MAX);

    pub const fn of(val: u64) -> Self {
        Self(val)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl WireValue for U64 {
    const WIRE_LEN: usize = 8;
    const NAME: &'static str = "U64";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u64)
    }
}

impl From<u64> for U64 {
    fn from(val: u64) -> Self {
        Self(val)
    }
}

impl From<U64> for u64 {
    fn from(val: U64) -> u64 {
        val.0
    }
}

impl Display for U64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let val = U64::of(0x0102_0304_0506_0708);
        let mut buf = [0u8; 8];
        val.write(&mut buf);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(U64::read(&buf), Ok(val));
    }
}
