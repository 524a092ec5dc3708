// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::ValueError;
use crate::value::WireValue;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A VLAN id match value: a 12-bit VID plus the OXM tag-present bit.
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
pub struct VlanVid(u16);

impl VlanVid {
    /// No VLAN tag present.
    pub const NONE: Self = Self(0);

    /// The legacy wire marker for an explicitly untagged match.
    pub const UNTAGGED: Self = Self(0xFFFF);

    /// The tag-present bit; set on any tagged frame from protocol
    /// version 1.2 onward.
    pub const PRESENT: u16 = 0x1000;
    pub const MAX: u16 = 0x1FFF;

    pub fn of(val: u16) -> Result<Self, ValueError> {
        Self::check_raw(u128::from(val))?;
        Ok(Self(val))
    }

    /// The 12-bit VLAN id without the present bit.
    pub const fn vid(&self) -> u16 {
        self.0 & 0xFFF
    }

    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl WireValue for VlanVid {
    const WIRE_LEN: usize = 2;
    const NAME: &'static str = "VlanVid";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u16)
    }

    fn check_raw(raw: u128) -> Result<(), ValueError> {
        if raw > u128::from(Self::MAX) && raw != u128::from(Self::UNTAGGED.0) {
            return Err(ValueError::OutOfRange { kind: Self::NAME, value: raw });
        }
        Ok(())
    }
}

impl Display for VlanVid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.vid())
    }
}

/// A VLAN priority code point, three bits.
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
pub struct VlanPcp(u8);

impl VlanPcp {
    pub const NONE: Self = Self(0);
    pub const MAX: u8 = 0x7;

    pub fn of(val: u8) -> Result<Self, ValueError> {
        Self::check_raw(u128::from(val))?;
        Ok(Self(val))
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl WireValue for VlanPcp {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "VlanPcp";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u8 & Self::MAX)
    }

    fn check_raw(raw: u128) -> Result<(), ValueError> {
        if raw > u128::from(Self::MAX) {
            return Err(ValueError::OutOfRange { kind: Self::NAME, value: raw });
        }
        Ok(())
    }
}

impl Display for VlanPcp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
