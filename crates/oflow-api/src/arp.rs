// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::WireValue;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// An ARP operation code.
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
pub struct ArpOpcode(u16);

impl ArpOpcode {
    pub const REQUEST: Self = Self(1);
    pub const REPLY: Self = Self(2);

    pub const fn of(val: u16) -> Self {
        Self(val)
    }

    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl WireValue for ArpOpcode {
    const WIRE_LEN: usize = 2;
    const NAME: &'static str = "ArpOpcode";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u16)
    }
}

impl From<u16> for ArpOpcode {
    fn from(val: u16) -> Self {
        Self(val)
    }
}

impl From<ArpOpcode> for u16 {
    fn from(op: ArpOpcode) -> u16 {
        op.0
    }
}

impl Display for ArpOpcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::REQUEST => write!(f, "request"),
            Self::REPLY => write!(f, "reply"),
            Self(val) => write!(f, "{val}"),
        }
    }
}
