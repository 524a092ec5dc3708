// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::WireValue;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// An ICMPv4 message type.
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
pub struct IcmpType(u8);

impl IcmpType {
    pub const ECHO_REPLY: Self = Self(0);
    pub const DEST_UNREACHABLE: Self = Self(3);
    pub const ECHO: Self = Self(8);

    pub const fn of(val: u8) -> Self {
        Self(val)
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl WireValue for IcmpType {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "IcmpType";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u8)
    }
}

impl Display for IcmpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ICMPv4 message code.
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
pub struct IcmpCode(u8);

impl IcmpCode {
    pub const fn of(val: u8) -> Self {
        Self(val)
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl WireValue for IcmpCode {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "IcmpCode";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u8)
    }
}

impl Display for IcmpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
