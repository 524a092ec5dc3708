// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::WireValue;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A switch port number.
///
/// Port numbers are 32 bits wide on the wire from protocol version
/// 1.1 onward; the legacy codec emits the low 16 bits.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct PortNo(u32);

impl PortNo {
    pub const ZERO: Self = Self(0);

    /// Maximum number of physical ports.
    pub const MAX: Self = Self(0xFFFF_FF00);
    pub const IN_PORT: Self = Self(0xFFFF_FFF8);
    pub const TABLE: Self = Self(0xFFFF_FFF9);
    pub const NORMAL: Self = Self(0xFFFF_FFFA);
    pub const FLOOD: Self = Self(0xFFFF_FFFB);
    pub const ALL: Self = Self(0xFFFF_FFFC);
    pub const CONTROLLER: Self = Self(0xFFFF_FFFD);
    pub const LOCAL: Self = Self(0xFFFF_FFFE);
    pub const ANY: Self = Self(0xFFFF_FFFF);

    pub const fn of(val: u32) -> Self {
        Self(val)
    }

    pub const fn number(&self) -> u32 {
        self.0
    }
}

impl WireValue for PortNo {
    const WIRE_LEN: usize = 4;
    const NAME: &'static str = "PortNo";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u32)
    }
}

impl From<u32> for PortNo {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<PortNo> for u32 {
    fn from(port: PortNo) -> u32 {
        port.0
    }
}

impl Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IN_PORT => write!(f, "in_port"),
            Self::TABLE => write!(f, "table"),
            Self::NORMAL => write!(f, "normal"),
            Self::FLOOD => write!(f, "flood"),
            Self::ALL => write!(f, "all"),
            Self::CONTROLLER => write!(f, "controller"),
            Self::LOCAL => write!(f, "local"),
            Self::ANY => write!(f, "any"),
            Self(val) => write!(f, "{val}"),
        }
    }
}

impl Debug for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PortNo {{ {self} }}")
    }
}

/// A TCP/UDP/SCTP port.
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
pub struct TransportPort(u16);

impl TransportPort {
    /// The zero value a wildcarded legacy match carries on the wire.
    pub const NONE: Self = Self(0);

    pub const fn of(val: u16) -> Self {
        Self(val)
    }

    pub const fn number(&self) -> u16 {
        self.0
    }
}

impl WireValue for TransportPort {
    const WIRE_LEN: usize = 2;
    const NAME: &'static str = "TransportPort";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u16)
    }
}

impl From<u16> for TransportPort {
    fn from(val: u16) -> Self {
        Self(val)
    }
}

impl From<TransportPort> for u16 {
    fn from(port: TransportPort) -> u16 {
        port.0
    }
}

impl Display for TransportPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let mut buf = [0u8; 4];
        PortNo::CONTROLLER.write(&mut buf);
        assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFD]);
        assert_eq!(PortNo::read(&buf), Ok(PortNo::CONTROLLER));

        let mut buf = [0u8; 2];
        TransportPort::of(443).write(&mut buf);
        assert_eq!(buf, [0x01, 0xBB]);
        assert_eq!(TransportPort::read(&buf), Ok(TransportPort::of(443)));
    }
}
