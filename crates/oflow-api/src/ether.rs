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

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_ARP: u16 = 0x0806;
pub const ETHER_TYPE_VLAN: u16 = 0x8100;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;
pub const ETHER_TYPE_LLDP: u16 = 0x88CC;

/// An Ethernet frame type.
///
/// Unlike a closed enum this is a transparent wrapper: frame types
/// from protocol revisions we have never heard of still round-trip
/// through a match unchanged.
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
pub struct EthType(u16);

impl EthType {
    /// No ethertype constraint; the zero value a wildcarded legacy
    /// match carries on the wire.
    pub const NONE: Self = Self(0);
    pub const IPV4: Self = Self(ETHER_TYPE_IPV4);
    pub const ARP: Self = Self(ETHER_TYPE_ARP);
    pub const VLAN: Self = Self(ETHER_TYPE_VLAN);
    pub const IPV6: Self = Self(ETHER_TYPE_IPV6);
    pub const LLDP: Self = Self(ETHER_TYPE_LLDP);

    pub const fn of(val: u16) -> Self {
        Self(val)
    }

    pub const fn value(&self) -> u16 {
        self.0
    }
}

impl WireValue for EthType {
    const WIRE_LEN: usize = 2;
    const NAME: &'static str = "EthType";

    fn to_raw(self) -> u128 {
        u128::from(self.0)
    }

    fn from_raw(raw: u128) -> Self {
        Self(raw as u16)
    }
}

impl From<u16> for EthType {
    fn from(val: u16) -> Self {
        Self(val)
    }
}

impl From<EthType> for u16 {
    fn from(et: EthType) -> u16 {
        et.0
    }
}

impl From<smoltcp::wire::EthernetProtocol> for EthType {
    fn from(proto: smoltcp::wire::EthernetProtocol) -> Self {
        Self(u16::from(proto))
    }
}

impl From<EthType> for smoltcp::wire::EthernetProtocol {
    fn from(et: EthType) -> Self {
        Self::from(et.0)
    }
}

impl Display for EthType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IPV4 => write!(f, "IPv4"),
            Self::ARP => write!(f, "ARP"),
            Self::VLAN => write!(f, "VLAN"),
            Self::IPV6 => write!(f, "IPv6"),
            Self::LLDP => write!(f, "LLDP"),
            Self(val) => write!(f, "0x{:04X}", val),
        }
    }
}

// We are never really interested in the internal representation of
// EthType.
impl Debug for EthType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
