// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::value::ValueError;
use crate::value::WireValue;
use core::cmp::Ordering;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use core::ops::Deref;
use core::result;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// An IP protocol value.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum Protocol {
    ICMP,
    IGMP,
    TCP,
    UDP,
    ICMPv6,
    Unknown(u8),
}

pub const PROTO_ICMP: u8 = 0x1;
pub const PROTO_IGMP: u8 = 0x2;
pub const PROTO_TCP: u8 = 0x6;
pub const PROTO_UDP: u8 = 0x11;
pub const PROTO_ICMPV6: u8 = 0x3A;

impl Protocol {
    /// No protocol constraint; the zero value a wildcarded legacy
    /// match carries on the wire.
    pub const NONE: Self = Self::Unknown(0);

    pub const fn number(&self) -> u8 {
        match self {
            Self::ICMP => PROTO_ICMP,
            Self::IGMP => PROTO_IGMP,
            Self::TCP => PROTO_TCP,
            Self::UDP => PROTO_UDP,
            Self::ICMPv6 => PROTO_ICMPV6,
            Self::Unknown(v) => *v,
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::Unknown(255)
    }
}

impl WireValue for Protocol {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "Protocol";

    fn to_raw(self) -> u128 {
        u128::from(self.number())
    }

    fn from_raw(raw: u128) -> Self {
        Self::from(raw as u8)
    }
}

// The derived comparisons would go by variant index, which breaks
// down the moment someone writes `Protocol::Unknown(6)`: the wire
// contract is that identity and order follow the protocol number.
impl PartialEq for Protocol {
    fn eq(&self, other: &Self) -> bool {
        self.number() == other.number()
    }
}

impl Eq for Protocol {}

impl core::hash::Hash for Protocol {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        state.write_u8(self.number());
    }
}

impl Ord for Protocol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number().cmp(&other.number())
    }
}

impl PartialOrd for Protocol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ICMP => write!(f, "ICMP"),
            Self::IGMP => write!(f, "IGMP"),
            Self::TCP => write!(f, "TCP"),
            Self::UDP => write!(f, "UDP"),
            Self::ICMPv6 => write!(f, "ICMPv6"),
            Self::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

impl From<u8> for Protocol {
    fn from(proto: u8) -> Self {
        match proto {
            PROTO_ICMP => Self::ICMP,
            PROTO_IGMP => Self::IGMP,
            PROTO_TCP => Self::TCP,
            PROTO_UDP => Self::UDP,
            PROTO_ICMPV6 => Self::ICMPv6,
            _ => Self::Unknown(proto),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        proto.number()
    }
}

impl From<smoltcp::wire::IpProtocol> for Protocol {
    fn from(proto: smoltcp::wire::IpProtocol) -> Self {
        Self::from(u8::from(proto))
    }
}

impl From<Protocol> for smoltcp::wire::IpProtocol {
    fn from(proto: Protocol) -> smoltcp::wire::IpProtocol {
        Self::from(proto.number())
    }
}

/// An IPv4 address.
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
#[repr(C)]
pub struct Ipv4Addr {
    inner: [u8; 4],
}

impl Ipv4Addr {
    pub const ANY_ADDR: Self = Self { inner: [0; 4] };
    pub const LOCAL_BCAST: Self = Self { inner: [255; 4] };

    /// Return the bytes of the address.
    #[inline]
    pub fn bytes(&self) -> [u8; 4] {
        self.inner
    }

    pub const fn from_const(bytes: [u8; 4]) -> Self {
        Self { inner: bytes }
    }

    /// Return the address after applying the network mask.
    pub fn mask(mut self, mask: u8) -> Result<Self, ValueError> {
        if mask > 32 {
            return Err(ValueError::OutOfRange {
                kind: "Ipv4 prefix",
                value: u128::from(mask),
            });
        }

        if mask == 0 {
            return Ok(Ipv4Addr::ANY_ADDR);
        }

        let mut n = u32::from_be_bytes(self.inner);

        let mut bits = i32::MIN;
        bits >>= mask - 1;
        n &= bits as u32;
        self.inner = n.to_be_bytes();
        Ok(self)
    }

    /// The bitmask selecting the leading `prefix_len` bits.
    pub fn prefix_mask(prefix_len: u8) -> Result<Self, ValueError> {
        Self::LOCAL_BCAST.mask(prefix_len)
    }

    /// If this address is a contiguous leading-bits mask, return the
    /// prefix length it encodes.
    pub fn mask_prefix_len(&self) -> Option<u8> {
        let m = u32::from_be_bytes(self.inner);
        let ones = m.leading_ones() as u8;
        if Some(*self) == Self::prefix_mask(ones).ok() {
            Some(ones)
        } else {
            None
        }
    }

    pub const fn is_multicast(&self) -> bool {
        matches!(self.inner[0], 224..240)
    }
}

impl WireValue for Ipv4Addr {
    const WIRE_LEN: usize = 4;
    const NAME: &'static str = "Ipv4Addr";

    fn to_raw(self) -> u128 {
        u128::from(u32::from_be_bytes(self.inner))
    }

    fn from_raw(raw: u128) -> Self {
        Self { inner: (raw as u32).to_be_bytes() }
    }
}

impl From<core::net::Ipv4Addr> for Ipv4Addr {
    fn from(ip4: core::net::Ipv4Addr) -> Self {
        Self { inner: ip4.octets() }
    }
}

impl From<Ipv4Addr> for core::net::Ipv4Addr {
    fn from(ip4: Ipv4Addr) -> Self {
        Self::from(ip4.inner)
    }
}

impl From<smoltcp::wire::Ipv4Address> for Ipv4Addr {
    fn from(smolip4: smoltcp::wire::Ipv4Address) -> Self {
        let bytes = smolip4.as_bytes();
        Self::from([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl From<Ipv4Addr> for smoltcp::wire::Ipv4Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self::from_bytes(&ip)
    }
}

impl From<Ipv4Addr> for u32 {
    fn from(ip: Ipv4Addr) -> u32 {
        u32::from_be_bytes(ip.bytes())
    }
}

impl From<u32> for Ipv4Addr {
    fn from(val: u32) -> Self {
        Self { inner: val.to_be_bytes() }
    }
}

impl From<[u8; 4]> for Ipv4Addr {
    fn from(bytes: [u8; 4]) -> Self {
        Self { inner: bytes }
    }
}

impl FromStr for Ipv4Addr {
    type Err = String;

    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        let octets: Vec<u8> = val
            .split('.')
            .map(|s| s.parse().map_err(|e| format!("{e}")))
            .collect::<result::Result<Vec<u8>, _>>()?;

        if octets.len() != 4 {
            return Err(format!("malformed ip: {val}"));
        }

        Ok(Self { inner: [octets[0], octets[1], octets[2], octets[3]] })
    }
}

impl Display for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.inner[0], self.inner[1], self.inner[2], self.inner[3],
        )
    }
}

// There's no reason to view an Ipv4Addr as its raw array, so just
// present it in a human-friendly manner.
impl Debug for Ipv4Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Ipv4Addr {{ inner: {self} }}")
    }
}

impl AsRef<[u8]> for Ipv4Addr {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl Deref for Ipv4Addr {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// An IPv6 address.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
#[repr(C)]
pub struct Ipv6Addr {
    inner: [u8; 16],
}

impl Ipv6Addr {
    /// The unspecified IPv6 address, i.e., `::` or all zeros.
    pub const ANY_ADDR: Self = Self { inner: [0; 16] };

    /// Return the bytes of the address.
    pub fn bytes(&self) -> [u8; 16] {
        self.inner
    }

    pub const fn from_const(words: [u16; 8]) -> Self {
        let mut inner = [0u8; 16];
        let mut i = 0;
        while i < 8 {
            let bytes = words[i].to_be_bytes();
            inner[i * 2] = bytes[0];
            inner[i * 2 + 1] = bytes[1];
            i += 1;
        }
        Self { inner }
    }

    /// Return `true` if this is a multicast IPv6 address.
    pub const fn is_multicast(&self) -> bool {
        self.inner[0] == 0xFF
    }

    /// Return the address after applying the network mask.
    pub fn mask(mut self, mask: u8) -> Result<Self, ValueError> {
        if mask > 128 {
            return Err(ValueError::OutOfRange {
                kind: "Ipv6 prefix",
                value: u128::from(mask),
            });
        }

        if mask == 128 {
            return Ok(self);
        }

        if mask == 0 {
            self.inner.fill(0);
            return Ok(self);
        }

        // The mask is in bits and we want to determine which byte (of
        // the 16 that make up the address) to start with. A byte is 8
        // bits, if 8 goes into `mask` N times, then the first N bytes
        // stay as-is. However, byte N may need partial masking, and
        // bytes N+1..16 must be set to zero.
        let byte_idx = usize::from(mask / 8);
        let partial = mask % 8;
        if partial > 0 {
            self.inner[byte_idx] &= 0xFFu8 << (8 - partial);
            self.inner[byte_idx + 1..].fill(0);
        } else {
            self.inner[byte_idx..].fill(0);
        }
        Ok(self)
    }
}

impl WireValue for Ipv6Addr {
    const WIRE_LEN: usize = 16;
    const NAME: &'static str = "Ipv6Addr";

    fn to_raw(self) -> u128 {
        u128::from_be_bytes(self.inner)
    }

    fn from_raw(raw: u128) -> Self {
        Self { inner: raw.to_be_bytes() }
    }
}

impl From<core::net::Ipv6Addr> for Ipv6Addr {
    fn from(ip6: core::net::Ipv6Addr) -> Self {
        Self { inner: ip6.octets() }
    }
}

impl From<Ipv6Addr> for core::net::Ipv6Addr {
    fn from(ip6: Ipv6Addr) -> Self {
        Self::from(ip6.inner)
    }
}

impl From<smoltcp::wire::Ipv6Address> for Ipv6Addr {
    fn from(smolip6: smoltcp::wire::Ipv6Address) -> Self {
        let mut inner = [0u8; 16];
        inner.copy_from_slice(smolip6.as_bytes());
        Self { inner }
    }
}

impl From<Ipv6Addr> for smoltcp::wire::Ipv6Address {
    fn from(ip: Ipv6Addr) -> Self {
        Self::from_bytes(&ip.inner)
    }
}

impl From<[u8; 16]> for Ipv6Addr {
    fn from(bytes: [u8; 16]) -> Self {
        Self { inner: bytes }
    }
}

impl FromStr for Ipv6Addr {
    type Err = String;

    fn from_str(val: &str) -> result::Result<Self, Self::Err> {
        val.parse::<core::net::Ipv6Addr>()
            .map(Self::from)
            .map_err(|_| format!("malformed ipv6: {val}"))
    }
}

impl Display for Ipv6Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", core::net::Ipv6Addr::from(*self))
    }
}

/// The six-bit DSCP field of the IP ToS byte.
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
pub struct IpDscp(u8);

impl IpDscp {
    pub const NONE: Self = Self(0);
    pub const MAX: u8 = 0x3F;

    pub fn of(val: u8) -> Result<Self, ValueError> {
        Self::check_raw(u128::from(val))?;
        Ok(Self(val))
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl WireValue for IpDscp {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "IpDscp";

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

impl Display for IpDscp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two-bit ECN field of the IP ToS byte.
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
pub struct IpEcn(u8);

impl IpEcn {
    pub const NONE: Self = Self(0);
    pub const MAX: u8 = 0x3;

    pub fn of(val: u8) -> Result<Self, ValueError> {
        Self::check_raw(u128::from(val))?;
        Ok(Self(val))
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl WireValue for IpEcn {
    const WIRE_LEN: usize = 1;
    const NAME: &'static str = "IpEcn";

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

impl Display for IpEcn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
