// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The version 1.0 match: a fixed 40-byte struct with a wildcard
//! bitmap.
//!
//! The scalar sub-fields each own one bit of the bitmap; the two
//! IPv4 fields instead carry a six-bit *don't-care bit count* (0 is
//! an exact /32, 32 and above is fully wildcarded -- the inverse of a
//! CIDR prefix length). The build-time normalization below reproduces
//! a compatibility quirk of the original protocol stack and must not
//! be "fixed": when the ethertype does not select IP (or ARP), the
//! dependent sub-fields are forced to their don't-care state on the
//! wire no matter what the caller set.

use crate::OflowError;
use crate::field::MatchFields;
use crate::flow_match::MatchError;
use crate::wire::ReadErr;
use crate::wire::WireReader;
use crate::wire::WireWriter;
use bitflags::bitflags;
use core::mem;
use oflow_api::EthType;
use oflow_api::IpDscp;
use oflow_api::Ipv4Addr;
use oflow_api::MacAddr;
use oflow_api::PortNo;
use oflow_api::Protocol;
use oflow_api::TransportPort;
use oflow_api::VlanPcp;
use oflow_api::VlanVid;
use oflow_api::WireValue;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

bitflags! {
    /// The wildcard bitmap of the 1.0 match.
    ///
    /// `NW_SRC_MASK`/`NW_DST_MASK` are not flags but six-bit counter
    /// sub-fields; use the accessors below.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct Wildcards: u32 {
        const IN_PORT = 1 << 0;
        const DL_VLAN = 1 << 1;
        const DL_SRC = 1 << 2;
        const DL_DST = 1 << 3;
        const DL_TYPE = 1 << 4;
        const NW_PROTO = 1 << 5;
        const TP_SRC = 1 << 6;
        const TP_DST = 1 << 7;
        const NW_SRC_MASK = 0x3F << 8;
        const NW_DST_MASK = 0x3F << 14;
        const DL_VLAN_PCP = 1 << 20;
        const NW_TOS = 1 << 21;
        const ALL = (1 << 22) - 1;
    }
}

impl Wildcards {
    const NW_SRC_SHIFT: u32 = 8;
    const NW_DST_SHIFT: u32 = 14;

    /// The source don't-care bit count, 0..=63.
    pub fn nw_src_wild(self) -> u32 {
        (self.bits() & Self::NW_SRC_MASK.bits()) >> Self::NW_SRC_SHIFT
    }

    pub fn nw_dst_wild(self) -> u32 {
        (self.bits() & Self::NW_DST_MASK.bits()) >> Self::NW_DST_SHIFT
    }

    pub fn with_nw_src_wild(self, count: u32) -> Self {
        Self::from_bits_retain(
            (self.bits() & !Self::NW_SRC_MASK.bits())
                | ((count & 0x3F) << Self::NW_SRC_SHIFT),
        )
    }

    pub fn with_nw_dst_wild(self, count: u32) -> Self {
        Self::from_bits_retain(
            (self.bits() & !Self::NW_DST_MASK.bits())
                | ((count & 0x3F) << Self::NW_DST_SHIFT),
        )
    }

    /// Significant leading bits of the source address, CIDR style: 32
    /// is an exact match, 0 matches every address. Counts above 32
    /// clamp to 0.
    pub fn src_cidr_mask_len(self) -> u8 {
        (32i32 - self.nw_src_wild() as i32).max(0) as u8
    }

    pub fn dst_cidr_mask_len(self) -> u8 {
        (32i32 - self.nw_dst_wild() as i32).max(0) as u8
    }
}

// The bitmap serializes as its raw bits; unknown bits from other
// producers survive the trip.
impl Serialize for Wildcards {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(ser)
    }
}

impl<'de> Deserialize<'de> for Wildcards {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        u32::deserialize(de).map(Self::from_bits_retain)
    }
}

/// The version 1.0 match structure.
///
/// Wire-faithful: decoding and re-encoding reproduces the input
/// byte-for-byte, including wildcard bits over junk values. The
/// normalization quirk only runs when a builder materializes a new
/// match.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchV1 {
    wildcards: Wildcards,
    in_port: PortNo,
    eth_src: MacAddr,
    eth_dst: MacAddr,
    vlan_vid: VlanVid,
    vlan_pcp: VlanPcp,
    eth_type: EthType,
    ip_dscp: IpDscp,
    ip_proto: Protocol,
    ipv4_src: Ipv4Addr,
    ipv4_dst: Ipv4Addr,
    tp_src: TransportPort,
    tp_dst: TransportPort,
}

impl Default for MatchV1 {
    fn default() -> Self {
        Self {
            wildcards: Wildcards::ALL,
            in_port: PortNo::ZERO,
            eth_src: MacAddr::ZERO,
            eth_dst: MacAddr::ZERO,
            vlan_vid: VlanVid::NONE,
            vlan_pcp: VlanPcp::NONE,
            eth_type: EthType::NONE,
            ip_dscp: IpDscp::NONE,
            ip_proto: Protocol::NONE,
            ipv4_src: Ipv4Addr::ANY_ADDR,
            ipv4_dst: Ipv4Addr::ANY_ADDR,
            tp_src: TransportPort::NONE,
            tp_dst: TransportPort::NONE,
        }
    }
}

/// Fields the 1.0 encoding can represent.
pub(crate) fn supports_field(field: MatchFields) -> bool {
    matches!(
        field,
        MatchFields::InPort
            | MatchFields::EthDst
            | MatchFields::EthSrc
            | MatchFields::EthType
            | MatchFields::VlanVid
            | MatchFields::VlanPcp
            | MatchFields::IpDscp
            | MatchFields::IpProto
            | MatchFields::Ipv4Src
            | MatchFields::Ipv4Dst
            | MatchFields::TcpSrc
            | MatchFields::TcpDst
            | MatchFields::UdpSrc
            | MatchFields::UdpDst
            | MatchFields::Icmpv4Type
            | MatchFields::Icmpv4Code
            | MatchFields::ArpOp
            | MatchFields::ArpSpa
            | MatchFields::ArpTpa
    )
}

/// Only the IPv4 address views take a (CIDR) mask in 1.0.
pub(crate) fn supports_masked_field(field: MatchFields) -> bool {
    matches!(
        field,
        MatchFields::Ipv4Src
            | MatchFields::Ipv4Dst
            | MatchFields::ArpSpa
            | MatchFields::ArpTpa
    )
}

/// Whether a field reads the source or destination CIDR counter.
enum IpSide {
    Src,
    Dst,
}

fn ip_side(field: MatchFields) -> Option<IpSide> {
    match field {
        MatchFields::Ipv4Src | MatchFields::ArpSpa => Some(IpSide::Src),
        MatchFields::Ipv4Dst | MatchFields::ArpTpa => Some(IpSide::Dst),
        _ => None,
    }
}

// The single wildcard bit of every non-IPv4 sub-field. The transport
// views (TCP/UDP/ICMP) share bits and storage, disambiguated only by
// the ip_proto prerequisite; arp_op shares storage with ip_proto.
fn flag_of(field: MatchFields) -> Wildcards {
    match field {
        MatchFields::InPort => Wildcards::IN_PORT,
        MatchFields::EthDst => Wildcards::DL_DST,
        MatchFields::EthSrc => Wildcards::DL_SRC,
        MatchFields::EthType => Wildcards::DL_TYPE,
        MatchFields::VlanVid => Wildcards::DL_VLAN,
        MatchFields::VlanPcp => Wildcards::DL_VLAN_PCP,
        MatchFields::IpDscp => Wildcards::NW_TOS,
        MatchFields::IpProto | MatchFields::ArpOp => Wildcards::NW_PROTO,
        MatchFields::TcpSrc
        | MatchFields::UdpSrc
        | MatchFields::Icmpv4Type => Wildcards::TP_SRC,
        MatchFields::TcpDst
        | MatchFields::UdpDst
        | MatchFields::Icmpv4Code => Wildcards::TP_DST,
        _ => unreachable!("field unsupported by the 1.0 match"),
    }
}

impl MatchV1 {
    pub fn wildcards(&self) -> Wildcards {
        self.wildcards
    }

    pub fn ipv4_src_cidr_mask_len(&self) -> u8 {
        self.wildcards.src_cidr_mask_len()
    }

    pub fn ipv4_dst_cidr_mask_len(&self) -> u8 {
        self.wildcards.dst_cidr_mask_len()
    }

    pub(crate) fn is_exact_field(&self, field: MatchFields) -> bool {
        match ip_side(field) {
            Some(IpSide::Src) => self.wildcards.src_cidr_mask_len() >= 32,
            Some(IpSide::Dst) => self.wildcards.dst_cidr_mask_len() >= 32,
            None => !self.wildcards.contains(flag_of(field)),
        }
    }

    pub(crate) fn is_wild_field(&self, field: MatchFields) -> bool {
        match ip_side(field) {
            Some(IpSide::Src) => self.wildcards.src_cidr_mask_len() == 0,
            Some(IpSide::Dst) => self.wildcards.dst_cidr_mask_len() == 0,
            None => self.wildcards.contains(flag_of(field)),
        }
    }

    pub(crate) fn is_partial_field(&self, field: MatchFields) -> bool {
        match ip_side(field) {
            Some(IpSide::Src) => {
                matches!(self.wildcards.src_cidr_mask_len(), 1..=31)
            }
            Some(IpSide::Dst) => {
                matches!(self.wildcards.dst_cidr_mask_len(), 1..=31)
            }
            None => false,
        }
    }

    /// The stored value of a populated field, raw. `None` when the
    /// field is fully wildcarded.
    pub(crate) fn raw_get(&self, field: MatchFields) -> Option<u128> {
        if self.is_wild_field(field) {
            return None;
        }

        let raw = match field {
            MatchFields::InPort => self.in_port.to_raw(),
            MatchFields::EthDst => self.eth_dst.to_raw(),
            MatchFields::EthSrc => self.eth_src.to_raw(),
            MatchFields::EthType => self.eth_type.to_raw(),
            MatchFields::VlanVid => self.vlan_vid.to_raw(),
            MatchFields::VlanPcp => self.vlan_pcp.to_raw(),
            MatchFields::IpDscp => self.ip_dscp.to_raw(),
            MatchFields::IpProto | MatchFields::ArpOp => {
                u128::from(self.ip_proto.number())
            }
            MatchFields::Ipv4Src | MatchFields::ArpSpa => {
                self.ipv4_src.to_raw()
            }
            MatchFields::Ipv4Dst | MatchFields::ArpTpa => {
                self.ipv4_dst.to_raw()
            }
            MatchFields::TcpSrc
            | MatchFields::UdpSrc
            | MatchFields::Icmpv4Type => self.tp_src.to_raw(),
            MatchFields::TcpDst
            | MatchFields::UdpDst
            | MatchFields::Icmpv4Code => self.tp_dst.to_raw(),
            _ => return None,
        };

        Some(raw)
    }

    /// The (value, mask) pair of a partially masked field.
    pub(crate) fn raw_masked(&self, field: MatchFields) -> Option<(u128, u128)> {
        if !self.is_partial_field(field) {
            return None;
        }

        let (addr, len) = match ip_side(field) {
            Some(IpSide::Src) => {
                (self.ipv4_src, self.wildcards.src_cidr_mask_len())
            }
            Some(IpSide::Dst) => {
                (self.ipv4_dst, self.wildcards.dst_cidr_mask_len())
            }
            None => return None,
        };

        // len is 1..=31 here, always a valid prefix.
        let mask = Ipv4Addr::prefix_mask(len).expect("prefix in range");
        Some((addr.to_raw(), mask.to_raw()))
    }

    pub(crate) fn set_raw(&mut self, field: MatchFields, raw: u128) {
        if let Some(side) = ip_side(field) {
            match side {
                IpSide::Src => {
                    self.ipv4_src = Ipv4Addr::from_raw(raw);
                    self.wildcards = self.wildcards.with_nw_src_wild(0);
                }
                IpSide::Dst => {
                    self.ipv4_dst = Ipv4Addr::from_raw(raw);
                    self.wildcards = self.wildcards.with_nw_dst_wild(0);
                }
            }
            return;
        }

        match field {
            MatchFields::InPort => self.in_port = PortNo::from_raw(raw),
            MatchFields::EthDst => self.eth_dst = MacAddr::from_raw(raw),
            MatchFields::EthSrc => self.eth_src = MacAddr::from_raw(raw),
            MatchFields::EthType => self.eth_type = EthType::from_raw(raw),
            MatchFields::VlanVid => self.vlan_vid = VlanVid::from_raw(raw),
            MatchFields::VlanPcp => self.vlan_pcp = VlanPcp::from_raw(raw),
            MatchFields::IpDscp => self.ip_dscp = IpDscp::from_raw(raw),
            MatchFields::IpProto | MatchFields::ArpOp => {
                self.ip_proto = Protocol::from(raw as u8)
            }
            MatchFields::TcpSrc
            | MatchFields::UdpSrc
            | MatchFields::Icmpv4Type => {
                self.tp_src = TransportPort::from_raw(raw)
            }
            MatchFields::TcpDst
            | MatchFields::UdpDst
            | MatchFields::Icmpv4Code => {
                self.tp_dst = TransportPort::from_raw(raw)
            }
            _ => unreachable!("field unsupported by the 1.0 match"),
        }
        self.wildcards.remove(flag_of(field));
    }

    /// Set an IPv4 view with a mask; the mask must have a CIDR form.
    pub(crate) fn set_masked_raw(
        &mut self,
        field: MatchFields,
        raw: u128,
        mask_raw: u128,
    ) -> Result<(), MatchError> {
        let side = ip_side(field).ok_or(MatchError::NonCidrMask)?;
        let prefix_len = Ipv4Addr::from_raw(mask_raw)
            .mask_prefix_len()
            .ok_or(MatchError::NonCidrMask)?;
        let wild = 32 - u32::from(prefix_len);

        match side {
            IpSide::Src => {
                self.ipv4_src = Ipv4Addr::from_raw(raw & mask_raw);
                self.wildcards = self.wildcards.with_nw_src_wild(wild);
            }
            IpSide::Dst => {
                self.ipv4_dst = Ipv4Addr::from_raw(raw & mask_raw);
                self.wildcards = self.wildcards.with_nw_dst_wild(wild);
            }
        }
        Ok(())
    }

    pub(crate) fn wildcard_field(&mut self, field: MatchFields) {
        match ip_side(field) {
            Some(IpSide::Src) => {
                self.wildcards = self.wildcards.with_nw_src_wild(32);
            }
            Some(IpSide::Dst) => {
                self.wildcards = self.wildcards.with_nw_dst_wild(32);
            }
            None => {
                self.wildcards.insert(flag_of(field));
            }
        }
    }

    /// The build-time normalization quirk, preserved verbatim from
    /// the original stack: sub-fields whose prerequisites cannot hold
    /// given the current ethertype/protocol are forced to their
    /// don't-care state. A wildcarded ethertype reads as "not even
    /// IP" and clears everything downstream.
    pub(crate) fn normalize(&mut self) {
        if self.eth_type == EthType::IPV4 {
            self.normalize_nw_wild();
            if !matches!(
                self.ip_proto,
                Protocol::TCP | Protocol::UDP | Protocol::ICMP
            ) {
                self.wildcards.insert(Wildcards::TP_SRC | Wildcards::TP_DST);
                self.tp_src = TransportPort::NONE;
                self.tp_dst = TransportPort::NONE;
            }
        } else if self.eth_type == EthType::ARP {
            self.normalize_nw_wild();
            self.wildcards.insert(
                Wildcards::NW_TOS | Wildcards::TP_SRC | Wildcards::TP_DST,
            );
            self.ip_dscp = IpDscp::NONE;
            self.tp_src = TransportPort::NONE;
            self.tp_dst = TransportPort::NONE;
        } else {
            self.wildcards.insert(
                Wildcards::NW_TOS
                    | Wildcards::NW_PROTO
                    | Wildcards::NW_SRC_MASK
                    | Wildcards::NW_DST_MASK
                    | Wildcards::TP_SRC
                    | Wildcards::TP_DST,
            );
            self.ip_dscp = IpDscp::NONE;
            self.ip_proto = Protocol::NONE;
            self.ipv4_src = Ipv4Addr::ANY_ADDR;
            self.ipv4_dst = Ipv4Addr::ANY_ADDR;
            self.tp_src = TransportPort::NONE;
            self.tp_dst = TransportPort::NONE;
        }
    }

    // Counters in 32..=63 all mean "fully wildcarded"; the canonical
    // wire form is the full six-bit field.
    fn normalize_nw_wild(&mut self) {
        if self.wildcards.nw_src_wild() >= 32 {
            self.wildcards = self.wildcards.with_nw_src_wild(0x3F);
        }
        if self.wildcards.nw_dst_wild() >= 32 {
            self.wildcards = self.wildcards.with_nw_dst_wild(0x3F);
        }
    }

    pub fn parse(rdr: &mut WireReader) -> Result<Self, OflowError> {
        let raw = MatchV1Raw::read_from_bytes(rdr.slice(MATCH_V1_SZ)?)
            .map_err(|_| OflowError::Read(ReadErr::BadLayout))?;
        Self::try_from(&raw)
    }

    pub fn emit(&self, wtr: &mut WireWriter) {
        let raw = MatchV1Raw::from(self);
        wtr.put_slice(raw.as_bytes());
    }
}

pub const MATCH_V1_SZ: usize = mem::size_of::<MatchV1Raw>();

/// Note: kept unaligned so the layout is exactly the wire image.
#[repr(C)]
#[derive(
    Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
    Unaligned,
)]
pub struct MatchV1Raw {
    pub wildcards: [u8; 4],
    pub in_port: [u8; 2],
    pub eth_src: [u8; 6],
    pub eth_dst: [u8; 6],
    pub vlan_vid: [u8; 2],
    pub vlan_pcp: u8,
    pub pad1: u8,
    pub eth_type: [u8; 2],
    pub ip_dscp: u8,
    pub ip_proto: u8,
    pub pad2: [u8; 2],
    pub ipv4_src: [u8; 4],
    pub ipv4_dst: [u8; 4],
    pub tp_src: [u8; 2],
    pub tp_dst: [u8; 2],
}

impl TryFrom<&MatchV1Raw> for MatchV1 {
    type Error = OflowError;

    fn try_from(raw: &MatchV1Raw) -> Result<Self, Self::Error> {
        Ok(Self {
            wildcards: Wildcards::from_bits_retain(u32::from_be_bytes(
                raw.wildcards,
            )),
            in_port: PortNo::of(u32::from(u16::from_be_bytes(raw.in_port))),
            eth_src: MacAddr::from(raw.eth_src),
            eth_dst: MacAddr::from(raw.eth_dst),
            vlan_vid: VlanVid::read(&raw.vlan_vid)?,
            vlan_pcp: VlanPcp::read(&[raw.vlan_pcp])?,
            eth_type: EthType::of(u16::from_be_bytes(raw.eth_type)),
            ip_dscp: IpDscp::read(&[raw.ip_dscp])?,
            ip_proto: Protocol::from(raw.ip_proto),
            ipv4_src: Ipv4Addr::from(raw.ipv4_src),
            ipv4_dst: Ipv4Addr::from(raw.ipv4_dst),
            tp_src: TransportPort::of(u16::from_be_bytes(raw.tp_src)),
            tp_dst: TransportPort::of(u16::from_be_bytes(raw.tp_dst)),
        })
    }
}

impl From<&MatchV1> for MatchV1Raw {
    fn from(m: &MatchV1) -> Self {
        Self {
            wildcards: m.wildcards.bits().to_be_bytes(),
            // 1.0 port numbers are 16 bits on the wire.
            in_port: (m.in_port.number() as u16).to_be_bytes(),
            eth_src: m.eth_src.bytes(),
            eth_dst: m.eth_dst.bytes(),
            vlan_vid: m.vlan_vid.value().to_be_bytes(),
            vlan_pcp: m.vlan_pcp.value(),
            pad1: 0,
            eth_type: m.eth_type.value().to_be_bytes(),
            ip_dscp: m.ip_dscp.value(),
            ip_proto: m.ip_proto.number(),
            pad2: [0; 2],
            ipv4_src: m.ipv4_src.bytes(),
            ipv4_dst: m.ipv4_dst.bytes(),
            tp_src: m.tp_src.number().to_be_bytes(),
            tp_dst: m.tp_dst.number().to_be_bytes(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn struct_is_wire_sized() {
        assert_eq!(MATCH_V1_SZ, 40);
    }

    #[test]
    fn cidr_mask_len_clamps() {
        let wc = Wildcards::ALL.with_nw_src_wild(0);
        assert_eq!(wc.src_cidr_mask_len(), 32);

        let wc = Wildcards::ALL.with_nw_src_wild(8);
        assert_eq!(wc.src_cidr_mask_len(), 24);

        let wc = Wildcards::ALL.with_nw_src_wild(32);
        assert_eq!(wc.src_cidr_mask_len(), 0);

        // Counts above 32 also mean "match nothing of the address".
        let wc = Wildcards::ALL.with_nw_src_wild(63);
        assert_eq!(wc.src_cidr_mask_len(), 0);
    }

    #[test]
    fn emit() {
        let mut m = MatchV1::default();
        m.set_raw(MatchFields::EthType, 0x0800);
        m.set_raw(MatchFields::IpProto, 0x06);
        m.set_raw(MatchFields::Ipv4Src, Ipv4Addr::from([1, 2, 3, 4]).to_raw());
        m.set_raw(MatchFields::TcpDst, 80);

        let mut buf = Vec::new();
        let mut wtr = WireWriter::new(&mut buf);
        m.emit(&mut wtr);

        // ALL is 0x3FFFFF; clearing DL_TYPE (1 << 4), NW_PROTO
        // (1 << 5), TP_DST (1 << 7) and the source counter leaves
        // 0x3FC04F.
        #[rustfmt::skip]
        let expected = vec![
            // wildcards
            0x00, 0x3F, 0xC0, 0x4F,
            // in_port
            0x00, 0x00,
            // eth_src, eth_dst
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // vlan_vid, vlan_pcp, pad
            0x00, 0x00, 0x00, 0x00,
            // eth_type
            0x08, 0x00,
            // ip_dscp, ip_proto, pad
            0x00, 0x06, 0x00, 0x00,
            // ipv4_src, ipv4_dst
            0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00,
            // tp_src, tp_dst
            0x00, 0x00, 0x00, 0x50,
        ];
        assert_eq!(buf, expected);

        let mut rdr = WireReader::new(&buf);
        let parsed = MatchV1::parse(&mut rdr).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn truncated_struct_is_fatal() {
        let buf = [0u8; MATCH_V1_SZ - 1];
        let mut rdr = WireReader::new(&buf);
        assert!(MatchV1::parse(&mut rdr).is_err());
    }

    #[test]
    fn normalize_not_ip_clears_dependents() {
        let mut m = MatchV1::default();
        // Ethertype left wildcarded, dependents set anyway.
        m.set_raw(MatchFields::IpProto, 6);
        m.set_raw(MatchFields::TcpSrc, 1234);
        m.set_raw(MatchFields::Ipv4Dst, Ipv4Addr::from([10, 0, 0, 1]).to_raw());
        m.normalize();

        assert!(m.wildcards.contains(Wildcards::NW_PROTO));
        assert!(m.wildcards.contains(Wildcards::TP_SRC));
        assert!(m.wildcards.contains(Wildcards::TP_DST));
        assert_eq!(m.wildcards.dst_cidr_mask_len(), 0);
        assert_eq!(m.ip_proto, Protocol::NONE);
        assert_eq!(m.tp_src, TransportPort::NONE);
        assert_eq!(m.ipv4_dst, Ipv4Addr::ANY_ADDR);
    }

    #[test]
    fn normalize_ip_non_transport_clears_ports() {
        let mut m = MatchV1::default();
        m.set_raw(MatchFields::EthType, 0x0800);
        m.set_raw(MatchFields::IpProto, 0x2F); // GRE
        m.set_raw(MatchFields::TcpSrc, 1234);
        m.normalize();

        // The protocol itself survives; the port views do not.
        assert!(!m.wildcards.contains(Wildcards::NW_PROTO));
        assert!(m.wildcards.contains(Wildcards::TP_SRC));
        assert_eq!(m.tp_src, TransportPort::NONE);
    }

    #[test]
    fn normalize_tcp_keeps_ports() {
        let mut m = MatchV1::default();
        m.set_raw(MatchFields::EthType, 0x0800);
        m.set_raw(MatchFields::IpProto, 6);
        m.set_raw(MatchFields::TcpSrc, 1234);
        m.normalize();

        assert!(!m.wildcards.contains(Wildcards::TP_SRC));
        assert_eq!(m.tp_src, TransportPort::of(1234));
    }

    #[test]
    fn normalize_arp_keeps_addresses() {
        let mut m = MatchV1::default();
        m.set_raw(MatchFields::EthType, 0x0806);
        m.set_raw(MatchFields::ArpOp, 1);
        m.set_raw(MatchFields::ArpSpa, Ipv4Addr::from([10, 0, 0, 9]).to_raw());
        m.set_raw(MatchFields::IpDscp, 0x10);
        m.normalize();

        assert!(!m.wildcards.contains(Wildcards::NW_PROTO));
        assert_eq!(m.wildcards.src_cidr_mask_len(), 32);
        assert_eq!(m.raw_get(MatchFields::ArpSpa), Some(0x0A000009));
        // ToS is forced back to don't-care under ARP.
        assert!(m.wildcards.contains(Wildcards::NW_TOS));
        assert_eq!(m.ip_dscp, IpDscp::NONE);
    }

    #[test]
    fn normalize_canonicalizes_partial_counters() {
        let mut m = MatchV1::default();
        m.set_raw(MatchFields::EthType, 0x0800);
        m.set_raw(MatchFields::IpProto, 6);
        // Counter 33: wildcarded, but not the canonical wire form.
        m.wildcards = m.wildcards.with_nw_src_wild(33);
        m.normalize();
        assert_eq!(m.wildcards.nw_src_wild(), 0x3F);
    }

    #[test]
    fn masked_set_requires_cidr_mask() {
        let mut m = MatchV1::default();
        let addr = Ipv4Addr::from([10, 1, 2, 3]).to_raw();

        let mask = Ipv4Addr::from([255, 255, 0, 0]).to_raw();
        m.set_masked_raw(MatchFields::Ipv4Src, addr, mask).unwrap();
        assert_eq!(m.wildcards.src_cidr_mask_len(), 16);
        assert_eq!(m.raw_masked(MatchFields::Ipv4Src), Some((0x0A010000, mask)));

        let bad = Ipv4Addr::from([255, 0, 255, 0]).to_raw();
        assert_eq!(
            m.set_masked_raw(MatchFields::Ipv4Dst, addr, bad),
            Err(MatchError::NonCidrMask)
        );
    }
}
