// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The match-field catalogue.
//!
//! Field identity is stable across every wire version even though the
//! wire representation is not. The catalogue is a closed set of
//! static descriptors built at compile time; nothing here is ever
//! mutated or extended at runtime.

use core::fmt;
use core::fmt::Display;
use core::marker::PhantomData;
use oflow_api::ArpOpcode;
use oflow_api::EthType;
use oflow_api::IcmpCode;
use oflow_api::IcmpType;
use oflow_api::IpDscp;
use oflow_api::IpEcn;
use oflow_api::Ipv4Addr;
use oflow_api::Ipv6Addr;
use oflow_api::MacAddr;
use oflow_api::PortNo;
use oflow_api::Protocol;
use oflow_api::TransportPort;
use oflow_api::U64;
use oflow_api::ValueError;
use oflow_api::VlanVid;
use oflow_api::VlanPcp;
use oflow_api::WireValue;
use oflow_api::ether::ETHER_TYPE_ARP;
use oflow_api::ether::ETHER_TYPE_IPV4;
use oflow_api::ether::ETHER_TYPE_IPV6;
use oflow_api::ip::PROTO_ICMP;
use oflow_api::ip::PROTO_TCP;
use oflow_api::ip::PROTO_UDP;
use serde::Deserialize;
use serde::Serialize;

/// The dense identity of every field in the catalogue.
///
/// Declaration order is catalogue order: list iteration, the derived
/// `Ord`, and the spec table below all follow it.
#[repr(u8)]
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
pub enum MatchFields {
    InPort,
    InPhyPort,
    Metadata,
    EthDst,
    EthSrc,
    EthType,
    VlanVid,
    VlanPcp,
    IpDscp,
    IpEcn,
    IpProto,
    Ipv4Src,
    Ipv4Dst,
    TcpSrc,
    TcpDst,
    UdpSrc,
    UdpDst,
    Icmpv4Type,
    Icmpv4Code,
    ArpOp,
    ArpSpa,
    ArpTpa,
    ArpSha,
    ArpTha,
    Ipv6Src,
    Ipv6Dst,
    TunnelId,
}

impl MatchFields {
    pub const COUNT: usize = 27;

    pub const ALL: [Self; Self::COUNT] = [
        Self::InPort,
        Self::InPhyPort,
        Self::Metadata,
        Self::EthDst,
        Self::EthSrc,
        Self::EthType,
        Self::VlanVid,
        Self::VlanPcp,
        Self::IpDscp,
        Self::IpEcn,
        Self::IpProto,
        Self::Ipv4Src,
        Self::Ipv4Dst,
        Self::TcpSrc,
        Self::TcpDst,
        Self::UdpSrc,
        Self::UdpDst,
        Self::Icmpv4Type,
        Self::Icmpv4Code,
        Self::ArpOp,
        Self::ArpSpa,
        Self::ArpTpa,
        Self::ArpSha,
        Self::ArpTha,
        Self::Ipv6Src,
        Self::Ipv6Dst,
        Self::TunnelId,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &SPECS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn wire_len(self) -> usize {
        self.spec().wire_len
    }

    pub fn prerequisites(self) -> &'static [Prerequisite] {
        self.spec().prereqs
    }
}

impl Display for MatchFields {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A declared dependency: this field only means anything when
/// `field` is present in the match and, unless `allowed` is empty
/// ("any value"), currently holds one of the allowed raw values.
///
/// Prerequisites form a DAG over the catalogue, never a cycle.
#[derive(Clone, Copy, Debug)]
pub struct Prerequisite {
    pub field: MatchFields,
    pub allowed: &'static [u128],
}

impl Prerequisite {
    pub const fn any(field: MatchFields) -> Self {
        Self { field, allowed: &[] }
    }

    pub const fn of(field: MatchFields, allowed: &'static [u128]) -> Self {
        Self { field, allowed }
    }
}

/// The erased, version-independent descriptor the codecs work from.
pub struct FieldSpec {
    pub id: MatchFields,
    pub name: &'static str,
    pub wire_len: usize,
    pub prereqs: &'static [Prerequisite],
    pub check: fn(u128) -> Result<(), ValueError>,
}

const fn spec_of<V: WireValue>(
    id: MatchFields,
    name: &'static str,
    prereqs: &'static [Prerequisite],
) -> FieldSpec {
    FieldSpec { id, name, wire_len: V::WIRE_LEN, prereqs, check: V::check_raw }
}

const ETH_IP: &[u128] =
    &[ETHER_TYPE_IPV4 as u128, ETHER_TYPE_IPV6 as u128];
const ETH_IPV4: &[u128] = &[ETHER_TYPE_IPV4 as u128];
const ETH_IPV6: &[u128] = &[ETHER_TYPE_IPV6 as u128];
const ETH_ARP: &[u128] = &[ETHER_TYPE_ARP as u128];
const PROTO_IS_TCP: &[u128] = &[PROTO_TCP as u128];
const PROTO_IS_UDP: &[u128] = &[PROTO_UDP as u128];
const PROTO_IS_ICMP: &[u128] = &[PROTO_ICMP as u128];

const REQ_IN_PORT: &[Prerequisite] =
    &[Prerequisite::any(MatchFields::InPort)];
const REQ_VLAN_VID: &[Prerequisite] =
    &[Prerequisite::any(MatchFields::VlanVid)];
const REQ_IP: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::EthType, ETH_IP)];
const REQ_IPV4: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::EthType, ETH_IPV4)];
const REQ_IPV6: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::EthType, ETH_IPV6)];
const REQ_ARP: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::EthType, ETH_ARP)];
const REQ_TCP: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::IpProto, PROTO_IS_TCP)];
const REQ_UDP: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::IpProto, PROTO_IS_UDP)];
const REQ_ICMP: &[Prerequisite] =
    &[Prerequisite::of(MatchFields::IpProto, PROTO_IS_ICMP)];

static SPECS: [FieldSpec; MatchFields::COUNT] = [
    spec_of::<PortNo>(MatchFields::InPort, "in_port", &[]),
    spec_of::<PortNo>(MatchFields::InPhyPort, "in_phy_port", REQ_IN_PORT),
    spec_of::<U64>(MatchFields::Metadata, "metadata", &[]),
    spec_of::<MacAddr>(MatchFields::EthDst, "eth_dst", &[]),
    spec_of::<MacAddr>(MatchFields::EthSrc, "eth_src", &[]),
    spec_of::<EthType>(MatchFields::EthType, "eth_type", &[]),
    spec_of::<VlanVid>(MatchFields::VlanVid, "vlan_vid", &[]),
    spec_of::<VlanPcp>(MatchFields::VlanPcp, "vlan_pcp", REQ_VLAN_VID),
    spec_of::<IpDscp>(MatchFields::IpDscp, "ip_dscp", REQ_IP),
    spec_of::<IpEcn>(MatchFields::IpEcn, "ip_ecn", REQ_IP),
    spec_of::<Protocol>(MatchFields::IpProto, "ip_proto", REQ_IP),
    spec_of::<Ipv4Addr>(MatchFields::Ipv4Src, "ipv4_src", REQ_IPV4),
    spec_of::<Ipv4Addr>(MatchFields::Ipv4Dst, "ipv4_dst", REQ_IPV4),
    spec_of::<TransportPort>(MatchFields::TcpSrc, "tcp_src", REQ_TCP),
    spec_of::<TransportPort>(MatchFields::TcpDst, "tcp_dst", REQ_TCP),
    spec_of::<TransportPort>(MatchFields::UdpSrc, "udp_src", REQ_UDP),
    spec_of::<TransportPort>(MatchFields::UdpDst, "udp_dst", REQ_UDP),
    spec_of::<IcmpType>(MatchFields::Icmpv4Type, "icmpv4_type", REQ_ICMP),
    spec_of::<IcmpCode>(MatchFields::Icmpv4Code, "icmpv4_code", REQ_ICMP),
    spec_of::<ArpOpcode>(MatchFields::ArpOp, "arp_op", REQ_ARP),
    spec_of::<Ipv4Addr>(MatchFields::ArpSpa, "arp_spa", REQ_ARP),
    spec_of::<Ipv4Addr>(MatchFields::ArpTpa, "arp_tpa", REQ_ARP),
    spec_of::<MacAddr>(MatchFields::ArpSha, "arp_sha", REQ_ARP),
    spec_of::<MacAddr>(MatchFields::ArpTha, "arp_tha", REQ_ARP),
    spec_of::<Ipv6Addr>(MatchFields::Ipv6Src, "ipv6_src", REQ_IPV6),
    spec_of::<Ipv6Addr>(MatchFields::Ipv6Dst, "ipv6_dst", REQ_IPV6),
    spec_of::<U64>(MatchFields::TunnelId, "tunnel_id", &[]),
];

/// A typed handle into the catalogue.
///
/// The type parameter ties a field to its value type so that
/// `Match::get(&field::IPV4_SRC)` hands back an `Ipv4Addr` and
/// nothing else. Handles carry no data beyond the identity; use the
/// static constants below.
pub struct MatchField<V: WireValue> {
    pub id: MatchFields,
    marker: PhantomData<fn() -> V>,
}

impl<V: WireValue> MatchField<V> {
    const fn new(id: MatchFields) -> Self {
        Self { id, marker: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    pub fn prerequisites(&self) -> &'static [Prerequisite] {
        self.id.prerequisites()
    }
}

impl<V: WireValue> Clone for MatchField<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V: WireValue> Copy for MatchField<V> {}

impl<V: WireValue> Display for MatchField<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub const IN_PORT: MatchField<PortNo> = MatchField::new(MatchFields::InPort);
pub const IN_PHY_PORT: MatchField<PortNo> =
    MatchField::new(MatchFields::InPhyPort);
pub const METADATA: MatchField<U64> = MatchField::new(MatchFields::Metadata);
pub const ETH_DST: MatchField<MacAddr> = MatchField::new(MatchFields::EthDst);
pub const ETH_SRC: MatchField<MacAddr> = MatchField::new(MatchFields::EthSrc);
pub const ETH_TYPE: MatchField<EthType> = MatchField::new(MatchFields::EthType);
pub const VLAN_VID: MatchField<VlanVid> = MatchField::new(MatchFields::VlanVid);
pub const VLAN_PCP: MatchField<VlanPcp> = MatchField::new(MatchFields::VlanPcp);
pub const IP_DSCP: MatchField<IpDscp> = MatchField::new(MatchFields::IpDscp);
pub const IP_ECN: MatchField<IpEcn> = MatchField::new(MatchFields::IpEcn);
pub const IP_PROTO: MatchField<Protocol> =
    MatchField::new(MatchFields::IpProto);
pub const IPV4_SRC: MatchField<Ipv4Addr> =
    MatchField::new(MatchFields::Ipv4Src);
pub const IPV4_DST: MatchField<Ipv4Addr> =
    MatchField::new(MatchFields::Ipv4Dst);
pub const TCP_SRC: MatchField<TransportPort> =
    MatchField::new(MatchFields::TcpSrc);
pub const TCP_DST: MatchField<TransportPort> =
    MatchField::new(MatchFields::TcpDst);
pub const UDP_SRC: MatchField<TransportPort> =
    MatchField::new(MatchFields::UdpSrc);
pub const UDP_DST: MatchField<TransportPort> =
    MatchField::new(MatchFields::UdpDst);
pub const ICMPV4_TYPE: MatchField<IcmpType> =
    MatchField::new(MatchFields::Icmpv4Type);
pub const ICMPV4_CODE: MatchField<IcmpCode> =
    MatchField::new(MatchFields::Icmpv4Code);
pub const ARP_OP: MatchField<ArpOpcode> = MatchField::new(MatchFields::ArpOp);
pub const ARP_SPA: MatchField<Ipv4Addr> = MatchField::new(MatchFields::ArpSpa);
pub const ARP_TPA: MatchField<Ipv4Addr> = MatchField::new(MatchFields::ArpTpa);
pub const ARP_SHA: MatchField<MacAddr> = MatchField::new(MatchFields::ArpSha);
pub const ARP_THA: MatchField<MacAddr> = MatchField::new(MatchFields::ArpTha);
pub const IPV6_SRC: MatchField<Ipv6Addr> =
    MatchField::new(MatchFields::Ipv6Src);
pub const IPV6_DST: MatchField<Ipv6Addr> =
    MatchField::new(MatchFields::Ipv6Dst);
pub const TUNNEL_ID: MatchField<U64> = MatchField::new(MatchFields::TunnelId);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spec_table_matches_declaration_order() {
        for (i, field) in MatchFields::ALL.iter().enumerate() {
            assert_eq!(*field as usize, i);
            assert_eq!(field.spec().id, *field);
        }
    }

    #[test]
    fn catalogue_lengths() {
        assert_eq!(MatchFields::EthDst.wire_len(), 6);
        assert_eq!(MatchFields::EthType.wire_len(), 2);
        assert_eq!(MatchFields::Ipv6Src.wire_len(), 16);
        assert_eq!(MatchFields::TunnelId.wire_len(), 8);
    }

    #[test]
    fn prerequisite_dag_is_acyclic() {
        // Walk every field's prerequisite chain; the catalogue is
        // tiny, so a depth bound doubles as a cycle check.
        fn walk(field: MatchFields, depth: usize) {
            assert!(depth < MatchFields::COUNT, "prerequisite cycle");
            for p in field.prerequisites() {
                walk(p.field, depth + 1);
            }
        }

        for field in MatchFields::ALL {
            walk(field, 0);
        }
    }

    #[test]
    fn range_checks_are_wired_up() {
        let dscp = MatchFields::IpDscp.spec();
        assert!((dscp.check)(0x3F).is_ok());
        assert!((dscp.check)(0x40).is_err());

        let vid = MatchFields::VlanVid.spec();
        assert!((vid.check)(0x1FFF).is_ok());
        assert!((vid.check)(0x2000).is_err());
    }
}
