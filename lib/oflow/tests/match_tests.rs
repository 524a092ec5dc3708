// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! End-to-end exercises of the match facade across wire versions.

use oflow::field;
use oflow::field::MatchFields;
use oflow::flow_match::Match;
use oflow::flow_match::MatchError;
use oflow::unparsed::LogUnparsed;
use oflow::unparsed::ReaderContext;
use oflow::version::OfVersion;
use oflow::wire::WireReader;
use oflow::wire::WireWriter;
use oflow_api::EthType;
use oflow_api::Ipv4Addr;
use oflow_api::MacAddr;
use oflow_api::Protocol;
use oflow_api::TransportPort;

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

#[test]
fn prerequisites_not_met() {
    // The entry for ipv4_src is physically stored, but its ethertype
    // prerequisite fails, so every read treats it as absent.
    for version in [OfVersion::Of10, OfVersion::Of13, OfVersion::Of14] {
        let mut bldr = Match::builder(version);
        bldr.set_exact(&field::ETH_TYPE, EthType::IPV6).unwrap();
        bldr.set_exact(&field::IPV4_SRC, ip("1.2.3.4")).unwrap();
        let m = bldr.build();

        assert_eq!(m.get(&field::ETH_TYPE).unwrap(), Some(EthType::IPV6));
        assert!(m.is_exact(&field::ETH_TYPE).unwrap());
        assert!(!m.is_partially_masked(&field::ETH_TYPE).unwrap());
        assert!(!m.is_fully_wildcarded(&field::ETH_TYPE).unwrap());

        assert_eq!(m.get(&field::IPV4_SRC).unwrap(), None);
        assert!(!m.is_exact(&field::IPV4_SRC).unwrap());
        assert!(!m.is_partially_masked(&field::IPV4_SRC).unwrap());
        assert!(m.is_fully_wildcarded(&field::IPV4_SRC).unwrap());

        let fields: Vec<MatchFields> = m.match_fields().collect();
        assert_eq!(fields, vec![MatchFields::EthType], "version {version}");
    }
}

#[test]
fn prerequisites_met() {
    for version in [OfVersion::Of10, OfVersion::Of13, OfVersion::Of14] {
        let mut bldr = Match::builder(version);
        bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
        bldr.set_exact(&field::IPV4_SRC, ip("1.2.3.4")).unwrap();
        let m = bldr.build();

        assert_eq!(m.get(&field::IPV4_SRC).unwrap(), Some(ip("1.2.3.4")));
        assert!(m.is_exact(&field::IPV4_SRC).unwrap());
        assert!(!m.is_fully_wildcarded(&field::IPV4_SRC).unwrap());

        let fields: Vec<MatchFields> = m.match_fields().collect();
        assert_eq!(
            fields,
            vec![MatchFields::EthType, MatchFields::Ipv4Src],
            "version {version}"
        );
    }
}

#[test]
fn prerequisites_chain_recursively() {
    // tcp_src needs ip_proto == TCP, which itself needs an IP
    // ethertype. Without the ethertype the whole chain is invisible.
    let mut bldr = Match::builder(OfVersion::Of13);
    bldr.set_exact(&field::IP_PROTO, Protocol::TCP).unwrap();
    bldr.set_exact(&field::TCP_SRC, TransportPort::of(80)).unwrap();

    let m = bldr.build();
    assert_eq!(m.get(&field::TCP_SRC).unwrap(), None);
    assert_eq!(m.get(&field::IP_PROTO).unwrap(), None);
    assert_eq!(m.match_fields().count(), 0);

    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    let m = bldr.build();
    assert_eq!(m.get(&field::TCP_SRC).unwrap(), Some(TransportPort::of(80)));
    let fields: Vec<MatchFields> = m.match_fields().collect();
    assert_eq!(
        fields,
        vec![MatchFields::EthType, MatchFields::IpProto, MatchFields::TcpSrc]
    );
}

#[test]
fn mask_canonicalization_through_the_facade() {
    let mut bldr = Match::builder(OfVersion::Of13);
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();

    // Match-everything mask: stored as an exact entry.
    bldr.set_masked(&field::IPV4_SRC, ip("1.2.3.4"), ip("255.255.255.255"))
        .unwrap();
    let m = bldr.build();
    assert!(m.is_exact(&field::IPV4_SRC).unwrap());
    assert!(!m.is_partially_masked(&field::IPV4_SRC).unwrap());
    assert_eq!(m.get_masked(&field::IPV4_SRC).unwrap(), None);

    // Match-nothing mask: the field vanishes.
    bldr.set_masked(&field::IPV4_SRC, ip("1.2.3.4"), ip("0.0.0.0")).unwrap();
    let m = bldr.build();
    assert!(m.is_fully_wildcarded(&field::IPV4_SRC).unwrap());
    assert!(!m.match_fields().any(|f| f == MatchFields::Ipv4Src));

    // A proper partial mask: visible through get and get_masked, and
    // the value is pre-masked.
    bldr.set_masked(&field::IPV4_SRC, ip("1.2.3.4"), ip("255.255.0.0"))
        .unwrap();
    let m = bldr.build();
    assert!(m.is_partially_masked(&field::IPV4_SRC).unwrap());
    assert_eq!(m.get(&field::IPV4_SRC).unwrap(), Some(ip("1.2.0.0")));
    let masked = m.get_masked(&field::IPV4_SRC).unwrap().unwrap();
    assert_eq!(masked.value(), ip("1.2.0.0"));
    assert_eq!(masked.mask(), ip("255.255.0.0"));
}

#[test]
fn legacy_cidr_masks() {
    let mut bldr = Match::builder(OfVersion::Of10);
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    bldr.set_masked(&field::IPV4_DST, ip("10.9.0.0"), ip("255.255.0.0"))
        .unwrap();
    let m = bldr.build();

    assert!(m.is_partially_masked(&field::IPV4_DST).unwrap());
    let masked = m.get_masked(&field::IPV4_DST).unwrap().unwrap();
    assert_eq!(masked.mask(), ip("255.255.0.0"));

    // The legacy bitmap cannot hold a non-contiguous mask.
    assert_eq!(
        bldr.set_masked(&field::IPV4_DST, ip("10.9.0.0"), ip("255.0.255.0"))
            .unwrap_err(),
        MatchError::NonCidrMask
    );
}

#[test]
fn unsupported_field_is_a_distinct_error() {
    let m = Match::builder(OfVersion::Of10).build();
    assert_eq!(
        m.get(&field::TUNNEL_ID).unwrap_err(),
        MatchError::UnsupportedField {
            field: "tunnel_id",
            version: OfVersion::Of10
        }
    );

    // 1.2 predates the tunnel id OXM; 1.3 speaks it.
    let m = Match::builder(OfVersion::Of12).build();
    assert!(m.get(&field::TUNNEL_ID).is_err());
    let m = Match::builder(OfVersion::Of13).build();
    assert_eq!(m.get(&field::TUNNEL_ID).unwrap(), None);

    // Masked matching on an unmaskable field is its own mismatch.
    let mut bldr = Match::builder(OfVersion::Of13);
    assert_eq!(
        bldr.set_masked(&field::ETH_TYPE, EthType::IPV4, EthType::of(0xFF00))
            .unwrap_err(),
        MatchError::UnsupportedMask {
            field: "eth_type",
            version: OfVersion::Of13
        }
    );
}

#[test]
fn builder_copy_on_write() {
    let mut bldr = Match::builder(OfVersion::Of13);
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    bldr.set_exact(&field::IPV4_SRC, ip("1.2.3.4")).unwrap();
    let parent = bldr.build();

    // Untouched derived builder reads fall through to the parent.
    let derived = parent.to_builder();
    assert_eq!(derived.get(&field::IPV4_SRC).unwrap(), Some(ip("1.2.3.4")));

    // Mutating the derived builder never reaches the parent.
    let mut derived = parent.to_builder();
    derived.set_exact(&field::IPV4_SRC, ip("5.6.7.8")).unwrap();
    derived.wildcard(&field::ETH_TYPE).unwrap();
    let child = derived.build();

    assert_eq!(parent.get(&field::IPV4_SRC).unwrap(), Some(ip("1.2.3.4")));
    assert_eq!(parent.get(&field::ETH_TYPE).unwrap(), Some(EthType::IPV4));
    // In the child the ethertype is gone, so ipv4_src went invisible
    // with it.
    assert_eq!(child.get(&field::ETH_TYPE).unwrap(), None);
    assert_eq!(child.get(&field::IPV4_SRC).unwrap(), None);
}

#[test]
fn builder_snapshots_are_independent() {
    let mut bldr = Match::builder(OfVersion::Of13);
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    let before = bldr.build();

    bldr.set_exact(&field::ETH_TYPE, EthType::ARP).unwrap();
    let after = bldr.build();

    assert_eq!(before.get(&field::ETH_TYPE).unwrap(), Some(EthType::IPV4));
    assert_eq!(after.get(&field::ETH_TYPE).unwrap(), Some(EthType::ARP));
}

#[test]
fn legacy_normalization_on_build() {
    // Ethertype left wildcarded while ip_proto and a port are set:
    // the build forces the dependent sub-fields to don't-care.
    let mut bldr = Match::builder(OfVersion::Of10);
    bldr.set_exact(&field::IP_PROTO, Protocol::TCP).unwrap();
    bldr.set_exact(&field::TCP_DST, TransportPort::of(80)).unwrap();
    let m = bldr.build();

    assert!(m.is_fully_wildcarded(&field::IP_PROTO).unwrap());
    assert!(m.is_fully_wildcarded(&field::TCP_DST).unwrap());
    assert_eq!(m.match_fields().count(), 0);

    // The same setters under an IPv4 ethertype survive the build.
    let mut bldr = Match::builder(OfVersion::Of10);
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    bldr.set_exact(&field::IP_PROTO, Protocol::TCP).unwrap();
    bldr.set_exact(&field::TCP_DST, TransportPort::of(80)).unwrap();
    let m = bldr.build();

    assert_eq!(m.get(&field::TCP_DST).unwrap(), Some(TransportPort::of(80)));
    assert!(m.is_exact(&field::TCP_DST).unwrap());
}

#[test]
fn oxm_wire_round_trip() {
    let mut bldr = Match::builder(OfVersion::Of13);
    bldr.set_exact(&field::IN_PORT, oflow_api::PortNo::of(7)).unwrap();
    bldr.set_exact(&field::ETH_SRC, "A8:40:25:00:00:63".parse::<MacAddr>().unwrap())
        .unwrap();
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    bldr.set_masked(&field::IPV4_DST, ip("10.0.0.0"), ip("255.0.0.0")).unwrap();
    let m = bldr.build();

    let mut buf = Vec::new();
    let mut wtr = WireWriter::new(&mut buf);
    m.write(&mut wtr).unwrap();

    let mut rdr = WireReader::new(&buf);
    let decoded = Match::read(
        &ReaderContext::DEFAULT,
        OfVersion::Of13,
        &mut rdr,
        buf.len(),
    )
    .unwrap();
    assert_eq!(decoded, m);
    assert_eq!(rdr.remaining(), 0);
}

#[test]
fn legacy_wire_round_trip() {
    let mut bldr = Match::builder(OfVersion::Of10);
    bldr.set_exact(&field::IN_PORT, oflow_api::PortNo::of(3)).unwrap();
    bldr.set_exact(&field::ETH_TYPE, EthType::IPV4).unwrap();
    bldr.set_exact(&field::IP_PROTO, Protocol::UDP).unwrap();
    bldr.set_exact(&field::UDP_DST, TransportPort::of(53)).unwrap();
    bldr.set_masked(&field::IPV4_SRC, ip("192.168.0.0"), ip("255.255.0.0"))
        .unwrap();
    let m = bldr.build();

    let mut buf = Vec::new();
    let mut wtr = WireWriter::new(&mut buf);
    m.write(&mut wtr).unwrap();
    assert_eq!(buf.len(), 40);

    let mut rdr = WireReader::new(&buf);
    let decoded =
        Match::read(&ReaderContext::DEFAULT, OfVersion::Of10, &mut rdr, 40)
            .unwrap();
    assert_eq!(decoded, m);

    assert_eq!(decoded.get(&field::UDP_DST).unwrap(), Some(TransportPort::of(53)));
    // The TCP view of the same storage stays invisible: its protocol
    // prerequisite does not hold.
    assert_eq!(decoded.get(&field::TCP_DST).unwrap(), None);
}

#[test]
fn unknown_tlv_skipped_at_the_match_level() {
    // One experimenter TLV (8 payload bytes), then eth_type.
    #[rustfmt::skip]
    let buf = vec![
        0xFF, 0xFF, 0x24, 0x08, 0, 1, 2, 3, 4, 5, 6, 7,
        0x80, 0x00, 0x0A, 0x02, 0x08, 0x00,
    ];

    let mut rdr = WireReader::new(&buf);
    let res = Match::read(
        &ReaderContext::DEFAULT,
        OfVersion::Of13,
        &mut rdr,
        buf.len(),
    );
    assert!(res.is_err());

    let handler = LogUnparsed::new(slog::Logger::root(slog::Discard, slog::o!()));
    let ctx = ReaderContext::new(&handler);
    let mut rdr = WireReader::new(&buf);
    let m = Match::read(&ctx, OfVersion::Of13, &mut rdr, buf.len()).unwrap();
    assert_eq!(m.get(&field::ETH_TYPE).unwrap(), Some(EthType::IPV4));
    assert_eq!(m.match_fields().count(), 1);
}
