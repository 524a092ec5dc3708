// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The OXM TLV encoding: one self-describing element per match field.
//!
//! Wire layout per entry: a 16-bit class, 7 bits of field number plus
//! a has-mask bit, one length byte, then `length` bytes of payload
//! (value, then an equal-length mask when the bit is set). The tag is
//! codec detail only; logical identity is the catalogue field id.

use crate::OflowError;
use crate::field::MatchField;
use crate::field::MatchFields;
use crate::unparsed::ReaderContext;
use crate::version::OfVersion;
use crate::wire::WireReader;
use crate::wire::WireWriter;
use core::fmt;
use core::fmt::Display;
use oflow_api::WireValue;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// The class every field in the distilled catalogue lives in.
pub const OXM_CLASS_OPENFLOW_BASIC: u16 = 0x8000;

/// Bytes in an OXM TLV header.
pub const OXM_HDR_SZ: usize = 4;

/// The per-version wire tag of a field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OxmTag {
    pub class: u16,
    pub number: u8,
    pub maskable: bool,
}

const fn basic(number: u8, maskable: bool) -> Option<OxmTag> {
    Some(OxmTag { class: OXM_CLASS_OPENFLOW_BASIC, number, maskable })
}

/// Look up the wire tag a field uses under `version`, or `None` when
/// the version cannot represent it.
///
/// The same logical field may use a different tag per version; within
/// the distilled catalogue only availability varies.
pub fn oxm_tag(version: OfVersion, field: MatchFields) -> Option<OxmTag> {
    if !version.uses_oxm() {
        return None;
    }

    match field {
        MatchFields::InPort => basic(0, false),
        MatchFields::InPhyPort => basic(1, false),
        MatchFields::Metadata => basic(2, true),
        MatchFields::EthDst => basic(3, true),
        MatchFields::EthSrc => basic(4, true),
        MatchFields::EthType => basic(5, false),
        MatchFields::VlanVid => basic(6, true),
        MatchFields::VlanPcp => basic(7, false),
        MatchFields::IpDscp => basic(8, false),
        MatchFields::IpEcn => basic(9, false),
        MatchFields::IpProto => basic(10, false),
        MatchFields::Ipv4Src => basic(11, true),
        MatchFields::Ipv4Dst => basic(12, true),
        MatchFields::TcpSrc => basic(13, false),
        MatchFields::TcpDst => basic(14, false),
        MatchFields::UdpSrc => basic(15, false),
        MatchFields::UdpDst => basic(16, false),
        MatchFields::Icmpv4Type => basic(19, false),
        MatchFields::Icmpv4Code => basic(20, false),
        MatchFields::ArpOp => basic(21, false),
        MatchFields::ArpSpa => basic(22, true),
        MatchFields::ArpTpa => basic(23, true),
        MatchFields::ArpSha => basic(24, true),
        MatchFields::ArpTha => basic(25, true),
        MatchFields::Ipv6Src => basic(26, true),
        MatchFields::Ipv6Dst => basic(27, true),

        // The tunnel id OXM was minted in 1.3.
        MatchFields::TunnelId => {
            if version >= OfVersion::Of13 {
                basic(38, true)
            } else {
                None
            }
        }
    }
}

/// Reverse tag lookup for the decoder.
fn field_for_tag(
    version: OfVersion,
    class: u16,
    number: u8,
) -> Option<MatchFields> {
    MatchFields::ALL.into_iter().find(|f| {
        oxm_tag(version, *f)
            .is_some_and(|t| t.class == class && t.number == number)
    })
}

/// The all-ones mask for a field width.
pub(crate) fn full_raw(wire_len: usize) -> u128 {
    u128::MAX >> (128 - 8 * wire_len)
}

/// One field's value (optionally masked), tagged for the TLV wire.
///
/// Stored raw and pre-validated; the typed view is recovered through
/// the catalogue handle in the match facade.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
pub struct OxmEntry {
    field: MatchFields,
    value: u128,
    mask: Option<u128>,
}

impl OxmEntry {
    /// An exact-match entry.
    pub fn exact<V: WireValue>(field: &MatchField<V>, value: V) -> Self {
        Self { field: field.id, value: value.to_raw(), mask: None }
    }

    /// A masked entry, normalized: the value is AND-ed with the mask
    /// and a match-everything mask is dropped entirely.
    pub fn masked<V: WireValue>(
        field: &MatchField<V>,
        value: V,
        mask: V,
    ) -> Self {
        Self::from_raw_parts(field.id, value.to_raw(), Some(mask.to_raw()))
    }

    pub(crate) fn from_raw_parts(
        field: MatchFields,
        value: u128,
        mask: Option<u128>,
    ) -> Self {
        let mask = match mask {
            Some(m) if m == full_raw(field.wire_len()) => None,
            other => other,
        };
        let value = match mask {
            Some(m) => value & m,
            None => value,
        };
        Self { field, value, mask }
    }

    pub fn field(&self) -> MatchFields {
        self.field
    }

    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// An entry whose mask selects nothing matches nothing; the list
    /// builder drops such entries instead of storing them.
    pub(crate) fn matches_nothing(&self) -> bool {
        self.mask == Some(0)
    }

    pub(crate) fn raw_value(&self) -> u128 {
        self.value
    }

    pub(crate) fn raw_mask(&self) -> Option<u128> {
        self.mask
    }
}

impl Display for OxmEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mask {
            Some(m) => {
                write!(f, "{}={:#x}/{:#x}", self.field, self.value, m)
            }
            None => write!(f, "{}={:#x}", self.field, self.value),
        }
    }
}

/// An immutable set of OXM entries, at most one per field, iterated
/// in catalogue declaration order regardless of insertion order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct OxmList {
    entries: BTreeMap<MatchFields, OxmEntry>,
}

impl OxmList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> OxmListBuilder {
        OxmListBuilder::default()
    }

    pub fn get(&self, field: MatchFields) -> Option<&OxmEntry> {
        self.entries.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OxmEntry> {
        self.entries.values()
    }

    pub fn fields(&self) -> impl Iterator<Item = MatchFields> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_builder(&self) -> OxmListBuilder {
        OxmListBuilder { entries: self.entries.clone() }
    }

    // Crate-internal mutation for the match builder's private copy;
    // the public surface of a published list stays immutable. Same
    // canonicalization as the list builder.
    pub(crate) fn set_entry(&mut self, entry: OxmEntry) {
        if entry.matches_nothing() {
            self.entries.remove(&entry.field());
            return;
        }
        self.entries.insert(entry.field(), entry);
    }

    pub(crate) fn unset_entry(&mut self, field: MatchFields) {
        self.entries.remove(&field);
    }
}

/// The mutable side of [`OxmList`].
///
/// `build()` snapshots; the builder stays usable and later mutations
/// never reach an already-built list.
#[derive(Clone, Debug, Default)]
pub struct OxmListBuilder {
    entries: BTreeMap<MatchFields, OxmEntry>,
}

impl OxmListBuilder {
    /// Store an entry, canonicalizing on the way in: a mask that
    /// matches nothing removes the field instead of storing a
    /// can-never-match entry.
    pub fn set(&mut self, entry: OxmEntry) {
        if entry.matches_nothing() {
            self.entries.remove(&entry.field());
            return;
        }
        self.entries.insert(entry.field(), entry);
    }

    pub fn unset(&mut self, field: MatchFields) {
        self.entries.remove(&field);
    }

    pub fn get(&self, field: MatchFields) -> Option<&OxmEntry> {
        self.entries.get(&field)
    }

    pub fn build(&self) -> OxmList {
        OxmList { entries: self.entries.clone() }
    }
}

/// Decode `len` bytes of TLVs into a list.
///
/// An unrecognized tag does not fail the decode outright: the
/// unparsed handler in `ctx` decides, and on "continue" the cursor is
/// advanced exactly past the element's declared length so the next
/// element parses cleanly. Truncation and length mismatches on known
/// fields are always fatal.
pub(crate) fn read_oxm_list(
    ctx: &ReaderContext,
    version: OfVersion,
    rdr: &mut WireReader,
    len: usize,
) -> Result<OxmList, OflowError> {
    if len > rdr.remaining() {
        return Err(OflowError::BadLength { what: "oxm list", len });
    }
    let end = rdr.pos() + len;
    let mut bldr = OxmList::builder();

    while rdr.pos() < end {
        if end - rdr.pos() < OXM_HDR_SZ {
            return Err(OflowError::BadLength {
                what: "oxm header",
                len: end - rdr.pos(),
            });
        }

        let class = rdr.read_u16()?;
        let type_len = rdr.read_u8()?;
        let number = type_len >> 1;
        let has_mask = type_len & 0x1 != 0;
        let length = usize::from(rdr.read_u8()?);

        if length > end - rdr.pos() {
            return Err(OflowError::BadLength { what: "oxm entry", len: length });
        }

        // A tag is only known if the mask bit agrees with what the
        // catalogue says the field supports; a masked rendition of an
        // unmaskable field is just another unknown element.
        let known = field_for_tag(version, class, number).filter(|f| {
            !has_mask
                || oxm_tag(version, *f).is_some_and(|t| t.maskable)
        });

        let Some(field) = known else {
            let header = (u64::from(class) << 16)
                | (u64::from(type_len) << 8)
                | length as u64;
            ctx.unparsed_handler().unparsed("OFOxm", "typeLen", header)?;
            rdr.seek(length)?;
            continue;
        };

        let spec = field.spec();
        let expected = spec.wire_len * if has_mask { 2 } else { 1 };
        if length != expected {
            return Err(OflowError::BadLength { what: spec.name, len: length });
        }

        let value = raw_from_slice(rdr.slice(spec.wire_len)?);
        (spec.check)(value)?;
        let mask = if has_mask {
            Some(raw_from_slice(rdr.slice(spec.wire_len)?))
        } else {
            None
        };

        bldr.set(OxmEntry::from_raw_parts(field, value, mask));
    }

    Ok(bldr.build())
}

/// Encode a list, one TLV per entry, in catalogue order.
pub(crate) fn write_oxm_list(
    version: OfVersion,
    list: &OxmList,
    wtr: &mut WireWriter,
) -> Result<(), OflowError> {
    for entry in list.iter() {
        write_oxm_entry(version, entry, wtr)?;
    }
    Ok(())
}

fn write_oxm_entry(
    version: OfVersion,
    entry: &OxmEntry,
    wtr: &mut WireWriter,
) -> Result<(), OflowError> {
    let field = entry.field();
    let spec = field.spec();
    let tag = oxm_tag(version, field).ok_or(OflowError::UnsupportedField {
        field: spec.name,
        version,
    })?;

    if entry.is_masked() && !tag.maskable {
        return Err(OflowError::UnsupportedField { field: spec.name, version });
    }

    let has_mask = entry.is_masked();
    let payload = spec.wire_len * if has_mask { 2 } else { 1 };

    wtr.put_u16(tag.class);
    wtr.put_u8(tag.number << 1 | u8::from(has_mask));
    wtr.put_u8(payload as u8);
    put_raw(wtr, entry.raw_value(), spec.wire_len);
    if let Some(mask) = entry.raw_mask() {
        put_raw(wtr, mask, spec.wire_len);
    }

    Ok(())
}

fn raw_from_slice(src: &[u8]) -> u128 {
    let mut raw = 0u128;
    for b in src {
        raw = (raw << 8) | u128::from(*b);
    }
    raw
}

fn put_raw(wtr: &mut WireWriter, raw: u128, len: usize) {
    for i in (0..len).rev() {
        wtr.put_u8((raw >> (8 * i)) as u8);
    }
}
