// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The version-polymorphic match facade.
//!
//! A [`Match`] is backed by the 1.0 bitmask struct or an OXM list
//! depending on its version; the get/exact/wildcard contract is
//! implemented once over that tagged union. Prerequisites are
//! evaluated fresh on every read -- a builder can change the
//! prerequisite field between two calls, and the answer must track
//! the current state.

use crate::OflowError;
use crate::field::MatchField;
use crate::field::MatchFields;
use crate::field::Prerequisite;
use crate::masked::Masked;
use crate::match_v1;
use crate::match_v1::MATCH_V1_SZ;
use crate::match_v1::MatchV1;
use crate::oxm;
use crate::oxm::OxmEntry;
use crate::oxm::OxmList;
use crate::unparsed::ReaderContext;
use crate::version::OfVersion;
use crate::wire::WireReader;
use crate::wire::WireWriter;
use core::fmt;
use core::fmt::Display;
use oflow_api::WireValue;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// A capability mismatch between a field access and the match's wire
/// version. Distinct from "absent": asking for a field the version
/// cannot even represent is a programmer error, not protocol
/// content.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum MatchError {
    #[error("field {field} not representable in version {version}")]
    UnsupportedField { field: &'static str, version: OfVersion },

    #[error("masked matching on {field} not representable in version {version}")]
    UnsupportedMask { field: &'static str, version: OfVersion },

    #[error("mask has no CIDR prefix form")]
    NonCidrMask,
}

/// The two wire shapes a match can take.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MatchRepr {
    Legacy(MatchV1),
    Oxm(OxmList),
}

impl MatchRepr {
    fn raw_get(&self, field: MatchFields) -> Option<u128> {
        match self {
            Self::Legacy(m) => m.raw_get(field),
            Self::Oxm(list) => list.get(field).map(|e| e.raw_value()),
        }
    }

    fn raw_masked(&self, field: MatchFields) -> Option<(u128, u128)> {
        match self {
            Self::Legacy(m) => m.raw_masked(field),
            Self::Oxm(list) => list
                .get(field)
                .and_then(|e| e.raw_mask().map(|m| (e.raw_value(), m))),
        }
    }

    fn entry_exact(&self, field: MatchFields) -> bool {
        match self {
            Self::Legacy(m) => m.is_exact_field(field),
            Self::Oxm(list) => {
                list.get(field).is_some_and(|e| !e.is_masked())
            }
        }
    }

    fn entry_wild(&self, field: MatchFields) -> bool {
        match self {
            Self::Legacy(m) => m.is_wild_field(field),
            Self::Oxm(list) => list.get(field).is_none(),
        }
    }

    fn entry_partial(&self, field: MatchFields) -> bool {
        match self {
            Self::Legacy(m) => m.is_partial_field(field),
            Self::Oxm(list) => list.get(field).is_some_and(|e| e.is_masked()),
        }
    }
}

/// Static per-version capability lookup; independent of any match
/// content.
pub fn version_supports(version: OfVersion, field: MatchFields) -> bool {
    if version.uses_oxm() {
        oxm::oxm_tag(version, field).is_some()
    } else {
        match_v1::supports_field(field)
    }
}

pub fn version_supports_masked(version: OfVersion, field: MatchFields) -> bool {
    if version.uses_oxm() {
        oxm::oxm_tag(version, field).is_some_and(|t| t.maskable)
    } else {
        match_v1::supports_masked_field(field)
    }
}

fn ensure_supported(
    version: OfVersion,
    field: MatchFields,
) -> Result<(), MatchError> {
    if version_supports(version, field) {
        Ok(())
    } else {
        Err(MatchError::UnsupportedField { field: field.name(), version })
    }
}

fn ensure_supports_masked(
    version: OfVersion,
    field: MatchFields,
) -> Result<(), MatchError> {
    ensure_supported(version, field)?;
    if version_supports_masked(version, field) {
        Ok(())
    } else {
        Err(MatchError::UnsupportedMask { field: field.name(), version })
    }
}

// Prerequisite evaluation. A prerequisite references another field,
// whose own prerequisites must hold in turn for it to count as
// present; the catalogue guarantees the walk is a DAG. No result is
// cached anywhere.

fn prereq_satisfied(repr: &MatchRepr, p: &Prerequisite) -> bool {
    match visible_raw(repr, p.field) {
        None => false,
        Some(raw) => p.allowed.is_empty() || p.allowed.contains(&raw),
    }
}

fn prereqs_ok(repr: &MatchRepr, field: MatchFields) -> bool {
    field.prerequisites().iter().all(|p| prereq_satisfied(repr, p))
}

fn visible_raw(repr: &MatchRepr, field: MatchFields) -> Option<u128> {
    let raw = repr.raw_get(field)?;
    if prereqs_ok(repr, field) { Some(raw) } else { None }
}

// The facade truth tables, written once and shared by Match and
// MatchBuilder. Prerequisite failure reads as fully wildcarded, by
// design -- speculative access on a half-built match is always safe.

fn get_impl<V: WireValue>(
    version: OfVersion,
    repr: &MatchRepr,
    f: &MatchField<V>,
) -> Result<Option<V>, MatchError> {
    ensure_supported(version, f.id)?;
    match visible_raw(repr, f.id) {
        Some(raw) => Ok(Some(V::from_raw(raw))),
        None => Ok(None),
    }
}

fn get_masked_impl<V: WireValue>(
    version: OfVersion,
    repr: &MatchRepr,
    f: &MatchField<V>,
) -> Result<Option<Masked<V>>, MatchError> {
    ensure_supports_masked(version, f.id)?;
    if !prereqs_ok(repr, f.id) {
        return Ok(None);
    }
    Ok(repr
        .raw_masked(f.id)
        .map(|(v, m)| Masked::of(V::from_raw(v), V::from_raw(m))))
}

fn is_exact_impl(
    version: OfVersion,
    repr: &MatchRepr,
    field: MatchFields,
) -> Result<bool, MatchError> {
    ensure_supported(version, field)?;
    Ok(prereqs_ok(repr, field) && repr.entry_exact(field))
}

fn is_wild_impl(
    version: OfVersion,
    repr: &MatchRepr,
    field: MatchFields,
) -> Result<bool, MatchError> {
    ensure_supported(version, field)?;
    Ok(!prereqs_ok(repr, field) || repr.entry_wild(field))
}

fn is_partial_impl(
    version: OfVersion,
    repr: &MatchRepr,
    field: MatchFields,
) -> Result<bool, MatchError> {
    ensure_supported(version, field)?;
    Ok(prereqs_ok(repr, field) && repr.entry_partial(field))
}

/// An immutable match over a specific wire version.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Match {
    version: OfVersion,
    repr: MatchRepr,
}

impl Match {
    /// An empty builder for `version`: everything wildcarded.
    pub fn builder(version: OfVersion) -> MatchBuilder<'static> {
        let repr = if version.uses_oxm() {
            MatchRepr::Oxm(OxmList::new())
        } else {
            MatchRepr::Legacy(MatchV1::default())
        };
        MatchBuilder { version, parent: None, overlay: Some(repr) }
    }

    /// A builder seeded from this match. The parent is only copied
    /// on the builder's first mutation; until then reads fall
    /// through.
    pub fn to_builder(&self) -> MatchBuilder<'_> {
        MatchBuilder { version: self.version, parent: Some(&self.repr), overlay: None }
    }

    pub fn version(&self) -> OfVersion {
        self.version
    }

    /// Can this match's version represent `field` at all?
    pub fn supports<V: WireValue>(&self, f: &MatchField<V>) -> bool {
        version_supports(self.version, f.id)
    }

    pub fn supports_masked<V: WireValue>(&self, f: &MatchField<V>) -> bool {
        version_supports_masked(self.version, f.id)
    }

    /// The field's value, or `None` when the field is absent or its
    /// prerequisites do not currently hold.
    pub fn get<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<Option<V>, MatchError> {
        get_impl(self.version, &self.repr, f)
    }

    /// The value/mask pair; `Some` only when partially masked.
    pub fn get_masked<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<Option<Masked<V>>, MatchError> {
        get_masked_impl(self.version, &self.repr, f)
    }

    pub fn is_exact<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_exact_impl(self.version, &self.repr, f.id)
    }

    pub fn is_fully_wildcarded<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_wild_impl(self.version, &self.repr, f.id)
    }

    pub fn is_partially_masked<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_partial_impl(self.version, &self.repr, f.id)
    }

    /// The populated fields whose prerequisites currently hold, in
    /// catalogue order. Evaluated lazily and freshly per call.
    pub fn match_fields(&self) -> impl Iterator<Item = MatchFields> + '_ {
        MatchFields::ALL.into_iter().filter(move |f| {
            version_supports(self.version, *f)
                && self.repr.raw_get(*f).is_some()
                && prereqs_ok(&self.repr, *f)
        })
    }

    /// Decode a match body of `len` bytes. This and [`Self::write`]
    /// are the only entry points the message layer uses.
    pub fn read(
        ctx: &ReaderContext,
        version: OfVersion,
        rdr: &mut WireReader,
        len: usize,
    ) -> Result<Self, OflowError> {
        let repr = if version.uses_oxm() {
            MatchRepr::Oxm(oxm::read_oxm_list(ctx, version, rdr, len)?)
        } else {
            if len != MATCH_V1_SZ {
                return Err(OflowError::BadLength { what: "match", len });
            }
            MatchRepr::Legacy(MatchV1::parse(rdr)?)
        };
        Ok(Self { version, repr })
    }

    pub fn write(&self, wtr: &mut WireWriter) -> Result<(), OflowError> {
        match &self.repr {
            MatchRepr::Legacy(m) => {
                m.emit(wtr);
                Ok(())
            }
            MatchRepr::Oxm(list) => {
                oxm::write_oxm_list(self.version, list, wtr)
            }
        }
    }
}

impl Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "match[{}](", self.version)?;
        let mut first = true;
        for field in self.match_fields() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match self.repr.raw_masked(field) {
                Some((v, m)) => {
                    write!(f, "{field}={v:#x}/{m:#x}")?;
                }
                None => {
                    let v = self.repr.raw_get(field).unwrap_or(0);
                    write!(f, "{field}={v:#x}")?;
                }
            }
        }
        write!(f, ")")
    }
}

/// A mutable match under construction.
///
/// Derived builders share the parent's state copy-on-write: the
/// parent is never mutated, and nothing is cloned until the first
/// `set`/`wildcard` on this builder instance.
#[derive(Clone, Debug)]
pub struct MatchBuilder<'p> {
    version: OfVersion,
    parent: Option<&'p MatchRepr>,
    overlay: Option<MatchRepr>,
}

impl<'p> MatchBuilder<'p> {
    pub fn version(&self) -> OfVersion {
        self.version
    }

    fn effective(&self) -> &MatchRepr {
        match (&self.overlay, self.parent) {
            (Some(repr), _) => repr,
            (None, Some(repr)) => repr,
            (None, None) => unreachable!("builder with no backing repr"),
        }
    }

    fn effective_mut(&mut self) -> &mut MatchRepr {
        if self.overlay.is_none() {
            let parent = self.parent.expect("builder with no backing repr");
            self.overlay = Some(parent.clone());
        }
        self.overlay.as_mut().expect("just promoted")
    }

    pub fn supports<V: WireValue>(&self, f: &MatchField<V>) -> bool {
        version_supports(self.version, f.id)
    }

    pub fn supports_masked<V: WireValue>(&self, f: &MatchField<V>) -> bool {
        version_supports_masked(self.version, f.id)
    }

    pub fn get<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<Option<V>, MatchError> {
        get_impl(self.version, self.effective(), f)
    }

    pub fn get_masked<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<Option<Masked<V>>, MatchError> {
        get_masked_impl(self.version, self.effective(), f)
    }

    pub fn is_exact<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_exact_impl(self.version, self.effective(), f.id)
    }

    pub fn is_fully_wildcarded<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_wild_impl(self.version, self.effective(), f.id)
    }

    pub fn is_partially_masked<V: WireValue>(
        &self,
        f: &MatchField<V>,
    ) -> Result<bool, MatchError> {
        is_partial_impl(self.version, self.effective(), f.id)
    }

    /// Constrain `field` to exactly `value`.
    pub fn set_exact<V: WireValue>(
        &mut self,
        f: &MatchField<V>,
        value: V,
    ) -> Result<&mut Self, MatchError> {
        ensure_supported(self.version, f.id)?;
        match self.effective_mut() {
            MatchRepr::Legacy(m) => m.set_raw(f.id, value.to_raw()),
            MatchRepr::Oxm(list) => list.set_entry(OxmEntry::exact(f, value)),
        }
        Ok(self)
    }

    /// Constrain `field` to `value` under `mask`. A match-everything
    /// mask stores an exact entry; a match-nothing mask removes the
    /// field.
    pub fn set_masked<V: WireValue>(
        &mut self,
        f: &MatchField<V>,
        value: V,
        mask: V,
    ) -> Result<&mut Self, MatchError> {
        ensure_supports_masked(self.version, f.id)?;
        match self.effective_mut() {
            MatchRepr::Legacy(m) => {
                m.set_masked_raw(f.id, value.to_raw(), mask.to_raw())?;
            }
            MatchRepr::Oxm(list) => {
                list.set_entry(OxmEntry::masked(f, value, mask));
            }
        }
        Ok(self)
    }

    /// Remove any constraint on `field`.
    pub fn wildcard<V: WireValue>(
        &mut self,
        f: &MatchField<V>,
    ) -> Result<&mut Self, MatchError> {
        ensure_supported(self.version, f.id)?;
        match self.effective_mut() {
            MatchRepr::Legacy(m) => m.wildcard_field(f.id),
            MatchRepr::Oxm(list) => list.unset_entry(f.id),
        }
        Ok(self)
    }

    /// Snapshot an immutable match. The builder stays usable, and
    /// later mutations never reach the snapshot. Legacy matches run
    /// the wire normalization here.
    pub fn build(&self) -> Match {
        let mut repr = self.effective().clone();
        if let MatchRepr::Legacy(m) = &mut repr {
            m.normalize();
        }
        Match { version: self.version, repr }
    }
}
