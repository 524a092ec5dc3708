// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! An OpenFlow wire-protocol library.
//!
//! The heart of this crate is the extensible-match subsystem: a typed
//! match-field catalogue with inter-field prerequisites, a value/mask
//! algebra, and the two wire encodings the protocol grew over its six
//! revisions -- the fixed-layout bitmask match of version 1.0 and the
//! self-describing OXM TLV list of every later version -- unified
//! behind one [`flow_match::Match`] facade.
//!
//! Codecs run synchronously over caller-supplied byte buffers; there
//! is no transport here. Unknown discriminators from newer protocol
//! revisions are routed through a swappable [`unparsed`] policy so a
//! decoder can skip what it does not understand without losing its
//! place in the stream.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod field;
pub mod flow_match;
pub mod masked;
pub mod match_v1;
pub mod message;
pub mod oxm;
pub mod unparsed;
pub mod version;
pub mod wire;

/// Re-export of the scalar wire value types this crate matches on.
pub mod api {
    pub use oflow_api::*;
}

use oflow_api::ValueError;
use thiserror::Error;
use version::OfVersion;
use wire::ReadErr;

/// A fatal decode/encode failure.
///
/// Unknown discriminators only surface here when the active
/// [`unparsed::UnparsedHandler`] decides they are fatal; truncation
/// and malformed lengths always do.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum OflowError {
    #[error("read failed: {0}")]
    Read(#[from] ReadErr),

    #[error("bad length {len} for {what}")]
    BadLength { what: &'static str, len: usize },

    #[error("unsupported wire version {0:#04x}")]
    UnknownVersion(u8),

    #[error("unknown value {value:#x} for discriminator {discriminator} of {kind}")]
    UnknownDiscriminator {
        kind: &'static str,
        discriminator: &'static str,
        value: u64,
    },

    #[error("field {field} not representable in version {version}")]
    UnsupportedField { field: &'static str, version: OfVersion },

    #[error(transparent)]
    Value(#[from] ValueError),
}
