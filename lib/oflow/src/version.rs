// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use crate::OflowError;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The six wire versions of the protocol.
///
/// An out-of-range version byte at the head of a message is a fatal
/// error here; the unparsed-element machinery only applies to
/// discriminators *inside* a stream whose version we speak.
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
pub enum OfVersion {
    Of10 = 1,
    Of11 = 2,
    Of12 = 3,
    Of13 = 4,
    Of14 = 5,
    Of15 = 6,
}

impl OfVersion {
    pub const LATEST: Self = Self::Of15;

    /// The version byte carried in every message header.
    pub const fn wire_version(self) -> u8 {
        self as u8
    }

    /// Every version after 1.0 encodes matches as an OXM TLV list;
    /// 1.0 uses the fixed bitmask struct.
    pub const fn uses_oxm(self) -> bool {
        !matches!(self, Self::Of10)
    }
}

impl TryFrom<u8> for OfVersion {
    type Error = OflowError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Of10),
            2 => Ok(Self::Of11),
            3 => Ok(Self::Of12),
            4 => Ok(Self::Of13),
            5 => Ok(Self::Of14),
            6 => Ok(Self::Of15),
            _ => Err(OflowError::UnknownVersion(raw)),
        }
    }
}

impl Display for OfVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Of10 => "1.0",
            Self::Of11 => "1.1",
            Self::Of12 => "1.2",
            Self::Of13 => "1.3",
            Self::Of14 => "1.4",
            Self::Of15 => "1.5",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for v in [
            OfVersion::Of10,
            OfVersion::Of11,
            OfVersion::Of12,
            OfVersion::Of13,
            OfVersion::Of14,
            OfVersion::Of15,
        ] {
            assert_eq!(OfVersion::try_from(v.wire_version()), Ok(v));
        }
        assert_eq!(
            OfVersion::try_from(0x42),
            Err(OflowError::UnknownVersion(0x42))
        );
    }
}
