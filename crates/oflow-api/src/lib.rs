// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Scalar wire value types for the OpenFlow protocol.
//!
//! Every type in this crate is a fixed-length, big-endian wire value
//! implementing [`WireValue`]. The match/codec engine in the `oflow`
//! crate depends on nothing else from this layer.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod arp;
pub mod ether;
pub mod icmp;
pub mod ip;
pub mod mac;
pub mod num;
pub mod port;
pub mod value;
pub mod vlan;

pub use arp::*;
pub use ether::*;
pub use icmp::*;
pub use ip::*;
pub use mac::*;
pub use num::*;
pub use port::*;
pub use value::*;
pub use vlan::*;
