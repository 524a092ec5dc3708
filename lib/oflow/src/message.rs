// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The outer message framing, just far enough to exercise the
//! unknown-discriminator contract at the message level.
//!
//! Message semantics live above this crate; a decoded message is its
//! header plus raw payload bytes. What matters here is the skip
//! guarantee: an unknown message type under a continue policy
//! consumes exactly the header's declared length and nothing else.

use crate::OflowError;
use crate::unparsed::ReaderContext;
use crate::version::OfVersion;
use crate::wire::WireReader;
use crate::wire::WireWriter;
use serde::Deserialize;
use serde::Serialize;

/// Bytes in the fixed message header.
pub const OFP_HEADER_SZ: usize = 8;

pub const OFPT_HELLO: u8 = 0;
pub const OFPT_ERROR: u8 = 1;
pub const OFPT_ECHO_REQUEST: u8 = 2;
pub const OFPT_ECHO_REPLY: u8 = 3;
pub const OFPT_FEATURES_REQUEST: u8 = 5;
pub const OFPT_FEATURES_REPLY: u8 = 6;
pub const OFPT_PACKET_IN: u8 = 10;
pub const OFPT_FLOW_MOD: u8 = 14;

fn known_msg_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        OFPT_HELLO
            | OFPT_ERROR
            | OFPT_ECHO_REQUEST
            | OFPT_ECHO_REPLY
            | OFPT_FEATURES_REQUEST
            | OFPT_FEATURES_REPLY
            | OFPT_PACKET_IN
            | OFPT_FLOW_MOD
    )
}

/// The fixed header carried by every message.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OfHeader {
    pub version: OfVersion,
    pub msg_type: u8,
    pub length: u16,
    pub xid: u32,
}

/// A decoded message: header plus opaque payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OfMessage {
    pub header: OfHeader,
    pub payload: Vec<u8>,
}

/// Decode one message from the buffer.
///
/// `Ok(None)` means an unknown message type was skipped under the
/// context's continue policy; the cursor sits exactly past the
/// message's declared length and the next call decodes the following
/// message. A version byte we do not speak at all, or a length
/// shorter than the header, is always fatal.
pub fn read_message(
    ctx: &ReaderContext,
    rdr: &mut WireReader,
) -> Result<Option<OfMessage>, OflowError> {
    let version = OfVersion::try_from(rdr.read_u8()?)?;
    let msg_type = rdr.read_u8()?;
    let length = rdr.read_u16()?;
    let xid = rdr.read_u32()?;

    if usize::from(length) < OFP_HEADER_SZ {
        return Err(OflowError::BadLength {
            what: "message",
            len: usize::from(length),
        });
    }
    let body_len = usize::from(length) - OFP_HEADER_SZ;

    if !known_msg_type(msg_type) {
        ctx.unparsed_handler().unparsed(
            "OFMessage",
            "type",
            u64::from(msg_type),
        )?;
        rdr.seek(body_len)?;
        return Ok(None);
    }

    let payload = rdr.slice(body_len)?.to_vec();
    Ok(Some(OfMessage {
        header: OfHeader { version, msg_type, length, xid },
        payload,
    }))
}

/// Encode one message, recomputing the header length from the
/// payload.
pub fn write_message(msg: &OfMessage, wtr: &mut WireWriter) {
    wtr.put_u8(msg.header.version.wire_version());
    wtr.put_u8(msg.header.msg_type);
    wtr.put_u16((OFP_HEADER_SZ + msg.payload.len()) as u16);
    wtr.put_u32(msg.header.xid);
    wtr.put_slice(&msg.payload);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::unparsed::LogUnparsed;
    use slog::Discard;
    use slog::Logger;
    use slog::o;

    // An OF1.3 message of type 0o77 and length 11, followed by a
    // well-formed echo reply.
    #[rustfmt::skip]
    const UNKNOWN_THEN_ECHO: &[u8] = &[
        0x04, 0o77, 0x00, 0x0B, 0x12, 0x34, 0x56, 0x78, 0x61, 0x62, 0x63,
        0x04, 0x03, 0x00, 0x08, 0x00, 0x00, 0x00, 0x2A,
    ];

    #[test]
    fn skip_unknown_message() {
        let handler = LogUnparsed::new(Logger::root(Discard, o!()));
        let ctx = ReaderContext::new(&handler);
        let mut rdr = WireReader::new(UNKNOWN_THEN_ECHO);

        let first = read_message(&ctx, &mut rdr).unwrap();
        assert!(first.is_none());
        assert_eq!(rdr.pos(), 11);

        let second = read_message(&ctx, &mut rdr).unwrap().unwrap();
        assert_eq!(second.header.msg_type, OFPT_ECHO_REPLY);
        assert_eq!(second.header.xid, 0x2A);
        assert!(second.payload.is_empty());
    }

    #[test]
    fn unknown_message_is_fatal_by_default() {
        let mut rdr = WireReader::new(UNKNOWN_THEN_ECHO);
        let res = read_message(&ReaderContext::DEFAULT, &mut rdr);
        assert_eq!(
            res,
            Err(OflowError::UnknownDiscriminator {
                kind: "OFMessage",
                discriminator: "type",
                value: 0o77,
            })
        );
    }

    #[test]
    fn unknown_version_is_fatal_under_any_policy() {
        let handler = LogUnparsed::new(Logger::root(Discard, o!()));
        let ctx = ReaderContext::new(&handler);
        let buf = [0x42u8, 0x00, 0x00, 0x08, 0, 0, 0, 0];
        let mut rdr = WireReader::new(&buf);
        assert_eq!(
            read_message(&ctx, &mut rdr),
            Err(OflowError::UnknownVersion(0x42))
        );
    }

    #[test]
    fn short_length_is_fatal() {
        let buf = [0x04u8, 0x00, 0x00, 0x04, 0, 0, 0, 0];
        let mut rdr = WireReader::new(&buf);
        assert!(matches!(
            read_message(&ReaderContext::DEFAULT, &mut rdr),
            Err(OflowError::BadLength { .. })
        ));
    }

    #[test]
    fn round_trip() {
        let msg = OfMessage {
            header: OfHeader {
                version: OfVersion::Of13,
                msg_type: OFPT_ECHO_REQUEST,
                length: 0, // recomputed on write
                xid: 7,
            },
            payload: vec![0xDE, 0xAD],
        };

        let mut buf = Vec::new();
        let mut wtr = WireWriter::new(&mut buf);
        write_message(&msg, &mut wtr);
        assert_eq!(buf, [0x04, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x07, 0xDE, 0xAD]);

        let mut rdr = WireReader::new(&buf);
        let decoded =
            read_message(&ReaderContext::DEFAULT, &mut rdr).unwrap().unwrap();
        assert_eq!(decoded.header.length, 10);
        assert_eq!(decoded.payload, msg.payload);
    }
}
