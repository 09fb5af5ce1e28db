// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS message framing: 20-byte header followed by aligned submessages.
//!
//! ```text
//! +---------------+---------------+---------------+---------------+
//! |      'R'      |      'T'      |      'P'      |      'S'      |
//! +---------------+---------------+---------------+---------------+
//! | ProtocolVersion               | VendorId                      |
//! +---------------+---------------+---------------+---------------+
//! |                      GuidPrefix (12 octets)                   |
//! +---------------+---------------+---------------+---------------+
//! ~                 Submessage (4-byte aligned) ...               ~
//! +---------------------------------------------------------------+
//! ```
//!
//! Decoding is all-or-nothing: any failure inside a submessage discards the
//! whole message. Encoding never fails past the header; submessages that do
//! not fit are reported through [`EncodeOutcome::overflowed`].

use crate::config::{PROTOCOL_VERSION, RTPS_HEADER_SIZE, RTPS_MAGIC, VENDOR_ID};
use crate::error::{Error, Result};
use crate::submessage::{Submessage, SubmessageBody};
use crate::types::{GuidPrefix, ProtocolVersion, VendorId};
use crate::wire::{Cursor, CursorMut, WireError, WireRead, WireResult, WireWrite};

/// Fixed message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub protocol_version: ProtocolVersion,
    pub vendor_id: VendorId,
    pub guid_prefix: GuidPrefix,
}

impl Header {
    /// Header stamped with our protocol version and vendor id.
    pub fn new(guid_prefix: GuidPrefix) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            vendor_id: VENDOR_ID,
            guid_prefix,
        }
    }
}

impl WireRead for Header {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let magic = cursor.read_array::<4>()?;
        if magic != RTPS_MAGIC {
            return Err(WireError::InvalidData {
                reason: format!("bad magic {:02x?}", magic),
            });
        }
        Ok(Self {
            protocol_version: ProtocolVersion::read_from(cursor)?,
            vendor_id: VendorId::read_from(cursor)?,
            guid_prefix: GuidPrefix::read_from(cursor)?,
        })
    }
}

impl WireWrite for Header {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&RTPS_MAGIC)?;
        self.protocol_version.write_to(cursor)?;
        self.vendor_id.write_to(cursor)?;
        self.guid_prefix.write_to(cursor)
    }
}

/// Result of [`Message::encode_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// Bytes committed to the buffer.
    pub len: usize,
    /// Submessages committed, always a prefix of the message.
    pub submessages_written: usize,
    /// `true` if a submessage did not fit and encoding stopped before it.
    /// The tail must be recovered by the reliability protocol.
    pub overflowed: bool,
}

/// A header plus an ordered list of submessages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub submessages: Vec<Submessage>,
}

impl Message {
    pub fn new(guid_prefix: GuidPrefix) -> Self {
        Self {
            header: Header::new(guid_prefix),
            submessages: Vec::new(),
        }
    }

    pub fn push(&mut self, submessage: impl Into<Submessage>) {
        self.submessages.push(submessage.into());
    }

    pub fn with(mut self, submessage: impl Into<Submessage>) -> Self {
        self.push(submessage);
        self
    }

    pub fn len(&self) -> usize {
        self.submessages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submessages.is_empty()
    }

    /// Parse a datagram.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedMessage`] if the buffer is shorter than the header,
    /// the magic is wrong, or any submessage is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RTPS_HEADER_SIZE {
            return Err(Error::MalformedMessage {
                reason: format!("{} bytes is shorter than the RTPS header", bytes.len()),
            });
        }

        let mut cursor = Cursor::new(bytes);
        let header = Header::read_from(&mut cursor).map_err(|e| malformed(e.into()))?;

        let mut submessages = Vec::new();
        loop {
            // Trailing octets shorter than the alignment cannot start a submessage.
            if cursor.align(4).is_err() || cursor.is_eof() {
                break;
            }
            let submessage = Submessage::read_from(&mut cursor).map_err(malformed)?;
            submessages.push(submessage);
        }

        Ok(Self {
            header,
            submessages,
        })
    }

    /// Encode into `buffer`, committing as many submessages as fit.
    ///
    /// The length field of the last committed submessage is set to 0,
    /// except for PAD and INFO_TS where 0 would mean an empty body.
    ///
    /// # Errors
    ///
    /// [`Error::BufferOverflow`] if the header itself does not fit.
    pub fn encode_into(&self, buffer: &mut [u8]) -> Result<EncodeOutcome> {
        let mut cursor = CursorMut::new(buffer);
        self.header.write_to(&mut cursor)?;

        let mut last_length_at = None;
        let mut submessages_written = 0;
        let mut overflowed = false;

        for submessage in &self.submessages {
            let start = cursor.position();
            let result = cursor
                .align(4)
                .and_then(|_| submessage.write_to(&mut cursor));
            match result {
                Ok(length_at) => {
                    last_length_at = Some((length_at, submessage));
                    submessages_written += 1;
                }
                Err(WireError::BufferOverflow { .. }) => {
                    cursor.set_position(start)?;
                    overflowed = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some((length_at, submessage)) = last_length_at {
            if !SubmessageBody::zero_length_is_empty(submessage.kind()) {
                cursor.set_byte_order(submessage.byte_order);
                cursor.patch_u16(length_at, 0)?;
            }
        }

        Ok(EncodeOutcome {
            len: cursor.position(),
            submessages_written,
            overflowed,
        })
    }

    /// Encode into a fresh buffer of at most `max_len` bytes.
    pub fn to_bytes(&self, max_len: usize) -> Result<(Vec<u8>, EncodeOutcome)> {
        let mut buffer = vec![0u8; max_len];
        let outcome = self.encode_into(&mut buffer)?;
        buffer.truncate(outcome.len);
        Ok((buffer, outcome))
    }
}

fn malformed(err: Error) -> Error {
    match err {
        Error::MalformedMessage { .. } => err,
        other => Error::MalformedMessage {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submessage::{Heartbeat, InfoDestination, InfoTimestamp, KIND_HEARTBEAT};
    use crate::types::{EntityId, SequenceNumber, Time};

    fn heartbeat(count: u32) -> Heartbeat {
        Heartbeat::new(
            EntityId::UNKNOWN,
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(1),
            SequenceNumber(5),
            count,
        )
    }

    #[test]
    fn test_header_layout() {
        let msg = Message::new(GuidPrefix([9; 12]));
        let (bytes, outcome) = msg.to_bytes(64).expect("encode");
        assert_eq!(outcome.len, RTPS_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"RTPS");
        assert_eq!(&bytes[4..6], &[2, 3]);
        assert_eq!(&bytes[6..8], &[0x01, 0xAA]);
        assert_eq!(&bytes[8..20], &[9; 12]);
    }

    #[test]
    fn test_last_submessage_length_is_zero() {
        let msg = Message::new(GuidPrefix([1; 12]))
            .with(InfoDestination {
                guid_prefix: GuidPrefix([2; 12]),
            })
            .with(heartbeat(1));
        let (bytes, outcome) = msg.to_bytes(256).expect("encode");
        assert_eq!(outcome.submessages_written, 2);
        assert!(!outcome.overflowed);
        // INFO_DST keeps its length, HEARTBEAT is last
        assert_eq!(&bytes[22..24], &[12, 0]);
        assert_eq!(bytes[36], KIND_HEARTBEAT);
        assert_eq!(&bytes[38..40], &[0, 0]);
        assert_eq!(Message::decode(&bytes).expect("decode"), msg);
    }

    #[test]
    fn test_trailing_info_ts_keeps_length() {
        let msg = Message::new(GuidPrefix([1; 12])).with(InfoTimestamp {
            timestamp: Some(Time {
                seconds: 10,
                fraction: 0,
            }),
        });
        let (bytes, _) = msg.to_bytes(64).expect("encode");
        assert_eq!(&bytes[22..24], &[8, 0]);
        assert_eq!(Message::decode(&bytes).expect("decode"), msg);
    }

    #[test]
    fn test_overflow_rewinds_to_committed_prefix() {
        let msg = Message::new(GuidPrefix([1; 12]))
            .with(heartbeat(1))
            .with(heartbeat(2))
            .with(heartbeat(3));
        // header (20) + two heartbeats (2 * 32) + a little slack
        let (bytes, outcome) = msg.to_bytes(90).expect("encode");
        assert!(outcome.overflowed);
        assert_eq!(outcome.submessages_written, 2);
        assert_eq!(outcome.len, 84);
        assert_eq!(bytes.len(), 84);

        let decoded = Message::decode(&bytes).expect("decode");
        assert_eq!(decoded.submessages, msg.submessages[..2].to_vec());
    }

    #[test]
    fn test_header_must_fit() {
        let msg = Message::new(GuidPrefix([1; 12]));
        let mut small = [0u8; 10];
        assert!(matches!(
            msg.encode_into(&mut small),
            Err(Error::BufferOverflow { .. })
        ));
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        assert!(matches!(
            Message::decode(b"RTPS\x02\x03"),
            Err(Error::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_bad_magic_is_malformed() {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(b"RTPX");
        assert!(matches!(
            Message::decode(&bytes),
            Err(Error::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_truncated_submessage_discards_message() {
        let msg = Message::new(GuidPrefix([1; 12])).with(heartbeat(1));
        let (mut bytes, _) = msg.to_bytes(128).expect("encode");
        bytes.truncate(bytes.len() - 6);
        assert!(matches!(
            Message::decode(&bytes),
            Err(Error::MalformedMessage { .. })
        ));
    }
}
