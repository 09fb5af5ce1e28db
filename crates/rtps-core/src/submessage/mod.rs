// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS submessage catalogue (RTPS 2.3 Section 9.4.5).
//!
//! Every submessage starts with the same 4-byte header:
//!
//! ```text
//!   0...2...........8...............16.............24...............32
//!  +---------------+---------------+---------------+---------------+
//!  | submessageId  |     flags     |      octetsToNextHeader       |
//!  +---------------+---------------+---------------+---------------+
//! ```
//!
//! Flag bit 0 (E) selects the byte order of `octetsToNextHeader` and of
//! the whole body. The other bits are kind-specific and are derived from
//! the body fields on encode (see each body's `flags()`).
//!
//! | Kind | Code | Body type |
//! |------|------|-----------|
//! | PAD | 0x01 | [`Pad`] |
//! | ACKNACK | 0x06 | [`AckNack`] |
//! | HEARTBEAT | 0x07 | [`Heartbeat`] |
//! | GAP | 0x08 | [`Gap`] |
//! | INFO_TS | 0x09 | [`InfoTimestamp`] |
//! | INFO_SRC | 0x0c | [`InfoSource`] |
//! | INFO_REPLY_IP4 | 0x0d | [`InfoReplyIp4`] |
//! | INFO_DST | 0x0e | [`InfoDestination`] |
//! | INFO_REPLY | 0x0f | [`InfoReply`] |
//! | NACK_FRAG | 0x12 | [`NackFrag`] |
//! | HEARTBEAT_FRAG | 0x13 | [`HeartbeatFrag`] |
//! | DATA | 0x15 | [`Data`] |
//! | DATA_FRAG | 0x16 | [`DataFrag`] |
//! | SEC_BODY | 0x30 | [`SecureWrapper`] |
//! | anything else | - | [`UnknownSubmessage`] |

pub mod acknack;
pub mod data;
pub mod gap;
pub mod heartbeat;
pub mod info;
pub mod opaque;

pub use acknack::{AckNack, NackFrag};
pub use data::{Data, DataFrag, Payload};
pub use gap::Gap;
pub use heartbeat::{Heartbeat, HeartbeatFrag};
pub use info::{InfoDestination, InfoReply, InfoReplyIp4, InfoSource, InfoTimestamp};
pub use opaque::{Pad, SecureWrapper, UnknownSubmessage};

use crate::error::{Error, Result};
use crate::wire::{ByteOrder, Cursor, CursorMut, WireError, WireResult};

pub const KIND_PAD: u8 = 0x01;
pub const KIND_ACKNACK: u8 = 0x06;
pub const KIND_HEARTBEAT: u8 = 0x07;
pub const KIND_GAP: u8 = 0x08;
pub const KIND_INFO_TS: u8 = 0x09;
pub const KIND_INFO_SRC: u8 = 0x0c;
pub const KIND_INFO_REPLY_IP4: u8 = 0x0d;
pub const KIND_INFO_DST: u8 = 0x0e;
pub const KIND_INFO_REPLY: u8 = 0x0f;
pub const KIND_NACK_FRAG: u8 = 0x12;
pub const KIND_HEARTBEAT_FRAG: u8 = 0x13;
pub const KIND_DATA: u8 = 0x15;
pub const KIND_DATA_FRAG: u8 = 0x16;
pub const KIND_SEC_BODY: u8 = 0x30;

/// Common submessage header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmessageHeader {
    pub kind: u8,
    pub flags: u8,
    pub octets_to_next_header: u16,
}

impl SubmessageHeader {
    /// Read a header. The cursor byte order is switched to the E flag
    /// before the length field is decoded.
    pub fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let kind = cursor.read_u8()?;
        let flags = cursor.read_u8()?;
        cursor.set_byte_order(ByteOrder::from_flags(flags));
        let octets_to_next_header = cursor.read_u16()?;
        Ok(Self {
            kind,
            flags,
            octets_to_next_header,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::from_flags(self.flags)
    }

    pub fn has_flag(&self, mask: u8) -> bool {
        self.flags & mask != 0
    }
}

/// Header plus the offset where its body starts.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub header: SubmessageHeader,
    pub body_start: usize,
}

impl Frame {
    /// Octets of the body not consumed yet. A zero length field means the
    /// body runs to the end of the message.
    pub fn body_remaining(&self, cursor: &Cursor<'_>) -> WireResult<usize> {
        if self.header.octets_to_next_header == 0 {
            return Ok(cursor.remaining());
        }
        let end = self.body_start + self.header.octets_to_next_header as usize;
        end.checked_sub(cursor.position())
            .ok_or_else(|| WireError::InvalidData {
                reason: format!(
                    "submessage 0x{:02x} body overruns its length {}",
                    self.header.kind, self.header.octets_to_next_header
                ),
            })
    }
}

/// Per-kind codec. `flags()` returns only the kind-specific bits.
pub(crate) trait SubmessageCodec: Sized {
    const KIND: u8;

    fn flags(&self) -> u8 {
        0
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self>;

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()>;
}

/// Closed union over every submessage kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmessageBody {
    Pad(Pad),
    AckNack(AckNack),
    Heartbeat(Heartbeat),
    Gap(Gap),
    InfoTimestamp(InfoTimestamp),
    InfoSource(InfoSource),
    InfoReplyIp4(InfoReplyIp4),
    InfoDestination(InfoDestination),
    InfoReply(InfoReply),
    NackFrag(NackFrag),
    HeartbeatFrag(HeartbeatFrag),
    Data(Data),
    DataFrag(DataFrag),
    SecureWrapper(SecureWrapper),
    Unknown(UnknownSubmessage),
}

macro_rules! impl_from_body {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for SubmessageBody {
                fn from(body: $variant) -> Self {
                    SubmessageBody::$variant(body)
                }
            }

            impl From<$variant> for Submessage {
                fn from(body: $variant) -> Self {
                    Submessage::new(SubmessageBody::$variant(body))
                }
            }
        )*
    };
}

impl_from_body!(
    Pad,
    AckNack,
    Heartbeat,
    Gap,
    InfoTimestamp,
    InfoSource,
    InfoReplyIp4,
    InfoDestination,
    InfoReply,
    NackFrag,
    HeartbeatFrag,
    Data,
    DataFrag,
    SecureWrapper,
);

impl From<UnknownSubmessage> for SubmessageBody {
    fn from(body: UnknownSubmessage) -> Self {
        SubmessageBody::Unknown(body)
    }
}

impl SubmessageBody {
    pub fn kind(&self) -> u8 {
        match self {
            SubmessageBody::Pad(_) => Pad::KIND,
            SubmessageBody::AckNack(_) => AckNack::KIND,
            SubmessageBody::Heartbeat(_) => Heartbeat::KIND,
            SubmessageBody::Gap(_) => Gap::KIND,
            SubmessageBody::InfoTimestamp(_) => InfoTimestamp::KIND,
            SubmessageBody::InfoSource(_) => InfoSource::KIND,
            SubmessageBody::InfoReplyIp4(_) => InfoReplyIp4::KIND,
            SubmessageBody::InfoDestination(_) => InfoDestination::KIND,
            SubmessageBody::InfoReply(_) => InfoReply::KIND,
            SubmessageBody::NackFrag(_) => NackFrag::KIND,
            SubmessageBody::HeartbeatFrag(_) => HeartbeatFrag::KIND,
            SubmessageBody::Data(_) => Data::KIND,
            SubmessageBody::DataFrag(_) => DataFrag::KIND,
            SubmessageBody::SecureWrapper(_) => SecureWrapper::KIND,
            SubmessageBody::Unknown(u) => u.kind,
        }
    }

    fn flags(&self) -> u8 {
        match self {
            SubmessageBody::Pad(b) => b.flags(),
            SubmessageBody::AckNack(b) => b.flags(),
            SubmessageBody::Heartbeat(b) => b.flags(),
            SubmessageBody::Gap(b) => b.flags(),
            SubmessageBody::InfoTimestamp(b) => b.flags(),
            SubmessageBody::InfoSource(b) => b.flags(),
            SubmessageBody::InfoReplyIp4(b) => b.flags(),
            SubmessageBody::InfoDestination(b) => b.flags(),
            SubmessageBody::InfoReply(b) => b.flags(),
            SubmessageBody::NackFrag(b) => b.flags(),
            SubmessageBody::HeartbeatFrag(b) => b.flags(),
            SubmessageBody::Data(b) => b.flags(),
            SubmessageBody::DataFrag(b) => b.flags(),
            SubmessageBody::SecureWrapper(b) => b.flags(),
            SubmessageBody::Unknown(u) => u.flags & !0x01,
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let body = match frame.header.kind {
            KIND_PAD => SubmessageBody::Pad(Pad::read(cursor, frame)?),
            KIND_ACKNACK => SubmessageBody::AckNack(AckNack::read(cursor, frame)?),
            KIND_HEARTBEAT => SubmessageBody::Heartbeat(Heartbeat::read(cursor, frame)?),
            KIND_GAP => SubmessageBody::Gap(Gap::read(cursor, frame)?),
            KIND_INFO_TS => SubmessageBody::InfoTimestamp(InfoTimestamp::read(cursor, frame)?),
            KIND_INFO_SRC => SubmessageBody::InfoSource(InfoSource::read(cursor, frame)?),
            KIND_INFO_REPLY_IP4 => {
                SubmessageBody::InfoReplyIp4(InfoReplyIp4::read(cursor, frame)?)
            }
            KIND_INFO_DST => {
                SubmessageBody::InfoDestination(InfoDestination::read(cursor, frame)?)
            }
            KIND_INFO_REPLY => SubmessageBody::InfoReply(InfoReply::read(cursor, frame)?),
            KIND_NACK_FRAG => SubmessageBody::NackFrag(NackFrag::read(cursor, frame)?),
            KIND_HEARTBEAT_FRAG => {
                SubmessageBody::HeartbeatFrag(HeartbeatFrag::read(cursor, frame)?)
            }
            KIND_DATA => SubmessageBody::Data(Data::read(cursor, frame)?),
            KIND_DATA_FRAG => SubmessageBody::DataFrag(DataFrag::read(cursor, frame)?),
            KIND_SEC_BODY => SubmessageBody::SecureWrapper(SecureWrapper::read(cursor, frame)?),
            _ => SubmessageBody::Unknown(UnknownSubmessage::read(cursor, frame)?),
        };
        Ok(body)
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        match self {
            SubmessageBody::Pad(b) => b.write(cursor),
            SubmessageBody::AckNack(b) => b.write(cursor),
            SubmessageBody::Heartbeat(b) => b.write(cursor),
            SubmessageBody::Gap(b) => b.write(cursor),
            SubmessageBody::InfoTimestamp(b) => b.write(cursor),
            SubmessageBody::InfoSource(b) => b.write(cursor),
            SubmessageBody::InfoReplyIp4(b) => b.write(cursor),
            SubmessageBody::InfoDestination(b) => b.write(cursor),
            SubmessageBody::InfoReply(b) => b.write(cursor),
            SubmessageBody::NackFrag(b) => b.write(cursor),
            SubmessageBody::HeartbeatFrag(b) => b.write(cursor),
            SubmessageBody::Data(b) => b.write(cursor),
            SubmessageBody::DataFrag(b) => b.write(cursor),
            SubmessageBody::SecureWrapper(b) => b.write(cursor),
            SubmessageBody::Unknown(b) => b.write(cursor),
        }
    }

    /// Kinds for which a zero length field means "empty body" rather than
    /// "rest of the message".
    pub(crate) fn zero_length_is_empty(kind: u8) -> bool {
        matches!(kind, KIND_PAD | KIND_INFO_TS)
    }
}

/// A submessage: body plus the byte order it is (or was) encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submessage {
    pub byte_order: ByteOrder,
    pub body: SubmessageBody,
}

impl Submessage {
    /// Little-endian submessage (the order this crate emits).
    pub fn new(body: SubmessageBody) -> Self {
        Self {
            byte_order: ByteOrder::Little,
            body,
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = order;
        self
    }

    pub fn kind(&self) -> u8 {
        self.body.kind()
    }

    /// Full flags octet, E flag included.
    pub fn flags(&self) -> u8 {
        self.body.flags() | self.byte_order.flag()
    }

    /// Decode one submessage (header and body) at the cursor position.
    ///
    /// On return the cursor sits right after the declared length, so
    /// trailing octets a newer protocol revision may append are skipped.
    pub fn read_from(cursor: &mut Cursor<'_>) -> Result<Self> {
        let header = SubmessageHeader::read_from(cursor)?;
        let frame = Frame {
            header,
            body_start: cursor.position(),
        };
        let body = SubmessageBody::read(cursor, &frame)?;

        if header.octets_to_next_header != 0 {
            let consumed = cursor.position() - frame.body_start;
            let declared = header.octets_to_next_header as usize;
            if consumed > declared {
                return Err(Error::InvalidSubmessage {
                    kind: header.kind,
                    reason: "body longer than octetsToNextHeader",
                });
            }
            cursor.skip(declared - consumed)?;
        }

        Ok(Self {
            byte_order: header.byte_order(),
            body,
        })
    }

    /// Encode header and body. The length field is back-patched with the
    /// body size; the caller decides whether to zero it for the last one.
    ///
    /// Returns the offset of the length field.
    pub fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<usize> {
        cursor.set_byte_order(self.byte_order);
        cursor.write_u8(self.kind())?;
        cursor.write_u8(self.flags())?;
        let length_at = cursor.position();
        cursor.write_u16(0)?;
        let body_start = cursor.position();
        self.body.write(cursor)?;
        let length = cursor.position() - body_start;
        let length = u16::try_from(length).map_err(|_| WireError::BufferOverflow {
            offset: body_start,
            needed: length,
        })?;
        cursor.patch_u16(length_at, length)?;
        Ok(length_at)
    }
}

/// Error for a body that breaks its own layout rules.
pub(crate) fn invalid(kind: u8, reason: &'static str) -> Error {
    Error::InvalidSubmessage { kind, reason }
}
