// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Submessages carried as raw octets: PAD, SEC_BODY and unknown kinds.

use super::{Frame, SubmessageBody, SubmessageCodec, KIND_PAD, KIND_SEC_BODY};
use crate::error::Result;
use crate::wire::{Cursor, CursorMut, WireResult};

/// Padding. A zero length field means no padding octets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pad {
    pub bytes: Vec<u8>,
}

impl SubmessageCodec for Pad {
    const KIND: u8 = KIND_PAD;

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let len = frame.header.octets_to_next_header as usize;
        Ok(Self {
            bytes: cursor.read_bytes(len)?.to_vec(),
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&self.bytes)
    }
}

/// S flag: the wrapper protects a single submessage rather than a message.
pub const FLAG_SINGLE_SUBMESSAGE: u8 = 0x02;

/// Security envelope. The ciphertext is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureWrapper {
    pub transformation_kind: u32,
    pub transformation_id: [u8; 8],
    pub cipher_text: Vec<u8>,
    pub single_submessage: bool,
}

impl SubmessageCodec for SecureWrapper {
    const KIND: u8 = KIND_SEC_BODY;

    fn flags(&self) -> u8 {
        if self.single_submessage {
            FLAG_SINGLE_SUBMESSAGE
        } else {
            0
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let transformation_kind = cursor.read_u32()?;
        let transformation_id = cursor.read_array()?;
        let len = cursor.read_u32()? as usize;
        let cipher_text = cursor.read_bytes(len)?.to_vec();
        Ok(Self {
            transformation_kind,
            transformation_id,
            cipher_text,
            single_submessage: frame.header.has_flag(FLAG_SINGLE_SUBMESSAGE),
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u32(self.transformation_kind)?;
        cursor.write_bytes(&self.transformation_id)?;
        cursor.write_u32(self.cipher_text.len() as u32)?;
        cursor.write_bytes(&self.cipher_text)
    }
}

/// Submessage of a kind this crate does not interpret.
///
/// Carries exactly `octetsToNextHeader` octets (or the rest of the message
/// when that is 0) so the remaining submessages still parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSubmessage {
    pub kind: u8,
    /// Raw flags as received (E flag included).
    pub flags: u8,
    pub bytes: Vec<u8>,
}

impl UnknownSubmessage {
    pub(super) fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let len = frame.body_remaining(cursor)?;
        Ok(Self {
            kind: frame.header.kind,
            flags: frame.header.flags,
            bytes: cursor.read_bytes(len)?.to_vec(),
        })
    }

    pub(super) fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&self.bytes)
    }
}

impl From<UnknownSubmessage> for super::Submessage {
    fn from(body: UnknownSubmessage) -> Self {
        let order = crate::wire::ByteOrder::from_flags(body.flags);
        super::Submessage::new(SubmessageBody::Unknown(body)).with_byte_order(order)
    }
}
