// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interpreter submessages: INFO_TS, INFO_SRC, INFO_DST, INFO_REPLY, INFO_REPLY_IP4.
//!
//! These carry no data of their own. They change how the receiver reads
//! the submessages that follow them in the same message.

use super::{Frame, SubmessageCodec};
use super::{KIND_INFO_DST, KIND_INFO_REPLY, KIND_INFO_REPLY_IP4, KIND_INFO_SRC, KIND_INFO_TS};
use crate::error::Result;
use crate::types::locator::{read_locator_list, write_locator_list};
use crate::types::{GuidPrefix, Locator, LocatorUdpV4, ProtocolVersion, Time, VendorId};
use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// I flag of INFO_TS: timestamp invalidated, no body.
pub const FLAG_INVALIDATE: u8 = 0x02;
/// M flag of INFO_REPLY / INFO_REPLY_IP4: multicast locators present.
pub const FLAG_MULTICAST: u8 = 0x02;

/// Source timestamp for the following submessages. `None` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoTimestamp {
    pub timestamp: Option<Time>,
}

impl SubmessageCodec for InfoTimestamp {
    const KIND: u8 = KIND_INFO_TS;

    fn flags(&self) -> u8 {
        if self.timestamp.is_none() {
            FLAG_INVALIDATE
        } else {
            0
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let timestamp = if frame.header.has_flag(FLAG_INVALIDATE) {
            None
        } else {
            Some(Time::read_from(cursor)?)
        };
        Ok(Self { timestamp })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        match &self.timestamp {
            Some(t) => t.write_to(cursor),
            None => Ok(()),
        }
    }
}

/// Logical source of the following submessages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSource {
    pub protocol_version: ProtocolVersion,
    pub vendor_id: VendorId,
    pub guid_prefix: GuidPrefix,
}

impl SubmessageCodec for InfoSource {
    const KIND: u8 = KIND_INFO_SRC;

    fn read(cursor: &mut Cursor<'_>, _frame: &Frame) -> Result<Self> {
        let _unused = cursor.read_u32()?;
        Ok(Self {
            protocol_version: ProtocolVersion::read_from(cursor)?,
            vendor_id: VendorId::read_from(cursor)?,
            guid_prefix: GuidPrefix::read_from(cursor)?,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u32(0)?;
        self.protocol_version.write_to(cursor)?;
        self.vendor_id.write_to(cursor)?;
        self.guid_prefix.write_to(cursor)
    }
}

/// Participant the following submessages are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDestination {
    pub guid_prefix: GuidPrefix,
}

impl SubmessageCodec for InfoDestination {
    const KIND: u8 = KIND_INFO_DST;

    fn read(cursor: &mut Cursor<'_>, _frame: &Frame) -> Result<Self> {
        Ok(Self {
            guid_prefix: GuidPrefix::read_from(cursor)?,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.guid_prefix.write_to(cursor)
    }
}

/// Where replies to the following submessages should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReply {
    pub unicast: Vec<Locator>,
    pub multicast: Vec<Locator>,
}

impl SubmessageCodec for InfoReply {
    const KIND: u8 = KIND_INFO_REPLY;

    fn flags(&self) -> u8 {
        if self.multicast.is_empty() {
            0
        } else {
            FLAG_MULTICAST
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let unicast = read_locator_list(cursor)?;
        let multicast = if frame.header.has_flag(FLAG_MULTICAST) {
            read_locator_list(cursor)?
        } else {
            Vec::new()
        };
        Ok(Self { unicast, multicast })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        write_locator_list(cursor, &self.unicast)?;
        if !self.multicast.is_empty() {
            write_locator_list(cursor, &self.multicast)?;
        }
        Ok(())
    }
}

/// Compact IPv4 form of [`InfoReply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReplyIp4 {
    pub unicast: LocatorUdpV4,
    pub multicast: Option<LocatorUdpV4>,
}

impl SubmessageCodec for InfoReplyIp4 {
    const KIND: u8 = KIND_INFO_REPLY_IP4;

    fn flags(&self) -> u8 {
        if self.multicast.is_some() {
            FLAG_MULTICAST
        } else {
            0
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let unicast = LocatorUdpV4::read_from(cursor)?;
        let multicast = if frame.header.has_flag(FLAG_MULTICAST) {
            Some(LocatorUdpV4::read_from(cursor)?)
        } else {
            None
        };
        Ok(Self { unicast, multicast })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.unicast.write_to(cursor)?;
        if let Some(multicast) = &self.multicast {
            multicast.write_to(cursor)?;
        }
        Ok(())
    }
}
