// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HEARTBEAT and HEARTBEAT_FRAG submessages (RTPS 2.3 Sections 8.3.7.5, 8.3.7.6)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   HEARTBEAT   |X|X|X|X|X|L|F|E|      octetsToNextHeader       |
//! +---------------+---------------+-------------------------------+
//! |                         readerId                              |
//! +---------------------------------------------------------------+
//! |                         writerId                              |
//! +---------------------------------------------------------------+
//! +                     firstSN (SequenceNumber)                  +
//! +---------------------------------------------------------------+
//! +                     lastSN (SequenceNumber)                   +
//! +---------------------------------------------------------------+
//! |                           count                               |
//! +---------------------------------------------------------------+
//! ```

use super::{Frame, SubmessageCodec, KIND_HEARTBEAT, KIND_HEARTBEAT_FRAG};
use crate::error::Result;
use crate::types::{EntityId, SequenceNumber};
use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// F flag: the writer does not require a response.
pub const FLAG_FINAL: u8 = 0x02;
/// L flag: the heartbeat also asserts writer liveliness.
pub const FLAG_LIVELINESS: u8 = 0x04;

/// Writer announcement of the sequence range it can serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub first_sn: SequenceNumber,
    pub last_sn: SequenceNumber,
    pub count: u32,
    pub final_flag: bool,
    pub liveliness_flag: bool,
}

impl Heartbeat {
    /// Final (no response needed), non-liveliness heartbeat.
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        first_sn: SequenceNumber,
        last_sn: SequenceNumber,
        count: u32,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            first_sn,
            last_sn,
            count,
            final_flag: true,
            liveliness_flag: false,
        }
    }

    /// `first_sn >= 1` and `last_sn >= first_sn - 1` (an empty range is
    /// announced as `last_sn == first_sn - 1`).
    pub fn has_valid_range(&self) -> bool {
        self.first_sn.0 >= 1 && self.last_sn.0 >= self.first_sn.0 - 1
    }
}

impl SubmessageCodec for Heartbeat {
    const KIND: u8 = KIND_HEARTBEAT;

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.final_flag {
            flags |= FLAG_FINAL;
        }
        if self.liveliness_flag {
            flags |= FLAG_LIVELINESS;
        }
        flags
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        Ok(Self {
            reader_id: EntityId::read_from(cursor)?,
            writer_id: EntityId::read_from(cursor)?,
            first_sn: SequenceNumber::read_from(cursor)?,
            last_sn: SequenceNumber::read_from(cursor)?,
            count: cursor.read_u32()?,
            final_flag: frame.header.has_flag(FLAG_FINAL),
            liveliness_flag: frame.header.has_flag(FLAG_LIVELINESS),
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.first_sn.write_to(cursor)?;
        self.last_sn.write_to(cursor)?;
        cursor.write_u32(self.count)
    }
}

/// Fragment-level announcement for a sample sent as DATA_FRAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatFrag {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    pub last_fragment_num: u32,
    pub count: u32,
}

impl SubmessageCodec for HeartbeatFrag {
    const KIND: u8 = KIND_HEARTBEAT_FRAG;

    fn read(cursor: &mut Cursor<'_>, _frame: &Frame) -> Result<Self> {
        Ok(Self {
            reader_id: EntityId::read_from(cursor)?,
            writer_id: EntityId::read_from(cursor)?,
            writer_sn: SequenceNumber::read_from(cursor)?,
            last_fragment_num: cursor.read_u32()?,
            count: cursor.read_u32()?,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.writer_sn.write_to(cursor)?;
        cursor.write_u32(self.last_fragment_num)?;
        cursor.write_u32(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submessage::Submessage;
    use crate::wire::ByteOrder;

    #[test]
    fn test_heartbeat_layout_little_endian() {
        let mut hb = Heartbeat::new(
            EntityId::UNKNOWN,
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(1),
            SequenceNumber(5),
            3,
        );
        hb.final_flag = false;
        hb.liveliness_flag = true;
        let sm = Submessage::from(hb);
        let mut buffer = [0u8; 32];
        let mut cursor = CursorMut::new(&mut buffer);
        sm.write_to(&mut cursor).expect("write");
        assert_eq!(cursor.position(), 32);
        assert_eq!(&buffer[..4], &[KIND_HEARTBEAT, 0x05, 28, 0]);
        // lastSN.low = 5
        assert_eq!(&buffer[24..28], &[5, 0, 0, 0]);
        assert_eq!(&buffer[28..32], &[3, 0, 0, 0]);
    }

    #[test]
    fn test_heartbeat_frag_roundtrip_big_endian() {
        let sm = Submessage::from(HeartbeatFrag {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId([0, 0, 2, 0x03]),
            writer_sn: SequenceNumber(9),
            last_fragment_num: 12,
            count: 1,
        })
        .with_byte_order(ByteOrder::Big);
        let mut buffer = [0u8; 32];
        let mut cursor = CursorMut::new(&mut buffer);
        sm.write_to(&mut cursor).expect("write");
        let len = cursor.position();
        let mut reader = Cursor::new(&buffer[..len]);
        assert_eq!(Submessage::read_from(&mut reader).expect("read"), sm);
    }
}
