// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ACKNACK and NACK_FRAG submessages (RTPS 2.3 Sections 8.3.7.1, 8.3.7.8)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    ACKNACK    |X|X|X|X|X|X|F|E|      octetsToNextHeader       |
//! +---------------+---------------+-------------------------------+
//! |                         readerId                              |
//! +---------------------------------------------------------------+
//! |                         writerId                              |
//! +---------------------------------------------------------------+
//! ~                 readerSNState (SequenceNumberSet)             ~
//! +---------------------------------------------------------------+
//! |                           count                               |
//! +---------------------------------------------------------------+
//! ```
//!
//! readerSNState.base - 1 is the highest sequence number the reader has
//! received in order. Set bits are the numbers it is missing.

use super::{Frame, SubmessageCodec, KIND_ACKNACK, KIND_NACK_FRAG};
use crate::error::Result;
use crate::types::{EntityId, FragmentNumberSet, SequenceNumber, SequenceNumberSet};
use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// F flag: the reader does not expect a response.
pub const FLAG_FINAL: u8 = 0x02;

/// Reader acknowledgement and negative acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckNack {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub reader_sn_state: SequenceNumberSet,
    pub count: u32,
    pub final_flag: bool,
}

impl AckNack {
    /// Highest sequence number acknowledged (base - 1).
    pub fn acked_up_to(&self) -> SequenceNumber {
        self.reader_sn_state.base() - 1
    }
}

impl SubmessageCodec for AckNack {
    const KIND: u8 = KIND_ACKNACK;

    fn flags(&self) -> u8 {
        if self.final_flag {
            FLAG_FINAL
        } else {
            0
        }
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        Ok(Self {
            reader_id: EntityId::read_from(cursor)?,
            writer_id: EntityId::read_from(cursor)?,
            reader_sn_state: SequenceNumberSet::read_from(cursor)?,
            count: cursor.read_u32()?,
            final_flag: frame.header.has_flag(FLAG_FINAL),
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.reader_sn_state.write_to(cursor)?;
        cursor.write_u32(self.count)
    }
}

/// Negative acknowledgement of fragments of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NackFrag {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    pub fragment_number_state: FragmentNumberSet,
    pub count: u32,
}

impl SubmessageCodec for NackFrag {
    const KIND: u8 = KIND_NACK_FRAG;

    fn read(cursor: &mut Cursor<'_>, _frame: &Frame) -> Result<Self> {
        Ok(Self {
            reader_id: EntityId::read_from(cursor)?,
            writer_id: EntityId::read_from(cursor)?,
            writer_sn: SequenceNumber::read_from(cursor)?,
            fragment_number_state: FragmentNumberSet::read_from(cursor)?,
            count: cursor.read_u32()?,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.writer_sn.write_to(cursor)?;
        self.fragment_number_state.write_to(cursor)?;
        cursor.write_u32(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submessage::{Submessage, SubmessageBody};
    use crate::wire::ByteOrder;

    #[test]
    fn test_acknack_layout_big_endian() {
        let sm = Submessage::from(AckNack {
            reader_id: EntityId([0, 0, 1, 0x07]),
            writer_id: EntityId([0, 0, 1, 0x02]),
            reader_sn_state: SequenceNumberSet::with_range(SequenceNumber(1), 5),
            count: 1,
            final_flag: false,
        })
        .with_byte_order(ByteOrder::Big);
        let mut buffer = [0u8; 64];
        let mut cursor = CursorMut::new(&mut buffer);
        sm.write_to(&mut cursor).expect("write");
        // header(4) + ids(8) + base(8) + numBits(4) + 1 word(4) + count(4)
        assert_eq!(cursor.position(), 32);
        assert_eq!(&buffer[..4], &[KIND_ACKNACK, 0x00, 0, 28]);
        assert_eq!(&buffer[20..24], &[0, 0, 0, 5]);
        assert_eq!(&buffer[24..28], &[0xF8, 0, 0, 0]);
    }

    #[test]
    fn test_acked_up_to() {
        let an = AckNack {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            reader_sn_state: SequenceNumberSet::empty(SequenceNumber(6)),
            count: 2,
            final_flag: true,
        };
        assert_eq!(an.acked_up_to(), SequenceNumber(5));
    }

    #[test]
    fn test_nack_frag_roundtrip() {
        let mut state = FragmentNumberSet::with_bits(3, 10);
        state.insert(3);
        state.insert(7);
        let sm = Submessage::from(NackFrag {
            reader_id: EntityId([0, 0, 1, 0x07]),
            writer_id: EntityId([0, 0, 1, 0x02]),
            writer_sn: SequenceNumber(4),
            fragment_number_state: state,
            count: 9,
        });
        let mut buffer = [0u8; 64];
        let mut cursor = CursorMut::new(&mut buffer);
        sm.write_to(&mut cursor).expect("write");
        let len = cursor.position();
        let mut reader = Cursor::new(&buffer[..len]);
        let decoded = Submessage::read_from(&mut reader).expect("read");
        match &decoded.body {
            SubmessageBody::NackFrag(nf) => {
                assert_eq!(nf.fragment_number_state.iter().collect::<Vec<_>>(), vec![3, 7]);
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(decoded, sm);
    }
}
