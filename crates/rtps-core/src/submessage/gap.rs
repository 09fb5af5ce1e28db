// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GAP submessage (RTPS 2.3 Section 8.3.7.4)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      GAP      |X|X|X|X|X|X|X|E|      octetsToNextHeader       |
//! +---------------+---------------+-------------------------------+
//! |                         readerId                              |
//! +---------------------------------------------------------------+
//! |                         writerId                              |
//! +---------------------------------------------------------------+
//! +                     gapStart (SequenceNumber)                 +
//! +---------------------------------------------------------------+
//! ~                     gapList (SequenceNumberSet)               ~
//! +---------------------------------------------------------------+
//! ```
//!
//! Every number in `[gapStart, gapList.base - 1]` is irrelevant, as is
//! every number flagged in gapList.

use super::{Frame, SubmessageCodec, KIND_GAP};
use crate::error::Result;
use crate::types::{EntityId, SequenceNumber, SequenceNumberSet};
use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// Writer notice that a range of sequence numbers will never be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub gap_start: SequenceNumber,
    pub gap_list: SequenceNumberSet,
}

impl Gap {
    /// Contiguous gap `[start, end]`, encoded with an empty bitmap at `end + 1`.
    pub fn range(
        reader_id: EntityId,
        writer_id: EntityId,
        start: SequenceNumber,
        end: SequenceNumber,
    ) -> Self {
        Self {
            reader_id,
            writer_id,
            gap_start: start,
            gap_list: SequenceNumberSet::empty(end + 1),
        }
    }

    /// Last irrelevant number of the contiguous run starting at `gap_start`.
    ///
    /// Starts at `gapList.base - 1` and extends over consecutive set bits.
    pub fn gap_end(&self) -> SequenceNumber {
        let mut end = self.gap_list.base() - 1;
        for seq in self.gap_list.iter() {
            if seq != end + 1 {
                break;
            }
            end = seq;
        }
        end
    }
}

impl SubmessageCodec for Gap {
    const KIND: u8 = KIND_GAP;

    fn read(cursor: &mut Cursor<'_>, _frame: &Frame) -> Result<Self> {
        Ok(Self {
            reader_id: EntityId::read_from(cursor)?,
            writer_id: EntityId::read_from(cursor)?,
            gap_start: SequenceNumber::read_from(cursor)?,
            gap_list: SequenceNumberSet::read_from(cursor)?,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.gap_start.write_to(cursor)?;
        self.gap_list.write_to(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_constructor() {
        let gap = Gap::range(
            EntityId::UNKNOWN,
            EntityId::UNKNOWN,
            SequenceNumber(3),
            SequenceNumber(4),
        );
        assert_eq!(gap.gap_list.base(), SequenceNumber(5));
        assert_eq!(gap.gap_list.num_bits(), 0);
        assert_eq!(gap.gap_end(), SequenceNumber(4));
    }

    #[test]
    fn test_gap_end_follows_consecutive_bits() {
        let list = SequenceNumberSet::from_sequences(
            SequenceNumber(10),
            &[SequenceNumber(10), SequenceNumber(11), SequenceNumber(13)],
        )
        .expect("set");
        let gap = Gap {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            gap_start: SequenceNumber(5),
            gap_list: list,
        };
        // 5..=9 implied, 10 and 11 flagged, 12 missing stops the run
        assert_eq!(gap.gap_end(), SequenceNumber(11));
    }
}
