// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence numbers and the bitmap sets used by ACKNACK, GAP and NACK_FRAG.
//!
//! ```text
//! SequenceNumberSet wire layout:
//!   0                   1                   2                   3
//!   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//!  +---------------------------------------------------------------+
//!  |                      bitmapBase.high (i32)                    |
//!  +---------------------------------------------------------------+
//!  |                      bitmapBase.low (u32)                     |
//!  +---------------------------------------------------------------+
//!  |                      numBits (u32, <= 256)                    |
//!  +---------------------------------------------------------------+
//!  |            bitmap[0 .. ceil(numBits/32)] (u32 each)           |
//!  +---------------------------------------------------------------+
//! ```
//!
//! Bit `i` lives in word `i / 32` at mask `1 << (31 - i % 32)` (MSB first).

use std::fmt;
use std::ops::{Add, Sub};

use crate::config::{MAX_BITMAP_BITS, MAX_BITMAP_WORDS};
use crate::wire::{Cursor, CursorMut, WireError, WireRead, WireResult, WireWrite};

const WORD_BITS: u32 = 32;

/// Signed 64-bit sequence number, strictly increasing per writer from 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SequenceNumber(pub i64);

impl SequenceNumber {
    /// SEQUENCENUMBER_UNKNOWN (high = -1, low = 0).
    pub const UNKNOWN: Self = Self(-(1i64 << 32));
    pub const ZERO: Self = Self(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn high(self) -> i32 {
        (self.0 >> 32) as i32
    }

    pub fn low(self) -> u32 {
        self.0 as u32
    }

    pub fn from_parts(high: i32, low: u32) -> Self {
        Self((i64::from(high) << 32) | i64::from(low))
    }
}

impl fmt::Debug for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SN({})", self.0)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SequenceNumber {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Add<i64> for SequenceNumber {
    type Output = SequenceNumber;

    fn add(self, rhs: i64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<i64> for SequenceNumber {
    type Output = SequenceNumber;

    fn sub(self, rhs: i64) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl WireRead for SequenceNumber {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let high = cursor.read_i32()?;
        let low = cursor.read_u32()?;
        Ok(Self::from_parts(high, low))
    }
}

impl WireWrite for SequenceNumber {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_i32(self.high())?;
        cursor.write_u32(self.low())
    }
}

/// Fixed-capacity MSB-first bitmap shared by the two set types.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bitmap {
    num_bits: u32,
    words: [u32; MAX_BITMAP_WORDS],
}

impl Bitmap {
    fn new(num_bits: u32) -> Self {
        Self {
            num_bits: num_bits.min(MAX_BITMAP_BITS),
            words: [0; MAX_BITMAP_WORDS],
        }
    }

    fn full(num_bits: u32) -> Self {
        let mut bitmap = Self::new(num_bits);
        for i in 0..bitmap.num_bits {
            bitmap.set(i);
        }
        bitmap
    }

    fn word_count(&self) -> usize {
        self.num_bits.div_ceil(WORD_BITS) as usize
    }

    fn set(&mut self, offset: u32) {
        self.words[(offset / WORD_BITS) as usize] |= 1 << (31 - offset % WORD_BITS);
    }

    fn get(&self, offset: u32) -> bool {
        offset < self.num_bits
            && self.words[(offset / WORD_BITS) as usize] & (1 << (31 - offset % WORD_BITS)) != 0
    }

    fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_bits).filter(move |&i| self.get(i))
    }

    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let num_bits = cursor.read_u32()?;
        if num_bits > MAX_BITMAP_BITS {
            return Err(WireError::InvalidData {
                reason: format!("bitmap numBits {} exceeds {}", num_bits, MAX_BITMAP_BITS),
            });
        }
        let mut bitmap = Self::new(num_bits);
        let count = bitmap.word_count();
        for word in bitmap.words.iter_mut().take(count) {
            *word = cursor.read_u32()?;
        }
        // bits past numBits carry no meaning; drop them so equality is exact
        let tail = num_bits % WORD_BITS;
        if tail != 0 {
            bitmap.words[count - 1] &= u32::MAX << (WORD_BITS - tail);
        }
        Ok(bitmap)
    }

    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u32(self.num_bits)?;
        for word in &self.words[..self.word_count()] {
            cursor.write_u32(*word)?;
        }
        Ok(())
    }
}

/// Set of sequence numbers relative to a base (ACKNACK readerSNState, GAP gapList).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNumberSet {
    base: SequenceNumber,
    bitmap: Bitmap,
}

impl SequenceNumberSet {
    pub const MAX_BITS: u32 = MAX_BITMAP_BITS;

    /// Empty set (numBits = 0) with the provided base.
    pub fn empty(base: SequenceNumber) -> Self {
        Self::with_bits(base, 0)
    }

    /// `num_bits` wide set with every bit clear.
    pub fn with_bits(base: SequenceNumber, num_bits: u32) -> Self {
        Self {
            base: SequenceNumber(base.0.max(1)),
            bitmap: Bitmap::new(num_bits),
        }
    }

    /// `num_bits` wide set with every bit set: `[base, base + num_bits)`.
    pub fn with_range(base: SequenceNumber, num_bits: u32) -> Self {
        Self {
            base: SequenceNumber(base.0.max(1)),
            bitmap: Bitmap::full(num_bits),
        }
    }

    /// Create from explicit sequence numbers (must be >= base and < base + 256).
    ///
    /// The bit count is the smallest one that covers the highest number.
    pub fn from_sequences(base: SequenceNumber, sequences: &[SequenceNumber]) -> Option<Self> {
        if base.0 < 1 {
            return None;
        }
        let max_offset = sequences.iter().map(|s| s.0.saturating_sub(base.0)).max();
        let num_bits = match max_offset {
            None => 0,
            Some(off) if off < 0 || off >= i64::from(MAX_BITMAP_BITS) => return None,
            Some(off) => off as u32 + 1,
        };
        let mut set = Self::with_bits(base, num_bits);
        for seq in sequences {
            if seq.0 < base.0 {
                return None;
            }
            set.bitmap.set((seq.0 - base.0) as u32);
        }
        Some(set)
    }

    /// Flag `seq` if it falls inside the bitmap range.
    pub fn insert(&mut self, seq: SequenceNumber) -> bool {
        let offset = seq.0.saturating_sub(self.base.0);
        if offset < 0 || offset >= i64::from(self.bitmap.num_bits) {
            return false;
        }
        self.bitmap.set(offset as u32);
        true
    }

    pub fn contains(&self, seq: SequenceNumber) -> bool {
        let offset = seq.0.saturating_sub(self.base.0);
        offset >= 0 && offset < i64::from(self.bitmap.num_bits) && self.bitmap.get(offset as u32)
    }

    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    pub fn num_bits(&self) -> u32 {
        self.bitmap.num_bits
    }

    /// True when no number is flagged.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Flagged sequence numbers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SequenceNumber> + '_ {
        let base = self.base;
        self.bitmap.offsets().map(move |off| base + i64::from(off))
    }
}

impl WireRead for SequenceNumberSet {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let base = SequenceNumber::read_from(cursor)?;
        if base.0 < 1 {
            return Err(WireError::InvalidData {
                reason: format!("sequence number set base {} < 1", base.0),
            });
        }
        let bitmap = Bitmap::read_from(cursor)?;
        Ok(Self { base, bitmap })
    }
}

impl WireWrite for SequenceNumberSet {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.base.write_to(cursor)?;
        self.bitmap.write_to(cursor)
    }
}

/// Set of fragment numbers relative to a base (NACK_FRAG fragmentNumberState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentNumberSet {
    base: u32,
    bitmap: Bitmap,
}

impl FragmentNumberSet {
    /// `num_bits` wide set with every bit clear. Fragment numbers start at 1.
    pub fn with_bits(base: u32, num_bits: u32) -> Self {
        Self {
            base: base.max(1),
            bitmap: Bitmap::new(num_bits),
        }
    }

    pub fn insert(&mut self, fragment: u32) -> bool {
        match fragment.checked_sub(self.base) {
            Some(off) if off < self.bitmap.num_bits => {
                self.bitmap.set(off);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, fragment: u32) -> bool {
        fragment
            .checked_sub(self.base)
            .is_some_and(|off| self.bitmap.get(off))
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn num_bits(&self) -> u32 {
        self.bitmap.num_bits
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let base = self.base;
        self.bitmap.offsets().map(move |off| base + off)
    }
}

impl WireRead for FragmentNumberSet {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let base = cursor.read_u32()?;
        let bitmap = Bitmap::read_from(cursor)?;
        Ok(Self { base, bitmap })
    }
}

impl WireWrite for FragmentNumberSet {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u32(self.base)?;
        self.bitmap.write_to(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteOrder;

    fn sn(v: i64) -> SequenceNumber {
        SequenceNumber(v)
    }

    #[test]
    fn test_sequence_number_parts() {
        let seq = SequenceNumber::from_parts(1, 5);
        assert_eq!(seq.0, (1 << 32) + 5);
        assert_eq!(seq.high(), 1);
        assert_eq!(seq.low(), 5);
        assert_eq!(SequenceNumber::UNKNOWN.high(), -1);
        assert_eq!(SequenceNumber::UNKNOWN.low(), 0);
    }

    #[test]
    fn test_sequence_number_wire_big_endian() {
        let mut buffer = [0u8; 8];
        let mut cursor = CursorMut::new(&mut buffer);
        cursor.set_byte_order(ByteOrder::Big);
        sn(0x1_0000_0002).write_to(&mut cursor).expect("write");
        assert_eq!(buffer, [0, 0, 0, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn test_with_range_sets_every_bit() {
        let set = SequenceNumberSet::with_range(sn(1), 5);
        let flagged: Vec<i64> = set.iter().map(|s| s.0).collect();
        assert_eq!(flagged, vec![1, 2, 3, 4, 5]);
        assert!(!set.contains(sn(6)));
        assert!(!set.contains(sn(0)));
    }

    #[test]
    fn test_msb_first_layout() {
        let set = SequenceNumberSet::from_sequences(sn(10), &[sn(10), sn(41)]).expect("set");
        assert_eq!(set.num_bits(), 32);
        let mut buffer = [0u8; 16];
        let mut cursor = CursorMut::new(&mut buffer);
        cursor.set_byte_order(ByteOrder::Big);
        set.write_to(&mut cursor).expect("write");
        assert_eq!(cursor.position(), 16);
        // word 0: bit 0 (MSB) and bit 31 (LSB)
        assert_eq!(&buffer[12..16], &[0x80, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_from_sequences_rejects_out_of_window() {
        assert!(SequenceNumberSet::from_sequences(sn(10), &[sn(9)]).is_none());
        assert!(SequenceNumberSet::from_sequences(sn(10), &[sn(266)]).is_none());
        assert!(SequenceNumberSet::from_sequences(sn(0), &[]).is_none());
        let set = SequenceNumberSet::from_sequences(sn(10), &[sn(265)]).expect("edge");
        assert_eq!(set.num_bits(), 256);
    }

    #[test]
    fn test_bit_count_clamped() {
        let set = SequenceNumberSet::with_range(sn(1), 1000);
        assert_eq!(set.num_bits(), 256);
        assert_eq!(set.iter().count(), 256);
    }

    #[test]
    fn test_decode_rejects_oversized_bitmap() {
        let mut buffer = [0u8; 12];
        {
            let mut cursor = CursorMut::new(&mut buffer);
            sn(1).write_to(&mut cursor).expect("base");
            cursor.write_u32(257).expect("bits");
        }
        let mut reader = Cursor::with_order(&buffer, ByteOrder::Little);
        assert!(matches!(
            SequenceNumberSet::read_from(&mut reader),
            Err(WireError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_fragment_set_insert_contains() {
        let mut set = FragmentNumberSet::with_bits(4, 8);
        assert!(set.insert(4));
        assert!(set.insert(11));
        assert!(!set.insert(12));
        assert!(!set.insert(3));
        assert!(set.contains(11));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![4, 11]);
    }
}
