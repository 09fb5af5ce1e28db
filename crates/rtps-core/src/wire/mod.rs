// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level wire access for RTPS messages.
//!
//! RTPS encodes every multi-byte field in the byte order selected by the
//! E flag (bit 0) of the enclosing submessage header. Network order (big
//! endian) applies when the flag is clear. The cursors here carry that
//! choice as mutable state so a message parser can switch it per
//! submessage before decoding the body.

pub mod cursor;

use std::fmt;

pub use cursor::{Cursor, CursorMut};

/// Byte order of the multi-byte fields that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Network order, E flag clear.
    Big,
    /// E flag set.
    #[default]
    Little,
}

impl ByteOrder {
    /// Byte order selected by a submessage flags octet.
    pub fn from_flags(flags: u8) -> Self {
        if flags & 0x01 != 0 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Value of the E flag for this byte order.
    pub fn flag(self) -> u8 {
        match self {
            ByteOrder::Big => 0x00,
            ByteOrder::Little => 0x01,
        }
    }
}

/// Low-level wire failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Read past the end of the input.
    BufferUnderrun { offset: usize, needed: usize },
    /// Write past the capacity of the destination.
    BufferOverflow { offset: usize, needed: usize },
    /// Bytes were present but do not form a valid value.
    InvalidData { reason: String },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::BufferUnderrun { offset, needed } => {
                write!(f, "buffer underrun at offset {}: {} bytes needed", offset, needed)
            }
            WireError::BufferOverflow { offset, needed } => {
                write!(f, "buffer overflow at offset {}: {} bytes needed", offset, needed)
            }
            WireError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for WireError {}

pub type WireResult<T> = core::result::Result<T, WireError>;

/// Value with a fixed RTPS wire layout that can be decoded from a [`Cursor`].
pub trait WireRead: Sized {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self>;
}

/// Value with a fixed RTPS wire layout that can be encoded into a [`CursorMut`].
pub trait WireWrite {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()>;
}
