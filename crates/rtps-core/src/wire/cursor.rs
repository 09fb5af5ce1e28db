// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read/write cursors with switchable byte order.
//!
//! Alignment is measured from the start of the underlying buffer, which is
//! always the first byte of the RTPS message.

use super::{ByteOrder, WireError, WireResult};

/// Generate aligned write methods for primitive types.
///
/// Each generated method aligns to the type width, checks capacity, then
/// copies the value in the cursor's current byte order.
macro_rules! impl_write {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> WireResult<()> {
            self.align($size)?;
            let bytes = match self.order {
                ByteOrder::Big => value.to_be_bytes(),
                ByteOrder::Little => value.to_le_bytes(),
            };
            self.write_bytes(&bytes)
        }
    };
}

/// Generate aligned read methods for primitive types.
macro_rules! impl_read {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> WireResult<$type> {
            self.align($size)?;
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(match self.order {
                ByteOrder::Big => <$type>::from_be_bytes(bytes),
                ByteOrder::Little => <$type>::from_le_bytes(bytes),
            })
        }
    };
}

/// Generate accessors shared by both cursors.
macro_rules! impl_cursor_common {
    () => {
        pub fn position(&self) -> usize {
            self.offset
        }

        pub fn capacity(&self) -> usize {
            self.buffer.len()
        }

        pub fn remaining(&self) -> usize {
            self.buffer.len().saturating_sub(self.offset)
        }

        pub fn byte_order(&self) -> ByteOrder {
            self.order
        }

        pub fn set_byte_order(&mut self, order: ByteOrder) {
            self.order = order;
        }
    };
}

/// Mutable cursor for encoding (bounds-checked).
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> CursorMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            order: ByteOrder::default(),
        }
    }

    impl_write!(write_u16, u16, 2);
    impl_write!(write_u32, u32, 4);
    impl_write!(write_i32, i32, 4);

    pub fn write_u8(&mut self, value: u8) -> WireResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> WireResult<()> {
        let end = self.offset + data.len();
        if end > self.buffer.len() {
            return Err(WireError::BufferOverflow {
                offset: self.offset,
                needed: data.len(),
            });
        }
        self.buffer[self.offset..end].copy_from_slice(data);
        self.offset = end;
        Ok(())
    }

    /// Advance to the next multiple of `alignment`, zero-filling the padding.
    pub fn align(&mut self, alignment: usize) -> WireResult<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let mask = alignment - 1;
        let aligned = (self.offset + mask) & !mask;
        if aligned > self.buffer.len() {
            return Err(WireError::BufferOverflow {
                offset: self.offset,
                needed: aligned - self.offset,
            });
        }
        self.buffer[self.offset..aligned].fill(0);
        self.offset = aligned;
        Ok(())
    }

    /// Move the write position. Used to rewind a partially written submessage.
    pub fn set_position(&mut self, position: usize) -> WireResult<()> {
        if position > self.buffer.len() {
            return Err(WireError::BufferOverflow {
                offset: self.offset,
                needed: position - self.offset.min(position),
            });
        }
        self.offset = position;
        Ok(())
    }

    /// Overwrite a previously reserved u16 at `at` without moving the cursor.
    pub fn patch_u16(&mut self, at: usize, value: u16) -> WireResult<()> {
        if at + 2 > self.offset {
            return Err(WireError::InvalidData {
                reason: format!("patch at {} beyond written region {}", at, self.offset),
            });
        }
        let bytes = match self.order {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        };
        self.buffer[at..at + 2].copy_from_slice(&bytes);
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }

    impl_cursor_common!();
}

/// Immutable cursor for decoding (bounds-checked, zero-copy).
#[derive(Clone)]
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_order(buffer, ByteOrder::Big)
    }

    pub fn with_order(buffer: &'a [u8], order: ByteOrder) -> Self {
        Self {
            buffer,
            offset: 0,
            order,
        }
    }

    impl_read!(read_u16, u16, 2);
    impl_read!(read_u32, u32, 4);
    impl_read!(read_i32, i32, 4);

    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(WireError::BufferUnderrun {
                offset: self.offset,
                needed: len,
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Read fixed-size array (GuidPrefix, EntityId, key hashes).
    pub fn read_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Advance to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> WireResult<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let mask = alignment - 1;
        let aligned = (self.offset + mask) & !mask;
        if aligned > self.buffer.len() {
            return Err(WireError::BufferUnderrun {
                offset: self.offset,
                needed: aligned - self.offset,
            });
        }
        self.offset = aligned;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> WireResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    impl_cursor_common!();
}
