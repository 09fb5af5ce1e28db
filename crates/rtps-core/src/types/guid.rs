// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity identity: GuidPrefix, EntityId, Guid, ProtocolVersion, VendorId.

use std::fmt;

use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// RTPS protocol version (2 octets on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    /// RTPS v2.3
    pub const V2_3: Self = Self { major: 2, minor: 3 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V2_3
    }
}

impl WireRead for ProtocolVersion {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let [major, minor] = cursor.read_array::<2>()?;
        Ok(Self { major, minor })
    }
}

impl WireWrite for ProtocolVersion {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&[self.major, self.minor])
    }
}

/// Vendor ID (assigned by OMG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VendorId(pub [u8; 2]);

impl VendorId {
    pub const UNKNOWN: Self = Self([0, 0]);
}

impl WireRead for VendorId {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        Ok(Self(cursor.read_array()?))
    }
}

impl WireWrite for VendorId {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&self.0)
    }
}

/// GUID Prefix (12 bytes)
///
/// Uniquely identifies a participant on the network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GuidPrefix(pub [u8; 12]);

impl GuidPrefix {
    /// Unknown GUID prefix (matches every participant as a destination)
    pub const UNKNOWN: Self = Self([0; 12]);

    pub const fn new(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Debug for GuidPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuidPrefix(")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 && i % 4 == 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl WireRead for GuidPrefix {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        Ok(Self(cursor.read_array()?))
    }
}

impl WireWrite for GuidPrefix {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&self.0)
    }
}

/// Classification carried by the top two bits of the entity kind octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOrigin {
    User,
    VendorSpecific,
    Builtin,
    Reserved,
}

/// Entity ID (4 bytes): 3-byte key + 1-byte kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId(pub [u8; 4]);

impl EntityId {
    pub const UNKNOWN: Self = Self([0x00, 0x00, 0x00, 0x00]);
    pub const PARTICIPANT: Self = Self([0x00, 0x00, 0x01, 0xc1]);
    pub const SEDP_BUILTIN_TOPIC_WRITER: Self = Self([0x00, 0x00, 0x02, 0xc2]);
    pub const SEDP_BUILTIN_TOPIC_READER: Self = Self([0x00, 0x00, 0x02, 0xc7]);
    pub const SEDP_BUILTIN_PUBLICATIONS_WRITER: Self = Self([0x00, 0x00, 0x03, 0xc2]);
    pub const SEDP_BUILTIN_PUBLICATIONS_READER: Self = Self([0x00, 0x00, 0x03, 0xc7]);
    pub const SEDP_BUILTIN_SUBSCRIPTIONS_WRITER: Self = Self([0x00, 0x00, 0x04, 0xc2]);
    pub const SEDP_BUILTIN_SUBSCRIPTIONS_READER: Self = Self([0x00, 0x00, 0x04, 0xc7]);
    pub const SPDP_BUILTIN_PARTICIPANT_WRITER: Self = Self([0x00, 0x01, 0x00, 0xc2]);
    pub const SPDP_BUILTIN_PARTICIPANT_READER: Self = Self([0x00, 0x01, 0x00, 0xc7]);
    pub const P2P_BUILTIN_PARTICIPANT_MESSAGE_WRITER: Self = Self([0x00, 0x02, 0x00, 0xc2]);
    pub const P2P_BUILTIN_PARTICIPANT_MESSAGE_READER: Self = Self([0x00, 0x02, 0x00, 0xc7]);

    /// Writer with key (user-defined)
    pub const KIND_USER_WRITER_WITH_KEY: u8 = 0x02;
    /// Writer without key (user-defined)
    pub const KIND_USER_WRITER_NO_KEY: u8 = 0x03;
    /// Reader without key (user-defined)
    pub const KIND_USER_READER_NO_KEY: u8 = 0x04;
    /// Reader with key (user-defined)
    pub const KIND_USER_READER_WITH_KEY: u8 = 0x07;

    pub const fn new(key: [u8; 3], kind: u8) -> Self {
        Self([key[0], key[1], key[2], kind])
    }

    pub fn key(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    pub fn kind(&self) -> u8 {
        self.0[3]
    }

    pub fn origin(&self) -> EntityOrigin {
        match self.0[3] >> 6 {
            0b00 => EntityOrigin::User,
            0b01 => EntityOrigin::VendorSpecific,
            0b11 => EntityOrigin::Builtin,
            _ => EntityOrigin::Reserved,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin() == EntityOrigin::Builtin
    }

    pub fn is_writer(&self) -> bool {
        matches!(self.0[3] & 0x3f, 0x02 | 0x03)
    }

    pub fn is_reader(&self) -> bool {
        matches!(self.0[3] & 0x3f, 0x04 | 0x07)
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityId({:02x}{:02x}{:02x}{:02x})",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl WireRead for EntityId {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        Ok(Self(cursor.read_array()?))
    }
}

impl WireWrite for EntityId {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_bytes(&self.0)
    }
}

/// GUID (16 bytes) = GuidPrefix (12) + EntityId (4)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    pub prefix: GuidPrefix,
    pub entity_id: EntityId,
}

impl Guid {
    pub const UNKNOWN: Self = Self {
        prefix: GuidPrefix::UNKNOWN,
        entity_id: EntityId::UNKNOWN,
    };

    pub const fn new(prefix: GuidPrefix, entity_id: EntityId) -> Self {
        Self { prefix, entity_id }
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix.0);
        bytes[12..16].copy_from_slice(&self.entity_id.0);
        bytes
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self::new(GuidPrefix(prefix), EntityId(entity_id))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({:?}, {:?})", self.prefix, self.entity_id)
    }
}

impl WireRead for Guid {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let prefix = GuidPrefix::read_from(cursor)?;
        let entity_id = EntityId::read_from(cursor)?;
        Ok(Self::new(prefix, entity_id))
    }
}

impl WireWrite for Guid {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        self.prefix.write_to(cursor)?;
        self.entity_id.write_to(cursor)
    }
}
