// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ParameterList codec (inline QoS of DATA / DATA_FRAG).
//!
//! ```text
//!   0...2...........8...............16.............24...............32
//!  +---------------+---------------+---------------+---------------+
//!  |        parameterId            |           length              |
//!  +---------------+---------------+---------------+---------------+
//!  ~                 value (length octets, 4-aligned)              ~
//!  +---------------+---------------+---------------+---------------+
//!  ~                          ... repeated ...                     ~
//!  +---------------+---------------+---------------+---------------+
//!  |    PID_SENTINEL (0x0001)      |              0                |
//!  +---------------+---------------+---------------+---------------+
//! ```
//!
//! Unrecognized parameters are kept as opaque [`Parameter::Unknown`] values
//! so a list can be relayed unchanged.

use crate::cache::ChangeKind;
use crate::types::{Guid, SequenceNumber};
use crate::wire::{Cursor, CursorMut, WireError, WireRead, WireResult, WireWrite};

pub const PID_PAD: u16 = 0x0000;
pub const PID_SENTINEL: u16 = 0x0001;
pub const PID_TOPIC_NAME: u16 = 0x0005;
pub const PID_VENDOR_ID: u16 = 0x0016;
pub const PID_CONTENT_FILTER_INFO: u16 = 0x0055;
pub const PID_COHERENT_SET: u16 = 0x0056;
pub const PID_DIRECTED_WRITE: u16 = 0x0057;
pub const PID_KEY_HASH: u16 = 0x0070;
pub const PID_STATUS_INFO: u16 = 0x0071;

/// StatusInfo flag: instance disposed.
pub const STATUS_INFO_DISPOSED: u8 = 0x01;
/// StatusInfo flag: instance unregistered.
pub const STATUS_INFO_UNREGISTERED: u8 = 0x02;

/// One inline QoS parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// PID_STATUS_INFO: 4 octets, flags in the last one.
    StatusInfo([u8; 4]),
    /// PID_KEY_HASH: 16-octet instance key hash.
    KeyHash([u8; 16]),
    /// PID_DIRECTED_WRITE: sample is meant for this reader only.
    DirectedWrite(Guid),
    /// PID_COHERENT_SET: first sequence number of the coherent set.
    CoherentSet(SequenceNumber),
    /// PID_TOPIC_NAME: CDR string.
    TopicName(String),
    /// Any other id, value kept verbatim.
    Unknown { id: u16, value: Vec<u8> },
}

impl Parameter {
    pub fn id(&self) -> u16 {
        match self {
            Parameter::StatusInfo(_) => PID_STATUS_INFO,
            Parameter::KeyHash(_) => PID_KEY_HASH,
            Parameter::DirectedWrite(_) => PID_DIRECTED_WRITE,
            Parameter::CoherentSet(_) => PID_COHERENT_SET,
            Parameter::TopicName(_) => PID_TOPIC_NAME,
            Parameter::Unknown { id, .. } => *id,
        }
    }

    /// StatusInfo carrying the flags of a change kind.
    pub fn status_info(kind: ChangeKind) -> Self {
        let flags = match kind {
            ChangeKind::Alive => 0,
            ChangeKind::Disposed => STATUS_INFO_DISPOSED,
            ChangeKind::Unregistered => STATUS_INFO_UNREGISTERED,
            ChangeKind::DisposedUnregistered => STATUS_INFO_DISPOSED | STATUS_INFO_UNREGISTERED,
        };
        Parameter::StatusInfo([0, 0, 0, flags])
    }

    fn read_value(id: u16, value: &[u8], cursor: &Cursor<'_>) -> WireResult<Self> {
        let mut sub = Cursor::with_order(value, cursor.byte_order());
        let param = match id {
            PID_STATUS_INFO => Parameter::StatusInfo(sub.read_array()?),
            PID_KEY_HASH => Parameter::KeyHash(sub.read_array()?),
            PID_DIRECTED_WRITE => Parameter::DirectedWrite(Guid::read_from(&mut sub)?),
            PID_COHERENT_SET => Parameter::CoherentSet(SequenceNumber::read_from(&mut sub)?),
            PID_TOPIC_NAME => Parameter::TopicName(read_cdr_string(&mut sub)?),
            _ => Parameter::Unknown {
                id,
                value: value.to_vec(),
            },
        };
        Ok(param)
    }

    fn write_value(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        match self {
            Parameter::StatusInfo(flags) => cursor.write_bytes(flags),
            Parameter::KeyHash(hash) => cursor.write_bytes(hash),
            Parameter::DirectedWrite(guid) => guid.write_to(cursor),
            Parameter::CoherentSet(seq) => seq.write_to(cursor),
            Parameter::TopicName(name) => write_cdr_string(cursor, name),
            Parameter::Unknown { value, .. } => cursor.write_bytes(value),
        }
    }
}

fn read_cdr_string(cursor: &mut Cursor<'_>) -> WireResult<String> {
    let len = cursor.read_u32()? as usize;
    let bytes = cursor.read_bytes(len)?;
    let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    String::from_utf8(text.to_vec()).map_err(|_| WireError::InvalidData {
        reason: "string parameter is not UTF-8".into(),
    })
}

fn write_cdr_string(cursor: &mut CursorMut<'_>, text: &str) -> WireResult<()> {
    cursor.write_u32(text.len() as u32 + 1)?;
    cursor.write_bytes(text.as_bytes())?;
    cursor.write_u8(0)
}

/// Sentinel-terminated list of parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterList {
    params: Vec<Parameter>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// First parameter with the given id.
    pub fn get(&self, id: u16) -> Option<&Parameter> {
        self.params.iter().find(|p| p.id() == id)
    }

    pub fn key_hash(&self) -> Option<[u8; 16]> {
        self.params.iter().find_map(|p| match p {
            Parameter::KeyHash(hash) => Some(*hash),
            _ => None,
        })
    }

    pub fn status_info(&self) -> Option<[u8; 4]> {
        self.params.iter().find_map(|p| match p {
            Parameter::StatusInfo(flags) => Some(*flags),
            _ => None,
        })
    }

    /// Every DirectedWrite target. Empty means "all readers".
    pub fn directed_writes(&self) -> Vec<Guid> {
        self.params
            .iter()
            .filter_map(|p| match p {
                Parameter::DirectedWrite(guid) => Some(*guid),
                _ => None,
            })
            .collect()
    }

    /// Change kind derived from StatusInfo (Alive when absent).
    pub fn change_kind(&self) -> ChangeKind {
        let flags = self.status_info().map_or(0, |s| s[3]);
        match (
            flags & STATUS_INFO_DISPOSED != 0,
            flags & STATUS_INFO_UNREGISTERED != 0,
        ) {
            (false, false) => ChangeKind::Alive,
            (true, false) => ChangeKind::Disposed,
            (false, true) => ChangeKind::Unregistered,
            (true, true) => ChangeKind::DisposedUnregistered,
        }
    }
}

impl WireRead for ParameterList {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let mut list = ParameterList::new();
        loop {
            cursor.align(4)?;
            let id = cursor.read_u16()?;
            let length = cursor.read_u16()? as usize;
            if id == PID_SENTINEL {
                break;
            }
            let value = cursor.read_bytes(length)?;
            cursor.align(4)?;
            if id == PID_PAD {
                continue;
            }
            match Parameter::read_value(id, value, cursor) {
                Ok(param) => list.push(param),
                Err(err) => {
                    log::debug!("[PARAM] keeping 0x{:04x} opaque: {}", id, err);
                    list.push(Parameter::Unknown {
                        id,
                        value: value.to_vec(),
                    });
                }
            }
        }
        Ok(list)
    }
}

impl WireWrite for ParameterList {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        for param in &self.params {
            cursor.align(4)?;
            cursor.write_u16(param.id())?;
            let length_at = cursor.position();
            cursor.write_u16(0)?;
            let start = cursor.position();
            param.write_value(cursor)?;
            cursor.align(4)?;
            let length = cursor.position() - start;
            let length = u16::try_from(length).map_err(|_| WireError::InvalidData {
                reason: format!("parameter 0x{:04x} longer than 65535 octets", param.id()),
            })?;
            cursor.patch_u16(length_at, length)?;
        }
        cursor.align(4)?;
        cursor.write_u16(PID_SENTINEL)?;
        cursor.write_u16(0)
    }
}
