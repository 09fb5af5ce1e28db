// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DATA and DATA_FRAG submessages (RTPS 2.3 Sections 8.3.7.2, 8.3.7.3)
//!
//! ```text
//! 0                   1                   2                   3
//! 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     DATA      |X|X|X|X|K|D|Q|E|      octetsToNextHeader       |
//! +---------------+---------------+-------------------------------+
//! |          extraFlags           |      octetsToInlineQos        |
//! +-------------------------------+-------------------------------+
//! |                         readerId                              |
//! +---------------------------------------------------------------+
//! |                         writerId                              |
//! +---------------------------------------------------------------+
//! +                    writerSN (SequenceNumber)                  +
//! +---------------------------------------------------------------+
//! ~                 inlineQos (ParameterList) [Q]                 ~
//! +---------------------------------------------------------------+
//! ~               serializedPayload [D or K]                      ~
//! +---------------------------------------------------------------+
//! ```
//!
//! `octetsToInlineQos` counts from the octet after itself. A decoder seeks
//! forward that far before the inline QoS so vendor extensions placed
//! after writerSN are skipped.

use super::{invalid, Frame, SubmessageCodec, KIND_DATA, KIND_DATA_FRAG};
use crate::config::{DATA_FRAG_OCTETS_TO_INLINE_QOS, DATA_OCTETS_TO_INLINE_QOS};
use crate::error::Result;
use crate::parameter::ParameterList;
use crate::types::{EntityId, SequenceNumber};
use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// Q flag: inline QoS present.
pub const FLAG_INLINE_QOS: u8 = 0x02;
/// D flag (DATA): serialized data present.
pub const FLAG_DATA: u8 = 0x04;
/// K flag (DATA): serialized key present.
pub const FLAG_KEY: u8 = 0x08;
/// K flag (DATA_FRAG): fragments hold a serialized key.
pub const FRAG_FLAG_KEY: u8 = 0x04;

/// Serialized payload of a DATA submessage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Serialized sample (D flag).
    Data(Vec<u8>),
    /// Serialized key only (K flag), used for dispose/unregister.
    Key(Vec<u8>),
}

impl Payload {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Payload::Data(bytes) | Payload::Key(bytes) => bytes,
        }
    }
}

/// One sample of a writer's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data {
    pub extra_flags: u16,
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    pub inline_qos: Option<ParameterList>,
    pub payload: Option<Payload>,
}

impl Data {
    pub fn new(
        reader_id: EntityId,
        writer_id: EntityId,
        writer_sn: SequenceNumber,
        payload: Payload,
    ) -> Self {
        Self {
            extra_flags: 0,
            reader_id,
            writer_id,
            writer_sn,
            inline_qos: None,
            payload: Some(payload),
        }
    }
}

/// Read extraFlags/octetsToInlineQos and the fixed id fields, then seek
/// to where the inline QoS starts.
fn read_fixed_prefix(
    cursor: &mut Cursor<'_>,
) -> WireResult<(u16, usize, usize, EntityId, EntityId, SequenceNumber)> {
    let extra_flags = cursor.read_u16()?;
    let octets_to_inline_qos = cursor.read_u16()? as usize;
    let anchor = cursor.position();
    let reader_id = EntityId::read_from(cursor)?;
    let writer_id = EntityId::read_from(cursor)?;
    let writer_sn = SequenceNumber::read_from(cursor)?;
    Ok((
        extra_flags,
        octets_to_inline_qos,
        anchor,
        reader_id,
        writer_id,
        writer_sn,
    ))
}

fn seek_inline_qos(cursor: &mut Cursor<'_>, anchor: usize, octets_to_inline_qos: usize) -> WireResult<()> {
    let consumed = cursor.position() - anchor;
    if octets_to_inline_qos > consumed {
        cursor.skip(octets_to_inline_qos - consumed)?;
    }
    Ok(())
}

impl SubmessageCodec for Data {
    const KIND: u8 = KIND_DATA;

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.inline_qos.is_some() {
            flags |= FLAG_INLINE_QOS;
        }
        match self.payload {
            Some(Payload::Data(_)) => flags |= FLAG_DATA,
            Some(Payload::Key(_)) => flags |= FLAG_KEY,
            None => {}
        }
        flags
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let has_data = frame.header.has_flag(FLAG_DATA);
        let has_key = frame.header.has_flag(FLAG_KEY);
        if has_data && has_key {
            return Err(invalid(KIND_DATA, "data and key flags both set"));
        }

        let (extra_flags, octets_to_inline_qos, anchor, reader_id, writer_id, writer_sn) =
            read_fixed_prefix(cursor)?;
        seek_inline_qos(cursor, anchor, octets_to_inline_qos)?;

        let inline_qos = if frame.header.has_flag(FLAG_INLINE_QOS) {
            Some(ParameterList::read_from(cursor)?)
        } else {
            None
        };

        let payload = if has_data || has_key {
            cursor.align(4)?;
            let len = frame.body_remaining(cursor)?;
            let bytes = cursor.read_bytes(len)?.to_vec();
            Some(if has_data {
                Payload::Data(bytes)
            } else {
                Payload::Key(bytes)
            })
        } else {
            None
        };

        Ok(Self {
            extra_flags,
            reader_id,
            writer_id,
            writer_sn,
            inline_qos,
            payload,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u16(self.extra_flags)?;
        cursor.write_u16(DATA_OCTETS_TO_INLINE_QOS)?;
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.writer_sn.write_to(cursor)?;
        if let Some(qos) = &self.inline_qos {
            qos.write_to(cursor)?;
        }
        if let Some(payload) = &self.payload {
            cursor.align(4)?;
            cursor.write_bytes(payload.bytes())?;
        }
        Ok(())
    }
}

/// A slice of a sample too large for one datagram. Reassembly is left to
/// the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrag {
    pub extra_flags: u16,
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    /// First fragment in this submessage (1-based).
    pub fragment_starting_num: u32,
    pub fragments_in_submessage: u16,
    pub fragment_size: u16,
    /// Size of the complete serialized sample.
    pub sample_size: u32,
    pub inline_qos: Option<ParameterList>,
    pub key_flag: bool,
    pub fragments: Vec<u8>,
}

impl SubmessageCodec for DataFrag {
    const KIND: u8 = KIND_DATA_FRAG;

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.inline_qos.is_some() {
            flags |= FLAG_INLINE_QOS;
        }
        if self.key_flag {
            flags |= FRAG_FLAG_KEY;
        }
        flags
    }

    fn read(cursor: &mut Cursor<'_>, frame: &Frame) -> Result<Self> {
        let (extra_flags, octets_to_inline_qos, anchor, reader_id, writer_id, writer_sn) =
            read_fixed_prefix(cursor)?;
        let fragment_starting_num = cursor.read_u32()?;
        let fragments_in_submessage = cursor.read_u16()?;
        let fragment_size = cursor.read_u16()?;
        let sample_size = cursor.read_u32()?;
        seek_inline_qos(cursor, anchor, octets_to_inline_qos)?;

        let inline_qos = if frame.header.has_flag(FLAG_INLINE_QOS) {
            Some(ParameterList::read_from(cursor)?)
        } else {
            None
        };

        cursor.align(4)?;
        let len = frame.body_remaining(cursor)?;
        let fragments = cursor.read_bytes(len)?.to_vec();

        Ok(Self {
            extra_flags,
            reader_id,
            writer_id,
            writer_sn,
            fragment_starting_num,
            fragments_in_submessage,
            fragment_size,
            sample_size,
            inline_qos,
            key_flag: frame.header.has_flag(FRAG_FLAG_KEY),
            fragments,
        })
    }

    fn write(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u16(self.extra_flags)?;
        cursor.write_u16(DATA_FRAG_OCTETS_TO_INLINE_QOS)?;
        self.reader_id.write_to(cursor)?;
        self.writer_id.write_to(cursor)?;
        self.writer_sn.write_to(cursor)?;
        cursor.write_u32(self.fragment_starting_num)?;
        cursor.write_u16(self.fragments_in_submessage)?;
        cursor.write_u16(self.fragment_size)?;
        cursor.write_u32(self.sample_size)?;
        if let Some(qos) = &self.inline_qos {
            qos.write_to(cursor)?;
        }
        cursor.align(4)?;
        cursor.write_bytes(&self.fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parameter::Parameter;
    use crate::submessage::{Submessage, SubmessageBody};
    use crate::wire::ByteOrder;

    fn encode(sm: &Submessage) -> Vec<u8> {
        let mut buffer = vec![0u8; 512];
        let mut cursor = CursorMut::new(&mut buffer);
        sm.write_to(&mut cursor).expect("write");
        let len = cursor.position();
        buffer.truncate(len);
        buffer
    }

    fn sample_data() -> Data {
        Data::new(
            EntityId([0, 0, 1, 0x07]),
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(7),
            Payload::Data(vec![0x00, 0x01, 0x00, 0x00, 0xde, 0xad, 0xbe]),
        )
    }

    #[test]
    fn test_data_header_and_octets_to_inline_qos() {
        let bytes = encode(&Submessage::from(sample_data()));
        assert_eq!(bytes[0], KIND_DATA);
        assert_eq!(bytes[1], 0x05); // E | D
        assert_eq!(&bytes[6..8], &[16, 0]);
        assert_eq!(bytes.len(), 4 + 20 + 7);
        assert_eq!(&bytes[2..4], &[27, 0]);
    }

    #[test]
    fn test_data_with_inline_qos_roundtrip() {
        let mut data = sample_data();
        data.inline_qos = Some(ParameterList::new().with(Parameter::KeyHash([1; 16])));
        data.payload = Some(Payload::Key(vec![1, 2, 3, 4]));
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let sm = Submessage::from(data.clone()).with_byte_order(order);
            let bytes = encode(&sm);
            assert_eq!(bytes[1] & 0x0e, FLAG_INLINE_QOS | FLAG_KEY);
            let mut cursor = Cursor::new(&bytes);
            assert_eq!(Submessage::read_from(&mut cursor).expect("read"), sm);
        }
    }

    #[test]
    fn test_data_and_key_flags_together_rejected() {
        let mut bytes = encode(&Submessage::from(sample_data()));
        bytes[1] |= FLAG_KEY;
        let mut cursor = Cursor::new(&bytes);
        assert!(matches!(
            Submessage::read_from(&mut cursor),
            Err(Error::InvalidSubmessage { kind: KIND_DATA, .. })
        ));
    }

    #[test]
    fn test_octets_to_inline_qos_skips_extension() {
        // DATA (LE) with octetsToInlineQos = 20: 4 unknown octets after writerSN
        let mut bytes = vec![KIND_DATA, 0x05, 0, 0];
        bytes.extend_from_slice(&[0, 0, 20, 0]);
        bytes.extend_from_slice(&[0, 0, 1, 0x07, 0, 0, 1, 0x02]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 3, 0, 0, 0]);
        bytes.extend_from_slice(&[0xEE; 4]);
        bytes.extend_from_slice(&[9, 9, 9, 9]);
        let len = (bytes.len() - 4) as u8;
        bytes[2] = len;

        let mut cursor = Cursor::new(&bytes);
        let sm = Submessage::read_from(&mut cursor).expect("read");
        match sm.body {
            SubmessageBody::Data(data) => {
                assert_eq!(data.writer_sn, SequenceNumber(3));
                assert_eq!(data.payload, Some(Payload::Data(vec![9, 9, 9, 9])));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_payload_runs_to_end() {
        let mut bytes = encode(&Submessage::from(sample_data()));
        bytes[2] = 0;
        bytes[3] = 0;
        let mut cursor = Cursor::new(&bytes);
        let sm = Submessage::read_from(&mut cursor).expect("read");
        assert_eq!(sm, Submessage::from(sample_data()));
    }

    #[test]
    fn test_data_frag_roundtrip_with_key() {
        let frag = DataFrag {
            extra_flags: 0,
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId([0, 0, 1, 0x02]),
            writer_sn: SequenceNumber(2),
            fragment_starting_num: 3,
            fragments_in_submessage: 2,
            fragment_size: 4,
            sample_size: 20,
            inline_qos: None,
            key_flag: true,
            fragments: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        let sm = Submessage::from(frag).with_byte_order(ByteOrder::Big);
        let bytes = encode(&sm);
        assert_eq!(bytes[1], FRAG_FLAG_KEY);
        assert_eq!(&bytes[6..8], &[0, 28]);
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(Submessage::read_from(&mut cursor).expect("read"), sm);
    }
}
