// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::too_many_lines)] // Example/test code

//! Message-level codec tests: every submessage kind in both byte orders,
//! bitmap edge sizes, overflow and malformed input.

use std::net::Ipv4Addr;

use rtps_core::parameter::Parameter;
use rtps_core::submessage::{
    AckNack, Data, DataFrag, Gap, Heartbeat, HeartbeatFrag, InfoDestination, InfoReply,
    InfoReplyIp4, InfoSource, InfoTimestamp, NackFrag, Pad, Payload, SecureWrapper,
    UnknownSubmessage,
};
use rtps_core::types::{
    FragmentNumberSet, LocatorUdpV4, ProtocolVersion, SequenceNumberSet, VendorId,
};
use rtps_core::wire::ByteOrder;
use rtps_core::{
    EntityId, Error, Guid, GuidPrefix, Locator, Message, ParameterList, SequenceNumber,
    Submessage, SubmessageBody, Time,
};

const PREFIX: GuidPrefix = GuidPrefix([0x11; 12]);
const READER: EntityId = EntityId([0, 0, 1, 0x07]);
const WRITER: EntityId = EntityId([0, 0, 1, 0x02]);

fn every_kind() -> Vec<SubmessageBody> {
    let mut bitmap = SequenceNumberSet::with_bits(SequenceNumber(10), 40);
    bitmap.insert(SequenceNumber(12));
    bitmap.insert(SequenceNumber(49));
    let mut frags = FragmentNumberSet::with_bits(3, 8);
    frags.insert(4);

    let qos = ParameterList::new()
        .with(Parameter::KeyHash([0xAB; 16]))
        .with(Parameter::StatusInfo([0, 0, 0, 1]))
        .with(Parameter::DirectedWrite(Guid::new(PREFIX, READER)));

    vec![
        SubmessageBody::Pad(Pad {
            bytes: vec![0; 4],
        }),
        SubmessageBody::InfoSource(InfoSource {
            protocol_version: ProtocolVersion::V2_3,
            vendor_id: VendorId([0x01, 0x0F]),
            guid_prefix: GuidPrefix([0x22; 12]),
        }),
        SubmessageBody::InfoDestination(InfoDestination {
            guid_prefix: GuidPrefix::UNKNOWN,
        }),
        SubmessageBody::InfoReply(InfoReply {
            unicast: vec![Locator::udp_v4(Ipv4Addr::new(10, 0, 0, 1), 7410)],
            multicast: vec![Locator::udp_v4(Ipv4Addr::new(239, 255, 0, 1), 7400)],
        }),
        SubmessageBody::InfoReplyIp4(InfoReplyIp4 {
            unicast: LocatorUdpV4::new(Ipv4Addr::new(192, 168, 1, 2), 7411),
            multicast: None,
        }),
        SubmessageBody::InfoTimestamp(InfoTimestamp {
            timestamp: Some(Time::new(1_700_000_000, 0x8000_0000)),
        }),
        SubmessageBody::InfoTimestamp(InfoTimestamp { timestamp: None }),
        SubmessageBody::Heartbeat(Heartbeat {
            reader_id: READER,
            writer_id: WRITER,
            first_sn: SequenceNumber(1),
            last_sn: SequenceNumber(0x1_0000_0005),
            count: 7,
            final_flag: false,
            liveliness_flag: true,
        }),
        SubmessageBody::AckNack(AckNack {
            reader_id: READER,
            writer_id: WRITER,
            reader_sn_state: bitmap,
            count: 3,
            final_flag: true,
        }),
        SubmessageBody::Gap(Gap::range(READER, WRITER, SequenceNumber(3), SequenceNumber(9))),
        SubmessageBody::HeartbeatFrag(HeartbeatFrag {
            reader_id: READER,
            writer_id: WRITER,
            writer_sn: SequenceNumber(4),
            last_fragment_num: 12,
            count: 2,
        }),
        SubmessageBody::NackFrag(NackFrag {
            reader_id: READER,
            writer_id: WRITER,
            writer_sn: SequenceNumber(4),
            fragment_number_state: frags,
            count: 5,
        }),
        SubmessageBody::SecureWrapper(SecureWrapper {
            transformation_kind: 0x0000_0102,
            transformation_id: [9; 8],
            cipher_text: vec![0xDE, 0xAD, 0xBE, 0xEF],
            single_submessage: false,
        }),
        SubmessageBody::DataFrag(DataFrag {
            extra_flags: 0,
            reader_id: READER,
            writer_id: WRITER,
            writer_sn: SequenceNumber(4),
            fragment_starting_num: 1,
            fragments_in_submessage: 2,
            fragment_size: 4,
            sample_size: 12,
            inline_qos: None,
            key_flag: false,
            fragments: vec![1, 2, 3, 4, 5, 6, 7, 8],
        }),
        SubmessageBody::Data(Data {
            extra_flags: 0,
            reader_id: READER,
            writer_id: WRITER,
            writer_sn: SequenceNumber(6),
            inline_qos: Some(qos),
            payload: Some(Payload::Key(vec![0, 1, 0, 0, 0, 0, 0, 6])),
        }),
        SubmessageBody::Data(Data::new(
            EntityId::UNKNOWN,
            WRITER,
            SequenceNumber(7),
            Payload::Data(vec![0x00, 0x01, 0x00, 0x00, 0x2A]),
        )),
    ]
}

fn roundtrip(order: ByteOrder) {
    let mut message = Message::new(PREFIX);
    for body in every_kind() {
        message.push(Submessage::new(body).with_byte_order(order));
    }
    let unknown_flags = order.flag();
    message.submessages.insert(
        2,
        Submessage::from(UnknownSubmessage {
            kind: 0x80,
            flags: unknown_flags,
            bytes: vec![1, 2, 3, 4, 5, 6, 7, 8],
        }),
    );

    let (bytes, outcome) = message.to_bytes(4096).expect("encode");
    assert!(!outcome.overflowed);
    assert_eq!(outcome.submessages_written, message.len());
    assert_eq!(bytes.len(), outcome.len);

    let decoded = Message::decode(&bytes).expect("decode");
    assert_eq!(decoded, message, "byte order {:?}", order);
}

#[test]
fn test_every_kind_roundtrips_little_endian() {
    roundtrip(ByteOrder::Little);
}

#[test]
fn test_every_kind_roundtrips_big_endian() {
    roundtrip(ByteOrder::Big);
}

#[test]
fn test_mixed_byte_orders_in_one_message() {
    let message = Message::new(PREFIX)
        .with(Submessage::new(SubmessageBody::InfoDestination(InfoDestination {
            guid_prefix: PREFIX,
        })).with_byte_order(ByteOrder::Big))
        .with(Heartbeat::new(
            READER,
            WRITER,
            SequenceNumber(1),
            SequenceNumber(3),
            1,
        ));
    let (bytes, _) = message.to_bytes(256).expect("encode");
    assert_eq!(Message::decode(&bytes).expect("decode"), message);
}

#[test]
fn test_sequence_number_set_sizes() {
    for num_bits in [0u32, 1, 32, 255, 256] {
        let base = SequenceNumber(1000);
        let mut set = SequenceNumberSet::with_bits(base, num_bits);
        if num_bits > 0 {
            set.insert(base);
            set.insert(base + i64::from(num_bits - 1));
        }
        let expected: Vec<SequenceNumber> = set.iter().collect();

        let message = Message::new(PREFIX).with(AckNack {
            reader_id: READER,
            writer_id: WRITER,
            reader_sn_state: set,
            count: 1,
            final_flag: false,
        });
        let (bytes, _) = message.to_bytes(512).expect("encode");
        let decoded = Message::decode(&bytes).expect("decode");
        match &decoded.submessages[0].body {
            SubmessageBody::AckNack(an) => {
                assert_eq!(an.reader_sn_state.base(), base);
                assert_eq!(an.reader_sn_state.num_bits(), num_bits);
                assert_eq!(an.reader_sn_state.iter().collect::<Vec<_>>(), expected);
            }
            other => panic!("expected acknack, got {:?}", other),
        }
    }
}

#[test]
fn test_last_length_field_is_zero() {
    let message = Message::new(PREFIX)
        .with(Heartbeat::new(READER, WRITER, SequenceNumber(1), SequenceNumber(1), 1))
        .with(Heartbeat::new(READER, WRITER, SequenceNumber(1), SequenceNumber(2), 2));
    let (bytes, _) = message.to_bytes(256).expect("encode");

    // 20-byte header, then two 32-byte heartbeats
    assert_eq!(bytes.len(), 84);
    assert_eq!(&bytes[22..24], &28u16.to_le_bytes());
    assert_eq!(&bytes[54..56], &[0, 0]);
    assert_eq!(Message::decode(&bytes).expect("decode"), message);
}

#[test]
fn test_overflow_commits_whole_submessages_only() {
    let mut message = Message::new(PREFIX);
    for count in 1..=3 {
        message.push(Heartbeat::new(
            READER,
            WRITER,
            SequenceNumber(1),
            SequenceNumber(2),
            count,
        ));
    }
    let mut buffer = [0u8; 90];
    let outcome = message.encode_into(&mut buffer).expect("header fits");
    assert!(outcome.overflowed);
    assert_eq!(outcome.submessages_written, 2);
    assert_eq!(outcome.len, 84);

    let decoded = Message::decode(&buffer[..outcome.len]).expect("decode");
    assert_eq!(decoded.len(), 2);
}

#[test]
fn test_header_must_fit() {
    let message = Message::new(PREFIX);
    let mut buffer = [0u8; 12];
    assert!(matches!(
        message.encode_into(&mut buffer),
        Err(Error::BufferOverflow { .. })
    ));
}

#[test]
fn test_malformed_inputs() {
    assert!(matches!(
        Message::decode(&[0x52, 0x54, 0x50, 0x53]),
        Err(Error::MalformedMessage { .. })
    ));

    let (mut bytes, _) = Message::new(PREFIX).to_bytes(64).expect("encode");
    bytes[0] = b'X';
    assert!(matches!(
        Message::decode(&bytes),
        Err(Error::MalformedMessage { .. })
    ));

    // heartbeat cut in the middle of its body
    let (bytes, _) = Message::new(PREFIX)
        .with(Heartbeat::new(READER, WRITER, SequenceNumber(1), SequenceNumber(2), 1))
        .to_bytes(64)
        .expect("encode");
    assert!(matches!(
        Message::decode(&bytes[..40]),
        Err(Error::MalformedMessage { .. })
    ));
}

#[test]
fn test_data_with_data_and_key_flags_is_rejected() {
    let (mut bytes, _) = Message::new(PREFIX)
        .with(Data::new(
            READER,
            WRITER,
            SequenceNumber(1),
            Payload::Data(vec![1, 2, 3, 4]),
        ))
        .to_bytes(128)
        .expect("encode");
    // set K next to D on the DATA flags octet
    bytes[21] |= 0x08;
    assert!(matches!(
        Message::decode(&bytes),
        Err(Error::MalformedMessage { .. })
    ));
}

#[test]
fn test_unknown_kind_is_skipped_and_preserved() {
    let message = Message::new(PREFIX)
        .with(UnknownSubmessage {
            kind: 0x7F,
            flags: 0x01,
            bytes: vec![0xFF; 12],
        })
        .with(Heartbeat::new(READER, WRITER, SequenceNumber(1), SequenceNumber(1), 1));
    let (bytes, _) = message.to_bytes(128).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");
    assert!(matches!(decoded.submessages[0].body, SubmessageBody::Unknown(_)));
    assert!(matches!(decoded.submessages[1].body, SubmessageBody::Heartbeat(_)));
}
