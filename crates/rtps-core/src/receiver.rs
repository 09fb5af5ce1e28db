// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-message receive context and in-order submessage routing.
//!
//! INFO_* submessages do not reach endpoints. They update a
//! [`ReceiveContext`] that every later submessage of the same message
//! inherits, so routing is strictly sequential within one message.
//!
//! | Submessage | Effect on the context |
//! |---|---|
//! | INFO_DST | destination prefix (UNKNOWN means "this participant") |
//! | INFO_SRC | source prefix, version, vendor; clears reply locators and timestamp |
//! | INFO_TS | source timestamp (or none if invalidated) |
//! | INFO_REPLY / INFO_REPLY_IP4 | reply locators |
//!
//! Entity submessages are only handed to the [`SubmessageHandler`] while the
//! destination prefix is ours.

use std::time::Instant;

use crate::message::Message;
use crate::submessage::{
    AckNack, Data, DataFrag, Gap, Heartbeat, HeartbeatFrag, NackFrag, SubmessageBody,
};
use crate::types::{EntityId, Guid, GuidPrefix, Locator, ProtocolVersion, Time, VendorId};

/// Interpretation state carried across the submessages of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveContext {
    pub source_version: ProtocolVersion,
    pub source_vendor_id: VendorId,
    pub source_guid_prefix: GuidPrefix,
    pub dest_guid_prefix: GuidPrefix,
    pub unicast_reply_locators: Vec<Locator>,
    pub multicast_reply_locators: Vec<Locator>,
    /// Timestamp from the latest INFO_TS, if any.
    pub timestamp: Option<Time>,
    /// When the datagram was taken off the inbound queue.
    pub received_at: Instant,
    /// Wall-clock arrival time, used for samples without INFO_TS.
    pub received_time: Time,
}

impl ReceiveContext {
    /// Initial context for a message received by `local_prefix`.
    pub fn new(local_prefix: GuidPrefix, message: &Message, received_at: Instant) -> Self {
        Self {
            source_version: message.header.protocol_version,
            source_vendor_id: message.header.vendor_id,
            source_guid_prefix: message.header.guid_prefix,
            dest_guid_prefix: local_prefix,
            unicast_reply_locators: Vec::new(),
            multicast_reply_locators: Vec::new(),
            timestamp: None,
            received_at,
            received_time: Time::now(),
        }
    }

    /// Source timestamp of the current submessage, or the arrival time.
    pub fn source_timestamp(&self) -> Time {
        self.timestamp.unwrap_or(self.received_time)
    }

    /// Guid of the remote entity `entity_id` in the current source participant.
    pub fn source_guid(&self, entity_id: EntityId) -> Guid {
        Guid::new(self.source_guid_prefix, entity_id)
    }
}

/// Outcome of handing one submessage to one local endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The endpoint acted on the submessage.
    Accepted,
    /// Duplicate or out-of-date event (old count, already received sample,
    /// inside a suppression window).
    Stale,
    /// The sample is addressed (DirectedWrite) to other readers.
    Filtered,
    /// The remote entity is not matched with the endpoint.
    UnknownPeer(Guid),
    /// The endpoint does not handle this submessage kind.
    Ignored,
}

/// Receiver of entity submessages after context processing.
///
/// Every method defaults to a no-op so implementors pick what they route.
pub trait SubmessageHandler {
    fn on_data(&self, _ctx: &ReceiveContext, _data: &Data) {}
    fn on_data_frag(&self, _ctx: &ReceiveContext, _frag: &DataFrag) {}
    fn on_heartbeat(&self, _ctx: &ReceiveContext, _heartbeat: &Heartbeat) {}
    fn on_heartbeat_frag(&self, _ctx: &ReceiveContext, _heartbeat: &HeartbeatFrag) {}
    fn on_acknack(&self, _ctx: &ReceiveContext, _acknack: &AckNack) {}
    fn on_nack_frag(&self, _ctx: &ReceiveContext, _nack: &NackFrag) {}
    fn on_gap(&self, _ctx: &ReceiveContext, _gap: &Gap) {}
}

/// Route the submessages of `message`, in order, to `handler`.
///
/// Messages whose header prefix is `local_prefix` are our own traffic
/// looped back and are ignored. Returns the number of entity submessages
/// handed to the handler.
pub fn dispatch<H: SubmessageHandler + ?Sized>(
    message: &Message,
    local_prefix: GuidPrefix,
    received_at: Instant,
    handler: &H,
) -> usize {
    if message.header.guid_prefix == local_prefix {
        log::trace!("[RECEIVER] ignoring message from own prefix");
        return 0;
    }

    let mut ctx = ReceiveContext::new(local_prefix, message, received_at);
    let mut routed = 0;

    for submessage in &message.submessages {
        match &submessage.body {
            SubmessageBody::InfoDestination(info) => {
                ctx.dest_guid_prefix = if info.guid_prefix.is_unknown() {
                    local_prefix
                } else {
                    info.guid_prefix
                };
            }
            SubmessageBody::InfoSource(info) => {
                ctx.source_version = info.protocol_version;
                ctx.source_vendor_id = info.vendor_id;
                ctx.source_guid_prefix = info.guid_prefix;
                ctx.unicast_reply_locators.clear();
                ctx.multicast_reply_locators.clear();
                ctx.timestamp = None;
            }
            SubmessageBody::InfoTimestamp(info) => {
                ctx.timestamp = info.timestamp;
            }
            SubmessageBody::InfoReply(info) => {
                ctx.unicast_reply_locators = info.unicast.clone();
                if !info.multicast.is_empty() {
                    ctx.multicast_reply_locators = info.multicast.clone();
                }
            }
            SubmessageBody::InfoReplyIp4(info) => {
                ctx.unicast_reply_locators = vec![info.unicast.to_locator()];
                if let Some(multicast) = info.multicast {
                    ctx.multicast_reply_locators = vec![multicast.to_locator()];
                }
            }
            SubmessageBody::Pad(_) | SubmessageBody::SecureWrapper(_) => {}
            SubmessageBody::Unknown(unknown) => {
                log::trace!("[RECEIVER] skipping unknown submessage 0x{:02x}", unknown.kind);
            }
            body => {
                if ctx.dest_guid_prefix != local_prefix {
                    log::trace!(
                        "[RECEIVER] submessage 0x{:02x} addressed to {:?}, skipped",
                        body.kind(),
                        ctx.dest_guid_prefix
                    );
                    continue;
                }
                routed += route(&ctx, body, handler);
            }
        }
    }

    routed
}

fn route<H: SubmessageHandler + ?Sized>(
    ctx: &ReceiveContext,
    body: &SubmessageBody,
    handler: &H,
) -> usize {
    log::trace!(
        "[RECEIVER] dispatch 0x{:02x} from {:?}",
        body.kind(),
        ctx.source_guid_prefix
    );
    match body {
        SubmessageBody::Data(data) => handler.on_data(ctx, data),
        SubmessageBody::DataFrag(frag) => handler.on_data_frag(ctx, frag),
        SubmessageBody::Heartbeat(hb) => handler.on_heartbeat(ctx, hb),
        SubmessageBody::HeartbeatFrag(hb) => handler.on_heartbeat_frag(ctx, hb),
        SubmessageBody::AckNack(an) => handler.on_acknack(ctx, an),
        SubmessageBody::NackFrag(nf) => handler.on_nack_frag(ctx, nf),
        SubmessageBody::Gap(gap) => handler.on_gap(ctx, gap),
        _ => return 0,
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submessage::{InfoDestination, InfoReplyIp4, InfoSource, InfoTimestamp, Payload};
    use crate::types::{EntityId, LocatorUdpV4, SequenceNumber, SequenceNumberSet};
    use parking_lot::Mutex;
    use std::net::Ipv4Addr;

    const LOCAL: GuidPrefix = GuidPrefix([1; 12]);
    const REMOTE: GuidPrefix = GuidPrefix([2; 12]);

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(&'static str, ReceiveContext)>>,
    }

    impl SubmessageHandler for Recorder {
        fn on_data(&self, ctx: &ReceiveContext, _data: &Data) {
            self.seen.lock().push(("data", ctx.clone()));
        }
        fn on_acknack(&self, ctx: &ReceiveContext, _acknack: &AckNack) {
            self.seen.lock().push(("acknack", ctx.clone()));
        }
    }

    fn data() -> Data {
        Data::new(
            EntityId::UNKNOWN,
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(1),
            Payload::Data(vec![1, 2, 3, 4]),
        )
    }

    fn acknack() -> AckNack {
        AckNack {
            reader_id: EntityId([0, 0, 1, 0x07]),
            writer_id: EntityId([0, 0, 1, 0x02]),
            reader_sn_state: SequenceNumberSet::empty(SequenceNumber(1)),
            count: 1,
            final_flag: false,
        }
    }

    #[test]
    fn test_info_destination_filters_foreign_prefix() {
        let recorder = Recorder::default();
        let msg = Message::new(REMOTE)
            .with(InfoDestination {
                guid_prefix: GuidPrefix([7; 12]),
            })
            .with(acknack());
        assert_eq!(dispatch(&msg, LOCAL, Instant::now(), &recorder), 0);

        let msg = Message::new(REMOTE)
            .with(InfoDestination {
                guid_prefix: GuidPrefix::UNKNOWN,
            })
            .with(data());
        assert_eq!(dispatch(&msg, LOCAL, Instant::now(), &recorder), 1);
        assert_eq!(recorder.seen.lock()[0].0, "data");
    }

    #[test]
    fn test_own_prefix_is_ignored() {
        let recorder = Recorder::default();
        let msg = Message::new(LOCAL).with(data());
        assert_eq!(dispatch(&msg, LOCAL, Instant::now(), &recorder), 0);
    }

    #[test]
    fn test_context_is_inherited_in_order() {
        let recorder = Recorder::default();
        let ts = Time::new(100, 0);
        let msg = Message::new(REMOTE)
            .with(data())
            .with(InfoTimestamp {
                timestamp: Some(ts),
            })
            .with(InfoReplyIp4 {
                unicast: LocatorUdpV4::new(Ipv4Addr::new(10, 0, 0, 1), 7400),
                multicast: None,
            })
            .with(data())
            .with(InfoSource {
                protocol_version: ProtocolVersion::V2_3,
                vendor_id: VendorId([9, 9]),
                guid_prefix: GuidPrefix([3; 12]),
            })
            .with(data());
        assert_eq!(dispatch(&msg, LOCAL, Instant::now(), &recorder), 3);

        let seen = recorder.seen.lock();
        assert_eq!(seen[0].1.timestamp, None);
        assert_eq!(seen[0].1.source_guid_prefix, REMOTE);

        assert_eq!(seen[1].1.timestamp, Some(ts));
        assert_eq!(
            seen[1].1.unicast_reply_locators,
            vec![Locator::udp_v4(Ipv4Addr::new(10, 0, 0, 1), 7400)]
        );

        assert_eq!(seen[2].1.source_guid_prefix, GuidPrefix([3; 12]));
        assert_eq!(seen[2].1.source_vendor_id, VendorId([9, 9]));
        assert_eq!(seen[2].1.timestamp, None);
        assert!(seen[2].1.unicast_reply_locators.is_empty());
    }

    #[test]
    fn test_destination_can_switch_back() {
        let recorder = Recorder::default();
        let msg = Message::new(REMOTE)
            .with(InfoDestination {
                guid_prefix: GuidPrefix([7; 12]),
            })
            .with(data())
            .with(InfoDestination {
                guid_prefix: LOCAL,
            })
            .with(data());
        assert_eq!(dispatch(&msg, LOCAL, Instant::now(), &recorder), 1);
    }
}
