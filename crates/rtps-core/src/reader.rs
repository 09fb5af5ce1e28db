// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader-side reliability engine.
//!
//! # Protocol
//!
//! ```text
//! Remote writer                         RtpsReader
//!      |  DATA(seq)                          |
//!      |-----------------------------------> |  accept_data -> ReaderCache
//!      |  HEARTBEAT(first, last, count)      |
//!      |-----------------------------------> |  schedule AckNack (response delay)
//!      |                                     |  ... poll(now)
//!      |  INFO_DST + ACKNACK(missing set)    |
//!      | <-----------------------------------|
//!      |  GAP(start, end)                    |
//!      |-----------------------------------> |  apply_gap
//! ```
//!
//! AckNacks are never sent from the receive path. They are queued with a
//! deadline and go out on the next [`RtpsReader::poll`] at or after it,
//! computed from the proxy state at that time. Unmatching a writer drops
//! its queued AckNack.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::cache::{CacheChange, ChangeKind, ReaderCache};
use crate::config::EngineConfig;
use crate::message::Message;
use crate::metrics::ReliabilityMetrics;
use crate::proxy::{DataAcceptance, LivelinessChange, ReliabilityKind, WriterProxy};
use crate::receiver::{Delivery, ReceiveContext};
use crate::submessage::{AckNack, Data, Gap, Heartbeat, InfoDestination};
use crate::transport::{destinations, flush, Outbound, Transport};
use crate::types::{EntityId, Guid};

/// Notified when a matched writer's liveliness lease expires or recovers.
pub trait LivelinessListener: Send + Sync {
    fn liveliness_lost(&self, reader: Guid, writer: Guid);
    fn liveliness_restored(&self, reader: Guid, writer: Guid);
}

#[derive(Debug, Clone, Copy)]
struct PendingAckNack {
    writer_guid: Guid,
    deadline: Instant,
}

/// A local reader and its matched writer proxies.
pub struct RtpsReader {
    guid: Guid,
    reliability: ReliabilityKind,
    config: Arc<EngineConfig>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ReaderCache>,
    metrics: Arc<ReliabilityMetrics>,
    listener: Option<Arc<dyn LivelinessListener>>,
    writers: Mutex<HashMap<Guid, WriterProxy>>,
    pending: Mutex<Vec<PendingAckNack>>,
    acknack_count: AtomicU32,
}

impl RtpsReader {
    pub fn new(
        guid: Guid,
        reliability: ReliabilityKind,
        cache: Arc<dyn ReaderCache>,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            guid,
            reliability,
            config,
            transport,
            cache,
            metrics: Arc::new(ReliabilityMetrics::new()),
            listener: None,
            writers: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            acknack_count: AtomicU32::new(0),
        }
    }

    /// Share a metrics instance (typically the participant's).
    pub fn with_metrics(mut self, metrics: Arc<ReliabilityMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_liveliness_listener(mut self, listener: Arc<dyn LivelinessListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn reliability(&self) -> ReliabilityKind {
        self.reliability
    }

    pub fn metrics(&self) -> &Arc<ReliabilityMetrics> {
        &self.metrics
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Start tracking a remote writer. Replaces any previous proxy.
    pub fn matched_writer_add(&self, proxy: WriterProxy) {
        let guid = proxy.remote_guid();
        log::debug!("[READER] {:?} matched writer {:?}", self.guid, guid);
        self.writers.lock().insert(guid, proxy);
    }

    /// Forget a remote writer and cancel its queued AckNack.
    pub fn matched_writer_remove(&self, writer_guid: Guid) -> bool {
        let removed = self.writers.lock().remove(&writer_guid).is_some();
        self.pending.lock().retain(|p| p.writer_guid != writer_guid);
        if removed {
            log::debug!("[READER] {:?} unmatched writer {:?}", self.guid, writer_guid);
        }
        removed
    }

    pub fn has_writer(&self, writer_guid: Guid) -> bool {
        self.writers.lock().contains_key(&writer_guid)
    }

    pub fn matched_writers(&self) -> Vec<Guid> {
        self.writers.lock().keys().copied().collect()
    }

    /// Copy of the proxy state for `writer_guid`.
    pub fn writer_proxy(&self, writer_guid: Guid) -> Option<WriterProxy> {
        self.writers.lock().get(&writer_guid).cloned()
    }

    /// Number of AckNacks waiting for their deadline.
    pub fn pending_acknacks(&self) -> usize {
        self.pending.lock().len()
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    pub fn handle_data(&self, ctx: &ReceiveContext, data: &Data) -> Delivery {
        let writer_guid = ctx.source_guid(data.writer_id);

        let (acceptance, liveliness) = {
            let mut writers = self.writers.lock();
            let Some(proxy) = lookup_or_bootstrap(&mut writers, writer_guid) else {
                log::debug!("[READER] data from unmatched writer {:?}", writer_guid);
                return Delivery::UnknownPeer(writer_guid);
            };
            let liveliness = proxy.assert_liveliness(ctx.received_at);
            (proxy.accept_data(data.writer_sn), liveliness)
        };
        if let Some(change) = liveliness {
            self.notify_liveliness(writer_guid, change);
        }

        match acceptance {
            DataAcceptance::Duplicate => {
                log::trace!("[READER] duplicate {} from {:?}", data.writer_sn, writer_guid);
                self.metrics.increment_stale_events(1);
                return Delivery::Stale;
            }
            DataAcceptance::AcceptedWithGap { missing } => {
                log::warn!(
                    "[READER] {} sample(s) missing before {} from {:?}",
                    missing,
                    data.writer_sn,
                    writer_guid
                );
                self.metrics.record_gap(missing);
            }
            DataAcceptance::Accepted => {}
        }

        // a sample directed elsewhere still counts as received
        if let Some(qos) = &data.inline_qos {
            let targets = qos.directed_writes();
            if !targets.is_empty() && !targets.contains(&self.guid) {
                log::trace!(
                    "[READER] {:?} not a target of directed {}",
                    self.guid,
                    data.writer_sn
                );
                return Delivery::Filtered;
            }
        }

        let kind = data
            .inline_qos
            .as_ref()
            .map_or(ChangeKind::Alive, |qos| qos.change_kind());
        let key_hash = data.inline_qos.as_ref().and_then(|qos| qos.key_hash());
        let payload: Arc<[u8]> = match &data.payload {
            Some(payload) => Arc::from(payload.bytes()),
            None => Arc::from(Vec::new()),
        };

        self.cache.add_change(CacheChange {
            writer_guid,
            sequence_number: data.writer_sn,
            kind,
            key_hash,
            payload,
            timestamp: ctx.source_timestamp(),
        });
        self.metrics.increment_data_received(1);
        log::debug!("[READER] delivered {} from {:?}", data.writer_sn, writer_guid);
        Delivery::Accepted
    }

    pub fn handle_heartbeat(&self, ctx: &ReceiveContext, hb: &Heartbeat) -> Delivery {
        let now = ctx.received_at;
        let writer_guid = ctx.source_guid(hb.writer_id);

        let (delivery, liveliness) = {
            let mut writers = self.writers.lock();
            let Some(proxy) = lookup_or_bootstrap(&mut writers, writer_guid) else {
                log::debug!("[READER] heartbeat from unmatched writer {:?}", writer_guid);
                return Delivery::UnknownPeer(writer_guid);
            };
            if !hb.has_valid_range() {
                log::debug!(
                    "[READER] heartbeat {}..={} from {:?} discarded",
                    hb.first_sn,
                    hb.last_sn,
                    writer_guid
                );
                self.metrics.increment_stale_events(1);
                return Delivery::Stale;
            }
            let liveliness = proxy.assert_liveliness(now);
            if hb.liveliness_flag {
                log::trace!("[READER] liveliness asserted by {:?}", writer_guid);
            }

            if !proxy.heartbeat_received(hb, now, self.config.heartbeat_suppression) {
                log::trace!(
                    "[READER] stale heartbeat count={} from {:?}",
                    hb.count,
                    writer_guid
                );
                self.metrics.increment_stale_events(1);
                (Delivery::Stale, liveliness)
            } else {
                self.metrics.increment_heartbeats_received(1);
                let respond = self.reliability.is_reliable()
                    && proxy.reliability().is_reliable()
                    && (!hb.final_flag || proxy.is_lagging());
                if respond {
                    self.schedule_acknack(writer_guid, now + self.config.heartbeat_response_delay);
                }
                (Delivery::Accepted, liveliness)
            }
        };

        if let Some(change) = liveliness {
            self.notify_liveliness(writer_guid, change);
        }
        delivery
    }

    pub fn handle_gap(&self, ctx: &ReceiveContext, gap: &Gap) -> Delivery {
        let writer_guid = ctx.source_guid(gap.writer_id);
        let end = gap.gap_end();

        let (applied, liveliness) = {
            let mut writers = self.writers.lock();
            let Some(proxy) = writers.get_mut(&writer_guid) else {
                log::debug!("[READER] gap from unmatched writer {:?}", writer_guid);
                return Delivery::UnknownPeer(writer_guid);
            };
            let liveliness = proxy.assert_liveliness(ctx.received_at);
            (proxy.apply_gap(gap.gap_start, end), liveliness)
        };
        if let Some(change) = liveliness {
            self.notify_liveliness(writer_guid, change);
        }

        if applied {
            log::debug!(
                "[READER] gap {}..={} from {:?} applied",
                gap.gap_start,
                end,
                writer_guid
            );
            self.metrics.increment_gaps_applied(1);
            Delivery::Accepted
        } else {
            Delivery::Stale
        }
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Send AckNacks whose deadline has passed and check liveliness leases.
    /// Returns the number of datagrams built.
    pub fn poll(&self, now: Instant) -> usize {
        let due: Vec<Guid> = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            pending.retain(|p| {
                if p.deadline <= now {
                    due.push(p.writer_guid);
                    false
                } else {
                    true
                }
            });
            due
        };

        let mut batch = Vec::new();
        let mut liveliness = Vec::new();
        {
            let mut writers = self.writers.lock();
            for writer_guid in due {
                if let Some(proxy) = writers.get(&writer_guid) {
                    if let Some(out) = self.build_acknack(proxy) {
                        batch.push(out);
                    }
                }
            }
            for proxy in writers.values_mut() {
                if let Some(change) = proxy.check_liveliness(now) {
                    liveliness.push((proxy.remote_guid(), change));
                }
            }
        }

        for (writer_guid, change) in liveliness {
            self.notify_liveliness(writer_guid, change);
        }

        let built = batch.len();
        flush(self.transport.as_ref(), batch, "[READER]");
        built
    }

    fn schedule_acknack(&self, writer_guid: Guid, deadline: Instant) {
        let mut pending = self.pending.lock();
        match pending.iter_mut().find(|p| p.writer_guid == writer_guid) {
            Some(existing) => existing.deadline = existing.deadline.min(deadline),
            None => {
                log::debug!("[READER] acknack to {:?} scheduled", writer_guid);
                pending.push(PendingAckNack {
                    writer_guid,
                    deadline,
                });
            }
        }
    }

    fn build_acknack(&self, proxy: &WriterProxy) -> Option<Outbound> {
        let writer_guid = proxy.remote_guid();
        let locators = destinations(proxy.unicast_locators(), proxy.multicast_locators());
        if locators.is_empty() {
            log::warn!("[READER] no locator for writer {:?}, acknack dropped", writer_guid);
            return None;
        }

        let count = self.acknack_count.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let acknack = AckNack {
            reader_id: self.guid.entity_id,
            writer_id: writer_guid.entity_id,
            reader_sn_state: proxy.sequence_number_set_for_acknack(),
            count,
            final_flag: proxy.is_all_received(),
        };
        log::debug!(
            "[READER] acknack base={} missing={} to {:?}",
            acknack.reader_sn_state.base(),
            acknack.reader_sn_state.iter().count(),
            writer_guid
        );

        let message = Message::new(self.guid.prefix)
            .with(InfoDestination {
                guid_prefix: writer_guid.prefix,
            })
            .with(acknack);
        match message.to_bytes(self.config.max_message_size) {
            Ok((bytes, _)) => {
                self.metrics.increment_acknacks_sent(1);
                Some(Outbound { locators, bytes })
            }
            Err(e) => {
                log::warn!("[READER] acknack encode failed: {}", e);
                None
            }
        }
    }

    fn notify_liveliness(&self, writer_guid: Guid, change: LivelinessChange) {
        match change {
            LivelinessChange::Lost => {
                log::warn!("[READER] writer {:?} liveliness lost", writer_guid)
            }
            LivelinessChange::Restored => {
                log::debug!("[READER] writer {:?} liveliness restored", writer_guid)
            }
        }
        if let Some(listener) = &self.listener {
            match change {
                LivelinessChange::Lost => listener.liveliness_lost(self.guid, writer_guid),
                LivelinessChange::Restored => listener.liveliness_restored(self.guid, writer_guid),
            }
        }
    }
}

/// Proxy for `writer_guid`, creating a best-effort, infinite-lease proxy
/// for the builtin SPDP writer, which is never explicitly matched.
fn lookup_or_bootstrap(
    writers: &mut HashMap<Guid, WriterProxy>,
    writer_guid: Guid,
) -> Option<&mut WriterProxy> {
    if !writers.contains_key(&writer_guid) {
        if writer_guid.entity_id != EntityId::SPDP_BUILTIN_PARTICIPANT_WRITER {
            return None;
        }
        log::debug!("[READER] bootstrap proxy for SPDP writer {:?}", writer_guid);
        writers.insert(
            writer_guid,
            WriterProxy::new(writer_guid, Vec::new())
                .with_reliability(ReliabilityKind::BestEffort)
                .with_lease_duration(None),
        );
    }
    writers.get_mut(&writer_guid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ReaderHistory;
    use crate::parameter::{Parameter, ParameterList};
    use crate::submessage::{Payload, SubmessageBody};
    use crate::transport::LoopbackTransport;
    use crate::types::{GuidPrefix, Locator, SequenceNumber, Time};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    const LOCAL: GuidPrefix = GuidPrefix([1; 12]);
    const REMOTE: GuidPrefix = GuidPrefix([2; 12]);

    struct Fixture {
        reader: RtpsReader,
        history: Arc<ReaderHistory>,
        transport: Arc<LoopbackTransport>,
        writer_guid: Guid,
    }

    fn fixture(reliability: ReliabilityKind) -> Fixture {
        let history = Arc::new(ReaderHistory::new());
        let transport = Arc::new(LoopbackTransport::new());
        let config = Arc::new(
            EngineConfig::default().with_heartbeat_response_delay(Duration::from_millis(100)),
        );
        let reader = RtpsReader::new(
            Guid::new(LOCAL, EntityId([0, 0, 1, 0x07])),
            reliability,
            history.clone(),
            transport.clone(),
            config,
        );
        let writer_guid = Guid::new(REMOTE, EntityId([0, 0, 1, 0x02]));
        reader.matched_writer_add(WriterProxy::new(
            writer_guid,
            vec![Locator::udp_v4(Ipv4Addr::LOCALHOST, 7411)],
        ));
        Fixture {
            reader,
            history,
            transport,
            writer_guid,
        }
    }

    fn ctx(now: Instant) -> ReceiveContext {
        ReceiveContext::new(LOCAL, &Message::new(REMOTE), now)
    }

    fn data(seq: i64) -> Data {
        Data::new(
            EntityId([0, 0, 1, 0x07]),
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(seq),
            Payload::Data(vec![seq as u8]),
        )
    }

    fn heartbeat(first: i64, last: i64, count: u32, final_flag: bool) -> Heartbeat {
        let mut hb = Heartbeat::new(
            EntityId([0, 0, 1, 0x07]),
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(first),
            SequenceNumber(last),
            count,
        );
        hb.final_flag = final_flag;
        hb
    }

    fn sent_acknacks(transport: &LoopbackTransport) -> Vec<AckNack> {
        transport
            .take_datagrams()
            .iter()
            .flat_map(|bytes| Message::decode(bytes).expect("decode").submessages)
            .filter_map(|sm| match sm.body {
                SubmessageBody::AckNack(an) => Some(an),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_data_delivered_once() {
        let f = fixture(ReliabilityKind::Reliable);
        let now = Instant::now();
        assert_eq!(f.reader.handle_data(&ctx(now), &data(1)), Delivery::Accepted);
        assert_eq!(f.reader.handle_data(&ctx(now), &data(1)), Delivery::Stale);
        let changes = f.history.take();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].writer_guid, f.writer_guid);
        assert_eq!(&*changes[0].payload, &[1]);
    }

    #[test]
    fn test_unknown_writer_reported() {
        let f = fixture(ReliabilityKind::Reliable);
        let mut d = data(1);
        d.writer_id = EntityId([0, 0, 9, 0x02]);
        assert!(matches!(
            f.reader.handle_data(&ctx(Instant::now()), &d),
            Delivery::UnknownPeer(_)
        ));
        assert!(f.history.is_empty());
    }

    #[test]
    fn test_directed_write_filters_other_readers() {
        let f = fixture(ReliabilityKind::Reliable);
        let mut d = data(1);
        d.inline_qos = Some(ParameterList::new().with(Parameter::DirectedWrite(Guid::new(
            LOCAL,
            EntityId([0, 0, 8, 0x07]),
        ))));
        assert_eq!(f.reader.handle_data(&ctx(Instant::now()), &d), Delivery::Filtered);
        assert!(f.history.is_empty());

        let mut d = data(2);
        d.inline_qos = Some(
            ParameterList::new().with(Parameter::DirectedWrite(f.reader.guid())),
        );
        assert_eq!(f.reader.handle_data(&ctx(Instant::now()), &d), Delivery::Accepted);
        assert_eq!(f.history.len(), 1);
    }

    #[test]
    fn test_directed_write_elsewhere_is_not_requested_again() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        let mut d = data(1);
        d.inline_qos = Some(ParameterList::new().with(Parameter::DirectedWrite(Guid::new(
            LOCAL,
            EntityId([0, 0, 8, 0x07]),
        ))));
        assert_eq!(f.reader.handle_data(&ctx(t0), &d), Delivery::Filtered);
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(t0), &heartbeat(1, 1, 1, true)),
            Delivery::Accepted
        );
        assert_eq!(f.reader.pending_acknacks(), 0);
        assert_eq!(f.reader.poll(t0 + Duration::from_secs(1)), 0);
        assert!(sent_acknacks(&f.transport).is_empty());

        let proxy = f.reader.writer_proxy(f.writer_guid).expect("proxy");
        assert_eq!(proxy.seq_num_max(), SequenceNumber(1));
        assert!(proxy.is_all_received());
        // the resend is a duplicate, not a second delivery attempt
        assert_eq!(f.reader.handle_data(&ctx(t0), &d), Delivery::Stale);
        assert!(f.history.is_empty());
    }

    #[test]
    fn test_status_info_sets_change_kind() {
        let f = fixture(ReliabilityKind::Reliable);
        let mut d = data(1);
        d.inline_qos = Some(
            ParameterList::new()
                .with(Parameter::KeyHash([4; 16]))
                .with(Parameter::status_info(ChangeKind::Disposed)),
        );
        d.payload = Some(Payload::Key(vec![0, 0, 0, 4]));
        let mut c = ctx(Instant::now());
        c.timestamp = Some(Time::new(42, 0));
        f.reader.handle_data(&c, &d);
        let change = &f.history.take()[0];
        assert_eq!(change.kind, ChangeKind::Disposed);
        assert_eq!(change.key_hash, Some([4; 16]));
        assert_eq!(change.timestamp, Time::new(42, 0));
    }

    #[test]
    fn test_heartbeat_schedules_acknack_after_delay() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(t0), &heartbeat(1, 3, 1, false)),
            Delivery::Accepted
        );
        assert_eq!(f.reader.pending_acknacks(), 1);
        assert_eq!(f.reader.poll(t0 + Duration::from_millis(50)), 0);
        assert_eq!(f.reader.poll(t0 + Duration::from_millis(100)), 1);

        let acks = sent_acknacks(&f.transport);
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].reader_sn_state.base(), SequenceNumber(1));
        assert_eq!(acks[0].reader_sn_state.iter().count(), 3);
        assert!(!acks[0].final_flag);
    }

    #[test]
    fn test_final_heartbeat_only_answered_when_lagging() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        f.reader.handle_data(&ctx(t0), &data(1));
        f.reader.handle_heartbeat(&ctx(t0), &heartbeat(1, 1, 1, true));
        assert_eq!(f.reader.pending_acknacks(), 0);

        f.reader.handle_heartbeat(&ctx(t0), &heartbeat(1, 2, 2, true));
        assert_eq!(f.reader.pending_acknacks(), 1);
    }

    #[test]
    fn test_liveliness_heartbeat_follows_acknack_rule() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        f.reader.handle_data(&ctx(t0), &data(1));

        let mut hb = heartbeat(1, 3, 1, true);
        hb.liveliness_flag = true;
        assert_eq!(f.reader.handle_heartbeat(&ctx(t0), &hb), Delivery::Accepted);
        assert_eq!(f.reader.pending_acknacks(), 1);
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(t0 + Duration::from_millis(10)), &hb),
            Delivery::Stale
        );
        assert_eq!(f.reader.metrics().snapshot().heartbeats_received, 1);

        assert_eq!(f.reader.poll(t0 + Duration::from_millis(100)), 1);
        let acks = sent_acknacks(&f.transport);
        assert_eq!(
            acks[0].reader_sn_state.iter().collect::<Vec<_>>(),
            vec![SequenceNumber(2), SequenceNumber(3)]
        );
    }

    #[test]
    fn test_impossible_heartbeat_discarded() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        assert_eq!(
            f.reader
                .handle_heartbeat(&ctx(t0), &heartbeat(1, i64::MIN, 1, false)),
            Delivery::Stale
        );
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(t0), &heartbeat(4, 2, 2, false)),
            Delivery::Stale
        );
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(t0), &heartbeat(-5, 2, 3, false)),
            Delivery::Stale
        );
        assert_eq!(f.reader.pending_acknacks(), 0);
        assert_eq!(f.reader.poll(t0 + Duration::from_secs(1)), 0);
        assert_eq!(f.reader.metrics().snapshot().stale_events, 3);
    }

    #[test]
    fn test_highest_sequence_number_survives_poll() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        assert_eq!(
            f.reader.handle_data(&ctx(t0), &data(i64::MAX)),
            Delivery::Accepted
        );
        assert_eq!(
            f.reader
                .handle_heartbeat(&ctx(t0), &heartbeat(1, i64::MAX, 1, false)),
            Delivery::Accepted
        );
        assert_eq!(f.reader.poll(t0 + Duration::from_secs(1)), 1);
        let acks = sent_acknacks(&f.transport);
        assert_eq!(acks.len(), 1);
        assert!(acks[0].reader_sn_state.is_empty());
        assert!(acks[0].final_flag);
        assert_eq!(f.reader.handle_data(&ctx(t0), &data(i64::MAX)), Delivery::Stale);
    }

    #[test]
    fn test_best_effort_reader_never_acks() {
        let f = fixture(ReliabilityKind::BestEffort);
        f.reader
            .handle_heartbeat(&ctx(Instant::now()), &heartbeat(1, 5, 1, false));
        assert_eq!(f.reader.pending_acknacks(), 0);
    }

    #[test]
    fn test_stale_heartbeat_ignored() {
        let f = fixture(ReliabilityKind::Reliable);
        let now = Instant::now();
        f.reader.handle_heartbeat(&ctx(now), &heartbeat(1, 5, 3, false));
        assert_eq!(
            f.reader.handle_heartbeat(&ctx(now), &heartbeat(1, 5, 3, false)),
            Delivery::Stale
        );
        assert_eq!(f.reader.pending_acknacks(), 1);
    }

    #[test]
    fn test_unmatch_cancels_pending_acknack() {
        let f = fixture(ReliabilityKind::Reliable);
        let t0 = Instant::now();
        f.reader.handle_heartbeat(&ctx(t0), &heartbeat(1, 5, 1, false));
        assert!(f.reader.matched_writer_remove(f.writer_guid));
        assert_eq!(f.reader.pending_acknacks(), 0);
        assert_eq!(f.reader.poll(t0 + Duration::from_secs(1)), 0);
        assert!(f.transport.is_empty());
    }

    #[test]
    fn test_gap_advances_proxy() {
        let f = fixture(ReliabilityKind::Reliable);
        let now = Instant::now();
        f.reader.handle_data(&ctx(now), &data(1));
        f.reader.handle_data(&ctx(now), &data(2));
        let gap = Gap::range(
            EntityId::UNKNOWN,
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(3),
            SequenceNumber(4),
        );
        assert_eq!(f.reader.handle_gap(&ctx(now), &gap), Delivery::Accepted);
        let proxy = f.reader.writer_proxy(f.writer_guid).expect("proxy");
        assert_eq!(proxy.seq_num_max(), SequenceNumber(4));
        assert_eq!(f.reader.handle_data(&ctx(now), &data(5)), Delivery::Accepted);
    }

    #[test]
    fn test_untimestamped_data_uses_arrival_time() {
        let f = fixture(ReliabilityKind::Reliable);
        let mut c = ctx(Instant::now());
        c.received_time = Time::new(1_700_000_000, 7);
        f.reader.handle_data(&c, &data(1));
        assert_eq!(f.history.take()[0].timestamp, Time::new(1_700_000_000, 7));
    }

    #[test]
    fn test_spdp_writer_bootstraps_proxy() {
        let f = fixture(ReliabilityKind::Reliable);
        let mut d = data(1);
        d.writer_id = EntityId::SPDP_BUILTIN_PARTICIPANT_WRITER;
        assert_eq!(f.reader.handle_data(&ctx(Instant::now()), &d), Delivery::Accepted);
        let spdp = Guid::new(REMOTE, EntityId::SPDP_BUILTIN_PARTICIPANT_WRITER);
        let proxy = f.reader.writer_proxy(spdp).expect("bootstrap proxy");
        assert_eq!(proxy.reliability(), ReliabilityKind::BestEffort);
    }

    #[derive(Default)]
    struct Events(parking_lot::Mutex<Vec<(&'static str, Guid)>>);

    impl LivelinessListener for Events {
        fn liveliness_lost(&self, _reader: Guid, writer: Guid) {
            self.0.lock().push(("lost", writer));
        }
        fn liveliness_restored(&self, _reader: Guid, writer: Guid) {
            self.0.lock().push(("restored", writer));
        }
    }

    #[test]
    fn test_liveliness_listener_notified() {
        let events = Arc::new(Events::default());
        let history = Arc::new(ReaderHistory::new());
        let reader = RtpsReader::new(
            Guid::new(LOCAL, EntityId([0, 0, 1, 0x07])),
            ReliabilityKind::Reliable,
            history,
            Arc::new(LoopbackTransport::new()),
            Arc::new(EngineConfig::default()),
        )
        .with_liveliness_listener(events.clone());
        let writer_guid = Guid::new(REMOTE, EntityId([0, 0, 1, 0x02]));
        reader.matched_writer_add(
            WriterProxy::new(writer_guid, Vec::new())
                .with_lease_duration(Some(Duration::from_millis(100))),
        );

        let t0 = Instant::now();
        let mut hb = heartbeat(1, 0, 1, true);
        hb.liveliness_flag = true;
        reader.handle_heartbeat(&ctx(t0), &hb);
        reader.poll(t0 + Duration::from_millis(200));
        reader.handle_heartbeat(&ctx(t0 + Duration::from_millis(250)), &hb);

        assert_eq!(
            *events.0.lock(),
            vec![("lost", writer_guid), ("restored", writer_guid)]
        );
    }

    #[test]
    fn test_gap_restores_liveliness() {
        let events = Arc::new(Events::default());
        let reader = RtpsReader::new(
            Guid::new(LOCAL, EntityId([0, 0, 1, 0x07])),
            ReliabilityKind::Reliable,
            Arc::new(ReaderHistory::new()),
            Arc::new(LoopbackTransport::new()),
            Arc::new(EngineConfig::default()),
        )
        .with_liveliness_listener(events.clone());
        let writer_guid = Guid::new(REMOTE, EntityId([0, 0, 1, 0x02]));
        reader.matched_writer_add(
            WriterProxy::new(writer_guid, Vec::new())
                .with_lease_duration(Some(Duration::from_millis(100))),
        );

        let t0 = Instant::now();
        reader.handle_data(&ctx(t0), &data(1));
        reader.poll(t0 + Duration::from_millis(200));
        assert!(!reader.writer_proxy(writer_guid).expect("proxy").is_alive());

        let gap = Gap::range(
            EntityId::UNKNOWN,
            EntityId([0, 0, 1, 0x02]),
            SequenceNumber(2),
            SequenceNumber(2),
        );
        let t1 = t0 + Duration::from_millis(250);
        assert_eq!(reader.handle_gap(&ctx(t1), &gap), Delivery::Accepted);
        assert!(reader.writer_proxy(writer_guid).expect("proxy").is_alive());
        assert_eq!(
            *events.0.lock(),
            vec![("lost", writer_guid), ("restored", writer_guid)]
        );
    }
}
