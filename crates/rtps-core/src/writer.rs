// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer-side reliability engine.
//!
//! # Protocol
//!
//! ```text
//! RtpsWriter                            Remote reader
//!      |  INFO_DST + [INFO_TS] DATA... + HEARTBEAT  |   notify_changes (push)
//!      |------------------------------------------> |
//!      |  ACKNACK(base, missing)                    |
//!      | <------------------------------------------|   schedule repair
//!      |  ... poll(now) after nack_response_delay   |
//!      |  INFO_DST + [GAP] DATA... + HEARTBEAT      |
//!      |------------------------------------------> |
//! ```
//!
//! # Announcements
//!
//! Every `heartbeat_period` [`RtpsWriter::poll`] sends a Heartbeat to each
//! active reliable reader and pushes unsent samples to best-effort ones.
//! A reader that leaves a heartbeat unanswered becomes inactive and is
//! skipped by periodic heartbeats until its next AckNack. Pushes on
//! [`RtpsWriter::notify_changes`] still reach it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::cache::{CacheChange, ChangeKind, WriterCache};
use crate::config::EngineConfig;
use crate::message::Message;
use crate::metrics::ReliabilityMetrics;
use crate::parameter::{Parameter, ParameterList};
use crate::proxy::{DurabilityKind, ReaderProxy, ReliabilityKind};
use crate::receiver::{Delivery, ReceiveContext};
use crate::submessage::{AckNack, Data, Gap, Heartbeat, InfoDestination, InfoTimestamp, Payload};
use crate::transport::{destinations, flush, Outbound, Transport};
use crate::types::{EntityId, Guid, Locator, SequenceNumber, Time};

#[derive(Debug, Clone, Copy)]
struct PendingRepair {
    reader_guid: Guid,
    base: SequenceNumber,
    deadline: Instant,
}

/// A local writer and its matched reader proxies.
pub struct RtpsWriter {
    guid: Guid,
    reliability: ReliabilityKind,
    config: Arc<EngineConfig>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn WriterCache>,
    metrics: Arc<ReliabilityMetrics>,
    readers: Mutex<HashMap<Guid, ReaderProxy>>,
    pending: Mutex<Vec<PendingRepair>>,
    heartbeat_count: AtomicU32,
    next_announce: Mutex<Instant>,
}

impl RtpsWriter {
    pub fn new(
        guid: Guid,
        reliability: ReliabilityKind,
        cache: Arc<dyn WriterCache>,
        transport: Arc<dyn Transport>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let next_announce = Instant::now() + config.heartbeat_period;
        Self {
            guid,
            reliability,
            config,
            transport,
            cache,
            metrics: Arc::new(ReliabilityMetrics::new()),
            readers: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            heartbeat_count: AtomicU32::new(0),
            next_announce: Mutex::new(next_announce),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ReliabilityMetrics>) -> Self {
        self.metrics = metrics;
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

    /// Start tracking a remote reader.
    ///
    /// A VOLATILE reader is considered to have everything already in the
    /// cache. A TRANSIENT_LOCAL reader gets the cached samples right away.
    pub fn matched_reader_add(&self, mut proxy: ReaderProxy) {
        let guid = proxy.remote_guid();
        let durability = proxy.durability();
        if durability == DurabilityKind::Volatile {
            proxy.set_readers_highest_seq_num(self.cache.seq_num_max());
        }
        log::debug!(
            "[WRITER] {:?} matched reader {:?} ({:?})",
            self.guid,
            guid,
            durability
        );
        self.readers.lock().insert(guid, proxy);

        if durability == DurabilityKind::TransientLocal {
            self.push_to(|p| p.remote_guid() == guid, Instant::now());
        }
    }

    /// Forget a remote reader and cancel its queued repair.
    pub fn matched_reader_remove(&self, reader_guid: Guid) -> bool {
        let removed = self.readers.lock().remove(&reader_guid).is_some();
        self.pending.lock().retain(|p| p.reader_guid != reader_guid);
        if removed {
            log::debug!("[WRITER] {:?} unmatched reader {:?}", self.guid, reader_guid);
        }
        removed
    }

    pub fn has_reader(&self, reader_guid: Guid) -> bool {
        self.readers.lock().contains_key(&reader_guid)
    }

    pub fn matched_readers(&self) -> Vec<Guid> {
        self.readers.lock().keys().copied().collect()
    }

    /// Copy of the proxy state for `reader_guid`.
    pub fn reader_proxy(&self, reader_guid: Guid) -> Option<ReaderProxy> {
        self.readers.lock().get(&reader_guid).cloned()
    }

    /// Number of repairs waiting for their deadline.
    pub fn pending_repairs(&self) -> usize {
        self.pending.lock().len()
    }

    /// `true` when every reliable reader acknowledged the cache max.
    pub fn is_acknowledged_by_all(&self) -> bool {
        let max = self.cache.seq_num_max();
        self.readers
            .lock()
            .values()
            .filter(|p| p.reliability().is_reliable())
            .all(|p| p.is_acked(max))
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// New samples are in the cache. In push mode they are sent to every
    /// matched reader; otherwise reliable readers get a Heartbeat.
    /// Returns the number of datagrams built.
    pub fn notify_changes(&self, now: Instant) -> usize {
        if self.config.push_mode {
            self.push_to(|_| true, now)
        } else {
            self.announce(now, false)
        }
    }

    /// Send a liveliness Heartbeat (L flag) to every matched reader.
    pub fn assert_liveliness(&self) -> usize {
        let mut batch = Vec::new();
        {
            let readers = self.readers.lock();
            for proxy in readers.values() {
                let mut hb = self.heartbeat_for(proxy.remote_guid().entity_id);
                hb.final_flag = true;
                hb.liveliness_flag = true;
                if let Some(out) = self.encode_for(proxy, Message::new(self.guid.prefix).with(hb)) {
                    self.metrics.increment_heartbeats_sent(1);
                    batch.push(out);
                }
            }
        }
        let built = batch.len();
        flush(self.transport.as_ref(), batch, "[WRITER]");
        built
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    pub fn handle_acknack(&self, ctx: &ReceiveContext, an: &AckNack) -> Delivery {
        let now = ctx.received_at;
        let reader_guid = ctx.source_guid(an.reader_id);
        let mut readers = self.readers.lock();
        let Some(proxy) = readers.get_mut(&reader_guid) else {
            log::debug!("[WRITER] acknack from unmatched reader {:?}", reader_guid);
            return Delivery::UnknownPeer(reader_guid);
        };

        if !proxy.ack_nack_received(an, now, self.config.nack_suppression) {
            log::trace!(
                "[WRITER] stale acknack count={} from {:?}",
                an.count,
                reader_guid
            );
            self.metrics.increment_stale_events(1);
            return Delivery::Stale;
        }
        self.metrics.increment_acknacks_received(1);

        if an.reader_sn_state.base() <= self.cache.seq_num_max() {
            self.schedule_repair(
                reader_guid,
                an.reader_sn_state.base(),
                now + self.config.nack_response_delay,
            );
        }
        Delivery::Accepted
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Fire due repairs and the periodic announcement. Returns the number
    /// of datagrams built.
    pub fn poll(&self, now: Instant) -> usize {
        let due: Vec<PendingRepair> = {
            let mut pending = self.pending.lock();
            let mut due = Vec::new();
            pending.retain(|p| {
                if p.deadline <= now {
                    due.push(*p);
                    false
                } else {
                    true
                }
            });
            due
        };

        let mut batch = Vec::new();
        {
            let mut readers = self.readers.lock();
            for repair in due {
                if let Some(proxy) = readers.get_mut(&repair.reader_guid) {
                    self.build_repair(proxy, repair.base, now, &mut batch);
                }
            }
        }
        let mut built = batch.len();
        flush(self.transport.as_ref(), batch, "[WRITER]");

        let announce_due = {
            let mut next = self.next_announce.lock();
            if now >= *next {
                *next = now + self.config.heartbeat_period;
                true
            } else {
                false
            }
        };
        if announce_due {
            built += self.announce(now, true);
        }
        built
    }

    fn schedule_repair(&self, reader_guid: Guid, base: SequenceNumber, deadline: Instant) {
        let mut pending = self.pending.lock();
        match pending.iter_mut().find(|p| p.reader_guid == reader_guid) {
            Some(existing) => {
                existing.base = existing.base.min(base);
                existing.deadline = existing.deadline.min(deadline);
            }
            None => {
                log::debug!("[WRITER] repair from {} for {:?} scheduled", base, reader_guid);
                pending.push(PendingRepair {
                    reader_guid,
                    base,
                    deadline,
                });
            }
        }
    }

    /// Heartbeat to reliable readers, unsent samples to best-effort ones.
    /// `periodic` skips inactive readers.
    fn announce(&self, now: Instant, periodic: bool) -> usize {
        let mut batch = Vec::new();
        {
            let mut readers = self.readers.lock();
            for proxy in readers.values_mut() {
                if self.is_reliable_with(proxy) {
                    if periodic && !proxy.is_active() {
                        continue;
                    }
                    let mut hb = self.heartbeat_for(proxy.remote_guid().entity_id);
                    hb.final_flag = false;
                    let message = Message::new(self.guid.prefix)
                        .with(InfoDestination {
                            guid_prefix: proxy.remote_guid().prefix,
                        })
                        .with(hb);
                    if let Some(out) = self.encode_for(proxy, message) {
                        proxy.heartbeat_sent(now);
                        self.metrics.increment_heartbeats_sent(1);
                        batch.push(out);
                    }
                } else {
                    let changes = self.cache.samples_since(proxy.highest_sent_seq_num());
                    if !changes.is_empty() {
                        self.build_data(proxy, None, &changes, now, false, &mut batch);
                    }
                }
            }
        }
        let built = batch.len();
        flush(self.transport.as_ref(), batch, "[WRITER]");
        built
    }

    fn push_to(&self, filter: impl Fn(&ReaderProxy) -> bool, now: Instant) -> usize {
        let mut batch = Vec::new();
        {
            let mut readers = self.readers.lock();
            for proxy in readers.values_mut().filter(|p| filter(&**p)) {
                let changes = self.cache.samples_since(proxy.highest_sent_seq_num());
                if changes.is_empty() {
                    continue;
                }
                self.build_data(proxy, None, &changes, now, false, &mut batch);
            }
        }
        let built = batch.len();
        flush(self.transport.as_ref(), batch, "[WRITER]");
        built
    }

    fn build_repair(
        &self,
        proxy: &mut ReaderProxy,
        base: SequenceNumber,
        now: Instant,
        batch: &mut Vec<Outbound>,
    ) {
        let writer_min = self.cache.seq_num_min();
        let gap = if base < writer_min {
            self.metrics.increment_gaps_sent(1);
            Some(Gap::range(
                proxy.remote_guid().entity_id,
                self.guid.entity_id,
                base,
                writer_min - 1,
            ))
        } else {
            None
        };
        let changes = self.cache.samples_since(base - 1);
        log::debug!(
            "[WRITER] repair for {:?}: {} sample(s) from {}",
            proxy.remote_guid(),
            changes.len(),
            base
        );
        self.build_data(proxy, gap, &changes, now, true, batch);
    }

    /// `[INFO_DST, GAP?, (INFO_TS?, DATA)*, HEARTBEAT?]` for one reader.
    ///
    /// If the message overflows, the committed prefix is sent and a
    /// standalone Heartbeat follows so the reader requests the rest.
    fn build_data(
        &self,
        proxy: &mut ReaderProxy,
        gap: Option<Gap>,
        changes: &[CacheChange],
        now: Instant,
        resend: bool,
        batch: &mut Vec<Outbound>,
    ) {
        let reader_id = proxy.remote_guid().entity_id;
        let reliable = self.is_reliable_with(proxy);

        let mut message = Message::new(self.guid.prefix).with(InfoDestination {
            guid_prefix: proxy.remote_guid().prefix,
        });
        if let Some(gap) = gap {
            message.push(gap);
        }

        let mut data_at: Vec<(usize, SequenceNumber)> = Vec::with_capacity(changes.len());
        let mut last_timestamp: Option<Time> = None;
        for change in changes {
            if last_timestamp.map_or(true, |t| change.timestamp > t) {
                message.push(InfoTimestamp {
                    timestamp: Some(change.timestamp),
                });
                last_timestamp = Some(change.timestamp);
            }
            data_at.push((message.len(), change.sequence_number));
            message.push(data_for(reader_id, self.guid.entity_id, change));
        }
        if reliable {
            let mut hb = self.heartbeat_for(reader_id);
            hb.final_flag = false;
            message.push(hb);
        }

        let Some(locators) = self.locators_for(proxy) else {
            return;
        };
        let (bytes, outcome) = match message.to_bytes(self.config.max_message_size) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("[WRITER] data encode failed: {}", e);
                return;
            }
        };

        let committed: Vec<SequenceNumber> = data_at
            .iter()
            .filter(|(index, _)| *index < outcome.submessages_written)
            .map(|(_, seq)| *seq)
            .collect();
        if committed.len() < changes.len() {
            log::debug!(
                "[WRITER] message to {:?} overflowed after {} of {} sample(s)",
                proxy.remote_guid(),
                committed.len(),
                changes.len()
            );
            if committed.is_empty() && !changes.is_empty() {
                log::warn!(
                    "[WRITER] sample {} does not fit in {} bytes",
                    changes[0].sequence_number,
                    self.config.max_message_size
                );
            }
        }
        if let Some(last) = committed.last() {
            proxy.mark_sent(*last);
        }
        if resend {
            self.metrics.increment_data_resent(committed.len() as u64);
        } else {
            self.metrics.increment_data_sent(committed.len() as u64);
        }
        batch.push(Outbound {
            locators: locators.clone(),
            bytes,
        });

        if reliable {
            // an overflow always drops the trailing heartbeat
            if outcome.overflowed {
                let mut hb = self.heartbeat_for(reader_id);
                hb.final_flag = false;
                let follow_up = Message::new(self.guid.prefix)
                    .with(InfoDestination {
                        guid_prefix: proxy.remote_guid().prefix,
                    })
                    .with(hb);
                match follow_up.to_bytes(self.config.max_message_size) {
                    Ok((bytes, _)) => {
                        batch.push(Outbound { locators, bytes });
                        self.metrics.increment_heartbeats_sent(1);
                    }
                    Err(e) => log::warn!("[WRITER] heartbeat encode failed: {}", e),
                }
            } else {
                self.metrics.increment_heartbeats_sent(1);
            }
            proxy.heartbeat_sent(now);
        } else {
            proxy.set_readers_highest_seq_num(self.cache.seq_num_max());
        }
    }

    fn heartbeat_for(&self, reader_id: EntityId) -> Heartbeat {
        let count = self.heartbeat_count.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        Heartbeat::new(
            reader_id,
            self.guid.entity_id,
            self.cache.seq_num_min(),
            self.cache.seq_num_max(),
            count,
        )
    }

    fn is_reliable_with(&self, proxy: &ReaderProxy) -> bool {
        self.reliability.is_reliable() && proxy.reliability().is_reliable()
    }

    fn locators_for(&self, proxy: &ReaderProxy) -> Option<Vec<Locator>> {
        let locators = destinations(proxy.unicast_locators(), proxy.multicast_locators());
        if locators.is_empty() {
            log::warn!("[WRITER] no locator for reader {:?}", proxy.remote_guid());
            None
        } else {
            Some(locators)
        }
    }

    fn encode_for(&self, proxy: &ReaderProxy, message: Message) -> Option<Outbound> {
        let locators = self.locators_for(proxy)?;
        match message.to_bytes(self.config.max_message_size) {
            Ok((bytes, _)) => Some(Outbound { locators, bytes }),
            Err(e) => {
                log::warn!("[WRITER] encode failed: {}", e);
                None
            }
        }
    }
}

/// DATA for one cached change. Inline QoS carries the key hash and, for
/// non-Alive changes, the status info; those send the key (K flag).
fn data_for(reader_id: EntityId, writer_id: EntityId, change: &CacheChange) -> Data {
    let mut qos = ParameterList::new();
    if let Some(key_hash) = change.key_hash {
        qos.push(Parameter::KeyHash(key_hash));
    }
    if change.kind != ChangeKind::Alive {
        qos.push(Parameter::status_info(change.kind));
    }
    let bytes = change.payload.to_vec();
    Data {
        extra_flags: 0,
        reader_id,
        writer_id,
        writer_sn: change.sequence_number,
        inline_qos: if qos.is_empty() { None } else { Some(qos) },
        payload: Some(if change.kind == ChangeKind::Alive {
            Payload::Data(bytes)
        } else {
            Payload::Key(bytes)
        }),
    }
}
