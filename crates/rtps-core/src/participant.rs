// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant: endpoint registry, datagram entry point and inbound workers.
//!
//! # Architecture
//!
//! ```text
//! inbound channel ──> rtps-rx-N workers ──> handle_datagram
//!                                               │ Message::decode
//!                                               │ receiver::dispatch
//!                                  ┌────────────┴────────────┐
//!                            RtpsReader(s)              RtpsWriter(s)
//!                                  └──── poll(now) on tick ──┘
//! ```
//!
//! Endpoints live in `DashMap`s keyed by entity id, so different datagrams
//! can be handled concurrently. Submessages of one datagram are always
//! routed in order on the thread that decoded it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;

use crate::cache::{ReaderCache, WriterCache};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::message::Message;
use crate::metrics::ReliabilityMetrics;
use crate::proxy::ReliabilityKind;
use crate::reader::RtpsReader;
use crate::receiver::{dispatch, Delivery, ReceiveContext, SubmessageHandler};
use crate::submessage::{AckNack, Data, DataFrag, Gap, Heartbeat, HeartbeatFrag, NackFrag};
use crate::transport::Transport;
use crate::types::{EntityId, Guid, GuidPrefix};
use crate::writer::RtpsWriter;

/// Local participant owning readers and writers that share one transport,
/// one configuration and one metrics block.
pub struct Participant {
    guid_prefix: GuidPrefix,
    config: Arc<EngineConfig>,
    transport: Arc<dyn Transport>,
    metrics: Arc<ReliabilityMetrics>,
    readers: DashMap<EntityId, Arc<RtpsReader>>,
    writers: DashMap<EntityId, Arc<RtpsWriter>>,
}

impl Participant {
    pub fn new(
        guid_prefix: GuidPrefix,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> Self {
        Self {
            guid_prefix,
            config: Arc::new(config),
            transport,
            metrics: Arc::new(ReliabilityMetrics::new()),
            readers: DashMap::new(),
            writers: DashMap::new(),
        }
    }

    pub fn guid_prefix(&self) -> GuidPrefix {
        self.guid_prefix
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<ReliabilityMetrics> {
        &self.metrics
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    /// Create and register a reader with the participant's transport,
    /// configuration and metrics.
    pub fn create_reader(
        &self,
        entity_id: EntityId,
        reliability: ReliabilityKind,
        cache: Arc<dyn ReaderCache>,
    ) -> Arc<RtpsReader> {
        let reader = RtpsReader::new(
            Guid::new(self.guid_prefix, entity_id),
            reliability,
            cache,
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
        )
        .with_metrics(Arc::clone(&self.metrics));
        self.add_reader(reader)
    }

    /// Create and register a writer with the participant's transport,
    /// configuration and metrics.
    pub fn create_writer(
        &self,
        entity_id: EntityId,
        reliability: ReliabilityKind,
        cache: Arc<dyn WriterCache>,
    ) -> Arc<RtpsWriter> {
        let writer = RtpsWriter::new(
            Guid::new(self.guid_prefix, entity_id),
            reliability,
            cache,
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
        )
        .with_metrics(Arc::clone(&self.metrics));
        self.add_writer(writer)
    }

    /// Register a reader built elsewhere. Replaces any reader with the same
    /// entity id.
    pub fn add_reader(&self, reader: RtpsReader) -> Arc<RtpsReader> {
        let reader = Arc::new(reader);
        log::debug!("[PARTICIPANT] reader {:?} added", reader.guid());
        self.readers
            .insert(reader.guid().entity_id, Arc::clone(&reader));
        reader
    }

    /// Register a writer built elsewhere. Replaces any writer with the same
    /// entity id.
    pub fn add_writer(&self, writer: RtpsWriter) -> Arc<RtpsWriter> {
        let writer = Arc::new(writer);
        log::debug!("[PARTICIPANT] writer {:?} added", writer.guid());
        self.writers
            .insert(writer.guid().entity_id, Arc::clone(&writer));
        writer
    }

    pub fn remove_reader(&self, entity_id: EntityId) -> Option<Arc<RtpsReader>> {
        self.readers.remove(&entity_id).map(|(_, reader)| reader)
    }

    pub fn remove_writer(&self, entity_id: EntityId) -> Option<Arc<RtpsWriter>> {
        self.writers.remove(&entity_id).map(|(_, writer)| writer)
    }

    pub fn reader(&self, entity_id: EntityId) -> Option<Arc<RtpsReader>> {
        self.readers.get(&entity_id).map(|r| Arc::clone(r.value()))
    }

    pub fn writer(&self, entity_id: EntityId) -> Option<Arc<RtpsWriter>> {
        self.writers.get(&entity_id).map(|w| Arc::clone(w.value()))
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Decode one datagram and route its submessages to local endpoints.
    ///
    /// Returns the number of entity submessages routed. A malformed
    /// datagram is counted, logged and returned as an error; it never
    /// affects later datagrams.
    pub fn handle_datagram(&self, bytes: &[u8], now: Instant) -> Result<usize> {
        let message = match Message::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("[PARTICIPANT] dropping datagram ({} bytes): {}", bytes.len(), e);
                self.metrics.increment_malformed_messages(1);
                return Err(e);
            }
        };
        Ok(dispatch(&message, self.guid_prefix, now, self))
    }

    /// Fire due timers on every endpoint. Returns the number of datagrams
    /// built.
    pub fn poll(&self, now: Instant) -> usize {
        let readers: Vec<Arc<RtpsReader>> =
            self.readers.iter().map(|r| Arc::clone(r.value())).collect();
        let writers: Vec<Arc<RtpsWriter>> =
            self.writers.iter().map(|w| Arc::clone(w.value())).collect();

        readers.iter().map(|r| r.poll(now)).sum::<usize>()
            + writers.iter().map(|w| w.poll(now)).sum::<usize>()
    }

    /// Readers addressed by `reader_id` for traffic from `writer_guid`.
    ///
    /// An UNKNOWN reader id addresses every reader matched with the writer,
    /// plus the SPDP reader for SPDP writer traffic.
    fn target_readers(&self, reader_id: EntityId, writer_guid: Guid) -> Vec<Arc<RtpsReader>> {
        if !reader_id.is_unknown() {
            return self.reader(reader_id).into_iter().collect();
        }
        self.readers
            .iter()
            .filter(|r| {
                r.value().has_writer(writer_guid)
                    || (writer_guid.entity_id == EntityId::SPDP_BUILTIN_PARTICIPANT_WRITER
                        && *r.key() == EntityId::SPDP_BUILTIN_PARTICIPANT_READER)
            })
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    fn for_each_reader(
        &self,
        ctx: &ReceiveContext,
        reader_id: EntityId,
        writer_id: EntityId,
        what: &str,
        f: impl Fn(&RtpsReader) -> Delivery,
    ) {
        let writer_guid = ctx.source_guid(writer_id);
        let targets = self.target_readers(reader_id, writer_guid);
        if targets.is_empty() {
            log::debug!(
                "[PARTICIPANT] {} from {:?} has no local reader ({:?})",
                what,
                writer_guid,
                reader_id
            );
            return;
        }
        for reader in targets {
            let delivery = f(reader.as_ref());
            if let Delivery::UnknownPeer(peer) = delivery {
                log::warn!(
                    "[PARTICIPANT] {} for {:?} from unmatched writer {:?}",
                    what,
                    reader.guid(),
                    peer
                );
            }
        }
    }
}

impl SubmessageHandler for Participant {
    fn on_data(&self, ctx: &ReceiveContext, data: &Data) {
        self.for_each_reader(ctx, data.reader_id, data.writer_id, "DATA", |r| {
            r.handle_data(ctx, data)
        });
    }

    fn on_heartbeat(&self, ctx: &ReceiveContext, heartbeat: &Heartbeat) {
        self.for_each_reader(ctx, heartbeat.reader_id, heartbeat.writer_id, "HEARTBEAT", |r| {
            r.handle_heartbeat(ctx, heartbeat)
        });
    }

    fn on_gap(&self, ctx: &ReceiveContext, gap: &Gap) {
        self.for_each_reader(ctx, gap.reader_id, gap.writer_id, "GAP", |r| {
            r.handle_gap(ctx, gap)
        });
    }

    fn on_acknack(&self, ctx: &ReceiveContext, acknack: &AckNack) {
        let Some(writer) = self.writer(acknack.writer_id) else {
            log::debug!(
                "[PARTICIPANT] ACKNACK for unknown writer {:?}",
                acknack.writer_id
            );
            return;
        };
        if let Delivery::UnknownPeer(peer) = writer.handle_acknack(ctx, acknack) {
            log::warn!(
                "[PARTICIPANT] ACKNACK for {:?} from unmatched reader {:?}",
                writer.guid(),
                peer
            );
        }
    }

    fn on_data_frag(&self, _ctx: &ReceiveContext, frag: &DataFrag) {
        log::trace!(
            "[PARTICIPANT] DATA_FRAG {} from {:?} left to the consumer",
            frag.writer_sn,
            frag.writer_id
        );
    }

    fn on_heartbeat_frag(&self, _ctx: &ReceiveContext, heartbeat: &HeartbeatFrag) {
        log::trace!(
            "[PARTICIPANT] HEARTBEAT_FRAG {} from {:?} ignored",
            heartbeat.writer_sn,
            heartbeat.writer_id
        );
    }

    fn on_nack_frag(&self, _ctx: &ReceiveContext, nack: &NackFrag) {
        log::trace!(
            "[PARTICIPANT] NACK_FRAG for {:?} ignored",
            nack.writer_id
        );
    }
}

// ============================================================================
// Inbound workers
// ============================================================================

impl Participant {
    /// Start `worker_threads` inbound workers draining `inbound`.
    ///
    /// Each worker blocks on the channel, a shutdown signal and a tick
    /// timeout. Worker 0 also drives [`Participant::poll`] on every wakeup.
    /// Workers exit when the handle is shut down or dropped, or when the
    /// inbound channel disconnects.
    pub fn spawn(self: &Arc<Self>, inbound: Receiver<Vec<u8>>) -> std::io::Result<ParticipantHandle> {
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let threads = self.config.worker_threads.max(1);
        let mut workers = Vec::with_capacity(threads);

        for index in 0..threads {
            let participant = Arc::clone(self);
            let inbound = inbound.clone();
            let shutdown_rx = shutdown_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("rtps-rx-{}", index))
                .spawn(move || participant.run_worker(index, inbound, shutdown_rx))?;
            workers.push(handle);
        }
        log::debug!("[PARTICIPANT] {} inbound worker(s) started", threads);

        Ok(ParticipantHandle {
            shutdown: Some(shutdown_tx),
            workers,
        })
    }

    fn run_worker(&self, index: usize, inbound: Receiver<Vec<u8>>, shutdown: Receiver<()>) {
        let tick = self.config.tick_interval;
        loop {
            crossbeam::select! {
                recv(inbound) -> msg => match msg {
                    Ok(bytes) => {
                        // errors are logged and counted in handle_datagram
                        let _ = self.handle_datagram(&bytes, Instant::now());
                    }
                    Err(_) => {
                        log::debug!("[PARTICIPANT] inbound channel closed, rtps-rx-{} exiting", index);
                        return;
                    }
                },
                recv(shutdown) -> _ => {
                    log::debug!("[PARTICIPANT] rtps-rx-{} shutting down", index);
                    return;
                },
                default(tick) => {}
            }
            if index == 0 {
                self.poll(Instant::now());
            }
        }
    }
}

/// Handle to the inbound workers started by [`Participant::spawn`].
///
/// Dropping the handle stops and joins the workers.
pub struct ParticipantHandle {
    shutdown: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl ParticipantHandle {
    /// Signal every worker and wait for them to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|w| !w.is_finished())
    }

    fn stop(&mut self) {
        // disconnecting the channel wakes every select! at once
        drop(self.shutdown.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("[PARTICIPANT] inbound worker panicked");
            }
        }
    }
}

impl Drop for ParticipantHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
