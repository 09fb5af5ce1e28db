// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer-side state for one matched remote reader.

use std::time::{Duration, Instant};

use super::{accept_count, CountStamp, DurabilityKind, ProxyState, ReliabilityKind};
use crate::submessage::AckNack;
use crate::types::{Guid, Locator, SequenceNumber};

/// Remote reader as seen by a local writer.
#[derive(Debug, Clone)]
pub struct ReaderProxy {
    remote_guid: Guid,
    unicast_locators: Vec<Locator>,
    multicast_locators: Vec<Locator>,
    expects_inline_qos: bool,
    reliability: ReliabilityKind,
    durability: DurabilityKind,
    readers_highest_seq_num: SequenceNumber,
    highest_sent_seq_num: SequenceNumber,
    latest_acknack: Option<CountStamp>,
    active: bool,
    heartbeat_outstanding: bool,
    last_heartbeat_at: Option<Instant>,
}

impl ReaderProxy {
    /// Reliable, volatile proxy.
    pub fn new(remote_guid: Guid, unicast_locators: Vec<Locator>) -> Self {
        Self {
            remote_guid,
            unicast_locators,
            multicast_locators: Vec::new(),
            expects_inline_qos: false,
            reliability: ReliabilityKind::Reliable,
            durability: DurabilityKind::Volatile,
            readers_highest_seq_num: SequenceNumber::ZERO,
            highest_sent_seq_num: SequenceNumber::ZERO,
            latest_acknack: None,
            active: true,
            heartbeat_outstanding: false,
            last_heartbeat_at: None,
        }
    }

    pub fn with_multicast_locators(mut self, locators: Vec<Locator>) -> Self {
        self.multicast_locators = locators;
        self
    }

    pub fn with_reliability(mut self, reliability: ReliabilityKind) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn with_durability(mut self, durability: DurabilityKind) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_expects_inline_qos(mut self, expects: bool) -> Self {
        self.expects_inline_qos = expects;
        self
    }

    pub fn remote_guid(&self) -> Guid {
        self.remote_guid
    }

    pub fn unicast_locators(&self) -> &[Locator] {
        &self.unicast_locators
    }

    pub fn multicast_locators(&self) -> &[Locator] {
        &self.multicast_locators
    }

    pub fn expects_inline_qos(&self) -> bool {
        self.expects_inline_qos
    }

    pub fn reliability(&self) -> ReliabilityKind {
        self.reliability
    }

    pub fn durability(&self) -> DurabilityKind {
        self.durability
    }

    pub fn readers_highest_seq_num(&self) -> SequenceNumber {
        self.readers_highest_seq_num
    }

    pub fn highest_sent_seq_num(&self) -> SequenceNumber {
        self.highest_sent_seq_num
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_heartbeat_at(&self) -> Option<Instant> {
        self.last_heartbeat_at
    }

    /// Accept or suppress an AckNack. On acceptance the acknowledged
    /// watermark moves to `base - 1` (never backwards) and the proxy is
    /// active again.
    pub fn ack_nack_received(&mut self, an: &AckNack, now: Instant, suppression: Duration) -> bool {
        if !accept_count(self.latest_acknack, an.count, now, suppression) {
            return false;
        }
        self.latest_acknack = Some(CountStamp {
            count: an.count,
            received_at: now,
        });
        self.readers_highest_seq_num = self.readers_highest_seq_num.max(an.acked_up_to());
        self.active = true;
        self.heartbeat_outstanding = false;
        true
    }

    /// Bookkeeping for a heartbeat sent to this reader. A reader that did
    /// not answer the previous heartbeat becomes inactive.
    pub fn heartbeat_sent(&mut self, now: Instant) {
        if self.heartbeat_outstanding {
            if self.active {
                log::debug!(
                    "[WRITER] reader {:?} did not answer the last heartbeat, now inactive",
                    self.remote_guid
                );
            }
            self.active = false;
        }
        self.heartbeat_outstanding = true;
        self.last_heartbeat_at = Some(now);
    }

    /// Record samples up to `seq` as sent.
    pub fn mark_sent(&mut self, seq: SequenceNumber) {
        self.highest_sent_seq_num = self.highest_sent_seq_num.max(seq);
    }

    /// Force the acknowledged watermark (volatile match, best-effort send).
    pub fn set_readers_highest_seq_num(&mut self, seq: SequenceNumber) {
        self.readers_highest_seq_num = self.readers_highest_seq_num.max(seq);
        self.highest_sent_seq_num = self.highest_sent_seq_num.max(seq);
    }

    pub fn is_acked(&self, seq: SequenceNumber) -> bool {
        self.readers_highest_seq_num >= seq
    }

    /// State relative to the writer's highest sequence number.
    pub fn state(&self, writer_seq_num_max: SequenceNumber) -> ProxyState {
        if self.latest_acknack.is_none() {
            ProxyState::Tracking
        } else if self.is_acked(writer_seq_num_max) {
            ProxyState::Synced
        } else {
            ProxyState::Advancing
        }
    }
}
