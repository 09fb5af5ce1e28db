// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader-side state for one matched remote writer.

use std::time::{Duration, Instant};

use super::{accept_count, CountStamp, LivelinessChange, ProxyState, ReliabilityKind};
use crate::config::MAX_BITMAP_BITS;
use crate::submessage::Heartbeat;
use crate::types::{Guid, Locator, SequenceNumber, SequenceNumberSet};

/// Outcome of [`WriterProxy::accept_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAcceptance {
    /// Sequence number not above `seq_num_max`: already delivered.
    Duplicate,
    /// Next expected sample (or any sample of a best-effort writer).
    Accepted,
    /// Accepted while skipping `missing` samples that were never received.
    AcceptedWithGap { missing: u64 },
}

impl DataAcceptance {
    pub fn is_accepted(self) -> bool {
        !matches!(self, DataAcceptance::Duplicate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LatestHeartbeat {
    stamp: CountStamp,
    first_sn: SequenceNumber,
    last_sn: SequenceNumber,
}

/// Remote writer as seen by a local reader.
#[derive(Debug, Clone)]
pub struct WriterProxy {
    remote_guid: Guid,
    unicast_locators: Vec<Locator>,
    multicast_locators: Vec<Locator>,
    reliability: ReliabilityKind,
    seq_num_max: SequenceNumber,
    latest_heartbeat: Option<LatestHeartbeat>,
    engaged: bool,
    alive: bool,
    lease_duration: Option<Duration>,
    last_liveliness: Option<Instant>,
}

impl WriterProxy {
    /// Reliable proxy with an infinite liveliness lease.
    pub fn new(remote_guid: Guid, unicast_locators: Vec<Locator>) -> Self {
        Self {
            remote_guid,
            unicast_locators,
            multicast_locators: Vec::new(),
            reliability: ReliabilityKind::Reliable,
            seq_num_max: SequenceNumber::ZERO,
            latest_heartbeat: None,
            engaged: false,
            alive: true,
            lease_duration: None,
            last_liveliness: None,
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

    /// Liveliness lease; `None` never expires.
    pub fn with_lease_duration(mut self, lease: Option<Duration>) -> Self {
        self.lease_duration = lease;
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

    pub fn reliability(&self) -> ReliabilityKind {
        self.reliability
    }

    pub fn seq_num_max(&self) -> SequenceNumber {
        self.seq_num_max
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Accept `seq` if it is above everything received so far.
    ///
    /// A reliable proxy still accepts a sample beyond `seq_num_max + 1`;
    /// the skipped numbers are reported and recovered only through
    /// heartbeat/acknack rounds.
    pub fn accept_data(&mut self, seq: SequenceNumber) -> DataAcceptance {
        if seq <= self.seq_num_max {
            return DataAcceptance::Duplicate;
        }
        let expected = self.seq_num_max + 1;
        let outcome = if self.reliability.is_reliable()
            && self.seq_num_max != SequenceNumber::ZERO
            && seq > expected
        {
            DataAcceptance::AcceptedWithGap {
                missing: seq.0.abs_diff(expected.0),
            }
        } else {
            DataAcceptance::Accepted
        };
        self.seq_num_max = seq;
        self.engaged = true;
        outcome
    }

    /// Mark `[start, end]` irrelevant. Returns `true` if `seq_num_max` moved.
    pub fn apply_gap(&mut self, start: SequenceNumber, end: SequenceNumber) -> bool {
        if start <= self.seq_num_max + 1 && end > self.seq_num_max {
            self.seq_num_max = end;
            self.engaged = true;
            true
        } else {
            false
        }
    }

    /// Accept or suppress a heartbeat. Acceptance asserts liveliness.
    ///
    /// A heartbeat announcing an impossible range is never accepted.
    pub fn heartbeat_received(
        &mut self,
        hb: &Heartbeat,
        now: Instant,
        suppression: Duration,
    ) -> bool {
        if !hb.has_valid_range() {
            return false;
        }
        let latest = self.latest_heartbeat.map(|h| h.stamp);
        if !accept_count(latest, hb.count, now, suppression) {
            return false;
        }
        self.latest_heartbeat = Some(LatestHeartbeat {
            stamp: CountStamp {
                count: hb.count,
                received_at: now,
            },
            first_sn: hb.first_sn,
            last_sn: hb.last_sn,
        });
        self.engaged = true;
        self.assert_liveliness(now);
        true
    }

    /// Sequence numbers to request, derived from the latest heartbeat.
    ///
    /// Every number in `[max(seq_num_max + 1, first_sn), last_sn]` is
    /// flagged missing, up to 256 of them.
    pub fn sequence_number_set_for_acknack(&self) -> SequenceNumberSet {
        let next = self.seq_num_max + 1;
        match self.latest_heartbeat {
            Some(hb) if self.seq_num_max < hb.last_sn => {
                let base = next.max(hb.first_sn);
                let span = hb
                    .last_sn
                    .0
                    .saturating_sub(base.0)
                    .saturating_add(1)
                    .clamp(0, i64::from(MAX_BITMAP_BITS));
                SequenceNumberSet::with_range(base, span as u32)
            }
            _ => SequenceNumberSet::empty(next),
        }
    }

    /// `true` once the latest heartbeat's last sequence number was reached.
    pub fn is_all_received(&self) -> bool {
        self.latest_heartbeat
            .is_some_and(|hb| hb.last_sn == self.seq_num_max)
    }

    /// `true` while the writer announced more than has been received.
    pub fn is_lagging(&self) -> bool {
        self.latest_heartbeat
            .is_some_and(|hb| self.seq_num_max < hb.last_sn)
    }

    /// Record a liveliness assertion. Reports `Restored` if the proxy had
    /// been declared lost.
    pub fn assert_liveliness(&mut self, now: Instant) -> Option<LivelinessChange> {
        self.last_liveliness = Some(now);
        if self.alive {
            None
        } else {
            self.alive = true;
            Some(LivelinessChange::Restored)
        }
    }

    /// Expire the lease if it ran out. Reports `Lost` once per expiry.
    pub fn check_liveliness(&mut self, now: Instant) -> Option<LivelinessChange> {
        let lease = self.lease_duration?;
        if !self.alive {
            return None;
        }
        let last = self.last_liveliness?;
        if now.saturating_duration_since(last) > lease {
            self.alive = false;
            Some(LivelinessChange::Lost)
        } else {
            None
        }
    }

    pub fn state(&self) -> ProxyState {
        if !self.engaged {
            ProxyState::Tracking
        } else if self.is_all_received() {
            ProxyState::Synced
        } else {
            ProxyState::Advancing
        }
    }
}
