// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Counters for the reliability loop.
//!
//! One [`ReliabilityMetrics`] is shared (`Arc`) by a participant and all of
//! its endpoints. Updates are single Relaxed atomic operations; readers get a
//! consistent-enough view through [`ReliabilityMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters for heartbeats, acknacks, data and gaps.
#[derive(Debug, Default)]
pub struct ReliabilityMetrics {
    heartbeats_sent: AtomicU64,
    heartbeats_received: AtomicU64,
    acknacks_sent: AtomicU64,
    acknacks_received: AtomicU64,
    data_sent: AtomicU64,
    data_resent: AtomicU64,
    data_received: AtomicU64,
    gaps_sent: AtomicU64,
    gaps_applied: AtomicU64,
    /// Missing-sample events seen by reliable readers.
    gaps_detected: AtomicU64,
    /// Largest run of missing samples (high-water mark).
    max_gap_size: AtomicU64,
    stale_events: AtomicU64,
    malformed_messages: AtomicU64,
}

/// Plain copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub heartbeats_sent: u64,
    pub heartbeats_received: u64,
    pub acknacks_sent: u64,
    pub acknacks_received: u64,
    pub data_sent: u64,
    pub data_resent: u64,
    pub data_received: u64,
    pub gaps_sent: u64,
    pub gaps_applied: u64,
    pub gaps_detected: u64,
    pub max_gap_size: u64,
    pub stale_events: u64,
    pub malformed_messages: u64,
}

macro_rules! counter {
    ($($inc:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $inc(&self, count: u64) {
                self.$field.fetch_add(count, Ordering::Relaxed);
            }
        )*
    };
}

impl ReliabilityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(
        increment_heartbeats_sent => heartbeats_sent,
        increment_heartbeats_received => heartbeats_received,
        increment_acknacks_sent => acknacks_sent,
        increment_acknacks_received => acknacks_received,
        increment_data_sent => data_sent,
        increment_data_resent => data_resent,
        increment_data_received => data_received,
        increment_gaps_sent => gaps_sent,
        increment_gaps_applied => gaps_applied,
        increment_stale_events => stale_events,
        increment_malformed_messages => malformed_messages,
    );

    /// Record a run of `gap_size` missing samples.
    pub fn record_gap(&self, gap_size: u64) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
        self.update_max_gap_size(gap_size);
    }

    fn update_max_gap_size(&self, new_size: u64) {
        let mut current = self.max_gap_size.load(Ordering::Relaxed);
        while new_size > current {
            match self.max_gap_size.compare_exchange_weak(
                current,
                new_size,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeats_received: self.heartbeats_received.load(Ordering::Relaxed),
            acknacks_sent: self.acknacks_sent.load(Ordering::Relaxed),
            acknacks_received: self.acknacks_received.load(Ordering::Relaxed),
            data_sent: self.data_sent.load(Ordering::Relaxed),
            data_resent: self.data_resent.load(Ordering::Relaxed),
            data_received: self.data_received.load(Ordering::Relaxed),
            gaps_sent: self.gaps_sent.load(Ordering::Relaxed),
            gaps_applied: self.gaps_applied.load(Ordering::Relaxed),
            gaps_detected: self.gaps_detected.load(Ordering::Relaxed),
            max_gap_size: self.max_gap_size.load(Ordering::Relaxed),
            stale_events: self.stale_events.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_gap_keeps_high_water_mark() {
        let metrics = ReliabilityMetrics::new();
        metrics.record_gap(3);
        metrics.record_gap(1);
        metrics.record_gap(7);
        let snap = metrics.snapshot();
        assert_eq!(snap.gaps_detected, 3);
        assert_eq!(snap.max_gap_size, 7);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(ReliabilityMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.increment_heartbeats_sent(1);
                    }
                    m.record_gap(i * 10);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("join");
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.heartbeats_sent, 4000);
        assert_eq!(snap.max_gap_size, 30);
    }
}
