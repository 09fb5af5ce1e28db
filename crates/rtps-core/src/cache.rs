// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Change caches the reliability engine reads from and delivers into.
//!
//! The engine only needs [`WriterCache`] (what can be resent) and
//! [`ReaderCache`] (where accepted samples go). [`HistoryCache`] and
//! [`ReaderHistory`] are bounded in-memory implementations.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{Guid, SequenceNumber, Time};

/// Lifecycle kind of a change, carried on the wire by PID_STATUS_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeKind {
    #[default]
    Alive,
    Disposed,
    Unregistered,
    DisposedUnregistered,
}

/// One sample of a writer's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheChange {
    pub writer_guid: Guid,
    pub sequence_number: SequenceNumber,
    pub kind: ChangeKind,
    /// Instance key hash, if the topic is keyed.
    pub key_hash: Option<[u8; 16]>,
    /// Serialized payload (encapsulation header included). For non-Alive
    /// kinds this holds the serialized key.
    pub payload: Arc<[u8]>,
    pub timestamp: Time,
}

impl CacheChange {
    pub fn new(
        writer_guid: Guid,
        sequence_number: SequenceNumber,
        payload: impl Into<Arc<[u8]>>,
        timestamp: Time,
    ) -> Self {
        Self {
            writer_guid,
            sequence_number,
            kind: ChangeKind::Alive,
            key_hash: None,
            payload: payload.into(),
            timestamp,
        }
    }
}

/// Destination of samples accepted by a reader.
pub trait ReaderCache: Send + Sync {
    fn add_change(&self, change: CacheChange);
}

/// Source of samples a writer announces and repairs.
pub trait WriterCache: Send + Sync {
    /// Cached changes with sequence number strictly greater than `seq`, ascending.
    fn samples_since(&self, seq: SequenceNumber) -> Vec<CacheChange>;

    /// Lowest cached sequence number (`seq_num_max + 1` when empty).
    fn seq_num_min(&self) -> SequenceNumber;

    /// Highest sequence number ever written (0 before the first write).
    fn seq_num_max(&self) -> SequenceNumber;
}

/// Writer history with KEEP_LAST(depth) eviction.
///
/// Sequence numbers are assigned on write, starting at 1.
pub struct HistoryCache {
    writer_guid: Guid,
    depth: usize,
    inner: Mutex<HistoryInner>,
}

struct HistoryInner {
    ring: VecDeque<CacheChange>,
    last_seq: SequenceNumber,
}

impl HistoryCache {
    pub fn new(writer_guid: Guid, depth: usize) -> Self {
        Self {
            writer_guid,
            depth: depth.max(1),
            inner: Mutex::new(HistoryInner {
                ring: VecDeque::with_capacity(depth.max(1)),
                last_seq: SequenceNumber::ZERO,
            }),
        }
    }

    /// Append an Alive sample stamped with the current time.
    pub fn write(&self, payload: impl Into<Arc<[u8]>>) -> SequenceNumber {
        self.write_change(ChangeKind::Alive, None, payload.into(), Time::now())
    }

    /// Append a change of any kind.
    pub fn write_change(
        &self,
        kind: ChangeKind,
        key_hash: Option<[u8; 16]>,
        payload: Arc<[u8]>,
        timestamp: Time,
    ) -> SequenceNumber {
        let mut inner = self.inner.lock();
        let seq = inner.last_seq + 1;
        inner.last_seq = seq;
        if inner.ring.len() == self.depth {
            inner.ring.pop_front();
        }
        inner.ring.push_back(CacheChange {
            writer_guid: self.writer_guid,
            sequence_number: seq,
            kind,
            key_hash,
            payload,
            timestamp,
        });
        seq
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().ring.is_empty()
    }
}

impl WriterCache for HistoryCache {
    fn samples_since(&self, seq: SequenceNumber) -> Vec<CacheChange> {
        let inner = self.inner.lock();
        inner
            .ring
            .iter()
            .filter(|c| c.sequence_number > seq)
            .cloned()
            .collect()
    }

    fn seq_num_min(&self) -> SequenceNumber {
        let inner = self.inner.lock();
        inner
            .ring
            .front()
            .map_or(inner.last_seq + 1, |c| c.sequence_number)
    }

    fn seq_num_max(&self) -> SequenceNumber {
        self.inner.lock().last_seq
    }
}

/// Reader-side collector of delivered changes.
#[derive(Default)]
pub struct ReaderHistory {
    changes: Mutex<Vec<CacheChange>>,
}

impl ReaderHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything delivered so far.
    pub fn take(&self) -> Vec<CacheChange> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Sequence numbers delivered so far, in arrival order.
    pub fn sequence_numbers(&self) -> Vec<SequenceNumber> {
        self.changes
            .lock()
            .iter()
            .map(|c| c.sequence_number)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }
}

impl ReaderCache for ReaderHistory {
    fn add_change(&self, change: CacheChange) {
        self.changes.lock().push(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_bounds() {
        let cache = HistoryCache::new(Guid::UNKNOWN, 4);
        assert_eq!(cache.seq_num_max(), SequenceNumber(0));
        assert_eq!(cache.seq_num_min(), SequenceNumber(1));
        assert!(cache.samples_since(SequenceNumber(0)).is_empty());
    }

    #[test]
    fn test_keep_last_evicts_oldest() {
        let cache = HistoryCache::new(Guid::UNKNOWN, 3);
        for i in 0..5u8 {
            cache.write(vec![i]);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.seq_num_min(), SequenceNumber(3));
        assert_eq!(cache.seq_num_max(), SequenceNumber(5));
    }

    #[test]
    fn test_samples_since_is_exclusive_and_ordered() {
        let cache = HistoryCache::new(Guid::UNKNOWN, 10);
        for i in 0..5u8 {
            cache.write(vec![i]);
        }
        let seqs: Vec<i64> = cache
            .samples_since(SequenceNumber(2))
            .iter()
            .map(|c| c.sequence_number.0)
            .collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[test]
    fn test_reader_history_take() {
        let history = ReaderHistory::new();
        history.add_change(CacheChange::new(
            Guid::UNKNOWN,
            SequenceNumber(1),
            vec![1u8],
            Time::ZERO,
        ));
        assert_eq!(history.sequence_numbers(), vec![SequenceNumber(1)]);
        assert_eq!(history.take().len(), 1);
        assert!(history.is_empty());
    }
}
