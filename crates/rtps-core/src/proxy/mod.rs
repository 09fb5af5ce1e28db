// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local records of matched remote endpoints.
//!
//! - [`WriterProxy`]: kept by a reader for each matched remote writer
//! - [`ReaderProxy`]: kept by a writer for each matched remote reader
//!
//! Proxies are plain state machines. They never send anything; the
//! engines in [`crate::reader`] and [`crate::writer`] act on their answers.

pub mod reader_proxy;
pub mod writer_proxy;

pub use reader_proxy::ReaderProxy;
pub use writer_proxy::{DataAcceptance, WriterProxy};

use std::time::{Duration, Instant};

/// Reliability kind of an endpoint or a matched proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReliabilityKind {
    BestEffort,
    #[default]
    Reliable,
}

impl ReliabilityKind {
    pub fn is_reliable(self) -> bool {
        self == ReliabilityKind::Reliable
    }
}

/// Durability kind of a matched reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DurabilityKind {
    /// Only samples written after the match are delivered.
    #[default]
    Volatile,
    /// Samples still in the writer cache are delivered on match.
    TransientLocal,
}

/// Progress of one proxy through the reliability protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyState {
    /// Matched, no protocol event accepted yet.
    Tracking,
    /// Events accepted, the remote side is not in sync.
    Advancing,
    /// Everything announced has been received (or acknowledged).
    Synced,
}

/// Change of a writer proxy's liveliness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LivelinessChange {
    Lost,
    Restored,
}

/// Count and arrival time of the latest accepted Heartbeat or AckNack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CountStamp {
    pub count: u32,
    pub received_at: Instant,
}

/// Shared accept rule for Heartbeat and AckNack: the first event is always
/// accepted, later ones need a strictly newer count and must fall outside
/// the suppression window of the previous accepted one.
pub(crate) fn accept_count(
    latest: Option<CountStamp>,
    count: u32,
    now: Instant,
    suppression: Duration,
) -> bool {
    match latest {
        None => true,
        Some(prev) => {
            count > prev.count && now.saturating_duration_since(prev.received_at) >= suppression
        }
    }
}
