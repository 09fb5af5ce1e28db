// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS constants and engine configuration.
//!
//! - **Static**: wire constants (magic, version, vendor id, sizes)
//! - **Dynamic**: [`EngineConfig`] timing knobs for the reliability loop,
//!   shared between endpoints as `Arc<EngineConfig>`
//!
//! # Environment overrides
//!
//! [`EngineConfig::from_env`] starts from the defaults and applies:
//!
//! | Variable | Field |
//! |---|---|
//! | `RTPS_HEARTBEAT_PERIOD_MS` | `heartbeat_period` |
//! | `RTPS_HEARTBEAT_RESPONSE_DELAY_MS` | `heartbeat_response_delay` |
//! | `RTPS_HEARTBEAT_SUPPRESSION_MS` | `heartbeat_suppression` |
//! | `RTPS_NACK_RESPONSE_DELAY_MS` | `nack_response_delay` |
//! | `RTPS_NACK_SUPPRESSION_MS` | `nack_suppression` |
//! | `RTPS_PUSH_MODE` | `push_mode` (`0`/`1`/`true`/`false`) |
//! | `RTPS_MAX_MESSAGE_SIZE` | `max_message_size` |
//! | `RTPS_WORKER_THREADS` | `worker_threads` |

use std::time::Duration;

use crate::types::{ProtocolVersion, VendorId};

// =======================================================================
// Wire Constants
// =======================================================================

/// RTPS magic bytes at the start of every message.
pub const RTPS_MAGIC: [u8; 4] = *b"RTPS";

/// Protocol version emitted in message headers.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V2_3;

/// Vendor id emitted in message headers.
pub const VENDOR_ID: VendorId = VendorId([0x01, 0xAA]);

/// Fixed RTPS message header size (magic + version + vendor + prefix).
pub const RTPS_HEADER_SIZE: usize = 20;

/// Submessage header size (kind + flags + octetsToNextHeader).
pub const SUBMESSAGE_HEADER_SIZE: usize = 4;

/// Maximum number of bits in a SequenceNumberSet / FragmentNumberSet bitmap.
pub const MAX_BITMAP_BITS: u32 = 256;

/// Words needed for a full bitmap.
pub const MAX_BITMAP_WORDS: usize = (MAX_BITMAP_BITS / 32) as usize;

/// octetsToInlineQos written for DATA (readerId + writerId + writerSN).
pub const DATA_OCTETS_TO_INLINE_QOS: u16 = 16;

/// octetsToInlineQos written for DATA_FRAG (DATA fields + fragment info).
pub const DATA_FRAG_OCTETS_TO_INLINE_QOS: u16 = 28;

// =======================================================================
// Engine Defaults
// =======================================================================

/// Default period between unsolicited heartbeats.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(3);

/// Default delay before a reader answers a heartbeat.
pub const DEFAULT_HEARTBEAT_RESPONSE_DELAY: Duration = Duration::from_millis(500);

/// Default delay before a writer answers an AckNack.
pub const DEFAULT_NACK_RESPONSE_DELAY: Duration = Duration::from_millis(200);

/// Default datagram budget (fits a typical Ethernet MTU).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1400;

/// Default worker poll granularity for timers.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Timing and sizing knobs for the reliability engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of unsolicited writer announcements.
    pub heartbeat_period: Duration,
    /// Delay before a reader sends the AckNack answering a heartbeat.
    pub heartbeat_response_delay: Duration,
    /// Minimum spacing between two accepted heartbeats from one writer.
    pub heartbeat_suppression: Duration,
    /// Delay before a writer repairs after an AckNack.
    pub nack_response_delay: Duration,
    /// Minimum spacing between two accepted AckNacks from one reader.
    pub nack_suppression: Duration,
    /// Push data to readers on application writes instead of announcing it.
    pub push_mode: bool,
    /// Size of the encode buffer for outbound datagrams.
    pub max_message_size: usize,
    /// Number of inbound worker threads.
    pub worker_threads: usize,
    /// Worker wake-up interval for firing timers.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            heartbeat_response_delay: DEFAULT_HEARTBEAT_RESPONSE_DELAY,
            heartbeat_suppression: Duration::ZERO,
            nack_response_delay: DEFAULT_NACK_RESPONSE_DELAY,
            nack_suppression: Duration::ZERO,
            push_mode: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            worker_threads: 1,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Defaults with `RTPS_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_millis("RTPS_HEARTBEAT_PERIOD_MS") {
            config.heartbeat_period = v;
        }
        if let Some(v) = env_millis("RTPS_HEARTBEAT_RESPONSE_DELAY_MS") {
            config.heartbeat_response_delay = v;
        }
        if let Some(v) = env_millis("RTPS_HEARTBEAT_SUPPRESSION_MS") {
            config.heartbeat_suppression = v;
        }
        if let Some(v) = env_millis("RTPS_NACK_RESPONSE_DELAY_MS") {
            config.nack_response_delay = v;
        }
        if let Some(v) = env_millis("RTPS_NACK_SUPPRESSION_MS") {
            config.nack_suppression = v;
        }
        if let Ok(v) = std::env::var("RTPS_PUSH_MODE") {
            match v.as_str() {
                "1" | "true" => config.push_mode = true,
                "0" | "false" => config.push_mode = false,
                other => log::warn!("[CONFIG] ignoring RTPS_PUSH_MODE={}", other),
            }
        }
        if let Some(v) = env_parse::<usize>("RTPS_MAX_MESSAGE_SIZE") {
            config.max_message_size = v;
        }
        if let Some(v) = env_parse::<usize>("RTPS_WORKER_THREADS") {
            config.worker_threads = v.max(1);
        }
        config
    }

    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    pub fn with_heartbeat_response_delay(mut self, delay: Duration) -> Self {
        self.heartbeat_response_delay = delay;
        self
    }

    pub fn with_heartbeat_suppression(mut self, window: Duration) -> Self {
        self.heartbeat_suppression = window;
        self
    }

    pub fn with_nack_response_delay(mut self, delay: Duration) -> Self {
        self.nack_response_delay = delay;
        self
    }

    pub fn with_nack_suppression(mut self, window: Duration) -> Self {
        self.nack_suppression = window;
        self
    }

    pub fn with_push_mode(mut self, push: bool) -> Self {
        self.push_mode = push;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[CONFIG] ignoring {}={} (not a number)", name, raw);
            None
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}
