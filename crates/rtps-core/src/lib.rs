// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rtps-core - RTPS wire codec and reliability engine
//!
//! Binary framing of RTPS messages plus the per-endpoint reliability
//! protocol (Heartbeat / AckNack / Gap) that gives every matched reader an
//! ordered, eventually complete copy of each writer's change stream over an
//! unreliable datagram transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use rtps_core::{
//!     EngineConfig, EntityId, Guid, GuidPrefix, HistoryCache, LoopbackTransport, Participant,
//!     ReliabilityKind,
//! };
//!
//! let prefix = GuidPrefix::new([1; 12]);
//! let transport = Arc::new(LoopbackTransport::new());
//! let participant = Participant::new(prefix, transport, EngineConfig::from_env());
//!
//! let writer_id = EntityId::new([0, 0, 1], EntityId::KIND_USER_WRITER_NO_KEY);
//! let cache = Arc::new(HistoryCache::new(Guid::new(prefix, writer_id), 16));
//! let writer = participant.create_writer(writer_id, ReliabilityKind::Reliable, cache.clone());
//!
//! cache.write(vec![0x00, 0x01, 0x00, 0x00, 42]);
//! writer.notify_changes(Instant::now());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Participant: endpoint registry, handle_datagram, poll, rx workers  |
//! +---------------------------------------------------------------------+
//! |  RtpsReader (WriterProxy map)    |    RtpsWriter (ReaderProxy map)  |
//! +---------------------------------------------------------------------+
//! |  receiver::dispatch: in-order routing with interpretation context   |
//! +---------------------------------------------------------------------+
//! |  Message / SubmessageBody / ParameterList                           |
//! +---------------------------------------------------------------------+
//! |  wire::Cursor / CursorMut: byte order, alignment, back-patching     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Header plus ordered submessages, decode and overflow-aware encode |
//! | [`SubmessageBody`] | Closed enum over every submessage kind |
//! | [`RtpsReader`] | Reader-side reliability engine |
//! | [`RtpsWriter`] | Writer-side reliability engine |
//! | [`Participant`] | Routes inbound datagrams to local endpoints |
//! | [`EngineConfig`] | Timing knobs shared by all endpoints |
//!
//! Time is always passed in explicitly (`Instant`), so the engines can be
//! driven deterministically with [`LoopbackTransport`].

pub mod cache;
pub mod config;
pub mod error;
pub mod message;
pub mod metrics;
pub mod parameter;
pub mod participant;
pub mod proxy;
pub mod reader;
pub mod receiver;
pub mod submessage;
pub mod transport;
pub mod types;
pub mod wire;
pub mod writer;

pub use cache::{CacheChange, ChangeKind, HistoryCache, ReaderCache, ReaderHistory, WriterCache};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use message::{EncodeOutcome, Header, Message};
pub use metrics::{MetricsSnapshot, ReliabilityMetrics};
pub use parameter::{Parameter, ParameterList};
pub use participant::{Participant, ParticipantHandle};
pub use proxy::{
    DataAcceptance, DurabilityKind, LivelinessChange, ProxyState, ReaderProxy, ReliabilityKind,
    WriterProxy,
};
pub use reader::{LivelinessListener, RtpsReader};
pub use receiver::{dispatch, Delivery, ReceiveContext, SubmessageHandler};
pub use submessage::{Submessage, SubmessageBody};
pub use transport::{ChannelTransport, LoopbackTransport, Transport};
pub use types::{
    EntityId, Guid, GuidPrefix, Locator, SequenceNumber, SequenceNumberSet, Time,
};
pub use writer::RtpsWriter;
