// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound datagram seam.
//!
//! The engine never touches sockets. It hands encoded messages to a
//! [`Transport`]; inbound datagrams arrive through the channel given to
//! [`crate::Participant::spawn`].
//!
//! - [`LoopbackTransport`]: records every datagram (tests, tracing)
//! - [`ChannelTransport`]: forwards datagrams to per-locator channels,
//!   wiring participants together in-process

use std::collections::HashMap;

use crossbeam::channel::Sender;
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::types::Locator;

/// Datagram sink used by readers and writers.
pub trait Transport: Send + Sync {
    fn send(&self, locator: &Locator, bytes: &[u8]) -> Result<()>;
}

/// In-memory transport that records sent datagrams.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    sent: Mutex<Vec<(Locator, Vec<u8>)>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything sent so far, oldest first.
    pub fn take(&self) -> Vec<(Locator, Vec<u8>)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Drain only the datagram payloads.
    pub fn take_datagrams(&self) -> Vec<Vec<u8>> {
        self.take().into_iter().map(|(_, bytes)| bytes).collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, locator: &Locator, bytes: &[u8]) -> Result<()> {
        self.sent.lock().push((*locator, bytes.to_vec()));
        Ok(())
    }
}

/// Routes each locator to a crossbeam channel.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    routes: RwLock<HashMap<Locator, Sender<Vec<u8>>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver datagrams for `locator` into `sender`.
    pub fn route(&self, locator: Locator, sender: Sender<Vec<u8>>) {
        self.routes.write().insert(locator, sender);
    }

    pub fn unroute(&self, locator: &Locator) {
        self.routes.write().remove(locator);
    }
}

impl Transport for ChannelTransport {
    fn send(&self, locator: &Locator, bytes: &[u8]) -> Result<()> {
        let routes = self.routes.read();
        let sender = routes.get(locator).ok_or_else(|| Error::Transport {
            reason: format!("no route to {:?}", locator),
        })?;
        sender.send(bytes.to_vec()).map_err(|_| Error::Transport {
            reason: format!("receiver for {:?} disconnected", locator),
        })
    }
}

/// An encoded datagram and its destinations.
pub(crate) struct Outbound {
    pub locators: Vec<Locator>,
    pub bytes: Vec<u8>,
}

/// Unicast locators when there are any, multicast otherwise.
pub(crate) fn destinations(unicast: &[Locator], multicast: &[Locator]) -> Vec<Locator> {
    if unicast.is_empty() {
        multicast.to_vec()
    } else {
        unicast.to_vec()
    }
}

/// Send every datagram of `batch`. Failures are logged, never propagated.
pub(crate) fn flush(transport: &dyn Transport, batch: Vec<Outbound>, tag: &str) {
    for out in batch {
        for locator in &out.locators {
            if let Err(e) = transport.send(locator, &out.bytes) {
                log::warn!("{} send to {:?} failed: {}", tag, locator, e);
            }
        }
    }
}
