// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by the RTPS core.

use std::fmt;

use crate::types::Guid;
use crate::wire::WireError;

/// Errors returned by codec and engine operations.
///
/// None of these terminate the receive loop: the participant logs them and
/// moves on to the next datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Wire Errors
    // ========================================================================
    /// Bad magic, truncated header, or a submessage that read past the end.
    /// The whole message is discarded.
    MalformedMessage { reason: String },

    /// A submessage body violates its own layout rules.
    InvalidSubmessage { kind: u8, reason: &'static str },

    /// Read past the end of the input.
    BufferUnderrun { offset: usize, needed: usize },

    /// Destination buffer cannot hold the RTPS header.
    BufferOverflow { offset: usize, needed: usize },

    /// Field value out of range.
    InvalidData { reason: String },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// Remote entity is not matched with any local endpoint.
    UnknownPeer(Guid),

    /// No local endpoint with this entity id.
    UnknownEndpoint(Guid),

    /// Transport could not deliver a datagram.
    Transport { reason: String },

    /// Participant worker has been shut down.
    Shutdown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedMessage { reason } => write!(f, "malformed message: {}", reason),
            Error::InvalidSubmessage { kind, reason } => {
                write!(f, "invalid submessage 0x{:02x}: {}", kind, reason)
            }
            Error::BufferUnderrun { offset, needed } => {
                write!(f, "buffer underrun at offset {}: {} bytes needed", offset, needed)
            }
            Error::BufferOverflow { offset, needed } => {
                write!(f, "buffer overflow at offset {}: {} bytes needed", offset, needed)
            }
            Error::InvalidData { reason } => write!(f, "invalid data: {}", reason),
            Error::UnknownPeer(guid) => write!(f, "unknown peer {:?}", guid),
            Error::UnknownEndpoint(guid) => write!(f, "unknown local endpoint {:?}", guid),
            Error::Transport { reason } => write!(f, "transport error: {}", reason),
            Error::Shutdown => write!(f, "participant shut down"),
        }
    }
}

impl std::error::Error for Error {}

impl From<WireError> for Error {
    fn from(err: WireError) -> Self {
        match err {
            WireError::BufferUnderrun { offset, needed } => Error::BufferUnderrun { offset, needed },
            WireError::BufferOverflow { offset, needed } => Error::BufferOverflow { offset, needed },
            WireError::InvalidData { reason } => Error::InvalidData { reason },
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
