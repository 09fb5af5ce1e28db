// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-layout RTPS building blocks.

pub mod guid;
pub mod locator;
pub mod sequence;
pub mod time;

pub use guid::{EntityId, EntityOrigin, Guid, GuidPrefix, ProtocolVersion, VendorId};
pub use locator::{Locator, LocatorUdpV4};
pub use sequence::{FragmentNumberSet, SequenceNumber, SequenceNumberSet};
pub use time::Time;
