// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS Time_t: seconds plus 1/2^32 fractions of a second.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// Timestamp carried by INFO_TIMESTAMP and attached to cache changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Time {
    pub seconds: i32,
    pub fraction: u32,
}

impl Time {
    pub const ZERO: Self = Self {
        seconds: 0,
        fraction: 0,
    };
    pub const INVALID: Self = Self {
        seconds: -1,
        fraction: 0xffff_ffff,
    };
    pub const INFINITE: Self = Self {
        seconds: 0x7fff_ffff,
        fraction: 0xffff_ffff,
    };

    pub const fn new(seconds: i32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Offset from the UNIX epoch, `None` for the sentinels and negative times.
    pub fn to_duration(self) -> Option<Duration> {
        if self == Self::INVALID || self == Self::INFINITE || self.seconds < 0 {
            return None;
        }
        let nanos = (u64::from(self.fraction) * 1_000_000_000) >> 32;
        Some(Duration::new(self.seconds as u64, nanos as u32))
    }
}

impl From<Duration> for Time {
    fn from(d: Duration) -> Self {
        let seconds = i32::try_from(d.as_secs()).unwrap_or(i32::MAX);
        let fraction = ((u64::from(d.subsec_nanos()) << 32) / 1_000_000_000) as u32;
        Self { seconds, fraction }
    }
}

impl From<SystemTime> for Time {
    fn from(t: SystemTime) -> Self {
        t.duration_since(UNIX_EPOCH)
            .map(Self::from)
            .unwrap_or(Self::ZERO)
    }
}

impl WireRead for Time {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let seconds = cursor.read_i32()?;
        let fraction = cursor.read_u32()?;
        Ok(Self { seconds, fraction })
    }
}

impl WireWrite for Time {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_i32(self.seconds)?;
        cursor.write_u32(self.fraction)
    }
}
