// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport addresses carried in INFO_REPLY / INFO_REPLY_IP4 and proxies.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::wire::{Cursor, CursorMut, WireRead, WireResult, WireWrite};

/// Locator_t: (kind, port, 16-byte address). 24 bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub kind: i32,
    pub port: u32,
    pub address: [u8; 16],
}

impl Locator {
    pub const KIND_INVALID: i32 = -1;
    pub const KIND_RESERVED: i32 = 0;
    pub const KIND_UDPV4: i32 = 1;
    pub const KIND_UDPV6: i32 = 2;

    pub const INVALID: Self = Self {
        kind: Self::KIND_INVALID,
        port: 0,
        address: [0; 16],
    };

    pub fn udp_v4(addr: Ipv4Addr, port: u16) -> Self {
        let mut address = [0u8; 16];
        address[12..].copy_from_slice(&addr.octets());
        Self {
            kind: Self::KIND_UDPV4,
            port: u32::from(port),
            address,
        }
    }

    pub fn udp_v6(addr: Ipv6Addr, port: u16) -> Self {
        Self {
            kind: Self::KIND_UDPV6,
            port: u32::from(port),
            address: addr.octets(),
        }
    }

    /// Socket address for UDP locators, `None` for other kinds.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let port = u16::try_from(self.port).ok()?;
        match self.kind {
            Self::KIND_UDPV4 => {
                let ip = Ipv4Addr::new(
                    self.address[12],
                    self.address[13],
                    self.address[14],
                    self.address[15],
                );
                Some(SocketAddr::new(IpAddr::V4(ip), port))
            }
            Self::KIND_UDPV6 => Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(self.address)), port)),
            _ => None,
        }
    }
}

impl From<SocketAddr> for Locator {
    fn from(addr: SocketAddr) -> Self {
        match addr.ip() {
            IpAddr::V4(ip) => Self::udp_v4(ip, addr.port()),
            IpAddr::V6(ip) => Self::udp_v6(ip, addr.port()),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Some(addr) => write!(f, "Locator(udp://{})", addr),
            None => write!(f, "Locator(kind={}, port={})", self.kind, self.port),
        }
    }
}

impl WireRead for Locator {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let kind = cursor.read_i32()?;
        let port = cursor.read_u32()?;
        let address = cursor.read_array()?;
        Ok(Self {
            kind,
            port,
            address,
        })
    }
}

impl WireWrite for Locator {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_i32(self.kind)?;
        cursor.write_u32(self.port)?;
        cursor.write_bytes(&self.address)
    }
}

/// LocatorUDPv4_t as used by INFO_REPLY_IP4: (address u32, port u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocatorUdpV4 {
    pub address: u32,
    pub port: u32,
}

impl LocatorUdpV4 {
    pub fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self {
            address: u32::from(addr),
            port: u32::from(port),
        }
    }

    /// Equivalent full-size locator.
    pub fn to_locator(self) -> Locator {
        let mut address = [0u8; 16];
        address[12..].copy_from_slice(&self.address.to_be_bytes());
        Locator {
            kind: Locator::KIND_UDPV4,
            port: self.port,
            address,
        }
    }
}

impl WireRead for LocatorUdpV4 {
    fn read_from(cursor: &mut Cursor<'_>) -> WireResult<Self> {
        let address = cursor.read_u32()?;
        let port = cursor.read_u32()?;
        Ok(Self { address, port })
    }
}

impl WireWrite for LocatorUdpV4 {
    fn write_to(&self, cursor: &mut CursorMut<'_>) -> WireResult<()> {
        cursor.write_u32(self.address)?;
        cursor.write_u32(self.port)
    }
}

/// Length-prefixed locator list (INFO_REPLY).
pub(crate) fn read_locator_list(cursor: &mut Cursor<'_>) -> WireResult<Vec<Locator>> {
    let count = cursor.read_u32()? as usize;
    // each locator needs 24 bytes, so an absurd count fails on the first short read
    let mut list = Vec::with_capacity(count.min(cursor.remaining() / 24));
    for _ in 0..count {
        list.push(Locator::read_from(cursor)?);
    }
    Ok(list)
}

pub(crate) fn write_locator_list(cursor: &mut CursorMut<'_>, list: &[Locator]) -> WireResult<()> {
    cursor.write_u32(list.len() as u32)?;
    for locator in list {
        locator.write_to(cursor)?;
    }
    Ok(())
}
