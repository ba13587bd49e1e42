use std::fmt;
use std::net::Ipv4Addr;

use crate::mac::MacAddr;

/// Direction of traffic relative to the monitored interface.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Arriving from the private network.
    Ingress = 0,
    /// Departing toward the private network.
    Egress = 1,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an accounted flow.
///
/// The layout is fixed (16 bytes, no implicit padding): the trailing padding
/// byte is an explicit, always-zero field, so the derived `Eq` and `Hash`
/// cover every byte of the key.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// IPv4 address in network byte order.
    address: u32,
    ifindex: u32,
    mac: MacAddr,
    direction: Direction,
    _pad: u8,
}

const _: () = assert!(std::mem::size_of::<FlowKey>() == 16);

impl FlowKey {
    /// Creates a key from an address in network byte order, as read from the wire.
    pub const fn new(address_be: u32, ifindex: u32, mac: MacAddr, direction: Direction) -> Self {
        Self {
            address: address_be,
            ifindex,
            mac,
            direction,
            _pad: 0,
        }
    }

    /// Raw address in network byte order.
    pub const fn address_be(&self) -> u32 {
        self.address
    }

    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.address))
    }

    pub const fn ifindex(&self) -> u32 {
        self.ifindex
    }

    pub const fn mac(&self) -> MacAddr {
        self.mac
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ip:{} macaddr:{} ifindex:{} direction:{}",
            self.address(),
            self.mac,
            self.ifindex,
            self.direction
        )
    }
}
