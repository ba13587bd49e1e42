//! Private address space membership.
//!
//! Only traffic involving the RFC 1918 ranges and the RFC 6598 shared address
//! space (carrier-grade NAT) is accounted. Membership is decided by masking the
//! candidate to each range's prefix length, so ranges whose prefix is not a
//! multiple of eight (`/12`, `/10`) are matched exactly.

use std::net::Ipv4Addr;

/// An IPv4 network in host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: u32,
    prefix_len: u8,
}

impl Cidr {
    /// Creates a network from its address and prefix length.
    ///
    /// Host bits of `network` are cleared. Prefix lengths above 32 are clamped to 32.
    pub const fn new(network: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = if prefix_len > 32 { 32 } else { prefix_len };
        let network = network.to_bits() & Self::mask_for(prefix_len);
        Self {
            network,
            prefix_len,
        }
    }

    const fn mask_for(prefix_len: u8) -> u32 {
        if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len as u32)
        }
    }

    pub const fn mask(&self) -> u32 {
        Self::mask_for(self.prefix_len)
    }

    pub const fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from_bits(self.network)
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns `true` if `addr` (host byte order) lies within this network.
    #[inline(always)]
    pub const fn contains_bits(&self, addr: u32) -> bool {
        addr & self.mask() == self.network
    }

    pub const fn contains(&self, addr: Ipv4Addr) -> bool {
        self.contains_bits(addr.to_bits())
    }
}

/// The address ranges treated as private (internal/LAN) space.
pub const PRIVATE_RANGES: [Cidr; 4] = [
    Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 8),
    Cidr::new(Ipv4Addr::new(172, 16, 0, 0), 12),
    Cidr::new(Ipv4Addr::new(192, 168, 0, 0), 16),
    Cidr::new(Ipv4Addr::new(100, 64, 0, 0), 10),
];

/// Returns `true` if `addr_be`, an address in network byte order as read from
/// an IPv4 header, belongs to private address space.
#[inline(always)]
pub fn is_private(addr_be: u32) -> bool {
    let addr = u32::from_be(addr_be);
    PRIVATE_RANGES.iter().any(|cidr| cidr.contains_bits(addr))
}

/// Host-order convenience wrapper around [`is_private`].
pub fn is_private_addr(addr: Ipv4Addr) -> bool {
    is_private(addr.to_bits().to_be())
}
