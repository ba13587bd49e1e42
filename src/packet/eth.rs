use network_types::eth::{EthHdr, EtherType};

use crate::mac::{ETH_ALEN, MacAddr};

/// The fields of an Ethernet II header this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ethernet {
    pub dst: MacAddr,
    pub src: MacAddr,
    /// EtherType in host byte order.
    pub ether_type: u16,
}

impl Ethernet {
    /// Decodes the header from exactly [`EthHdr::LEN`] bytes.
    pub fn from_bytes(raw: &[u8; EthHdr::LEN]) -> Self {
        let mut dst = [0u8; ETH_ALEN];
        let mut src = [0u8; ETH_ALEN];
        dst.copy_from_slice(&raw[..ETH_ALEN]);
        src.copy_from_slice(&raw[ETH_ALEN..2 * ETH_ALEN]);

        Self {
            dst: MacAddr::new(dst),
            src: MacAddr::new(src),
            ether_type: u16::from_be_bytes([raw[12], raw[13]]),
        }
    }

    pub fn is_ipv4(&self) -> bool {
        // EtherType discriminants hold the wire (big-endian) representation.
        self.ether_type == u16::from_be(EtherType::Ipv4 as u16)
    }
}
