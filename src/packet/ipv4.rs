use std::net::Ipv4Addr;

use network_types::ip::Ipv4Hdr;

/// The fields of an IPv4 header this crate cares about.
///
/// Addresses are kept exactly as they appear on the wire, i.e. in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4 {
    pub version: u8,
    /// Header length in 32-bit words.
    pub ihl: u8,
    pub tot_len: u16,
    pub src_addr: u32,
    pub dst_addr: u32,
}

impl Ipv4 {
    /// Decodes the fixed part of the header from exactly [`Ipv4Hdr::LEN`] bytes.
    pub fn from_bytes(raw: &[u8; Ipv4Hdr::LEN]) -> Self {
        Self {
            version: raw[0] >> 4,
            ihl: raw[0] & 0x0f,
            tot_len: u16::from_be_bytes([raw[2], raw[3]]),
            src_addr: u32::from_ne_bytes([raw[12], raw[13], raw[14], raw[15]]),
            dst_addr: u32::from_ne_bytes([raw[16], raw[17], raw[18], raw[19]]),
        }
    }

    /// Length of the header including options, in bytes.
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }

    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.src_addr))
    }

    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.dst_addr))
    }
}
