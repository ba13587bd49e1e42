//! Bounds-checked Ethernet/IPv4 header extraction.
//!
//! Packet bytes are untrusted. Every header is only decoded after its full
//! extent has been checked against the end of the buffer, mirroring the
//! `data + offset + size > data_end` checks a packet hook has to perform.
//!
//! Frames that cannot be parsed, or that do not carry IPv4, are not errors:
//! [`parse`] returns a [`Skip`] describing why the frame is left unaccounted.

mod eth;
mod ipv4;

use network_types::eth::EthHdr;
use network_types::ip::Ipv4Hdr;

pub use eth::Ethernet;
pub use ipv4::Ipv4;

/// Reasons a frame is passed through without accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Skip {
    #[error("{header} header needs {needed} bytes at offset {offset}, buffer has {available}")]
    Truncated {
        header: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("not an IPv4 frame (ether_type={ether_type:#06x})")]
    NotIpv4 { ether_type: u16 },
    #[error("malformed IPv4 header (version={version}, ihl={ihl})")]
    MalformedIpv4 { version: u8, ihl: u8 },
}

/// Headers extracted from a frame that carries IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headers {
    pub eth: Ethernet,
    pub ip: Ipv4,
    /// Offset of the first byte after the IPv4 header (including options).
    pub payload_offset: usize,
}

/// Returns the `N` bytes at `offset` if they lie entirely within `data`.
#[inline(always)]
fn header_at<'a, const N: usize>(
    data: &'a [u8],
    offset: usize,
    header: &'static str,
) -> Result<&'a [u8; N], Skip> {
    let truncated = Skip::Truncated {
        header,
        offset,
        needed: N,
        available: data.len(),
    };
    let end = offset.checked_add(N).ok_or(truncated)?;
    data.get(offset..end)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(truncated)
}

/// Locates and validates the Ethernet and IPv4 headers of `data`.
///
/// `data` is the linear part of the packet; its length is the boundary the
/// parser never reads past.
///
/// # Errors
///
/// Returns a [`Skip`] if a header does not fit into the buffer, the frame is
/// not IPv4, or the IPv4 header declares an impossible version or length.
pub fn parse(data: &[u8]) -> Result<Headers, Skip> {
    let eth = Ethernet::from_bytes(header_at::<{ EthHdr::LEN }>(data, 0, "ethernet")?);
    if !eth.is_ipv4() {
        return Err(Skip::NotIpv4 {
            ether_type: eth.ether_type,
        });
    }

    let ip = Ipv4::from_bytes(header_at::<{ Ipv4Hdr::LEN }>(data, EthHdr::LEN, "ipv4")?);
    if ip.version != 4 || ip.header_len() < Ipv4Hdr::LEN {
        return Err(Skip::MalformedIpv4 {
            version: ip.version,
            ihl: ip.ihl,
        });
    }

    let payload_offset = EthHdr::LEN + ip.header_len();
    if payload_offset > data.len() {
        return Err(Skip::Truncated {
            header: "ipv4 options",
            offset: EthHdr::LEN,
            needed: ip.header_len(),
            available: data.len(),
        });
    }

    Ok(Headers {
        eth,
        ip,
        payload_offset,
    })
}
