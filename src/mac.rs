use std::fmt;
use std::str::FromStr;

/// Length of an Ethernet hardware address in bytes.
pub const ETH_ALEN: usize = 6;

/// A link-layer (MAC) address.
///
/// # Examples
///
/// ```
/// # use overseer::mac::MacAddr;
/// let mac: MacAddr = "AA:bb:cc:00:11:22".parse().unwrap();
/// assert_eq!(mac.to_string(), "aa:bb:cc:00:11:22");
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; ETH_ALEN]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid hardware address `{0}`: expected 6 colon-separated octets")]
    InvalidLength(String),
    #[error("invalid hardware address `{0}`: bad octet `{1}`")]
    InvalidOctet(String, String),
}

impl MacAddr {
    pub const fn new(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }
}

impl From<[u8; ETH_ALEN]> for MacAddr {
    fn from(octets: [u8; ETH_ALEN]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = ParseError;

    /// Parses the colon (or dash) separated notation used by dnsmasq and `ip link`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; ETH_ALEN];
        let mut parts = s.split([':', '-']);
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| ParseError::InvalidLength(s.to_owned()))?;
            if part.len() != 2 {
                return Err(ParseError::InvalidOctet(s.to_owned(), part.to_owned()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidOctet(s.to_owned(), part.to_owned()))?;
        }

        if parts.next().is_some() {
            return Err(ParseError::InvalidLength(s.to_owned()));
        }

        Ok(Self(octets))
    }
}

impl serde::Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_lowercase_colon_separated() {
        let mac = MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        let colon: MacAddr = "02:42:ac:11:00:02".parse().unwrap();
        let dash: MacAddr = "02-42-AC-11-00-02".parse().unwrap();
        assert_eq!(colon, dash);
        assert_eq!(colon.octets(), [0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(matches!(
            "02:42:ac:11:00".parse::<MacAddr>(),
            Err(ParseError::InvalidLength(_))
        ));
        assert!(matches!(
            "02:42:ac:11:00:02:03".parse::<MacAddr>(),
            Err(ParseError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_octet() {
        assert!(matches!(
            "02:42:zz:11:00:02".parse::<MacAddr>(),
            Err(ParseError::InvalidOctet(_, octet)) if octet == "zz"
        ));
        assert!(matches!(
            "2:42:ac:11:00:02".parse::<MacAddr>(),
            Err(ParseError::InvalidOctet(_, _))
        ));
    }
}
