use crate::flow::{Direction, FlowKey, FlowStats};
use crate::mac::MacAddr;
use crate::names::Names;

/// One flow as listed by `GET /flows`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FlowEntry {
    pub ip: std::net::Ipv4Addr,
    pub macaddr: MacAddr,
    pub ifindex: u32,
    pub interface: String,
    pub direction: Direction,
    pub hostname: Option<String>,
    pub packets: u64,
    pub bytes: u64,
    pub last_seen_ns: u64,
}

impl FlowEntry {
    pub fn new(key: &FlowKey, stats: &FlowStats, names: &Names) -> Self {
        Self {
            ip: key.address(),
            macaddr: key.mac(),
            ifindex: key.ifindex(),
            interface: names.link_name(key.ifindex()),
            direction: key.direction(),
            hostname: names.hostname(&key.mac()),
            packets: stats.packets,
            bytes: stats.bytes,
            last_seen_ns: stats.last_seen,
        }
    }
}
