/// Accumulated counters of one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct FlowStats {
    pub packets: u64,
    pub bytes: u64,
    /// Monitor clock timestamp of the most recent update, in nanoseconds.
    pub last_seen: u64,
}

impl FlowStats {
    /// Stats of a flow that has just been observed for the first time.
    pub const fn first(bytes: u64, now: u64) -> Self {
        Self {
            packets: 1,
            bytes,
            last_seen: now,
        }
    }

    /// Accounts one more packet of `bytes` length seen at `now`.
    ///
    /// Counters saturate instead of wrapping so they never decrease.
    #[inline]
    pub fn record(&mut self, bytes: u64, now: u64) {
        self.packets = self.packets.saturating_add(1);
        self.bytes = self.bytes.saturating_add(bytes);
        self.last_seen = now;
    }
}
