use std::sync::Arc;
use std::time::Instant;

use crate::accountant::{self, Observation, Outcome};
use crate::events::EventSender;
use crate::flow::{Direction, FlowTable};
use crate::packet;

/// Source of the `last_seen` timestamps, in nanoseconds.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> u64;
}

/// Monotonic nanoseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Disposition of a processed packet. The monitor is observational only and
/// always lets traffic continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
}

/// A packet as handed over by the hook that observed it.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    /// Linear packet bytes starting at the Ethernet header.
    pub data: &'a [u8],
    /// Full length of the packet. May exceed `data.len()` for multi-buffer packets.
    pub len: u64,
    /// Interface the packet was received on.
    pub ingress_ifindex: u32,
    /// Interface the packet is leaving through.
    pub egress_ifindex: u32,
}

impl<'a> Packet<'a> {
    /// A packet fully contained in `data`, seen on a single interface.
    pub fn new(data: &'a [u8], ifindex: u32) -> Self {
        Self {
            data,
            len: data.len() as u64,
            ingress_ifindex: ifindex,
            egress_ifindex: ifindex,
        }
    }

    /// Overrides the packet length, e.g. with the length of all fragments.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = len;
        self
    }
}

/// Runtime context of the packet-processing entry points.
///
/// Owns handles to the flow table, the event channel and the clock. An
/// attachment manager binds [`Monitor::ingress`] and [`Monitor::egress`] to
/// interface hooks; both may run concurrently on any number of threads.
pub struct Monitor<C = MonotonicClock> {
    table: Arc<FlowTable>,
    events: EventSender,
    clock: C,
}

impl Monitor<MonotonicClock> {
    pub fn new(table: Arc<FlowTable>, events: EventSender) -> Self {
        Self::with_clock(table, events, MonotonicClock::default())
    }
}

impl<C: Clock> Monitor<C> {
    pub fn with_clock(table: Arc<FlowTable>, events: EventSender, clock: C) -> Self {
        Self {
            table,
            events,
            clock,
        }
    }

    pub fn table(&self) -> &Arc<FlowTable> {
        &self.table
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Entry point for traffic arriving from the private network.
    ///
    /// Accounts the source address and source MAC on the ingress interface.
    pub fn ingress(&self, packet: &Packet<'_>) -> Verdict {
        self.process(packet, Direction::Ingress);
        Verdict::Continue
    }

    /// Entry point for traffic departing toward the private network.
    ///
    /// Accounts the destination address and destination MAC on the egress interface.
    pub fn egress(&self, packet: &Packet<'_>) -> Verdict {
        self.process(packet, Direction::Egress);
        Verdict::Continue
    }

    fn process(&self, packet: &Packet<'_>, direction: Direction) {
        let headers = match packet::parse(packet.data) {
            Ok(headers) => headers,
            Err(skip) => {
                log::trace!("{direction}: skipping packet: {skip}");
                return;
            }
        };

        let observation = match direction {
            Direction::Ingress => Observation {
                address: headers.ip.src_addr,
                mac: headers.eth.src,
                ifindex: packet.ingress_ifindex,
                direction,
                len: packet.len,
            },
            Direction::Egress => Observation {
                address: headers.ip.dst_addr,
                mac: headers.eth.dst,
                ifindex: packet.egress_ifindex,
                direction,
                len: packet.len,
            },
        };

        let outcome = accountant::account(
            &self.table,
            &self.events,
            &observation,
            self.clock.now_ns(),
        );
        if outcome != Outcome::Filtered {
            log::trace!("{direction}: {} -> {outcome:?}", observation.key());
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::Clock;

    /// A clock that only moves when told to.
    #[derive(Debug, Default)]
    pub(crate) struct ManualClock(AtomicU64);

    impl ManualClock {
        pub(crate) fn at(ns: u64) -> Self {
            Self(AtomicU64::new(ns))
        }

        pub(crate) fn set(&self, ns: u64) {
            self.0.store(ns, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ns(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::testutil::ManualClock;
    use super::*;
    use crate::events::{self, EventKind, EventReceiver};
    use crate::flow::{FlowKey, MAX_ENTRIES};
    use crate::mac::MacAddr;
    use crate::packet::testutil::{frame, frame_with_type};

    const LAN_MAC: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x0a]);
    const GW_MAC: MacAddr = MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    fn setup(capacity: usize) -> (Monitor<ManualClock>, EventReceiver) {
        let (tx, rx) = events::channel(1024);
        let monitor = Monitor::with_clock(
            Arc::new(FlowTable::with_capacity(capacity)),
            tx,
            ManualClock::at(1_000),
        );
        (monitor, rx)
    }

    fn be(addr: Ipv4Addr) -> u32 {
        u32::from_ne_bytes(addr.octets())
    }

    #[test]
    fn test_non_ipv4_is_ignored() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let buf = frame_with_type(
            LAN_MAC,
            GW_MAC,
            0x0806,
            Ipv4Addr::new(192, 168, 1, 2),
            Ipv4Addr::new(192, 168, 1, 1),
            28,
        );
        let packet = Packet::new(&buf, 2);

        assert_eq!(monitor.ingress(&packet), Verdict::Continue);
        assert_eq!(monitor.egress(&packet), Verdict::Continue);
        assert!(monitor.table().is_empty());
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_truncated_is_ignored() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let buf = frame(
            LAN_MAC,
            GW_MAC,
            Ipv4Addr::new(192, 168, 1, 2),
            Ipv4Addr::new(192, 168, 1, 1),
            0,
        );
        for len in 0..buf.len() {
            // the declared length does not matter, only the readable bytes do
            let packet = Packet::new(&buf[..len], 2).with_len(1500);
            assert_eq!(monitor.ingress(&packet), Verdict::Continue);
            assert_eq!(monitor.egress(&packet), Verdict::Continue);
        }
        assert!(monitor.table().is_empty());
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_ingress_accounts_source() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let src = Ipv4Addr::new(192, 168, 1, 50);
        let buf = frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 1, 1, 1), 100);
        let packet = Packet {
            data: &buf,
            len: buf.len() as u64,
            ingress_ifindex: 4,
            egress_ifindex: 9,
        };

        assert_eq!(monitor.ingress(&packet), Verdict::Continue);

        let key = FlowKey::new(be(src), 4, LAN_MAC, Direction::Ingress);
        let stats = monitor.table().get(&key).unwrap();
        assert_eq!(stats.packets, 1);
        assert_eq!(stats.bytes, buf.len() as u64);
        assert_eq!(stats.last_seen, 1_000);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::New);
        assert_eq!(event.key, key);
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_egress_accounts_destination() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let dst = Ipv4Addr::new(10, 20, 30, 40);
        let buf = frame(GW_MAC, LAN_MAC, Ipv4Addr::new(9, 9, 9, 9), dst, 10);
        let packet = Packet {
            data: &buf,
            len: buf.len() as u64,
            ingress_ifindex: 4,
            egress_ifindex: 9,
        };

        monitor.egress(&packet);

        let key = FlowKey::new(be(dst), 9, LAN_MAC, Direction::Egress);
        assert_eq!(monitor.table().get(&key).unwrap().packets, 1);
        assert_eq!(rx.try_recv().unwrap().key, key);
    }

    #[test]
    fn test_public_traffic_is_not_accounted() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let buf = frame(
            GW_MAC,
            LAN_MAC,
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(1, 1, 1, 1),
            10,
        );
        let packet = Packet::new(&buf, 1);
        monitor.ingress(&packet);
        monitor.egress(&packet);
        assert!(monitor.table().is_empty());
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_second_packet_advances_counters() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let src = Ipv4Addr::new(172, 16, 0, 9);
        let small = frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 1, 1, 1), 10);
        let large = frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 0, 0, 1), 1000);

        monitor.ingress(&Packet::new(&small, 2));
        monitor.clock().set(5_000);
        monitor.ingress(&Packet::new(&large, 2));

        let key = FlowKey::new(be(src), 2, LAN_MAC, Direction::Ingress);
        let stats = monitor.table().get(&key).unwrap();
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.bytes, (small.len() + large.len()) as u64);
        assert_eq!(stats.last_seen, 5_000);

        assert_eq!(rx.try_recv().map(|e| e.kind), Some(EventKind::New));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_fragmented_length_is_accounted() {
        let (monitor, _rx) = setup(MAX_ENTRIES);
        let src = Ipv4Addr::new(192, 168, 3, 3);
        let buf = frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 1, 1, 1), 10);
        monitor.ingress(&Packet::new(&buf, 2).with_len(9000));

        let key = FlowKey::new(be(src), 2, LAN_MAC, Direction::Ingress);
        assert_eq!(monitor.table().get(&key).unwrap().bytes, 9000);
    }

    #[test]
    fn test_257th_flow_fails() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        for n in 0..MAX_ENTRIES {
            let src = Ipv4Addr::new(10, 0, (n >> 8) as u8, n as u8);
            let buf = frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 1, 1, 1), 0);
            monitor.ingress(&Packet::new(&buf, 2));
        }
        for _ in 0..MAX_ENTRIES {
            assert_eq!(rx.try_recv().map(|e| e.kind), Some(EventKind::New));
        }

        let rejected = Ipv4Addr::new(10, 1, 0, 0);
        let buf = frame(LAN_MAC, GW_MAC, rejected, Ipv4Addr::new(1, 1, 1, 1), 0);
        assert_eq!(monitor.ingress(&Packet::new(&buf, 2)), Verdict::Continue);

        assert_eq!(monitor.table().len(), MAX_ENTRIES);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Failed);
        assert_eq!(
            event.key,
            FlowKey::new(be(rejected), 2, LAN_MAC, Direction::Ingress)
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_overflowing_flows_fail_without_evicting() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        for n in 0..300u32 {
            let dst = Ipv4Addr::new(100, 64, (n >> 8) as u8, n as u8);
            let buf = frame(GW_MAC, LAN_MAC, Ipv4Addr::new(1, 1, 1, 1), dst, 0);
            assert_eq!(monitor.egress(&Packet::new(&buf, 3)), Verdict::Continue);
        }

        let (mut new, mut failed) = (0, 0);
        while let Some(event) = rx.try_recv() {
            match event.kind {
                EventKind::New => new += 1,
                EventKind::Failed => failed += 1,
            }
        }
        assert_eq!(monitor.table().len(), MAX_ENTRIES);
        assert_eq!(new, MAX_ENTRIES);
        assert_eq!(failed, 300 - MAX_ENTRIES);

        let first = FlowKey::new(be(Ipv4Addr::new(100, 64, 0, 0)), 3, LAN_MAC, Direction::Egress);
        assert_eq!(monitor.table().get(&first).unwrap().packets, 1);
    }

    #[test]
    fn test_directions_are_accounted_separately() {
        let (monitor, mut rx) = setup(MAX_ENTRIES);
        let lan = Ipv4Addr::new(192, 168, 7, 7);
        // same address, MAC and interface on both hooks
        let inbound = frame(LAN_MAC, LAN_MAC, lan, lan, 20);

        monitor.ingress(&Packet::new(&inbound, 5));
        monitor.egress(&Packet::new(&inbound, 5));
        monitor.egress(&Packet::new(&inbound, 5));

        let ingress = FlowKey::new(be(lan), 5, LAN_MAC, Direction::Ingress);
        let egress = FlowKey::new(be(lan), 5, LAN_MAC, Direction::Egress);
        assert_eq!(monitor.table().len(), 2);
        assert_eq!(monitor.table().get(&ingress).unwrap().packets, 1);
        assert_eq!(monitor.table().get(&egress).unwrap().packets, 2);

        assert_eq!(rx.try_recv().map(|e| e.key), Some(ingress));
        assert_eq!(rx.try_recv().map(|e| e.key), Some(egress));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_entry_points_run_concurrently() {
        let (tx, _rx) = events::channel(16);
        let monitor = Arc::new(Monitor::new(Arc::new(FlowTable::new()), tx));
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let buf = Arc::new(frame(LAN_MAC, GW_MAC, src, Ipv4Addr::new(1, 1, 1, 1), 0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                let buf = Arc::clone(&buf);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        monitor.ingress(&Packet::new(&buf, 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let key = FlowKey::new(be(src), 1, LAN_MAC, Direction::Ingress);
        assert_eq!(monitor.table().get(&key).unwrap().packets, 4_000);
    }
}
