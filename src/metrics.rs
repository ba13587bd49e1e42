//! Prometheus exposition of the flow table.
//!
//! The table is the source of truth, so every scrape builds a fresh registry
//! from a snapshot instead of mirroring updates into long-lived counters.
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::flow::FlowTable;

const NAMESPACE: &str = "overseer";
const FLOW_LABELS: [&str; 4] = ["macaddr", "ip", "ifindex", "direction"];

pub type Result<T> = std::result::Result<T, prometheus::Error>;

/// Renders the current contents of `table` and the number of dropped events
/// in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if a metric cannot be registered or encoded.
pub fn render(table: &FlowTable, events_dropped: u64) -> Result<String> {
    let registry = Registry::new();

    let packets = IntCounterVec::new(
        Opts::new("packets_total", "Packets observed per flow").namespace(NAMESPACE),
        &FLOW_LABELS,
    )?;
    let bytes = IntCounterVec::new(
        Opts::new("bytes_total", "Bytes observed per flow").namespace(NAMESPACE),
        &FLOW_LABELS,
    )?;
    let entries = IntGauge::with_opts(
        Opts::new("entries", "Flows currently stored in the flow table")
            .namespace(NAMESPACE)
            .subsystem("flow_table"),
    )?;
    let capacity = IntGauge::with_opts(
        Opts::new("capacity", "Maximum number of flows the flow table holds")
            .namespace(NAMESPACE)
            .subsystem("flow_table"),
    )?;
    let dropped = IntCounter::with_opts(
        Opts::new("events_dropped_total", "Flow events dropped because the queue was full")
            .namespace(NAMESPACE),
    )?;

    registry.register(Box::new(packets.clone()))?;
    registry.register(Box::new(bytes.clone()))?;
    registry.register(Box::new(entries.clone()))?;
    registry.register(Box::new(capacity.clone()))?;
    registry.register(Box::new(dropped.clone()))?;

    let snapshot = table.snapshot();
    for (key, stats) in &snapshot {
        let mac = key.mac().to_string();
        let ip = key.address().to_string();
        let ifindex = key.ifindex().to_string();
        let labels = [
            mac.as_str(),
            ip.as_str(),
            ifindex.as_str(),
            key.direction().as_str(),
        ];
        packets.with_label_values(&labels).inc_by(stats.packets);
        bytes.with_label_values(&labels).inc_by(stats.bytes);
    }
    entries.set(i64::try_from(snapshot.len()).unwrap_or(i64::MAX));
    capacity.set(i64::try_from(table.capacity()).unwrap_or(i64::MAX));
    dropped.inc_by(events_dropped);

    TextEncoder::new().encode_to_string(&registry.gather())
}
