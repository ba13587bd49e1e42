//! Log output for flow events and periodic table dumps.
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::events::{Event, EventReceiver};
use crate::flow::{FlowKey, FlowStats};
use crate::monitor::{Clock, Monitor};
use crate::names::Names;

/// Logs every event received on `events` until the channel closes or
/// `shutdown` fires.
///
/// Events dropped by the producer since the last received event are reported
/// as a warning before the event itself.
pub async fn consume_events(
    mut events: EventReceiver,
    names: Arc<Names>,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!("Starting to read flow events...");
    let mut reported_drops = 0;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.changed() => None,
        };

        let dropped = events.dropped();
        if dropped > reported_drops {
            log::warn!("lost {} events", dropped - reported_drops);
            reported_drops = dropped;
        }

        let Some(event) = event else {
            break;
        };
        log::info!("{}", describe_event(&event, &names));
    }
    log::debug!("event consumer stopped");
}

/// Renders `event` with the interface name and, if known, the host name of its MAC.
pub fn describe_event(event: &Event, names: &Names) -> String {
    let mut line = format!(
        "{event} interface:{}",
        names.link_name(event.key.ifindex())
    );
    if let Some(hostname) = names.hostname(&event.key.mac()) {
        let _ = write!(line, " hostname:{hostname}");
    }
    line
}

/// Logs the flow table every `period` until `shutdown` fires.
pub async fn stats_reporter<C: Clock + 'static>(
    monitor: Arc<Monitor<C>>,
    names: Arc<Names>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let monitor = Arc::clone(&monitor);
        let names = Arc::clone(&names);
        let lines = tokio::task::spawn_blocking(move || {
            let now = monitor.clock().now_ns();
            let mut entries = monitor.table().snapshot();
            entries.sort_by_key(|(key, _)| {
                (u32::from_be(key.address_be()), key.ifindex(), key.mac())
            });
            entries
                .iter()
                .map(|(key, stats)| format_stats_line(key, stats, now, &names))
                .collect::<Vec<_>>()
        })
        .await;

        let lines = match lines {
            Ok(lines) => lines,
            Err(err) => {
                log::error!("Failed to collect stats: {err}");
                continue;
            }
        };
        log::info!("Stats:");
        for line in &lines {
            log::info!("{line}");
        }
    }
    log::debug!("stats reporter stopped");
}

/// Formats one table entry as
/// `<ip> <mac>@<ifname> pkts:<n> bytes:<n> last_seen:<elapsed> ago`.
pub fn format_stats_line(key: &FlowKey, stats: &FlowStats, now: u64, names: &Names) -> String {
    let elapsed = Duration::from_nanos(now.saturating_sub(stats.last_seen));
    format!(
        "{} {}@{} pkts:{} bytes:{} last_seen:{:?} ago",
        key.address(),
        key.mac(),
        names.link_name(key.ifindex()),
        stats.packets,
        stats.bytes,
        elapsed,
    )
}
