//! Per-packet flow accounting.
use crate::classify;
use crate::events::{Event, EventSender};
use crate::flow::{self, Direction, FlowKey, FlowTable, Upsert};
use crate::mac::MacAddr;

/// The facts about one packet needed to account it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Address of the private peer in network byte order.
    pub address: u32,
    pub mac: MacAddr,
    pub ifindex: u32,
    pub direction: Direction,
    /// Observed packet length in bytes.
    pub len: u64,
}

impl Observation {
    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.address, self.ifindex, self.mac, self.direction)
    }
}

/// What [`account`] did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The address is outside private address space; nothing was touched.
    Filtered,
    /// A new entry was written and a NEW event emitted.
    Created,
    /// An existing entry was advanced; no event.
    Updated,
    /// The write failed and a FAILED event was emitted.
    Failed(flow::Error),
}

/// Accounts one packet against `table`.
///
/// Non-private addresses are rejected before any table access. For private
/// ones the flow's stats are looked up and advanced, or tentatively created
/// and written. Exactly one event reflects the write's actual outcome:
/// NEW only after a successful write of a new entry, FAILED when the write
/// was rejected. Updates of existing entries emit nothing.
pub fn account(
    table: &FlowTable,
    events: &EventSender,
    observation: &Observation,
    now: u64,
) -> Outcome {
    if !classify::is_private(observation.address) {
        return Outcome::Filtered;
    }

    let key = observation.key();
    match table.accumulate(key, observation.len, now) {
        Ok(Upsert::Updated(_)) => Outcome::Updated,
        Ok(Upsert::Created(_)) => {
            events.emit(Event::new(key));
            Outcome::Created
        }
        Err(err) => {
            log::debug!("failed to add entry {key}: {err}");
            events.emit(Event::failed(key));
            Outcome::Failed(err)
        }
    }
}
