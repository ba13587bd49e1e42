use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{Error, FlowKey, FlowStats, Result};

/// Number of flows the table can hold.
pub const MAX_ENTRIES: usize = 256;

/// Result of a successful [`FlowTable::accumulate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The key was absent and a new entry was written.
    Created(FlowStats),
    /// The key was present and its counters were advanced.
    Updated(FlowStats),
}

/// Fixed-capacity concurrent mapping of [`FlowKey`] to [`FlowStats`].
///
/// Entries are created on first observation and never removed by the table
/// itself. Inserting a new key while the table holds `capacity` entries fails
/// with [`Error::Full`]; existing keys can always be updated.
#[derive(Debug)]
pub struct FlowTable {
    entries: DashMap<FlowKey, FlowStats>,
    capacity: usize,
    /// Reserved slots. Incremented before an insert so that concurrent inserts
    /// into different shards cannot overshoot `capacity`.
    used: AtomicUsize,
}

impl Default for FlowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowTable {
    /// Creates a table with [`MAX_ENTRIES`] slots.
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    /// Creates a table with room for exactly `capacity` flows.
    ///
    /// The map is pre-sized for `capacity` entries in total. The space is split
    /// across shards, so an uneven key spread may still grow individual shards.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    /// Looks up `key` and either advances its counters or creates it.
    ///
    /// When the key is present, one packet of `bytes` length is added and
    /// `last_seen` is set to `now`. When it is absent, tentative stats
    /// `{ packets: 1, bytes, last_seen: now }` are built and written if a slot
    /// is free.
    ///
    /// The lookup, the accumulation and the write happen while holding the
    /// write lock of the key's shard, so concurrent updates of the same key
    /// never lose increments. Updates of keys in other shards proceed in
    /// parallel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Full`] if the key is absent and the table is at
    /// capacity. The tentative stats are discarded.
    pub fn accumulate(&self, key: FlowKey, bytes: u64, now: u64) -> Result<Upsert> {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                let stats = entry.get_mut();
                stats.record(bytes, now);
                Ok(Upsert::Updated(*stats))
            }
            Entry::Vacant(entry) => {
                let stats = FlowStats::first(bytes, now);
                self.reserve_slot()?;
                entry.insert(stats);
                Ok(Upsert::Created(stats))
            }
        }
    }

    fn reserve_slot(&self) -> Result<()> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.capacity).then_some(used + 1)
            })
            .map(|_| ())
            .map_err(|_| Error::Full {
                capacity: self.capacity,
            })
    }

    /// Returns a copy of the stats currently stored for `key`.
    pub fn get(&self, key: &FlowKey) -> Option<FlowStats> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Returns all entries present at the time of the call, in no particular order.
    ///
    /// Each record is copied whole under its shard's read lock, so no record is
    /// ever observed half-updated.
    pub fn snapshot(&self) -> Vec<(FlowKey, FlowStats)> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.entries.iter().map(|entry| (*entry.key(), *entry.value())));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
