//! Flow identity, per-flow counters and the bounded table holding them.
mod error;
mod key;
mod stats;
mod table;

pub use error::{Error, Result};
pub use key::{Direction, FlowKey};
pub use stats::FlowStats;
pub use table::{FlowTable, MAX_ENTRIES, Upsert};
