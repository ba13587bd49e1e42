//! Fire-and-forget notification channel between the packet path and its consumer.
//!
//! The producer side never blocks: [`EventSender::emit`] is a `try_send` on a
//! bounded queue. Events that do not fit, or that are sent after the consumer
//! went away, are counted in a drop counter shared with the receiver.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::flow::FlowKey;

/// Why an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A flow was observed for the first time and written to the table.
    New,
    /// Writing a flow to the table failed, e.g. because the table is full.
    Failed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::New => f.write_str("NEW"),
            EventKind::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub key: FlowKey,
    pub kind: EventKind,
}

impl Event {
    pub fn new(key: FlowKey) -> Self {
        Self {
            key,
            kind: EventKind::New,
        }
    }

    pub fn failed(key: FlowKey) -> Self {
        Self {
            key,
            kind: EventKind::Failed,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.key)
    }
}

/// Creates a bounded event channel holding at most `capacity` undelivered events.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        EventSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        EventReceiver { rx, dropped },
    )
}

/// Producer half, cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    /// Attempts to enqueue `event` without waiting.
    ///
    /// Returns `false` if the event was dropped because the queue is full or
    /// the receiver is gone. Dropped events are not retried.
    pub fn emit(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("dropped event: {err}");
                false
            }
        }
    }

    /// Total number of events dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
    dropped: Arc<AtomicU64>,
}

impl EventReceiver {
    /// Waits for the next event. Returns `None` once every sender is gone and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Takes the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Total number of events dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared handle to the drop counter, e.g. for metrics.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}
