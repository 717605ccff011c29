//! Notification broadcaster
//!
//! Fan-out of server-to-client notifications over a tokio broadcast
//! channel. Each connection holds a subscription; `notify` never blocks the
//! caller. Messages a slow subscriber misses, and writes that fail on a dead
//! connection, are counted as dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

use crate::protocol::Message;

/// Default notification buffer per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcaster for tool notifications
pub struct Broadcaster {
    tx: broadcast::Sender<Message>,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl Broadcaster {
    /// Create a new broadcaster with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a notification for every current subscriber.
    ///
    /// Returns the number of subscribers it was queued for.
    pub fn notify(&self, message: Message) -> usize {
        self.sent.fetch_add(1, Ordering::Relaxed);
        match self.tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No connected clients for notification");
                0
            }
        }
    }

    /// Subscribe to receive broadcast notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Record notifications that did not reach a client
    pub fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
