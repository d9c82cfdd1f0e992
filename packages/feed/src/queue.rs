//! FIFO buffer for push payloads that arrive before the feed is ready.

use std::collections::VecDeque;

/// Raw push payloads waiting on feed readiness.
///
/// Payloads are replayed in arrival order, and the queue is always
/// drained whole: a partial drain would reorder deliveries across the
/// readiness boundary.
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: VecDeque<serde_json::Value>,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, raw: serde_json::Value) {
        self.items.push_back(raw);
    }

    /// Empties the queue, returning every payload in arrival order.
    #[must_use]
    pub fn drain_all(&mut self) -> Vec<serde_json::Value> {
        self.items.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Discards everything without replaying. Only teardown calls this.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
