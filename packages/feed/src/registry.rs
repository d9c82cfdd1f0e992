//! Session-lifetime complaint id registry.

use std::collections::BTreeSet;

/// Every complaint id the feed has materialized this session.
///
/// The registry only grows while the feed is mounted. Ids evicted from
/// the visible window stay registered so a later delivery of the same
/// complaint can never re-materialize it. Only teardown clears it.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    ids: BTreeSet<String>,
}

impl DedupRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was registered earlier this session.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Registers an id, returning `false` if it was already present.
    pub fn register(&mut self, id: String) -> bool {
        self.ids.insert(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forgets every id. Only called when the session tears down.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
