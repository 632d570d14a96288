use std::collections::VecDeque;

use log::trace;
use serde::Serialize;

/// Milliseconds since the unix epoch.
pub type Timestamp = u64;

/// A single recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entry {
    key: String,
    timestamp: Timestamp,
}

impl Entry {
    pub fn new(key: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            timestamp,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Entry timestamp {timestamp} is older than window tail {tail}")]
pub(crate) struct OutOfOrderEntry {
    pub(crate) tail: Timestamp,
    pub(crate) timestamp: Timestamp,
}

/// Drops the leading run of entries older than `cutoff`.
///
/// Entries must be sorted ascending by timestamp, which lets the first
/// entry at or after `cutoff` be found with a binary search. An entry whose
/// timestamp equals `cutoff` is kept.
pub(crate) fn prune(mut entries: VecDeque<Entry>, cutoff: Timestamp) -> VecDeque<Entry> {
    let first_fresh = entries.partition_point(|e| e.timestamp < cutoff);
    entries.drain(..first_fresh);
    entries
}

/// Time ordered failures for one interval together with their count.
///
/// `total` is only ever written by [`Window::recompute_total`], which every
/// mutating path calls last.
#[derive(Debug, Default, Clone)]
pub(crate) struct Window {
    entries: VecDeque<Entry>,
    total: usize,
}

impl Window {
    /// Prunes against `cutoff` without recording anything. Returns the
    /// number of entries removed.
    pub(crate) fn observe(&mut self, cutoff: Timestamp) -> usize {
        let removed = self.prune_before(cutoff);
        self.recompute_total();
        removed
    }

    /// Prunes against `cutoff`, then appends `entry`.
    pub(crate) fn record(
        &mut self,
        entry: Entry,
        cutoff: Timestamp,
    ) -> Result<usize, OutOfOrderEntry> {
        self.ensure_appendable(entry.timestamp)?;

        let removed = self.prune_before(cutoff);
        self.entries.push_back(entry);
        self.recompute_total();

        Ok(removed)
    }

    pub(crate) fn ensure_appendable(&self, timestamp: Timestamp) -> Result<(), OutOfOrderEntry> {
        match self.entries.back() {
            Some(tail) if tail.timestamp > timestamp => Err(OutOfOrderEntry {
                tail: tail.timestamp,
                timestamp,
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.recompute_total();
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub(crate) fn entries_for_key(&self, key: &str) -> Vec<Entry> {
        self.entries
            .iter()
            .filter(|e| e.key == key)
            .cloned()
            .collect()
    }

    fn prune_before(&mut self, cutoff: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries = prune(std::mem::take(&mut self.entries), cutoff);

        let removed = before - self.entries.len();
        if removed > 0 {
            trace!("Pruned {removed} entries older than {cutoff}");
        }

        removed
    }

    fn recompute_total(&mut self) {
        self.total = self.entries.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(timestamps: &[Timestamp]) -> VecDeque<Entry> {
        timestamps.iter().map(|t| Entry::new("k", *t)).collect()
    }

    fn timestamps(window: &Window) -> Vec<Timestamp> {
        window.entries().map(Entry::timestamp).collect()
    }

    #[test]
    fn prune_drops_only_the_stale_prefix() {
        let pruned = prune(entries(&[10, 20, 30, 40]), 25);

        assert_eq!(
            pruned.iter().map(Entry::timestamp).collect::<Vec<_>>(),
            vec![30, 40]
        );
    }

    #[test]
    fn prune_keeps_entry_at_cutoff() {
        let pruned = prune(entries(&[9, 10, 11]), 10);

        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[0].timestamp(), 10);
    }

    #[test]
    fn prune_everything_stale_yields_empty() {
        assert!(prune(entries(&[1, 2, 3]), 100).is_empty());
        assert!(prune(VecDeque::new(), 100).is_empty());
    }

    #[test]
    fn prune_with_nothing_stale_is_identity() {
        let pruned = prune(entries(&[5, 5, 6]), 0);

        assert_eq!(pruned, entries(&[5, 5, 6]));
    }

    #[test]
    fn record_prunes_then_appends() {
        let mut window = Window::default();
        window.record(Entry::new("a", 100), 0).unwrap();
        window.record(Entry::new("a", 200), 0).unwrap();

        let removed = window.record(Entry::new("b", 300), 150).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(timestamps(&window), vec![200, 300]);
        assert_eq!(window.total(), 2);
    }

    #[test]
    fn record_accepts_equal_timestamps() {
        let mut window = Window::default();
        window.record(Entry::new("a", 100), 0).unwrap();
        window.record(Entry::new("b", 100), 0).unwrap();

        assert_eq!(window.total(), 2);
    }

    #[test]
    fn record_rejects_out_of_order_entry_without_mutating() {
        let mut window = Window::default();
        window.record(Entry::new("a", 100), 0).unwrap();

        let err = window.record(Entry::new("a", 99), 50).unwrap_err();

        assert_eq!(err, OutOfOrderEntry { tail: 100, timestamp: 99 });
        assert_eq!(timestamps(&window), vec![100]);
        assert_eq!(window.total(), 1);
    }

    #[test]
    fn observe_updates_total() {
        let mut window = Window::default();
        window.record(Entry::new("a", 1), 0).unwrap();
        window.record(Entry::new("a", 2), 0).unwrap();

        assert_eq!(window.observe(2), 1);
        assert_eq!(window.total(), 1);
    }

    #[test]
    fn entries_for_key_filters_by_key() {
        let mut window = Window::default();
        window.record(Entry::new("a", 1), 0).unwrap();
        window.record(Entry::new("b", 2), 0).unwrap();
        window.record(Entry::new("a", 3), 0).unwrap();

        let a = window.entries_for_key("a");

        assert_eq!(a, vec![Entry::new("a", 1), Entry::new("a", 3)]);
        assert!(window.entries_for_key("c").is_empty());
    }

    #[test]
    fn clear_resets_total() {
        let mut window = Window::default();
        window.record(Entry::new("a", 1), 0).unwrap();

        window.clear();

        assert_eq!(window.total(), 0);
        assert_eq!(window.entries().count(), 0);
    }
}
