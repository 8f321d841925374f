//! # Debounce
//!
//! Per-key trailing-edge timers for stylesheet edits. Deadlines are plain
//! `tokio::time::Instant`s so paused-clock tests drive them deterministically.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debounce slots, one per key.
///
/// Scheduling a key that already has a pending slot cancels that slot and
/// starts a new one, so a burst of changes fires once, `wait` after the last
/// change. The debouncer never sleeps itself; the owner's event loop sleeps
/// until `next_deadline` and then collects `take_due`.
#[derive(Debug)]
pub struct Debouncer<K> {
    wait: Duration,
    slots: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            slots: HashMap::new(),
        }
    }

    /// Cancel-then-schedule. Returns true if a pending slot was superseded.
    pub fn schedule(&mut self, key: K, now: Instant) -> bool {
        self.slots.insert(key, now + self.wait).is_some()
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().min().copied()
    }

    /// Remove and return every key whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let due: Vec<K> = self
            .slots
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &due {
            self.slots.remove(key);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(1000);

    #[test]
    fn test_reschedule_supersedes() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WAIT);

        assert!(!debouncer.schedule("a.css", start));
        assert!(debouncer.schedule("a.css", start + Duration::from_millis(400)));

        // The first deadline was cancelled
        assert!(debouncer.take_due(start + WAIT).is_empty());
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(1400))
        );
        assert_eq!(
            debouncer.take_due(start + Duration::from_millis(1400)),
            vec!["a.css"]
        );
        assert!(!debouncer.is_pending(&"a.css"));
    }

    #[test]
    fn test_independent_keys() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WAIT);

        debouncer.schedule("a.css", start);
        debouncer.schedule("b.css", start + Duration::from_millis(500));

        assert_eq!(debouncer.next_deadline(), Some(start + WAIT));
        assert_eq!(debouncer.take_due(start + WAIT), vec!["a.css"]);
        assert!(debouncer.is_pending(&"b.css"));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WAIT);

        debouncer.schedule("a.css", start);
        assert!(debouncer.cancel(&"a.css"));
        assert!(!debouncer.cancel(&"a.css"));
        assert_eq!(debouncer.next_deadline(), None);
    }
}
