use std::collections::BTreeMap;

/// Version stamp carried by an asynchronous request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

/// Per-key generation counters.
///
/// Every issued request is stamped with the current generation of its target.
/// Bumping a key invalidates everything issued before; a completion is only
/// applied when `is_current` still holds for its stamp.
#[derive(Debug, Clone)]
pub struct Generations<K: Ord> {
    current: BTreeMap<K, Generation>,
    next: u64,
}

impl<K: Ord> Default for Generations<K> {
    fn default() -> Self {
        Self {
            current: BTreeMap::new(),
            next: 1,
        }
    }
}

impl<K: Ord + Clone + std::fmt::Debug> Generations<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation for `key`, invalidating older stamps.
    pub fn bump(&mut self, key: &K) -> Generation {
        let g = Generation(self.next);
        self.next += 1;
        self.current.insert(key.clone(), g);
        g
    }

    pub fn current(&self, key: &K) -> Option<Generation> {
        self.current.get(key).copied()
    }

    pub fn is_current(&self, key: &K, stamp: Generation) -> bool {
        let current = self.current(key) == Some(stamp);
        if !current {
            tracing::debug!(?key, stamp = stamp.0, "discarding stale completion");
        }
        current
    }

    /// Forgets `key`; any in-flight stamp for it becomes stale.
    pub fn retire(&mut self, key: &K) {
        self.current.remove(key);
    }

    /// Forgets every key. Used when the whole target set is regenerated.
    pub fn retire_all(&mut self) {
        self.current.clear();
    }
}
