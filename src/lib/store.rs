//! The concurrent MMSI → target map (`spec.md` §4.1), grounded on the
//! teacher's `SharedRadars` (`radar/mod.rs`): a single `RwLock`-guarded map
//! with a small set of named operations instead of exposing the lock
//! directly to callers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::target::{AisTarget, Mmsi};

/// Concurrent target database. Compound read-modify-write operations
/// (`get_or_create`) take the write lock for their whole duration; plain
/// reads (`try_get`, `snapshot`) take only a read lock, per the §4.1
/// requirement that pure reads not need the manager mutex.
#[derive(Clone)]
pub struct TargetStore {
    inner: Arc<RwLock<HashMap<Mmsi, AisTarget>>>,
}

impl TargetStore {
    pub fn new() -> Self {
        TargetStore {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// O(1) expected lookup; returns a clone since targets are shared
    /// value types, not references into the map.
    pub fn try_get(&self, mmsi: Mmsi) -> Option<AisTarget> {
        self.inner.read().unwrap().get(&mmsi).cloned()
    }

    /// If an existing entry for `mmsi` matches the variant `matches`
    /// selects, it is passed to `update` and the result stored back. If the
    /// existing entry is absent or of a different variant, any existing
    /// entry is removed and `ctor()` is inserted in its place — first
    /// running `update` on the freshly constructed target — then
    /// `last_seen` is stamped if `last_seen_at` is given.
    ///
    /// This is the sole mutation path the store exposes, matching
    /// `spec.md` §4.1's "remove any existing entry for that MMSI and insert
    /// a freshly constructed one" variant-change policy.
    pub fn get_or_create<F, U>(
        &self,
        mmsi: Mmsi,
        matches: fn(&AisTarget) -> bool,
        ctor: F,
        update: U,
        last_seen_at: Option<Instant>,
    ) where
        F: FnOnce(Mmsi) -> AisTarget,
        U: FnOnce(&mut AisTarget),
    {
        let mut map = self.inner.write().unwrap();
        let needs_fresh = match map.get(&mmsi) {
            Some(existing) => !matches(existing),
            None => true,
        };
        if needs_fresh {
            map.insert(mmsi, ctor(mmsi));
        }
        let target = map.get_mut(&mmsi).expect("just inserted or already present");
        update(target);
        if let Some(seen) = last_seen_at {
            target.common_mut().last_seen = Some(seen);
        }
    }

    /// Stable O(n) snapshot, safe against concurrent writers — taken under
    /// a single read-lock acquisition and cloned out, per §4.1.
    pub fn snapshot(&self) -> Vec<AisTarget> {
        self.inner.read().unwrap().values().cloned().collect()
    }

    pub fn remove(&self, mmsi: Mmsi) -> Option<AisTarget> {
        self.inner.write().unwrap().remove(&mmsi)
    }

    /// Bulk prune: removes every target for which `predicate` returns
    /// true, returning the count removed.
    pub fn remove_if<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&AisTarget) -> bool,
    {
        let mut map = self.inner.write().unwrap();
        let doomed: Vec<Mmsi> = map
            .iter()
            .filter(|(_, t)| predicate(t))
            .map(|(mmsi, _)| *mmsi)
            .collect();
        for mmsi in &doomed {
            map.remove(mmsi);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes a single target back in place, used by the surveillance loop
    /// to commit `relative_position` updates without re-running
    /// `get_or_create`'s variant-matching logic.
    pub fn update_in_place<U>(&self, mmsi: Mmsi, update: U)
    where
        U: FnOnce(&mut AisTarget),
    {
        let mut map = self.inner.write().unwrap();
        if let Some(target) = map.get_mut(&mmsi) {
            update(target);
        }
    }
}

impl Default for TargetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{BaseStation, Ship};

    #[test]
    fn get_or_create_inserts_fresh_target() {
        let store = TargetStore::new();
        store.get_or_create(
            1,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            None,
        );
        assert!(matches!(store.try_get(1), Some(AisTarget::Ship(_))));
    }

    #[test]
    fn get_or_create_replaces_on_variant_change() {
        let store = TargetStore::new();
        store.get_or_create(
            7,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            None,
        );
        store.get_or_create(
            7,
            |t| matches!(t, AisTarget::BaseStation(_)),
            |mmsi| AisTarget::BaseStation(BaseStation::new(mmsi)),
            |_| {},
            None,
        );
        assert!(matches!(store.try_get(7), Some(AisTarget::BaseStation(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_stamps_last_seen() {
        let store = TargetStore::new();
        let now = Instant::now();
        store.get_or_create(
            3,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            Some(now),
        );
        assert_eq!(store.try_get(3).unwrap().common().last_seen, Some(now));
    }

    #[test]
    fn remove_if_prunes_matching_targets() {
        let store = TargetStore::new();
        for mmsi in [1, 2, 3] {
            store.get_or_create(
                mmsi,
                |t| matches!(t, AisTarget::Ship(_)),
                |mmsi| AisTarget::Ship(Ship::new(mmsi)),
                |_| {},
                None,
            );
        }
        let removed = store.remove_if(|t| t.mmsi() != 2);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.try_get(2).is_some());
    }

    #[test]
    fn snapshot_is_stable_copy() {
        let store = TargetStore::new();
        store.get_or_create(
            5,
            |t| matches!(t, AisTarget::Ship(_)),
            |mmsi| AisTarget::Ship(Ship::new(mmsi)),
            |_| {},
            None,
        );
        let snap = store.snapshot();
        store.remove(5);
        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 0);
    }
}
