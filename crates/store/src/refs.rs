//! Reverse reference tracking
//!
//! Maps each entry of a pack to the entries holding a reference to it, so
//! removal can refuse while holders remain. Holders are `EntryRef`s: local
//! entries carry the pack's own id, multi-pack links carry the registry's
//! link pack id. A holder that references the same target several times
//! (a link whose parent and child coincide, a list naming one entry twice)
//! is counted once per occurrence.

use ontopack_core::{EntryId, EntryRef};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Secondary index: target entry → holders
#[derive(Debug, Default, Clone)]
pub struct ReferenceTracker {
    index: FxHashMap<EntryId, BTreeMap<EntryRef, usize>>,
}

impl ReferenceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reference from `holder` to `target`
    pub fn add(&mut self, target: EntryId, holder: EntryRef) {
        *self
            .index
            .entry(target)
            .or_default()
            .entry(holder)
            .or_insert(0) += 1;
    }

    /// Drop one reference from `holder` to `target`
    ///
    /// Releasing a reference that was never recorded is a no-op.
    pub fn release(&mut self, target: EntryId, holder: EntryRef) {
        if let Some(holders) = self.index.get_mut(&target) {
            if let Some(count) = holders.get_mut(&holder) {
                *count -= 1;
                if *count == 0 {
                    holders.remove(&holder);
                }
            }
            if holders.is_empty() {
                self.index.remove(&target);
            }
        }
    }

    /// Distinct holders of `target`, ordered
    pub fn holders(&self, target: EntryId) -> Vec<EntryRef> {
        self.index
            .get(&target)
            .map(|h| h.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether anything other than `target` itself holds it
    pub fn is_held_by_others(&self, target: EntryRef) -> bool {
        self.index
            .get(&target.entry)
            .is_some_and(|h| h.keys().any(|holder| *holder != target))
    }

    /// Forget every reference to `target`
    pub fn forget(&mut self, target: EntryId) {
        self.index.remove(&target);
    }

    /// Number of referenced targets
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing is referenced
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontopack_core::PackId;

    fn at(pack: PackId, id: u64) -> EntryRef {
        EntryRef::new(pack, EntryId::new(id))
    }

    #[test]
    fn test_counts_per_occurrence() {
        let pack = PackId::new();
        let mut refs = ReferenceTracker::new();
        refs.add(EntryId::new(1), at(pack, 5));
        refs.add(EntryId::new(1), at(pack, 5));
        assert_eq!(refs.holders(EntryId::new(1)), vec![at(pack, 5)]);

        refs.release(EntryId::new(1), at(pack, 5));
        assert!(refs.is_held_by_others(at(pack, 1)));
        refs.release(EntryId::new(1), at(pack, 5));
        assert!(!refs.is_held_by_others(at(pack, 1)));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_self_hold_does_not_count() {
        let pack = PackId::new();
        let mut refs = ReferenceTracker::new();
        refs.add(EntryId::new(2), at(pack, 2));
        assert!(!refs.is_held_by_others(at(pack, 2)));
        assert_eq!(refs.holders(EntryId::new(2)).len(), 1);

        refs.forget(EntryId::new(2));
        assert!(refs.holders(EntryId::new(2)).is_empty());
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let pack = PackId::new();
        let mut refs = ReferenceTracker::new();
        refs.release(EntryId::new(7), at(pack, 1));
        assert_eq!(refs.len(), 0);
    }
}
