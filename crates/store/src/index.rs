//! Secondary indices for pack queries
//!
//! This module provides the two indices a pack maintains alongside its
//! entry map:
//! - TypeIndex: maps exact TypeId → ids of entries of that type
//! - SpanIndex: annotation spans of one modality, sorted by `(begin, end, id)`
//!
//! ## Span index layout
//!
//! Spans live in a vector sorted by `(begin, end, id)` together with a
//! prefix maximum of their (effective) end offsets. For a query `[lo, hi)`:
//! - every candidate sits before the first span with `begin >= hi`
//! - every candidate sits at or after the first position whose prefix
//!   maximum end exceeds `lo`
//!
//! Both bounds are binary searches; only the slice between them is scanned.
//! An empty span counts as a point at `begin`, so its effective end is
//! `begin + 1`.

use ontopack_core::{EntryId, Span};
use ontopack_schema::TypeId;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

// ============================================================================
// TypeIndex
// ============================================================================

/// Secondary index: TypeId → entry ids
///
/// Keyed by exact type; subtype queries merge the sets of every
/// descendant type.
#[derive(Debug, Default, Clone)]
pub struct TypeIndex {
    index: FxHashMap<TypeId, BTreeSet<EntryId>>,
}

impl TypeIndex {
    /// Create a new empty TypeIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to its type's set
    pub fn insert(&mut self, type_id: TypeId, id: EntryId) {
        self.index.entry(type_id).or_default().insert(id);
    }

    /// Remove an entry from its type's set
    ///
    /// If the set becomes empty, removes the type entirely.
    pub fn remove(&mut self, type_id: TypeId, id: EntryId) {
        if let Some(ids) = self.index.get_mut(&type_id) {
            ids.remove(&id);
            if ids.is_empty() {
                self.index.remove(&type_id);
            }
        }
    }

    /// Ids of entries of exactly this type
    pub fn get(&self, type_id: TypeId) -> Option<&BTreeSet<EntryId>> {
        self.index.get(&type_id)
    }

    /// Number of entries of exactly this type
    pub fn count(&self, type_id: TypeId) -> usize {
        self.index.get(&type_id).map_or(0, BTreeSet::len)
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of types with at least one entry
    pub fn len(&self) -> usize {
        self.index.len()
    }
}

// ============================================================================
// SpanIndex
// ============================================================================

/// One indexed span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanEntry {
    /// Covered range
    pub span: Span,
    /// Entry id
    pub id: EntryId,
    /// Exact type of the entry
    pub type_id: TypeId,
}

impl SpanEntry {
    fn key(&self) -> (Span, EntryId) {
        (self.span, self.id)
    }

    fn effective_end(&self) -> usize {
        if self.span.is_empty() {
            self.span.begin.saturating_add(1)
        } else {
            self.span.end
        }
    }
}

/// Interval index over the annotation spans of one modality
#[derive(Debug, Default, Clone)]
pub struct SpanIndex {
    entries: Vec<SpanEntry>,
    prefix_max_end: Vec<usize>,
}

impl SpanIndex {
    /// Create a new empty SpanIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a span
    pub fn insert(&mut self, span: Span, id: EntryId, type_id: TypeId) {
        let entry = SpanEntry { span, id, type_id };
        let pos = self.entries.partition_point(|e| e.key() < entry.key());
        self.entries.insert(pos, entry);
        self.prefix_max_end.insert(pos, 0);
        self.rebuild_from(pos);
    }

    /// Drop a span; returns false if it was not indexed
    pub fn remove(&mut self, span: Span, id: EntryId) -> bool {
        let key = (span, id);
        let pos = self.entries.partition_point(|e| e.key() < key);
        match self.entries.get(pos) {
            Some(e) if e.key() == key => {
                self.entries.remove(pos);
                self.prefix_max_end.remove(pos);
                self.rebuild_from(pos);
                true
            }
            _ => false,
        }
    }

    fn rebuild_from(&mut self, pos: usize) {
        let mut running = if pos == 0 { 0 } else { self.prefix_max_end[pos - 1] };
        for i in pos..self.entries.len() {
            running = running.max(self.entries[i].effective_end());
            self.prefix_max_end[i] = running;
        }
    }

    /// Every indexed span, in `(begin, end, id)` order
    pub fn all(&self) -> &[SpanEntry] {
        &self.entries
    }

    /// Slice that contains every span intersecting `[lo, hi)`
    ///
    /// The slice is ordered and may contain non-intersecting spans;
    /// callers filter with `Span::intersects`.
    pub fn candidates(&self, lo: usize, hi: usize) -> &[SpanEntry] {
        let (lo, hi) = Span::query_bounds(lo, hi);
        let end = self.entries.partition_point(|e| e.span.begin < hi);
        let start = self.prefix_max_end[..end].partition_point(|&m| m <= lo);
        &self.entries[start..end]
    }

    /// Spans intersecting `[lo, hi)`, in `(begin, end, id)` order
    pub fn overlapping(&self, lo: usize, hi: usize) -> impl Iterator<Item = &SpanEntry> + '_ {
        self.candidates(lo, hi)
            .iter()
            .filter(move |e| e.span.intersects(lo, hi))
    }

    /// Largest end offset of any indexed span
    pub fn max_end(&self) -> Option<usize> {
        self.entries.iter().map(|e| e.span.end).max()
    }

    /// Number of indexed spans
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no span is indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
