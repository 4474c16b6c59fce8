//! Core identifier types for ontopack
//!
//! This module defines the foundational types:
//! - PackId: Unique identifier for a pack (one document or stream)
//! - EntryId: Pack-local, never-reused entry identifier
//! - EntryRef: (pack, entry) pair used for every reference between entries
//! - Span: Half-open `[begin, end)` range over a pack's media buffer

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pack
///
/// A PackId is a wrapper around a UUID v4. It is assigned when the pack is
/// created and stays with the pack for its whole lifetime, so references
/// recorded against it remain unambiguous after the pack is unregistered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackId(Uuid);

impl PackId {
    /// Create a new random PackId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a PackId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse a PackId from a string representation
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this PackId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pack-local entry identifier
///
/// Allocated from a monotonically increasing counter owned by the pack.
/// Ids are never reused, even after the entry is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// Wrap a raw id value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to an entry in some pack
///
/// References never own their target. Intra-pack references carry the
/// owning pack's id like any other; the multi-pack registry is the only
/// authority that resolves references naming a different pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryRef {
    /// Pack holding the target entry
    pub pack: PackId,
    /// Target entry within that pack
    pub entry: EntryId,
}

impl EntryRef {
    /// Create a reference
    pub const fn new(pack: PackId, entry: EntryId) -> Self {
        Self { pack, entry }
    }

    /// Whether the reference points into `pack`
    pub fn is_in(&self, pack: PackId) -> bool {
        self.pack == pack
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pack, self.entry)
    }
}

/// Half-open `[begin, end)` range over a media buffer
///
/// Text spans are byte offsets, audio spans are sample offsets.
/// Ordering is lexicographic on `(begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset
    pub begin: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Span {
    /// Create a span without validating `begin <= end`
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Length of the span, zero for inverted spans
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Whether `begin <= end`
    pub fn is_well_formed(&self) -> bool {
        self.begin <= self.end
    }

    /// Bounds actually searched for the query range `[lo, hi)`
    ///
    /// An empty range `[lo, lo)` is a point query at `lo` and searches
    /// `[lo, lo + 1)`; every other range is returned unchanged.
    pub const fn query_bounds(lo: usize, hi: usize) -> (usize, usize) {
        if lo == hi {
            (lo, lo.saturating_add(1))
        } else {
            (lo, hi)
        }
    }

    /// Whether this span intersects the half-open query range `[lo, hi)`
    ///
    /// Empty spans and empty ranges are both points: an empty span covers
    /// `begin`, an empty range covers `lo` (see [`Span::query_bounds`]).
    pub fn intersects(&self, lo: usize, hi: usize) -> bool {
        let (lo, hi) = Self::query_bounds(lo, hi);
        if self.is_empty() {
            return lo <= self.begin && self.begin < hi;
        }
        self.begin < hi && self.end > lo
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_id_unique() {
        let a = PackId::new();
        let b = PackId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pack_id_string_roundtrip() {
        let id = PackId::new();
        let parsed = PackId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(PackId::from_string("not-a-uuid").is_none());
    }

    #[test]
    fn test_entry_id_ordering() {
        assert!(EntryId::new(1) < EntryId::new(2));
        assert_eq!(EntryId::new(7).as_u64(), 7);
        assert_eq!(EntryId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_entry_ref_is_in() {
        let pack = PackId::new();
        let other = PackId::new();
        let r = EntryRef::new(pack, EntryId::new(3));
        assert!(r.is_in(pack));
        assert!(!r.is_in(other));
    }

    #[test]
    fn test_span_ordering_is_lexicographic() {
        let mut spans = vec![Span::new(12, 18), Span::new(5, 15), Span::new(5, 10)];
        spans.sort();
        assert_eq!(spans, vec![Span::new(5, 10), Span::new(5, 15), Span::new(12, 18)]);
    }

    #[test]
    fn test_span_intersects_half_open() {
        assert!(Span::new(5, 15).intersects(10, 20));
        assert!(Span::new(12, 18).intersects(10, 20));
        assert!(!Span::new(20, 25).intersects(10, 20));
        assert!(!Span::new(0, 10).intersects(10, 20));
    }

    #[test]
    fn test_empty_span_is_point() {
        assert!(Span::new(10, 10).intersects(10, 20));
        assert!(!Span::new(20, 20).intersects(10, 20));
        assert!(Span::new(3, 3).is_empty());
        assert_eq!(Span::new(3, 3).len(), 0);
    }

    #[test]
    fn test_empty_range_is_point_query() {
        assert!(Span::new(5, 15).intersects(10, 10));
        assert!(Span::new(10, 12).intersects(10, 10));
        assert!(Span::new(10, 10).intersects(10, 10));
        assert!(!Span::new(0, 10).intersects(10, 10));
        assert!(!Span::new(11, 11).intersects(10, 10));
        assert_eq!(Span::query_bounds(4, 4), (4, 5));
        assert_eq!(Span::query_bounds(4, 9), (4, 9));
    }

    #[test]
    fn test_span_well_formed() {
        assert!(Span::new(1, 1).is_well_formed());
        assert!(!Span::new(2, 1).is_well_formed());
    }
}
