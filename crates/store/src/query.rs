//! Type and span queries over a pack
//!
//! `EntryQuery` is a restartable, finite view: every call to `iter()` walks
//! the pack's indices afresh, and nothing is materialized up front.
//!
//! ## Ordering
//!
//! - Span roles walk the span index, so results come in `(begin, end, id)`
//!   order; a range restricts the walk to the index's candidate slice
//! - Other roles merge the per-type id sets of the queried type and its
//!   descendants, so results come in id order
//!
//! Entries without a span never match a ranged query.

use crate::index::SpanEntry;
use crate::pack::Pack;
use ontopack_core::{EntryId, Modality};
use ontopack_schema::TypeId;
use std::collections::btree_set;
use std::iter::Peekable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Plan {
    Spans {
        modality: Modality,
        range: Option<(usize, usize)>,
    },
    ByType,
    Empty,
}

/// Lazy, re-iterable query result
#[derive(Debug, Clone, Copy)]
pub struct EntryQuery<'p> {
    pack: &'p Pack,
    types: &'p [TypeId],
    plan: Plan,
}

impl<'p> EntryQuery<'p> {
    pub(crate) fn new(pack: &'p Pack, types: &'p [TypeId], plan: Plan) -> Self {
        Self { pack, types, plan }
    }

    /// Start a fresh walk over the matching ids
    pub fn iter(&self) -> QueryIter<'p> {
        let inner = match self.plan {
            Plan::Spans { modality, range } => {
                let index = self.pack.span_index(modality);
                let entries = match range {
                    Some((lo, hi)) => index.candidates(lo, hi),
                    None => index.all(),
                };
                Inner::Spans {
                    entries: entries.iter(),
                    range,
                    types: self.types,
                }
            }
            Plan::ByType => Inner::Merge {
                heads: self
                    .types
                    .iter()
                    .filter_map(|t| self.pack.type_index().get(*t))
                    .map(|set| set.iter().peekable())
                    .collect(),
            },
            Plan::Empty => Inner::Empty,
        };
        QueryIter { inner }
    }

    /// Number of matching entries
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Whether nothing matches
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// First match in query order
    pub fn first(&self) -> Option<EntryId> {
        self.iter().next()
    }

    /// Collect the matching ids
    pub fn to_vec(&self) -> Vec<EntryId> {
        self.iter().collect()
    }
}

impl<'p> IntoIterator for EntryQuery<'p> {
    type Item = EntryId;
    type IntoIter = QueryIter<'p>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'p> IntoIterator for &EntryQuery<'p> {
    type Item = EntryId;
    type IntoIter = QueryIter<'p>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One walk over a query's matches
#[derive(Debug, Clone)]
pub struct QueryIter<'p> {
    inner: Inner<'p>,
}

#[derive(Debug, Clone)]
enum Inner<'p> {
    Spans {
        entries: std::slice::Iter<'p, SpanEntry>,
        range: Option<(usize, usize)>,
        types: &'p [TypeId],
    },
    Merge {
        heads: Vec<Peekable<btree_set::Iter<'p, EntryId>>>,
    },
    Empty,
}

impl<'p> Iterator for QueryIter<'p> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        match &mut self.inner {
            Inner::Spans {
                entries,
                range,
                types,
            } => {
                let (range, types) = (*range, *types);
                entries
                    .find(|e| {
                        range.map_or(true, |(lo, hi)| e.span.intersects(lo, hi))
                            && types.binary_search(&e.type_id).is_ok()
                    })
                    .map(|e| e.id)
            }
            Inner::Merge { heads } => {
                // Per-type sets are disjoint; take the smallest head.
                let mut best: Option<(usize, EntryId)> = None;
                for (i, head) in heads.iter_mut().enumerate() {
                    if let Some(&&id) = head.peek() {
                        if best.map_or(true, |(_, b)| id < b) {
                            best = Some((i, id));
                        }
                    }
                }
                let (i, id) = best?;
                heads[i].next();
                Some(id)
            }
            Inner::Empty => None,
        }
    }
}
