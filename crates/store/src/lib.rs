//! Entry runtime for ontopack
//!
//! This crate instantiates a compiled `TypeTable`:
//! - Pack: single-writer entry store with media buffers, type and span
//!   indices, and strict reference-checked removal
//! - EntryInstance / EntryFields: the instance envelope and role-specific data
//! - AttributeAccessor: checked attribute reads and writes
//! - EntryQuery: lazy, restartable type and span queries
//! - MultiPackRegistry: pack map and cross-pack links
//!
//! # Example
//!
//! ```
//! use ontopack_core::StructuralRole;
//! use ontopack_schema::{resolve, EntryTypeDescriptor};
//! use ontopack_store::{EntryFields, Pack};
//! use std::sync::Arc;
//!
//! let table = resolve(vec![EntryTypeDescriptor::under(
//!     "ft.onto.Token",
//!     StructuralRole::Annotation,
//! )])
//! .unwrap();
//!
//! let mut pack = Pack::new(Arc::new(table));
//! pack.set_text("Hello world").unwrap();
//! let hello = pack.add("ft.onto.Token", EntryFields::span(0, 5)).unwrap();
//! pack.add("ft.onto.Token", EntryFields::span(6, 11)).unwrap();
//!
//! let hits = pack.query("ft.onto.Token", Some(0..3)).unwrap();
//! assert_eq!(hits.to_vec(), vec![hello]);
//! assert_eq!(pack.span_text(hello).unwrap(), "Hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod entry;
pub mod index;
pub mod media;
pub mod multi_pack;
pub mod pack;
pub mod query;
pub mod refs;

pub use accessor::{AttributeAccessor, AttributeValue, EntryResolver};
pub use entry::{EntryFields, EntryInstance, RoleData};
pub use index::{SpanEntry, SpanIndex, TypeIndex};
pub use media::{AudioBuffer, Media};
pub use multi_pack::MultiPackRegistry;
pub use pack::{Pack, SharedPack};
pub use query::{EntryQuery, QueryIter};
pub use refs::ReferenceTracker;
