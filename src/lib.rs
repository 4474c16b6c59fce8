//! Ontopack - ontology compiler and typed entry store
//!
//! Ontopack compiles an ontology specification (a JSON document of entry
//! definitions) into an immutable type table, then stores typed entries
//! over text and audio buffers in packs that downstream stages query by
//! type and span.
//!
//! # Quick Start
//!
//! ```
//! use ontopack::{EntryFields, Pack, SchemaResolver};
//! use std::sync::Arc;
//!
//! let mut resolver = SchemaResolver::new();
//! resolver.add_json(r#"{
//!     "definitions": [
//!         { "entry_name": "ft.onto.Token",
//!           "parent_entry": "ontopack.top.Annotation",
//!           "attributes": [{ "name": "pos", "type": "str" }] }
//!     ]
//! }"#)?;
//! let table = Arc::new(resolver.resolve()?);
//!
//! let mut pack = Pack::new(table);
//! pack.set_text("Hello world")?;
//! let hello = pack.add("ft.onto.Token", EntryFields::span(0, 5))?;
//! pack.set_attribute(hello, "pos", "UH")?;
//!
//! let tokens = pack.query("ft.onto.Token", Some(0..5))?;
//! assert_eq!(tokens.to_vec(), vec![hello]);
//! # Ok::<(), ontopack::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`ontopack_core`]: identifiers, roles, values, errors
//! - [`ontopack_schema`]: the ontology document format and the schema resolver
//! - [`ontopack_store`]: packs, attribute access, queries, the multi-pack
//!   registry
//!
//! The type table is read-only once resolved and is shared as
//! `Arc<TypeTable>`. Packs are single-writer; share them as [`SharedPack`].

pub use ontopack_core::*;
pub use ontopack_schema::*;
pub use ontopack_store::*;
