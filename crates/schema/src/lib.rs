//! Ontology compiler for ontopack
//!
//! This crate turns ontology specifications into a resolved type table:
//! - spec: the JSON wire format (documents, entry records, attribute records)
//! - descriptor: unresolved entry type descriptors
//! - resolver: the multi-pass resolver (inheritance, roles, references)
//! - table: the immutable `TypeTable` shared by every pack
//! - naming: identifier, prefix and reserved-name rules
//! - config: `ResolverConfig` loaded from TOML

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod naming;
pub mod resolver;
pub mod spec;
pub mod table;

pub use config::ResolverConfig;
pub use descriptor::{AttributeDescriptor, ElementDecl, EntryTypeDescriptor, ValueKindDecl};
pub use resolver::{resolve, SchemaResolver, BUILTIN_COUNT};
pub use spec::{AttributeSpec, EntryDefinition, OntologySpec};
pub use table::{
    AttributeKind, ElementKind, EntryTreeNode, ResolvedAttribute, ResolvedType, TypeId, TypeTable,
};
