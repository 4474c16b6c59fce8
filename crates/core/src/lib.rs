//! Core types for ontopack
//!
//! This crate defines the foundational types used throughout the system:
//! - PackId, EntryId, EntryRef: identity and cross-entry references
//! - Span: half-open offsets into a pack's media buffer
//! - StructuralRole, Modality: the closed set of entry roles
//! - Value, PrimitiveKind: runtime attribute values
//! - Error: SchemaError / InstanceError / RegistryError taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod role;
pub mod types;
pub mod value;

pub use error::{
    Error, InstanceError, InstanceResult, RegistryError, RegistryResult, Result, SchemaError,
    SchemaResult,
};
pub use role::{Modality, StructuralRole, TOP_NAMESPACE};
pub use types::{EntryId, EntryRef, PackId, Span};
pub use value::{PrimitiveKind, Value};
