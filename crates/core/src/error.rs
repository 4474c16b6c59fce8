//! Error types for ontopack
//!
//! Three layers, matching where a failure is detected:
//! - `SchemaError`: compiling an ontology into a type table. Fatal to that
//!   compilation, no partial table is ever returned.
//! - `InstanceError`: one pack operation. The pack is left unmodified.
//! - `RegistryError`: one multi-pack registry operation. The registry and
//!   every pack it touched are left unmodified.
//!
//! Nothing in this crate retries or coerces; every failure reaches the caller.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::role::{Modality, StructuralRole};
use crate::types::{EntryId, EntryRef, PackId, Span};
use thiserror::Error;

/// Result type alias for schema compilation
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Result type alias for pack operations
pub type InstanceResult<T> = std::result::Result<T, InstanceError>;

/// Result type alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias using the umbrella error
pub type Result<T> = std::result::Result<T, Error>;

/// Failures detected while compiling an ontology
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two descriptors share a name
    #[error("Duplicate entry type: {name}")]
    DuplicateType {
        /// The repeated name
        name: String,
    },

    /// A parent name is not declared anywhere
    #[error("Entry type {entry} has unknown parent {parent}")]
    UnknownParent {
        /// Entry declaring the parent
        entry: String,
        /// The missing parent name
        parent: String,
    },

    /// The parent chain revisits a type before reaching a root
    #[error("Inheritance cycle: {}", cycle.join(" -> "))]
    InheritanceCycle {
        /// Types on the cycle, in parent order, first type repeated last
        cycle: Vec<String>,
    },

    /// Declared role or role-specific constraint disagrees with the parent chain
    #[error("Role mismatch for {entry}: {reason}")]
    RoleMismatch {
        /// Offending entry
        entry: String,
        /// What disagreed
        reason: String,
    },

    /// An attribute or constraint names a type that is never declared
    #[error("Attribute {attribute} of {entry} references undeclared type {type_name}")]
    UnresolvedAttributeType {
        /// Owning entry
        entry: String,
        /// Attribute (or constraint key) name
        attribute: String,
        /// The undeclared type name
        type_name: String,
    },

    /// Attribute type outside the supported vocabulary
    #[error("Unsupported type for attribute {attribute} of {entry}: {reason}")]
    UnsupportedAttributeType {
        /// Owning entry
        entry: String,
        /// Attribute name
        attribute: String,
        /// Why it is unsupported
        reason: String,
    },

    /// Entry or attribute name is not a valid identifier
    #[error("Invalid identifier {name}: {reason}")]
    InvalidIdentifier {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Entry name outside every allowed package prefix
    #[error("Entry {entry} does not start with an allowed prefix ({})", allowed.join(", "))]
    DisallowedPrefix {
        /// The rejected entry name
        entry: String,
        /// Prefixes that were allowed
        allowed: Vec<String>,
    },

    /// Attribute name collides with an instance envelope field
    #[error("Attribute name {attribute} of {entry} is reserved")]
    ReservedAttribute {
        /// Owning entry
        entry: String,
        /// The reserved name
        attribute: String,
    },

    /// Declared default value is unusable for the attribute
    #[error("Invalid default for attribute {attribute} of {entry}: {reason}")]
    InvalidDefault {
        /// Owning entry
        entry: String,
        /// Attribute name
        attribute: String,
        /// Why the default was rejected
        reason: String,
    },

    /// Malformed specification document
    #[error("Malformed ontology specification: {0}")]
    Spec(String),

    /// Malformed resolver configuration
    #[error("Invalid resolver configuration: {0}")]
    Config(String),
}

/// Failures of a single pack operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    /// Type name not present in the compiled table
    #[error("Unknown entry type: {0}")]
    UnknownType(String),

    /// Span inverted, outside the buffer, or not on a character boundary
    #[error("Invalid span {span} for {modality} buffer of length {buffer_len}")]
    InvalidSpan {
        /// The rejected span
        span: Span,
        /// Buffer the span indexes into
        modality: Modality,
        /// Length of that buffer
        buffer_len: usize,
    },

    /// Value kind does not match the attribute's declared kind
    #[error("Type mismatch for attribute {attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Attribute being set
        attribute: String,
        /// Declared kind
        expected: String,
        /// Kind actually supplied
        found: String,
    },

    /// Attribute not in the type's flattened attribute set
    #[error("Unknown attribute {attribute} on type {type_name}")]
    UnknownAttribute {
        /// Instance type
        type_name: String,
        /// Requested attribute
        attribute: String,
    },

    /// Link endpoint type does not conform to the declared endpoint type
    #[error("Link {endpoint} endpoint must be {expected}, found {found}")]
    EndpointTypeError {
        /// `"parent"` or `"child"`
        endpoint: &'static str,
        /// Declared endpoint type
        expected: String,
        /// Actual endpoint type
        found: String,
    },

    /// Group member type does not conform to the declared member type
    #[error("Group member {member} must be {expected}, found {found}")]
    MemberTypeError {
        /// Rejected member
        member: EntryId,
        /// Declared member type
        expected: String,
        /// Actual member type
        found: String,
    },

    /// Entry is still referenced by live entries
    #[error("Entry {entry} is still referenced by {} holder(s)", held_by.len())]
    ReferencedEntry {
        /// Entry that could not be removed
        entry: EntryId,
        /// Every entry holding a reference to it
        held_by: Vec<EntryRef>,
    },

    /// Id not live in this pack
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Intra-pack reference names another pack
    #[error("Reference {0} points outside this pack")]
    CrossPackReference(EntryRef),

    /// Role-specific fields do not match the type's structural role
    #[error("Type {type_name} has role {role}: {reason}")]
    RoleMismatch {
        /// Instance type
        type_name: String,
        /// Its structural role
        role: StructuralRole,
        /// What was wrong
        reason: String,
    },

    /// Payload requested for a modality the pack holds no buffer for
    #[error("Pack has no {0} buffer")]
    MissingMedia(Modality),
}

/// Failures of a single registry operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Pack id not registered
    #[error("Unknown pack: {0}")]
    UnknownPack(PackId),

    /// Entry id not live in its (registered) pack
    #[error("Unknown entry: {0}")]
    UnknownEntry(EntryRef),

    /// Pack still has entries referenced by multi-pack links
    #[error("Pack {pack} is referenced by {links} multi-pack link(s)")]
    PackInUse {
        /// The pack that could not be unregistered
        pack: PackId,
        /// Number of links touching it
        links: usize,
    },

    /// Pack id already registered
    #[error("Pack already registered: {0}")]
    PackAlreadyRegistered(PackId),

    /// Id does not name a live multi-pack link
    #[error("Unknown multi-pack link: {0}")]
    UnknownLink(EntryId),

    /// Pack was built against a different type table than the registry
    #[error("Pack {0} uses a different type table than the registry")]
    TypeTableMismatch(PackId),

    /// A pack-level failure surfaced through the registry
    #[error(transparent)]
    Instance(#[from] InstanceError),
}

/// Umbrella error for callers spanning all layers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Schema compilation failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Pack operation failure
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// Registry operation failure
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
