//! Entry instances
//!
//! Every entry shares one envelope: its id, the id of the pack that owns
//! it, its resolved type, and one value slot per flattened attribute (in
//! `ResolvedType::attributes()` order). The role-specific part lives in
//! `RoleData`:
//!
//! - **Span**: `[begin, end)` over the pack's text or audio buffer
//! - **Link**: parent and child entries in the same pack
//! - **MultiPackLink**: parent and child `EntryRef`s that may name other packs
//! - **Group**: an unordered member set
//! - **Payload**: a shared handle to one of the pack's media buffers
//! - **Generic**: attributes only
//!
//! References are always ids, never owned copies of their targets.

use crate::media::Media;
use ontopack_core::{EntryId, EntryRef, Modality, PackId, Span, StructuralRole, Value};
use ontopack_schema::TypeId;
use std::collections::BTreeSet;

// ============================================================================
// EntryFields
// ============================================================================

/// Role-specific input to `Pack::add`
#[derive(Debug, Clone, PartialEq)]
pub enum EntryFields {
    /// Generic entries; also accepted for an initially empty group
    None,
    /// Annotation and audio annotation spans
    Span(Span),
    /// Link endpoints within the pack
    Link {
        /// Source entry
        parent: EntryId,
        /// Target entry
        child: EntryId,
    },
    /// Initial group members; duplicates collapse
    Group(Vec<EntryId>),
    /// Payload over the pack's buffer of this modality
    Payload(Modality),
}

impl EntryFields {
    /// Span fields
    pub fn span(begin: usize, end: usize) -> Self {
        EntryFields::Span(Span::new(begin, end))
    }

    /// Link fields
    pub fn link(parent: EntryId, child: EntryId) -> Self {
        EntryFields::Link { parent, child }
    }

    /// Group fields
    pub fn group<I: IntoIterator<Item = EntryId>>(members: I) -> Self {
        EntryFields::Group(members.into_iter().collect())
    }

    /// Short name used in role mismatch messages
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            EntryFields::None => "no fields",
            EntryFields::Span(_) => "span fields",
            EntryFields::Link { .. } => "link fields",
            EntryFields::Group(_) => "group fields",
            EntryFields::Payload(_) => "payload fields",
        }
    }
}

// ============================================================================
// RoleData
// ============================================================================

/// Role-specific state of a stored entry
#[derive(Debug, Clone, PartialEq)]
pub enum RoleData {
    /// Annotation or audio annotation
    Span {
        /// Covered range
        span: Span,
        /// Buffer the range indexes
        modality: Modality,
    },
    /// Intra-pack link
    Link {
        /// Source entry
        parent: EntryId,
        /// Target entry
        child: EntryId,
    },
    /// Cross-pack link, owned by the registry's link pack
    MultiPackLink {
        /// Source entry
        parent: EntryRef,
        /// Target entry
        child: EntryRef,
    },
    /// Membership set
    Group {
        /// Members, ordered by id
        members: BTreeSet<EntryId>,
    },
    /// Media payload
    Payload {
        /// Shared buffer handle
        media: Media,
    },
    /// Attributes only
    Generic,
}

impl RoleData {
    /// Structural role this data belongs to
    pub fn role(&self) -> StructuralRole {
        match self {
            RoleData::Span {
                modality: Modality::Text,
                ..
            } => StructuralRole::Annotation,
            RoleData::Span {
                modality: Modality::Audio,
                ..
            } => StructuralRole::AudioAnnotation,
            RoleData::Link { .. } => StructuralRole::Link,
            RoleData::MultiPackLink { .. } => StructuralRole::MultiPackLink,
            RoleData::Group { .. } => StructuralRole::Group,
            RoleData::Payload { .. } => StructuralRole::Payload,
            RoleData::Generic => StructuralRole::Generic,
        }
    }
}

// ============================================================================
// EntryInstance
// ============================================================================

/// One typed entry owned by a pack
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInstance {
    pub(crate) id: EntryId,
    pub(crate) pack: PackId,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: String,
    pub(crate) values: Vec<Value>,
    pub(crate) role: RoleData,
}

impl EntryInstance {
    /// Id, unique within the owning pack
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Owning pack
    pub fn pack(&self) -> PackId {
        self.pack
    }

    /// Globally unique reference to this entry
    pub fn entry_ref(&self) -> EntryRef {
        EntryRef::new(self.pack, self.id)
    }

    /// Resolved type id
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Resolved type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Role-specific state
    pub fn role_data(&self) -> &RoleData {
        &self.role
    }

    /// Structural role
    pub fn role(&self) -> StructuralRole {
        self.role.role()
    }

    /// Attribute slots, in flattened attribute order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Span of an annotation
    pub fn span(&self) -> Option<Span> {
        match self.role {
            RoleData::Span { span, .. } => Some(span),
            _ => None,
        }
    }

    /// `(parent, child)` of an intra-pack link
    pub fn link_endpoints(&self) -> Option<(EntryId, EntryId)> {
        match self.role {
            RoleData::Link { parent, child } => Some((parent, child)),
            _ => None,
        }
    }

    /// `(parent, child)` of a multi-pack link
    pub fn multi_pack_endpoints(&self) -> Option<(EntryRef, EntryRef)> {
        match self.role {
            RoleData::MultiPackLink { parent, child } => Some((parent, child)),
            _ => None,
        }
    }

    /// Members of a group
    pub fn members(&self) -> Option<&BTreeSet<EntryId>> {
        match &self.role {
            RoleData::Group { members } => Some(members),
            _ => None,
        }
    }

    /// Media handle of a payload
    pub fn payload(&self) -> Option<&Media> {
        match &self.role {
            RoleData::Payload { media } => Some(media),
            _ => None,
        }
    }

    /// References held through role fields, one per occurrence
    pub(crate) fn structural_refs(&self) -> Vec<EntryRef> {
        let local = |id: EntryId| EntryRef::new(self.pack, id);
        match &self.role {
            RoleData::Link { parent, child } => vec![local(*parent), local(*child)],
            RoleData::MultiPackLink { parent, child } => vec![*parent, *child],
            RoleData::Group { members } => members.iter().map(|&m| local(m)).collect(),
            RoleData::Span { .. } | RoleData::Payload { .. } | RoleData::Generic => Vec::new(),
        }
    }

    /// Every reference this entry holds, one per occurrence
    pub fn references(&self) -> Vec<EntryRef> {
        let mut refs = self.structural_refs();
        for value in &self.values {
            refs.extend(value.entry_refs());
        }
        refs
    }
}
