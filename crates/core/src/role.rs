//! Structural roles
//!
//! Every entry type resolves to exactly one structural role, inherited from
//! the built-in root at the top of its parent chain. The role decides which
//! role-specific fields an instance carries and how a pack indexes it.
//!
//! | Role | Fields | Indexed by |
//! |------|--------|------------|
//! | Annotation | `[begin, end)` over text | type + text span index |
//! | AudioAnnotation | `[begin, end)` over audio | type + audio span index |
//! | Link | parent, child (same pack) | type |
//! | MultiPackLink | parent, child (any pack) | type, registry link pack |
//! | Group | member set (same pack) | type |
//! | Generic | attributes only | type |
//! | Payload | shared media buffer | type |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by the built-in root type names
pub const TOP_NAMESPACE: &str = "ontopack.top";

/// The structural role of an entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructuralRole {
    /// Span over the pack's text buffer
    Annotation,
    /// Span over the pack's audio buffer
    AudioAnnotation,
    /// Directed edge between two entries of one pack
    Link,
    /// Directed edge between entries that may live in different packs
    MultiPackLink,
    /// Unordered membership set over entries of one pack
    Group,
    /// Attributes only
    Generic,
    /// Attributes plus a shared media buffer
    Payload,
}

impl StructuralRole {
    /// All roles, in built-in declaration order
    pub const ALL: [StructuralRole; 7] = [
        StructuralRole::Annotation,
        StructuralRole::AudioAnnotation,
        StructuralRole::Link,
        StructuralRole::MultiPackLink,
        StructuralRole::Group,
        StructuralRole::Generic,
        StructuralRole::Payload,
    ];

    /// Short name
    pub const fn name(&self) -> &'static str {
        match self {
            StructuralRole::Annotation => "Annotation",
            StructuralRole::AudioAnnotation => "AudioAnnotation",
            StructuralRole::Link => "Link",
            StructuralRole::MultiPackLink => "MultiPackLink",
            StructuralRole::Group => "Group",
            StructuralRole::Generic => "Generic",
            StructuralRole::Payload => "Payload",
        }
    }

    /// Fully qualified name of the built-in root type for this role
    pub const fn root_name(&self) -> &'static str {
        match self {
            StructuralRole::Annotation => "ontopack.top.Annotation",
            StructuralRole::AudioAnnotation => "ontopack.top.AudioAnnotation",
            StructuralRole::Link => "ontopack.top.Link",
            StructuralRole::MultiPackLink => "ontopack.top.MultiPackLink",
            StructuralRole::Group => "ontopack.top.Group",
            StructuralRole::Generic => "ontopack.top.Generic",
            StructuralRole::Payload => "ontopack.top.Payload",
        }
    }

    /// Look up the role whose built-in root is named `name`
    pub fn from_root_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.root_name() == name)
    }

    /// Whether instances carry a span
    pub const fn has_span(&self) -> bool {
        matches!(
            self,
            StructuralRole::Annotation | StructuralRole::AudioAnnotation
        )
    }

    /// Whether the role declares `parent_type` / `child_type` constraints
    pub const fn is_link(&self) -> bool {
        matches!(self, StructuralRole::Link | StructuralRole::MultiPackLink)
    }

    /// Whether the role declares a `member_type` constraint
    pub const fn is_group(&self) -> bool {
        matches!(self, StructuralRole::Group)
    }

    /// Media modality spans of this role index into
    pub const fn modality(&self) -> Option<Modality> {
        match self {
            StructuralRole::Annotation => Some(Modality::Text),
            StructuralRole::AudioAnnotation => Some(Modality::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for StructuralRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of media buffer a pack caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modality {
    /// UTF-8 text, spans are byte offsets
    Text,
    /// PCM samples, spans are sample offsets
    Audio,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Text => f.write_str("text"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}
