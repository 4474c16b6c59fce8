//! Unresolved type descriptors
//!
//! A descriptor is one entry type exactly as declared: names are still
//! strings, the parent chain is not walked, and attributes are not yet
//! flattened. The resolver turns a collection of these into a `TypeTable`.

use ontopack_core::{PrimitiveKind, StructuralRole, Value};

/// Element kind of a container attribute, as declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementDecl {
    /// Scalar element
    Primitive(PrimitiveKind),
    /// Reference to an entry of the named type (or a subtype)
    EntryRef(String),
}

/// Attribute value kind, as declared
///
/// Containers cannot nest: a list of lists is not expressible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKindDecl {
    /// Scalar
    Primitive(PrimitiveKind),
    /// Homogeneous list
    List(ElementDecl),
    /// String-keyed map
    Map(ElementDecl),
    /// Reference to an entry of the named type (or a subtype)
    EntryRef(String),
}

impl ValueKindDecl {
    /// Every entry type name this kind references
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            ValueKindDecl::EntryRef(name)
            | ValueKindDecl::List(ElementDecl::EntryRef(name))
            | ValueKindDecl::Map(ElementDecl::EntryRef(name)) => Some(name),
            _ => None,
        }
    }
}

/// One declared attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    /// Attribute name, unique within its declaring entry
    pub name: String,
    /// Declared kind
    pub kind: ValueKindDecl,
    /// Initial value for primitive attributes
    pub default: Option<Value>,
    /// Documentation only
    pub description: Option<String>,
}

impl AttributeDescriptor {
    /// Declare an attribute
    pub fn new(name: impl Into<String>, kind: ValueKindDecl) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            description: None,
        }
    }

    /// Scalar attribute
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Self {
        Self::new(name, ValueKindDecl::Primitive(kind))
    }

    /// Entry-reference attribute
    pub fn entry_ref(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, ValueKindDecl::EntryRef(type_name.into()))
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One declared entry type
///
/// `role` may be left unset on non-root descriptors, in which case it is
/// inherited from the parent chain. A descriptor without a parent is a root
/// and must declare its role.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTypeDescriptor {
    /// Globally unique name
    pub name: String,
    /// Name of the parent type
    pub parent: Option<String>,
    /// Declared structural role
    pub role: Option<StructuralRole>,
    /// Own attributes, in declaration order
    pub attributes: Vec<AttributeDescriptor>,
    /// Link parent endpoint type
    pub parent_type: Option<String>,
    /// Link child endpoint type
    pub child_type: Option<String>,
    /// Group member type
    pub member_type: Option<String>,
    /// Documentation only
    pub description: Option<String>,
}

impl EntryTypeDescriptor {
    /// Declare a type with no parent, role or attributes yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            role: None,
            attributes: Vec::new(),
            parent_type: None,
            child_type: None,
            member_type: None,
            description: None,
        }
    }

    /// Declare a type directly under the built-in root for `role`
    pub fn under(name: impl Into<String>, role: StructuralRole) -> Self {
        Self::new(name).with_parent(role.root_name())
    }

    /// Set the parent type
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the declared role
    pub fn with_role(mut self, role: StructuralRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Append an attribute
    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set link endpoint types
    pub fn with_endpoints(
        mut self,
        parent_type: impl Into<String>,
        child_type: impl Into<String>,
    ) -> Self {
        self.parent_type = Some(parent_type.into());
        self.child_type = Some(child_type.into());
        self
    }

    /// Set the group member type
    pub fn with_member_type(mut self, member_type: impl Into<String>) -> Self {
        self.member_type = Some(member_type.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
