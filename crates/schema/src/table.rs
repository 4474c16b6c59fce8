//! Resolved type table
//!
//! The table is the compiled form of an ontology: one `ResolvedType` per
//! declared entry type plus the seven built-in roots, each with its full
//! ancestor chain and a flattened attribute set. It is immutable once built
//! and is shared between packs as `Arc<TypeTable>`.
//!
//! Types are addressed by `TypeId`, an index into the table's arena. Ids
//! are only meaningful for the table that issued them.

use ontopack_core::{PrimitiveKind, StructuralRole, Value};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a type within its `TypeTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Arena index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Resolved element kind of a container attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Scalar element
    Primitive(PrimitiveKind),
    /// Reference to an entry of this type or a subtype
    Entry(TypeId),
}

/// Resolved attribute kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Scalar
    Primitive(PrimitiveKind),
    /// Reference to an entry of this type or a subtype
    Entry(TypeId),
    /// Homogeneous list
    List(ElementKind),
    /// String-keyed map
    Map(ElementKind),
}

impl AttributeKind {
    /// Value a freshly created instance holds for this kind
    ///
    /// Containers start empty, scalars and references start unset.
    pub fn empty_value(&self) -> Value {
        match self {
            AttributeKind::Primitive(_) | AttributeKind::Entry(_) => Value::Null,
            AttributeKind::List(_) => Value::List(Vec::new()),
            AttributeKind::Map(_) => Value::Map(Default::default()),
        }
    }

    /// Whether values of this kind may hold entry references
    pub fn holds_references(&self) -> bool {
        matches!(
            self,
            AttributeKind::Entry(_)
                | AttributeKind::List(ElementKind::Entry(_))
                | AttributeKind::Map(ElementKind::Entry(_))
        )
    }
}

/// One attribute of a resolved type
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttribute {
    /// Attribute name
    pub name: String,
    /// Resolved kind
    pub kind: AttributeKind,
    /// Initial value on a new instance
    pub default: Value,
    /// Type whose declaration won (the deepest one declaring the name)
    pub declared_in: TypeId,
    /// Documentation only
    pub description: Option<String>,
}

/// One compiled entry type
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub(crate) id: TypeId,
    pub(crate) name: String,
    pub(crate) parent: Option<TypeId>,
    pub(crate) role: StructuralRole,
    pub(crate) builtin: bool,
    pub(crate) ancestors: Vec<TypeId>,
    pub(crate) own_attributes: Vec<String>,
    pub(crate) attributes: Vec<ResolvedAttribute>,
    pub(crate) attribute_index: FxHashMap<String, usize>,
    pub(crate) parent_type: Option<TypeId>,
    pub(crate) child_type: Option<TypeId>,
    pub(crate) member_type: Option<TypeId>,
    pub(crate) children: Vec<TypeId>,
    pub(crate) descendants: Vec<TypeId>,
    pub(crate) description: Option<String>,
}

impl ResolvedType {
    /// Table id
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct parent, `None` for roots
    pub fn parent(&self) -> Option<TypeId> {
        self.parent
    }

    /// Structural role inherited from the root
    pub fn role(&self) -> StructuralRole {
        self.role
    }

    /// Whether this is one of the built-in roots
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Ancestor chain, root first, excluding this type
    pub fn ancestors(&self) -> &[TypeId] {
        &self.ancestors
    }

    /// Flattened attributes: inherited first, then own, child overrides in place
    pub fn attributes(&self) -> &[ResolvedAttribute] {
        &self.attributes
    }

    /// Look up a flattened attribute by name
    pub fn attribute(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.attribute_index.get(name).map(|&i| &self.attributes[i])
    }

    /// Position of a flattened attribute in `attributes()`
    pub fn attribute_slot(&self, name: &str) -> Option<usize> {
        self.attribute_index.get(name).copied()
    }

    /// Names declared directly on this type
    pub fn own_attribute_names(&self) -> &[String] {
        &self.own_attributes
    }

    /// Effective link parent endpoint type, `None` means unconstrained
    pub fn parent_type(&self) -> Option<TypeId> {
        self.parent_type
    }

    /// Effective link child endpoint type, `None` means unconstrained
    pub fn child_type(&self) -> Option<TypeId> {
        self.child_type
    }

    /// Effective group member type, `None` means unconstrained
    pub fn member_type(&self) -> Option<TypeId> {
        self.member_type
    }

    /// Direct subtypes, in table order
    pub fn children(&self) -> &[TypeId] {
        &self.children
    }

    /// This type and every transitive subtype, in table order
    pub fn descendants(&self) -> &[TypeId] {
        &self.descendants
    }

    /// Documentation only
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Compiled ontology
#[derive(Debug, Clone)]
pub struct TypeTable {
    pub(crate) types: Vec<ResolvedType>,
    pub(crate) by_name: FxHashMap<String, TypeId>,
}

impl TypeTable {
    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.by_name.get(name).map(|id| &self.types[id.index()])
    }

    /// Id of the named type
    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Look up a type by id, `None` for ids this table did not issue
    pub fn by_id(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.index())
    }

    /// The type behind an id issued by this table
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different, larger table.
    pub fn resolved(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.index()]
    }

    /// Name of the type behind `id`
    pub fn name_of(&self, id: TypeId) -> &str {
        &self.resolved(id).name
    }

    /// Built-in root for a role
    pub fn root(&self, role: StructuralRole) -> TypeId {
        // Built-ins occupy the first slots in `StructuralRole::ALL` order.
        let index = StructuralRole::ALL
            .iter()
            .position(|r| *r == role)
            .unwrap_or_default();
        TypeId::from_index(index)
    }

    /// Whether `sub` is `sup` or a transitive subtype of it
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        sub == sup || self.resolved(sub).ancestors.contains(&sup)
    }

    /// Name-based `is_subtype`; unknown names are never subtypes
    pub fn is_subtype_by_name(&self, sub: &str, sup: &str) -> bool {
        match (self.id_of(sub), self.id_of(sup)) {
            (Some(a), Some(b)) => self.is_subtype(a, b),
            _ => false,
        }
    }

    /// Direct subtypes of the named type
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|t| t.children.iter().map(|&c| self.name_of(c)).collect())
            .unwrap_or_default()
    }

    /// All types, built-ins first, then in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType> {
        self.types.iter()
    }

    /// Number of types, built-ins included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false: built-ins are always present
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Human-readable form of an attribute kind, e.g. `List[ft.onto.Token]`
    pub fn describe_kind(&self, kind: &AttributeKind) -> String {
        let element = |e: &ElementKind| match e {
            ElementKind::Primitive(p) => p.keyword().to_string(),
            ElementKind::Entry(t) => self.name_of(*t).to_string(),
        };
        match kind {
            AttributeKind::Primitive(p) => p.keyword().to_string(),
            AttributeKind::Entry(t) => self.name_of(*t).to_string(),
            AttributeKind::List(e) => format!("List[{}]", element(e)),
            AttributeKind::Map(e) => format!("Dict[str, {}]", element(e)),
        }
    }

    /// Tree of types following parent links, rooted at a synthetic `root`
    pub fn entry_tree(&self) -> EntryTreeNode {
        let mut root = EntryTreeNode::new("root");
        root.children = self
            .types
            .iter()
            .filter(|t| t.parent.is_none())
            .map(|t| self.subtree(t.id))
            .collect();
        root
    }

    fn subtree(&self, id: TypeId) -> EntryTreeNode {
        let ty = self.resolved(id);
        EntryTreeNode {
            name: ty.name.clone(),
            attributes: ty
                .own_attributes
                .iter()
                .filter_map(|name| ty.attribute(name))
                .map(|a| (a.name.clone(), self.describe_kind(&a.kind)))
                .collect(),
            children: ty.children.iter().map(|&c| self.subtree(c)).collect(),
        }
    }
}

/// Serializable view of the inheritance tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTreeNode {
    /// Type name
    pub name: String,
    /// Own attributes as `(name, kind)` pairs
    pub attributes: Vec<(String, String)>,
    /// Direct subtypes
    pub children: Vec<EntryTreeNode>,
}

impl EntryTreeNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Depth-first search by name
    pub fn find(&self, name: &str) -> Option<&EntryTreeNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Total node count, synthetic root included
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(EntryTreeNode::len).sum::<usize>()
    }

    /// Always false: a tree has at least its root
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for EntryTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(node: &EntryTreeNode, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:indent$}{}", "", node.name, indent = depth * 2)?;
            if !node.attributes.is_empty() {
                let attrs: Vec<String> = node
                    .attributes
                    .iter()
                    .map(|(n, k)| format!("{}: {}", n, k))
                    .collect();
                write!(f, " ({})", attrs.join(", "))?;
            }
            writeln!(f)?;
            for child in &node.children {
                walk(child, depth + 1, f)?;
            }
            Ok(())
        }
        walk(self, 0, f)
    }
}
