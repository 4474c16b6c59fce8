//! Schema resolver
//!
//! Compiles a flat collection of `EntryTypeDescriptor`s into a `TypeTable`.
//!
//! ## Passes
//!
//! 1. Seed the built-in roots, then index every descriptor by name
//!    (`DuplicateType`). Names are checked against the configured rules.
//! 2. Link parents (`UnknownParent`) and walk every chain to its root,
//!    memoizing ancestor lists (`InheritanceCycle`).
//! 3. Assign each type its root's structural role (`RoleMismatch`).
//! 4. Resolve attribute kinds and endpoint/member constraints against the
//!    name index (`UnresolvedAttributeType`). Because every name was indexed
//!    in pass 1, forward references and self-references resolve like any
//!    other reference. A declared constraint may only narrow the one it
//!    inherits (`RoleMismatch`).
//! 5. Flatten attributes root-to-leaf; a child's declaration of an existing
//!    name replaces the inherited one in place.
//!
//! Every pass walks descriptors in declaration order, so the same input
//! always yields the same table and the same first error.

use crate::config::ResolverConfig;
use crate::descriptor::{AttributeDescriptor, ElementDecl, EntryTypeDescriptor, ValueKindDecl};
use crate::naming::{validate_attribute_name, validate_entry_name, validate_prefix};
use crate::spec::OntologySpec;
use crate::table::{AttributeKind, ElementKind, ResolvedAttribute, ResolvedType, TypeId, TypeTable};
use ontopack_core::{SchemaError, SchemaResult, StructuralRole, Value};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

/// Number of built-in root types at the front of every table
pub const BUILTIN_COUNT: usize = StructuralRole::ALL.len();

// ============================================================================
// SchemaResolver
// ============================================================================

/// Accumulates descriptors and compiles them into a `TypeTable`
///
/// # Example
///
/// ```
/// use ontopack_core::{PrimitiveKind, StructuralRole};
/// use ontopack_schema::{AttributeDescriptor, EntryTypeDescriptor, SchemaResolver};
///
/// let mut resolver = SchemaResolver::new();
/// resolver.add_descriptor(
///     EntryTypeDescriptor::under("ft.onto.Token", StructuralRole::Annotation)
///         .with_attribute(AttributeDescriptor::primitive("pos", PrimitiveKind::Str)),
/// );
/// let table = resolver.resolve().unwrap();
/// assert!(table.is_subtype_by_name("ft.onto.Token", "ontopack.top.Annotation"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    config: ResolverConfig,
    descriptors: Vec<EntryTypeDescriptor>,
    extra_prefixes: Vec<String>,
}

impl SchemaResolver {
    /// Resolver with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with an explicit configuration
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Queue one descriptor
    pub fn add_descriptor(&mut self, descriptor: EntryTypeDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Queue descriptors, preserving their order
    pub fn add_descriptors<I>(&mut self, descriptors: I) -> &mut Self
    where
        I: IntoIterator<Item = EntryTypeDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    /// Queue every definition of a parsed document
    ///
    /// The document's `additional_prefixes` join the allowed prefix set for
    /// the whole compilation. Nothing is queued if any record fails to
    /// convert.
    pub fn add_document(&mut self, spec: &OntologySpec) -> SchemaResult<()> {
        let descriptors = spec.to_descriptors()?;
        debug!(
            target: "ontopack::schema",
            ontology = spec.ontology_name.as_deref().unwrap_or("<unnamed>"),
            definitions = descriptors.len(),
            "Added ontology document"
        );
        for prefix in &spec.additional_prefixes {
            if !self.extra_prefixes.contains(prefix) {
                self.extra_prefixes.push(prefix.clone());
            }
        }
        self.descriptors.extend(descriptors);
        Ok(())
    }

    /// Parse a JSON document and queue its definitions
    pub fn add_json(&mut self, json: &str) -> SchemaResult<()> {
        let spec = OntologySpec::from_json(json)?;
        self.add_document(&spec)
    }

    /// Number of queued descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Compile the queued descriptors
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError` found. No partial table is returned.
    pub fn resolve(self) -> SchemaResult<TypeTable> {
        let SchemaResolver {
            config,
            descriptors,
            extra_prefixes,
        } = self;

        let decls: Vec<EntryTypeDescriptor> = StructuralRole::ALL
            .iter()
            .map(|role| EntryTypeDescriptor::new(role.root_name()).with_role(*role))
            .chain(descriptors)
            .collect();

        let by_name = index_names(&decls)?;
        check_names(&config, &extra_prefixes, &decls[BUILTIN_COUNT..])?;

        let parents = link_parents(&decls, &by_name)?;
        let ancestors = walk_ancestors(&decls, &parents)?;
        let roles = assign_roles(&decls, &ancestors)?;

        let own_attributes = decls
            .iter()
            .enumerate()
            .map(|(i, d)| resolve_own_attributes(d, TypeId::from_index(i), &by_name))
            .collect::<SchemaResult<Vec<_>>>()?;
        let constraints = resolve_constraints(&decls, &roles, &ancestors, &by_name)?;

        let table = assemble(decls, by_name, parents, ancestors, roles, own_attributes, constraints);
        info!(
            target: "ontopack::schema",
            types = table.len(),
            declared = table.len() - BUILTIN_COUNT,
            "Resolved ontology"
        );
        Ok(table)
    }
}

/// Compile descriptors with the default configuration
pub fn resolve<I>(descriptors: I) -> SchemaResult<TypeTable>
where
    I: IntoIterator<Item = EntryTypeDescriptor>,
{
    let mut resolver = SchemaResolver::new();
    resolver.add_descriptors(descriptors);
    resolver.resolve()
}

// ============================================================================
// Pass 1: names
// ============================================================================

fn index_names(decls: &[EntryTypeDescriptor]) -> SchemaResult<FxHashMap<String, TypeId>> {
    let mut by_name = FxHashMap::default();
    for (i, d) in decls.iter().enumerate() {
        if by_name.insert(d.name.clone(), TypeId::from_index(i)).is_some() {
            return Err(SchemaError::DuplicateType {
                name: d.name.clone(),
            });
        }
    }
    Ok(by_name)
}

fn check_names(
    config: &ResolverConfig,
    extra_prefixes: &[String],
    user: &[EntryTypeDescriptor],
) -> SchemaResult<()> {
    let allowed: Vec<String> = config
        .allowed_prefixes
        .iter()
        .chain(extra_prefixes)
        .cloned()
        .collect();

    for d in user {
        if config.validate_identifiers {
            validate_entry_name(&d.name)?;
        }
        if !config.lenient_prefix {
            validate_prefix(&d.name, &allowed)?;
        }
        for a in &d.attributes {
            validate_attribute_name(&d.name, &a.name, config.validate_identifiers)?;
        }
    }
    Ok(())
}

// ============================================================================
// Pass 2: inheritance
// ============================================================================

fn link_parents(
    decls: &[EntryTypeDescriptor],
    by_name: &FxHashMap<String, TypeId>,
) -> SchemaResult<Vec<Option<TypeId>>> {
    decls
        .iter()
        .map(|d| match &d.parent {
            None => Ok(None),
            Some(parent) => by_name
                .get(parent)
                .copied()
                .map(Some)
                .ok_or_else(|| SchemaError::UnknownParent {
                    entry: d.name.clone(),
                    parent: parent.clone(),
                }),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Ancestor lists, root first, for every type
fn walk_ancestors(
    decls: &[EntryTypeDescriptor],
    parents: &[Option<TypeId>],
) -> SchemaResult<Vec<Vec<TypeId>>> {
    let mut state = vec![Visit::Unvisited; decls.len()];
    let mut ancestors: Vec<Vec<TypeId>> = vec![Vec::new(); decls.len()];

    for start in 0..decls.len() {
        if state[start] == Visit::Done {
            continue;
        }

        let mut path: Vec<usize> = Vec::new();
        let mut cur = Some(start);
        while let Some(i) = cur {
            match state[i] {
                Visit::Done => break,
                Visit::InProgress => {
                    let from = path.iter().position(|&p| p == i).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[from..].iter().map(|&p| decls[p].name.clone()).collect();
                    cycle.push(decls[i].name.clone());
                    return Err(SchemaError::InheritanceCycle { cycle });
                }
                Visit::Unvisited => {
                    state[i] = Visit::InProgress;
                    path.push(i);
                    cur = parents[i].map(|p| p.index());
                }
            }
        }

        // The last node on the path is a root or sits on a finished chain.
        for &i in path.iter().rev() {
            ancestors[i] = match parents[i] {
                None => Vec::new(),
                Some(p) => {
                    let mut chain = ancestors[p.index()].clone();
                    chain.push(p);
                    chain
                }
            };
            state[i] = Visit::Done;
        }
    }

    Ok(ancestors)
}

// ============================================================================
// Pass 3: roles
// ============================================================================

fn assign_roles(
    decls: &[EntryTypeDescriptor],
    ancestors: &[Vec<TypeId>],
) -> SchemaResult<Vec<StructuralRole>> {
    let mut roles = Vec::with_capacity(decls.len());

    for (i, d) in decls.iter().enumerate() {
        let role = match ancestors[i].first() {
            None => d.role.ok_or_else(|| SchemaError::RoleMismatch {
                entry: d.name.clone(),
                reason: "a type without a parent must declare its structural role".to_string(),
            })?,
            Some(root) => {
                // Roots come before their descendants on every chain, but not
                // necessarily in declaration order, so read the root directly.
                let inherited = decls[root.index()].role.ok_or_else(|| {
                    SchemaError::RoleMismatch {
                        entry: decls[root.index()].name.clone(),
                        reason: "a type without a parent must declare its structural role"
                            .to_string(),
                    }
                })?;
                if let Some(declared) = d.role {
                    if declared != inherited {
                        return Err(SchemaError::RoleMismatch {
                            entry: d.name.clone(),
                            reason: format!(
                                "declared role {} but parent chain is {}",
                                declared.name(),
                                inherited.name()
                            ),
                        });
                    }
                }
                inherited
            }
        };

        if (d.parent_type.is_some() || d.child_type.is_some()) && !role.is_link() {
            return Err(SchemaError::RoleMismatch {
                entry: d.name.clone(),
                reason: format!(
                    "parent_type/child_type only apply to link types, not {}",
                    role.name()
                ),
            });
        }
        if d.member_type.is_some() && !role.is_group() {
            return Err(SchemaError::RoleMismatch {
                entry: d.name.clone(),
                reason: format!("member_type only applies to group types, not {}", role.name()),
            });
        }

        roles.push(role);
    }

    Ok(roles)
}

// ============================================================================
// Pass 4: attribute and constraint references
// ============================================================================

fn lookup(
    by_name: &FxHashMap<String, TypeId>,
    entry: &str,
    attribute: &str,
    type_name: &str,
) -> SchemaResult<TypeId> {
    by_name
        .get(type_name)
        .copied()
        .ok_or_else(|| SchemaError::UnresolvedAttributeType {
            entry: entry.to_string(),
            attribute: attribute.to_string(),
            type_name: type_name.to_string(),
        })
}

fn resolve_element(
    by_name: &FxHashMap<String, TypeId>,
    entry: &str,
    attribute: &str,
    element: &ElementDecl,
) -> SchemaResult<ElementKind> {
    Ok(match element {
        ElementDecl::Primitive(p) => ElementKind::Primitive(*p),
        ElementDecl::EntryRef(name) => ElementKind::Entry(lookup(by_name, entry, attribute, name)?),
    })
}

fn resolve_attribute(
    by_name: &FxHashMap<String, TypeId>,
    entry: &str,
    owner: TypeId,
    attr: &AttributeDescriptor,
) -> SchemaResult<ResolvedAttribute> {
    let kind = match &attr.kind {
        ValueKindDecl::Primitive(p) => AttributeKind::Primitive(*p),
        ValueKindDecl::EntryRef(name) => {
            AttributeKind::Entry(lookup(by_name, entry, &attr.name, name)?)
        }
        ValueKindDecl::List(e) => AttributeKind::List(resolve_element(by_name, entry, &attr.name, e)?),
        ValueKindDecl::Map(e) => AttributeKind::Map(resolve_element(by_name, entry, &attr.name, e)?),
    };

    let default = match (&attr.default, kind) {
        (None, _) | (Some(Value::Null), AttributeKind::Primitive(_)) => kind.empty_value(),
        (Some(value), AttributeKind::Primitive(p)) => {
            if !p.accepts(value) {
                return Err(SchemaError::InvalidDefault {
                    entry: entry.to_string(),
                    attribute: attr.name.clone(),
                    reason: format!("expected {}, found {}", p.keyword(), value.type_name()),
                });
            }
            value.clone()
        }
        (Some(_), _) => {
            return Err(SchemaError::InvalidDefault {
                entry: entry.to_string(),
                attribute: attr.name.clone(),
                reason: "defaults are only supported on primitive attributes".to_string(),
            })
        }
    };

    Ok(ResolvedAttribute {
        name: attr.name.clone(),
        kind,
        default,
        declared_in: owner,
        description: attr.description.clone(),
    })
}

/// Own attributes of one descriptor, with in-descriptor redeclarations folded
fn resolve_own_attributes(
    d: &EntryTypeDescriptor,
    owner: TypeId,
    by_name: &FxHashMap<String, TypeId>,
) -> SchemaResult<Vec<ResolvedAttribute>> {
    let mut out: Vec<ResolvedAttribute> = Vec::with_capacity(d.attributes.len());
    for attr in &d.attributes {
        let resolved = resolve_attribute(by_name, &d.name, owner, attr)?;
        match out.iter().position(|a| a.name == resolved.name) {
            Some(pos) => {
                warn!(
                    target: "ontopack::schema",
                    entry = %d.name,
                    attribute = %resolved.name,
                    "Attribute declared twice, keeping the later declaration"
                );
                out[pos] = resolved;
            }
            None => out.push(resolved),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default)]
struct Constraints {
    parent_type: Option<TypeId>,
    child_type: Option<TypeId>,
    member_type: Option<TypeId>,
}

/// Effective constraints; unset ones inherit from the nearest ancestor
///
/// A declared constraint must name the inherited type or one of its
/// subtypes (`RoleMismatch` otherwise).
fn resolve_constraints(
    decls: &[EntryTypeDescriptor],
    roles: &[StructuralRole],
    ancestors: &[Vec<TypeId>],
    by_name: &FxHashMap<String, TypeId>,
) -> SchemaResult<Vec<Constraints>> {
    let resolve_opt = |entry: &str, key: &str, name: &Option<String>| -> SchemaResult<Option<TypeId>> {
        name.as_deref()
            .map(|n| lookup(by_name, entry, key, n))
            .transpose()
    };

    let mut declared = Vec::with_capacity(decls.len());
    for d in decls {
        declared.push(Constraints {
            parent_type: resolve_opt(&d.name, "parent_type", &d.parent_type)?,
            child_type: resolve_opt(&d.name, "child_type", &d.child_type)?,
            member_type: resolve_opt(&d.name, "member_type", &d.member_type)?,
        });
    }

    let narrow = |i: usize, key: &str, pick: fn(&Constraints) -> Option<TypeId>| {
        let own = pick(&declared[i]);
        let inherited = ancestors[i]
            .iter()
            .rev()
            .find_map(|a| pick(&declared[a.index()]));
        match (own, inherited) {
            (Some(own), Some(base))
                if own != base && !ancestors[own.index()].contains(&base) =>
            {
                Err(SchemaError::RoleMismatch {
                    entry: decls[i].name.clone(),
                    reason: format!(
                        "{} {} is not a subtype of inherited {}",
                        key,
                        decls[own.index()].name,
                        decls[base.index()].name
                    ),
                })
            }
            (own, inherited) => Ok(own.or(inherited)),
        }
    };

    let mut effective = Vec::with_capacity(decls.len());
    for i in 0..decls.len() {
        let c = if roles[i].is_link() || roles[i].is_group() {
            Constraints {
                parent_type: narrow(i, "parent_type", |c| c.parent_type)?,
                child_type: narrow(i, "child_type", |c| c.child_type)?,
                member_type: narrow(i, "member_type", |c| c.member_type)?,
            }
        } else {
            declared[i]
        };
        effective.push(c);
    }

    Ok(effective)
}

// ============================================================================
// Pass 5: flatten and assemble
// ============================================================================

fn assemble(
    decls: Vec<EntryTypeDescriptor>,
    by_name: FxHashMap<String, TypeId>,
    parents: Vec<Option<TypeId>>,
    ancestors: Vec<Vec<TypeId>>,
    roles: Vec<StructuralRole>,
    own_attributes: Vec<Vec<ResolvedAttribute>>,
    constraints: Vec<Constraints>,
) -> TypeTable {
    let n = decls.len();

    let mut children: Vec<Vec<TypeId>> = vec![Vec::new(); n];
    let mut descendants: Vec<Vec<TypeId>> = vec![Vec::new(); n];
    for i in 0..n {
        let id = TypeId::from_index(i);
        if let Some(p) = parents[i] {
            children[p.index()].push(id);
        }
        descendants[i].push(id);
        for a in &ancestors[i] {
            descendants[a.index()].push(id);
        }
    }

    let mut types = Vec::with_capacity(n);
    for (i, d) in decls.into_iter().enumerate() {
        let mut attributes: Vec<ResolvedAttribute> = Vec::new();
        let mut attribute_index: FxHashMap<String, usize> = FxHashMap::default();
        let chain = ancestors[i].iter().map(|a| a.index()).chain(std::iter::once(i));
        for level in chain {
            for attr in &own_attributes[level] {
                match attribute_index.get(&attr.name) {
                    Some(&pos) => attributes[pos] = attr.clone(),
                    None => {
                        attribute_index.insert(attr.name.clone(), attributes.len());
                        attributes.push(attr.clone());
                    }
                }
            }
        }

        types.push(ResolvedType {
            id: TypeId::from_index(i),
            name: d.name,
            parent: parents[i],
            role: roles[i],
            builtin: i < BUILTIN_COUNT,
            ancestors: ancestors[i].clone(),
            own_attributes: own_attributes[i].iter().map(|a| a.name.clone()).collect(),
            attributes,
            attribute_index,
            parent_type: constraints[i].parent_type,
            child_type: constraints[i].child_type,
            member_type: constraints[i].member_type,
            children: std::mem::take(&mut children[i]),
            descendants: std::mem::take(&mut descendants[i]),
            description: d.description,
        });
    }

    TypeTable { types, by_name }
}
