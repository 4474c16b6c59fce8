//! Multi-pack registry
//!
//! The registry maps pack ids to shared packs and owns the multi-pack links
//! that connect entries across them. Links live in a registry-owned pack of
//! their own, so they belong to neither endpoint's document.
//!
//! ## Pinning
//!
//! Adding a link pins both endpoints in their packs: the endpoint packs
//! record the link (as an `EntryRef` into the link pack) as a holder, so
//! `Pack::remove` refuses to drop a linked entry. Entry-reference attributes
//! set on a link through `set_link_attribute` are pinned the same way.
//! `remove_link` releases every pin. A pack touched by any link cannot be
//! unregistered.
//!
//! ## Locking
//!
//! One `RwLock` guards the pack map and the link pack. Operations that touch
//! endpoint packs take the registry lock first and then the endpoint packs'
//! write locks in ascending `PackId` order. Callers must not hold a pack
//! guard while calling into the registry.

use crate::accessor::{AttributeAccessor, EntryResolver};
use crate::entry::EntryInstance;
use crate::pack::{Pack, SharedPack};
use ontopack_core::{
    EntryId, EntryRef, InstanceError, InstanceResult, PackId, RegistryError, RegistryResult,
    StructuralRole, Value,
};
use ontopack_schema::{TypeId, TypeTable};
use parking_lot::{RwLock, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of packs and the multi-pack links between them
#[derive(Debug)]
pub struct MultiPackRegistry {
    table: Arc<TypeTable>,
    state: RwLock<RegistryState>,
}

#[derive(Debug)]
struct RegistryState {
    packs: BTreeMap<PackId, SharedPack>,
    links: Pack,
    /// Pack → links referencing any of its entries
    by_pack: FxHashMap<PackId, BTreeSet<EntryId>>,
}

impl MultiPackRegistry {
    /// Empty registry over `table`
    pub fn new(table: Arc<TypeTable>) -> Self {
        let links = Pack::new(Arc::clone(&table));
        Self {
            table,
            state: RwLock::new(RegistryState {
                packs: BTreeMap::new(),
                links,
                by_pack: FxHashMap::default(),
            }),
        }
    }

    /// Type table shared by every registered pack
    pub fn table(&self) -> &Arc<TypeTable> {
        &self.table
    }

    /// Id of the registry-owned pack holding the links
    pub fn links_pack_id(&self) -> PackId {
        self.state.read().links.id()
    }

    // ========================================================================
    // Packs
    // ========================================================================

    /// Register a pack
    ///
    /// # Errors
    ///
    /// - `TypeTableMismatch` if the pack uses another table instance
    /// - `PackAlreadyRegistered` if its id is taken
    pub fn register_pack(&self, pack: SharedPack) -> RegistryResult<PackId> {
        let (id, entries) = {
            let p = pack.read();
            if !Arc::ptr_eq(p.table(), &self.table) {
                return Err(RegistryError::TypeTableMismatch(p.id()));
            }
            (p.id(), p.len())
        };

        let mut state = self.state.write();
        if id == state.links.id() || state.packs.contains_key(&id) {
            return Err(RegistryError::PackAlreadyRegistered(id));
        }
        state.packs.insert(id, pack);

        info!(target: "ontopack::registry", pack = %id, entries, "Registered pack");
        Ok(id)
    }

    /// Create an empty pack and register it
    pub fn create_pack(&self) -> RegistryResult<SharedPack> {
        let pack = Pack::new(Arc::clone(&self.table)).into_shared();
        self.register_pack(Arc::clone(&pack))?;
        Ok(pack)
    }

    /// Unregister a pack and hand it back
    ///
    /// # Errors
    ///
    /// - `UnknownPack` if it is not registered
    /// - `PackInUse` while any multi-pack link references one of its entries
    pub fn unregister_pack(&self, id: PackId) -> RegistryResult<SharedPack> {
        let mut state = self.state.write();
        if !state.packs.contains_key(&id) {
            return Err(RegistryError::UnknownPack(id));
        }
        if let Some(links) = state.by_pack.get(&id).filter(|l| !l.is_empty()) {
            return Err(RegistryError::PackInUse {
                pack: id,
                links: links.len(),
            });
        }
        let pack = state
            .packs
            .remove(&id)
            .ok_or(RegistryError::UnknownPack(id))?;

        info!(target: "ontopack::registry", pack = %id, "Unregistered pack");
        Ok(pack)
    }

    /// Registered pack by id
    pub fn pack(&self, id: PackId) -> Option<SharedPack> {
        self.state.read().packs.get(&id).cloned()
    }

    /// Registered pack ids, ascending
    pub fn pack_ids(&self) -> Vec<PackId> {
        self.state.read().packs.keys().copied().collect()
    }

    /// Number of registered packs
    pub fn len(&self) -> usize {
        self.state.read().packs.len()
    }

    /// Whether no pack is registered
    pub fn is_empty(&self) -> bool {
        self.state.read().packs.is_empty()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Snapshot of the entry `entry` in pack `pack`
    ///
    /// Links themselves resolve through `links_pack_id()`.
    ///
    /// # Errors
    ///
    /// `UnknownPack` or `UnknownEntry`.
    pub fn resolve(&self, pack: PackId, entry: EntryId) -> RegistryResult<EntryInstance> {
        self.resolve_ref(EntryRef::new(pack, entry))
    }

    /// Snapshot of the entry a reference names
    pub fn resolve_ref(&self, r: EntryRef) -> RegistryResult<EntryInstance> {
        let state = self.state.read();
        state.resolve(r)
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Create a multi-pack link of `type_name` from `parent` to `child`
    ///
    /// # Errors
    ///
    /// - `UnknownType`, or `RoleMismatch` for a type that is not a
    ///   multi-pack link
    /// - `UnknownPack` / `UnknownEntry` for an endpoint that does not resolve
    /// - `EndpointTypeError` for an endpoint of the wrong type
    pub fn add_link(
        &self,
        type_name: &str,
        parent: EntryRef,
        child: EntryRef,
    ) -> RegistryResult<EntryId> {
        let ty = self
            .table
            .get(type_name)
            .ok_or_else(|| InstanceError::UnknownType(type_name.to_string()))?;
        if ty.role() != StructuralRole::MultiPackLink {
            return Err(InstanceError::RoleMismatch {
                type_name: ty.name().to_string(),
                role: ty.role(),
                reason: "not a multi-pack link".to_string(),
            }
            .into());
        }

        let mut guard = self.state.write();
        let state = &mut *guard;
        let mut packs = PackGuards::lock(&state.packs, [parent.pack, child.pack])?;
        self.check_endpoint(&packs, "parent", parent, ty.parent_type())?;
        self.check_endpoint(&packs, "child", child, ty.child_type())?;

        let id = state.links.insert_multi_pack_link(ty.id(), parent, child);
        let holder = EntryRef::new(state.links.id(), id);
        for r in [parent, child] {
            packs.pin(r, holder)?;
        }
        index_link(
            &mut state.by_pack,
            id,
            &BTreeSet::new(),
            &packs_of(&[parent, child]),
        );

        info!(
            target: "ontopack::registry",
            link = %id,
            type_name,
            parent = %parent,
            child = %child,
            "Added multi-pack link"
        );
        Ok(id)
    }

    fn check_endpoint(
        &self,
        packs: &PackGuards<'_>,
        endpoint: &'static str,
        r: EntryRef,
        expected: Option<TypeId>,
    ) -> RegistryResult<()> {
        let found = packs
            .get(r.pack)
            .and_then(|p| p.entry_type(r.entry))
            .ok_or(RegistryError::UnknownEntry(r))?;
        match expected {
            Some(t) if !self.table.is_subtype(found, t) => Err(InstanceError::EndpointTypeError {
                endpoint,
                expected: self.table.name_of(t).to_string(),
                found: self.table.name_of(found).to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Remove a link and release its pins
    ///
    /// # Errors
    ///
    /// - `UnknownLink` if `link` is not live
    /// - `ReferencedEntry` if another link's attribute references it
    pub fn remove_link(&self, link: EntryId) -> RegistryResult<EntryInstance> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let links_id = state.links.id();

        let foreign = foreign_refs(links_id, state.link(link)?.references());
        let mut packs = PackGuards::lock(&state.packs, foreign.iter().map(|r| r.pack))?;
        let instance = state.links.remove(link)?;

        let holder = EntryRef::new(links_id, link);
        for r in &foreign {
            packs.unpin(*r, holder);
        }
        index_link(&mut state.by_pack, link, &packs_of(&foreign), &BTreeSet::new());

        info!(target: "ontopack::registry", link = %link, "Removed multi-pack link");
        Ok(instance)
    }

    /// Set an attribute on a link; returns the previous value
    ///
    /// Entry references may name entries in any registered pack or other
    /// links; foreign targets are pinned until overwritten or until the link
    /// is removed.
    pub fn set_link_attribute(
        &self,
        link: EntryId,
        name: &str,
        value: impl Into<Value>,
    ) -> RegistryResult<Value> {
        let value = value.into();
        let mut guard = self.state.write();
        let state = &mut *guard;
        let links_id = state.links.id();
        let accessor = AttributeAccessor::new(&self.table);

        let instance = state.link(link)?;
        let (slot, _) = accessor.lookup(instance, name)?;
        let before = foreign_refs(links_id, instance.references());
        let old_refs = foreign_refs(links_id, instance.values()[slot].entry_refs());
        let new_refs = foreign_refs(links_id, value.entry_refs());

        let mut packs = PackGuards::lock(
            &state.packs,
            old_refs.iter().chain(&new_refs).map(|r| r.pack),
        )?;
        let slot = {
            let resolver = RegistryResolver {
                links: &state.links,
                packs: &packs,
            };
            accessor.check(instance, name, &value, &resolver)?
        };

        let old = state.links.write_slot(link, slot, value)?;
        let holder = EntryRef::new(links_id, link);
        for r in &old_refs {
            packs.unpin(*r, holder);
        }
        for r in &new_refs {
            packs.pin(*r, holder)?;
        }
        let after = foreign_refs(links_id, state.link(link)?.references());
        index_link(&mut state.by_pack, link, &packs_of(&before), &packs_of(&after));

        debug!(target: "ontopack::registry", link = %link, attribute = name, "Set link attribute");
        Ok(old)
    }

    /// Snapshot of a link
    pub fn get_link(&self, link: EntryId) -> RegistryResult<EntryInstance> {
        self.state.read().link(link).cloned()
    }

    /// Current value of a link attribute
    pub fn get_link_attribute(&self, link: EntryId, name: &str) -> RegistryResult<Value> {
        let state = self.state.read();
        let value = AttributeAccessor::new(&self.table).get(state.link(link)?, name)?;
        Ok(value.clone())
    }

    /// Parent and child of a link
    pub fn link_endpoints(&self, link: EntryId) -> RegistryResult<(EntryRef, EntryRef)> {
        let state = self.state.read();
        state
            .link(link)?
            .multi_pack_endpoints()
            .ok_or(RegistryError::UnknownLink(link))
    }

    /// Snapshots of a link's parent and child
    pub fn resolve_link(&self, link: EntryId) -> RegistryResult<(EntryInstance, EntryInstance)> {
        let state = self.state.read();
        let (parent, child) = state
            .link(link)?
            .multi_pack_endpoints()
            .ok_or(RegistryError::UnknownLink(link))?;
        Ok((state.resolve(parent)?, state.resolve(child)?))
    }

    /// Links referencing any entry of `pack`, in id order
    pub fn links_for(&self, pack: PackId) -> Vec<EntryId> {
        self.state
            .read()
            .by_pack
            .get(&pack)
            .map(|l| l.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live links
    pub fn link_count(&self) -> usize {
        self.state.read().links.len()
    }

    /// Run `f` against the link pack, e.g. to query links by type
    pub fn with_links<R>(&self, f: impl FnOnce(&Pack) -> R) -> R {
        f(&self.state.read().links)
    }
}

impl RegistryState {
    fn link(&self, link: EntryId) -> RegistryResult<&EntryInstance> {
        self.links
            .get(link)
            .map_err(|_| RegistryError::UnknownLink(link))
    }

    fn resolve(&self, r: EntryRef) -> RegistryResult<EntryInstance> {
        if r.is_in(self.links.id()) {
            return self
                .links
                .get(r.entry)
                .cloned()
                .map_err(|_| RegistryError::UnknownEntry(r));
        }
        let pack = self
            .packs
            .get(&r.pack)
            .ok_or(RegistryError::UnknownPack(r.pack))?;
        let pack = pack.read();
        pack.get(r.entry)
            .cloned()
            .map_err(|_| RegistryError::UnknownEntry(r))
    }
}

fn foreign_refs(links: PackId, refs: Vec<EntryRef>) -> Vec<EntryRef> {
    refs.into_iter().filter(|r| !r.is_in(links)).collect()
}

fn packs_of(refs: &[EntryRef]) -> BTreeSet<PackId> {
    refs.iter().map(|r| r.pack).collect()
}

fn index_link(
    by_pack: &mut FxHashMap<PackId, BTreeSet<EntryId>>,
    link: EntryId,
    before: &BTreeSet<PackId>,
    after: &BTreeSet<PackId>,
) {
    for pack in before.difference(after) {
        if let Some(links) = by_pack.get_mut(pack) {
            links.remove(&link);
            if links.is_empty() {
                by_pack.remove(pack);
            }
        }
    }
    for pack in after {
        by_pack.entry(*pack).or_default().insert(link);
    }
}

// ============================================================================
// Lock helpers
// ============================================================================

/// Write guards over a set of packs, taken in ascending id order
struct PackGuards<'a> {
    guards: Vec<(PackId, RwLockWriteGuard<'a, Pack>)>,
}

impl<'a> PackGuards<'a> {
    fn lock(
        packs: &'a BTreeMap<PackId, SharedPack>,
        ids: impl IntoIterator<Item = PackId>,
    ) -> RegistryResult<Self> {
        let ids: BTreeSet<PackId> = ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let pack = packs.get(&id).ok_or(RegistryError::UnknownPack(id))?;
            guards.push((id, pack.write()));
        }
        Ok(Self { guards })
    }

    fn position(&self, id: PackId) -> Option<usize> {
        self.guards.binary_search_by_key(&id, |(p, _)| *p).ok()
    }

    fn get(&self, id: PackId) -> Option<&Pack> {
        self.position(id).map(|i| &*self.guards[i].1)
    }

    fn pin(&mut self, r: EntryRef, holder: EntryRef) -> RegistryResult<()> {
        let i = self.position(r.pack).ok_or(RegistryError::UnknownPack(r.pack))?;
        self.guards[i]
            .1
            .pin(r.entry, holder)
            .map_err(|_| RegistryError::UnknownEntry(r))
    }

    fn unpin(&mut self, r: EntryRef, holder: EntryRef) {
        if let Some(i) = self.position(r.pack) {
            self.guards[i].1.unpin(r.entry, holder);
        }
    }
}

/// Resolves references into the link pack and the locked packs
struct RegistryResolver<'r, 'g> {
    links: &'r Pack,
    packs: &'r PackGuards<'g>,
}

impl EntryResolver for RegistryResolver<'_, '_> {
    fn resolve_type(&self, entry: EntryRef) -> InstanceResult<TypeId> {
        if entry.is_in(self.links.id()) {
            return self.links.resolve_type(entry);
        }
        self.packs
            .get(entry.pack)
            .ok_or(InstanceError::CrossPackReference(entry))?
            .entry_type(entry.entry)
            .ok_or(InstanceError::EntryNotFound(entry.entry))
    }
}
