//! Pack store
//!
//! A pack owns the entries of one document or stream together with its
//! media buffers. It is a single-writer structure: wrap it in a
//! `SharedPack` to share it between threads or hand it to the
//! `MultiPackRegistry`.
//!
//! ## Invariants
//!
//! - Ids come from a monotonic counter and are never reused, even after
//!   removal
//! - Every live annotation span lies inside its buffer (and on character
//!   boundaries for text)
//! - Link endpoints and group members are live entries of this pack whose
//!   types conform to the declared constraints
//! - A failed operation leaves the pack unchanged: every check runs before
//!   the first write
//!
//! ## Removal
//!
//! Removal is strict. `remove` fails with `ReferencedEntry` while any other
//! entry holds a reference to the target, whether through a link endpoint,
//! a group membership, an entry-reference attribute, or a multi-pack link
//! pinned by the registry. Removing a holder releases its references.

use crate::accessor::{AttributeAccessor, AttributeValue, EntryResolver};
use crate::entry::{EntryFields, EntryInstance, RoleData};
use crate::index::{SpanIndex, TypeIndex};
use crate::media::{check_span_in, AudioBuffer, Media, MediaBuffers};
use crate::query::{EntryQuery, Plan};
use crate::refs::ReferenceTracker;
use ontopack_core::{
    EntryId, EntryRef, InstanceError, InstanceResult, Modality, PackId, Span, StructuralRole,
    Value,
};
use ontopack_schema::{ResolvedType, TypeId, TypeTable};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// A pack shared between threads and with the registry
pub type SharedPack = Arc<RwLock<Pack>>;

/// Entry store for one document or stream
#[derive(Debug)]
pub struct Pack {
    id: PackId,
    table: Arc<TypeTable>,
    next_id: u64,
    entries: BTreeMap<EntryId, EntryInstance>,
    types: TypeIndex,
    text_spans: SpanIndex,
    audio_spans: SpanIndex,
    refs: ReferenceTracker,
    media: MediaBuffers,
}

impl Pack {
    /// Empty pack with a fresh id
    pub fn new(table: Arc<TypeTable>) -> Self {
        Self::with_id(PackId::new(), table)
    }

    /// Empty pack with an explicit id
    pub fn with_id(id: PackId, table: Arc<TypeTable>) -> Self {
        Self {
            id,
            table,
            next_id: 0,
            entries: BTreeMap::new(),
            types: TypeIndex::new(),
            text_spans: SpanIndex::new(),
            audio_spans: SpanIndex::new(),
            refs: ReferenceTracker::new(),
            media: MediaBuffers::default(),
        }
    }

    /// Wrap for sharing
    pub fn into_shared(self) -> SharedPack {
        Arc::new(RwLock::new(self))
    }

    /// Pack id
    pub fn id(&self) -> PackId {
        self.id
    }

    /// Type table this pack instantiates
    pub fn table(&self) -> &Arc<TypeTable> {
        &self.table
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pack holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is live
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Live entries in id order
    pub fn iter(&self) -> impl Iterator<Item = &EntryInstance> {
        self.entries.values()
    }

    /// Exact type of a live entry
    pub fn entry_type(&self, id: EntryId) -> Option<TypeId> {
        self.entries.get(&id).map(EntryInstance::type_id)
    }

    // ========================================================================
    // Media
    // ========================================================================

    /// Text buffer, if loaded
    pub fn text(&self) -> Option<&str> {
        self.media.text()
    }

    /// Audio buffer, if loaded
    pub fn audio(&self) -> Option<&AudioBuffer> {
        self.media.audio()
    }

    /// Load or replace the text buffer
    ///
    /// # Errors
    ///
    /// `InvalidSpan` if a live text annotation would not fit the new buffer.
    pub fn set_text(&mut self, text: impl Into<String>) -> InstanceResult<()> {
        let text: Arc<str> = Arc::from(text.into());
        for e in self.text_spans.all() {
            check_span_in(e.span, Modality::Text, text.len(), Some(&*text))?;
        }
        debug!(target: "ontopack::pack", pack = %self.id, bytes = text.len(), "Set text buffer");
        self.media.set_text(text);
        self.refresh_payloads(Modality::Text);
        Ok(())
    }

    /// Load or replace the audio buffer
    ///
    /// # Errors
    ///
    /// `InvalidSpan` if a live audio annotation would not fit the new buffer.
    pub fn set_audio(&mut self, samples: Vec<f32>, sample_rate: u32) -> InstanceResult<()> {
        let audio = Arc::new(AudioBuffer::new(samples, sample_rate));
        for e in self.audio_spans.all() {
            check_span_in(e.span, Modality::Audio, audio.len(), None)?;
        }
        debug!(
            target: "ontopack::pack",
            pack = %self.id,
            samples = audio.len(),
            sample_rate,
            "Set audio buffer"
        );
        self.media.set_audio(audio);
        self.refresh_payloads(Modality::Audio);
        Ok(())
    }

    /// Point payloads of `modality` at the current buffer
    fn refresh_payloads(&mut self, modality: Modality) {
        let Some(handle) = self.media.handle(modality) else {
            return;
        };
        let root = self.table.root(StructuralRole::Payload);
        for t in self.table.resolved(root).descendants() {
            let Some(ids) = self.types.get(*t) else {
                continue;
            };
            for id in ids {
                if let Some(RoleData::Payload { media }) =
                    self.entries.get_mut(id).map(|e| &mut e.role)
                {
                    if media.modality() == modality {
                        *media = handle.clone();
                    }
                }
            }
        }
    }

    /// Text covered by a text annotation
    pub fn span_text(&self, id: EntryId) -> InstanceResult<&str> {
        let entry = self.get(id)?;
        match entry.role {
            RoleData::Span {
                span,
                modality: Modality::Text,
            } => {
                let text = self.media.text().unwrap_or("");
                text.get(span.begin..span.end)
                    .ok_or(InstanceError::InvalidSpan {
                        span,
                        modality: Modality::Text,
                        buffer_len: text.len(),
                    })
            }
            _ => Err(self.role_mismatch(entry, "not a text annotation")),
        }
    }

    /// Samples covered by an audio annotation
    pub fn span_samples(&self, id: EntryId) -> InstanceResult<&[f32]> {
        let entry = self.get(id)?;
        match entry.role {
            RoleData::Span {
                span,
                modality: Modality::Audio,
            } => {
                let samples = self.media.audio().map_or(&[][..], AudioBuffer::samples);
                samples
                    .get(span.begin..span.end)
                    .ok_or(InstanceError::InvalidSpan {
                        span,
                        modality: Modality::Audio,
                        buffer_len: samples.len(),
                    })
            }
            _ => Err(self.role_mismatch(entry, "not an audio annotation")),
        }
    }

    /// Media handle held by a payload entry
    pub fn payload(&self, id: EntryId) -> InstanceResult<&Media> {
        let entry = self.get(id)?;
        entry
            .payload()
            .ok_or_else(|| self.role_mismatch(entry, "not a payload"))
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// Create an entry of `type_name`
    ///
    /// Attributes start at their declared defaults: unset (`Null`) for
    /// scalars and references, empty for containers.
    ///
    /// # Errors
    ///
    /// - `UnknownType` if the table has no such type
    /// - `RoleMismatch` if `fields` do not fit the type's role
    /// - `InvalidSpan` for spans outside the buffer
    /// - `EntryNotFound`, `EndpointTypeError`, `MemberTypeError` for bad
    ///   link endpoints or group members
    /// - `MissingMedia` for a payload without a buffer
    pub fn add(&mut self, type_name: &str, fields: EntryFields) -> InstanceResult<EntryId> {
        let table = Arc::clone(&self.table);
        let ty = table
            .get(type_name)
            .ok_or_else(|| InstanceError::UnknownType(type_name.to_string()))?;
        let role = self.build_role(ty, fields)?;

        let id = EntryId::new(self.next_id);
        self.next_id += 1;

        let instance = EntryInstance {
            id,
            pack: self.id,
            type_id: ty.id(),
            type_name: ty.name().to_string(),
            values: ty.attributes().iter().map(|a| a.default.clone()).collect(),
            role,
        };
        self.index_entry(&instance);
        self.entries.insert(id, instance);

        debug!(target: "ontopack::pack", pack = %self.id, entry = %id, type_name, "Added entry");
        Ok(id)
    }

    fn build_role(&self, ty: &ResolvedType, fields: EntryFields) -> InstanceResult<RoleData> {
        match (ty.role(), fields) {
            (StructuralRole::Annotation, EntryFields::Span(span)) => {
                self.media.check_span(span, Modality::Text)?;
                Ok(RoleData::Span {
                    span,
                    modality: Modality::Text,
                })
            }
            (StructuralRole::AudioAnnotation, EntryFields::Span(span)) => {
                self.media.check_span(span, Modality::Audio)?;
                Ok(RoleData::Span {
                    span,
                    modality: Modality::Audio,
                })
            }
            (StructuralRole::Link, EntryFields::Link { parent, child }) => {
                self.check_endpoint("parent", parent, ty.parent_type())?;
                self.check_endpoint("child", child, ty.child_type())?;
                Ok(RoleData::Link { parent, child })
            }
            (StructuralRole::Group, EntryFields::Group(members)) => {
                let mut set = BTreeSet::new();
                for member in members {
                    self.check_member(member, ty.member_type())?;
                    set.insert(member);
                }
                Ok(RoleData::Group { members: set })
            }
            (StructuralRole::Group, EntryFields::None) => Ok(RoleData::Group {
                members: BTreeSet::new(),
            }),
            (StructuralRole::Payload, EntryFields::Payload(modality)) => self
                .media
                .handle(modality)
                .map(|media| RoleData::Payload { media })
                .ok_or(InstanceError::MissingMedia(modality)),
            (StructuralRole::Generic, EntryFields::None) => Ok(RoleData::Generic),
            (StructuralRole::MultiPackLink, _) => Err(InstanceError::RoleMismatch {
                type_name: ty.name().to_string(),
                role: ty.role(),
                reason: "multi-pack links are created through the registry".to_string(),
            }),
            (role, fields) => Err(InstanceError::RoleMismatch {
                type_name: ty.name().to_string(),
                role,
                reason: format!("cannot be created from {}", fields.kind_name()),
            }),
        }
    }

    fn check_endpoint(
        &self,
        endpoint: &'static str,
        id: EntryId,
        expected: Option<TypeId>,
    ) -> InstanceResult<()> {
        let entry = self.get(id)?;
        match expected {
            Some(t) if !self.table.is_subtype(entry.type_id, t) => {
                Err(InstanceError::EndpointTypeError {
                    endpoint,
                    expected: self.table.name_of(t).to_string(),
                    found: entry.type_name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn check_member(&self, id: EntryId, expected: Option<TypeId>) -> InstanceResult<()> {
        let entry = self.get(id)?;
        match expected {
            Some(t) if !self.table.is_subtype(entry.type_id, t) => {
                Err(InstanceError::MemberTypeError {
                    member: id,
                    expected: self.table.name_of(t).to_string(),
                    found: entry.type_name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn role_mismatch(&self, entry: &EntryInstance, reason: &str) -> InstanceError {
        InstanceError::RoleMismatch {
            type_name: entry.type_name.clone(),
            role: entry.role(),
            reason: reason.to_string(),
        }
    }

    fn index_entry(&mut self, instance: &EntryInstance) {
        self.types.insert(instance.type_id, instance.id);
        match instance.role {
            RoleData::Span {
                span,
                modality: Modality::Text,
            } => self.text_spans.insert(span, instance.id, instance.type_id),
            RoleData::Span {
                span,
                modality: Modality::Audio,
            } => self.audio_spans.insert(span, instance.id, instance.type_id),
            _ => {}
        }
        let holder = instance.entry_ref();
        for r in instance.references() {
            if r.is_in(self.id) {
                self.refs.add(r.entry, holder);
            }
        }
    }

    fn unindex_entry(&mut self, instance: &EntryInstance) {
        self.types.remove(instance.type_id, instance.id);
        match instance.role {
            RoleData::Span {
                span,
                modality: Modality::Text,
            } => {
                self.text_spans.remove(span, instance.id);
            }
            RoleData::Span {
                span,
                modality: Modality::Audio,
            } => {
                self.audio_spans.remove(span, instance.id);
            }
            _ => {}
        }
        let holder = instance.entry_ref();
        for r in instance.references() {
            if r.is_in(self.id) {
                self.refs.release(r.entry, holder);
            }
        }
        self.refs.forget(instance.id);
    }

    /// Look up a live entry
    pub fn get(&self, id: EntryId) -> InstanceResult<&EntryInstance> {
        self.entries.get(&id).ok_or(InstanceError::EntryNotFound(id))
    }

    /// Entries holding a reference to `id`, itself excluded
    pub fn holders(&self, id: EntryId) -> Vec<EntryRef> {
        let me = EntryRef::new(self.id, id);
        self.refs
            .holders(id)
            .into_iter()
            .filter(|h| *h != me)
            .collect()
    }

    /// Remove an entry and return it
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if `id` is not live
    /// - `ReferencedEntry` while other entries hold references to it
    pub fn remove(&mut self, id: EntryId) -> InstanceResult<EntryInstance> {
        if !self.contains(id) {
            return Err(InstanceError::EntryNotFound(id));
        }
        if self.refs.is_held_by_others(EntryRef::new(self.id, id)) {
            return Err(InstanceError::ReferencedEntry {
                entry: id,
                held_by: self.holders(id),
            });
        }
        let instance = self
            .entries
            .remove(&id)
            .ok_or(InstanceError::EntryNotFound(id))?;
        self.unindex_entry(&instance);

        debug!(
            target: "ontopack::pack",
            pack = %self.id,
            entry = %id,
            type_name = %instance.type_name,
            "Removed entry"
        );
        Ok(instance)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Current value of an attribute
    pub fn get_attribute(&self, id: EntryId, name: &str) -> InstanceResult<&Value> {
        AttributeAccessor::new(&self.table).get(self.get(id)?, name)
    }

    /// Set an attribute; returns the previous value
    ///
    /// Entry references must name live entries of this pack.
    pub fn set_attribute(
        &mut self,
        id: EntryId,
        name: &str,
        value: impl Into<Value>,
    ) -> InstanceResult<Value> {
        let value = value.into();
        let pack: &Pack = self;
        let slot = AttributeAccessor::new(&pack.table).check(pack.get(id)?, name, &value, pack)?;
        self.write_slot(id, slot, value)
    }

    /// Write a checked value into `slot`, keeping local reference counts
    pub(crate) fn write_slot(
        &mut self,
        id: EntryId,
        slot: usize,
        value: Value,
    ) -> InstanceResult<Value> {
        let holder = EntryRef::new(self.id, id);
        let new_refs = value.entry_refs();
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(InstanceError::EntryNotFound(id))?;
        let old = std::mem::replace(&mut entry.values[slot], value);

        for r in old.entry_refs() {
            if r.is_in(self.id) {
                self.refs.release(r.entry, holder);
            }
        }
        for r in new_refs {
            if r.is_in(self.id) {
                self.refs.add(r.entry, holder);
            }
        }

        debug!(target: "ontopack::pack", pack = %self.id, entry = %id, slot, "Set attribute");
        Ok(old)
    }

    /// Read an attribute as a Rust type
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the stored value has another kind; read nullable
    /// attributes as `Option<T>`.
    pub fn get_as<T: AttributeValue>(&self, id: EntryId, name: &str) -> InstanceResult<T> {
        let value = self.get_attribute(id, name)?;
        T::from_value(value).ok_or_else(|| InstanceError::TypeMismatch {
            attribute: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
            found: value.type_name().to_string(),
        })
    }

    /// Write an attribute from a Rust type
    pub fn set_as<T: AttributeValue>(
        &mut self,
        id: EntryId,
        name: &str,
        value: T,
    ) -> InstanceResult<()> {
        self.set_attribute(id, name, value.into_value()).map(|_| ())
    }

    // ========================================================================
    // Groups
    // ========================================================================

    fn group_constraint(&self, group: EntryId) -> InstanceResult<Option<TypeId>> {
        let entry = self.get(group)?;
        if entry.members().is_none() {
            return Err(self.role_mismatch(entry, "not a group"));
        }
        Ok(self.table.resolved(entry.type_id).member_type())
    }

    /// Add a member; returns false if it was already a member
    pub fn add_member(&mut self, group: EntryId, member: EntryId) -> InstanceResult<bool> {
        let expected = self.group_constraint(group)?;
        self.check_member(member, expected)?;

        let inserted = match self.entries.get_mut(&group).map(|e| &mut e.role) {
            Some(RoleData::Group { members }) => members.insert(member),
            _ => false,
        };
        if inserted {
            self.refs.add(member, EntryRef::new(self.id, group));
            debug!(target: "ontopack::pack", pack = %self.id, group = %group, member = %member, "Added member");
        }
        Ok(inserted)
    }

    /// Remove a member; returns false if it was not a member
    pub fn remove_member(&mut self, group: EntryId, member: EntryId) -> InstanceResult<bool> {
        self.group_constraint(group)?;

        let removed = match self.entries.get_mut(&group).map(|e| &mut e.role) {
            Some(RoleData::Group { members }) => members.remove(&member),
            _ => false,
        };
        if removed {
            self.refs.release(member, EntryRef::new(self.id, group));
        }
        Ok(removed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Entries of `type_name` or any subtype
    ///
    /// With a range, only entries whose span intersects `[start, end)` are
    /// returned, ordered by `(begin, end, id)`; entries without a span never
    /// match a ranged query. An empty range `start..start` is a point query:
    /// it matches spans covering `start` and empty spans at `start`, never a
    /// span that ends at `start`.
    ///
    /// # Errors
    ///
    /// `UnknownType` for an unknown type, `InvalidSpan` for an inverted range.
    pub fn query(
        &self,
        type_name: &str,
        range: Option<Range<usize>>,
    ) -> InstanceResult<EntryQuery<'_>> {
        let ty = self
            .table
            .get(type_name)
            .ok_or_else(|| InstanceError::UnknownType(type_name.to_string()))?;
        let modality = ty.role().modality();

        let range = match range {
            Some(r) if r.start > r.end => {
                let modality = modality.unwrap_or(Modality::Text);
                return Err(InstanceError::InvalidSpan {
                    span: Span::new(r.start, r.end),
                    modality,
                    buffer_len: self.media.len(modality),
                });
            }
            Some(r) => Some(Span::query_bounds(r.start, r.end)),
            None => None,
        };

        let plan = match (modality, range) {
            (Some(modality), range) => Plan::Spans { modality, range },
            (None, Some(_)) => Plan::Empty,
            (None, None) => Plan::ByType,
        };
        Ok(EntryQuery::new(self, ty.descendants(), plan))
    }

    /// Entries of `type_name` whose span intersects the span of `within`
    pub fn query_within(
        &self,
        type_name: &str,
        within: EntryId,
    ) -> InstanceResult<EntryQuery<'_>> {
        let entry = self.get(within)?;
        let span = entry
            .span()
            .ok_or_else(|| self.role_mismatch(entry, "has no span to query within"))?;
        self.query(type_name, Some(span.begin..span.end))
    }

    pub(crate) fn span_index(&self, modality: Modality) -> &SpanIndex {
        match modality {
            Modality::Text => &self.text_spans,
            Modality::Audio => &self.audio_spans,
        }
    }

    pub(crate) fn type_index(&self) -> &TypeIndex {
        &self.types
    }

    // ========================================================================
    // Registry hooks
    // ========================================================================

    /// Record a reference held from outside this pack
    pub(crate) fn pin(&mut self, entry: EntryId, holder: EntryRef) -> InstanceResult<()> {
        if !self.contains(entry) {
            return Err(InstanceError::EntryNotFound(entry));
        }
        self.refs.add(entry, holder);
        Ok(())
    }

    /// Drop a reference recorded by `pin`
    pub(crate) fn unpin(&mut self, entry: EntryId, holder: EntryRef) {
        self.refs.release(entry, holder);
    }

    /// Store an already validated multi-pack link
    pub(crate) fn insert_multi_pack_link(
        &mut self,
        type_id: TypeId,
        parent: EntryRef,
        child: EntryRef,
    ) -> EntryId {
        let ty = self.table.resolved(type_id);
        let id = EntryId::new(self.next_id);
        self.next_id += 1;

        let instance = EntryInstance {
            id,
            pack: self.id,
            type_id,
            type_name: ty.name().to_string(),
            values: ty.attributes().iter().map(|a| a.default.clone()).collect(),
            role: RoleData::MultiPackLink { parent, child },
        };
        self.index_entry(&instance);
        self.entries.insert(id, instance);
        id
    }
}

impl EntryResolver for Pack {
    fn resolve_type(&self, entry: EntryRef) -> InstanceResult<TypeId> {
        if !entry.is_in(self.id) {
            return Err(InstanceError::CrossPackReference(entry));
        }
        self.entry_type(entry.entry)
            .ok_or(InstanceError::EntryNotFound(entry.entry))
    }
}
