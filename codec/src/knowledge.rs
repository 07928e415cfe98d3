//! Per-connection dictionaries of strings, paths and objects.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use schema::{ObjectRef, TypeInfo, TypeRegistry, WeakObjectRef};
use tracing::trace;
use wire::{Limits as WireLimits, STRING_UPDATE_HEADER_SIZE};

use crate::error::{CodecError, CodecResult, DictionaryTable, LimitKind};
use crate::limits::CodecLimits;
use crate::mapping::{DataModelMapper, DataModelResolver, MappedId};

/// A dictionary entry the peer has not been told about yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryUpdate {
    String { id: MappedId, text: String },
    Path {
        id: MappedId,
        text_id: MappedId,
        parent_id: MappedId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PathEntry {
    text_id: MappedId,
    parent_id: MappedId,
}

/// One direction of a connection's shared vocabulary.
///
/// The sending side allocates ids through [`DataModelMapper`] and queues a
/// [`DictionaryUpdate`] for each new string or path. The receiving side
/// mirrors those tables through [`apply_string_update`](Self::apply_string_update)
/// and [`apply_path_update`](Self::apply_path_update). Ids are never reused.
#[derive(Debug)]
pub struct KnowledgeBase {
    strings: HashMap<MappedId, String>,
    string_ids: HashMap<String, MappedId>,
    paths: HashMap<MappedId, PathEntry>,
    path_ids: HashMap<PathEntry, MappedId>,
    objects: HashMap<MappedId, WeakObjectRef>,
    object_ids: HashMap<usize, MappedId>,
    next_string: MappedId,
    next_path: MappedId,
    next_object: MappedId,
    pending: Vec<DictionaryUpdate>,
    max_entries: usize,
    max_path_depth: usize,
    max_string_bytes: usize,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(&CodecLimits::default())
    }
}

impl KnowledgeBase {
    #[must_use]
    pub fn new(limits: &CodecLimits) -> Self {
        Self {
            strings: HashMap::new(),
            string_ids: HashMap::new(),
            paths: HashMap::new(),
            path_ids: HashMap::new(),
            objects: HashMap::new(),
            object_ids: HashMap::new(),
            next_string: 1,
            next_path: 1,
            next_object: 1,
            pending: Vec::new(),
            max_entries: limits.max_dictionary_entries,
            max_path_depth: limits.max_path_depth,
            max_string_bytes: announceable_bytes(&WireLimits::default()),
        }
    }

    /// Refuses new strings that would not fit a string update under `limits`.
    ///
    /// Strings already in the table are unaffected.
    pub fn set_string_update_limits(&mut self, limits: &WireLimits) {
        self.max_string_bytes = announceable_bytes(limits);
    }

    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if new entries are waiting to be announced.
    #[must_use]
    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Takes the queued updates in allocation order.
    pub fn drain_updates(&mut self) -> Vec<DictionaryUpdate> {
        std::mem::take(&mut self.pending)
    }

    /// Puts updates that could not be announced back in front of the queue.
    pub fn requeue_updates(&mut self, mut updates: Vec<DictionaryUpdate>) {
        updates.append(&mut self.pending);
        self.pending = updates;
    }

    /// Records a string announced by the peer.
    ///
    /// Returns `false` if the identical entry was already known.
    pub fn apply_string_update(&mut self, id: MappedId, text: &str) -> CodecResult<bool> {
        let table = DictionaryTable::String;
        if id == 0 {
            return Err(CodecError::ReservedId { table });
        }
        if let Some(known) = self.strings.get(&id) {
            return if known == text {
                Ok(false)
            } else {
                Err(CodecError::DictionaryConflict { table, id })
            };
        }
        self.check_capacity(table, self.strings.len())?;

        trace!(id, text, "string announced");
        self.strings.insert(id, text.to_owned());
        self.string_ids.entry(text.to_owned()).or_insert(id);
        self.next_string = self.next_string.max(id.saturating_add(1));
        Ok(true)
    }

    /// Records a path segment announced by the peer.
    ///
    /// The segment text must already be known, and so must the parent unless it is zero.
    /// Returns `false` if the identical entry was already known.
    pub fn apply_path_update(
        &mut self,
        id: MappedId,
        text_id: MappedId,
        parent_id: MappedId,
    ) -> CodecResult<bool> {
        let table = DictionaryTable::Path;
        if id == 0 {
            return Err(CodecError::ReservedId { table });
        }
        if text_id == 0 || !self.strings.contains_key(&text_id) {
            return Err(CodecError::UnknownString { id: text_id });
        }
        if parent_id != 0 && !self.paths.contains_key(&parent_id) {
            return Err(CodecError::UnknownPath { id: parent_id });
        }
        let entry = PathEntry { text_id, parent_id };
        if let Some(known) = self.paths.get(&id) {
            return if *known == entry {
                Ok(false)
            } else {
                Err(CodecError::DictionaryConflict { table, id })
            };
        }
        self.check_capacity(table, self.paths.len())?;

        trace!(id, text_id, parent_id, "path announced");
        self.paths.insert(id, entry);
        self.path_ids.entry(entry).or_insert(id);
        self.next_path = self.next_path.max(id.saturating_add(1));
        Ok(true)
    }

    /// Binds `id` to an object known to both peers.
    pub fn attach_object(&mut self, id: MappedId, object: &ObjectRef) -> CodecResult<()> {
        let table = DictionaryTable::Object;
        let Some(identity) = object.identity() else {
            return Err(CodecError::ReservedId { table });
        };
        if id == 0 {
            return Err(CodecError::ReservedId { table });
        }
        if let Some(previous) = self.objects.insert(id, object.downgrade()) {
            if let Some(old) = previous.identity() {
                self.object_ids.remove(&old);
            }
        }
        self.object_ids.insert(identity, id);
        self.next_object = self.next_object.max(id.saturating_add(1));
        Ok(())
    }

    /// Unbinds an object id. Returns `false` if it was not bound.
    pub fn detach_object(&mut self, id: MappedId) -> bool {
        match self.objects.remove(&id) {
            Some(weak) => {
                if let Some(identity) = weak.identity() {
                    if self.object_ids.get(&identity) == Some(&id) {
                        self.object_ids.remove(&identity);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Resolver view that also knows the local types.
    #[must_use]
    pub const fn resolver<'a>(&'a self, types: &'a TypeRegistry) -> KnowledgeResolver<'a> {
        KnowledgeResolver {
            knowledge: self,
            types,
        }
    }

    fn check_capacity(&self, table: DictionaryTable, len: usize) -> CodecResult<()> {
        if len >= self.max_entries {
            return Err(CodecError::DictionaryFull {
                table,
                limit: self.max_entries,
            });
        }
        Ok(())
    }

    fn allocate(&self, table: DictionaryTable, next: MappedId, len: usize) -> CodecResult<MappedId> {
        self.check_capacity(table, len)?;
        if next == MappedId::MAX {
            return Err(CodecError::DictionaryFull {
                table,
                limit: self.max_entries,
            });
        }
        Ok(next)
    }

    fn lookup_string(&self, id: MappedId) -> CodecResult<&str> {
        if id == 0 {
            return Ok("");
        }
        self.strings
            .get(&id)
            .map(String::as_str)
            .ok_or(CodecError::UnknownString { id })
    }
}

fn announceable_bytes(limits: &WireLimits) -> usize {
    limits
        .max_string_update_bytes
        .min(limits.max_frame_bytes.saturating_sub(STRING_UPDATE_HEADER_SIZE))
}

impl DataModelMapper for KnowledgeBase {
    fn map_string(&mut self, text: &str) -> CodecResult<MappedId> {
        if text.is_empty() {
            return Ok(0);
        }
        if let Some(&id) = self.string_ids.get(text) {
            return Ok(id);
        }
        if text.len() > self.max_string_bytes {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::StringLength,
                limit: self.max_string_bytes,
                actual: text.len(),
            });
        }
        let id = self.allocate(DictionaryTable::String, self.next_string, self.strings.len())?;
        self.next_string = id + 1;
        self.strings.insert(id, text.to_owned());
        self.string_ids.insert(text.to_owned(), id);
        self.pending.push(DictionaryUpdate::String {
            id,
            text: text.to_owned(),
        });
        trace!(id, text, "string allocated");
        Ok(id)
    }

    fn map_path(&mut self, path: &str, separator: &str) -> CodecResult<MappedId> {
        let segments: Vec<&str> = path
            .split(separator)
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.len() > self.max_path_depth {
            return Err(CodecError::LimitsExceeded {
                kind: LimitKind::PathDepth,
                limit: self.max_path_depth,
                actual: segments.len(),
            });
        }

        let mut parent_id = 0;
        for segment in segments {
            let text_id = self.map_string(segment)?;
            let entry = PathEntry { text_id, parent_id };
            parent_id = match self.path_ids.entry(entry) {
                Entry::Occupied(known) => *known.get(),
                Entry::Vacant(slot) => {
                    if self.paths.len() >= self.max_entries || self.next_path == MappedId::MAX {
                        return Err(CodecError::DictionaryFull {
                            table: DictionaryTable::Path,
                            limit: self.max_entries,
                        });
                    }
                    let id = self.next_path;
                    self.next_path += 1;
                    slot.insert(id);
                    self.paths.insert(id, entry);
                    self.pending.push(DictionaryUpdate::Path {
                        id,
                        text_id,
                        parent_id,
                    });
                    trace!(id, text_id, parent_id, "path allocated");
                    id
                }
            };
        }
        Ok(parent_id)
    }

    fn map_object(&mut self, object: &ObjectRef) -> CodecResult<MappedId> {
        let Some(identity) = object.identity() else {
            return Ok(0);
        };
        if let Some(&id) = self.object_ids.get(&identity) {
            let alive = self
                .objects
                .get(&id)
                .is_some_and(|weak| weak.identity() == Some(identity));
            if alive {
                return Ok(id);
            }
        }
        let id = self.allocate(DictionaryTable::Object, self.next_object, self.objects.len())?;
        self.next_object = id + 1;
        self.objects.insert(id, object.downgrade());
        self.object_ids.insert(identity, id);
        Ok(id)
    }
}

/// [`DataModelResolver`] over a [`KnowledgeBase`] and a [`TypeRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeResolver<'a> {
    knowledge: &'a KnowledgeBase,
    types: &'a TypeRegistry,
}

impl DataModelResolver for KnowledgeResolver<'_> {
    fn resolve_string(&self, id: MappedId) -> CodecResult<&str> {
        self.knowledge.lookup_string(id)
    }

    fn resolve_path(&self, id: MappedId, separator: &str) -> CodecResult<String> {
        let knowledge = self.knowledge;
        let mut segments = Vec::new();
        let mut current = id;
        while current != 0 {
            if segments.len() >= knowledge.max_path_depth {
                return Err(CodecError::LimitsExceeded {
                    kind: LimitKind::PathDepth,
                    limit: knowledge.max_path_depth,
                    actual: segments.len() + 1,
                });
            }
            let entry = knowledge
                .paths
                .get(&current)
                .ok_or(CodecError::UnknownPath { id: current })?;
            segments.push(knowledge.lookup_string(entry.text_id)?);
            current = entry.parent_id;
        }
        segments.reverse();
        Ok(segments.join(separator))
    }

    fn resolve_object(&self, id: MappedId) -> CodecResult<ObjectRef> {
        if id == 0 {
            return Ok(ObjectRef::null());
        }
        let object = self
            .knowledge
            .objects
            .get(&id)
            .map(WeakObjectRef::upgrade)
            .unwrap_or_default();
        if object.is_null() {
            return Err(CodecError::UnknownObject { id });
        }
        Ok(object)
    }

    fn find_type(&self, name: &str) -> Option<&'static TypeInfo> {
        self.types.find(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver_for(sender: &mut KnowledgeBase) -> KnowledgeBase {
        let mut receiver = KnowledgeBase::default();
        for update in sender.drain_updates() {
            match update {
                DictionaryUpdate::String { id, text } => {
                    receiver.apply_string_update(id, &text).unwrap();
                }
                DictionaryUpdate::Path {
                    id,
                    text_id,
                    parent_id,
                } => {
                    receiver.apply_path_update(id, text_id, parent_id).unwrap();
                }
            }
        }
        receiver
    }

    #[test]
    fn empty_values_map_to_zero() {
        let mut base = KnowledgeBase::default();
        assert_eq!(base.map_string("").unwrap(), 0);
        assert_eq!(base.map_path("::", "::").unwrap(), 0);
        assert_eq!(base.map_object(&ObjectRef::null()).unwrap(), 0);
        assert!(!base.has_pending_updates());
    }

    #[test]
    fn strings_are_allocated_once() {
        let mut base = KnowledgeBase::default();
        let first = base.map_string("hello").unwrap();
        let second = base.map_string("hello").unwrap();
        assert_eq!(first, 1);
        assert_eq!(first, second);
        assert_eq!(base.string_count(), 1);
        assert_eq!(
            base.drain_updates(),
            vec![DictionaryUpdate::String {
                id: 1,
                text: "hello".to_owned()
            }]
        );
        base.map_string("hello").unwrap();
        assert!(!base.has_pending_updates());
    }

    #[test]
    fn paths_share_prefixes() {
        let mut base = KnowledgeBase::default();
        let player = base.map_path("game::actors::Player", "::").unwrap();
        let enemy = base.map_path("game::actors::Enemy", "::").unwrap();
        assert_ne!(player, enemy);
        assert_eq!(base.path_count(), 4);
        assert_eq!(base.string_count(), 4);

        let types = TypeRegistry::new();
        let receiver = receiver_for(&mut base);
        let resolver = receiver.resolver(&types);
        assert_eq!(
            resolver.resolve_path(player, "::").unwrap(),
            "game::actors::Player"
        );
        assert_eq!(resolver.resolve_path(enemy, "/").unwrap(), "game/actors/Enemy");
    }

    #[test]
    fn path_depth_is_limited() {
        let mut base = KnowledgeBase::new(&CodecLimits::for_testing());
        let deep = vec!["x"; 9].join("/");
        let err = base.map_path(&deep, "/").unwrap_err();
        assert!(matches!(
            err,
            CodecError::LimitsExceeded {
                kind: LimitKind::PathDepth,
                ..
            }
        ));
    }

    #[test]
    fn unknown_ids_do_not_resolve() {
        let base = KnowledgeBase::default();
        let types = TypeRegistry::new();
        let resolver = base.resolver(&types);
        assert_eq!(resolver.resolve_string(0).unwrap(), "");
        assert_eq!(
            resolver.resolve_string(3).unwrap_err(),
            CodecError::UnknownString { id: 3 }
        );
        assert_eq!(
            resolver.resolve_path(2, "::").unwrap_err(),
            CodecError::UnknownPath { id: 2 }
        );
        assert_eq!(
            resolver.resolve_object(1).unwrap_err(),
            CodecError::UnknownObject { id: 1 }
        );
    }

    #[test]
    fn updates_are_validated_before_commit() {
        let mut base = KnowledgeBase::default();
        assert!(matches!(
            base.apply_string_update(0, "x"),
            Err(CodecError::ReservedId { .. })
        ));
        assert!(base.apply_string_update(1, "a").unwrap());
        assert!(!base.apply_string_update(1, "a").unwrap());
        assert!(matches!(
            base.apply_string_update(1, "b"),
            Err(CodecError::DictionaryConflict { id: 1, .. })
        ));

        assert_eq!(
            base.apply_path_update(1, 2, 0).unwrap_err(),
            CodecError::UnknownString { id: 2 }
        );
        assert_eq!(
            base.apply_path_update(1, 1, 5).unwrap_err(),
            CodecError::UnknownPath { id: 5 }
        );
        assert_eq!(base.path_count(), 0);
        assert!(base.apply_path_update(1, 1, 0).unwrap());
        assert!(base.apply_path_update(2, 1, 1).unwrap());
        assert!(matches!(
            base.apply_path_update(2, 1, 0),
            Err(CodecError::DictionaryConflict { .. })
        ));
        assert_eq!(base.string_count(), 1);
    }

    #[test]
    fn unannounceable_string_gets_no_id() {
        let mut base = KnowledgeBase::new(&CodecLimits::for_testing());
        base.set_string_update_limits(&WireLimits::for_testing());
        let long = "x".repeat(300);
        for _ in 0..2 {
            assert_eq!(
                base.map_string(&long).unwrap_err(),
                CodecError::LimitsExceeded {
                    kind: LimitKind::StringLength,
                    limit: 256,
                    actual: 300,
                }
            );
        }
        assert_eq!(base.string_count(), 0);
        assert!(!base.has_pending_updates());
        assert_eq!(base.map_string(&long[..256]).unwrap(), 1);
    }

    #[test]
    fn requeued_updates_go_first() {
        let mut base = KnowledgeBase::default();
        base.map_string("a").unwrap();
        let unsent = base.drain_updates();
        base.map_string("b").unwrap();
        base.requeue_updates(unsent);
        let texts: Vec<String> = base
            .drain_updates()
            .into_iter()
            .map(|update| match update {
                DictionaryUpdate::String { text, .. } => text,
                DictionaryUpdate::Path { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn dictionary_capacity_is_enforced() {
        let limits = CodecLimits {
            max_dictionary_entries: 2,
            ..CodecLimits::for_testing()
        };
        let mut base = KnowledgeBase::new(&limits);
        base.map_string("a").unwrap();
        base.map_string("b").unwrap();
        assert_eq!(
            base.map_string("c").unwrap_err(),
            CodecError::DictionaryFull {
                table: DictionaryTable::String,
                limit: 2
            }
        );
        assert_eq!(base.map_string("a").unwrap(), 1);
    }

    #[test]
    fn objects_follow_identity() {
        let mut sender = KnowledgeBase::default();
        let first = ObjectRef::new(1u32);
        let second = ObjectRef::new(1u32);
        let a = sender.map_object(&first).unwrap();
        let b = sender.map_object(&second).unwrap();
        assert_ne!(a, b);
        assert_eq!(sender.map_object(&first.clone()).unwrap(), a);
        assert_eq!(sender.map_weak_object(&first.downgrade()).unwrap(), a);
        assert!(!sender.has_pending_updates());

        let mut receiver = KnowledgeBase::default();
        receiver.attach_object(a, &first).unwrap();
        let types = TypeRegistry::new();
        assert_eq!(receiver.resolver(&types).resolve_object(a).unwrap(), first);
        assert!(receiver.detach_object(a));
        assert!(!receiver.detach_object(a));
        assert!(receiver.resolver(&types).resolve_object(a).is_err());
    }

    #[test]
    fn dropped_objects_stop_resolving() {
        let mut receiver = KnowledgeBase::default();
        let object = ObjectRef::new("short lived".to_owned());
        receiver.attach_object(7, &object).unwrap();
        drop(object);
        let types = TypeRegistry::new();
        assert_eq!(
            receiver.resolver(&types).resolve_object(7).unwrap_err(),
            CodecError::UnknownObject { id: 7 }
        );
    }
}
