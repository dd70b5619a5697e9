//! Object graph store.
//!
//! Arena of indirect objects indexed by object number. Objects point at each
//! other only through [`Object::Reference`] values, so reference cycles
//! (catalog → page → annotation → page) need no special ownership handling.
//!
//! Every entry moves through [`FlushState`] one way: `InMemory → Flushed` when
//! the writer takes its bytes, or `InMemory → Free` when it is deleted.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use indexmap::IndexSet;
use std::collections::BTreeMap;

/// Highest object number a file may use.
pub const MAX_OBJECT_NUMBER: u32 = 8_388_607;

/// Lifecycle of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushState {
    /// Deleted; the number stays on the xref free list
    Free,
    /// Payload held in memory and still mutable
    InMemory,
    /// Serialized; the payload has been released
    Flushed,
}

#[derive(Debug)]
struct Entry {
    generation: u16,
    state: FlushState,
    object: Option<Object>,
    /// Outgoing edges recorded when the payload was released
    flushed_refs: Vec<ObjectRef>,
}

/// Arena-backed store of indirect objects.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    /// Index is the object number; slot 0 is the xref free-list head and stays empty.
    entries: Vec<Option<Entry>>,
}

impl ObjectGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            entries: vec![None],
        }
    }

    /// Allocate a fresh identity for `object`.
    pub fn add_object(&mut self, object: Object) -> ObjectRef {
        let id = self.entries.len() as u32;
        self.entries.push(Some(Entry {
            generation: 0,
            state: FlushState::InMemory,
            object: Some(object),
            flushed_refs: Vec::new(),
        }));
        ObjectRef::new(id, 0)
    }

    /// Place `object` under an existing identity, as read from a file.
    pub fn insert(&mut self, r: ObjectRef, object: Object) -> Result<()> {
        if r.id == 0 {
            return Err(Error::InvalidPdf("object number 0 is reserved".to_string()));
        }
        if r.id > MAX_OBJECT_NUMBER {
            return Err(Error::InvalidPdf(format!("object number {} exceeds {}", r.id, MAX_OBJECT_NUMBER)));
        }
        let index = r.id as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        if self.entries[index].is_some() {
            return Err(Error::InvalidPdf(format!("duplicate object {}", r)));
        }
        self.entries[index] = Some(Entry {
            generation: r.gen,
            state: FlushState::InMemory,
            object: Some(object),
            flushed_refs: Vec::new(),
        });
        Ok(())
    }

    fn entry(&self, r: ObjectRef) -> Result<&Entry> {
        match self.entries.get(r.id as usize) {
            Some(Some(entry)) if entry.generation == r.gen && entry.state != FlushState::Free => Ok(entry),
            _ => Err(Error::ObjectNotFound(r.id, r.gen)),
        }
    }

    fn entry_mut(&mut self, r: ObjectRef) -> Result<&mut Entry> {
        match self.entries.get_mut(r.id as usize) {
            Some(Some(entry)) if entry.generation == r.gen && entry.state != FlushState::Free => Ok(entry),
            _ => Err(Error::ObjectNotFound(r.id, r.gen)),
        }
    }

    /// Whether `r` names a live (in-memory or flushed) object.
    pub fn contains(&self, r: ObjectRef) -> bool {
        self.entry(r).is_ok()
    }

    /// Current state of `r`.
    ///
    /// Freed objects report `Free` when asked with their old generation.
    pub fn state(&self, r: ObjectRef) -> Result<FlushState> {
        match self.entries.get(r.id as usize) {
            Some(Some(entry)) if entry.state == FlushState::Free && entry.generation == r.gen.wrapping_add(1) => {
                Ok(FlushState::Free)
            },
            _ => self.entry(r).map(|e| e.state),
        }
    }

    /// Payload of `r`.
    pub fn get_object(&self, r: ObjectRef) -> Result<&Object> {
        let entry = self.entry(r)?;
        entry.object.as_ref().ok_or(Error::ObjectFlushed(r))
    }

    /// Mutable payload of `r`; fails once the object is flushed.
    pub fn get_object_mut(&mut self, r: ObjectRef) -> Result<&mut Object> {
        let entry = self.entry_mut(r)?;
        entry.object.as_mut().ok_or(Error::ObjectFlushed(r))
    }

    /// Follow `obj` when it is a reference to an in-memory object.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.get_object(*r).ok(),
            other => Some(other),
        }
    }

    /// Delete an in-memory object. The generation is bumped for reuse in the xref.
    pub fn free_object(&mut self, r: ObjectRef) -> Result<()> {
        let entry = self.entry_mut(r)?;
        if entry.state == FlushState::Flushed {
            return Err(Error::ObjectFlushed(r));
        }
        entry.state = FlushState::Free;
        entry.object = None;
        entry.generation = entry.generation.saturating_add(1);
        log::debug!("Freed object {}", r);
        Ok(())
    }

    /// Move `r` to `Flushed` and hand back its payload.
    ///
    /// Outgoing edges are kept so reachability still sees through the object.
    pub fn mark_flushed(&mut self, r: ObjectRef) -> Result<Object> {
        let entry = self.entry_mut(r)?;
        let object = entry.object.take().ok_or(Error::ObjectFlushed(r))?;
        entry.flushed_refs = object.references();
        entry.state = FlushState::Flushed;
        Ok(object)
    }

    /// Transitive closure of references starting at `root`, root included.
    ///
    /// Iterative with a visited set, so cycles terminate. The result is in
    /// discovery order. Dangling references are logged and skipped.
    pub fn reachable_from(&self, root: ObjectRef) -> Result<IndexSet<ObjectRef>> {
        self.entry(root)?;

        let mut visited = IndexSet::new();
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            if visited.contains(&current) {
                continue;
            }
            let entry = match self.entry(current) {
                Ok(entry) => entry,
                Err(_) => {
                    log::warn!("Dangling reference to {} skipped", current);
                    continue;
                },
            };
            visited.insert(current);

            let edges = match &entry.object {
                Some(object) => object.references(),
                None => entry.flushed_refs.clone(),
            };
            for next in edges.into_iter().rev() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }

        Ok(visited)
    }

    /// In-memory objects in ascending object-number order.
    pub fn in_memory_refs(&self) -> Vec<ObjectRef> {
        self.live_refs(FlushState::InMemory)
    }

    /// Flushed objects in ascending object-number order.
    pub fn flushed_refs(&self) -> Vec<ObjectRef> {
        self.live_refs(FlushState::Flushed)
    }

    fn live_refs(&self, state: FlushState) -> Vec<ObjectRef> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| match entry {
                Some(e) if e.state == state => Some(ObjectRef::new(id as u32, e.generation)),
                _ => None,
            })
            .collect()
    }

    /// Freed numbers with the generation their next use must carry.
    pub fn free_entries(&self) -> BTreeMap<u32, u16> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| match entry {
                Some(e) if e.state == FlushState::Free => Some((id as u32, e.generation)),
                _ => None,
            })
            .collect()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.state != FlushState::Free)
            .count()
    }

    /// True when no live object exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest object number ever allocated.
    pub fn max_object_number(&self) -> u32 {
        self.entries.len().saturating_sub(1) as u32
    }
}
